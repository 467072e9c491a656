//! Unary capability echoing the request back to the caller.

use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Value};

use super::{Capability, CapabilityRequest};
use crate::config::CapabilitySettings;
use crate::Result;

/// Returns the request body wrapped in an `echo` envelope.
#[derive(Debug, Default)]
pub struct Echo;

impl Echo {
    /// New echo capability; initialization is a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Capability for Echo {
    fn initialize<'a>(
        &'a self,
        _settings: &'a CapabilitySettings,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }

    fn handle_unary<'a>(
        &'a self,
        request: CapabilityRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(async move {
            let body = request.body.unwrap_or(Value::Null);
            Ok(json!({ "echo": body }))
        })
    }
}
