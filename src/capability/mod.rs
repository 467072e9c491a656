//! Transport-agnostic capability abstraction.
//!
//! The [`Capability`] trait decouples the gateway core (lifecycle
//! gating, stream pumping, HTTP dispatch) from the domain logic served
//! on each route. A capability is either unary or streaming; the unused
//! handler keeps its default rejection body.
//!
//! All business logic (pricing, registries, proxying, and the rest)
//! plugs in behind this seam; the gateway never inspects event payloads.

pub mod echo;
pub mod heartbeat;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::Value;

use crate::config::CapabilitySettings;
use crate::stream::EventSink;
use crate::{AppError, Result};

/// A single JSON-serializable payload produced by a streaming capability.
///
/// Immutable once constructed; ownership transfers to the pump for
/// framing and then to the stream session.
#[derive(Debug, Clone, PartialEq)]
pub struct Event(Value);

impl Event {
    /// Build an event from any serializable payload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Stream` if the payload cannot be represented
    /// as JSON.
    pub fn new(payload: impl Serialize) -> Result<Self> {
        serde_json::to_value(payload)
            .map(Self)
            .map_err(|err| AppError::Stream(format!("unserializable event payload: {err}")))
    }

    /// The event payload as a JSON value.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.0
    }

    /// Serialize the payload to its compact JSON text form.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }
}

/// Request handed to a capability handler: decoded query parameters plus
/// an optional JSON body (unary routes take a POST body, stream routes
/// usually carry parameters only).
#[derive(Debug, Clone, Default)]
pub struct CapabilityRequest {
    /// Query-string parameters.
    pub params: HashMap<String, String>,
    /// Decoded JSON request body, when one was sent.
    pub body: Option<Value>,
}

/// Interface between the gateway core and a served capability.
///
/// `initialize` is awaited to completion exactly once (by
/// [`crate::lifecycle::AgentLifecycle`]) before either handler runs; on
/// failure the instance is unusable. A capability that is reused across
/// concurrent requests must keep its internal state read-only after
/// `initialize` — the gateway does not enforce this.
pub trait Capability: Send + Sync {
    /// One-time asynchronous initialization with the deployment's
    /// settings section.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Init`] on invalid settings or failed setup;
    /// the error is surfaced to callers as a non-2xx response and the
    /// instance never serves traffic.
    fn initialize<'a>(
        &'a self,
        settings: &'a CapabilitySettings,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Handle a single request/response exchange.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Handler`] (or any domain error), surfaced
    /// directly as the HTTP error response.
    fn handle_unary<'a>(
        &'a self,
        request: CapabilityRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        let _ = request;
        Box::pin(async {
            Err(AppError::Handler(
                "capability does not serve unary requests".into(),
            ))
        })
    }

    /// Produce a lazy sequence of events for a streaming request.
    ///
    /// `sink` is the sole channel for producing events; implementations
    /// must not write to the transport directly. Each
    /// [`EventSink::emit`] call is awaited to completion before the next
    /// event may be produced, which gives strict in-order delivery. When
    /// `emit` reports the consumer gone, the implementation should
    /// return promptly; retry policy, if any, lives here and not in the
    /// pump.
    ///
    /// # Errors
    ///
    /// Errors returned here occur after the HTTP response was already
    /// sent; they end the stream and are logged, never surfaced to the
    /// client.
    fn handle_stream<'a>(
        &'a self,
        request: CapabilityRequest,
        sink: &'a mut EventSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        let _ = (request, sink);
        Box::pin(async {
            Err(AppError::Handler(
                "capability does not serve streaming requests".into(),
            ))
        })
    }
}
