//! Streaming capability emitting periodic tick events.
//!
//! Mostly a reference implementation of the streaming side of the
//! capability contract: typed settings validated at `initialize`,
//! events produced only through the sink, production stopped as soon
//! as the sink reports the consumer gone.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Capability, CapabilityRequest, Event};
use crate::config::CapabilitySettings;
use crate::stream::EventSink;
use crate::{AppError, Result};

fn default_interval_ms() -> u64 {
    1000
}

/// Typed settings for the heartbeat capability, from
/// `[capabilities.heartbeat]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct HeartbeatSettings {
    /// Delay between ticks in milliseconds; must be non-zero.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Stop after this many ticks; unbounded when absent.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// Emits `{"type":"tick","n":k}` events at a fixed interval.
pub struct Heartbeat {
    settings: OnceLock<HeartbeatSettings>,
}

impl Heartbeat {
    /// Uninitialized heartbeat capability.
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: OnceLock::new(),
        }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for Heartbeat {
    fn initialize<'a>(
        &'a self,
        settings: &'a CapabilitySettings,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let parsed: HeartbeatSettings = settings.parse()?;
            if parsed.interval_ms == 0 {
                return Err(AppError::Init("interval_ms must be non-zero".into()));
            }
            // Settings are write-once; a repeat initialize keeps the
            // first successful value.
            let _ = self.settings.set(parsed);
            Ok(())
        })
    }

    fn handle_stream<'a>(
        &'a self,
        request: CapabilityRequest,
        sink: &'a mut EventSink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let settings = self
                .settings
                .get()
                .ok_or_else(|| AppError::Stream("heartbeat not initialized".into()))?;

            // A `limit` query parameter tightens the configured bound
            // for this one stream.
            let limit = match request.params.get("limit") {
                Some(raw) => Some(raw.parse::<u64>().map_err(|err| {
                    AppError::Stream(format!("invalid limit parameter: {err}"))
                })?),
                None => settings.limit,
            };
            let interval = Duration::from_millis(settings.interval_ms);

            let mut n: u64 = 0;
            while limit.is_none_or(|bound| n < bound) {
                n += 1;
                let event = Event::new(json!({ "type": "tick", "n": n }))?;
                if sink.emit(event).await.is_err() {
                    debug!(n, "heartbeat consumer gone");
                    break;
                }
                if limit.is_some_and(|bound| n >= bound) {
                    break;
                }
                tokio::time::sleep(interval).await;
            }
            Ok(())
        })
    }
}
