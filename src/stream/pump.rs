//! Producer loop: frames capability events onto a stream session.
//!
//! The pump owns the writable half of its session and is the only
//! component that closes it. Errors raised during production happen
//! after the HTTP response has been returned, so they are logged and
//! the stream ends with silent truncation — there is no sentinel error
//! frame at this layer.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error};

use super::session::{StreamWriter, WriteError};
use crate::capability::{Capability, CapabilityRequest, Event};

/// Frame one event for the wire: `data: <json>\n\n`.
#[must_use]
pub fn frame(event: &Event) -> Bytes {
    Bytes::from(format!("data: {}\n\n", event.to_json()))
}

/// The sole channel through which a streaming capability produces
/// events.
///
/// Each `emit` serializes, frames, and fully awaits one write before
/// returning, so events are delivered in exactly the order produced.
/// After the first failed write the sink latches: every later `emit`
/// fails fast without touching the session.
pub struct EventSink {
    writer: StreamWriter,
    failed: bool,
}

impl EventSink {
    /// Wrap the writable half of a session.
    #[must_use]
    pub fn new(writer: StreamWriter) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    /// Encode and write one event as a single atomic frame.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Disconnected`] once the consumer is gone;
    /// the capability should stop producing. No retry happens here.
    pub async fn emit(&mut self, event: Event) -> Result<(), WriteError> {
        if self.failed {
            return Err(WriteError::Disconnected);
        }
        let result = self.writer.write(frame(&event)).await;
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    /// Whether a write has failed (consumer disconnected).
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.failed
    }

    fn close(&mut self) -> bool {
        self.writer.close()
    }
}

/// Drive one capability's stream production to completion.
///
/// Runs `handle_stream` against a fresh sink and closes the writable
/// half exactly once on every exit path: normal completion, producer
/// error, or consumer disconnect. Producer errors are recorded via
/// `tracing` and never re-raised; the response already left for the
/// client before production started.
pub async fn run_pump(
    route: String,
    capability: Arc<dyn Capability>,
    request: CapabilityRequest,
    writer: StreamWriter,
) {
    let mut sink = EventSink::new(writer);
    let result = capability.handle_stream(request, &mut sink).await;

    match result {
        Ok(()) if sink.is_disconnected() => {
            debug!(%route, "consumer disconnected; stream truncated");
        }
        Ok(()) => {
            debug!(%route, "stream completed");
        }
        Err(err) if sink.is_disconnected() => {
            debug!(%route, %err, "consumer disconnected; stream truncated");
        }
        Err(err) => {
            error!(%route, %err, "stream producer failed");
        }
    }

    sink.close();
}
