//! Duplex stream session backed by a bounded byte channel.
//!
//! [`StreamSession::open`] yields a writable half owned exclusively by
//! one pump and a readable half consumed by exactly one HTTP response.
//! The bounded channel is the backpressure mechanism: a slow consumer
//! blocks the producer on `write` instead of queueing unboundedly, and
//! a dropped consumer surfaces as a write failure.

use std::fmt::{Display, Formatter};

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Failure pushing bytes into a stream session.
///
/// Not an application error: `Disconnected` is the expected signal that
/// the consumer is gone and the producer loop should wind down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The readable half was dropped; the consumer is gone.
    Disconnected,
    /// `write` was called after `close`, which is a programming error
    /// in the caller and fails fast rather than silently succeeding.
    Closed,
}

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "consumer disconnected"),
            Self::Closed => write!(f, "write after close"),
        }
    }
}

impl std::error::Error for WriteError {}

/// One open duplex channel between a producer loop and an HTTP response.
pub struct StreamSession;

impl StreamSession {
    /// Open a session with a bounded frame buffer of `capacity` chunks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (rejected earlier by config
    /// validation).
    #[must_use]
    pub fn open(capacity: usize) -> (StreamWriter, StreamReader) {
        let (tx, rx) = mpsc::channel(capacity);
        (StreamWriter { tx: Some(tx) }, StreamReader { rx })
    }
}

/// Writable half of a [`StreamSession`]; exclusively owned by one pump.
pub struct StreamWriter {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl StreamWriter {
    /// Push one chunk, awaiting buffer space.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::Disconnected`] when the readable half was
    /// dropped and [`WriteError::Closed`] after `close`.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), WriteError> {
        match &self.tx {
            Some(tx) => tx
                .send(chunk)
                .await
                .map_err(|_| WriteError::Disconnected),
            None => Err(WriteError::Closed),
        }
    }

    /// Close the writable half, releasing the channel.
    ///
    /// Safe to call again; only the first call performs the close.
    /// Returns whether this call closed the half.
    pub fn close(&mut self) -> bool {
        self.tx.take().is_some()
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

/// Readable half of a [`StreamSession`]; consumed by one HTTP response.
pub struct StreamReader {
    rx: mpsc::Receiver<Bytes>,
}

impl StreamReader {
    /// Receive the next chunk; `None` once the writable half is closed
    /// and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }

    /// Convert into an HTTP response body streaming the session bytes.
    #[must_use]
    pub fn into_body(self) -> axum::body::Body {
        let chunks = ReceiverStream::new(self.rx).map(Ok::<Bytes, std::convert::Infallible>);
        axum::body::Body::from_stream(chunks)
    }
}
