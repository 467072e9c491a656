//! In-process duplex stream machinery.
//!
//! [`session`] provides the channel that decouples "the HTTP response
//! can be returned now" from "events are still being produced";
//! [`pump`] is the producer loop that frames events onto it.

pub mod pump;
pub mod session;

pub use pump::{frame, run_pump, EventSink};
pub use session::{StreamReader, StreamSession, StreamWriter, WriteError};
