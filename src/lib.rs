#![forbid(unsafe_code)]

//! Capability gateway core: a streaming transport that turns stateless
//! request handlers into long-lived Server-Sent-Events producers.
//!
//! Concrete capabilities implement [`capability::Capability`]; the
//! gateway binds each one to a route, gates all traffic behind one-time
//! asynchronous initialization, and for streaming routes returns the
//! response immediately while a detached pump keeps producing frames
//! under [`supervisor::Supervisor`] supervision.

pub mod capability;
pub mod config;
pub mod errors;
pub mod lifecycle;
pub mod routes;
pub mod server;
pub mod stream;
pub mod supervisor;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
