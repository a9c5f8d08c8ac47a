//! WebSocket Session Management
//!
//! One WebSocket connection is one learner session. The code is split into:
//!
//! - `protocol`: the JSON message format between browser and server.
//! - `driver`: the session state machine, transcript and advisor routing for
//!   one learner, free of any I/O.
//! - `advisor`: the per-session worker that runs remote advisor calls one at
//!   a time, in the order they were asked.
//! - `session`: the connection lifecycle and event loop tying them together.

mod advisor;
mod driver;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
