//! T2DM Simulator API Library Crate
//!
//! Hosts the simulator engine for a browser UI: REST endpoints for the
//! catalog, grading and advisor calls, and one WebSocket per learner session.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
