//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the read-only
//! content catalog and the service clients shared by every request.

use crate::config::Config;
use std::sync::Arc;
use t2dm_sim_core::{ContentStore, advisor::RemoteAdvisor};

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContentStore>,
    pub remote_advisor: Arc<RemoteAdvisor>,
    pub config: Arc<Config>,
}
