//! Question answering about the current case.
//!
//! - `local`: rule-based answers from the content store, no network.
//! - `remote`: the gateway to a generative model with ordered fallback.
//! - `gemini`: wire format and HTTP transport for the Gemini API.

pub mod gemini;
pub mod local;
pub mod remote;

pub use local::answer_locally;
pub use remote::{GenerativeClient, RemoteAdvisor};
