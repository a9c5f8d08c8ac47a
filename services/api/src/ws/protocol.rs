//! Defines the WebSocket message protocol between the browser client and the API server.

use serde::{Deserialize, Serialize};
use t2dm_sim_core::{ChatEntry, DrugClass, Mode, PatientCase, SessionSnapshot};
use uuid::Uuid;

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the session on a case. This must be the first message.
    Init {
        /// The case to present; the first catalog case when omitted.
        #[serde(default, rename = "caseId")]
        case_id: Option<String>,
    },
    /// Switches between browse, learning and testing mode.
    SetMode { mode: Mode },
    /// Selects a drug class for the current case.
    Choose {
        #[serde(rename = "drugId")]
        drug_id: String,
    },
    /// Clears the current choice ("Next attempt" / "Try another choice").
    ResetAttempt,
    /// A question for the advisor; `remote` routes it to the AI tutor.
    Ask {
        question: String,
        #[serde(default)]
        remote: bool,
    },
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the session and provides everything needed to render it.
    Initialized {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        case: PatientCase,
        drugs: Vec<DrugClass>,
        session: SessionSnapshot,
        transcript: Vec<ChatEntry>,
        notice: String,
    },
    /// The decision panel after a transition or breather tick.
    SessionUpdate { session: SessionSnapshot },
    /// A new line in the advisor chat.
    TranscriptAppend { entry: ChatEntry },
    /// A rejected request. The session stays open.
    Error { message: String },
}
