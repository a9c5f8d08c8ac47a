//! Type 2 diabetes prescribing simulator engine.
//!
//! A learner reads a patient case, picks a drug class and gets graded
//! feedback, then can ask an advisor about the case. This crate holds the
//! whole engine; transports and presentation live elsewhere.

pub mod advisor;
pub mod breather;
pub mod content;
pub mod error;
pub mod grading;
pub mod session;
pub mod transcript;

pub use content::{ContentStore, DrugClass, PatientCase};
pub use error::{ContentError, GatewayError, LookupError, SessionError, TransportError};
pub use grading::{Feedback, grade};
pub use session::{Mode, Session, SessionSnapshot};
pub use transcript::{ChatEntry, ChatRole, ChatTranscript};

/// Label attached to everything the advisor says.
pub const EDUCATIONAL_NOTICE: &str =
    "Educational use only. Not medical advice; verify with a clinician.";
