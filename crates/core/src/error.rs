//! Error types shared by the simulator engine.

use std::fmt;
use std::path::PathBuf;

/// Failures raised while loading or validating the drug and case catalogs.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed {catalog} catalog: {source}")]
    Parse {
        catalog: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Drug class at position {0} has an empty id")]
    EmptyDrugId(usize),
    #[error("Drug class '{0}' has an empty name")]
    EmptyDrugName(String),
    #[error("Duplicate drug class id '{0}'")]
    DuplicateDrug(String),
    #[error("Duplicate patient case id '{0}'")]
    DuplicateCase(String),
    #[error("Case '{0}' has an empty appropriate-choice set")]
    EmptyAppropriate(String),
    #[error("Case '{case}' references unknown drug class '{drug}'")]
    DanglingReference { case: String, drug: String },
    #[error("Case '{case}' names '{best}' as best alternative but it is not an appropriate choice")]
    BestNotAppropriate { case: String, best: String },
    #[error("The case catalog is empty")]
    NoCases,
}

/// A selection or case id that does not resolve against the content store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("Selection references unknown drug class '{0}'")]
    UnknownDrug(String),
    #[error("Unknown patient case '{0}'")]
    UnknownCase(String),
}

/// A session transition attempted while it is not legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Choices are locked until the breather finishes")]
    ChoiceDuringBreather,
    #[error("The attempt cannot be reset until the breather finishes")]
    ResetDuringBreather,
}

/// Why a single candidate model failed to produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unreadable response body: {0}")]
    Decode(String),
    #[error("No response text returned by model.")]
    EmptyAnswer,
}

/// One entry of the aggregated failure log of a remote advisor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFailure {
    pub model: String,
    pub reason: TransportError,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

/// Errors reported by the remote advisor gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Missing GEMINI_API_KEY on server.")]
    Configuration,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Model request failed.")]
    ModelUnavailable { failures: Vec<CandidateFailure> },
}

impl GatewayError {
    /// HTTP-like status used when the error crosses a service boundary.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Configuration => 500,
            GatewayError::InvalidRequest(_) => 400,
            GatewayError::ModelUnavailable { .. } => 502,
        }
    }

    /// Operator-facing diagnostic joining every candidate failure.
    pub fn detail(&self) -> Option<String> {
        match self {
            GatewayError::ModelUnavailable { failures } if failures.is_empty() => {
                Some("No model attempts were made.".to_string())
            }
            GatewayError::ModelUnavailable { failures } => Some(
                failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | "),
            ),
            _ => None,
        }
    }

    /// Text safe to show a learner. Never contains provider output.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Configuration => {
                "The AI tutor is not configured on this server yet. The local advisor is still available."
                    .to_string()
            }
            GatewayError::InvalidRequest(message) => message.clone(),
            GatewayError::ModelUnavailable { .. } => {
                "Sorry, I could not generate a response right now. Please try again later."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_joins_candidate_failures() {
        let err = GatewayError::ModelUnavailable {
            failures: vec![
                CandidateFailure {
                    model: "m1".into(),
                    reason: TransportError::Status {
                        status: 404,
                        body: "not found".into(),
                    },
                },
                CandidateFailure {
                    model: "m2".into(),
                    reason: TransportError::EmptyAnswer,
                },
            ],
        };

        assert_eq!(err.status(), 502);
        assert_eq!(
            err.detail().as_deref(),
            Some("m1: HTTP 404: not found | m2: No response text returned by model.")
        );
        assert!(!err.user_message().contains("not found"));
    }

    #[test]
    fn test_detail_without_attempts() {
        let err = GatewayError::ModelUnavailable { failures: vec![] };
        assert_eq!(err.detail().as_deref(), Some("No model attempts were made."));
    }

    #[test]
    fn test_configuration_error_display() {
        let err = GatewayError::Configuration;
        assert_eq!(err.to_string(), "Missing GEMINI_API_KEY on server.");
        assert_eq!(err.status(), 500);
        assert_eq!(err.detail(), None);
    }
}
