//! Grading Engine
//!
//! Maps a patient case and a selected drug class to structured feedback.
//! Everything here is pure: no I/O, no clocks, and the same inputs always
//! produce the same output.

use crate::content::{ContentStore, PatientCase};
use crate::error::LookupError;
use serde::{Deserialize, Serialize};

pub const SELECT_HEADLINE: &str = "Select a drug class";
pub const SELECT_BULLET: &str = "Choose a medication to see feedback.";
pub const APPROPRIATE_HEADLINE: &str = "✅ Appropriate choice";
pub const CAUTION_HEADLINE: &str = "⚠️ Consider another option";

/// Feedback shown to the learner for the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub headline: String,
    pub bullets: Vec<String>,
    pub evidence: Vec<String>,
}

impl Feedback {
    fn select_prompt() -> Self {
        Self {
            headline: SELECT_HEADLINE.to_string(),
            bullets: vec![SELECT_BULLET.to_string()],
            evidence: Vec::new(),
        }
    }
}

/// Grades `choice` against `case`.
///
/// No choice yields the neutral "select a drug" prompt. An id missing from the
/// store is a [`LookupError`]; callers treat that as a data fault rather than
/// a grading outcome.
pub fn grade(
    store: &ContentStore,
    case: &PatientCase,
    choice: Option<&str>,
) -> Result<Feedback, LookupError> {
    let Some(choice) = choice else {
        return Ok(Feedback::select_prompt());
    };
    let drug = store.require_drug(choice)?;

    let feedback = if case.is_appropriate(&drug.id) {
        Feedback {
            headline: APPROPRIATE_HEADLINE.to_string(),
            bullets: drug.benefits.clone(),
            evidence: drug.evidence.clone(),
        }
    } else {
        Feedback {
            headline: CAUTION_HEADLINE.to_string(),
            bullets: drug.risks.clone(),
            evidence: drug.evidence.clone(),
        }
    };
    Ok(feedback)
}

/// Learning-mode recap shown after a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub chosen: String,
    pub result: String,
    pub teaching_point: String,
}

pub fn checkpoint(
    store: &ContentStore,
    case: &PatientCase,
    choice: &str,
) -> Result<Checkpoint, LookupError> {
    let drug = store.require_drug(choice)?;
    let result = if case.is_appropriate(&drug.id) {
        "appropriate for this case"
    } else {
        "not the best option"
    };
    Ok(Checkpoint {
        chosen: drug.name.clone(),
        result: result.to_string(),
        teaching_point: case.teaching_point.clone(),
    })
}

/// Status line for the breather panel.
pub fn breather_status(remaining_seconds: u32) -> String {
    if remaining_seconds > 0 {
        format!("Pause for consolidation: {remaining_seconds}s remaining.")
    } else {
        "Breather complete.".to_string()
    }
}
