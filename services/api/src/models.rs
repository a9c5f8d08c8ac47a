//! API Models
//!
//! Request and response bodies for the REST API, annotated for OpenAPI
//! generation with `utoipa`. Engine types are embedded as-is and documented
//! as opaque objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use t2dm_sim_core::{
    DrugClass, Feedback, PatientCase,
    grading::Checkpoint,
};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct CaseSummary {
    #[schema(example = "hf-ckd-01")]
    pub id: String,
    pub title: String,
}

impl From<&PatientCase> for CaseSummary {
    fn from(case: &PatientCase) -> Self {
        Self {
            id: case.id.clone(),
            title: case.title.clone(),
        }
    }
}

/// A case together with the drug classes the learner can choose from.
#[derive(Serialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetail {
    #[schema(value_type = Object)]
    pub case: PatientCase,
    #[schema(value_type = Vec<Object>)]
    pub drugs: Vec<DrugClass>,
    pub educational_notice: String,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct GradePayload {
    #[schema(example = "sglt2")]
    pub choice: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct GradeResponse {
    #[schema(value_type = Object)]
    pub feedback: Feedback,
    #[schema(value_type = Option<Object>)]
    pub checkpoint: Option<Checkpoint>,
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LocalAdvisorPayload {
    #[serde(default)]
    #[schema(example = "What are the side effects of metformin?")]
    pub question: String,
    pub case_id: Option<String>,
    pub choice: Option<String>,
}

#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct DoctorPayload {
    #[schema(example = "Why is an SGLT2 inhibitor preferred here?")]
    pub question: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub context: Option<Value>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AdvisorSource {
    Local,
    Remote,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct AdvisorAnswer {
    pub answer: String,
    pub source: AdvisorSource,
    pub notice: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
