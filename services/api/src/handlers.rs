//! Axum Handlers for the REST API
//!
//! Stateless endpoints over the simulator engine: the case catalog, one-shot
//! grading, and both advisors. Learner sessions with timing rules live on the
//! WebSocket (see [`crate::ws`]).

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use t2dm_sim_core::{
    EDUCATIONAL_NOTICE, GatewayError, LookupError, PatientCase,
    advisor::answer_locally,
    grading::{self, checkpoint},
};
use tracing::{error, info, warn};

use crate::{
    models::{
        AdvisorAnswer, AdvisorSource, CaseDetail, CaseSummary, DoctorPayload, ErrorResponse,
        GradePayload, GradeResponse, LocalAdvisorPayload,
    },
    state::AppState,
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Gateway(GatewayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error, detail: None }),
            )
                .into_response(),
            ApiError::NotFound(error) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse { error, detail: None }),
            )
                .into_response(),
            ApiError::Gateway(err) => {
                if matches!(err, GatewayError::Configuration) {
                    error!("Remote advisor called without a usable GEMINI_API_KEY");
                }
                let status = StatusCode::from_u16(err.status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let body = ErrorResponse {
                    error: err.to_string(),
                    detail: err.detail(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self::NotFound(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err)
    }
}

/// Unwraps a JSON body, answering malformed input with the shared 400 body.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!(%rejection, "Rejected request body");
        ApiError::BadRequest("Invalid JSON body.".to_string())
    })?;
    Ok(body)
}

fn resolve_case<'a>(state: &'a AppState, id: Option<&str>) -> Result<&'a PatientCase, ApiError> {
    match id {
        Some(id) => Ok(state.store.require_case(id)?),
        None => Ok(state.store.default_case()),
    }
}

/// List the available patient cases.
#[utoipa::path(
    get,
    path = "/cases",
    responses(
        (status = 200, description = "Case catalog", body = [CaseSummary])
    )
)]
pub async fn list_cases(State(state): State<Arc<AppState>>) -> Json<Vec<CaseSummary>> {
    Json(state.store.cases().iter().map(CaseSummary::from).collect())
}

/// Get a case and the drug classes to choose from.
#[utoipa::path(
    get,
    path = "/cases/{id}",
    responses(
        (status = 200, description = "Case details", body = CaseDetail),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Case ID")
    )
)]
pub async fn get_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CaseDetail>, ApiError> {
    let case = resolve_case(&state, Some(&id))?;
    Ok(Json(CaseDetail {
        case: case.clone(),
        drugs: state.store.drugs().to_vec(),
        educational_notice: EDUCATIONAL_NOTICE.to_string(),
    }))
}

/// Grade a drug-class choice for a case.
#[utoipa::path(
    post,
    path = "/cases/{id}/grade",
    request_body = GradePayload,
    responses(
        (status = 200, description = "Feedback for the choice", body = GradeResponse),
        (status = 400, description = "Invalid JSON body", body = ErrorResponse),
        (status = 404, description = "Unknown case or drug class", body = ErrorResponse)
    ),
    params(
        ("id" = String, Path, description = "Case ID")
    )
)]
pub async fn grade_choice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<GradePayload>, JsonRejection>,
) -> Result<Json<GradeResponse>, ApiError> {
    let payload = json_body(payload)?;
    let case = resolve_case(&state, Some(&id))?;
    let choice = payload.choice.as_deref();
    let feedback = grading::grade(&state.store, case, choice)?;
    let checkpoint = choice
        .map(|choice| checkpoint(&state.store, case, choice))
        .transpose()?;
    Ok(Json(GradeResponse {
        feedback,
        checkpoint,
    }))
}

/// Answer a question with the offline rule-based advisor.
#[utoipa::path(
    post,
    path = "/advisor/local",
    request_body = LocalAdvisorPayload,
    responses(
        (status = 200, description = "Advisor answer", body = AdvisorAnswer),
        (status = 400, description = "Invalid JSON body or empty question", body = ErrorResponse),
        (status = 404, description = "Unknown case or drug class", body = ErrorResponse)
    )
)]
pub async fn ask_local(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LocalAdvisorPayload>, JsonRejection>,
) -> Result<Json<AdvisorAnswer>, ApiError> {
    let payload = json_body(payload)?;
    if payload.question.trim().is_empty() {
        return Err(ApiError::BadRequest("Question is required.".to_string()));
    }
    let case = resolve_case(&state, payload.case_id.as_deref())?;
    let choice = payload.choice.as_deref();
    let feedback = match choice {
        Some(_) => Some(grading::grade(&state.store, case, choice)?),
        None => None,
    };

    let answer = answer_locally(&payload.question, &state.store, case, choice, feedback.as_ref());
    Ok(Json(AdvisorAnswer {
        answer,
        source: AdvisorSource::Local,
        notice: EDUCATIONAL_NOTICE.to_string(),
    }))
}

/// Ask the AI doctor tutor, falling back across candidate models.
#[utoipa::path(
    post,
    path = "/doctor",
    request_body = DoctorPayload,
    responses(
        (status = 200, description = "Tutor answer", body = AdvisorAnswer),
        (status = 400, description = "Invalid JSON body or empty question", body = ErrorResponse),
        (status = 500, description = "Remote advisor not configured", body = ErrorResponse),
        (status = 502, description = "Every candidate model failed", body = ErrorResponse)
    )
)]
pub async fn ask_doctor(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DoctorPayload>, JsonRejection>,
) -> Result<Json<AdvisorAnswer>, ApiError> {
    let payload = json_body(payload)?;
    let question = payload.question.unwrap_or_default();
    let context = payload.context.unwrap_or_else(|| json!({}));

    let answer = state.remote_advisor.ask(&question, &context).await?;
    info!(chars = answer.len(), "Doctor request answered");
    Ok(Json(AdvisorAnswer {
        answer,
        source: AdvisorSource::Remote,
        notice: EDUCATIONAL_NOTICE.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, router::create_router};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use t2dm_sim_core::{
        ContentStore, TransportError,
        advisor::{GenerativeClient, RemoteAdvisor, gemini::GenerateContentRequest},
    };
    use tower::ServiceExt;

    /// Answers only for one model; counts every call.
    struct ScriptedClient {
        answering_model: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerativeClient for ScriptedClient {
        async fn generate_content(
            &self,
            _api_key: &str,
            model: &str,
            _request: &GenerateContentRequest,
        ) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if model == self.answering_model {
                Ok(json!({"candidates": [{"content": {"parts": [{"text": "Start an SGLT2 inhibitor."}]}}]}))
            } else {
                Err(TransportError::Status {
                    status: 429,
                    body: "quota exceeded".into(),
                })
            }
        }
    }

    fn test_state(api_key: Option<&str>, client: Arc<ScriptedClient>) -> Arc<AppState> {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            gemini_api_key: api_key.map(str::to_string),
            gemini_model: None,
            gemini_api_base: "http://unused".to_string(),
            content_path: None,
            log_level: tracing::Level::INFO,
        };
        Arc::new(AppState {
            store: Arc::new(ContentStore::builtin().unwrap()),
            remote_advisor: Arc::new(RemoteAdvisor::new(client, config.gemini_api_key.clone(), None)),
            config: Arc::new(config),
        })
    }

    fn scripted(answering_model: &'static str) -> Arc<ScriptedClient> {
        Arc::new(ScriptedClient {
            answering_model,
            calls: AtomicUsize::new(0),
        })
    }

    async fn send(state: Arc<AppState>, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_list_and_get_case() {
        let state = test_state(None, scripted("none"));
        let (status, json) = send(state.clone(), "GET", "/cases", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["id"], "hf-ckd-01");

        let (status, json) = send(state.clone(), "GET", "/cases/hf-ckd-01", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["case"]["bestAlternative"], "sglt2");
        assert!(json["drugs"].as_array().unwrap().len() > 1);

        let (status, _) = send(state, "GET", "/cases/nope", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_grade_endpoint() {
        let state = test_state(None, scripted("none"));
        let (status, json) =
            send(state.clone(), "POST", "/cases/hf-ckd-01/grade", r#"{"choice": "sglt2"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["feedback"]["headline"], grading::APPROPRIATE_HEADLINE);
        assert_eq!(json["checkpoint"]["result"], "appropriate for this case");

        let (status, json) = send(state.clone(), "POST", "/cases/hf-ckd-01/grade", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["feedback"]["headline"], grading::SELECT_HEADLINE);
        assert!(json["checkpoint"].is_null());

        let (status, json) =
            send(state, "POST", "/cases/hf-ckd-01/grade", r#"{"choice": "ghost"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_local_advisor_endpoint() {
        let state = test_state(None, scripted("none"));
        let (status, json) = send(
            state.clone(),
            "POST",
            "/advisor/local",
            r#"{"question": "What are the side effects of metformin"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["source"], "local");
        assert!(json["answer"].as_str().unwrap().starts_with("Metformin."));

        let (status, _) =
            send(state, "POST", "/advisor/local", r#"{"question": "  "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_bodies_get_json_errors() {
        let state = test_state(None, scripted("none"));
        for uri in ["/cases/hf-ckd-01/grade", "/advisor/local"] {
            let (status, json) = send(state.clone(), "POST", uri, "not json").await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(json["error"], "Invalid JSON body.", "{uri}");
        }

        let (status, json) = send(state.clone(), "POST", "/advisor/local", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Question is required.");

        let (status, json) = send(state, "POST", "/cases/hf-ckd-01/grade", "{}").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["feedback"]["headline"], grading::SELECT_HEADLINE);
    }

    #[tokio::test]
    async fn test_doctor_without_credential_makes_no_calls() {
        let client = scripted("gemini-2.0-flash");
        let state = test_state(None, client.clone());
        let (status, json) =
            send(state, "POST", "/doctor", r#"{"question": "What is best?"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Missing GEMINI_API_KEY on server.");
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_doctor_rejects_bad_input() {
        let state = test_state(Some("key"), scripted("gemini-2.0-flash"));
        let (status, json) = send(state.clone(), "POST", "/doctor", "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Invalid JSON body.");

        let (status, json) = send(state, "POST", "/doctor", r#"{"question": " "}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Question is required.");
    }

    #[tokio::test]
    async fn test_doctor_falls_back_to_answering_model() {
        let client = scripted("gemini-2.0-flash-lite");
        let state = test_state(Some("key"), client.clone());
        let (status, json) = send(
            state,
            "POST",
            "/doctor",
            r#"{"question": "Why SGLT2?", "context": {"mode": "learning"}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"], "Start an SGLT2 inhibitor.");
        assert_eq!(json["source"], "remote");
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_doctor_reports_exhaustion_as_bad_gateway() {
        let state = test_state(Some("key"), scripted("none"));
        let (status, json) = send(state, "POST", "/doctor", r#"{"question": "Why?"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "Model request failed.");
        let detail = json["detail"].as_str().unwrap();
        assert_eq!(detail.matches("quota exceeded").count(), 3);
    }
}
