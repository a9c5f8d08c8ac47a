//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        AdvisorAnswer, AdvisorSource, CaseDetail, CaseSummary, DoctorPayload, ErrorResponse,
        GradePayload, GradeResponse, LocalAdvisorPayload,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_cases,
        handlers::get_case,
        handlers::grade_choice,
        handlers::ask_local,
        handlers::ask_doctor,
    ),
    components(
        schemas(CaseSummary, CaseDetail, GradePayload, GradeResponse, LocalAdvisorPayload, DoctorPayload, AdvisorAnswer, AdvisorSource, ErrorResponse)
    ),
    tags(
        (name = "T2DM Simulator API", description = "Case catalog, grading and tutoring advisor for the diabetes prescribing simulator")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/cases", get(handlers::list_cases))
        .route("/cases/{id}", get(handlers::get_case))
        .route("/cases/{id}/grade", post(handlers::grade_choice))
        .route("/advisor/local", post(handlers::ask_local))
        .route("/doctor", post(handlers::ask_doctor))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
