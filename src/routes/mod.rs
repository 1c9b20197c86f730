pub mod attempts;
pub mod health;
pub mod templates;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        attempts::start_attempt,
        attempts::submit_attempt,
        attempts::get_attempt,
        attempts::abandon_attempt,
        attempts::get_results,
        attempts::list_candidate_attempts,
        attempts::list_attempts,
        templates::create_template,
        templates::list_templates,
        templates::get_template,
        templates::update_template,
        templates::list_questions,
        templates::revise_template,
        templates::reorder_questions,
        templates::template_analytics,
    ),
    tags((name = "assessments", description = "Candidate assessment templates, attempts and scoring"))
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let attempt_api = Router::new()
        .route(
            "/attempts",
            get(attempts::list_attempts).post(attempts::start_attempt),
        )
        .route("/attempts/:id", get(attempts::get_attempt))
        .route("/attempts/:id/submit", post(attempts::submit_attempt))
        .route("/attempts/:id/abandon", post(attempts::abandon_attempt))
        .route("/attempts/:id/results", get(attempts::get_results))
        .route(
            "/candidates/:id/attempts",
            get(attempts::list_candidate_attempts),
        );

    let template_api = Router::new()
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/:id",
            get(templates::get_template).patch(templates::update_template),
        )
        .route("/templates/:id/questions", get(templates::list_questions))
        .route("/templates/:id/revisions", post(templates::revise_template))
        .route(
            "/templates/:id/question-order",
            put(templates::reorder_questions),
        )
        .route(
            "/templates/:id/analytics",
            get(templates::template_analytics),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi))
        .merge(attempt_api)
        .merge(template_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
}
