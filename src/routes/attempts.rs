use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    dto::attempt_dto::{
        AttemptResultsResponse, ListAttemptsQuery, StartAttemptRequest, SubmitAttemptRequest,
        SubmitAttemptResponse,
    },
    error::Result,
    models::attempt::Attempt,
    AppState,
};

#[utoipa::path(
    post,
    path = "/attempts",
    request_body = StartAttemptRequest,
    responses(
        (status = 201, description = "Attempt started", body = Json<Attempt>),
        (status = 404, description = "Template not found"),
        (status = 409, description = "Attempt already in progress or template inactive")
    )
)]
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<(StatusCode, Json<Attempt>)> {
    let attempt = state
        .attempt_service
        .start_attempt(payload.candidate_id, payload.template_id)
        .await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

#[utoipa::path(
    post,
    path = "/attempts/{id}/submit",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    request_body = SubmitAttemptRequest,
    responses(
        (status = 200, description = "Attempt graded", body = Json<SubmitAttemptResponse>),
        (status = 400, description = "Answer for a question outside the assessment"),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt already completed, abandoned or expired")
    )
)]
#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResponse>> {
    let outcome = state
        .attempt_service
        .submit_attempt(id, payload.answers)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/attempts/{id}",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Attempt", body = Json<Attempt>),
        (status = 404, description = "Attempt not found")
    )
)]
#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Attempt>> {
    let attempt = state.attempt_service.get_attempt(id).await?;
    Ok(Json(attempt))
}

#[utoipa::path(
    post,
    path = "/attempts/{id}/abandon",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Attempt abandoned", body = Json<Attempt>),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt already finished")
    )
)]
#[axum::debug_handler]
pub async fn abandon_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Attempt>> {
    let attempt = state.attempt_service.abandon_attempt(id).await?;
    Ok(Json(attempt))
}

#[utoipa::path(
    get,
    path = "/attempts/{id}/results",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Per-question review", body = Json<AttemptResultsResponse>),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt not completed")
    )
)]
#[axum::debug_handler]
pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AttemptResultsResponse>> {
    let results = state.attempt_service.get_results(id).await?;
    Ok(Json(results))
}

#[utoipa::path(
    get,
    path = "/candidates/{id}/attempts",
    params(
        ("id" = Uuid, Path, description = "Candidate ID")
    ),
    responses(
        (status = 200, description = "Attempts, newest first", body = Json<Vec<Attempt>>)
    )
)]
#[axum::debug_handler]
pub async fn list_candidate_attempts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Attempt>>> {
    let attempts = state.attempt_service.list_candidate_attempts(id).await?;
    Ok(Json(attempts))
}

#[utoipa::path(
    get,
    path = "/attempts",
    params(
        ("candidateId" = Option<Uuid>, Query, description = "Only this candidate's attempts"),
        ("templateId" = Option<Uuid>, Query, description = "Only attempts on this template version"),
        ("status" = Option<String>, Query, description = "in_progress, completed or abandoned")
    ),
    responses(
        (status = 200, description = "Attempts across candidates, newest first", body = Json<Vec<Attempt>>),
        (status = 400, description = "Malformed filter")
    )
)]
#[axum::debug_handler]
pub async fn list_attempts(
    State(state): State<AppState>,
    Query(query): Query<ListAttemptsQuery>,
) -> Result<Json<Vec<Attempt>>> {
    let attempts = state.attempt_service.list_attempts(query.into()).await?;
    Ok(Json(attempts))
}
