use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::analytics_dto::TemplateAnalytics,
    dto::template_dto::{
        CreateTemplatePayload, ListTemplatesQuery, ReorderQuestionsPayload, UpdateTemplatePayload,
    },
    error::Result,
    models::question::{Question, QuestionView},
    models::template::{Template, TemplateDetail},
    AppState,
};

#[utoipa::path(
    post,
    path = "/templates",
    request_body = CreateTemplatePayload,
    responses(
        (status = 201, description = "Template created", body = Json<TemplateDetail>),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<CreateTemplatePayload>,
) -> Result<(StatusCode, Json<TemplateDetail>)> {
    payload.validate()?;
    let detail = state.template_service.create_template(payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/templates",
    params(
        ("activeOnly" = Option<bool>, Query, description = "Only list active templates")
    ),
    responses(
        (status = 200, description = "Templates, newest first", body = Json<Vec<Template>>)
    )
)]
#[axum::debug_handler]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<Vec<Template>>> {
    let templates = state
        .template_service
        .list_templates(query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(templates))
}

#[utoipa::path(
    get,
    path = "/templates/{id}",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Template with questions and answer keys", body = Json<TemplateDetail>),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateDetail>> {
    let detail = state.template_service.get_template_detail(id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/templates/{id}",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    request_body = UpdateTemplatePayload,
    responses(
        (status = 200, description = "Template updated", body = Json<Template>),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplatePayload>,
) -> Result<Json<Template>> {
    let template = state
        .template_service
        .set_active(id, payload.is_active)
        .await?;
    Ok(Json(template))
}

/// Candidate-facing listing. Answer keys are stripped.
#[utoipa::path(
    get,
    path = "/templates/{id}/questions",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Questions in display order", body = Json<Vec<QuestionView>>),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuestionView>>> {
    let questions = state.template_service.list_questions(id).await?;
    Ok(Json(questions.into_iter().map(QuestionView::from).collect()))
}

#[utoipa::path(
    post,
    path = "/templates/{id}/revisions",
    params(
        ("id" = Uuid, Path, description = "Template ID to revise")
    ),
    request_body = CreateTemplatePayload,
    responses(
        (status = 201, description = "New version created", body = Json<TemplateDetail>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn revise_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateTemplatePayload>,
) -> Result<(StatusCode, Json<TemplateDetail>)> {
    payload.validate()?;
    let detail = state.template_service.revise_template(id, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    put,
    path = "/templates/{id}/question-order",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    request_body = ReorderQuestionsPayload,
    responses(
        (status = 200, description = "Questions in their new order", body = Json<Vec<Question>>),
        (status = 400, description = "Not a permutation of the template's questions"),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn reorder_questions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReorderQuestionsPayload>,
) -> Result<Json<Vec<Question>>> {
    payload.validate()?;
    let questions = state
        .template_service
        .reorder_questions(id, payload.question_ids)
        .await?;
    Ok(Json(questions))
}

#[utoipa::path(
    get,
    path = "/templates/{id}/analytics",
    params(
        ("id" = Uuid, Path, description = "Template ID")
    ),
    responses(
        (status = 200, description = "Completion and pass statistics", body = Json<TemplateAnalytics>),
        (status = 404, description = "Template not found")
    )
)]
#[axum::debug_handler]
pub async fn template_analytics(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateAnalytics>> {
    let analytics = state.analytics_service.template_analytics(id).await?;
    Ok(Json(analytics))
}
