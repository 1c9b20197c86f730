mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use common::{app, call, create_template, question_ids, screening_template};

async fn start(app: &axum::Router, candidate: Uuid, template_id: &str) -> (StatusCode, JsonValue) {
    call(
        app,
        Method::POST,
        "/attempts",
        Some(json!({ "candidateId": candidate, "templateId": template_id })),
    )
    .await
}

#[tokio::test]
async fn attempt_flow_end_to_end() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let template_id = detail["id"].as_str().unwrap().to_string();
    let ids = question_ids(&detail);
    assert_eq!(detail["maxScore"], 10);

    let candidate = Uuid::new_v4();
    let (status, attempt) = start(&app, candidate, &template_id).await;
    assert_eq!(status, StatusCode::CREATED, "{}", attempt);
    assert_eq!(attempt["status"], "in_progress");
    assert_eq!(attempt["maxScore"], 10);
    assert!(attempt["expiresAt"].is_string());
    let attempt_id = attempt["id"].as_str().unwrap().to_string();

    // Candidate view hides answer keys.
    let (status, questions) = call(
        &app,
        Method::GET,
        &format!("/templates/{}/questions", template_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(questions.as_array().unwrap().len(), 3);
    assert!(questions[0].get("correctAnswer").is_none());
    assert_eq!(questions[0]["orderIndex"], 1);

    let (status, outcome) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", attempt_id),
        Some(json!({
            "answers": {
                ids[0].clone(): "let",
                ids[1].clone(): ["Rc", "Box"],
                ids[2].clone(): "It tracks lifetimes."
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["score"], 5);
    assert_eq!(outcome["maxScore"], 10);
    assert_eq!(outcome["passed"], true);
    assert_eq!(outcome["needsReview"], true);
    assert_eq!(outcome["status"], "completed");

    let per_question = outcome["perQuestion"].as_array().unwrap();
    assert_eq!(per_question.len(), 3);
    let max_points: i64 = per_question
        .iter()
        .map(|g| g["maxPoints"].as_i64().unwrap())
        .sum();
    assert_eq!(max_points, 10);
    assert_eq!(per_question[2]["isCorrect"], JsonValue::Null);

    let (status, stored) = call(&app, Method::GET, &format!("/attempts/{}", attempt_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["score"], 5);
    assert_eq!(stored["passed"], true);
    assert!(stored["completedAt"].is_string());

    let (status, results) = call(
        &app,
        Method::GET,
        &format!("/attempts/{}/results", attempt_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["attempt"]["id"], attempt_id.as_str());
    assert_eq!(results["questions"][1]["pointsEarned"], 3);
    assert_eq!(results["questions"][0]["correctAnswer"], "let");

    let (status, history) = call(
        &app,
        Method::GET,
        &format!("/candidates/{}/attempts", candidate),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_start_is_conflict() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let template_id = detail["id"].as_str().unwrap();
    let candidate = Uuid::new_v4();

    let (status, _) = start(&app, candidate, template_id).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = start(&app, candidate, template_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // A different candidate is unaffected.
    let (status, _) = start(&app, Uuid::new_v4(), template_id).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn start_on_unknown_template_is_not_found() {
    let (app, _) = app();
    let (status, body) = start(&app, Uuid::new_v4(), &Uuid::new_v4().to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn resubmission_is_rejected_without_changes() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let ids = question_ids(&detail);
    let (_, attempt) = start(&app, Uuid::new_v4(), detail["id"].as_str().unwrap()).await;
    let attempt_id = attempt["id"].as_str().unwrap();
    let submit_uri = format!("/attempts/{}/submit", attempt_id);

    let (status, first) = call(
        &app,
        Method::POST,
        &submit_uri,
        Some(json!({ "answers": { ids[0].clone(): "mut" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["score"], 0);
    assert_eq!(first["passed"], false);

    let (status, body) = call(
        &app,
        Method::POST,
        &submit_uri,
        Some(json!({ "answers": { ids[0].clone(): "let", ids[1].clone(): ["Box", "Rc"] } })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (_, stored) = call(&app, Method::GET, &format!("/attempts/{}", attempt_id), None).await;
    assert_eq!(stored["score"], 0);
}

#[tokio::test]
async fn answers_outside_the_template_are_rejected() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let (_, attempt) = start(&app, Uuid::new_v4(), detail["id"].as_str().unwrap()).await;
    let attempt_id = attempt["id"].as_str().unwrap();

    let stranger = Uuid::new_v4().to_string();
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", attempt_id),
        Some(json!({ "answers": { stranger: "let" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, stored) = call(&app, Method::GET, &format!("/attempts/{}", attempt_id), None).await;
    assert_eq!(stored["status"], "in_progress");
}

#[tokio::test]
async fn empty_submission_scores_zero_for_every_question() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let (_, attempt) = start(&app, Uuid::new_v4(), detail["id"].as_str().unwrap()).await;

    let (status, outcome) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", attempt["id"].as_str().unwrap()),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["score"], 0);
    assert_eq!(outcome["needsReview"], false);
    for grade in outcome["perQuestion"].as_array().unwrap() {
        assert_eq!(grade["pointsEarned"], 0);
        assert_eq!(grade["submitted"], JsonValue::Null);
    }
}

#[tokio::test]
async fn unknown_attempt_is_not_found() {
    let (app, _) = app();
    let missing = Uuid::new_v4();
    let (status, _) = call(&app, Method::GET, &format!("/attempts/{}", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", missing),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn abandoned_attempt_cannot_be_submitted_or_reviewed() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let template_id = detail["id"].as_str().unwrap();
    let candidate = Uuid::new_v4();
    let (_, attempt) = start(&app, candidate, template_id).await;
    let attempt_id = attempt["id"].as_str().unwrap();

    let (status, abandoned) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/abandon", attempt_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(abandoned["status"], "abandoned");
    assert_eq!(abandoned["score"], JsonValue::Null);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", attempt_id),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/attempts/{}/results", attempt_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The pair is free again.
    let (status, _) = start(&app, candidate, template_id).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn swept_attempt_cannot_be_submitted() {
    let (app, state) = app();
    let detail = create_template(&app, screening_template()).await;
    let (_, attempt) = start(&app, Uuid::new_v4(), detail["id"].as_str().unwrap()).await;
    let attempt_id = attempt["id"].as_str().unwrap();
    let expires_at: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(attempt["expiresAt"].clone()).unwrap();

    let expired = state
        .attempt_service
        .expire_overdue(expires_at + Duration::seconds(31))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", attempt_id),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (_, stored) = call(&app, Method::GET, &format!("/attempts/{}", attempt_id), None).await;
    assert_eq!(stored["status"], "abandoned");
}

#[tokio::test]
async fn inactive_template_cannot_be_started() {
    let (app, _) = app();
    let detail = create_template(&app, screening_template()).await;
    let template_id = detail["id"].as_str().unwrap();

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/templates/{}", template_id),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = start(&app, Uuid::new_v4(), template_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");
}

#[tokio::test]
async fn admin_listing_filters_across_candidates() {
    let (app, _) = app();
    let first = create_template(&app, screening_template()).await;
    let second = create_template(&app, screening_template()).await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();

    let alice = Uuid::new_v4();
    let (_, done) = start(&app, alice, first_id).await;
    call(
        &app,
        Method::POST,
        &format!("/attempts/{}/submit", done["id"].as_str().unwrap()),
        Some(json!({ "answers": {} })),
    )
    .await;
    start(&app, Uuid::new_v4(), first_id).await;
    start(&app, alice, second_id).await;

    let (status, all) = call(&app, Method::GET, "/attempts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, on_first) = call(
        &app,
        Method::GET,
        &format!("/attempts?templateId={}", first_id),
        None,
    )
    .await;
    assert_eq!(on_first.as_array().unwrap().len(), 2);

    let (_, completed) = call(
        &app,
        Method::GET,
        &format!("/attempts?templateId={}&status=completed", first_id),
        None,
    )
    .await;
    let completed = completed.as_array().unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["id"], done["id"]);

    let (_, alices) = call(
        &app,
        Method::GET,
        &format!("/attempts?candidateId={}&status=in_progress", alice),
        None,
    )
    .await;
    let alices = alices.as_array().unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0]["templateId"], second_id);

    let (status, _) = call(&app, Method::GET, "/attempts?status=finished", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
