//! HTTP-level integration tests for assignment, responses and submission.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, docente_token, get, post_json, put_json, seed_draft,
    seed_draft_with_content, seed_indicator, seed_module, DOCENTE_ID, OTHER_DOCENTE_ID,
};
use rubrica_core::assessment::{IndicatorCategory, TransformationArea};
use rubrica_core::types::DbId;
use rubrica_db::repositories::TemplateRepo;
use serde_json::json;
use sqlx::PgPool;

/// Publish a template with one indicator of each category.
/// Returns `(template_id, [cobertura, frecuencia, profundidad] indicator ids)`.
async fn seed_mixed_template(pool: &PgPool) -> (DbId, [DbId; 3]) {
    let template = seed_draft(pool, TransformationArea::Aprendizaje, "Mixta").await;
    let module = seed_module(pool, template.id, "Módulo").await;
    let coverage = seed_indicator(pool, module.id, "Cobertura", IndicatorCategory::Cobertura).await;
    let frequency =
        seed_indicator(pool, module.id, "Frecuencia", IndicatorCategory::Frecuencia).await;
    let depth =
        seed_indicator(pool, module.id, "Profundidad", IndicatorCategory::Profundidad).await;
    TemplateRepo::publish(pool, template.id, common::ADMIN_ID)
        .await
        .unwrap()
        .unwrap();
    (template.id, [coverage.id, frequency.id, depth.id])
}

async fn assign_to(pool: &PgPool, template_id: DbId, user_id: DbId) -> serde_json::Value {
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/templates/{template_id}/instances"),
        &admin_token(),
        json!({"user_id": user_id}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

fn responses_uri(instance_id: i64) -> String {
    format!("/api/v1/instances/{instance_id}/responses")
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assign_creates_pending_instance(pool: PgPool) {
    let (template_id, _) = seed_mixed_template(&pool).await;

    let instance = assign_to(&pool, template_id, DOCENTE_ID).await;
    assert_eq!(instance["status"], "pending");
    assert_eq!(instance["transformation_year"], 1);
    assert_eq!(instance["user_id"], DOCENTE_ID);
    assert_eq!(instance["template_version"], 1);
    assert!(instance["snapshot_id"].is_number());

    let app = common::build_test_app(pool);
    let list = body_json(
        get(
            app,
            &format!("/api/v1/templates/{template_id}/instances"),
            &admin_token(),
        )
        .await,
    )
    .await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assign_twice_conflicts(pool: PgPool) {
    let (template_id, _) = seed_mixed_template(&pool).await;
    assign_to(&pool, template_id, DOCENTE_ID).await;

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/templates/{template_id}/instances"),
        &admin_token(),
        json!({"user_id": DOCENTE_ID}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assign_draft_or_archived_is_rejected(pool: PgPool) {
    let (draft, _, _) =
        seed_draft_with_content(&pool, TransformationArea::Proposito, "Borrador").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/templates/{}/instances", draft.id),
        &admin_token(),
        json!({"user_id": DOCENTE_ID}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let (template_id, _) = seed_mixed_template(&pool).await;
    TemplateRepo::archive(&pool, template_id, common::ADMIN_ID)
        .await
        .unwrap()
        .unwrap();

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        &format!("/api/v1/templates/{template_id}/instances"),
        &admin_token(),
        json!({"user_id": DOCENTE_ID}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_response_starts_instance(pool: PgPool) {
    let (template_id, [coverage, _, _]) = seed_mixed_template(&pool).await;
    let instance = assign_to(&pool, template_id, DOCENTE_ID).await;
    let instance_id = instance["id"].as_i64().unwrap();
    let token = docente_token(DOCENTE_ID);

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &responses_uri(instance_id),
        &token,
        json!({"indicator_id": coverage, "coverage_value": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["coverage_value"], true);
    assert_eq!(json["responded_by"], DOCENTE_ID);

    // Saving again overwrites instead of adding a row.
    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &responses_uri(instance_id),
        &token,
        json!({"indicator_id": coverage, "coverage_value": false}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let detail = body_json(get(app, &format!("/api/v1/instances/{instance_id}"), &token).await)
        .await;
    assert_eq!(detail["instance"]["status"], "in_progress");
    assert!(detail["instance"]["started_at"].is_string());
    assert_eq!(detail["responses"].as_array().unwrap().len(), 1);
    assert_eq!(detail["responses"][0]["coverage_value"], false);
    assert_eq!(detail["content"]["modules"][0]["indicators"].as_array().unwrap().len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_response_values_are_checked_per_category(pool: PgPool) {
    let (template_id, [coverage, frequency, depth]) = seed_mixed_template(&pool).await;
    let instance = assign_to(&pool, template_id, DOCENTE_ID).await;
    let uri = responses_uri(instance["id"].as_i64().unwrap());
    let token = docente_token(DOCENTE_ID);

    let invalid = [
        json!({"indicator_id": coverage}),
        json!({"indicator_id": frequency, "frequency_value": -1.0, "frequency_unit": "semana"}),
        json!({"indicator_id": frequency, "frequency_value": 2.0, "frequency_unit": "dia"}),
        json!({"indicator_id": frequency, "frequency_value": 2.0}),
        json!({"indicator_id": depth, "profundity_level": 5}),
        json!({"indicator_id": 999999, "coverage_value": true}),
    ];
    for body in invalid {
        let app = common::build_test_app(pool.clone());
        let response = put_json(app, &uri, &token, body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }

    let valid = [
        json!({"indicator_id": frequency, "frequency_value": 2.0, "frequency_unit": "mes"}),
        json!({"indicator_id": depth, "profundity_level": 4, "rationale": "Práctica instalada"}),
    ];
    for body in valid {
        let app = common::build_test_app(pool.clone());
        let response = put_json(app, &uri, &token, body.clone()).await;
        assert_eq!(response.status(), StatusCode::OK, "body: {body}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_other_user_cannot_touch_instance(pool: PgPool) {
    let (template_id, [coverage, _, _]) = seed_mixed_template(&pool).await;
    let instance = assign_to(&pool, template_id, DOCENTE_ID).await;
    let instance_id = instance["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &responses_uri(instance_id),
        &docente_token(OTHER_DOCENTE_ID),
        json!({"indicator_id": coverage, "coverage_value": true}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Template admins may read any instance.
    let app = common::build_test_app(pool);
    let response = get(app, &responses_uri(instance_id), &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_requires_every_indicator(pool: PgPool) {
    let (template_id, [coverage, frequency, depth]) = seed_mixed_template(&pool).await;
    let instance = assign_to(&pool, template_id, DOCENTE_ID).await;
    let instance_id = instance["id"].as_i64().unwrap();
    let token = docente_token(DOCENTE_ID);
    let submit_uri = format!("/api/v1/instances/{instance_id}/submit");

    let app = common::build_test_app(pool.clone());
    put_json(
        app,
        &responses_uri(instance_id),
        &token,
        json!({"indicator_id": coverage, "coverage_value": true}),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, &submit_uri, &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Faltan 2 indicadores por responder"
    );

    for body in [
        json!({"indicator_id": frequency, "frequency_value": 1.0, "frequency_unit": "semana"}),
        json!({"indicator_id": depth, "profundity_level": 3}),
    ] {
        let app = common::build_test_app(pool.clone());
        put_json(app, &responses_uri(instance_id), &token, body).await;
    }

    let app = common::build_test_app(pool.clone());
    let response = post_json(app, &submit_uri, &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["instance"]["status"], "completed");
    assert!(json["instance"]["completed_at"].is_string());
    // (100 + 1 + 75) / 3 with equal indicator weights.
    assert_eq!(json["result"]["total_score"], 58.67);
    assert_eq!(json["result"]["overall_level"], 2);
    assert_eq!(json["result"]["expected_level"], 1);
    assert_eq!(json["result"]["meets_expectations"], true);

    // Completed instances are read-only.
    let app = common::build_test_app(pool.clone());
    let response = put_json(
        app,
        &responses_uri(instance_id),
        &token,
        json!({"indicator_id": coverage, "coverage_value": false}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let app = common::build_test_app(pool);
    let response = post_json(app, &submit_uri, &token, json!({})).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_submit_scores_against_transformation_year(pool: PgPool) {
    let (template_id, [coverage, frequency, depth]) = seed_mixed_template(&pool).await;
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/templates/{template_id}/instances"),
        &admin_token(),
        json!({"user_id": DOCENTE_ID, "transformation_year": 5}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let instance = body_json(response).await;
    assert_eq!(instance["transformation_year"], 5);
    let instance_id = instance["id"].as_i64().unwrap();
    let token = docente_token(DOCENTE_ID);
    let results_uri = format!("/api/v1/instances/{instance_id}/results");

    let app = common::build_test_app(pool.clone());
    let response = get(app, &results_uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for body in [
        json!({"indicator_id": coverage, "coverage_value": false}),
        json!({"indicator_id": frequency, "frequency_value": 100.0, "frequency_unit": "mes"}),
        json!({"indicator_id": depth, "profundity_level": 2}),
    ] {
        let app = common::build_test_app(pool.clone());
        put_json(app, &responses_uri(instance_id), &token, body).await;
    }

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        &format!("/api/v1/instances/{instance_id}/submit"),
        &token,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let response = get(app, &results_uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["total_score"], 50.0);
    assert_eq!(result["overall_level"], 2);
    assert_eq!(result["expected_level"], 3);
    assert_eq!(result["meets_expectations"], false);
    let modules = result["module_scores"].as_array().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0]["moduleScore"], 50.0);
    assert_eq!(modules[0]["indicators"][1]["normalizedScore"], 100.0);

    let app = common::build_test_app(pool);
    let detail = body_json(get(app, &format!("/api/v1/instances/{instance_id}"), &token).await).await;
    assert_eq!(detail["result"]["total_score"], 50.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assign_rejects_transformation_year_out_of_range(pool: PgPool) {
    let (template_id, _) = seed_mixed_template(&pool).await;

    for year in [0, 6] {
        let app = common::build_test_app(pool.clone());
        let response = post_json(
            app,
            &format!("/api/v1/templates/{template_id}/instances"),
            &admin_token(),
            json!({"user_id": DOCENTE_ID, "transformation_year": year}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_instance_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/instances/999999", &admin_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
