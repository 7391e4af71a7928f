//! Shared helpers for the API integration tests.
//!
//! Every test file pulls this in with `mod common;`, so not every helper is
//! used by every file.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use rubrica_core::assessment::{IndicatorCategory, TransformationArea};
use rubrica_core::roles::{ROLE_ADMIN, ROLE_CONSULTOR, ROLE_DOCENTE};
use rubrica_core::types::DbId;
use rubrica_db::models::indicator::{CreateIndicator, Indicator};
use rubrica_db::models::snapshot::TemplateSnapshot;
use rubrica_db::models::template::{CreateTemplate, Template};
use rubrica_db::models::template_module::{CreateTemplateModule, TemplateModule};
use rubrica_db::repositories::{IndicatorRepo, TemplateModuleRepo, TemplateRepo};
use sqlx::PgPool;
use tower::ServiceExt;

use rubrica_api::auth::jwt::{generate_access_token, JwtConfig};
use rubrica_api::config::ServerConfig;
use rubrica_api::router::build_app_router;
use rubrica_api::state::AppState;

pub const ADMIN_ID: DbId = 1;
pub const CONSULTOR_ID: DbId = 2;
pub const DOCENTE_ID: DbId = 100;
pub const OTHER_DOCENTE_ID: DbId = 101;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router (same middleware stack as production).
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

pub fn admin_token() -> String {
    token_for(ADMIN_ID, ROLE_ADMIN)
}

pub fn consultor_token() -> String {
    token_for(CONSULTOR_ID, ROLE_CONSULTOR)
}

pub fn docente_token(user_id: DbId) -> String {
    token_for(user_id, ROLE_DOCENTE)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn get(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", bearer(token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn get_anonymous(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn with_json(
    app: Router,
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", bearer(token))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    with_json(app, "POST", uri, token, body).await
}

pub async fn put_json(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    with_json(app, "PUT", uri, token, body).await
}

/// POST with no body and no `Content-Type`, as the builder UI sends
/// publish and duplicate.
pub async fn post_empty(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", bearer(token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", bearer(token))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures (created through the repositories)
// ---------------------------------------------------------------------------

pub async fn seed_draft(pool: &PgPool, area: TransformationArea, name: &str) -> Template {
    let input = CreateTemplate {
        area,
        name: name.to_string(),
        description: Some("Rúbrica de prueba".to_string()),
        scoring_config: None,
    };
    TemplateRepo::create(pool, &input, name, ADMIN_ID).await.unwrap()
}

pub async fn seed_module(pool: &PgPool, template_id: DbId, name: &str) -> TemplateModule {
    let input = CreateTemplateModule {
        name: name.to_string(),
        description: None,
        instructions: Some("Responda con evidencia".to_string()),
        weight: None,
    };
    TemplateModuleRepo::create(pool, template_id, &input)
        .await
        .unwrap()
}

pub async fn seed_indicator(
    pool: &PgPool,
    module_id: DbId,
    name: &str,
    category: IndicatorCategory,
) -> Indicator {
    let frequency_unit_options = match category {
        IndicatorCategory::Frecuencia => Some(vec!["semana".to_string(), "mes".to_string()]),
        _ => None,
    };
    let input = CreateIndicator {
        code: None,
        name: name.to_string(),
        question: Some(format!("¿{name}?")),
        description: None,
        category,
        frequency_config: None,
        frequency_unit_options,
        level_0_descriptor: Some("Por comenzar".to_string()),
        level_1_descriptor: Some("Incipiente".to_string()),
        level_2_descriptor: Some("En desarrollo".to_string()),
        level_3_descriptor: Some("Avanzado".to_string()),
        level_4_descriptor: Some("Consolidado".to_string()),
        weight: Some(2.0),
    };
    IndicatorRepo::create(pool, module_id, &input).await.unwrap()
}

/// A draft with one module holding one `profundidad` indicator.
pub async fn seed_draft_with_content(
    pool: &PgPool,
    area: TransformationArea,
    name: &str,
) -> (Template, TemplateModule, Indicator) {
    let template = seed_draft(pool, area, name).await;
    let module = seed_module(pool, template.id, "Módulo 1").await;
    let indicator = seed_indicator(
        pool,
        module.id,
        "Planificación diferenciada",
        IndicatorCategory::Profundidad,
    )
    .await;
    (template, module, indicator)
}

/// A published template with one module and one `profundidad` indicator.
pub async fn seed_published(
    pool: &PgPool,
    area: TransformationArea,
    name: &str,
) -> (Template, TemplateSnapshot, Indicator) {
    let (template, _module, indicator) = seed_draft_with_content(pool, area, name).await;
    let (template, snapshot) = TemplateRepo::publish(pool, template.id, ADMIN_ID)
        .await
        .unwrap()
        .unwrap();
    (template, snapshot, indicator)
}
