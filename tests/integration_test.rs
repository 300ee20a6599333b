//! Integration tests for the MBL API
//!
//! These tests verify the entire application stack including:
//! - HTTP routing
//! - Request/response handling and the `success` envelope
//! - Database operations
//! - Business-rule rejections

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use mbl::database::{init_db, seed_demo_clientes, AppState};
use mbl::handler::MAX_MONTO;
use mbl::model::{AdminStats, Kpis};
use mbl::route::create_app;

/// Helper function to create a test application with a temporary database
fn setup_test_app() -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    let db = init_db(db_path).expect("Failed to initialize test database");
    let app = create_app(AppState::new(db));

    (app, temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

async fn send(app: &axum::Router, method: &str, uri: &str, payload: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match payload {
        Some(payload) => {
            builder = builder.header("content-type", "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    (status, response_json(response.into_body()).await)
}

async fn create_cliente(app: &axum::Router, nombre: &str, cedula: &str) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/mbl/clientes",
        Some(json!({ "nombre": nombre, "cedula": cedula, "telefono": "3001234567", "email": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["cliente"]["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_create_cliente_success() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/mbl/clientes",
        Some(json!({
            "nombre": "Juan Perez",
            "cedula": "1020304050",
            "telefono": "3001234567",
            "email": "juan@example.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Cliente registrado exitosamente");
    assert_eq!(body["cliente"]["nombre"], "Juan Perez");
    assert_eq!(body["cliente"]["puntos"], 0);
}

#[tokio::test]
async fn test_create_cliente_blank_optional_fields_are_null() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/mbl/clientes",
        Some(json!({ "nombre": "Ana", "cedula": "77", "telefono": "  ", "email": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["cliente"]["telefono"].is_null());
    assert!(body["cliente"]["email"].is_null());
}

#[tokio::test]
async fn test_create_cliente_duplicate_cedula() {
    let (app, _temp_db) = setup_test_app();
    create_cliente(&app, "Juan Perez", "555").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/mbl/clientes",
        Some(json!({ "nombre": "Otro", "cedula": "555" })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("555"));
}

#[tokio::test]
async fn test_create_cliente_validation() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(&app, "POST", "/api/mbl/clientes", Some(json!({ "nombre": "", "cedula": "1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "El nombre es obligatorio");

    let (status, body) = send(&app, "POST", "/api/mbl/clientes", Some(json!({ "nombre": "Ana" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "La cédula es obligatoria");

    let (status, _) = send(
        &app,
        "POST",
        "/api/mbl/clientes",
        Some(json!({ "nombre": "Ana", "cedula": "2", "email": "sin-arroba" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_keeps_envelope() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/mbl/clientes")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_list_clientes() {
    let (app, _temp_db) = setup_test_app();
    create_cliente(&app, "Uno", "1").await;
    create_cliente(&app, "Dos", "2").await;

    let (status, body) = send(&app, "GET", "/api/mbl/clientes", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let clientes = body["clientes"].as_array().unwrap();
    assert_eq!(clientes.len(), 2);
    assert_eq!(clientes[0]["nombre"], "Uno");
    assert_eq!(clientes[1]["cedula"], "2");
}

#[tokio::test]
async fn test_update_cliente_keeps_cedula() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Juan", "900").await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/mbl/clientes/{}", id),
        Some(json!({ "nombre": "Juan Carlos", "cedula": "111", "telefono": "", "email": "jc@example.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cliente actualizado exitosamente");
    assert_eq!(body["cliente"]["nombre"], "Juan Carlos");
    assert_eq!(body["cliente"]["cedula"], "900");
    assert_eq!(body["cliente"]["email"], "jc@example.com");
    assert!(body["cliente"]["telefono"].is_null());
}

#[tokio::test]
async fn test_update_cliente_not_found() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(&app, "PUT", "/api/mbl/clientes/42", Some(json!({ "nombre": "X" }))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_delete_cliente_removes_only_that_record() {
    let (app, _temp_db) = setup_test_app();
    let keep = create_cliente(&app, "Queda", "1").await;
    let gone = create_cliente(&app, "Sale", "2").await;

    let (status, body) = send(&app, "DELETE", &format!("/api/mbl/clientes/{}", gone), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_id"], gone);

    let (_, body) = send(&app, "GET", "/api/mbl/clientes", None).await;
    let clientes = body["clientes"].as_array().unwrap();
    assert_eq!(clientes.len(), 1);
    assert_eq!(clientes[0]["id"], keep);

    // the document id is free again
    create_cliente(&app, "Vuelve", "2").await;
}

#[tokio::test]
async fn test_delete_cliente_with_canjes_rejected() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Con canjes", "10").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/mbl/canjes",
        Some(json!({ "cliente_id": id, "monto": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "DELETE", &format!("/api/mbl/clientes/{}", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_delete_cliente_not_found() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(&app, "DELETE", "/api/mbl/clientes/999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cliente no encontrado");
}

#[tokio::test]
async fn test_create_canje_from_form_strings() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Maria Lopez", "2002").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/mbl/canjes")
                .header("content-type", "application/json")
                .header("X-Mbl-User", "cajero1")
                .body(Body::from(
                    json!({
                        "cliente_id": id.to_string(),
                        "monto": "25000.50",
                        "descripcion": "Bono"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["canje"]["monto"], 25000.5);
    assert_eq!(body["canje"]["cliente_nombre"], "Maria Lopez");
    assert_eq!(body["canje"]["cliente_cedula"], "2002");
    assert_eq!(body["canje"]["usuario_registro"], "cajero1");
}

#[tokio::test]
async fn test_create_canje_default_user() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Juan", "1").await;

    let (_, body) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": 10 }))).await;

    assert_eq!(body["canje"]["usuario_registro"], "sistema");
}

#[tokio::test]
async fn test_create_canje_validation() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Juan", "1").await;

    let (status, body) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": "", "monto": "100" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Debe seleccionar un cliente");

    let (status, body) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": "0" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "El monto debe ser mayor a cero");

    let (status, _) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": -5 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": "abc" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "El monto es obligatorio");

    let (status, _) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": 999, "monto": 10 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, "GET", "/api/mbl/canjes", None).await;
    assert!(body["canjes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_canje_rejects_amount_above_limit() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Juan", "1").await;

    for monto in [json!("1e308"), json!(MAX_MONTO * 2.0)] {
        let (status, body) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": monto }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "El monto no puede superar $1.000.000.000.000");
    }

    for _ in 0..2 {
        let (status, _) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": MAX_MONTO }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, "GET", "/api/mbl/analytics/kpis", None).await;
    let kpis: Kpis = serde_json::from_value(body["kpis"].clone()).unwrap();
    assert_eq!(kpis.today.monto, MAX_MONTO * 2.0);

    let (_, body) = send(&app, "GET", "/api/mbl/admin/stats", None).await;
    let stats: AdminStats = serde_json::from_value(body["stats"].clone()).unwrap();
    assert_eq!(stats.total_canjes, 2);
}

#[tokio::test]
async fn test_bad_path_and_query_keep_envelope() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(&app, "DELETE", "/api/mbl/canjes/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Identificador inválido");

    let (status, body) = send(&app, "DELETE", "/api/mbl/clientes/-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(&app, "PUT", "/api/mbl/clientes/abc", Some(json!({ "nombre": "Juan" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Identificador inválido");

    let (status, body) = send(&app, "GET", "/api/mbl/analytics/daily-sales?days=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("Parámetros inválidos"));

    let (status, body) = send(&app, "GET", "/api/mbl/analytics/top-clients?limit=-3", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_list_and_delete_canjes() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Juan", "1").await;

    let mut ids = Vec::new();
    for monto in [100, 200, 300] {
        let (_, body) = send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": monto }))).await;
        ids.push(body["canje"]["id"].as_u64().unwrap());
    }

    let (_, body) = send(&app, "GET", "/api/mbl/canjes", None).await;
    let canjes = body["canjes"].as_array().unwrap();
    assert_eq!(canjes.len(), 3);
    // newest first
    assert_eq!(canjes[0]["id"], ids[2]);

    let (status, body) = send(&app, "DELETE", &format!("/api/mbl/canjes/{}", ids[1]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Canje eliminado exitosamente");

    let (_, body) = send(&app, "GET", "/api/mbl/canjes", None).await;
    let remaining: Vec<u64> = body["canjes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_u64().unwrap())
        .collect();
    assert_eq!(remaining, vec![ids[2], ids[0]]);

    let (status, _) = send(&app, "DELETE", &format!("/api/mbl/canjes/{}", ids[1]), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analytics_endpoints() {
    let (app, _temp_db) = setup_test_app();
    let juan = create_cliente(&app, "Juan", "1").await;
    let maria = create_cliente(&app, "Maria", "2").await;

    for (cliente, monto) in [(juan, 1000), (juan, 500), (maria, 3000)] {
        send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": cliente, "monto": monto }))).await;
    }

    let (status, body) = send(&app, "GET", "/api/mbl/analytics/kpis", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kpis"]["today"]["canjes"], 3);
    assert_eq!(body["kpis"]["today"]["monto"], 4500.0);
    assert_eq!(body["kpis"]["today"]["promedio"], 1500.0);
    assert_eq!(body["kpis"]["month"]["clientes_activos"], 2);
    assert_eq!(body["kpis"]["top_client"]["nombre"], "Maria");

    let (_, body) = send(&app, "GET", "/api/mbl/analytics/daily-sales?days=7", None).await;
    assert_eq!(body["data"]["labels"].as_array().unwrap().len(), 7);
    assert_eq!(body["data"]["datasets"][0]["data"][6], 3.0);
    assert_eq!(body["data"]["datasets"][1]["data"][6], 4500.0);

    let (_, body) = send(&app, "GET", "/api/mbl/analytics/top-clients?limit=1", None).await;
    assert_eq!(body["data"]["labels"], json!(["Maria"]));
    assert_eq!(body["data"]["datasets"][0]["backgroundColor"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/mbl/analytics/trends", None).await;
    assert_eq!(body["trends"]["weekly_comparison"]["current_week"]["canjes"], 3);
    assert_eq!(body["trends"]["weekly_comparison"]["changes"]["canjes_percent"], 100.0);
    assert_eq!(body["trends"]["hourly_pattern"]["labels"].as_array().unwrap().len(), 24);
    assert_eq!(body["trends"]["weekday_ranking"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_stats() {
    let (app, _temp_db) = setup_test_app();
    let id = create_cliente(&app, "Juan", "1").await;
    create_cliente(&app, "Maria", "2").await;
    send(&app, "POST", "/api/mbl/canjes", Some(json!({ "cliente_id": id, "monto": 1234.5 }))).await;

    let (status, body) = send(&app, "GET", "/api/mbl/admin/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total_clientes"], 2);
    assert_eq!(body["stats"]["total_canjes"], 1);
    assert_eq!(body["stats"]["total_monto"], 1234.5);
    assert_eq!(body["stats"]["canjes_hoy"], 1);
}

#[tokio::test]
async fn test_logout() {
    let (app, _temp_db) = setup_test_app();

    let (status, body) = send(&app, "POST", "/api/mbl/logout", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_seed_demo_clientes_only_once() {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();

    assert_eq!(seed_demo_clientes(&db).unwrap(), 3);
    assert_eq!(seed_demo_clientes(&db).unwrap(), 0);

    let app = create_app(AppState::new(db));
    let (_, body) = send(&app, "GET", "/api/mbl/clientes", None).await;
    let clientes = body["clientes"].as_array().unwrap();
    assert_eq!(clientes.len(), 3);
    assert_eq!(clientes[1]["nombre"], "Maria Lopez");
    assert_eq!(clientes[1]["puntos"], 300);
}
