//! HTTP request handlers for the MBL API
//!
//! This module implements:
//! - Client CRUD (`/clientes`)
//! - Voucher issue, listing and deletion (`/canjes`)
//! - Analytics and admin figures computed from the voucher list
//! - Logout acknowledgement
//!
//! Every response carries a `success` flag; failures go through [`ApiError`].

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::analytics;
use crate::database::{self, AppState, ClienteUpdate, NewCanje, NewCliente};
use crate::error::{ApiError, ApiResult};
use crate::format::format_money;
use crate::middleware::issuing_user;
use crate::model::{CanjeRequest, ClienteRequest, DailySalesParams, TopClientsParams};

/// Largest amount a single voucher may carry
pub const MAX_MONTO: f64 = 1_000_000_000_000.0;

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::Validation(format!("Solicitud inválida: {}", rejection.body_text())))
}

fn path_id(id: Result<Path<u64>, PathRejection>) -> ApiResult<u64> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::Validation("Identificador inválido".into()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::Validation(format!("Parámetros inválidos: {}", rejection.body_text())))
}

fn validate_email(email: &Option<String>) -> ApiResult<()> {
    match email {
        Some(address) if !address.contains('@') => {
            Err(ApiError::Validation("El email no es válido".into()))
        }
        _ => Ok(()),
    }
}

/// Lists all clients
///
/// # Response
///
/// ```json
/// { "success": true, "clientes": [ ... ] }
/// ```
pub async fn list_clientes(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let clientes = database::list_clientes(&state.db)?;
    Ok(Json(json!({ "success": true, "clientes": clientes })))
}

/// Registers a new client
///
/// # Response
///
/// - **201 Created** - client stored
/// - **400 Bad Request** - missing name or document id, malformed email
/// - **409 Conflict** - document id already registered
pub async fn create_cliente(
    State(state): State<AppState>,
    payload: Result<Json<ClienteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload = body(payload)?;

    let nombre = payload.nombre.trim().to_string();
    let cedula = non_empty(payload.cedula);
    let email = non_empty(payload.email);

    if nombre.is_empty() {
        return Err(ApiError::Validation("El nombre es obligatorio".into()));
    }
    let cedula = cedula.ok_or_else(|| ApiError::Validation("La cédula es obligatoria".into()))?;
    validate_email(&email)?;

    let cliente = database::insert_cliente(
        &state.db,
        NewCliente {
            nombre,
            cedula,
            telefono: non_empty(payload.telefono),
            email,
            puntos: 0,
        },
    )?;

    tracing::info!(cliente_id = cliente.id, "cliente created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Cliente registrado exitosamente",
            "cliente": cliente
        })),
    ))
}

/// Updates name, phone and email of a client; the document id never changes
pub async fn update_cliente(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ClienteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(id)?;
    let payload = body(payload)?;

    let nombre = payload.nombre.trim().to_string();
    if nombre.is_empty() {
        return Err(ApiError::Validation("El nombre es obligatorio".into()));
    }
    let email = non_empty(payload.email);
    validate_email(&email)?;

    let cliente = database::update_cliente(
        &state.db,
        id,
        ClienteUpdate {
            nombre,
            telefono: non_empty(payload.telefono),
            email,
        },
    )?;

    tracing::info!(cliente_id = id, "cliente updated");

    Ok(Json(json!({
        "success": true,
        "message": "Cliente actualizado exitosamente",
        "cliente": cliente
    })))
}

/// Deletes a client
///
/// # Response
///
/// - **200 OK** - client deleted
/// - **404 Not Found** - no such client
/// - **409 Conflict** - the client has vouchers
pub async fn delete_cliente(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(id)?;
    database::delete_cliente(&state.db, id)?;

    tracing::info!(cliente_id = id, "cliente deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Cliente eliminado exitosamente",
        "deleted_id": id
    })))
}

/// Lists all vouchers, newest first
pub async fn list_canjes(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let canjes = database::list_canjes(&state.db)?;
    Ok(Json(json!({ "success": true, "canjes": canjes })))
}

/// Issues a voucher
///
/// `cliente_id` and `monto` may arrive as numbers or as the raw strings of an
/// HTML form. The issuing user is taken from the `X-Mbl-User` header.
///
/// # Response
///
/// - **201 Created** - voucher stored
/// - **400 Bad Request** - no client selected, amount missing or not positive
/// - **404 Not Found** - client does not exist
pub async fn create_canje(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CanjeRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let payload = body(payload)?;

    let cliente_id = payload
        .cliente_id
        .as_ref()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| ApiError::Validation("Debe seleccionar un cliente".into()))?;

    let monto = payload
        .monto
        .as_ref()
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ApiError::Validation("El monto es obligatorio".into()))?;
    if monto <= 0.0 {
        return Err(ApiError::Validation("El monto debe ser mayor a cero".into()));
    }
    if monto > MAX_MONTO {
        return Err(ApiError::Validation(format!(
            "El monto no puede superar {}",
            format_money(MAX_MONTO)
        )));
    }

    let canje = database::insert_canje(
        &state.db,
        NewCanje {
            cliente_id,
            monto,
            descripcion: non_empty(payload.descripcion),
            usuario_registro: issuing_user(&headers),
        },
    )?;

    tracing::info!(canje_id = canje.id, cliente_id, monto, "canje registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Canje registrado exitosamente",
            "canje": canje
        })),
    ))
}

pub async fn delete_canje(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = path_id(id)?;
    database::delete_canje(&state.db, id)?;

    tracing::info!(canje_id = id, "canje deleted");

    Ok(Json(json!({
        "success": true,
        "message": "Canje eliminado exitosamente",
        "deleted_id": id
    })))
}

pub async fn analytics_kpis(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let canjes = database::list_canjes(&state.db)?;
    let kpis = analytics::kpis(&canjes, Utc::now());
    Ok(Json(json!({ "success": true, "kpis": kpis })))
}

/// `GET /analytics/daily-sales?days=30`
pub async fn analytics_daily_sales(
    State(state): State<AppState>,
    params: Result<Query<DailySalesParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let params = query(params)?;
    let canjes = database::list_canjes(&state.db)?;
    let data = analytics::daily_sales(&canjes, Utc::now(), params.days);
    Ok(Json(json!({ "success": true, "data": data })))
}

/// `GET /analytics/top-clients?limit=10`
pub async fn analytics_top_clients(
    State(state): State<AppState>,
    params: Result<Query<TopClientsParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let params = query(params)?;
    let canjes = database::list_canjes(&state.db)?;
    let data = analytics::top_clients(&canjes, params.limit);
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn analytics_trends(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let canjes = database::list_canjes(&state.db)?;
    let trends = analytics::trends(&canjes, Utc::now());
    Ok(Json(json!({ "success": true, "trends": trends })))
}

pub async fn admin_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let clientes = database::list_clientes(&state.db)?;
    let canjes = database::list_canjes(&state.db)?;
    let stats = analytics::admin_stats(&clientes, &canjes, Utc::now());
    Ok(Json(json!({ "success": true, "stats": stats })))
}

/// Acknowledges a logout
///
/// Sessions live on the client, so there is nothing to revoke here; the
/// endpoint exists so the dashboard can clear its storage on a confirmed
/// answer.
pub async fn logout(headers: HeaderMap) -> impl IntoResponse {
    tracing::info!(user = %issuing_user(&headers), "logout");
    Json(json!({ "success": true, "message": "Sesión cerrada" }))
}
