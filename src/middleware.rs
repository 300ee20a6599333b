use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::database::AppState;

/// Header carrying the username of whoever issues a voucher
pub const USER_HEADER: &str = "X-Mbl-User";

/// Username recorded when the request does not name one
pub const DEFAULT_USER: &str = "sistema";

/// Middleware to check for Authorization header
///
/// When the server is configured with a token, every request must carry it in
/// the `Authorization` header, either bare or as `Bearer <token>`. Without a
/// configured token the check is skipped.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(expected) = state.auth_token.as_deref() {
        let unauthorized_response = || {
            tracing::warn!(path = %request.uri().path(), "rejected request without valid token");
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "success": false,
                    "message": "No autorizado"
                })),
            )
                .into_response()
        };

        let presented = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value));

        if presented != Some(expected) {
            return Err(unauthorized_response());
        }
    }

    Ok(next.run(request).await)
}

/// Username from the `X-Mbl-User` header, or [`DEFAULT_USER`]
pub fn issuing_user(headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_USER)
        .to_string()
}
