use axum::{
    extract::{Request, State},
    http::{Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::warn;

use crate::service::AppState;

/// Bearer-token check for mutating requests. Reads pass through.
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method();
    if *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match token {
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Access denied. No token provided." })),
        )
            .into_response(),
        Some(token) if !state.api_tokens.contains(token) => {
            warn!(path = %request.uri().path(), "rejected request with unknown token");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Invalid token." })),
            )
                .into_response()
        }
        Some(_) => next.run(request).await,
    }
}
