use axum::{
    Router,
    extract::{FromRequest, Path, Query, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn, from_fn_with_state},
    response::{Json, Response},
    routing::{get, post, put},
};
use serde_json::{Value, json};
use std::{collections::HashSet, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::auth::require_bearer;
use crate::models::{
    ApplicationRecord, ClaimRecord, NewClaim, Page, PageQuery, StatusUpdate, ValidationError,
    parse_application,
};
use crate::store::{DocumentStore, ReviewOutcome};

type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_body(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

fn bad_request(err: ValidationError) -> ApiError {
    error_body(StatusCode::BAD_REQUEST, &err.0)
}

/// JSON body whose rejections use the `{error}` shape
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(error_body(rejection.status(), &rejection.body_text())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub api_tokens: Arc<HashSet<String>>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/applications", post(create_application).get(list_applications))
        .route("/applications/{id}/status", put(review_application))
        .route("/claims", post(create_claim).get(list_claims))
        .layer(from_fn_with_state(app_state.clone(), require_bearer))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "portal-api",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_application(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = parse_application(&body).map_err(bad_request)?;

    state.store.insert_application(&record).await.map_err(|e| {
        error!(error = %e, "failed to save application");
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while saving the application.",
        )
    })?;

    info!(application_id = %record.id, insurance_type = %record.insurance_type, "application saved");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Application saved successfully!", "id": record.id })),
    ))
}

async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<ApplicationRecord>> {
    let page = Page::try_from(query).map_err(bad_request)?;
    let records = state.store.list_applications(page).await.map_err(|e| {
        error!(error = %e, "failed to list applications");
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while fetching applications.",
        )
    })?;
    Ok(Json(records))
}

async fn review_application(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> ApiResult<ApplicationRecord> {
    let decision = update.decision().map_err(bad_request)?;
    let Ok(id) = Uuid::parse_str(&id) else {
        return Err(error_body(StatusCode::NOT_FOUND, "Application not found."));
    };

    let outcome = state
        .store
        .review_application(id, decision)
        .await
        .map_err(|e| {
            error!(application_id = %id, error = %e, "failed to review application");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while updating the application.",
            )
        })?;

    match outcome {
        ReviewOutcome::Reviewed(record) => {
            info!(application_id = %id, status = ?record.status, "application reviewed");
            Ok(Json(record))
        }
        ReviewOutcome::NotFound => Err(error_body(StatusCode::NOT_FOUND, "Application not found.")),
        ReviewOutcome::AlreadyReviewed(_) => Err(error_body(
            StatusCode::CONFLICT,
            "Application has already been reviewed.",
        )),
    }
}

async fn create_claim(
    State(state): State<AppState>,
    JsonBody(claim): JsonBody<NewClaim>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = claim.into_record().map_err(bad_request)?;

    state.store.insert_claim(&record).await.map_err(|e| {
        error!(error = %e, "failed to save claim");
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while submitting the claim.",
        )
    })?;

    info!(claim_id = %record.id, policy_type = %record.policy_type, "claim submitted");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Claim submitted successfully!", "id": record.id })),
    ))
}

async fn list_claims(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<ClaimRecord>> {
    let page = Page::try_from(query).map_err(bad_request)?;
    let records = state.store.list_claims(page).await.map_err(|e| {
        error!(error = %e, "failed to list claims");
        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "An error occurred while fetching claims.",
        )
    })?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationStatus;
    use crate::store::{InMemoryDocumentStore, StoreError};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, header};
    use tower::ServiceExt;

    const TOKEN: &str = "portal-token";

    struct FailingStore;

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn insert_application(&self, _: &ApplicationRecord) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn list_applications(&self, _: Page) -> Result<Vec<ApplicationRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn review_application(
            &self,
            _: Uuid,
            _: ApplicationStatus,
        ) -> Result<ReviewOutcome, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn insert_claim(&self, _: &ClaimRecord) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
        async fn list_claims(&self, _: Page) -> Result<Vec<ClaimRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolClosed))
        }
    }

    fn router(store: Arc<dyn DocumentStore>) -> Router {
        build_router(AppState {
            store,
            api_tokens: Arc::new(HashSet::from([TOKEN.to_string()])),
        })
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn mutations_require_a_known_bearer_token() {
        let app = router(Arc::new(InMemoryDocumentStore::new()));
        let body = json!({"type": "life", "formData": {}});

        let (status, value) = send(&app, Method::POST, "/applications", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(value["error"], "Access denied. No token provided.");

        let (status, value) =
            send(&app, Method::POST, "/applications", Some("other"), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Invalid token.");

        let (status, _) = send(&app, Method::GET, "/applications", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn saves_lists_and_reviews_applications() {
        let app = router(Arc::new(InMemoryDocumentStore::new()));

        let (status, value) = send(
            &app,
            Method::POST,
            "/applications",
            Some(TOKEN),
            Some(json!({
                "type": "bike",
                "formData": {"Bike Model": "Roadster", "Bike Year": "2021"},
                "recipientAddress": "0x0000000000000000000000000000000000000000"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(value["message"], "Application saved successfully!");
        let id = value["id"].as_str().unwrap().to_string();

        let (status, value) = send(&app, Method::GET, "/applications?page=1&limit=5", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value[0]["type"], "bike");
        assert_eq!(value[0]["status"], "pending");
        assert_eq!(value[0]["formData"]["Bike Model"], "Roadster");

        let uri = format!("/applications/{id}/status");
        let (status, value) = send(
            &app,
            Method::PUT,
            &uri,
            Some(TOKEN),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["status"], "approved");

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(TOKEN),
            Some(json!({"status": "rejected"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, value) = send(
            &app,
            Method::PUT,
            &uri,
            Some(TOKEN),
            Some(json!({"status": "pending"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Status must be 'approved' or 'rejected'.");

        let missing = format!("/applications/{}/status", Uuid::new_v4());
        let (status, _) = send(
            &app,
            Method::PUT,
            &missing,
            Some(TOKEN),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_application_body_is_rejected() {
        let app = router(Arc::new(InMemoryDocumentStore::new()));
        let (status, value) = send(
            &app,
            Method::POST,
            "/applications",
            Some(TOKEN),
            Some(json!({"formData": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "\"type\" is required");

        let (status, _) = send(&app, Method::GET, "/applications", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn claims_validate_and_paginate() {
        let app = router(Arc::new(InMemoryDocumentStore::new()));

        let (status, value) = send(
            &app,
            Method::POST,
            "/claims",
            Some(TOKEN),
            Some(json!({"policyType": "car"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Policy type and description are required.");

        for description in ["hail damage", "broken mirror"] {
            let (status, value) = send(
                &app,
                Method::POST,
                "/claims",
                Some(TOKEN),
                Some(json!({"policyType": "car", "description": description})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(value["message"], "Claim submitted successfully!");
        }

        let (status, value) = send(&app, Method::GET, "/claims?page=2&limit=1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["description"], "broken mirror");

        let (status, _) = send(&app, Method::GET, "/claims?limit=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn oversized_paging_is_rejected() {
        let app = router(Arc::new(InMemoryDocumentStore::new()));

        let (status, value) = send(
            &app,
            Method::GET,
            "/applications?page=18446744073709551615&limit=2",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "page and limit must be positive integers");

        let (status, value) = send(&app, Method::GET, "/claims?limit=1000", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "limit must not exceed 100");
    }

    #[tokio::test]
    async fn unreadable_bodies_are_reported_as_json() {
        let app = router(Arc::new(InMemoryDocumentStore::new()));

        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/claims")
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["error"].is_string());

        let request = axum::http::Request::builder()
            .method(Method::PUT)
            .uri(format!("/applications/{}/status", Uuid::new_v4()))
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::from(r#"{"status":"approved"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value["error"].is_string());
    }

    #[tokio::test]
    async fn store_failures_surface_as_server_errors() {
        let app = router(Arc::new(FailingStore));

        let (status, value) = send(
            &app,
            Method::POST,
            "/applications",
            Some(TOKEN),
            Some(json!({"type": "life", "formData": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], "An error occurred while saving the application.");

        let (status, value) = send(&app, Method::GET, "/claims", None, None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], "An error occurred while fetching claims.");
    }
}
