use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, Path, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;
use wizard_flow::{FlowRunner, GraphError, SessionStorage};

use crate::clients::Wallet;
use crate::models::{InsuranceType, WizardEvent, WizardView};
use crate::tasks::session_keys;
use crate::workflow::{create_wizard_session, wizard_view};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn conflict_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

/// Largest accepted event body. Attachments arrive base64-encoded, so a batch
/// of several files at the attachment limit has to fit.
pub const MAX_EVENT_BODY_BYTES: usize = 64 * 1024 * 1024;

/// JSON body whose rejections use the service's `{error}` shape
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
            Err(rejection) => Err((
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub flow_runner: FlowRunner,
    pub wallet: Arc<dyn Wallet>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub response: Option<String>,
    pub execution_status: String,
    pub view: WizardView,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/wizard", post(start_wizard))
        .route("/wizard/{session_id}", get(get_wizard))
        .route(
            "/wizard/{session_id}/events",
            post(apply_event).layer(DefaultBodyLimit::max(MAX_EVENT_BODY_BYTES)),
        )
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add a correlation ID to all requests
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    let insurance_types: Vec<Value> = InsuranceType::ALL
        .iter()
        .map(|t| {
            json!({
                "id": t,
                "name": t.display_name(),
                "fields": t.field_set(),
            })
        })
        .collect();

    Json(json!({
        "service": "Insurance Application Wizard",
        "version": env!("CARGO_PKG_VERSION"),
        "insurance_types": insurance_types,
        "endpoints": {
            "POST /wizard": "Start a new application",
            "GET /wizard/{session_id}": "Current state of an application",
            "POST /wizard/{session_id}/events": "Apply one user action",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn start_wizard(State(state): State<AppState>) -> Result<(StatusCode, Json<WizardView>), ApiError> {
    let session = create_wizard_session(state.wallet.as_ref())
        .await
        .map_err(|e| internal_error("Failed to start application", &e.to_string()))?;
    let session_id = session.id.clone();
    let view = wizard_view(&session, false).await;

    state.session_storage.save(session).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "failed to save new session");
        internal_error("Failed to start application", &e.to_string())
    })?;

    info!(session_id = %session_id, "application wizard started");
    Ok((StatusCode::CREATED, Json(view)))
}

fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    if Uuid::parse_str(session_id).is_err() {
        return Err(bad_request_error("Invalid session ID format"));
    }
    Ok(())
}

async fn load_view(state: &AppState, session_id: &str) -> Result<WizardView, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) => {
            let submitting = state.flow_runner.is_running(session_id);
            Ok(wizard_view(&session, submitting).await)
        }
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to load session");
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn get_wizard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<WizardView> {
    validate_session_id(&session_id)?;
    load_view(&state, &session_id).await.map(Json)
}

async fn apply_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    JsonBody(event): JsonBody<WizardEvent>,
) -> ApiResult<EventResponse> {
    validate_session_id(&session_id)?;
    info!(session_id = %session_id, event = event.name(), "applying wizard event");

    let result = state
        .flow_runner
        .run_with_input(&session_id, session_keys::EVENT, &event)
        .await
        .map_err(|e| match e {
            GraphError::SessionNotFound(_) => not_found_error("Session not found", &session_id),
            GraphError::SessionBusy(_) => {
                conflict_error("A submission is already in progress", &session_id)
            }
            other => {
                error!(session_id = %session_id, error = %other, "wizard step failed");
                internal_error("Failed to apply event", &other.to_string())
            }
        })?;

    let view = load_view(&state, &session_id).await?;
    Ok(Json(EventResponse {
        response: result.response,
        execution_status: format!("{:?}", result.status),
        view,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::WalletConnection;
    use crate::models::{UploadedFile, WizardEvent, WizardStep};
    use crate::submission::SubmissionServices;
    use crate::testing::{FakeApi, FakeLedger, FakePinning, FakeWallet, connected_wallet};
    use crate::workflow::{build_wizard_graph, create_flow_runner};
    use axum::body::{Body, to_bytes};
    use axum::http::Request as HttpRequest;
    use chrono::TimeDelta;
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use wizard_flow::InMemorySessionStorage;

    fn app_with(pinning: Arc<FakePinning>, wallet: WalletConnection) -> Router {
        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let services = SubmissionServices {
            api: FakeApi::ok(),
            pinning,
            ledger: FakeLedger::ok(),
            shared_key: "k".to_string(),
        };
        let graph = build_wizard_graph(services, TimeDelta::seconds(5));
        build_router(AppState {
            session_storage: storage.clone(),
            flow_runner: create_flow_runner(graph, storage),
            wallet: Arc::new(FakeWallet(wallet)),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = HttpRequest::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn start(app: &Router) -> String {
        let (status, view) = send(app, "POST", "/wizard", None).await;
        assert_eq!(status, StatusCode::CREATED);
        view["session_id"].as_str().unwrap().to_string()
    }

    fn car_details() -> Value {
        json!({
            "event": "update_fields",
            "values": {
                "Vehicle Model": "X",
                "Vehicle Year": "2020",
                "Registration Number": "AB-123",
                "Vehicle Value": "20000"
            }
        })
    }

    fn one_pdf() -> Value {
        json!({
            "event": "attach_documents",
            "files": [{
                "file_name": "policy.pdf",
                "media_type": "application/pdf",
                "content_base64": "JVBERi0xLjQ="
            }]
        })
    }

    #[tokio::test]
    async fn walks_through_the_wizard_over_http() {
        let app = app_with(FakePinning::ok(), connected_wallet());
        let id = start(&app).await;
        let events = format!("/wizard/{id}/events");

        let (status, body) = send(&app, "POST", &events, Some(json!({"event": "select_type", "insurance_type": "car"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["step"], "entering_details");
        assert_eq!(body["view"]["fields"].as_array().unwrap().len(), 4);

        send(&app, "POST", &events, Some(car_details())).await;
        let (_, body) = send(&app, "POST", &events, Some(json!({"event": "continue_to_documents"}))).await;
        assert_eq!(body["view"]["step"], "uploading_documents");
        assert_eq!(body["view"]["can_submit"], false);

        let (_, body) = send(&app, "POST", &events, Some(one_pdf())).await;
        assert_eq!(body["view"]["can_submit"], true);

        let (status, body) = send(&app, "POST", &events, Some(json!({"event": "submit"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["execution_status"], "Completed");
        assert_eq!(body["view"]["step"], "completed");
        assert_eq!(body["view"]["celebrating"], true);

        let (status, view) = send(&app, "GET", &format!("/wizard/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["last_submission"]["receipts"].as_array().unwrap().len(), 1);
    }

    fn pdf_upload(name: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            media_type: "application/pdf".to_string(),
            content: vec![b'%'; size],
        }
    }

    #[tokio::test]
    async fn large_documents_reach_attachment_validation() {
        const MIB: usize = 1024 * 1024;
        let app = app_with(FakePinning::ok(), connected_wallet());
        let id = start(&app).await;
        let events = format!("/wizard/{id}/events");

        send(&app, "POST", &events, Some(json!({"event": "select_type", "insurance_type": "car"}))).await;
        send(&app, "POST", &events, Some(car_details())).await;
        send(&app, "POST", &events, Some(json!({"event": "continue_to_documents"}))).await;

        let attach = WizardEvent::AttachDocuments {
            files: vec![
                pdf_upload("medical.pdf", 5 * MIB),
                pdf_upload("scan.pdf", 11 * MIB),
            ],
        };
        let (status, body) = send(&app, "POST", &events, Some(serde_json::to_value(&attach).unwrap())).await;
        assert_eq!(status, StatusCode::OK);

        let attachments = body["view"]["attachments"].as_array().unwrap();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0]["file_name"], "medical.pdf");
        assert_eq!(attachments[0]["size"], 5 * MIB);
        assert_eq!(body["view"]["message"], "File size exceeds 10MB limit.");
    }

    #[tokio::test]
    async fn malformed_event_body_is_reported_as_json() {
        let app = app_with(FakePinning::ok(), connected_wallet());
        let id = start(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            &format!("/wizard/{id}/events"),
            Some(json!({"event": "fly_away"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("fly_away"));
    }

    #[tokio::test]
    async fn unknown_and_malformed_sessions() {
        let app = app_with(FakePinning::ok(), connected_wallet());

        let (status, _) = send(&app, "GET", "/wizard/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unknown = Uuid::new_v4();
        let (status, _) = send(
            &app,
            "POST",
            &format!("/wizard/{unknown}/events"),
            Some(json!({"event": "submit"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let app = app_with(FakePinning::gated(entered.clone(), release.clone()), connected_wallet());
        let id = start(&app).await;
        let events = format!("/wizard/{id}/events");

        send(&app, "POST", &events, Some(json!({"event": "select_type", "insurance_type": "car"}))).await;
        send(&app, "POST", &events, Some(car_details())).await;
        send(&app, "POST", &events, Some(json!({"event": "continue_to_documents"}))).await;
        send(&app, "POST", &events, Some(one_pdf())).await;

        let first = tokio::spawn({
            let app = app.clone();
            let events = events.clone();
            async move { send(&app, "POST", &events, Some(json!({"event": "submit"}))).await }
        });
        entered.notified().await;

        let (status, _) = send(&app, "POST", &events, Some(json!({"event": "submit"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, view) = send(&app, "GET", &format!("/wizard/{id}"), None).await;
        assert_eq!(view["submitting"], true);
        assert_eq!(view["can_submit"], false);

        release.notify_one();
        let (status, body) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["view"]["step"], "completed");
    }

    #[tokio::test]
    async fn start_records_missing_wallet_without_failing() {
        let app = app_with(
            FakePinning::ok(),
            WalletConnection::Unavailable {
                reason: "Please install a wallet".to_string(),
            },
        );
        let (status, view) = send(&app, "POST", "/wizard", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view["step"], serde_json::to_value(WizardStep::SelectingType).unwrap());
        assert_eq!(view["wallet"]["state"], "unavailable");
    }
}
