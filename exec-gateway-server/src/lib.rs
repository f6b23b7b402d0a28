use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{CONTENT_TYPE, RETRY_AFTER},
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use exec_gateway::{
    failure, Error as GatewayError, ExecutionGateway, ExecutionRequest, FailureKind,
    NormalizedResponse, Quota, RequesterId, RATE_LIMITED_MESSAGE,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{net::SocketAddr, time::Duration};
use thiserror::Error;
use tokio::{net::TcpListener, time::Instant};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};

/// Header carrying the identity established by the upstream auth layer
pub const REQUESTER_HEADER: &str = "x-user-id";

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("Malformed request body: {detail}")]
    MalformedBody { detail: String, elapsed: Duration },
    #[error("{source}")]
    Gateway {
        source: GatewayError,
        elapsed: Duration,
    },
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Server error: {0}")]
    ServerError(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "success": false, "error": "authentication required" })),
            )
                .into_response(),
            ServerError::MalformedBody { detail, elapsed } => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                debug!(%detail, elapsed_ms, "rejected request body");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": "invalid request body",
                        "execution_time": elapsed_ms,
                    })),
                )
                    .into_response()
            }
            ServerError::Gateway { source, elapsed } => match source {
                GatewayError::RateLimited { limit, retry_after } => {
                    let retry_secs = ceil_secs(retry_after);
                    let mut headers = HeaderMap::new();
                    headers.insert(RETRY_AFTER, HeaderValue::from(retry_secs));
                    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
                    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(0u32));
                    headers.insert(RATELIMIT_RESET, HeaderValue::from(retry_secs));
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        headers,
                        Json(json!({
                            "success": false,
                            "error": RATE_LIMITED_MESSAGE,
                            "retry_after": retry_secs,
                        })),
                    )
                        .into_response()
                }
                other => {
                    let status = failure_status(other.failure_kind());
                    if status.is_server_error() {
                        error!(error = %other, "gateway error");
                    }
                    (status, Json(failure(&other, elapsed))).into_response()
                }
            },
            ServerError::Configuration(_) | ServerError::ServerError(_) => {
                error!(error = %self, "server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Body of `POST /execute`.
///
/// Fields are taken loosely so that absent, null or non-string values reach
/// validation and get its specific reason instead of a parse error.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ExecutePayload {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub language: Option<Value>,
    #[serde(default)]
    pub input: Option<Value>,
}

impl ExecutePayload {
    fn into_request(self, requester: RequesterId) -> ExecutionRequest {
        ExecutionRequest {
            language: text(self.language).unwrap_or_default(),
            code: text(self.code).unwrap_or_default(),
            input: text(self.input),
            requester,
        }
    }
}

fn text(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

#[derive(Clone)]
pub struct AppState {
    gateway: ExecutionGateway,
}

/// Build the router. An empty origin list allows any origin.
pub fn create_app(
    gateway: ExecutionGateway,
    allowed_origins: &[String],
) -> Result<Router, ServerError> {
    let cors = cors_layer(allowed_origins)?;
    let state = AppState { gateway };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/execute", post(execute))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, ServerError> {
    if allowed_origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| ServerError::Configuration(format!("bad origin {origin:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(REQUESTER_HEADER)])
        .expose_headers([
            RETRY_AFTER,
            RATELIMIT_LIMIT,
            RATELIMIT_REMAINING,
            RATELIMIT_RESET,
        ]))
}

/// Serve until `shutdown` is cancelled, then drain open connections
pub async fn run_server(
    app: Router,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    info!("Starting code execution gateway on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn health_check(State(state): State<AppState>) -> Response {
    let report = state.gateway.health().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn execute(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ExecutePayload>, JsonRejection>,
) -> Result<Response, ServerError> {
    let started = Instant::now();
    let requester = requester_id(&headers).ok_or(ServerError::Unauthenticated)?;
    let Json(payload) = payload.map_err(|e| ServerError::MalformedBody {
        detail: e.body_text(),
        elapsed: started.elapsed(),
    })?;
    let request = payload.into_request(requester);

    let executed = state
        .gateway
        .execute(request)
        .await
        .map_err(|source| ServerError::Gateway {
            source,
            elapsed: started.elapsed(),
        })?;

    let status = match &executed.response {
        NormalizedResponse::Success(_) => StatusCode::OK,
        NormalizedResponse::Failure(f) => failure_status(f.kind),
    };

    Ok((status, quota_headers(&executed.quota), Json(executed.response)).into_response())
}

fn failure_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Invalid | FailureKind::Rejected => StatusCode::BAD_REQUEST,
        FailureKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn requester_id(headers: &HeaderMap) -> Option<RequesterId> {
    headers
        .get(REQUESTER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(RequesterId::new)
}

fn quota_headers(quota: &Quota) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(quota.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(quota.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(quota.reset_after)));
    headers
}

/// Whole seconds, rounded up so clients never retry early
fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
