use crate::auth::{IdentityProvider, Submitter};
use crate::error::TerritorialError;
use crate::pipeline::ingestion::IngestProgress;
use crate::pipeline::read::Selections;
use crate::service::TerritorialService;
use crate::storage::PointStore;
use axum::{
    body::Bytes,
    extract::Query,
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

/// Builds the store an authenticated upload writes through, given the caller's access token
pub type StoreForToken = Arc<dyn Fn(&str) -> Arc<dyn PointStore> + Send + Sync>;

pub struct AppState {
    pub service: Arc<TerritorialService>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store_for_token: StoreForToken,
}

/// Maps library errors onto HTTP statuses with a JSON `{ "error": ... }` body
pub struct ApiError(TerritorialError);

impl From<TerritorialError> for ApiError {
    fn from(e: TerritorialError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            TerritorialError::Schema { .. } | TerritorialError::Spreadsheet(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            TerritorialError::Auth(_) => StatusCode::UNAUTHORIZED,
            TerritorialError::StorageWrite { .. }
            | TerritorialError::StorageRead { .. }
            | TerritorialError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request failed with {}: {}", status, self.0);
        let mut body = serde_json::json!({ "error": self.0.to_string() });
        if let TerritorialError::StorageWrite {
            batch_index,
            committed_records,
            ..
        } = &self.0
        {
            body["batch_index"] = (*batch_index).into();
            body["committed_records"] = (*committed_records).into();
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "territorial-intel",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn points(
    Extension(state): Extension<Arc<AppState>>,
    Query(selections): Query<Selections>,
) -> ApiResult<crate::view::MapView> {
    Ok(Json(state.service.view(&selections).await?))
}

async fn options(
    Extension(state): Extension<Arc<AppState>>,
    Query(selections): Query<Selections>,
) -> ApiResult<crate::pipeline::read::FilterOptions> {
    Ok(Json(state.service.options(&selections).await?))
}

async fn refresh(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    state.service.refresh();
    Json(serde_json::json!({ "status": "refreshed" }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<crate::auth::Session> {
    Ok(Json(state.identity.sign_in(&req.email, &req.password).await?))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, TerritorialError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TerritorialError::Auth("missing bearer token".to_string()))
}

/// Raw workbook upload. The submitter is whoever the bearer token belongs to.
async fn ingest(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<crate::pipeline::ingestion::IngestReport> {
    let token = bearer_token(&headers)?;
    let identity = state.identity.identify(token).await?;
    let submitter = Submitter::try_from(&identity)?;
    info!("📥 Upload of {} bytes from {}", body.len(), submitter);

    let store = (state.store_for_token)(token);
    let report = state
        .service
        .ingest_into(store, &body, &submitter, &mut |p: IngestProgress| {
            debug!("Ingest progress {}/{}", p.rows_scanned, p.total_rows)
        })
        .await?;
    Ok(Json(report))
}

pub fn create_server(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/points", get(points))
        .route("/api/options", get(options))
        .route("/api/refresh", post(refresh))
        .route("/api/login", post(login))
        .route("/api/ingest", post(ingest))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    state: Arc<AppState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_server(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("🗺️  Map data:     http://localhost:{port}/api/points");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
