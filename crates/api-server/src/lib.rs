//! HTTP front of the stock dashboard: one ticker-scoped route per metric
//! category, each answering with the normalized metric or a `{message}`
//! envelope.

use std::any::Any;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dashboard_core::{ErrorEnvelope, MetricError, Normalizer, Provider, Ticker};
use market_client::ProviderClient;
use metric_normalizers::{
    fetch_metric, BalanceSheetNormalizer, HistoricalNormalizer, HoldersNormalizer, IncomeStatementNormalizer,
    ProfileNormalizer, StatisticsNormalizer, StockPriceNormalizer, SustainabilityNormalizer,
};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
mod request_id;
mod security_headers;


pub use config::{HttpConfig, ServerConfig};
pub use request_id::REQUEST_ID_HEADER;

use request_id::request_id_middleware;
use security_headers::security_headers_middleware;

/// Shared handler state. The provider is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn Provider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

/// Error response: a status code and a `{message}` body.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<MetricError> for AppError {
    fn from(err: MetricError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", err);
        } else {
            tracing::warn!(status = status.as_u16(), "{}", err);
        }
        AppError::new(status, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorEnvelope { message: self.message })).into_response()
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

async fn not_found(uri: Uri) -> AppError {
    AppError::new(StatusCode::NOT_FOUND, format!("No route for {}", uri.path()))
}

/// Validates the ticker once, then fetches and normalizes one category.
async fn metric_handler<N: Normalizer>(
    State(state): State<AppState>,
    ticker: Result<Path<String>, PathRejection>,
) -> Result<Json<N::Output>, AppError> {
    let Path(raw) = ticker.map_err(|e| AppError::new(StatusCode::BAD_REQUEST, format!("Invalid ticker: {e}")))?;
    let ticker = Ticker::parse(&raw).map_err(MetricError::from)?;

    let metric = fetch_metric::<N>(&*state.provider, &ticker).await?;
    Ok(Json(metric))
}

fn metric_route<N: Normalizer>(router: Router<AppState>) -> Router<AppState> {
    let path = format!("/api/{}/:ticker", N::CATEGORY.route_segment());
    router.route(&path, get(metric_handler::<N>))
}

fn panic_message(err: &(dyn Any + Send)) -> &str {
    if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked: {}", panic_message(&*err));
    AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

fn cors_layer(http: &HttpConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = http
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, REQUEST_ID_HEADER])
        .expose_headers([REQUEST_ID_HEADER])
}

/// All routes plus middleware. Layers run outermost first: CORS, trace,
/// request ID, security headers, panic capture.
pub fn build_router(state: AppState, http: &HttpConfig) -> Router {
    let mut router = Router::new().route("/health", get(health));
    router = metric_route::<StockPriceNormalizer>(router);
    router = metric_route::<StatisticsNormalizer>(router);
    router = metric_route::<ProfileNormalizer>(router);
    router = metric_route::<HistoricalNormalizer>(router);
    router = metric_route::<HoldersNormalizer>(router);
    router = metric_route::<SustainabilityNormalizer>(router);
    router = metric_route::<BalanceSheetNormalizer>(router);
    router = metric_route::<IncomeStatementNormalizer>(router);

    router
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(http.enable_hsts, security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .layer(cors_layer(http))
        .with_state(state)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::warn!("Received SIGTERM, shutting down"),
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    tracing::info!("Configuration loaded: {:?}", config);

    let client = ProviderClient::new(config.provider.clone()).context("failed to build provider client")?;
    let app = build_router(AppState::new(Arc::new(client)), &config.http);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    tracing::info!("Stock dashboard API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}
