//! Axiotome API Gateway
//!
//! HTTP edge for the book library core.
//! Handles:
//! - Request routing and validation
//! - Book registration wired to the index
//! - Question answering and summaries
//! - Observability (logging, metrics, request ids)

mod handlers;

use axiotome_common::{
    config::{AppConfig, ObservabilityConfig},
    context::{create_model, ModelClient},
    errors::Result as AppResult,
    metrics, VERSION,
};
use axiotome_context::AskService;
use axiotome_search::{InMemoryRegistry, Library, SearchService};
use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub search: Arc<SearchService>,
    pub ask: Arc<AskService>,
    pub library: Arc<Library>,
}

impl AppState {
    /// Build services with the model chosen by configuration
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let model = create_model(&config.model)?;
        Ok(Self::with_model(config, model))
    }

    pub fn with_model(config: AppConfig, model: Arc<dyn ModelClient>) -> Self {
        let search = Arc::new(SearchService::new(&config));
        let ask = Arc::new(AskService::new(&config, Arc::clone(&search), model));

        let library = Arc::new(Library::new(InMemoryRegistry::new(), Arc::clone(&search)));

        Self {
            config: Arc::new(config),
            search,
            ask,
            library,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.observability);
    info!("Starting Axiotome API Gateway v{}", VERSION);

    init_metrics(&config.observability)?;

    let grace = config.shutdown_timeout();
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = AppState::new(config)?;
    let indexed = state.library.rebuild();
    info!(
        books = indexed,
        model = state.ask.model_name(),
        "Library loaded"
    );

    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Connections get `grace` to drain once a shutdown signal arrives
    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    let drain_deadline = async move {
        match signalled_rx.await {
            Ok(()) => tokio::time::sleep(grace).await,
            Err(_) => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = server => result?,
        _ = drain_deadline => warn!(grace_secs = grace.as_secs(), "Shutdown timeout elapsed, dropping open connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the configured filter
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serve Prometheus metrics when a port is configured
fn init_metrics(config: &ObservabilityConfig) -> anyhow::Result<()> {
    metrics::register_metrics();

    if config.metrics_port == 0 {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Suffix("search_duration_seconds".to_string()),
            metrics::SEARCH_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("model_call_duration_seconds".to_string()),
            metrics::MODEL_BUCKETS,
        )?
        .install()?;

    info!(%addr, service = %config.service_name, "Prometheus exporter listening");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        .route("/search_books", post(handlers::search::search_books))
        .route("/ask_ai", post(handlers::ask::ask_ai))
        .route("/summarize", post(handlers::summarize::summarize))
        .route(
            "/books",
            get(handlers::books::list_books).post(handlers::books::add_book),
        )
        .route("/books/{id}", delete(handlers::books::delete_book));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct EchoModel;

    #[async_trait]
    impl ModelClient for EchoModel {
        async fn complete(&self, _prompt: &str) -> AppResult<String> {
            Ok("Rust uses ownership.".to_string())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn test_app() -> Router {
        create_router(AppState::with_model(AppConfig::default(), Arc::new(EchoModel)))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn add_book(app: &Router, title: &str, lines: &[&str]) -> i64 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/books",
                json!({ "title": title, "lines": lines }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["book"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_search_books_flow() {
        let app = test_app();
        add_book(&app, "Rust", &["Rust ownership model", "Go goroutines"]).await;
        let java = add_book(&app, "Java", &["Java streams"]).await;

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/search_books", json!({ "query": "ownership" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_results"], 1);
        assert_eq!(body["results"][0]["line_number"], 0);
        assert!(body["results"][0]["context"]
            .as_str()
            .unwrap()
            .contains("Rust ownership model"));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/books/{}", java))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/search_books", json!({ "query": "java" })))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["total_results"], 0);
    }

    #[tokio::test]
    async fn test_delete_unknown_book() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/books/42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "BOOK_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_search_rejects_overlong_query() {
        let response = test_app()
            .oneshot(json_request(
                "POST",
                "/api/search_books",
                json!({ "query": "rust ".repeat(400) }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ask_ai_returns_model_text() {
        let app = test_app();
        add_book(&app, "Rust", &["Rust ownership model"]).await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/ask_ai",
                json!({ "question": "What is ownership?" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["answer"], "Rust uses ownership.");
        assert_eq!(body["low_confidence"], false);
        assert_eq!(body["attempts"], 1);
    }

    #[tokio::test]
    async fn test_ask_ai_rejects_empty_question() {
        let response = test_app()
            .oneshot(json_request("POST", "/api/ask_ai", json!({ "question": "" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert_eq!(body["error"]["field"], "question");
    }

    #[tokio::test]
    async fn test_summarize_registered_book() {
        let app = test_app();
        let id = add_book(&app, "Rust", &["Rust ownership model"]).await;

        let response = app
            .oneshot(json_request("POST", "/api/summarize", json!({ "book_id": id })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["summary"], "Rust uses ownership.");
        assert_eq!(body["source_chars"], 20);
        assert_eq!(body["truncated"], false);
    }

    #[tokio::test]
    async fn test_summarize_requires_one_source() {
        let app = test_app();

        let neither = app
            .clone()
            .oneshot(json_request("POST", "/api/summarize", json!({})))
            .await
            .unwrap();
        assert_eq!(neither.status(), StatusCode::BAD_REQUEST);

        let both = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/summarize",
                json!({ "book_id": 1, "text": "Rust" }),
            ))
            .await
            .unwrap();
        assert_eq!(both.status(), StatusCode::BAD_REQUEST);

        let missing = app
            .oneshot(json_request("POST", "/api/summarize", json!({ "book_id": 42 })))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(missing).await["error"]["code"], "BOOK_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_ready_reports_index() {
        let app = test_app();
        add_book(&app, "Rust", &["Rust ownership model", "Borrow checker"]).await;

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["registered_books"], 1);
        assert_eq!(body["index"]["books"], 1);
        assert_eq!(body["index"]["lines"], 2);
        assert_eq!(body["model"], "echo");
    }
}
