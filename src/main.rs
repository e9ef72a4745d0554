use axum::{routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use og_grabber::config::{Config, FetchLimits};
use og_grabber::guard::{Blocklists, UrlGuard};
use og_grabber::handlers;
use og_grabber::state::AppState;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // Initialize tracing — JSON in production, human-readable in dev.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("og_grabber=info,tower_http=info"));

    if config.is_dev {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    }

    info!("🚀 OG Grabber starting...");

    let limits = FetchLimits::DEFAULT;
    info!(
        timeout_ms = limits.timeout.as_millis() as u64,
        max_html_bytes = limits.max_html_bytes,
        max_image_bytes = limits.max_image_bytes,
        "📝 Fetch limits loaded"
    );

    // Block-lists are built once here and shared read-only from then on.
    let app_state = AppState::new(UrlGuard::new(Blocklists::standard()), limits)
        .expect("Failed to build outbound HTTP client");

    // CORS: permissive in dev, restrictive in production.
    let cors = if config.is_dev {
        info!("🔓 CORS: permissive (dev mode)");
        CorsLayer::permissive()
    } else {
        tracing::warn!("🔒 CORS: restrictive (production mode)");
        CorsLayer::new()
    };

    // Prometheus metrics layer
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = Router::new()
        // Health check + metrics
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(move || async move { metric_handle.render() }),
        )
        // Outbound-fetch routes
        .route("/resolve", get(handlers::resolve::resolve_og))
        .route("/download", get(handlers::download::download_image))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(prometheus_layer)
        .layer(cors)
        .with_state(app_state);

    let addr = config.server_addr();
    info!("🎧 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
