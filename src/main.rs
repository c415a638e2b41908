mod analyzer;
mod backend;
mod config;
mod error;
mod handlers;
mod ingest;
mod report;
mod text;
mod types;

use axum::{
    Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use analyzer::SentimentClient;
use backend::HttpBackend;
use config::{ClientConfig, Config};
use handlers::{
    AppState, analyze_handler, batch_handler, file_handler, models_handler, stats_handler,
};

fn init_tracing(format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sentiment_dash=debug".into());

    if format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::parse();
    init_tracing(&config.log_format);

    let client_config = ClientConfig::from(&config);
    tracing::info!(
        api_url = %client_config.api_url,
        backup = ?client_config.backup_api_url,
        models = client_config.catalog.len(),
        max_text_length = client_config.max_text_length,
        "Starting sentiment service"
    );
    if client_config.api_token.is_none() {
        tracing::warn!("HUGGINGFACE_API_TOKEN is not set, analysis requests will be refused");
    }

    let backend = HttpBackend::new(config.request_timeout())?;
    let client = SentimentClient::new(client_config, Arc::new(backend));
    let state = AppState::new(Arc::new(client), config.csv_row_limit);

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = Router::new()
        .route("/models", get(models_handler))
        .route("/stats", post(stats_handler))
        .route("/analyze", post(analyze_handler))
        .route("/analyze/batch", post(batch_handler))
        .route("/analyze/file", post(file_handler))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(prometheus_layer),
        )
        .with_state(state);

    let listener = TcpListener::bind(&config.server_address()).await?;
    tracing::info!("Server running on http://{}", config.server_address());
    tracing::info!(
        "Batch pacing: {} ms, retry delay: {} s",
        config.batch_pacing_ms,
        config.retry_delay_secs
    );

    axum::serve(listener, app).await?;
    Ok(())
}
