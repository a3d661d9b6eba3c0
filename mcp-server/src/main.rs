//! NASA Astronomy MCP Lambda - Serves the validate, get_apod_with_image and
//! get_planet tools over stateless streamable HTTP.
//!
//! Configuration is loaded once per cold start; a missing required value
//! fails the init phase instead of individual calls.

use lambda_http::{run, service_fn, Error};
use shared::{handle_request, Config, Dispatcher, HttpUpstream};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = Arc::new(Config::load().await?);
    let upstream = Arc::new(HttpUpstream::new(&config)?);
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&config), upstream));

    info!(
        server_name = %config.server_name,
        upstream_timeout_secs = config.upstream_timeout.as_secs(),
        max_image_bytes = config.max_image_bytes,
        "Starting NASA astronomy MCP server in stateless mode"
    );

    run(service_fn(move |event| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle_request(&dispatcher, event).await }
    }))
    .await
}
