//! `creditchat serve`

use super::open_storage;
use crate::config::Config;
use crate::error::Result;
use crate::telemetry;
use std::sync::Arc;

/// Run the API server until interrupted
pub async fn run_serve(config: Config) -> Result<()> {
    telemetry::init_metrics_exporter();
    let storage = Arc::new(open_storage(&config)?);
    crate::server::serve(&config, storage).await
}
