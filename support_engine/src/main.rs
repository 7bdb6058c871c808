//! Entry point for the Support Engine binary.
//!
//! Running this binary starts an HTTP server exposing the assessment and
//! lead scoring API.  Settings are read from `SUPPORT_*` environment
//! variables (see [`support_engine::config`]); extra statutory years may be
//! supplied as JSON files in `SUPPORT_TABLES_DIR`.

use support_engine::config::AppConfig;
use support_engine::{api, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    telemetry::init(&config.log_level)?;
    api::serve(config).await
}
