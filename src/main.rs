//! Remediation Engine - diagnostic CLI
//!
//! Operator tool over the learning store: forecast an artifact, inspect
//! model and strategy statistics, force retraining, and manage config.

use remediation_engine::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for detail)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .init();

    cli::run().await
}
