pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod safety;

#[cfg(test)]
mod phi_audit;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use config::ServiceConfig;
use safety::{DefaultSafetyEngine, InteractionKnowledgeBase};

/// Build the engine described by `config`: rule set from file or the bundled
/// one, and the audit database when persistence is enabled.
pub fn build_engine(config: &ServiceConfig) -> Result<DefaultSafetyEngine, String> {
    let knowledge = match &config.knowledge_base_path {
        Some(path) => InteractionKnowledgeBase::load(path),
        None => InteractionKnowledgeBase::bundled(),
    }
    .map_err(|e| e.to_string())?;

    match &config.audit_db_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Cannot create audit directory: {e}"))?;
            }
            DefaultSafetyEngine::with_audit_db(knowledge, path, config.audit_flush_threshold)
                .map_err(|e| e.to_string())
        }
        None => {
            tracing::warn!("Override audit persistence disabled, events kept in memory only");
            Ok(DefaultSafetyEngine::new(knowledge))
        }
    }
}

pub async fn run() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let service_config = ServiceConfig::from_env().map_err(|e| e.to_string())?;
    let engine = Arc::new(build_engine(&service_config)?);

    let mut server = api::start_server(Arc::clone(&engine), service_config.bind_addr).await?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for shutdown signal: {e}"))?;

    server.shutdown();
    if let Err(e) = engine.flush_audit() {
        tracing::error!("Final override audit flush failed: {e}");
    }
    tracing::info!(pending = engine.audit().buffer_len(), "{} stopped", config::APP_NAME);
    Ok(())
}
