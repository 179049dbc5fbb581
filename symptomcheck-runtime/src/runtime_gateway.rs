use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use symptomcheck_core::config::AppConfig;
use symptomcheck_engine::gateway::AiGateway;

use crate::gemini::GeminiBackend;
use crate::secrets::{GEMINI_API_KEY_ENV, resolve_gemini_api_key};

/// Build a gateway from config, resolving the API key from the environment or keyring.
pub fn build_gateway_from_config(cfg: &AppConfig) -> anyhow::Result<AiGateway> {
    let api_key = resolve_gemini_api_key(std::env::var(GEMINI_API_KEY_ENV).ok())?
        .with_context(|| {
            format!("no Gemini API key: set {GEMINI_API_KEY_ENV} or store one in the keyring")
        })?;
    Ok(build_gateway_with_key(cfg, api_key))
}

pub fn build_gateway_with_key(cfg: &AppConfig, api_key: impl Into<String>) -> AiGateway {
    let backend = GeminiBackend::from_app_config(cfg, api_key);
    log::info!("Using Gemini model {}", backend.model());
    AiGateway::new(Arc::new(backend))
        .with_analyze_timeout(Duration::from_secs(cfg.analyze_timeout_secs))
}

/// Directory new recordings go to.
pub fn recordings_dir(cfg: &AppConfig) -> PathBuf {
    match &cfg.recordings_dir {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => std::env::temp_dir(),
    }
}
