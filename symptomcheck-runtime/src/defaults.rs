use symptomcheck_core::config::{AppConfig, GenerationConfig, default_safety_settings};
use symptomcheck_engine::gateway::ANALYZE_TIMEOUT;
use symptomcheck_providers::gemini::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

pub fn default_app_config() -> AppConfig {
    AppConfig {
        base_url: DEFAULT_GEMINI_BASE_URL.into(),
        model: DEFAULT_GEMINI_MODEL.into(),
        generation: GenerationConfig::default(),
        safety: default_safety_settings(),
        analyze_timeout_secs: ANALYZE_TIMEOUT.as_secs(),
        recordings_dir: None,
    }
}
