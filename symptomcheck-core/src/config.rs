use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockThreshold {
    LowAndAbove,
    MediumAndAbove,
    OnlyHigh,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::DangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: BlockThreshold::MediumAndAbove,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub model: String,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default = "default_safety_settings")]
    pub safety: Vec<SafetySetting>,

    #[serde(default = "default_analyze_timeout_secs")]
    pub analyze_timeout_secs: u64,

    // Where recordings are written; `None` means the platform temp directory.
    #[serde(default)]
    pub recordings_dir: Option<String>,
}

fn default_analyze_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_take_defaults() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{"base_url":"https://example.com/v1beta","model":"gemini-1.5-flash"}"#,
        )
        .unwrap();
        assert_eq!(cfg.generation, GenerationConfig::default());
        assert_eq!(cfg.safety.len(), 3);
        assert!(
            cfg.safety
                .iter()
                .all(|s| s.threshold == BlockThreshold::MediumAndAbove)
        );
        assert_eq!(cfg.analyze_timeout_secs, 30);
        assert_eq!(cfg.recordings_dir, None);
    }
}
