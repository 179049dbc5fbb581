use symptomcheck_core::config::AppConfig;
use symptomcheck_engine::traits::{
    BackendFailure, Content, GeneratedText, GenerativeBackend, Part, Role,
};
use symptomcheck_providers::gemini::{GeminiConfig, GeminiContent, GeminiPart};
use symptomcheck_providers::parse::GenerateContentReply;

/// `GenerativeBackend` over the Gemini REST API.
///
/// Errors Gemini reports itself (non-2xx bodies, blocked prompts) become
/// `BackendFailure::Api` so the gateway can classify them; transport and
/// decoding problems stay `Other`.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    cfg: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(cfg: GeminiConfig) -> Self {
        Self { cfg }
    }

    pub fn from_app_config(cfg: &AppConfig, api_key: impl Into<String>) -> Self {
        Self::new(GeminiConfig {
            base_url: cfg.base_url.clone(),
            api_key: api_key.into(),
            model: cfg.model.clone(),
            generation: cfg.generation.clone(),
            safety: cfg.safety.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.cfg.model
    }
}

fn to_gemini(content: &Content) -> GeminiContent {
    GeminiContent {
        role: match content.role {
            Role::User => "user".into(),
            Role::Model => "model".into(),
        },
        parts: content
            .parts
            .iter()
            .map(|p| match p {
                Part::Text(text) => GeminiPart::Text(text.clone()),
                Part::Audio { mime_type, bytes } => GeminiPart::InlineData {
                    mime_type: mime_type.clone(),
                    bytes: bytes.clone(),
                },
            })
            .collect(),
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, contents: &[Content]) -> Result<GeneratedText, BackendFailure> {
        let contents: Vec<GeminiContent> = contents.iter().map(to_gemini).collect();
        let req =
            symptomcheck_providers::gemini::build_generate_content_request(&self.cfg, &contents)?;

        log::debug!("Gemini request: {req:?}");
        let resp = symptomcheck_providers::runtime::execute(&req).await?;

        if !resp.is_success() {
            let message = symptomcheck_providers::parse::parse_error_message(&resp.body)
                .unwrap_or_else(|| {
                    format!(
                        "Gemini request failed: status={} body={}",
                        resp.status,
                        String::from_utf8_lossy(&resp.body)
                    )
                });
            log::warn!("Gemini returned status {}: {message}", resp.status);
            return Err(BackendFailure::Api(message));
        }

        let text = match symptomcheck_providers::parse::parse_generate_content(&resp.body)? {
            GenerateContentReply::Text(text) => text,
            GenerateContentReply::Blocked(reason) => {
                log::warn!("Gemini blocked the prompt: {reason}");
                return Err(BackendFailure::Api(format!(
                    "prompt blocked by Gemini: {reason}"
                )));
            }
        };
        Ok(GeneratedText {
            text,
            model: self.cfg.model.clone(),
        })
    }
}
