use crate::request::JsonPost;
use anyhow::Context;
use base64::Engine;
use serde_json::{Value, json};
use symptomcheck_core::config::{BlockThreshold, GenerationConfig, HarmCategory, SafetySetting};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone, PartialEq)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub generation: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("generation", &self.generation)
            .field("safety", &self.safety)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiContent {
    // "user" or "model"
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeminiPart {
    Text(String),
    InlineData { mime_type: String, bytes: Vec<u8> },
}

pub fn build_generate_content_request(
    cfg: &GeminiConfig,
    contents: &[GeminiContent],
) -> anyhow::Result<JsonPost> {
    let url = join_url(&cfg.base_url, &format!("models/{}:generateContent", cfg.model));
    // Fail early on a bad base URL rather than inside reqwest.
    url::Url::parse(&url).with_context(|| format!("invalid Gemini endpoint: {url}"))?;

    let payload = json!({
        "contents": contents.iter().map(content_json).collect::<Vec<_>>(),
        "generationConfig": {
            "temperature": cfg.generation.temperature,
            "topK": cfg.generation.top_k,
            "topP": cfg.generation.top_p,
            "maxOutputTokens": cfg.generation.max_output_tokens,
        },
        "safetySettings": cfg.safety.iter().map(|s| json!({
            "category": harm_category_name(s.category),
            "threshold": threshold_name(s.threshold),
        })).collect::<Vec<_>>(),
    });

    Ok(JsonPost {
        url,
        headers: vec![
            ("Content-Type".into(), "application/json".into()),
            ("x-goog-api-key".into(), cfg.api_key.clone()),
        ],
        json: payload.to_string(),
    })
}

fn content_json(content: &GeminiContent) -> Value {
    let parts: Vec<Value> = content
        .parts
        .iter()
        .map(|p| match p {
            GeminiPart::Text(text) => json!({ "text": text }),
            GeminiPart::InlineData { mime_type, bytes } => json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(bytes),
                }
            }),
        })
        .collect();

    json!({ "role": content.role, "parts": parts })
}

fn harm_category_name(category: HarmCategory) -> &'static str {
    match category {
        HarmCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
        HarmCategory::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
        HarmCategory::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
    }
}

fn threshold_name(threshold: BlockThreshold) -> &'static str {
    match threshold {
        BlockThreshold::LowAndAbove => "BLOCK_LOW_AND_ABOVE",
        BlockThreshold::MediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
        BlockThreshold::OnlyHigh => "BLOCK_ONLY_HIGH",
        BlockThreshold::None => "BLOCK_NONE",
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use symptomcheck_core::config::default_safety_settings;

    fn cfg() -> GeminiConfig {
        GeminiConfig {
            base_url: "https://example.com/v1beta/".into(),
            api_key: "k".into(),
            model: "gemini-1.5-flash".into(),
            generation: GenerationConfig::default(),
            safety: default_safety_settings(),
        }
    }

    fn body_json(req: &JsonPost) -> Value {
        serde_json::from_str(&req.json).unwrap()
    }

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("https://example.com/v1beta/", "/models/m:generateContent"),
            "https://example.com/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn builds_keyed_request_with_fixed_settings() {
        let req = build_generate_content_request(
            &cfg(),
            &[GeminiContent {
                role: "user".into(),
                parts: vec![GeminiPart::Text("hi".into())],
            }],
        )
        .unwrap();

        assert_eq!(
            req.url,
            "https://example.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(req.header("x-goog-api-key"), Some("k"));

        let body = body_json(&req);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        let safety = body["safetySettings"].as_array().unwrap();
        assert_eq!(safety.len(), 3);
        assert!(
            safety
                .iter()
                .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE")
        );
        assert_eq!(safety[1]["category"], "HARM_CATEGORY_HATE_SPEECH");
    }

    #[test]
    fn inline_audio_is_base64_encoded() {
        let req = build_generate_content_request(
            &cfg(),
            &[GeminiContent {
                role: "user".into(),
                parts: vec![
                    GeminiPart::Text("extract".into()),
                    GeminiPart::InlineData {
                        mime_type: "audio/mp4".into(),
                        bytes: vec![1, 2, 3],
                    },
                ],
            }],
        )
        .unwrap();

        let body = body_json(&req);
        let inline = &body["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(inline["mimeType"], "audio/mp4");
        assert_eq!(inline["data"], "AQID");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let mut c = cfg();
        c.base_url = "not a url".into();
        assert!(build_generate_content_request(&c, &[]).is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut c = cfg();
        c.api_key = "AIza-very-secret".into();
        assert!(!format!("{c:?}").contains("AIza-very-secret"));
    }
}
