use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateContentReply {
    /// First candidate's text; `None` when the backend answered without any.
    Text(Option<String>),
    /// `promptFeedback.blockReason`: Gemini refused the prompt.
    Blocked(String),
}

/// Decodes a successful-status `generateContent` body.
pub fn parse_generate_content(body: &[u8]) -> anyhow::Result<GenerateContentReply> {
    let resp: GenerateContentResponse =
        serde_json::from_slice(body).context("decode Gemini JSON")?;

    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        return Ok(GenerateContentReply::Blocked(reason));
    }

    let texts: Vec<String> = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if texts.is_empty() {
        return Ok(GenerateContentReply::Text(None));
    }
    Ok(GenerateContentReply::Text(Some(texts.concat())))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Pulls `error.message` out of a non-2xx Gemini body, if present.
pub fn parse_error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
}
