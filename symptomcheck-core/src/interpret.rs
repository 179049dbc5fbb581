use crate::text::strip_code_fences;
use crate::types::{DiagnosisResult, SymptomRecord, UrgencyLevel, now_unix_ms};
use thiserror::Error;

pub const UNDETERMINED_CONDITION: &str = "Unable to determine from symptoms provided";
pub const DEFAULT_RECOMMENDATION: &str = "Please consult a healthcare professional";

/// Best-effort scan of a free-text diagnosis reply.
///
/// This is a keyword heuristic, not a grammar: the reply format is only
/// loosely shaped by the prompt. Never fails.
pub fn interpret_diagnosis(raw: &str) -> DiagnosisResult {
    interpret_diagnosis_at(raw, now_unix_ms())
}

pub fn interpret_diagnosis_at(raw: &str, timestamp_unix_ms: i64) -> DiagnosisResult {
    let mut conditions: Vec<String> = Vec::new();
    let mut recommended: Option<String> = None;
    let mut urgency = UrgencyLevel::default();
    // No rule fills this slot, so notes always fall back to the raw reply.
    let notes: Option<String> = None;

    for line in raw.lines() {
        let lower = line.to_lowercase();

        if lower.contains("condition") || lower.contains("possible") {
            conditions.push(line.to_string());
        }

        if lower.contains("recommend") {
            recommended = Some(line.to_string());
        }

        // Only ever escalates to High; Low/Emergency are never read from the text.
        if lower.contains("urgency") || lower.contains("emergency") {
            urgency = UrgencyLevel::High;
        }
    }

    if conditions.is_empty() {
        conditions.push(UNDETERMINED_CONDITION.to_string());
    }

    DiagnosisResult {
        possible_conditions: conditions,
        recommended_actions: recommended.unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string()),
        urgency_level: urgency,
        additional_notes: notes.unwrap_or_else(|| raw.to_string()),
        timestamp_unix_ms,
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction reply is not a valid symptom list: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Decodes the JSON array returned for an audio recording.
///
/// Any missing field, blank name or out-of-range severity rejects the whole reply.
pub fn parse_extracted_symptoms(raw: &str) -> Result<Vec<SymptomRecord>, ExtractionError> {
    let cleaned = strip_code_fences(raw);
    let symptoms: Vec<SymptomRecord> = serde_json::from_str(&cleaned)?;
    Ok(symptoms)
}
