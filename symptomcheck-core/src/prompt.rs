use crate::types::{SymptomRecord, UrgencyLevel};

pub const DISCLAIMER: &str = "You are a helpful medical information assistant. This is not a \
medical diagnosis; always advise the user to consult a qualified healthcare professional.";

/// Instruction sent alongside recorded audio.
///
/// The reply is decoded as JSON, so the model is told to emit nothing else.
pub const SYMPTOM_EXTRACTION_PROMPT: &str = "Listen to this audio recording of a person \
describing how they feel. Extract every symptom they mention.\n\n\
Respond with ONLY a JSON array and no other text. Each element must be an object with:\n\
- \"name\": string, the symptom name\n\
- \"severity\": integer from 1 (barely noticeable) to 10 (unbearable); estimate if not stated\n\
- \"duration\": string, how long the symptom has lasted (use \"unknown\" if not stated)\n\
- \"description\": optional string with any extra detail\n\n\
Example: [{\"name\": \"Headache\", \"severity\": 6, \"duration\": \"2 days\", \
\"description\": \"worse in the morning\"}]";

pub fn format_symptom_line(symptom: &SymptomRecord) -> String {
    let mut line = format!(
        "{} (Severity: {}/10, Duration: {})",
        symptom.name, symptom.severity, symptom.duration
    );
    if let Some(desc) = symptom.description.as_ref() {
        line.push_str(" - ");
        line.push_str(desc);
    }
    line
}

pub fn build_diagnosis_prompt(symptoms: &[SymptomRecord]) -> String {
    let mut prompt = String::new();

    prompt.push_str(DISCLAIMER);
    prompt.push_str("\n\nThe user reports the following symptoms:\n");
    for symptom in symptoms {
        prompt.push_str("- ");
        prompt.push_str(&format_symptom_line(symptom));
        prompt.push('\n');
    }

    prompt.push_str("\nPlease provide:\n\n");

    prompt.push_str(
        "1. Possible Conditions: List the most likely conditions that could explain these \
symptoms, most likely first.\n\n",
    );

    prompt.push_str("2. Urgency Level: State exactly one of the following levels:\n");
    for level in UrgencyLevel::ALL {
        prompt.push_str(&format!("   - {}: {}\n", level.label(), level.guidance()));
    }
    prompt.push('\n');

    prompt.push_str(
        "3. Recommended Actions: Concrete next steps the person should take.\n\n\
4. Emergency Warning Signs: Symptoms that would mean they need emergency care right away.\n\n\
5. Self-Care: Safe measures that may relieve the symptoms in the meantime.\n",
    );

    prompt
}
