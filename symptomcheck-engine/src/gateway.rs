use crate::conversation::{Conversation, Turn};
use crate::error::{GatewayError, classify_backend_failure};
use crate::traits::{Content, GenerativeBackend, Part, Role};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use symptomcheck_core::audio::{audio_mime_type_for, check_audio_size};
use symptomcheck_core::interpret::{interpret_diagnosis, parse_extracted_symptoms};
use symptomcheck_core::prompt::{SYMPTOM_EXTRACTION_PROMPT, build_diagnosis_prompt};
use symptomcheck_core::text::accept_reply_text;
use symptomcheck_core::types::{DiagnosisResult, SymptomRecord};
use tokio::sync::Mutex;

pub const ANALYZE_TIMEOUT: Duration = Duration::from_secs(30);

/// The only component that talks to the generative backend.
///
/// Diagnosis and follow-up calls share one conversation. The conversation
/// lock is held for the whole request/append cycle, so turns on one gateway
/// never interleave.
pub struct AiGateway {
    backend: Arc<dyn GenerativeBackend>,
    conversation: Mutex<Conversation>,
    analyze_timeout: Duration,
}

impl AiGateway {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            backend,
            conversation: Mutex::new(Conversation::new()),
            analyze_timeout: ANALYZE_TIMEOUT,
        }
    }

    pub fn with_analyze_timeout(mut self, timeout: Duration) -> Self {
        self.analyze_timeout = timeout;
        self
    }

    /// Sends the diagnosis prompt as a new chat turn and interprets the reply.
    pub async fn analyze_symptoms(
        &self,
        symptoms: &[SymptomRecord],
    ) -> Result<DiagnosisResult, GatewayError> {
        let prompt = build_diagnosis_prompt(symptoms);

        let mut conversation = self.conversation.lock().await;
        let request = conversation.request_with(&prompt);

        let t0 = Instant::now();
        let reply =
            match tokio::time::timeout(self.analyze_timeout, self.backend.generate(&request)).await
            {
                Ok(res) => res.map_err(classify_backend_failure)?,
                Err(_) => {
                    log::warn!(
                        "Diagnosis request timed out after {}ms",
                        self.analyze_timeout.as_millis()
                    );
                    return Err(GatewayError::Timeout(self.analyze_timeout));
                }
            };

        let text = accept_reply_text(reply.text).ok_or(GatewayError::EmptyResponse)?;
        log::info!(
            "Diagnosis reply from {} in {}ms ({} symptoms)",
            reply.model,
            t0.elapsed().as_millis(),
            symptoms.len()
        );

        conversation.push(prompt, text.clone());
        Ok(interpret_diagnosis(&text))
    }

    /// One-shot extraction of symptoms from a recording.
    ///
    /// Does not read or extend the conversation: each recording is interpreted on its own.
    pub async fn extract_symptoms_from_audio(
        &self,
        audio_path: &Path,
    ) -> Result<Vec<SymptomRecord>, GatewayError> {
        let read_err = |source: std::io::Error| GatewayError::ReadAudio {
            path: audio_path.to_path_buf(),
            source,
        };

        // Check the size before pulling the whole file into memory.
        let meta = tokio::fs::metadata(audio_path).await.map_err(read_err)?;
        check_audio_size(meta.len())?;

        let bytes = tokio::fs::read(audio_path).await.map_err(read_err)?;
        check_audio_size(bytes.len() as u64)?;

        let request = [Content {
            role: Role::User,
            parts: vec![
                Part::Text(SYMPTOM_EXTRACTION_PROMPT.to_string()),
                Part::Audio {
                    mime_type: audio_mime_type_for(audio_path).to_string(),
                    bytes,
                },
            ],
        }];

        let reply = self
            .backend
            .generate(&request)
            .await
            .map_err(classify_backend_failure)?;
        let text = accept_reply_text(reply.text).ok_or(GatewayError::EmptyResponse)?;

        let symptoms = parse_extracted_symptoms(&text).map_err(|e| {
            log::warn!("Symptom extraction reply could not be decoded: {e}");
            GatewayError::MalformedResponse(e.to_string())
        })?;

        log::info!("Extracted {} symptoms from audio", symptoms.len());
        Ok(symptoms)
    }

    /// Sends free text as a new turn in the shared conversation.
    pub async fn ask_follow_up(&self, question: &str) -> Result<String, GatewayError> {
        let mut conversation = self.conversation.lock().await;
        let request = conversation.request_with(question);

        let reply = self
            .backend
            .generate(&request)
            .await
            .map_err(|e| GatewayError::Backend(format!("{e:#}")))?;
        let text = accept_reply_text(reply.text).ok_or(GatewayError::EmptyResponse)?;

        conversation.push(question, text.clone());
        Ok(text)
    }

    /// Starts over with an empty conversation. Waits for an in-flight turn to finish.
    pub async fn reset_conversation(&self) {
        let mut conversation = self.conversation.lock().await;
        let dropped = conversation.len();
        *conversation = Conversation::new();
        log::info!("Conversation reset ({dropped} turns discarded)");
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.conversation.lock().await.turns().to_vec()
    }
}
