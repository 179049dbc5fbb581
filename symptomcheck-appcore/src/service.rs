use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use symptomcheck_audio::{
    Microphone, MicrophonePermission, RecordingError, RecordingSession, discard_recording,
};
use symptomcheck_core::audio::{AudioFileError, MAX_AUDIO_FILE_BYTES};
use symptomcheck_core::config::AppConfig;
use symptomcheck_core::types::{DiagnosisResult, SymptomRecord};
use symptomcheck_engine::conversation::Turn;
use symptomcheck_engine::error::GatewayError;
use symptomcheck_engine::gateway::AiGateway;
use symptomcheck_runtime::runtime_gateway::{build_gateway_from_config, recordings_dir};
use tokio::sync::Mutex;

use crate::notify::{Notification, Notifier};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no symptoms to analyze")]
    NoSymptoms,

    #[error("an analysis is already running")]
    AlreadyAnalyzing,

    #[error("the question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Short, actionable text for a failed operation. Details go to the log.
pub fn user_facing_error(e: &ServiceError) -> String {
    match e {
        ServiceError::NoSymptoms => "Add at least one symptom before requesting an analysis.".into(),
        ServiceError::AlreadyAnalyzing => "An analysis is already in progress.".into(),
        ServiceError::EmptyQuestion => "Type a question first.".into(),
        ServiceError::Recording(e) => match e {
            RecordingError::PermissionDenied => {
                "Microphone access is needed to describe symptoms by voice. Enable it in your system settings.".into()
            }
            RecordingError::AlreadyRecording => "A recording is already in progress.".into(),
            RecordingError::NotRecording | RecordingError::SessionClosed => {
                "No recording is in progress.".into()
            }
            RecordingError::MicrophoneBusy => "The microphone is being used by another recording.".into(),
            RecordingError::File(f) => audio_file_message(f),
            RecordingError::Recorder(_) | RecordingError::Io { .. } => {
                "Audio recording failed. Please try again.".into()
            }
        },
        ServiceError::Gateway(e) => match e {
            GatewayError::Timeout(_) => {
                "The analysis took too long. Check your connection and try again.".into()
            }
            GatewayError::EmptyResponse => "The AI service returned no answer. Please try again.".into(),
            GatewayError::MalformedResponse(_) => {
                "Could not understand the symptoms in the recording. Try again or add them manually.".into()
            }
            GatewayError::BackendAuth(_) => {
                "The AI service rejected the API key. Check your settings.".into()
            }
            GatewayError::BackendQuota(_) => {
                "The AI service usage limit was reached. Please try again later.".into()
            }
            GatewayError::Backend(_) | GatewayError::Unknown(_) => {
                "The AI service is unavailable right now. Please try again.".into()
            }
            GatewayError::AudioFile(f) => audio_file_message(f),
            GatewayError::ReadAudio { .. } => "The recording could not be read. Please record again.".into(),
        },
    }
}

fn audio_file_message(e: &AudioFileError) -> String {
    match e {
        AudioFileError::FileEmpty => "The recording is empty. Please record again.".into(),
        AudioFileError::FileTooLarge { .. } => format!(
            "The recording is too long. Keep it under {} MB.",
            MAX_AUDIO_FILE_BYTES / (1024 * 1024)
        ),
    }
}

/// What the intake screen shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntakeState {
    pub symptoms: Vec<SymptomRecord>,
    pub last_diagnosis: Option<DiagnosisResult>,
}

/// Clears the analyzing flag on every exit path.
struct AnalyzingGuard<'a>(&'a AtomicBool);

impl<'a> AnalyzingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for AnalyzingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One user's symptom intake: the symptom list, voice capture and AI calls.
///
/// Every failing operation also emits an error notification.
pub struct IntakeService {
    gateway: Arc<AiGateway>,
    microphone: Microphone,
    permission: Arc<dyn MicrophonePermission>,
    recordings_dir: PathBuf,
    notifier: Arc<dyn Notifier>,
    state: Mutex<IntakeState>,
    recording: Mutex<Option<RecordingSession>>,
    analyzing: AtomicBool,
}

impl IntakeService {
    pub fn new(
        gateway: Arc<AiGateway>,
        microphone: Microphone,
        permission: Arc<dyn MicrophonePermission>,
        recordings_dir: impl Into<PathBuf>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            microphone,
            permission,
            recordings_dir: recordings_dir.into(),
            notifier,
            state: Mutex::new(IntakeState::default()),
            recording: Mutex::new(None),
            analyzing: AtomicBool::new(false),
        }
    }

    /// Wires a Gemini-backed gateway from config. The API key comes from the
    /// environment or the OS keyring.
    pub fn from_config(
        cfg: &AppConfig,
        microphone: Microphone,
        permission: Arc<dyn MicrophonePermission>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let gateway = build_gateway_from_config(cfg)?;
        Ok(Self::new(
            Arc::new(gateway),
            microphone,
            permission,
            recordings_dir(cfg),
            notifier,
        ))
    }

    pub async fn snapshot(&self) -> IntakeState {
        self.state.lock().await.clone()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::SeqCst)
    }

    pub async fn is_recording(&self) -> bool {
        self.recording
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| s.is_recording())
    }

    pub async fn add_symptom(&self, symptom: SymptomRecord) {
        self.state.lock().await.symptoms.push(symptom);
    }

    pub async fn remove_symptom(&self, index: usize) -> Option<SymptomRecord> {
        let mut state = self.state.lock().await;
        (index < state.symptoms.len()).then(|| state.symptoms.remove(index))
    }

    pub async fn clear_symptoms(&self) {
        self.state.lock().await.symptoms.clear();
    }

    /// Sends the current symptom list for analysis and keeps the result.
    pub async fn analyze(&self) -> Result<DiagnosisResult, ServiceError> {
        let res = self.analyze_inner().await;
        self.report(res)
    }

    async fn analyze_inner(&self) -> Result<DiagnosisResult, ServiceError> {
        let _guard =
            AnalyzingGuard::acquire(&self.analyzing).ok_or(ServiceError::AlreadyAnalyzing)?;

        let symptoms = self.state.lock().await.symptoms.clone();
        if symptoms.is_empty() {
            return Err(ServiceError::NoSymptoms);
        }

        let diagnosis = self.gateway.analyze_symptoms(&symptoms).await?;
        self.state.lock().await.last_diagnosis = Some(diagnosis.clone());
        Ok(diagnosis)
    }

    pub async fn start_voice_intake(&self) -> Result<PathBuf, ServiceError> {
        let res = self.start_voice_intake_inner().await;
        self.report(res)
    }

    async fn start_voice_intake_inner(&self) -> Result<PathBuf, ServiceError> {
        if self.is_recording().await {
            return Err(RecordingError::AlreadyRecording.into());
        }

        // Not under the slot lock: `start` may wait on a permission prompt.
        let mut session = RecordingSession::new(
            self.microphone.clone(),
            self.permission.clone(),
            &self.recordings_dir,
        );
        let path = session.start().await?;

        let mut slot = self.recording.lock().await;
        if slot.as_ref().is_some_and(|s| s.is_recording()) {
            session.cancel().await?;
            return Err(RecordingError::AlreadyRecording.into());
        }
        *slot = Some(session);
        Ok(path)
    }

    /// Stops the recording, extracts symptoms from it and appends them to the list.
    ///
    /// The recording file is deleted whether or not extraction succeeds.
    pub async fn finish_voice_intake(&self) -> Result<Vec<SymptomRecord>, ServiceError> {
        let res = self.finish_voice_intake_inner().await;
        self.report(res)
    }

    async fn finish_voice_intake_inner(&self) -> Result<Vec<SymptomRecord>, ServiceError> {
        let mut session = self
            .recording
            .lock()
            .await
            .take()
            .ok_or(RecordingError::NotRecording)?;
        let path = session.stop().await?;

        let extracted = self.extract_from(&session, &path).await;
        if let Err(e) = discard_recording(&path).await {
            log::warn!("Failed to delete recording {}: {e}", path.display());
        }
        let symptoms = extracted?;

        self.state
            .lock()
            .await
            .symptoms
            .extend(symptoms.iter().cloned());

        let message = match symptoms.len() {
            0 => "No symptoms were recognized in the recording.".to_string(),
            1 => "Added 1 symptom from your recording.".to_string(),
            n => format!("Added {n} symptoms from your recording."),
        };
        self.notifier.notify(Notification::info(message));
        Ok(symptoms)
    }

    async fn extract_from(
        &self,
        session: &RecordingSession,
        path: &Path,
    ) -> Result<Vec<SymptomRecord>, ServiceError> {
        let size = session.validate().await?;
        log::info!("Uploading recording ({size} bytes) for symptom extraction");
        Ok(self.gateway.extract_symptoms_from_audio(path).await?)
    }

    pub async fn cancel_voice_intake(&self) -> Result<(), ServiceError> {
        let res = self.cancel_voice_intake_inner().await;
        self.report(res)
    }

    async fn cancel_voice_intake_inner(&self) -> Result<(), ServiceError> {
        if let Some(mut session) = self.recording.lock().await.take() {
            session.cancel().await?;
        }
        Ok(())
    }

    pub async fn ask_follow_up(&self, question: &str) -> Result<String, ServiceError> {
        let res = self.ask_follow_up_inner(question).await;
        self.report(res)
    }

    async fn ask_follow_up_inner(&self, question: &str) -> Result<String, ServiceError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ServiceError::EmptyQuestion);
        }
        Ok(self.gateway.ask_follow_up(question).await?)
    }

    pub async fn conversation(&self) -> Vec<Turn> {
        self.gateway.history().await
    }

    pub async fn reset_conversation(&self) {
        self.gateway.reset_conversation().await;
    }

    /// Drops the symptom list, last diagnosis, any active recording and the conversation.
    pub async fn start_over(&self) -> Result<(), ServiceError> {
        self.cancel_voice_intake().await?;
        *self.state.lock().await = IntakeState::default();
        self.gateway.reset_conversation().await;
        Ok(())
    }

    fn report<T>(&self, res: Result<T, ServiceError>) -> Result<T, ServiceError> {
        if let Err(e) = &res {
            log::warn!("Intake operation failed: {e}");
            self.notifier
                .notify(Notification::error(user_facing_error(e)));
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{MemoryNotifier, NotificationLevel};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use symptomcheck_audio::test::{FakeRecorder, StaticPermission};
    use symptomcheck_core::types::Severity;
    use symptomcheck_engine::traits::{BackendFailure, Content, GeneratedText, GenerativeBackend};

    struct ScriptedBackend {
        replies: StdMutex<Vec<Result<String, String>>>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn generate(&self, _contents: &[Content]) -> Result<GeneratedText, BackendFailure> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.replies.lock().unwrap().pop();
            match next {
                Some(Ok(text)) => Ok(GeneratedText {
                    text: Some(text),
                    model: "scripted".into(),
                }),
                Some(Err(message)) => Err(BackendFailure::Api(message)),
                None => Ok(GeneratedText {
                    text: None,
                    model: "scripted".into(),
                }),
            }
        }
    }

    struct Harness {
        svc: Arc<IntakeService>,
        notifier: Arc<MemoryNotifier>,
        dir: tempfile::TempDir,
    }

    fn harness_with(
        replies: Vec<Result<String, String>>,
        delay: Duration,
        permission: StaticPermission,
        recorder: FakeRecorder,
    ) -> Harness {
        let backend = Arc::new(ScriptedBackend {
            replies: StdMutex::new(replies.into_iter().rev().collect()),
            delay,
        });
        let dir = tempfile::tempdir().unwrap();
        let notifier = Arc::new(MemoryNotifier::default());
        let svc = IntakeService::new(
            Arc::new(AiGateway::new(backend)),
            Microphone::new(recorder),
            Arc::new(permission),
            dir.path(),
            notifier.clone(),
        );
        Harness {
            svc: Arc::new(svc),
            notifier,
            dir,
        }
    }

    fn harness(replies: Vec<Result<String, String>>) -> Harness {
        harness_with(
            replies,
            Duration::ZERO,
            StaticPermission::granted(),
            FakeRecorder::with_payload(b"aac".to_vec()),
        )
    }

    fn headache() -> SymptomRecord {
        SymptomRecord::new("Headache", Severity::new(5).unwrap(), "3 days", None).unwrap()
    }

    fn recording_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn analyze_refuses_an_empty_list() {
        let h = harness(vec![]);
        let err = h.svc.analyze().await.unwrap_err();
        assert!(matches!(err, ServiceError::NoSymptoms));
        assert!(!h.svc.is_analyzing());

        let sent = h.notifier.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn analyze_keeps_the_last_diagnosis() {
        let h = harness(vec![Ok("Possible migraine\nRecommend rest".into())]);
        h.svc.add_symptom(headache()).await;

        let d = h.svc.analyze().await.unwrap();
        assert_eq!(d.recommended_actions, "Recommend rest");
        assert!(!h.svc.is_analyzing());

        let state = h.svc.snapshot().await;
        assert_eq!(state.last_diagnosis, Some(d));
        assert_eq!(h.svc.conversation().await.len(), 1);
        assert!(h.notifier.take().is_empty());
    }

    #[tokio::test]
    async fn analyze_failure_notifies_and_clears_flag() {
        let h = harness(vec![Err("API key not valid. Please pass a valid API key.".into())]);
        h.svc.add_symptom(headache()).await;

        let err = h.svc.analyze().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Gateway(GatewayError::BackendAuth(_))
        ));
        assert!(!h.svc.is_analyzing());
        assert_eq!(h.svc.snapshot().await.last_diagnosis, None);

        let sent = h.notifier.take();
        assert_eq!(
            sent,
            vec![Notification::error(
                "The AI service rejected the API key. Check your settings."
            )]
        );
    }

    #[tokio::test]
    async fn overlapping_analyses_are_rejected() {
        let h = harness_with(
            vec![Ok("Possible cold".into())],
            Duration::from_millis(200),
            StaticPermission::granted(),
            FakeRecorder::default(),
        );
        h.svc.add_symptom(headache()).await;

        let first = {
            let svc = h.svc.clone();
            tokio::spawn(async move { svc.analyze().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(h.svc.is_analyzing());
        assert!(matches!(
            h.svc.analyze().await,
            Err(ServiceError::AlreadyAnalyzing)
        ));

        first.await.unwrap().unwrap();
        assert!(!h.svc.is_analyzing());
    }

    #[tokio::test]
    async fn voice_intake_merges_symptoms_and_deletes_the_file() {
        let h = harness(vec![Ok(
            r#"[{"name":"Cough","severity":4,"duration":"1 week"},{"name":"Fever","severity":7,"duration":"2 days","description":"evenings"}]"#.into(),
        )]);
        h.svc.add_symptom(headache()).await;

        let path = h.svc.start_voice_intake().await.unwrap();
        assert!(h.svc.is_recording().await);
        assert!(path.starts_with(h.dir.path()));

        let added = h.svc.finish_voice_intake().await.unwrap();
        assert_eq!(added.len(), 2);
        assert!(!h.svc.is_recording().await);
        assert!(!path.exists());

        let names: Vec<String> = h
            .svc
            .snapshot()
            .await
            .symptoms
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Headache", "Cough", "Fever"]);
        assert_eq!(
            h.notifier.take(),
            vec![Notification::info("Added 2 symptoms from your recording.")]
        );
    }

    #[tokio::test]
    async fn failed_extraction_still_deletes_the_file() {
        let h = harness(vec![Ok("I heard a cough, maybe.".into())]);

        h.svc.start_voice_intake().await.unwrap();
        let err = h.svc.finish_voice_intake().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Gateway(GatewayError::MalformedResponse(_))
        ));
        assert_eq!(recording_count(h.dir.path()), 0);
        assert!(h.svc.snapshot().await.symptoms.is_empty());

        let sent = h.notifier.take();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("add them manually"));
    }

    #[tokio::test]
    async fn empty_recording_is_not_uploaded() {
        let h = harness_with(
            vec![],
            Duration::ZERO,
            StaticPermission::granted(),
            FakeRecorder::default(),
        );

        h.svc.start_voice_intake().await.unwrap();
        let err = h.svc.finish_voice_intake().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Recording(RecordingError::File(AudioFileError::FileEmpty))
        ));
        assert_eq!(recording_count(h.dir.path()), 0);
        assert!(h.svc.conversation().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_discards_the_recording() {
        let h = harness(vec![]);

        // Nothing to cancel yet.
        h.svc.cancel_voice_intake().await.unwrap();

        let path = h.svc.start_voice_intake().await.unwrap();
        assert!(matches!(
            h.svc.start_voice_intake().await,
            Err(ServiceError::Recording(RecordingError::AlreadyRecording))
        ));

        h.svc.cancel_voice_intake().await.unwrap();
        assert!(!path.exists());
        assert!(!h.svc.is_recording().await);
        assert!(matches!(
            h.svc.finish_voice_intake().await,
            Err(ServiceError::Recording(RecordingError::NotRecording))
        ));
    }

    #[tokio::test]
    async fn recorder_failure_on_finish_leaves_no_file() {
        let h = harness_with(
            vec![Ok("[]".into())],
            Duration::ZERO,
            StaticPermission::granted(),
            FakeRecorder::failing_stop(),
        );

        h.svc.start_voice_intake().await.unwrap();
        let err = h.svc.finish_voice_intake().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Recording(RecordingError::Recorder(_))
        ));
        assert_eq!(recording_count(h.dir.path()), 0);
        assert!(!h.svc.is_recording().await);
        assert!(h.svc.conversation().await.is_empty());
        assert!(h.notifier.take()[0].message.contains("Audio recording failed"));

        // The microphone is free again.
        h.svc.start_voice_intake().await.unwrap();
        h.svc.cancel_voice_intake().await.unwrap();
    }

    /// Holds `request` open until the test answers it.
    #[derive(Default)]
    struct PromptedPermission {
        asked: tokio::sync::Notify,
        answered: tokio::sync::Notify,
    }

    #[async_trait::async_trait]
    impl MicrophonePermission for PromptedPermission {
        async fn is_granted(&self) -> bool {
            false
        }

        async fn request(&self) -> bool {
            self.asked.notify_one();
            self.answered.notified().await;
            true
        }
    }

    #[tokio::test]
    async fn recording_state_is_readable_during_the_permission_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let permission = Arc::new(PromptedPermission::default());
        let backend = Arc::new(ScriptedBackend {
            replies: StdMutex::new(vec![]),
            delay: Duration::ZERO,
        });
        let svc = Arc::new(IntakeService::new(
            Arc::new(AiGateway::new(backend)),
            Microphone::new(FakeRecorder::with_payload(b"aac".to_vec())),
            permission.clone(),
            dir.path(),
            Arc::new(MemoryNotifier::default()),
        ));

        let starting = tokio::spawn({
            let svc = svc.clone();
            async move { svc.start_voice_intake().await }
        });
        permission.asked.notified().await;

        let recording = tokio::time::timeout(Duration::from_millis(200), svc.is_recording())
            .await
            .expect("is_recording blocked behind the permission prompt");
        assert!(!recording);

        permission.answered.notify_one();
        starting.await.unwrap().unwrap();
        assert!(svc.is_recording().await);
        svc.cancel_voice_intake().await.unwrap();
    }

    #[tokio::test]
    async fn denied_microphone_is_reported() {
        let h = harness_with(
            vec![],
            Duration::ZERO,
            StaticPermission::denied(),
            FakeRecorder::default(),
        );

        let err = h.svc.start_voice_intake().await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Recording(RecordingError::PermissionDenied)
        ));
        assert!(h.notifier.take()[0].message.contains("Microphone access"));
    }

    #[tokio::test]
    async fn follow_up_and_start_over() {
        let h = harness(vec![Ok("Possible flu".into()), Ok("Yes, rest.".into())]);
        h.svc.add_symptom(headache()).await;
        h.svc.analyze().await.unwrap();

        assert!(matches!(
            h.svc.ask_follow_up("   ").await,
            Err(ServiceError::EmptyQuestion)
        ));
        assert_eq!(h.svc.ask_follow_up("Should I rest?").await.unwrap(), "Yes, rest.");
        assert_eq!(h.svc.conversation().await.len(), 2);

        h.svc.start_over().await.unwrap();
        assert_eq!(h.svc.snapshot().await, IntakeState::default());
        assert!(h.svc.conversation().await.is_empty());
    }

    #[tokio::test]
    async fn symptoms_can_be_removed_by_index() {
        let h = harness(vec![]);
        h.svc.add_symptom(headache()).await;
        assert!(h.svc.remove_symptom(3).await.is_none());
        assert_eq!(h.svc.remove_symptom(0).await.unwrap().name, "Headache");
        h.svc.add_symptom(headache()).await;
        h.svc.clear_symptoms().await;
        assert!(h.svc.snapshot().await.symptoms.is_empty());
    }

    #[test]
    fn messages_cover_size_limits() {
        let e = ServiceError::Gateway(GatewayError::AudioFile(AudioFileError::FileTooLarge {
            size: 11 * 1024 * 1024,
            limit: MAX_AUDIO_FILE_BYTES,
        }));
        assert_eq!(
            user_facing_error(&e),
            "The recording is too long. Keep it under 10 MB."
        );
        assert_eq!(
            user_facing_error(&ServiceError::Gateway(GatewayError::Timeout(
                Duration::from_secs(30)
            ))),
            "The analysis took too long. Check your connection and try again."
        );
    }
}
