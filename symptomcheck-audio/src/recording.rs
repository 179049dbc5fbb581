// One audio capture, from permission check to a finished (or deleted) file.
//
// The actual encoder lives behind `AudioRecorder`; this module only owns the
// lifecycle and the file on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symptomcheck_core::audio::{
    AudioFileError, RecordingSettings, check_audio_size, recording_file_name,
};
use symptomcheck_core::types::now_unix_ms;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("microphone permission was denied")]
    PermissionDenied,

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("this recording session has already finished")]
    SessionClosed,

    #[error("the microphone is in use by another recording")]
    MicrophoneBusy,

    #[error(transparent)]
    File(#[from] AudioFileError),

    #[error("audio recorder failed: {0:#}")]
    Recorder(anyhow::Error),

    #[error("recording file error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait MicrophonePermission: Send + Sync {
    async fn is_granted(&self) -> bool;

    /// Asks the user. Returns whether access was granted.
    async fn request(&self) -> bool;
}

/// Platform encoder writing to a file.
///
/// Implemented by the host app over its native capture API (AVAudioRecorder,
/// MediaRecorder, or a cpal stream fed to an AAC encoder). It must honor the
/// codec, bitrate, and sample rate in `RecordingSettings`; the gateway sends the
/// file as-is. Synchronous so a session can still stop it from `Drop`.
pub trait AudioRecorder: Send {
    fn start(&mut self, path: &Path, settings: &RecordingSettings) -> anyhow::Result<()>;

    /// Finalizes the file started by the last `start`.
    fn stop(&mut self) -> anyhow::Result<()>;
}

/// Shared handle to the one physical recorder.
///
/// A session leases the recorder from `start` until it stops, cancels, or is dropped.
#[derive(Clone)]
pub struct Microphone {
    recorder: Arc<Mutex<Box<dyn AudioRecorder>>>,
}

impl Microphone {
    pub fn new(recorder: impl AudioRecorder + 'static) -> Self {
        Self {
            recorder: Arc::new(Mutex::new(Box::new(recorder))),
        }
    }

    fn try_lease(&self) -> Result<OwnedMutexGuard<Box<dyn AudioRecorder>>, RecordingError> {
        self.recorder
            .clone()
            .try_lock_owned()
            .map_err(|_| RecordingError::MicrophoneBusy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    Stopped,
    Cancelled,
}

pub struct RecordingSession {
    microphone: Microphone,
    permission: Arc<dyn MicrophonePermission>,
    dir: PathBuf,
    settings: RecordingSettings,
    state: RecordingState,
    // Set once the recorder has accepted a file, never cleared.
    file_path: Option<PathBuf>,
    lease: Option<OwnedMutexGuard<Box<dyn AudioRecorder>>>,
}

impl RecordingSession {
    pub fn new(
        microphone: Microphone,
        permission: Arc<dyn MicrophonePermission>,
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            microphone,
            permission,
            dir: dir.into(),
            settings: RecordingSettings::default(),
            state: RecordingState::Idle,
            file_path: None,
            lease: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub async fn start(&mut self) -> Result<PathBuf, RecordingError> {
        match self.state {
            RecordingState::Idle => {}
            RecordingState::Recording => return Err(RecordingError::AlreadyRecording),
            RecordingState::Stopped | RecordingState::Cancelled => {
                return Err(RecordingError::SessionClosed);
            }
        }

        if !self.permission.is_granted().await && !self.permission.request().await {
            log::warn!("Microphone permission denied");
            return Err(RecordingError::PermissionDenied);
        }

        let mut lease = self.microphone.try_lease()?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| RecordingError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let path = self
            .dir
            .join(recording_file_name(now_unix_ms(), &self.settings.extension));

        lease
            .start(&path, &self.settings)
            .map_err(RecordingError::Recorder)?;

        log::info!("Recording started: {}", path.display());
        self.file_path = Some(path.clone());
        self.lease = Some(lease);
        self.state = RecordingState::Recording;
        Ok(path)
    }

    /// Finalizes the file and hands back its path.
    ///
    /// If the recorder fails to finalize, the partial file is deleted and the
    /// session ends as `Cancelled`.
    pub async fn stop(&mut self) -> Result<PathBuf, RecordingError> {
        if self.state != RecordingState::Recording {
            return Err(RecordingError::NotRecording);
        }
        let path = self.file_path.clone().ok_or(RecordingError::NotRecording)?;

        if let Err(e) = self.release_recorder() {
            // The file was never finalized; nothing downstream can use it.
            self.state = RecordingState::Cancelled;
            if let Err(cleanup) = discard_recording(&path).await {
                log::warn!("Failed to remove unfinished recording: {cleanup}");
            }
            return Err(RecordingError::Recorder(e));
        }

        self.state = RecordingState::Stopped;
        log::info!("Recording stopped: {}", path.display());
        Ok(path)
    }

    /// Abandons the recording and deletes its file. A no-op unless recording.
    pub async fn cancel(&mut self) -> Result<(), RecordingError> {
        if self.state != RecordingState::Recording {
            return Ok(());
        }

        self.state = RecordingState::Cancelled;
        if let Err(e) = self.release_recorder() {
            log::warn!("Recorder failed to stop during cancel: {e:#}");
        }

        if let Some(path) = &self.file_path {
            discard_recording(path).await?;
            log::info!("Recording cancelled: {}", path.display());
        }
        Ok(())
    }

    /// Size check of the current file before it is handed to the gateway.
    pub async fn validate(&self) -> Result<u64, RecordingError> {
        let path = self.file_path.as_deref().ok_or(RecordingError::NotRecording)?;
        validate_recording(path).await
    }

    fn release_recorder(&mut self) -> anyhow::Result<()> {
        match self.lease.take() {
            Some(mut recorder) => recorder.stop(),
            None => Ok(()),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }
        if let Err(e) = self.release_recorder() {
            log::warn!("Recorder failed to stop on drop: {e:#}");
        }
        if let Some(path) = &self.file_path {
            match std::fs::remove_file(path) {
                Ok(()) => log::info!("Removed abandoned recording: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove {}: {e}", path.display()),
            }
        }
    }
}

/// Rejects empty or oversized recordings. Returns the size in bytes.
pub async fn validate_recording(path: &Path) -> Result<u64, RecordingError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| RecordingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    check_audio_size(meta.len())?;
    Ok(meta.len())
}

/// Deletes a recording once it is no longer needed. A missing file is fine.
pub async fn discard_recording(path: &Path) -> Result<(), RecordingError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RecordingError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
