// Fixed capture settings shared by the recorder and the AI gateway.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Recordings larger than this are rejected before upload.
pub const MAX_AUDIO_FILE_BYTES: u64 = 10 * 1024 * 1024;

pub const RECORDING_FILE_PREFIX: &str = "symptom_recording_";
pub const RECORDING_FILE_EXTENSION: &str = "m4a";
pub const RECORDING_MIME_TYPE: &str = "audio/mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoder {
    AacLc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub encoder: AudioEncoder,
    pub bit_rate: u32,
    pub sample_rate_hz: u32,
    pub mime_type: String,
    pub extension: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            encoder: AudioEncoder::AacLc,
            bit_rate: 128_000,
            sample_rate_hz: 44_100,
            mime_type: RECORDING_MIME_TYPE.into(),
            extension: RECORDING_FILE_EXTENSION.into(),
        }
    }
}

/// MIME type sent with an audio upload, chosen from the file extension.
///
/// Unknown extensions are assumed to be our own AAC recordings.
pub fn audio_mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mp3",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "aiff" | "aif" => "audio/aiff",
        _ => RECORDING_MIME_TYPE,
    }
}

pub fn recording_file_name(ts_unix_ms: i64, extension: &str) -> String {
    format!("{RECORDING_FILE_PREFIX}{ts_unix_ms}.{extension}")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioFileError {
    #[error("audio file is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("audio file is empty")]
    FileEmpty,
}

pub fn check_audio_size(size: u64) -> Result<(), AudioFileError> {
    if size == 0 {
        return Err(AudioFileError::FileEmpty);
    }
    if size > MAX_AUDIO_FILE_BYTES {
        return Err(AudioFileError::FileTooLarge {
            size,
            limit: MAX_AUDIO_FILE_BYTES,
        });
    }
    Ok(())
}
