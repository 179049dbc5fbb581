pub mod recording;


pub use recording::{
    AudioRecorder, Microphone, MicrophonePermission, RecordingError, RecordingSession,
    RecordingState, discard_recording, validate_recording,
};
