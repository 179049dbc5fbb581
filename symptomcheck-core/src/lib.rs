pub mod audio;
pub mod config;
pub mod interpret;
pub mod prompt;
pub mod text;
pub mod types;

// Keep the public surface small and intentional.
pub use audio::*;
pub use config::*;
pub use interpret::*;
pub use prompt::*;
pub use text::*;
pub use types::*;
