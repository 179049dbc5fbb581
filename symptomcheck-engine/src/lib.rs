pub mod conversation;
pub mod error;
pub mod gateway;
pub mod retry;
pub mod traits;
