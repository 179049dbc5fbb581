pub mod config_store;
pub mod defaults;
pub mod gemini;
pub mod runtime_gateway;
pub mod secrets;
