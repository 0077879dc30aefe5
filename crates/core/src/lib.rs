//! Orchestration core for a voice assistant sitting between speech
//! recognition and a chat completion API, with model-initiated tool calls.

pub mod arguments;
pub mod context;
pub mod error;
pub mod events;
pub mod llm_client;
pub mod manifest;
pub mod message;
pub mod orchestrator;
pub mod registry;

pub use error::{ManifestError, OrchestratorError};
pub use events::ReplyEvent;
pub use orchestrator::{DepthLimitPolicy, Orchestrator, OrchestratorConfig};
