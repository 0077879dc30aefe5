//! Error types for the orchestration core.

use std::path::PathBuf;

/// Errors that abort an `advance` chain.
///
/// None of these are retried or swallowed inside the core. The caller of
/// `Orchestrator::advance` decides how to surface them to the user.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The tool argument payload was not valid JSON, even after recovery.
    #[error("Invalid arguments for tool '{tool}': {source} (payload: {payload})")]
    ArgumentParse {
        tool: String,
        payload: String,
        #[source]
        source: serde_json::Error,
    },
    /// The model named a tool that is not in the registry.
    #[error("Unknown tool '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownTool {
        name: String,
        suggestion: Option<String>,
    },
    /// The tool itself failed while executing.
    #[error("Tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: anyhow::Error,
    },
    /// The completion request failed (transport, quota, malformed response).
    #[error("Model request failed: {0}")]
    ModelRequest(#[source] anyhow::Error),
    /// The model kept requesting tools past the configured depth.
    #[error("Tool call chain exceeded the limit of {limit} calls")]
    RecursionLimit { limit: usize },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{}'?)", name),
        None => String::new(),
    }
}

/// Errors raised while building the tool manifest or function registry.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Duplicate tool name in manifest: '{0}'")]
    DuplicateName(String),
    #[error("Tool '{0}' is declared in the manifest but has no executable")]
    MissingExecutable(String),
    #[error("Executable '{0}' is registered but not declared in the manifest")]
    Undeclared(String),
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid manifest: {0}")]
    Invalid(#[from] serde_json::Error),
}
