//! Tool Manifest
//!
//! The static catalog of tools the model may call. Each entry carries the
//! parameter schema advertised to the model and the filler phrase spoken
//! while the tool runs. The manifest is loaded once at startup and shared
//! read-only by every session.

use crate::error::ManifestError;
use anyhow::Result;
use async_openai::types::{ChatCompletionTool, ChatCompletionToolArgs, FunctionObjectArgs};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// A single callable tool as declared in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifestEntry {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema describing the tool's arguments.
    #[serde(default = "empty_object_schema")]
    pub parameters: Value,
    /// Phrase spoken to the caller while the tool executes.
    pub say: String,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolManifestEntry {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        say: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            say: say.into(),
        }
    }

    /// Builds an entry whose parameter schema is derived from `T`.
    pub fn for_args<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
        say: impl Into<String>,
    ) -> Result<Self, ManifestError> {
        let parameters = serde_json::to_value(schemars::schema_for!(T))?;
        Ok(Self::new(name, description, parameters, say))
    }

    fn to_chat_tool(&self) -> Result<ChatCompletionTool> {
        Ok(ChatCompletionToolArgs::default()
            .function(
                FunctionObjectArgs::default()
                    .name(self.name.clone())
                    .description(self.description.clone())
                    .parameters(self.parameters.clone())
                    .build()?,
            )
            .build()?)
    }
}

/// Accepts both a flat entry and the chat API's `{"type": "function", "function": {...}}` wrapper.
#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestRecord {
    Wrapped { function: ToolManifestEntry },
    Flat(ToolManifestEntry),
}

impl From<ManifestRecord> for ToolManifestEntry {
    fn from(record: ManifestRecord) -> Self {
        match record {
            ManifestRecord::Wrapped { function } => function,
            ManifestRecord::Flat(entry) => entry,
        }
    }
}

/// An ordered collection of uniquely named tool entries.
#[derive(Debug, Clone, Default)]
pub struct ToolManifest {
    entries: Vec<ToolManifestEntry>,
}

impl ToolManifest {
    pub fn from_entries(entries: Vec<ToolManifestEntry>) -> Result<Self, ManifestError> {
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(ManifestError::DuplicateName(entry.name.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Parses a JSON array of manifest entries.
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        let records: Vec<ManifestRecord> = serde_json::from_str(json)?;
        Self::from_entries(records.into_iter().map(Into::into).collect())
    }

    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let json = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, name: &str) -> Option<&ToolManifestEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn entries(&self) -> &[ToolManifestEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts every entry into the tool definition sent with a completion request.
    pub fn to_chat_tools(&self) -> Result<Vec<ChatCompletionTool>> {
        self.entries.iter().map(|e| e.to_chat_tool()).collect()
    }
}
