//! Function Registry
//!
//! Binds each manifest entry to the executable that implements it. The
//! registry is built explicitly at startup and injected into every
//! orchestrator, which only ever reads from it.

use crate::{
    error::{ManifestError, OrchestratorError},
    manifest::{ToolManifest, ToolManifestEntry},
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// Minimum normalized similarity for a registered name to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// An external capability the model can invoke.
///
/// Implementations receive the parsed arguments and return the text that is
/// fed back to the model. They never touch the conversation context.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Tool: Send + Sync {
    async fn execute(&self, arguments: Value) -> Result<String>;
}

/// A tool resolved by name, together with its manifest entry.
pub struct ResolvedTool<'a> {
    pub entry: &'a ToolManifestEntry,
    pub tool: Arc<dyn Tool>,
}

/// Maps tool names to executables, validated against the manifest.
pub struct FunctionRegistry {
    manifest: Arc<ToolManifest>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl FunctionRegistry {
    pub fn builder(manifest: Arc<ToolManifest>) -> FunctionRegistryBuilder {
        FunctionRegistryBuilder {
            manifest,
            tools: HashMap::new(),
        }
    }

    pub fn manifest(&self) -> &ToolManifest {
        &self.manifest
    }

    /// Resolves a tool name requested by the model.
    pub fn lookup(&self, name: &str) -> Result<ResolvedTool<'_>, OrchestratorError> {
        match (self.manifest.get(name), self.tools.get(name)) {
            (Some(entry), Some(tool)) => Ok(ResolvedTool {
                entry,
                tool: tool.clone(),
            }),
            _ => Err(OrchestratorError::UnknownTool {
                name: name.to_string(),
                suggestion: self.closest_name(name),
            }),
        }
    }

    /// The registered name closest to `name`, tolerating swapped, missing
    /// and substituted letters.
    fn closest_name(&self, name: &str) -> Option<String> {
        self.manifest
            .names()
            .map(|candidate| {
                let score = strsim::normalized_damerau_levenshtein(name, candidate);
                (score, candidate)
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, candidate)| candidate.to_string())
    }
}

/// Collects executables before validating them against the manifest.
pub struct FunctionRegistryBuilder {
    manifest: Arc<ToolManifest>,
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl FunctionRegistryBuilder {
    pub fn register(mut self, name: impl Into<String>, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(name.into(), tool);
        self
    }

    /// Fails unless every manifest entry has exactly one executable and
    /// every executable is declared in the manifest.
    pub fn build(self) -> Result<FunctionRegistry, ManifestError> {
        if let Some(missing) = self
            .manifest
            .names()
            .find(|name| !self.tools.contains_key(*name))
        {
            return Err(ManifestError::MissingExecutable(missing.to_string()));
        }
        if let Some(extra) = self
            .tools
            .keys()
            .find(|name| self.manifest.get(name).is_none())
        {
            return Err(ManifestError::Undeclared(extra.clone()));
        }
        Ok(FunctionRegistry {
            manifest: self.manifest,
            tools: self.tools,
        })
    }
}
