//! Demo tool implementations backing `manifest/tools.json`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use parley_core::{
    ManifestError,
    manifest::ToolManifest,
    registry::{FunctionRegistry, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Deserialize, JsonSchema, Debug, Default)]
pub struct CurrentTimeArgs {
    /// Either "12h" or "24h". Defaults to 12-hour time.
    #[serde(default)]
    pub clock: Option<String>,
}

/// Reports the local wall-clock time.
pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: CurrentTimeArgs = serde_json::from_value(arguments)?;
        let format = match args.clock.as_deref() {
            Some("24h") => "%H:%M",
            _ => "%-I:%M %p",
        };
        Ok(format!(
            "The current time is {} on {}.",
            Local::now().format(format),
            Local::now().format("%A, %B %-d")
        ))
    }
}

#[derive(Deserialize, JsonSchema, Debug)]
pub struct LogSymptomArgs {
    /// Short description of the symptom, in the patient's words.
    pub symptom: String,
    /// Severity from 1 (mild) to 10 (severe).
    #[serde(default)]
    pub severity: Option<u8>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SymptomRecord {
    pub symptom: String,
    pub severity: Option<u8>,
    pub recorded_at: DateTime<Local>,
}

/// Keeps reported symptoms in memory for the lifetime of the process.
#[derive(Default, Clone)]
pub struct SymptomLog {
    records: Arc<Mutex<Vec<SymptomRecord>>>,
}

impl SymptomLog {
    pub async fn records(&self) -> Vec<SymptomRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl Tool for SymptomLog {
    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: LogSymptomArgs = serde_json::from_value(arguments)?;
        if let Some(severity) = args.severity {
            anyhow::ensure!(
                (1..=10).contains(&severity),
                "severity must be between 1 and 10, got {}",
                severity
            );
        }
        info!(symptom = %args.symptom, severity = ?args.severity, "Symptom logged");

        let mut records = self.records.lock().await;
        records.push(SymptomRecord {
            symptom: args.symptom.clone(),
            severity: args.severity,
            recorded_at: Local::now(),
        });
        Ok(format!(
            "Logged '{}'. {} symptom(s) recorded this call; the care team will be notified.",
            args.symptom,
            records.len()
        ))
    }
}

/// Binds the demo tools to their manifest entries.
pub fn demo_registry(
    manifest: Arc<ToolManifest>,
    symptoms: SymptomLog,
) -> Result<FunctionRegistry, ManifestError> {
    FunctionRegistry::builder(manifest)
        .register("get_current_time", Arc::new(CurrentTime))
        .register("log_symptom", Arc::new(symptoms))
        .build()
}
