//! Main Entrypoint for the Parley Console
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading prompts and the tool manifest, and binding the demo tools.
//! 3. Building one orchestrator session against the configured model.
//! 4. Reading utterances from stdin and printing replies to stdout.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use parley_console::{
    config::Config,
    prompts::{load_prompts, system_prompt},
    session::{run_console, write_replies},
    tools::{SymptomLog, demo_registry},
};
use parley_core::{
    Orchestrator, OrchestratorConfig,
    context::{ContextPolicy, FullHistory, SlidingWindow},
    events::ReplyBroadcaster,
    llm_client::OpenAICompatibleClient,
    manifest::ToolManifest,
};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Talk to the voice companion from the terminal")]
struct Args {
    /// Call identifier made available to the model.
    #[arg(long)]
    session_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();
    info!("Configuration loaded. Initializing session...");

    // --- 3. Load Prompts and Tools ---
    let prompts = load_prompts(&config.prompts_path)?;
    let persona = system_prompt(&prompts)?;
    let manifest = Arc::new(
        ToolManifest::load(&config.manifest_path).context("Failed to load tool manifest")?,
    );
    let symptoms = SymptomLog::default();
    let registry = Arc::new(demo_registry(manifest, symptoms.clone())?);

    // --- 4. Build the Orchestrator ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.openai_api_key)
        .with_api_base(&config.openai_api_base);
    let llm = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let policy: Arc<dyn ContextPolicy> = match config.context_window {
        Some(max_messages) => Arc::new(SlidingWindow { max_messages }),
        None => Arc::new(FullHistory),
    };
    let replies = ReplyBroadcaster::new(64);
    let mut orchestrator = Orchestrator::builder(llm, registry)
        .system_prompt(persona)
        .context_policy(policy)
        .config(OrchestratorConfig {
            max_tool_depth: config.max_tool_depth,
            depth_policy: config.depth_policy,
        })
        .replies(replies.clone())
        .build();
    if let Some(session_id) = &args.session_id {
        orchestrator.set_session_id(session_id);
    }

    // --- 5. Run ---
    info!(
        model = %config.chat_model,
        max_tool_depth = config.max_tool_depth,
        "Session ready. Type an utterance per line; end input to quit."
    );
    let printer = tokio::spawn(write_replies(replies.stream(), tokio::io::stdout()));
    let turns = run_console(
        &mut orchestrator,
        &replies,
        BufReader::new(tokio::io::stdin()),
    )
    .await?;

    drop(orchestrator);
    drop(replies);
    printer.await??;

    info!(
        turns,
        symptoms = symptoms.records().await.len(),
        "Session finished."
    );
    Ok(())
}
