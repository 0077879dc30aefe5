//! Drives one conversation from a line-oriented transcript source.
//!
//! Each non-empty input line stands in for one recognized utterance. Replies
//! are written by an independent listener, the way a speech synthesizer
//! would consume them.

use anyhow::Result;
use futures::StreamExt;
use parley_core::{Orchestrator, ReplyEvent, events::ReplyBroadcaster};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

/// Spoken when a turn fails, so the caller is never left in silence.
pub const APOLOGY: &str = "I'm sorry, I ran into a problem. Could you say that again?";

/// Feeds every input line to the orchestrator with increasing interaction ids.
///
/// Errors from a turn are logged and answered with [`APOLOGY`]; the session
/// continues with the next line. Returns the number of turns processed.
pub async fn run_console<R>(
    orchestrator: &mut Orchestrator,
    replies: &ReplyBroadcaster,
    input: R,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut interaction_id = 0;
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if let Err(e) = orchestrator.advance(text, interaction_id).await {
            error!(interaction_id, error = %e, "Turn failed");
            replies.emit(ReplyEvent::filler(interaction_id, APOLOGY));
        }
        interaction_id += 1;
    }
    info!(
        turns = interaction_id,
        context_len = orchestrator.context().len(),
        "Input closed, ending session"
    );
    Ok(interaction_id)
}

/// Formats a reply the way the console shows it.
pub fn render_reply(event: &ReplyEvent) -> String {
    match event.ordering_index {
        Some(index) => format!("[{}#{}] {}", event.interaction_id, index, event.text),
        None => format!("[{}~] {}", event.interaction_id, event.text),
    }
}

/// Writes replies until every sender is gone.
pub async fn write_replies<W>(mut stream: BroadcastStream<ReplyEvent>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) => {
                out.write_all(render_reply(&event).as_bytes()).await?;
                out.write_all(b"\n").await?;
                out.flush().await?;
            }
            Err(e) => warn!(error = %e, "Reply listener fell behind"),
        }
    }
    Ok(())
}
