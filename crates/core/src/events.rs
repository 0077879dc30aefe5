//! Reply events emitted by the orchestrator to downstream consumers.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

/// A piece of text ready to be spoken to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyEvent {
    /// The interaction that triggered this reply.
    pub interaction_id: u64,
    /// Position among final answers. `None` for filler phrases, which are
    /// spoken immediately and carry no ordering guarantee.
    pub ordering_index: Option<u64>,
    pub text: String,
}

impl ReplyEvent {
    pub fn filler(interaction_id: u64, text: impl Into<String>) -> Self {
        Self {
            interaction_id,
            ordering_index: None,
            text: text.into(),
        }
    }

    pub fn answer(interaction_id: u64, ordering_index: u64, text: impl Into<String>) -> Self {
        Self {
            interaction_id,
            ordering_index: Some(ordering_index),
            text: text.into(),
        }
    }

    pub fn is_filler(&self) -> bool {
        self.ordering_index.is_none()
    }
}

/// Fan-out of reply events to any number of listeners.
#[derive(Debug, Clone)]
pub struct ReplyBroadcaster {
    tx: broadcast::Sender<ReplyEvent>,
}

impl ReplyBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Delivers an event to every current listener.
    ///
    /// Having no listener is not an error; the event is simply dropped.
    pub fn emit(&self, event: ReplyEvent) {
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            debug!(?event, "No reply listeners; event dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReplyEvent> {
        self.tx.subscribe()
    }

    /// The same events as [`subscribe`](Self::subscribe), as a `Stream`.
    pub fn stream(&self) -> BroadcastStream<ReplyEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
