//! The ordered, append-only message history replayed to the model on every turn.

use crate::message::{Message, Role, ToolInvocation};

/// Ordered conversation state for a single session.
///
/// The leading messages are the system/persona prompts given at construction.
/// Entries are only ever appended; nothing is removed or rewritten. Size
/// limits are applied on the way out through a [`ContextPolicy`].
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    /// Creates a context seeded with the given system prompts, in order.
    pub fn new<I, S>(system_prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: system_prompts.into_iter().map(Message::system).collect(),
        }
    }

    pub fn append_system(&mut self, text: impl Into<String>) {
        self.messages.push(Message::system(text));
    }

    pub fn append_user(&mut self, text: impl Into<String>) {
        self.messages.push(Message::user(text));
    }

    pub fn append_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Records the assistant turn that requested a tool.
    pub fn append_assistant_tool_call(&mut self, text: impl Into<String>, invocation: ToolInvocation) {
        self.messages
            .push(Message::assistant_tool_call(text, invocation));
    }

    pub fn append_function_result(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.messages.push(Message::function(name, text));
    }

    /// Records the result of the tool call `call_id`.
    pub fn append_tool_result(
        &mut self,
        call_id: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.messages.push(Message::tool_result(call_id, name, text));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Decides which part of the context is sent to the model.
///
/// Implementations must not assume they can mutate the context; they only
/// produce the view for a single request.
pub trait ContextPolicy: Send + Sync {
    fn window(&self, messages: &[Message]) -> Vec<Message>;
}

/// Sends the entire history on every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullHistory;

impl ContextPolicy for FullHistory {
    fn window(&self, messages: &[Message]) -> Vec<Message> {
        messages.to_vec()
    }
}

/// Keeps the leading system prompts plus the most recent `max_messages` entries.
///
/// The window never opens on a tool request or a `function` result: the cut
/// moves back until it starts at another kind of message, so a result is
/// always preceded by the request it answers. The most recent message is
/// always kept, even when `max_messages` is zero.
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindow {
    pub max_messages: usize,
}

impl ContextPolicy for SlidingWindow {
    fn window(&self, messages: &[Message]) -> Vec<Message> {
        let preamble = messages
            .iter()
            .take_while(|m| m.role == Role::System)
            .count();
        let (head, tail) = messages.split_at(preamble);
        let mut skip = tail.len().saturating_sub(self.max_messages.max(1));
        while skip > 0 && is_tool_exchange(&tail[skip]) {
            skip -= 1;
        }
        head.iter().chain(tail.iter().skip(skip)).cloned().collect()
    }
}

fn is_tool_exchange(message: &Message) -> bool {
    message.role == Role::Function || message.tool_call.is_some()
}
