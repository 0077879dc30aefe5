use crate::{arguments::reassemble, message::Message};
use anyhow::{Result, anyhow};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionTool, CreateChatCompletionRequestArgs, FinishReason},
};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, warn};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    /// Identifier the result must be reported under.
    pub id: String,
    pub name: String,
    /// Argument text in the order it was streamed. Fragments are not valid
    /// JSON on their own.
    pub argument_fragments: Vec<String>,
}

impl ToolCallRequest {
    pub fn arguments(&self) -> String {
        reassemble(&self.argument_fragments)
    }
}

/// The two possible outcomes of a single completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMAction {
    /// The model answered in natural language.
    TextResponse(String),
    /// The model asked for a tool. `content` is any text it produced alongside.
    ToolCall {
        content: String,
        call: ToolCallRequest,
    },
}

/// A generic client for interacting with an LLM.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Issues one completion request with the given history and available tools.
    ///
    /// An empty `tools` list means the model must answer in text.
    async fn decide_action(
        &self,
        messages: Vec<Message>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<LLMAction>;
}

/// Folds streamed completion deltas into an [`LLMAction`].
///
/// Only the first tool call (index 0) is tracked; the conversation handles
/// one tool invocation per model turn.
#[derive(Debug, Default)]
pub struct CompletionAccumulator {
    content: String,
    tool_id: Option<String>,
    tool_name: Option<String>,
    argument_fragments: Vec<String>,
    finish_reason: Option<FinishReason>,
    ignored_tool_calls: bool,
}

impl CompletionAccumulator {
    pub fn push_content(&mut self, text: &str) {
        self.content.push_str(text);
    }

    pub fn push_tool_chunk(
        &mut self,
        index: u32,
        id: Option<&str>,
        name: Option<&str>,
        arguments: Option<&str>,
    ) {
        if index != 0 {
            self.ignored_tool_calls = true;
            return;
        }
        if let Some(id) = id.filter(|i| !i.is_empty()) {
            self.tool_id = Some(id.to_string());
        }
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.tool_name = Some(name.to_string());
        }
        if let Some(args) = arguments.filter(|a| !a.is_empty()) {
            self.argument_fragments.push(args.to_string());
        }
    }

    pub fn finish(&mut self, reason: FinishReason) {
        self.finish_reason = Some(reason);
    }

    pub fn into_action(self) -> Result<LLMAction> {
        if self.ignored_tool_calls {
            warn!("Model requested several tools at once; only the first is executed");
        }
        let wants_tool = matches!(
            self.finish_reason,
            Some(FinishReason::ToolCalls) | Some(FinishReason::FunctionCall)
        );
        match (self.tool_name, wants_tool) {
            (Some(name), _) => Ok(LLMAction::ToolCall {
                content: self.content,
                call: ToolCallRequest {
                    // Some compatible backends omit the id.
                    id: self.tool_id.unwrap_or_else(|| format!("call_{}", name)),
                    name,
                    argument_fragments: self.argument_fragments,
                },
            }),
            (None, true) => Err(anyhow!(
                "LLM finished with a tool call but never named the function."
            )),
            (None, false) if self.content.is_empty() => Err(anyhow!(
                "LLM response had neither text content nor tool calls."
            )),
            (None, false) => Ok(LLMAction::TextResponse(self.content)),
        }
    }
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the service.
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn decide_action(
        &self,
        messages: Vec<Message>,
        tools: Vec<ChatCompletionTool>,
    ) -> Result<LLMAction> {
        let messages = messages
            .iter()
            .map(Message::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages).stream(true);
        if !tools.is_empty() {
            args.tools(tools).tool_choice("auto");
        }
        let request = args.build()?;

        let mut stream = self.client.chat().create_stream(request).await?;
        let mut accumulator = CompletionAccumulator::default();
        while let Some(chunk) = stream.next().await {
            for choice in chunk?.choices.into_iter().filter(|c| c.index == 0) {
                if let Some(content) = &choice.delta.content {
                    accumulator.push_content(content);
                }
                for call in choice.delta.tool_calls.unwrap_or_default() {
                    let (name, arguments) = match call.function {
                        Some(f) => (f.name, f.arguments),
                        None => (None, None),
                    };
                    accumulator.push_tool_chunk(
                        call.index,
                        call.id.as_deref(),
                        name.as_deref(),
                        arguments.as_deref(),
                    );
                }
                if let Some(reason) = choice.finish_reason {
                    accumulator.finish(reason);
                }
            }
        }
        debug!(?accumulator, "Completion stream finished");
        accumulator.into_action()
    }
}
