//! Conversation messages and their mapping onto the chat completion wire format.

use anyhow::Result;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestFunctionMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionToolType, FunctionCall,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The author of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Function => write!(f, "function"),
        }
    }
}

/// A tool request recorded on the assistant message that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Identifier the model gave this call; the result message refers back to it.
    pub id: String,
    pub name: String,
    /// The reassembled argument payload, exactly as the model produced it.
    pub arguments: String,
}

/// A single entry of the conversation context.
///
/// `name` is set if and only if `role` is [`Role::Function`]. Use the
/// constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolInvocation>,
    /// For function results, the id of the tool call they answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// An assistant message that asked for a tool to be run.
    pub fn assistant_tool_call(content: impl Into<String>, invocation: ToolInvocation) -> Self {
        Self {
            tool_call: Some(invocation),
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Tool output that did not come from a recorded tool call.
    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::plain(Role::Function, content)
        }
    }

    /// The output of the tool call `call_id`, attributed to the tool by name.
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::function(name, content)
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            content: content.into(),
            tool_call: None,
            tool_call_id: None,
        }
    }

    /// Converts this message into the request type expected by the chat API.
    ///
    /// Tool requests and their results use the `tool_calls` / `tool` message
    /// pair. A function result with no call id falls back to the legacy
    /// `function` message.
    pub fn to_request_message(&self) -> Result<ChatCompletionRequestMessage> {
        let message = match self.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(self.content.clone())
                .build()?
                .into(),
            Role::User => ChatCompletionRequestUserMessageArgs::default()
                .content(self.content.clone())
                .build()?
                .into(),
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                match &self.tool_call {
                    Some(invocation) => {
                        if !self.content.is_empty() {
                            args.content(self.content.clone());
                        }
                        args.tool_calls(vec![ChatCompletionMessageToolCall {
                            id: invocation.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: invocation.name.clone(),
                                arguments: invocation.arguments.clone(),
                            },
                        }]);
                    }
                    None => {
                        args.content(self.content.clone());
                    }
                }
                args.build()?.into()
            }
            Role::Function => match &self.tool_call_id {
                Some(call_id) => ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(call_id.clone())
                    .content(self.content.clone())
                    .build()?
                    .into(),
                None => legacy_function_message(self)?,
            },
        };
        Ok(message)
    }
}

#[allow(deprecated)]
fn legacy_function_message(message: &Message) -> Result<ChatCompletionRequestMessage> {
    Ok(ChatCompletionRequestFunctionMessageArgs::default()
        .name(message.name.clone().unwrap_or_default())
        .content(message.content.clone())
        .build()?
        .into())
}
