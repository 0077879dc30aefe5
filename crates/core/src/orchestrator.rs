//! Conversation Orchestrator
//!
//! Drives a single conversation: appends input to the context, asks the model
//! what to do next, runs any tool it requests and feeds the result back until
//! the model answers in natural language. Replies are published as
//! [`ReplyEvent`]s so speech synthesis (or anything else) can consume them.

use crate::{
    arguments::parse_tool_arguments,
    context::{ContextPolicy, ConversationContext, FullHistory},
    error::OrchestratorError,
    events::{ReplyBroadcaster, ReplyEvent},
    llm_client::{LLMAction, LLMClient, ToolCallRequest},
    message::{Role, ToolInvocation},
    registry::FunctionRegistry,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, instrument, warn};

/// What to do once the model has used up its tool-call budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthLimitPolicy {
    /// Abort the chain with [`OrchestratorError::RecursionLimit`].
    #[default]
    Error,
    /// Ask once more without offering any tools, so the model has to answer.
    ForceAnswer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Maximum number of tool executions within one `advance` chain.
    pub max_tool_depth: usize,
    pub depth_policy: DepthLimitPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_depth: 8,
            depth_policy: DepthLimitPolicy::default(),
        }
    }
}

/// Where the current `advance` chain stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    ToolRequested,
    ToolExecuting,
    Answered,
}

/// Owns one conversation and its ordering counter.
///
/// `advance` takes `&mut self`, so a single orchestrator can only process one
/// request at a time. Independent sessions use independent instances sharing
/// the same read-only [`FunctionRegistry`].
pub struct Orchestrator {
    llm: Arc<dyn LLMClient>,
    registry: Arc<FunctionRegistry>,
    context: ConversationContext,
    policy: Arc<dyn ContextPolicy>,
    config: OrchestratorConfig,
    replies: ReplyBroadcaster,
    next_index: u64,
    state: TurnState,
}

impl Orchestrator {
    pub fn builder(llm: Arc<dyn LLMClient>, registry: Arc<FunctionRegistry>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            llm,
            registry,
            system_prompts: Vec::new(),
            policy: Arc::new(FullHistory),
            config: OrchestratorConfig::default(),
            replies: None,
        }
    }

    /// Records the call identifier so the model can refer to it (e.g. to transfer the call).
    pub fn set_session_id(&mut self, session_id: &str) {
        self.context.append_system(format!("callSid: {}", session_id));
    }

    /// Processes one recognized user utterance.
    pub async fn advance(
        &mut self,
        text: &str,
        interaction_id: u64,
    ) -> Result<String, OrchestratorError> {
        self.advance_as(text, interaction_id, Role::User, "user").await
    }

    /// Appends `text` under the given role and runs the completion loop until
    /// the model answers directly. Returns the final answer.
    ///
    /// `name` is only recorded for [`Role::Function`] messages.
    #[instrument(name = "advance", skip(self, text, role, name), fields(role = %role))]
    pub async fn advance_as(
        &mut self,
        text: &str,
        interaction_id: u64,
        role: Role,
        name: &str,
    ) -> Result<String, OrchestratorError> {
        match role {
            Role::System => self.context.append_system(text),
            Role::User => self.context.append_user(text),
            Role::Assistant => self.context.append_assistant(text),
            Role::Function => self.context.append_function_result(name, text),
        }

        let mut depth = 0;
        loop {
            self.state = TurnState::AwaitingModel;
            let offer_tools = depth < self.config.max_tool_depth
                || self.config.depth_policy == DepthLimitPolicy::Error;

            let (content, call) = match self.request_completion(offer_tools).await? {
                LLMAction::TextResponse(content) => {
                    return Ok(self.finish_with_answer(interaction_id, content));
                }
                LLMAction::ToolCall { content, call } => (content, call),
            };

            self.state = TurnState::ToolRequested;
            if depth >= self.config.max_tool_depth {
                warn!(
                    tool = %call.name,
                    limit = self.config.max_tool_depth,
                    "Tool call chain limit reached"
                );
                return Err(OrchestratorError::RecursionLimit {
                    limit: self.config.max_tool_depth,
                });
            }
            depth += 1;
            self.run_tool(interaction_id, content, call).await?;
        }
    }

    async fn request_completion(&self, offer_tools: bool) -> Result<LLMAction, OrchestratorError> {
        let tools = if offer_tools {
            self.registry
                .manifest()
                .to_chat_tools()
                .map_err(OrchestratorError::ModelRequest)?
        } else {
            Vec::new()
        };
        let messages = self.policy.window(self.context.messages());
        debug!(
            messages = messages.len(),
            tools = tools.len(),
            "Requesting completion"
        );
        self.llm
            .decide_action(messages, tools)
            .await
            .map_err(OrchestratorError::ModelRequest)
    }

    /// Resolves, announces and executes a requested tool, then records its result.
    ///
    /// Unknown tools and unparseable arguments abort before anything is
    /// recorded or announced. A failing tool leaves an `error:` function
    /// message in the context before the error is returned.
    async fn run_tool(
        &mut self,
        interaction_id: u64,
        content: String,
        call: ToolCallRequest,
    ) -> Result<(), OrchestratorError> {
        let registry = self.registry.clone();
        let resolved = registry.lookup(&call.name)?;
        let payload = call.arguments();
        let arguments = parse_tool_arguments(&call.name, &payload)?;

        self.context.append_assistant_tool_call(
            content,
            ToolInvocation {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: payload,
            },
        );
        self.replies
            .emit(ReplyEvent::filler(interaction_id, resolved.entry.say.clone()));

        self.state = TurnState::ToolExecuting;
        info!(tool = %call.name, %arguments, "Executing tool");
        match resolved.tool.execute(arguments).await {
            Ok(output) => {
                debug!(tool = %call.name, %output, "Tool finished");
                self.context.append_tool_result(&call.id, &call.name, output);
                Ok(())
            }
            Err(source) => {
                warn!(tool = %call.name, error = %source, "Tool failed");
                self.context.append_tool_result(
                    &call.id,
                    &call.name,
                    format!("error: {}", source),
                );
                Err(OrchestratorError::ToolExecution {
                    tool: call.name,
                    source,
                })
            }
        }
    }

    fn finish_with_answer(&mut self, interaction_id: u64, content: String) -> String {
        let index = self.next_index;
        self.next_index += 1;
        self.replies
            .emit(ReplyEvent::answer(interaction_id, index, content.clone()));
        self.context.append_assistant(content.clone());
        self.state = TurnState::Answered;
        debug!(
            ordering_index = index,
            context_len = self.context.len(),
            "Turn answered"
        );
        content
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReplyEvent> {
        self.replies.subscribe()
    }

    pub fn reply_stream(&self) -> BroadcastStream<ReplyEvent> {
        self.replies.stream()
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// The index the next direct answer will carry.
    pub fn next_ordering_index(&self) -> u64 {
        self.next_index
    }

    pub fn state(&self) -> TurnState {
        self.state
    }
}

pub struct OrchestratorBuilder {
    llm: Arc<dyn LLMClient>,
    registry: Arc<FunctionRegistry>,
    system_prompts: Vec<String>,
    policy: Arc<dyn ContextPolicy>,
    config: OrchestratorConfig,
    replies: Option<ReplyBroadcaster>,
}

impl OrchestratorBuilder {
    /// Adds a system prompt; prompts keep the order they are added in.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompts.push(prompt.into());
        self
    }

    pub fn context_policy(mut self, policy: Arc<dyn ContextPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Publishes replies through an existing broadcaster instead of a new one.
    pub fn replies(mut self, replies: ReplyBroadcaster) -> Self {
        self.replies = Some(replies);
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            llm: self.llm,
            registry: self.registry,
            context: ConversationContext::new(self.system_prompts),
            policy: self.policy,
            config: self.config,
            replies: self.replies.unwrap_or_else(|| ReplyBroadcaster::new(64)),
            next_index: 0,
            state: TurnState::AwaitingModel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::SlidingWindow,
        llm_client::MockLLMClient,
        manifest::{ToolManifest, ToolManifestEntry},
        message::Message,
        registry::{MockTool, Tool},
    };
    use anyhow::anyhow;
    use mockall::Sequence;
    use serde_json::json;

    const SAY: &str = "Let me check that for you.";

    fn tool_call(name: &str, fragments: &[&str]) -> LLMAction {
        LLMAction::ToolCall {
            content: String::new(),
            call: ToolCallRequest {
                id: format!("call_{}", name),
                name: name.to_string(),
                argument_fragments: fragments.iter().map(|f| f.to_string()).collect(),
            },
        }
    }

    fn text(content: &str) -> LLMAction {
        LLMAction::TextResponse(content.to_string())
    }

    fn registry_with(tool: MockTool) -> Arc<FunctionRegistry> {
        let manifest = ToolManifest::from_entries(vec![ToolManifestEntry::new(
            "check_weight",
            "Look up the latest weight.",
            json!({"type": "object", "properties": {"unit": {"type": "string"}}}),
            SAY,
        )])
        .unwrap();
        Arc::new(
            FunctionRegistry::builder(Arc::new(manifest))
                .register("check_weight", Arc::new(tool) as Arc<dyn Tool>)
                .build()
                .unwrap(),
        )
    }

    fn unused_tool() -> MockTool {
        let mut tool = MockTool::new();
        tool.expect_execute().never();
        tool
    }

    fn orchestrator(llm: MockLLMClient, tool: MockTool) -> Orchestrator {
        Orchestrator::builder(Arc::new(llm), registry_with(tool))
            .system_prompt("You are a helpful voice companion.")
            .build()
    }

    fn drain(rx: &mut broadcast::Receiver<ReplyEvent>) -> Vec<ReplyEvent> {
        let mut events = vec![];
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_direct_answers_are_indexed_from_zero() {
        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        for answer in ["Hi!", "Sure.", "Goodbye."] {
            llm.expect_decide_action()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(text(answer)));
        }
        let mut orch = orchestrator(llm, unused_tool());
        let mut rx = orch.subscribe();

        for (i, utterance) in ["hello", "can you help", "bye"].iter().enumerate() {
            orch.advance(utterance, i as u64).await.unwrap();
        }

        let events = drain(&mut rx);
        let indices: Vec<Option<u64>> = events.iter().map(|e| e.ordering_index).collect();
        assert_eq!(indices, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(events[2].text, "Goodbye.");
        assert_eq!(events[2].interaction_id, 2);
        assert_eq!(orch.next_ordering_index(), 3);
        assert_eq!(orch.state(), TurnState::Answered);
        // system + 3 * (user + assistant)
        assert_eq!(orch.context().len(), 7);
    }

    #[tokio::test]
    async fn test_filler_is_emitted_before_tool_executes() {
        let replies = ReplyBroadcaster::new(16);
        let mut rx_in_tool = replies.subscribe();
        let mut rx = replies.subscribe();

        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(1)
            .withf(|args| *args == json!({"unit": "kg"}))
            .returning(move |_| {
                let event = rx_in_tool.try_recv().expect("filler must precede execution");
                assert_eq!(event.ordering_index, None);
                assert_eq!(event.text, SAY);
                Ok("82 kg".to_string())
            });

        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(tool_call("check_weight", &["{\"unit\":", "\"kg\"}"])));
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|messages: &Vec<Message>, _| {
                messages.last()
                    == Some(&Message::tool_result("call_check_weight", "check_weight", "82 kg"))
            })
            .returning(|_, _| Ok(text("You weigh 82 kilograms.")));

        let mut orch = Orchestrator::builder(Arc::new(llm), registry_with(tool))
            .system_prompt("persona")
            .replies(replies)
            .build();

        let answer = orch.advance("what's my weight", 5).await.unwrap();
        assert_eq!(answer, "You weigh 82 kilograms.");

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ReplyEvent::filler(5, SAY),
                ReplyEvent::answer(5, 0, "You weigh 82 kilograms."),
            ]
        );
    }

    #[tokio::test]
    async fn test_context_after_tool_call() {
        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(1)
            .returning(|_| Ok("82 kg".to_string()));

        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(tool_call("check_weight", &["{}"])));
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(text("82 kilograms.")));

        let mut orch = orchestrator(llm, tool);
        orch.advance("hello", 1).await.unwrap();

        let messages = orch.context().messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::Function,
                Role::Assistant
            ]
        );
        assert_eq!(messages[1].content, "hello");
        assert_eq!(
            messages[2].tool_call,
            Some(ToolInvocation {
                id: "call_check_weight".into(),
                name: "check_weight".into(),
                arguments: "{}".into()
            })
        );
        assert_eq!(
            messages[3],
            Message::tool_result("call_check_weight", "check_weight", "82 kg")
        );
        assert_eq!(messages[4], Message::assistant("82 kilograms."));
        // The utterance is recorded exactly once regardless of chain depth.
        assert_eq!(messages.iter().filter(|m| m.role == Role::User).count(), 1);
    }

    #[tokio::test]
    async fn test_chained_tool_calls_emit_one_ordered_reply() {
        const N: usize = 3;
        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(N)
            .returning(|_| Ok("ok".to_string()));

        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        llm.expect_decide_action()
            .times(N)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(tool_call("check_weight", &["{}"])));
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(text("All done.")));

        let mut orch = orchestrator(llm, tool);
        let mut rx = orch.subscribe();
        orch.advance("check three times", 9).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), N + 1);
        assert!(events[..N].iter().all(ReplyEvent::is_filler));
        assert_eq!(events[N], ReplyEvent::answer(9, 0, "All done."));
        // Deliberately not `initial + 1` after a first advance: each tool hop
        // records the assistant request and its function result, and the direct
        // answer records an assistant message. What stays at one regardless of
        // depth is the utterance (checked in test_context_after_tool_call).
        // system + user + N * (assistant tool call + function result) + answer
        assert_eq!(orch.context().len(), 1 + 1 + 2 * N + 1);
    }

    #[tokio::test]
    async fn test_duplicated_arguments_are_recovered() {
        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(1)
            .withf(|args| *args == json!({"a": 1}))
            .returning(|_| Ok("fine".to_string()));

        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(tool_call("check_weight", &["{\"a\":1}", "{\"a\":1}"])));
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(text("Fine.")));

        let mut orch = orchestrator(llm, tool);
        assert_eq!(orch.advance("go", 1).await.unwrap(), "Fine.");
    }

    #[tokio::test]
    async fn test_unparseable_arguments_abort_before_filler() {
        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(1)
            .returning(|_, _| Ok(tool_call("check_weight", &["{\"a\":1"])));

        let mut orch = orchestrator(llm, unused_tool());
        let mut rx = orch.subscribe();
        let err = orch.advance("go", 1).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::ArgumentParse { ref tool, .. } if tool == "check_weight"));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(orch.context().len(), 2);
        assert_eq!(orch.next_ordering_index(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_surfaced() {
        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(1)
            .returning(|_, _| Ok(tool_call("check_wieght", &["{}"])));

        let mut orch = orchestrator(llm, unused_tool());
        let mut rx = orch.subscribe();
        match orch.advance("go", 1).await {
            Err(OrchestratorError::UnknownTool { name, suggestion }) => {
                assert_eq!(name, "check_wieght");
                assert_eq!(suggestion.as_deref(), Some("check_weight"));
            }
            other => panic!("Expected UnknownTool, got {:?}", other),
        }
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_tool_failure_is_recorded_and_propagated() {
        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(1)
            .returning(|_| Err(anyhow!("scale offline")));

        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(1)
            .returning(|_, _| Ok(tool_call("check_weight", &["{}"])));

        let mut orch = orchestrator(llm, tool);
        let mut rx = orch.subscribe();
        let err = orch.advance("weight?", 2).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::ToolExecution { ref tool, .. } if tool == "check_weight"));
        assert_eq!(
            orch.context().last(),
            Some(&Message::tool_result(
                "call_check_weight",
                "check_weight",
                "error: scale offline"
            ))
        );
        // The filler had already gone out.
        assert_eq!(drain(&mut rx), vec![ReplyEvent::filler(2, SAY)]);
    }

    #[tokio::test]
    async fn test_model_failure_is_surfaced() {
        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(1)
            .returning(|_, _| Err(anyhow!("quota exceeded")));

        let mut orch = orchestrator(llm, unused_tool());
        let err = orch.advance("hello", 1).await.unwrap_err();

        assert!(matches!(err, OrchestratorError::ModelRequest(_)));
        assert_eq!(err.to_string(), "Model request failed: quota exceeded");
        assert_eq!(orch.context().last(), Some(&Message::user("hello")));
    }

    #[tokio::test]
    async fn test_depth_limit_error_policy() {
        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(2)
            .returning(|_| Ok("again".to_string()));

        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(3)
            .returning(|_, _| Ok(tool_call("check_weight", &["{}"])));

        let mut orch = Orchestrator::builder(Arc::new(llm), registry_with(tool))
            .config(OrchestratorConfig {
                max_tool_depth: 2,
                depth_policy: DepthLimitPolicy::Error,
            })
            .build();

        let err = orch.advance("loop forever", 1).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::RecursionLimit { limit: 2 }));
    }

    #[tokio::test]
    async fn test_depth_limit_force_answer_withholds_tools() {
        let mut tool = MockTool::new();
        tool.expect_execute()
            .times(1)
            .returning(|_| Ok("ok".to_string()));

        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, tools| tools.len() == 1)
            .returning(|_, _| Ok(tool_call("check_weight", &["{}"])));
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, tools| tools.is_empty())
            .returning(|_, _| Ok(text("Here is what I found.")));

        let mut orch = Orchestrator::builder(Arc::new(llm), registry_with(tool))
            .config(OrchestratorConfig {
                max_tool_depth: 1,
                depth_policy: DepthLimitPolicy::ForceAnswer,
            })
            .build();

        assert_eq!(
            orch.advance("check", 1).await.unwrap(),
            "Here is what I found."
        );
    }

    #[tokio::test]
    async fn test_advance_as_function_records_name() {
        let mut llm = MockLLMClient::new();
        llm.expect_decide_action()
            .times(1)
            .returning(|_, _| Ok(text("Noted.")));

        let mut orch = orchestrator(llm, unused_tool());
        orch.advance_as("82 kg", 4, Role::Function, "check_weight")
            .await
            .unwrap();

        assert_eq!(
            orch.context().messages()[1],
            Message::function("check_weight", "82 kg")
        );
    }

    #[tokio::test]
    async fn test_session_id_and_window_policy() {
        let mut llm = MockLLMClient::new();
        let mut seq = Sequence::new();
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(text("one")));
        llm.expect_decide_action()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|messages: &Vec<Message>, _| {
                let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
                contents == vec!["persona", "callSid: CA42", "one", "second"]
            })
            .returning(|_, _| Ok(text("two")));

        let mut orch = Orchestrator::builder(Arc::new(llm), registry_with(unused_tool()))
            .system_prompt("persona")
            .context_policy(Arc::new(SlidingWindow { max_messages: 2 }))
            .build();
        orch.set_session_id("CA42");

        orch.advance("first", 1).await.unwrap();
        orch.advance("second", 2).await.unwrap();
        // The full history is still kept.
        assert_eq!(orch.context().len(), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_independent_sessions_share_only_the_registry() {
        let mut tool = MockTool::new();
        tool.expect_execute().times(2).returning(|args| {
            Ok(format!("weighed in {}", args["unit"].as_str().unwrap_or("?")))
        });
        let registry = registry_with(tool);

        let session = |unit: &'static str, answer: &'static str| {
            let mut llm = MockLLMClient::new();
            let mut seq = Sequence::new();
            llm.expect_decide_action()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _| {
                    let payload = format!("{{\"unit\":\"{}\"}}", unit);
                    Ok(tool_call("check_weight", &[payload.as_str()]))
                });
            llm.expect_decide_action()
                .times(2)
                .in_sequence(&mut seq)
                .returning(move |_, _| Ok(text(answer)));
            Orchestrator::builder(Arc::new(llm), registry.clone())
                .system_prompt("persona")
                .build()
        };
        let first = session("kg", "Session one.");
        let second = session("lb", "Session two.");
        assert_eq!(Arc::strong_count(&registry), 3);

        let run = |mut orch: Orchestrator, first_id: u64| {
            tokio::spawn(async move {
                let mut rx = orch.subscribe();
                orch.advance("weigh me", first_id).await.unwrap();
                orch.advance("thanks", first_id + 1).await.unwrap();
                let events = drain(&mut rx);
                (orch, events)
            })
        };
        let (first, second) = (run(first, 0), run(second, 10));
        let (first, first_events) = first.await.unwrap();
        let (second, second_events) = second.await.unwrap();

        assert_eq!(
            first_events,
            vec![
                ReplyEvent::filler(0, SAY),
                ReplyEvent::answer(0, 0, "Session one."),
                ReplyEvent::answer(1, 1, "Session one."),
            ]
        );
        assert_eq!(
            second_events,
            vec![
                ReplyEvent::filler(10, SAY),
                ReplyEvent::answer(10, 0, "Session two."),
                ReplyEvent::answer(11, 1, "Session two."),
            ]
        );
        assert_eq!(first.next_ordering_index(), 2);
        assert_eq!(second.next_ordering_index(), 2);

        assert_eq!(first.context().len(), 7);
        assert_eq!(second.context().len(), 7);
        assert_eq!(first.context().messages()[3].content, "weighed in kg");
        assert_eq!(second.context().messages()[3].content, "weighed in lb");
    }
}
