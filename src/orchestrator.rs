use crate::api::{
    build_http_client, ensure_success, make_api_request, process_non_streaming_response,
    process_streaming_response, ModelsClient, RequestBody, StreamOutcome, StreamingResult,
};
use crate::config::ClientConfig;
use crate::conversation::Conversation;
use crate::error::{LmChatError, Result};
use crate::events::{EventSink, SessionEvent};
use crate::image::load_images;
use crate::models::{Message, ToolCall, ToolDefinition};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Input for one call to [`ChatSession::send_turn`].
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// May be absent once the conversation has history.
    pub user_text: Option<String>,
    pub images: Vec<PathBuf>,
    /// Replaces the session's default tools for this turn.
    pub tools: Option<Vec<ToolDefinition>>,
    /// Overrides [`ClientConfig::stream`] for this turn.
    pub stream: Option<bool>,
}

impl TurnRequest {
    pub fn text(user_text: impl Into<String>) -> Self {
        Self {
            user_text: Some(user_text.into()),
            ..Self::default()
        }
    }

    /// A turn that only sends the history, e.g. after tool results were added.
    pub fn continuation() -> Self {
        Self::default()
    }

    pub fn with_images(mut self, images: Vec<PathBuf>) -> Self {
        self.images = images;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
}

impl AssistantReply {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

impl From<StreamingResult> for AssistantReply {
    fn from(result: StreamingResult) -> Self {
        Self {
            text: result.content,
            tool_calls: result.tool_calls,
            finish_reason: result.finish_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed(AssistantReply),
    Cancelled,
}

/// A conversation bound to one server endpoint.
///
/// At most one completion runs at a time. Starting a turn cancels the one
/// registered before it and then waits for it to release the conversation.
#[derive(Debug)]
pub struct ChatSession {
    config: ClientConfig,
    client: Client,
    conversation: Mutex<Conversation>,
    active: std::sync::Mutex<Option<(u64, CancellationToken)>>,
    next_call_id: AtomicU64,
    default_tools: Vec<ToolDefinition>,
    events: EventSink,
}

impl ChatSession {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = build_http_client(&config)?;
        Ok(Self {
            conversation: Mutex::new(Conversation::new(config.system_prompt.clone())),
            config,
            client,
            active: std::sync::Mutex::new(None),
            next_call_id: AtomicU64::new(0),
            default_tools: Vec::new(),
            events: EventSink::new(),
        })
    }

    /// Tools offered on every turn that does not bring its own.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.default_tools = tools;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn models(&self) -> ModelsClient {
        ModelsClient::new(self.client.clone(), &self.config)
    }

    pub fn subscribe(&self) -> UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn add_tool_result(
        &self,
        tool_call_id: impl Into<String>,
        result: impl Into<String>,
    ) -> Result<()> {
        self.conversation
            .lock()
            .await
            .append_tool_result(tool_call_id, result)
    }

    pub async fn clear(&self, new_system_prompt: Option<&str>) {
        self.conversation.lock().await.clear(new_system_prompt);
    }

    /// Cancels the in-flight turn, if any.
    pub fn request_stop(&self) {
        if let Some((id, token)) = self.active_slot().as_ref() {
            debug!("stop requested for call {}", id);
            token.cancel();
        }
    }

    pub async fn send_turn(&self, request: TurnRequest, cancel: CancellationToken) -> Result<TurnOutcome> {
        let call_id = self.register(&cancel);
        let result = self.run_turn(request, &cancel).await;
        self.unregister(call_id);

        match &result {
            Ok(TurnOutcome::Cancelled) => self.events.emit(SessionEvent::Cancelled),
            Ok(TurnOutcome::Completed(reply)) => {
                if reply.has_tool_calls() {
                    self.events.emit(SessionEvent::ToolCalls(reply.tool_calls.clone()));
                }
                self.events.emit(SessionEvent::Completed(reply.text.clone()));
            }
            Err(e) => self.events.emit(SessionEvent::Error(e.to_string())),
        }
        result
    }

    async fn run_turn(&self, request: TurnRequest, cancel: &CancellationToken) -> Result<TurnOutcome> {
        let mut conversation = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(TurnOutcome::Cancelled),
            guard = self.conversation.lock() => guard,
        };

        let user_text = request.user_text.filter(|t| !t.trim().is_empty());
        if user_text.is_none() && !conversation.has_history() {
            return Err(LmChatError::EmptyMessage);
        }

        let images = load_images(&request.images).await?;
        let pending = if user_text.is_some() || !images.is_empty() {
            Some((user_text.unwrap_or_default(), images))
        } else {
            None
        };
        let pending_message = pending
            .as_ref()
            .map(|(text, images)| Message::user_with_images(text.clone(), images.clone()));

        let tools = request
            .tools
            .unwrap_or_else(|| self.default_tools.clone());
        let stream = request.stream.unwrap_or(self.config.stream);
        let body = RequestBody::new(
            self.config.model.clone(),
            conversation.with_pending(pending_message.as_ref()),
            stream,
            Some(tools.clone()),
        );

        let Some(result) = self.complete(&body, cancel).await? else {
            return Ok(TurnOutcome::Cancelled);
        };

        check_arguments(&result.tool_calls, &tools);

        if let Some((text, images)) = pending {
            conversation.append_user(text, images);
        }
        conversation.append_assistant(result.content.clone(), Some(result.tool_calls.clone()));

        Ok(TurnOutcome::Completed(result.into()))
    }

    /// Returns `None` when cancelled.
    async fn complete(&self, body: &RequestBody, cancel: &CancellationToken) -> Result<Option<StreamingResult>> {
        self.events.status(if body.stream {
            "Sending streaming request..."
        } else {
            "Sending non-streaming request..."
        });

        let request_timeout = if body.stream {
            None
        } else {
            Some(Duration::from_secs(self.config.request_timeout))
        };
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            response = make_api_request(&self.client, &self.config.endpoint, body, request_timeout) => response?,
        };

        self.events.status("Response headers received");
        debug!("response status: {}", response.status());
        let response = ensure_success(response).await?;

        if body.stream {
            self.events.status("Processing streaming response...");
            match process_streaming_response(response, self.config.stream_timeout, cancel, &self.events).await? {
                StreamOutcome::Completed(result) => Ok(Some(result)),
                StreamOutcome::Cancelled => Ok(None),
            }
        } else {
            self.events.status("Processing non-streaming response...");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Ok(None),
                result = process_non_streaming_response(response) => result.map(Some),
            }
        }
    }

    fn register(&self, cancel: &CancellationToken) -> u64 {
        let call_id = self.next_call_id.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.active_slot();
        if let Some((previous_id, previous)) = slot.take() {
            debug!("call {} supersedes call {}", call_id, previous_id);
            previous.cancel();
        }
        *slot = Some((call_id, cancel.clone()));
        call_id
    }

    fn unregister(&self, call_id: u64) {
        let mut slot = self.active_slot();
        if slot.as_ref().is_some_and(|(id, _)| *id == call_id) {
            *slot = None;
        }
    }

    fn active_slot(&self) -> std::sync::MutexGuard<'_, Option<(u64, CancellationToken)>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn check_arguments(calls: &[ToolCall], tools: &[ToolDefinition]) {
    for call in calls {
        let Some(tool) = tools.iter().find(|t| t.name() == call.name()) else {
            warn!("model called unknown tool '{}'", call.name());
            continue;
        };
        let checked = call
            .parse_arguments()
            .and_then(|arguments| tool.validate_arguments(&arguments));
        if let Err(e) = checked {
            warn!("{}", e);
        }
    }
}
