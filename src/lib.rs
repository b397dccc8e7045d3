//! Client library for local OpenAI-compatible chat completion servers.
//!
//! A [`ChatSession`] keeps the conversation, sends each turn as a streaming or
//! single-shot request, and rebuilds the assistant reply (text and tool calls)
//! from the server's SSE fragments.

pub mod api;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod image;
pub mod models;
pub mod orchestrator;
pub mod ui;

pub use config::ClientConfig;
pub use conversation::Conversation;
pub use error::{LmChatError, Result};
pub use events::{EventSink, SessionEvent};
pub use orchestrator::{AssistantReply, ChatSession, TurnOutcome, TurnRequest};
