#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Bounded multi-turn conversation context.
//!
//! Text-completion APIs are stateless, so memory is simulated by re-sending
//! recent history inside every prompt. This crate owns that history.
//!
//! # Key Features
//! - Per-conversation rolling window with FIFO eviction
//! - Deterministic prompt flattening with configurable labels
//! - Conversation summaries, search and JSON export
//! - `ChatService` tying the store to an `LLMProvider`

mod conversation;
mod export;
mod prompt;
mod service;
mod store;

pub use conversation::{Conversation, ConversationSummary, NEW_CHAT_TITLE};
pub use export::{ExportSnapshot, ExportedConversation};
pub use prompt::render_prompt;
pub use service::{ChatError, ChatReply, ChatRequest, ChatService, TurnUsage};
pub use store::{ConversationContextStore, SearchHit};
