//! LLM-assisted template editing, chat and campaign copy generation.

pub mod chat;
pub mod client;
pub mod editor;
pub mod error;
pub mod generate;
pub mod json;

pub use chat::{chat, is_edit_request, ChatReply, FALLBACK_REPLY};
pub use client::{Completion, CompletionRequest, LlmClient, Message, Role};
pub use editor::{advanced_edit, edit_template, simple_edit, EditOutcome, EditProposal};
pub use error::AiError;
pub use generate::{generate_content, GeneratedContent, SAMPLE_SIZE};
pub use json::extract_json_block;
