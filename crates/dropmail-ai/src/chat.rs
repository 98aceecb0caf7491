//! Conversational template assistant.

use dropmail_core::{ChatMessage, ChatRole, TemplateInstance};

use crate::client::{Completion, CompletionRequest, Message};
use crate::editor::{edit_template, EditOutcome};

pub const FALLBACK_REPLY: &str = "I'm having trouble processing your request right now. \
    Please try asking about specific changes you'd like to make to your email template.";

const EDIT_KEYWORDS: [&str; 5] = ["change", "update", "modify", "make", "edit"];

const SYSTEM_PROMPT: &str = "You are a friendly assistant for an HTML marketing email \
    template. The template has a header with the company logo, a main title, a hero image, \
    a greeting and description, a products section filled per recipient, a call-to-action \
    button and a footer. Help the user understand the template and suggest concrete \
    improvements to colours, fonts, text and styling.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    /// Set when the message was treated as an edit and applied.
    pub edit: Option<EditOutcome>,
}

/// Whether a chat message reads as a request to edit the template.
#[must_use]
pub fn is_edit_request(message: &str) -> bool {
    let lower = message.to_lowercase();
    EDIT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Records `message` and the assistant's reply on the instance's chat
/// history. Edit requests are applied to the template; failures become a
/// reply rather than an error.
pub async fn chat(
    client: Option<&dyn Completion>,
    instance: &mut TemplateInstance,
    message: &str,
) -> ChatReply {
    instance.push_chat(ChatMessage::new(ChatRole::User, message));

    let reply = if is_edit_request(message) {
        match edit_template(client, instance, message).await {
            Ok(outcome) => ChatReply {
                response: format!("✅ {}", outcome.explanation),
                edit: Some(outcome),
            },
            Err(e) => ChatReply {
                response: format!("❌ I couldn't make that change: {e}"),
                edit: None,
            },
        }
    } else {
        ChatReply {
            response: converse(client, message).await,
            edit: None,
        }
    };

    instance.push_chat(ChatMessage::new(ChatRole::Assistant, reply.response.clone()));
    reply
}

async fn converse(client: Option<&dyn Completion>, message: &str) -> String {
    let Some(client) = client else {
        return FALLBACK_REPLY.to_string();
    };
    let request = CompletionRequest {
        messages: vec![Message::system(SYSTEM_PROMPT), Message::user(message)],
        max_tokens: 500,
        temperature: 0.7,
    };
    match client.complete(&request).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, "chat completion failed; using fallback reply");
            FALLBACK_REPLY.to_string()
        }
    }
}
