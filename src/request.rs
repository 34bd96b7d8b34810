//! Message-list construction for completion and streaming calls.

use crate::config::StreamSystemPrompt;
use crate::types::{Message, Role};

fn has_system_message(messages: &[Message]) -> bool {
    messages.iter().any(|message| message.role == Role::System)
}

/// Builds the message list for one completion call.
///
/// `system_prompt` is placed first unless `prior` already carries a system message, and
/// `user_message` is appended last. `prior` itself is left untouched.
///
/// # Examples
///
/// ```
/// use chat_adapter::request::build_messages;
/// use chat_adapter::types::{Message, Role};
///
/// let messages = build_messages("Be brief.", &[], "What is 2+2?");
/// assert_eq!(messages, vec![Message::system("Be brief."), Message::user("What is 2+2?")]);
///
/// let prior = [Message::system("Custom"), Message::assistant("Hi")];
/// let messages = build_messages("Be brief.", &prior, "Thanks");
/// assert_eq!(messages.len(), 3);
/// assert_eq!(messages[0].content, "Custom");
/// assert_eq!(messages[2].role, Role::User);
/// ```
pub fn build_messages(system_prompt: &str, prior: &[Message], user_message: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(prior.len() + 2);
    if !has_system_message(prior) {
        messages.push(Message::system(system_prompt));
    }
    messages.extend_from_slice(prior);
    messages.push(Message::user(user_message));
    messages
}

/// Applies the configured system-prompt policy to a streaming message list.
pub fn apply_stream_system_prompt(
    policy: StreamSystemPrompt,
    system_prompt: &str,
    messages: &[Message],
) -> Vec<Message> {
    let prepend = match policy {
        StreamSystemPrompt::Always => true,
        StreamSystemPrompt::IfMissing => !has_system_message(messages),
    };
    let mut result = Vec::with_capacity(messages.len() + 1);
    if prepend {
        result.push(Message::system(system_prompt));
    }
    result.extend_from_slice(messages);
    result
}
