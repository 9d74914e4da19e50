//! Tutor system prompt and chat message assembly

use serde::Serialize;

use crate::conversation::ConversationTurn;

/// Fixed instruction steering every feedback request
///
/// Greeting and follow-up rules follow one policy: greet only when the
/// conversation is new or resumes after a long pause, and always close with a
/// single simple question.
pub const TUTOR_SYSTEM_PROMPT: &str = "\
Act as a friendly English language tutor for children aged 8-9 who are learning English. Your role is to:
1. Gently correct any grammatical mistakes or mispronunciations in what the child says, and explain each correction in a way that helps them learn.
2. Greet the child only if it is the start of a new conversation or if there has been a long pause.
3. Give encouraging feedback with simple explanations, using examples and comparisons a child can easily understand.
4. Always respond in simple English, even if the child speaks another language.
5. End every reply on a positive note with one fun, simple question about their interests or daily activities, such as 'What are you doing?' or 'What do you like?'.
6. Keep every reply brief and short.

Remember, you are teaching English, so use only English in your replies. Keep your language simple, clear and engaging for young learners.";

/// One message in a chat completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

/// Assemble the message list for a feedback request
///
/// Order is: system instruction, prior turns as recorded, then the new
/// learner text as the final user message.
#[must_use]
pub fn build_messages<'a>(
    system_prompt: &'a str,
    history: &'a [ConversationTurn],
    user_text: &'a str,
) -> Vec<ChatMessage<'a>> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system_prompt,
    });
    messages.extend(history.iter().map(|turn| ChatMessage {
        role: turn.role().as_str(),
        content: turn.text(),
    }));
    messages.push(ChatMessage {
        role: "user",
        content: user_text,
    });
    messages
}
