//! Cooking-assistant chat boundary.
//!
//! The core only builds prompts and interprets replies; the HTTP exchange is
//! supplied by a [`ChatProvider`] (the CLI uses reqwest).

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Recipe;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

const ASSISTANT_INSTRUCTIONS: &str = "You are a friendly cooking assistant inside a meal planning app. You help the user to:
1. Find recipes that fit their preferences, dietary needs, ingredients on hand or favourite cuisines
2. Plan breakfast, lunch and dinner for the week
3. Cook with confidence through tips and inspiration
4. Make use of the recipes they have already saved
5. Discover new recipes worth adding to their library
6. Keep meal planning simple

When you suggest a recipe, include:
- Its name
- A short description
- The 3-5 key ingredients
- Approximate cooking time
- Number of servings

Keep answers conversational and concise.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Failure talking to the completion service. Each kind calls for different
/// advice to the user, see [`ChatError::guidance`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Chat is not configured: {0}")]
    Config(String),
    #[error("Chat service request failed: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },
    #[error("Chat service returned an unusable response: {0}")]
    Protocol(String),
}

impl ChatError {
    #[must_use]
    pub fn guidance(&self) -> &'static str {
        match self {
            ChatError::Config(_) => {
                "Set OPENAI_API_KEY in your environment to enable the cooking assistant."
            }
            ChatError::Transport { status: Some(401 | 403), .. } => {
                "The chat service rejected the API key. Check OPENAI_API_KEY."
            }
            ChatError::Transport { .. } => {
                "Could not reach the chat service. Check your connection and try again."
            }
            ChatError::Protocol(_) => {
                "The chat service answered with nothing usable. Try rephrasing your message."
            }
        }
    }
}

/// Injectable completion capability: send `history` with `context` as the
/// system instruction and return the assistant's reply.
pub trait ChatProvider: Send + Sync {
    fn complete(&self, history: &[ChatMessage], context: &str) -> Result<String, ChatError>;
}

/// System instruction with a one-line summary of each saved recipe.
#[must_use]
pub fn system_prompt(recipes: &[Recipe]) -> String {
    let mut prompt = String::from(ASSISTANT_INSTRUCTIONS);
    if recipes.is_empty() {
        prompt.push_str("\n\nThe user has not saved any recipes yet.");
        return prompt;
    }
    prompt.push_str("\n\nThe user's saved recipes:");
    for r in recipes {
        let _ = write!(
            prompt,
            "\n- {} ({} min, {} servings, tags: {})",
            r.title,
            r.cooking_time,
            r.servings,
            r.tags.join(", ")
        );
    }
    prompt
}

// --- Wire format (OpenAI-compatible chat completions) ---

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: Option<String>,
}

/// The system instruction goes first; system turns already in `history`
/// are dropped so it is never duplicated.
#[must_use]
pub fn build_request(model: &str, history: &[ChatMessage], context: &str) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(context));
    messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
    ChatCompletionRequest {
        model: model.to_string(),
        messages,
        temperature: DEFAULT_TEMPERATURE,
        max_tokens: DEFAULT_MAX_TOKENS,
    }
}

/// Pull the reply text out of a successful response body.
pub fn extract_reply(body: &str) -> Result<String, ChatError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::Protocol(format!("invalid JSON: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ChatError::Protocol("no reply in response".to_string()))
}

/// Turn a non-success status and its body into a transport error, preferring
/// the service's own message.
#[must_use]
pub fn rejected(status: u16, reason: &str, body: &str) -> ChatError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("API error: {status} {reason}"));
    ChatError::Transport {
        status: Some(status),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(title: &str, tags: &[&str]) -> Recipe {
        Recipe {
            id: title.to_lowercase(),
            title: title.to_string(),
            image: None,
            ingredients: vec![],
            steps: vec![],
            cooking_time: 25,
            servings: 4,
            tags: tags.iter().map(ToString::to_string).collect(),
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_system_prompt_lists_recipes() {
        let prompt = system_prompt(&[recipe("Chili", &["spicy", "winter"]), recipe("Toast", &[])]);
        assert!(prompt.starts_with(ASSISTANT_INSTRUCTIONS));
        assert!(prompt.contains("- Chili (25 min, 4 servings, tags: spicy, winter)"));
        assert!(prompt.contains("- Toast (25 min, 4 servings, tags: )"));
    }

    #[test]
    fn test_system_prompt_without_recipes() {
        let prompt = system_prompt(&[]);
        assert!(prompt.ends_with("The user has not saved any recipes yet."));
    }

    #[test]
    fn test_build_request_puts_system_first_and_drops_others() {
        let history = vec![
            ChatMessage::system("stale instructions"),
            ChatMessage::user("What's for dinner?"),
            ChatMessage::assistant("Chili!"),
        ];
        let req = build_request(DEFAULT_MODEL, &history, "context");
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[0], ChatMessage::system("context"));
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.messages[2].role, Role::Assistant);
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.max_tokens, 500);
    }

    #[test]
    fn test_request_wire_format() {
        let req = build_request("m", &[ChatMessage::user("hi")], "ctx");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_extract_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Try a frittata."}}]}"#;
        assert_eq!(extract_reply(body).unwrap(), "Try a frittata.");
    }

    #[test]
    fn test_extract_reply_empty_choices_is_protocol_error() {
        let err = extract_reply(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));

        let err = extract_reply(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn test_extract_reply_malformed_is_protocol_error() {
        let err = extract_reply("<html>oops</html>").unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn test_rejected_uses_service_message() {
        let err = rejected(
            401,
            "Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        );
        match &err {
            ChatError::Transport { status, message } => {
                assert_eq!(*status, Some(401));
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.guidance().contains("API key"));
    }

    #[test]
    fn test_rejected_falls_back_to_status() {
        let err = rejected(500, "Internal Server Error", "not json");
        assert_eq!(
            err.to_string(),
            "Chat service request failed: API error: 500 Internal Server Error"
        );
    }

    #[test]
    fn test_guidance_differs_per_kind() {
        let config = ChatError::Config("missing key".to_string());
        let transport = ChatError::Transport {
            status: None,
            message: "timeout".to_string(),
        };
        let protocol = ChatError::Protocol("empty".to_string());
        assert_ne!(config.guidance(), transport.guidance());
        assert_ne!(transport.guidance(), protocol.guidance());
        assert_ne!(config.guidance(), protocol.guidance());
    }
}
