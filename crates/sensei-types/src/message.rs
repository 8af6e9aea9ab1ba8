//! Message and request types for the tutor chat API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a chat participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Parse a raw role string as received from the UI boundary.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A message as received from UI code, before validation.
///
/// The role is a plain string here; `sensei-guard` turns a batch of these
/// into [`ChatMessage`]s or rejects the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub role: String,
    pub content: String,
}

/// A validated, sanitized chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Tutoring mode for a chat call.
///
/// Unknown mode strings fall back to the default instead of failing the
/// call; the mode only steers the tutor's tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorMode {
    #[default]
    Explain,
    Practice,
    Review,
    Socratic,
}

impl TutorMode {
    /// Parse a free-form mode string, falling back to the default.
    pub fn parse_or_default(raw: &str) -> TutorMode {
        match raw.trim().to_ascii_lowercase().as_str() {
            "explain" => TutorMode::Explain,
            "practice" => TutorMode::Practice,
            "review" => TutorMode::Review,
            "socratic" => TutorMode::Socratic,
            _ => TutorMode::default(),
        }
    }
}

/// Curriculum weeks are clamped into this range.
pub const WEEK_RANGE: std::ops::RangeInclusive<i64> = 1..=52;

/// Optional context fields supplied alongside a chat request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatContext {
    pub mode: Option<String>,
    pub week: Option<i64>,
    pub mission: Option<String>,
    pub step: Option<String>,
}

/// A streaming chat request as handed in by UI code.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<RawMessage>,
    /// Optional identifier of a learning resource the chat is scoped to.
    /// Must be a canonical UUID owned by the authenticated user.
    pub resource_id: Option<String>,
    pub context: ChatContext,
}

impl ChatRequest {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// The sanitized JSON body POSTed to the streaming endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatBody {
    pub messages: Vec<ChatMessage>,
    pub mode: TutorMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<Uuid>,
    pub stream: bool,
}

/// One JSON record of the streaming response body.
///
/// Mirrors the chat-completion streaming shape: the text fragment lives at
/// `choices[0].delta.content`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

impl StreamPayload {
    /// Extract the delta text, if the payload carries a non-empty one.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: DeltaContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeltaContent {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_known() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), Some(Role::System));
    }

    #[test]
    fn role_parse_unknown() {
        assert_eq!(Role::parse("admin"), None);
        assert_eq!(Role::parse("User"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
    }

    #[test]
    fn tutor_mode_parse_or_default() {
        assert_eq!(TutorMode::parse_or_default("practice"), TutorMode::Practice);
        assert_eq!(TutorMode::parse_or_default(" Socratic "), TutorMode::Socratic);
        assert_eq!(TutorMode::parse_or_default("pirate"), TutorMode::Explain);
        assert_eq!(TutorMode::parse_or_default(""), TutorMode::Explain);
    }

    #[test]
    fn stream_payload_delta_content() {
        let payload: StreamPayload =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#).unwrap();
        assert_eq!(payload.delta_content(), Some("Hi"));
    }

    #[test]
    fn stream_payload_empty_delta() {
        let payload: StreamPayload =
            serde_json::from_str(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap();
        assert_eq!(payload.delta_content(), None);
    }

    #[test]
    fn stream_payload_missing_fields() {
        let payload: StreamPayload = serde_json::from_str(r#"{"choices":[{}]}"#).unwrap();
        assert_eq!(payload.delta_content(), None);
        let payload: StreamPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.delta_content(), None);
    }

    #[test]
    fn chat_body_skips_absent_fields() {
        let body = ChatBody {
            messages: vec![ChatMessage {
                role: Role::User,
                content: "hello".into(),
            }],
            mode: TutorMode::Explain,
            week: None,
            mission: None,
            step: None,
            resource_id: None,
            stream: true,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("week"));
        assert!(!json.contains("mission"));
        assert!(!json.contains("resource_id"));
        assert!(json.contains("\"stream\":true"));
    }
}
