//! OpenAI API request and response types.

use serde::{Deserialize, Serialize};

use crate::cost::Cost;
use crate::error::{OpenAIError, Result};

// =============================================================================
// Chat Completion
// =============================================================================

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "gpt-3.5-turbo")
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /// Create a new chat request with the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// Add a message to the conversation.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Single user message made of an instruction followed directly by the
    /// payload it applies to.
    pub fn instruction(model: impl Into<String>, instruction: &str, payload: &str) -> Self {
        let mut content = String::with_capacity(instruction.len() + payload.len());
        content.push_str(instruction);
        content.push_str(payload);
        Self::new(model).message(Message::user(content))
    }
}

/// Chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A billed completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Content of the first choice, exactly as returned
    pub content: String,

    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// What this call added to the ledger
    pub cost: Cost,
}

impl CompletionResponse {
    /// Content with any markdown code fence removed.
    pub fn unwrapped_content(&self) -> Result<&str> {
        unwrap_code_fence(&self.content)
    }
}

/// Raw chat response from API (for internal parsing).
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    #[allow(dead_code)]
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageResponse,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used
    #[serde(default)]
    pub total_tokens: u32,
}

// =============================================================================
// Errors on the wire
// =============================================================================

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ApiErrorBody {
    /// Classify a non-2xx body. Bodies that are not an error envelope still
    /// produce an API error carrying the raw text.
    pub(crate) fn into_error(body: &str, status: u16) -> OpenAIError {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) => OpenAIError::Api {
                status,
                code: parsed.error.code,
                kind: parsed.error.kind,
                message: parsed.error.message,
            },
            Err(_) => OpenAIError::Api {
                status,
                code: None,
                kind: None,
                message: truncate_to_char_boundary(body, 512).to_string(),
            },
        }
    }
}

// =============================================================================
// Utilities
// =============================================================================

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Remove a markdown code fence around a response.
///
/// Unfenced content is returned trimmed. A fence that is opened but never
/// closed, or that wraps nothing, is a parse error.
pub fn unwrap_code_fence(response: &str) -> Result<&str> {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return Ok(trimmed);
    };

    let end = rest
        .rfind("```")
        .ok_or_else(|| OpenAIError::Parse("unterminated code fence".into()))?;
    let inner = &rest[..end];

    let inner = match inner.split_once('\n') {
        Some((info, body)) if is_info_string(info) => body,
        _ => inner.strip_prefix("json").unwrap_or(inner),
    }
    .trim();

    if inner.is_empty() {
        return Err(OpenAIError::Parse("empty code fence".into()));
    }
    Ok(inner)
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_request_concatenates() {
        let req = ChatRequest::instruction("gpt-3.5-turbo", "List links:", "/a,/b");

        assert_eq!(req.model, "gpt-3.5-turbo");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
        assert_eq!(req.messages[0].content, "List links:/a,/b");
    }

    #[test]
    fn test_request_wire_shape() {
        let req = ChatRequest::instruction("gpt-3.5-turbo", "Hi ", "there");
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "Hi there"}]
            })
        );
    }

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_unwrap_code_fence() {
        assert_eq!(unwrap_code_fence("```json\n{}\n```").unwrap(), "{}");
        assert_eq!(unwrap_code_fence("```\n[1]\n```").unwrap(), "[1]");
        assert_eq!(unwrap_code_fence("```json[\"/a\"]```").unwrap(), "[\"/a\"]");
        assert_eq!(unwrap_code_fence("  {}  ").unwrap(), "{}");
        assert_eq!(
            unwrap_code_fence("```json\n{\"a\": 1}\n```\nHope this helps!").unwrap(),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_unwrap_code_fence_rejects_broken_fences() {
        assert!(matches!(
            unwrap_code_fence("```json\n{\"a\": 1}"),
            Err(OpenAIError::Parse(_))
        ));
        assert!(matches!(unwrap_code_fence("```json\n```"), Err(OpenAIError::Parse(_))));
    }

    #[test]
    fn test_error_body_classification() {
        let body = r#"{"error":{"message":"Rate limit reached. Please try again in 20ms.","type":"tokens","param":null,"code":"rate_limit_exceeded"}}"#;
        let err = ApiErrorBody::into_error(body, 429);

        assert!(err.is_rate_limit());
        match err {
            OpenAIError::Api { status, kind, message, .. } => {
                assert_eq!(status, 429);
                assert_eq!(kind.as_deref(), Some("tokens"));
                assert!(message.contains("try again in 20ms"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_body_not_an_envelope() {
        let err = ApiErrorBody::into_error("<html>Bad Gateway</html>", 502);

        match err {
            OpenAIError::Api { status, code, message, .. } => {
                assert_eq!(status, 502);
                assert!(code.is_none());
                assert_eq!(message, "<html>Bad Gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
