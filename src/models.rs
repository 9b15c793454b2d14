// ============================================================================
// File: src/models.rs
// API request and response models
// ============================================================================

use serde::{Deserialize, Serialize};

/// Message structure sent to the completion API
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: String,  // "system", "user", or "assistant"
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for an OpenAI-compatible chat completions endpoint
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: usize,
}

/// Response body from the chat completions endpoint
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// Individual response choice
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

/// Message in API response
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first generated choice, if it has any.
    pub fn first_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_shape() {
        let messages = vec![Message::user("Question: what is Zakat?")];
        let request = ChatRequest {
            model: "gemini-2.0-flash",
            messages: &messages,
            max_tokens: 512,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gemini-2.0-flash");
        assert_eq!(value["max_tokens"], 512);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "Question: what is Zakat?");
    }

    #[test]
    fn first_text_takes_first_choice() {
        let body = r#"{"choices":[
            {"message":{"role":"assistant","content":"first"}},
            {"message":{"role":"assistant","content":"second"}}
        ]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_text().as_deref(), Some("first"));
    }

    #[test]
    fn first_text_is_none_without_content() {
        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.first_text().is_none());

        let missing: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(missing.first_text().is_none());

        let blank: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert!(blank.first_text().is_none());

        let null: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(null.first_text().is_none());
    }
}
