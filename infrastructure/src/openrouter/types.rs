//! Chat Completions wire types (OpenAI-compatible format)

use council_application::InvocationRequest;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: MessageContent,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub completion_tokens: Option<u32>,
}

/// `{"error": {"message": ...}}` body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

impl ChatResponse {
    /// Text of the first choice, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

/// Flatten an invocation into chat messages
///
/// Order: system prompt, history oldest first, then the prompt itself. Images
/// turn the final user message into content parts.
pub fn build_messages(request: &InvocationRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);

    if let Some(system) = &request.system_prompt {
        messages.push(ChatMessage {
            role: "system",
            content: MessageContent::Text(system.clone()),
        });
    }

    messages.extend(request.history.iter().map(|m| ChatMessage {
        role: m.role.as_str(),
        content: MessageContent::Text(m.content.clone()),
    }));

    let content = if request.images.is_empty() {
        MessageContent::Text(request.prompt.clone())
    } else {
        let mut parts = vec![ContentPart::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl { url: image.to_url() },
        }));
        MessageContent::Parts(parts)
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::{ImageAttachment, Message, ModelId};

    #[test]
    fn test_build_messages_order() {
        let request = InvocationRequest::new(ModelId::new("openai/o1"), "And now?")
            .with_system_prompt("Be precise.")
            .with_history(vec![Message::user("Hi"), Message::assistant("Hello")]);

        let roles: Vec<&str> = build_messages(&request).iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    }

    #[test]
    fn test_images_become_content_parts() {
        let request = InvocationRequest::new(ModelId::new("openai/o1"), "What is this?")
            .with_images(vec![ImageAttachment::base64("image/png", "iVBOR")]);

        let messages = build_messages(&request);
        let json = serde_json::to_value(&messages[0]).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(
            json["content"][1]["image_url"]["url"],
            "data:image/png;base64,iVBOR"
        );
    }

    #[test]
    fn test_plain_prompt_serializes_as_string() {
        let request = InvocationRequest::new(ModelId::new("openai/o1"), "Hi");
        let json = serde_json::to_value(build_messages(&request)).unwrap();
        assert_eq!(json[0]["content"], "Hi");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "42"}}],
            "usage": {"completion_tokens": 3}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.first_content(), Some("42"));
        assert_eq!(response.usage.unwrap().completion_tokens, Some(3));

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert_eq!(empty.first_content(), None);
    }
}
