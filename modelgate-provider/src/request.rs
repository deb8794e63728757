//! Provider-side chat request and the adapter defaults applied to it.

use modelgate_core::{ChatMessage, GenerationRequest};

/// Temperature used when a request does not set one
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

const PREAMBLE_REPLY: &str = "Assistant: Let me help you with that.";

/// Response format requested from the endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Any JSON object
    JsonObject,
    /// JSON matching `schema`, enforced by the endpoint
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

/// Chat completion request before protocol conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            stop: None,
            response_format: None,
        }
    }
}

/// Adapter policy applied when translating a [`GenerationRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    /// Upstream model name
    pub model: String,
    pub temperature: f32,
    /// Instruction block wrapped around every prompt
    pub prompt_preamble: Option<String>,
}

impl RequestDefaults {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            prompt_preamble: None,
        }
    }

    /// Translate a generation request into a chat request.
    ///
    /// The caller's config wins; the adapter temperature only fills a gap.
    pub fn build(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::new();

        if let Some(system_prompt) = request.system_prompt() {
            messages.push(ChatMessage::system(system_prompt));
        }

        match request {
            GenerationRequest::Prompt { prompt, .. } => {
                let content = match &self.prompt_preamble {
                    Some(preamble) => format!("{}\n\n{}\n\n{}", preamble, prompt, PREAMBLE_REPLY),
                    None => prompt.clone(),
                };
                messages.push(ChatMessage::user(content));
            }
            GenerationRequest::Messages {
                messages: conversation,
                ..
            } => {
                if let Some(preamble) = &self.prompt_preamble {
                    messages.push(ChatMessage::system(preamble.clone()));
                }
                messages.extend(conversation.iter().cloned());
            }
        }

        let config = request.config();
        let mut req = ChatRequest::new(self.model.clone(), messages);
        req.temperature = Some(
            config
                .and_then(|c| c.temperature)
                .unwrap_or(self.temperature),
        );
        req.max_tokens = config.and_then(|c| c.max_tokens);
        req.stop = config.and_then(|c| c.stop_sequences.clone());
        req
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::RequestConfig;

    #[test]
    fn test_defaults_fill_temperature() {
        let defaults = RequestDefaults::new("gpt-4o");
        let req = defaults.build(&GenerationRequest::prompt("hi"));

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(req.messages, vec![ChatMessage::user("hi")]);
        assert_eq!(req.max_tokens, None);
        assert_eq!(req.stop, None);
    }

    #[test]
    fn test_config_passes_through() {
        let defaults = RequestDefaults::new("gpt-4o");
        let config = RequestConfig::new()
            .with_model_id("registry-id")
            .with_temperature(0.1)
            .with_max_tokens(32)
            .with_stop_sequences(["END"]);

        let req = defaults.build(&GenerationRequest::prompt("hi").with_config(config));

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.temperature, Some(0.1));
        assert_eq!(req.max_tokens, Some(32));
        assert_eq!(req.stop, Some(vec!["END".to_string()]));
    }

    #[test]
    fn test_system_prompt_leads() {
        let defaults = RequestDefaults::new("m");
        let request = GenerationRequest::messages(vec![
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
        ])
        .with_system_prompt("sys");

        let req = defaults.build(&request);

        assert_eq!(
            req.messages,
            vec![
                ChatMessage::system("sys"),
                ChatMessage::user("a"),
                ChatMessage::assistant("b"),
            ]
        );
    }

    #[test]
    fn test_preamble_wraps_prompt() {
        let defaults = RequestDefaults {
            prompt_preamble: Some("RULES".to_string()),
            ..RequestDefaults::new("m")
        };

        let req = defaults.build(&GenerationRequest::prompt("question"));

        assert_eq!(
            req.messages[0].content,
            "RULES\n\nquestion\n\nAssistant: Let me help you with that."
        );
    }
}
