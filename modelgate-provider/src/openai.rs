//! OpenAI-compatible provider implementation using the async-openai crate.
//!
//! One adapter covers every endpoint that speaks the chat completions
//! protocol: OpenAI itself, DeepSeek's hosted API and Ollama's `/v1` surface.
//! Adapter policy (default temperature, prompt preamble, JSON strategy) lives
//! here; the execution pipeline applies none of it.

use crate::request::{ChatRequest, RequestDefaults, ResponseFormat, DEFAULT_TEMPERATURE};
use crate::strategy::{detect_json_strategy, JsonOutputStrategy};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
    ResponseFormat as OpenAIResponseFormat,
    ResponseFormatJsonSchema as OpenAIResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use modelgate_core::{
    ChatMessage, GenerationRequest, ModelError, ModelProvider, ProviderInfo,
    StructuredGenerationRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default upstream model for OpenAI
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Serializable adapter settings.
///
/// ```ignore
/// let config: OpenAiCompatibleConfig = serde_json::from_str(r#"{
///     "api_key": "sk-...",
///     "model": "gpt-4o-mini"
/// }"#)?;
/// let provider = config.into_builder().build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiCompatibleConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub org_id: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub prompt_preamble: Option<String>,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            id: "openai".to_string(),
            name: "OpenAI".to_string(),
            description: "OpenAI API models like GPT-4 and GPT-3.5".to_string(),
            api_key: None,
            api_base: None,
            org_id: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            prompt_preamble: None,
        }
    }
}

impl OpenAiCompatibleConfig {
    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`
    pub fn from_env() -> Result<Self, ModelError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::configuration("OPENAI_API_KEY is not set"))?;

        let mut config = Self {
            api_key: Some(api_key),
            api_base: std::env::var("OPENAI_BASE_URL").ok(),
            ..Self::default()
        };
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        Ok(config)
    }

    pub fn into_builder(self) -> OpenAiBuilder {
        OpenAiBuilder {
            config: self,
            json_strategy: None,
        }
    }
}

/// Provider for OpenAI-compatible chat completion endpoints
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    info: ProviderInfo,
    defaults: RequestDefaults,
    json_strategy: Arc<dyn JsonOutputStrategy>,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("info", &self.info)
            .field("defaults", &self.defaults)
            .field("json_strategy", &self.json_strategy.name())
            .finish()
    }
}

impl OpenAiProvider {
    /// Create an OpenAI provider with the default model
    pub fn new(api_key: impl Into<String>) -> Result<Self, ModelError> {
        Self::builder().api_key(api_key).build()
    }

    /// Create a builder for more configuration options
    pub fn builder() -> OpenAiBuilder {
        OpenAiBuilder::default()
    }

    /// Create a provider from `OPENAI_*` environment variables
    pub fn from_env() -> Result<Self, ModelError> {
        OpenAiCompatibleConfig::from_env()?.into_builder().build()
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    pub fn json_strategy(&self) -> &dyn JsonOutputStrategy {
        self.json_strategy.as_ref()
    }

    /// Convert our message into the protocol message. Unknown roles are sent
    /// as user messages.
    fn convert_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage, ModelError> {
        let content = msg.content.clone();

        match msg.role.as_str() {
            "system" => {
                let msg = ChatCompletionRequestSystemMessageArgs::default()
                    .content(content)
                    .build()
                    .map_err(|e| {
                        ModelError::provider(format!("Failed to build system message: {}", e))
                    })?;
                Ok(ChatCompletionRequestMessage::System(msg))
            }
            "assistant" => {
                let msg = ChatCompletionRequestAssistantMessageArgs::default()
                    .content(content)
                    .build()
                    .map_err(|e| {
                        ModelError::provider(format!("Failed to build assistant message: {}", e))
                    })?;
                Ok(ChatCompletionRequestMessage::Assistant(msg))
            }
            _ => {
                let msg = ChatCompletionRequestUserMessageArgs::default()
                    .content(content)
                    .build()
                    .map_err(|e| {
                        ModelError::provider(format!("Failed to build user message: {}", e))
                    })?;
                Ok(ChatCompletionRequestMessage::User(msg))
            }
        }
    }

    fn convert_response_format(format: &ResponseFormat) -> OpenAIResponseFormat {
        match format {
            ResponseFormat::JsonObject => OpenAIResponseFormat::JsonObject,
            ResponseFormat::JsonSchema {
                name,
                schema,
                strict,
            } => OpenAIResponseFormat::JsonSchema {
                json_schema: OpenAIResponseFormatJsonSchema {
                    name: name.clone(),
                    schema: Some(schema.clone()),
                    strict: Some(*strict),
                    description: None,
                },
            },
        }
    }

    fn build_request(&self, req: &ChatRequest) -> Result<CreateChatCompletionRequest, ModelError> {
        let messages: Result<Vec<_>, _> = req.messages.iter().map(Self::convert_message).collect();

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&req.model).messages(messages?);

        if let Some(max_tokens) = req.max_tokens {
            builder.max_tokens(max_tokens);
        }
        if let Some(temperature) = req.temperature {
            builder.temperature(temperature);
        }
        if let Some(stop) = &req.stop {
            builder.stop(stop.clone());
        }
        if let Some(response_format) = &req.response_format {
            builder.response_format(Self::convert_response_format(response_format));
        }

        builder
            .build()
            .map_err(|e| ModelError::provider(format!("Failed to build request: {}", e)))
    }

    /// Send a chat request and return the first choice's text.
    async fn complete(&self, req: ChatRequest) -> Result<String, ModelError> {
        let openai_req = self.build_request(&req)?;

        tracing::debug!(
            provider = %self.info.id,
            model = %req.model,
            messages = req.messages.len(),
            "Sending chat completion"
        );

        let response = self
            .client
            .chat()
            .create(openai_req)
            .await
            .map_err(|e| ModelError::provider(format!("{} API error: {}", self.info.name, e)))?;

        non_empty_content(
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        )
    }
}

/// Only a missing or zero-length completion counts as no content.
fn non_empty_content(content: Option<String>) -> Result<String, ModelError> {
    match content {
        Some(content) if !content.is_empty() => Ok(content),
        _ => Err(ModelError::provider("No content in response")),
    }
}

/// Strip a surrounding markdown code fence, which JSON-mode models often add.
fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn get_text(&self, request: GenerationRequest) -> Result<String, ModelError> {
        let req = self.defaults.build(&request);

        self.complete(req).await.map_err(|e| {
            tracing::error!(provider = %self.info.id, error = %e, "Error getting text");
            e
        })
    }

    async fn get_object(
        &self,
        request: StructuredGenerationRequest,
    ) -> Result<serde_json::Value, ModelError> {
        let mut req = self.defaults.build(&request.request);
        // Stop sequences can cut a JSON document short.
        req.stop = None;
        self.json_strategy.apply(&mut req, &request.schema)?;

        let result = match self.complete(req).await {
            Ok(content) => serde_json::from_str(extract_json(&content)).map_err(ModelError::from),
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            tracing::error!(provider = %self.info.id, error = %e, "Error getting object");
            e
        })
    }
}

/// Builder for OpenAI-compatible providers
#[derive(Default)]
pub struct OpenAiBuilder {
    config: OpenAiCompatibleConfig,
    json_strategy: Option<Arc<dyn JsonOutputStrategy>>,
}

impl OpenAiBuilder {
    /// Set API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Set API base URL (for OpenAI-compatible APIs like DeepSeek)
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.config.api_base = Some(api_base.into());
        self
    }

    /// Set organization ID
    pub fn organization(mut self, org_id: impl Into<String>) -> Self {
        self.config.org_id = Some(org_id.into());
        self
    }

    /// Set the upstream model name
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the temperature used when a request does not specify one
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Wrap every prompt in a fixed instruction block
    pub fn prompt_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.config.prompt_preamble = Some(preamble.into());
        self
    }

    /// Set the provider descriptor
    pub fn info(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.config.id = id.into();
        self.config.name = name.into();
        self.config.description = description.into();
        self
    }

    /// Set a custom JSON output strategy
    ///
    /// If not set, the strategy is picked from the provider id.
    pub fn json_strategy(mut self, strategy: Arc<dyn JsonOutputStrategy>) -> Self {
        self.json_strategy = Some(strategy);
        self
    }

    /// Build the provider
    pub fn build(self) -> Result<OpenAiProvider, ModelError> {
        let config = self.config;

        let api_key = config
            .api_key
            .ok_or_else(|| ModelError::configuration("API key is required"))?;
        if config.model.is_empty() {
            return Err(ModelError::configuration("model is required"));
        }

        let mut client_config = OpenAIConfig::new().with_api_key(api_key);

        if let Some(api_base) = config.api_base {
            client_config = client_config.with_api_base(api_base);
        }

        if let Some(org_id) = config.org_id {
            client_config = client_config.with_org_id(org_id);
        }

        let json_strategy = self
            .json_strategy
            .unwrap_or_else(|| Arc::from(detect_json_strategy(&config.id)));

        Ok(OpenAiProvider {
            client: Client::with_config(client_config),
            info: ProviderInfo::new(config.id, config.name, config.description),
            defaults: RequestDefaults {
                model: config.model,
                temperature: config.temperature,
                prompt_preamble: config.prompt_preamble,
            },
            json_strategy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgate_core::RequestConfig;

    #[test]
    fn test_build_requires_api_key() {
        let err = OpenAiProvider::builder().build().unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn test_build_defaults() {
        let provider = OpenAiProvider::new("sk-test").unwrap();

        assert_eq!(provider.info().id, "openai");
        assert_eq!(provider.defaults().model, DEFAULT_OPENAI_MODEL);
        assert_eq!(provider.defaults().temperature, DEFAULT_TEMPERATURE);
        assert_eq!(provider.json_strategy().name(), "JsonSchemaStrategy");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: OpenAiCompatibleConfig = serde_json::from_value(serde_json::json!({
            "api_key": "sk-test",
            "model": "gpt-4o-mini"
        }))
        .unwrap();

        assert_eq!(config.id, "openai");
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);

        let provider = config.into_builder().build().unwrap();
        assert_eq!(provider.defaults().model, "gpt-4o-mini");
    }

    #[test]
    fn test_build_request_maps_fields() {
        let provider = OpenAiProvider::new("sk-test").unwrap();
        let request = GenerationRequest::messages(vec![
            ChatMessage::system("sys"),
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
            ChatMessage::new("narrator", "aside"),
        ])
        .with_config(RequestConfig::new().with_max_tokens(16).with_temperature(0.3));

        let req = provider.defaults().build(&request);
        let openai_req = provider.build_request(&req).unwrap();

        assert_eq!(openai_req.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(openai_req.temperature, Some(0.3));
        assert_eq!(openai_req.messages.len(), 4);
        assert!(matches!(
            openai_req.messages[0],
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            openai_req.messages[2],
            ChatCompletionRequestMessage::Assistant(_)
        ));
        assert!(matches!(
            openai_req.messages[3],
            ChatCompletionRequestMessage::User(_)
        ));
    }

    #[derive(schemars::JsonSchema)]
    #[allow(dead_code)]
    struct Verdict {
        approved: bool,
        reason: Option<String>,
    }

    #[test]
    fn test_default_object_request_uses_strict_closed_schema() {
        let provider = OpenAiProvider::new("sk-test").unwrap();
        let mut req = provider.defaults().build(&GenerationRequest::prompt("judge"));

        provider
            .json_strategy()
            .apply(&mut req, &modelgate_core::OutputSchema::for_type::<Verdict>())
            .unwrap();
        let openai_req = provider.build_request(&req).unwrap();

        match openai_req.response_format {
            Some(OpenAIResponseFormat::JsonSchema { json_schema }) => {
                let schema = json_schema.schema.unwrap();
                assert_eq!(json_schema.strict, Some(true));
                assert_eq!(schema["additionalProperties"], serde_json::json!(false));
                assert_eq!(schema["required"], serde_json::json!(["approved", "reason"]));
            }
            other => panic!("expected json_schema format, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_completion_is_content() {
        assert_eq!(non_empty_content(Some("  \n".to_string())).unwrap(), "  \n");
        assert!(matches!(
            non_empty_content(Some(String::new())),
            Err(ModelError::Provider(ref msg)) if msg == "No content in response"
        ));
        assert!(non_empty_content(None).is_err());
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("  ```\n[1]\n```  "), "[1]");
    }
}
