//! Core types for generation requests.

use crate::error::ModelError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Provider descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl ProviderInfo {
    /// Create a new provider descriptor
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Per-request generation settings.
///
/// Every field is optional and passed to the provider untouched. Defaults such
/// as a fallback temperature are adapter policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl RequestConfig {
    /// Create an empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a specific registered model
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set stop sequences
    pub fn with_stop_sequences<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_sequences = Some(stop.into_iter().map(Into::into).collect());
        self
    }
}

/// A single conversation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an arbitrary role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Wire-shaped request parameters.
///
/// Both `prompt` and `messages` are optional here; converting into a
/// [`GenerationRequest`] enforces that exactly one of them is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RequestConfig>,
}

/// A validated generation request carrying exactly one input form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GenerationParams", into = "GenerationParams")]
pub enum GenerationRequest {
    /// Single free-text prompt
    Prompt {
        prompt: String,
        system_prompt: Option<String>,
        config: Option<RequestConfig>,
    },
    /// Ordered conversation
    Messages {
        messages: Vec<ChatMessage>,
        system_prompt: Option<String>,
        config: Option<RequestConfig>,
    },
}

impl GenerationRequest {
    /// Create a prompt request
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::Prompt {
            prompt: prompt.into(),
            system_prompt: None,
            config: None,
        }
    }

    /// Create a messages request
    pub fn messages(messages: Vec<ChatMessage>) -> Self {
        Self::Messages {
            messages,
            system_prompt: None,
            config: None,
        }
    }

    /// Build a request from optional parts, rejecting both/neither.
    pub fn from_parts(
        prompt: Option<String>,
        messages: Option<Vec<ChatMessage>>,
        system_prompt: Option<String>,
        config: Option<RequestConfig>,
    ) -> Result<Self, ModelError> {
        match (prompt, messages) {
            (Some(prompt), None) => Ok(Self::Prompt {
                prompt,
                system_prompt,
                config,
            }),
            (None, Some(messages)) => Ok(Self::Messages {
                messages,
                system_prompt,
                config,
            }),
            (Some(_), Some(_)) => Err(ModelError::malformed_request(
                "request must not specify both prompt and messages",
            )),
            (None, None) => Err(ModelError::malformed_request(
                "request must specify either prompt or messages",
            )),
        }
    }

    /// Set the config
    pub fn with_config(mut self, config: RequestConfig) -> Self {
        match &mut self {
            Self::Prompt { config: c, .. } | Self::Messages { config: c, .. } => {
                *c = Some(config)
            }
        }
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        match &mut self {
            Self::Prompt {
                system_prompt: s, ..
            }
            | Self::Messages {
                system_prompt: s, ..
            } => *s = Some(system_prompt.into()),
        }
        self
    }

    /// Request config, if any
    pub fn config(&self) -> Option<&RequestConfig> {
        match self {
            Self::Prompt { config, .. } | Self::Messages { config, .. } => config.as_ref(),
        }
    }

    /// Caller-supplied system prompt, if any
    pub fn system_prompt(&self) -> Option<&str> {
        match self {
            Self::Prompt { system_prompt, .. } | Self::Messages { system_prompt, .. } => {
                system_prompt.as_deref()
            }
        }
    }

    /// The input payload as it appears in lifecycle events
    pub fn payload(&self) -> RequestPayload {
        match self {
            Self::Prompt { prompt, .. } => RequestPayload::Prompt {
                prompt: prompt.clone(),
            },
            Self::Messages { messages, .. } => RequestPayload::Messages {
                messages: messages.clone(),
            },
        }
    }
}

impl TryFrom<GenerationParams> for GenerationRequest {
    type Error = ModelError;

    fn try_from(params: GenerationParams) -> Result<Self, Self::Error> {
        Self::from_parts(
            params.prompt,
            params.messages,
            params.system_prompt,
            params.config,
        )
    }
}

impl From<GenerationRequest> for GenerationParams {
    fn from(req: GenerationRequest) -> Self {
        match req {
            GenerationRequest::Prompt {
                prompt,
                system_prompt,
                config,
            } => Self {
                prompt: Some(prompt),
                messages: None,
                system_prompt,
                config,
            },
            GenerationRequest::Messages {
                messages,
                system_prompt,
                config,
            } => Self {
                prompt: None,
                messages: Some(messages),
                system_prompt,
                config,
            },
        }
    }
}

/// Request input as reported in the prompt event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Prompt { prompt: String },
    Messages { messages: Vec<ChatMessage> },
}

/// Anything the pipeline can turn into a validated request.
///
/// Conversion happens before any lifecycle event is emitted.
pub trait IntoGenerationRequest {
    fn into_generation_request(self) -> Result<GenerationRequest, ModelError>;
}

impl IntoGenerationRequest for GenerationRequest {
    fn into_generation_request(self) -> Result<GenerationRequest, ModelError> {
        Ok(self)
    }
}

impl IntoGenerationRequest for GenerationParams {
    fn into_generation_request(self) -> Result<GenerationRequest, ModelError> {
        GenerationRequest::try_from(self)
    }
}

impl IntoGenerationRequest for &str {
    fn into_generation_request(self) -> Result<GenerationRequest, ModelError> {
        Ok(GenerationRequest::prompt(self))
    }
}

impl IntoGenerationRequest for String {
    fn into_generation_request(self) -> Result<GenerationRequest, ModelError> {
        Ok(GenerationRequest::prompt(self))
    }
}

impl IntoGenerationRequest for Vec<ChatMessage> {
    fn into_generation_request(self) -> Result<GenerationRequest, ModelError> {
        Ok(GenerationRequest::messages(self))
    }
}

/// JSON Schema describing the expected structured result.
///
/// Opaque to the registry and pipeline; only providers interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Create a schema from a raw JSON Schema document
    pub fn new(name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Derive the schema from a Rust type
    pub fn for_type<T: JsonSchema>() -> Self {
        Self {
            name: T::schema_name().into_owned(),
            schema: schemars::schema_for!(T).to_value(),
        }
    }
}

/// A generation request paired with the schema its result must satisfy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredGenerationRequest {
    pub request: GenerationRequest,
    pub schema: OutputSchema,
}

impl StructuredGenerationRequest {
    /// Create a structured request, validating the inner request first
    pub fn new(
        request: impl IntoGenerationRequest,
        schema: OutputSchema,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            request: request.into_generation_request()?,
            schema,
        })
    }
}
