//! # Modelgate Providers
//!
//! Model provider implementations for OpenAI-compatible endpoints.

pub mod openai;
pub mod request;
pub mod strategy;

// Re-exports
pub use openai::{OpenAiBuilder, OpenAiCompatibleConfig, OpenAiProvider, DEFAULT_OPENAI_MODEL};
pub use request::{ChatRequest, RequestDefaults, ResponseFormat, DEFAULT_TEMPERATURE};
pub use strategy::{
    detect_json_strategy, InstructionPlacement, JsonModeStrategy, JsonOutputStrategy,
    JsonSchemaStrategy,
};

use modelgate_core::error::ModelError;

/// Instruction block the DeepSeek adapters wrap around every prompt
pub const DEEPSEEK_PREAMBLE: &str = "
High level rules you must follow:
1. Always use english unless explicitly told otherwise in your output operations.
2. Your interal thoughs, considerations, and operations will always be in english.
3. You will not inject chinese characters, mandarin, or chinese into your thoughts, output operations, generated text, or anything else.
";

/// Create a DeepSeek provider (OpenAI-compatible)
///
/// DeepSeek uses the OpenAI API protocol but with a different endpoint.
///
/// # Example
///
/// ```ignore
/// use modelgate_provider::deepseek;
///
/// let provider = deepseek("your-api-key")?;
/// ```
pub fn deepseek(api_key: impl Into<String>) -> Result<OpenAiProvider, ModelError> {
    OpenAiProvider::builder()
        .api_key(api_key)
        .api_base("https://api.deepseek.com/v1")
        .model("deepseek-chat")
        .info("deepseek", "Deepseek", "Deepseek hosted chat models")
        .prompt_preamble(DEEPSEEK_PREAMBLE)
        .build()
}

/// Create a provider for a local Ollama runtime.
///
/// `base_url` is the server root (e.g. `http://localhost:11434`); a single
/// trailing slash is dropped and the OpenAI-compatible `/v1` path appended.
pub fn ollama(
    base_url: impl AsRef<str>,
    model: impl Into<String>,
) -> Result<OpenAiProvider, ModelError> {
    ollama_builder(base_url.as_ref(), model.into())?
        .info(
            "ollama",
            "Ollama",
            "Local Ollama models like Llama 2 and Mistral",
        )
        .build()
}

/// Create a provider for DeepSeek models served by a local Ollama runtime
pub fn ollama_deepseek(
    base_url: impl AsRef<str>,
    model: impl Into<String>,
) -> Result<OpenAiProvider, ModelError> {
    ollama_builder(base_url.as_ref(), model.into())?
        .info("deepseek", "Deepseek", "Deepseek models running through Ollama")
        .prompt_preamble(DEEPSEEK_PREAMBLE)
        .build()
}

fn ollama_builder(base_url: &str, model: String) -> Result<OpenAiBuilder, ModelError> {
    if base_url.is_empty() {
        return Err(ModelError::configuration("baseUrl is required"));
    }
    if model.is_empty() {
        return Err(ModelError::configuration("model is required"));
    }

    let base_url = base_url.strip_suffix('/').unwrap_or(base_url);

    // Ollama ignores the key, but the client requires one.
    Ok(OpenAiProvider::builder()
        .api_key("ollama")
        .api_base(format!("{}/v1", base_url))
        .model(model)
        // Local models reject strict schemas; JSON mode is picked by id.
        .json_strategy(std::sync::Arc::new(JsonModeStrategy::new())))
}
