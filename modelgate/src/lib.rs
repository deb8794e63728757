//! # Modelgate
//!
//! One registry and execution pipeline over many LLM backends.
//!
//! Modelgate lets callers ask a named or default model for free text or a
//! schema-shaped object without knowing the provider behind it. Every call
//! goes through the same pipeline, which emits ordered lifecycle events
//! (`system`, `prompt`, then `response` or `error`) and normalizes failures.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! modelgate = { version = "0.1", features = ["openai"] }
//! ```
//!
//! ```ignore
//! use modelgate::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ModelService::builder()
//!     .model("openai", Arc::new(OpenAiProvider::new("your-api-key")?))
//!     .model("local", Arc::new(ollama("http://localhost:11434", "llama3")?))
//!     .build()?;
//!
//! let text = service.get_text("What is Rust?", None).await?;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Includes `openai` provider
//! - `openai`: OpenAI-compatible provider (OpenAI, DeepSeek, Ollama)
//! - `providers`: All available providers
//! - `schema`: Re-export `schemars` for deriving output schemas
//! - `full`: All features enabled

// Re-export core types and traits
pub use modelgate_core::*;

// Re-export providers under `provider` module
#[cfg(feature = "modelgate-provider")]
pub mod provider {
    //! Model provider implementations.
    pub use modelgate_provider::*;
}

// Re-export schemars when schema feature is enabled
#[cfg(feature = "schema")]
pub mod schemars {
    pub use ::schemars::*;
}

/// Prelude module for convenient imports
pub mod prelude {
    //! Prelude module containing the most commonly used types and traits.
    //!
    //! ```
    //! use modelgate::prelude::*;
    //! ```

    pub use crate::{
        ChatMessage, GenerationRequest, LogSink, ModelError, ModelProvider, ModelService,
        OutputSchema, RequestConfig, Result, TracingSink,
    };

    #[cfg(feature = "modelgate-provider")]
    pub use crate::provider::{deepseek, ollama, ollama_deepseek, OpenAiProvider};
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    /// Provider that answers from a fixed script
    #[derive(Debug)]
    struct ScriptedProvider {
        info: ProviderInfo,
        text: String,
        object: serde_json::Value,
    }

    impl ScriptedProvider {
        fn new(id: &str, text: &str, object: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                info: ProviderInfo::new(id, id, "scripted"),
                text: text.to_string(),
                object,
            })
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn info(&self) -> &ProviderInfo {
            &self.info
        }

        async fn get_text(&self, _request: GenerationRequest) -> Result<String> {
            Ok(self.text.clone())
        }

        async fn get_object(
            &self,
            request: StructuredGenerationRequest,
        ) -> Result<serde_json::Value> {
            if request.schema.schema.is_null() {
                return Err(ModelError::provider("schema missing"));
            }
            Ok(self.object.clone())
        }
    }

    #[derive(Debug, Deserialize, ::schemars::JsonSchema)]
    struct Verdict {
        approved: bool,
        reason: String,
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let sink = Arc::new(MemorySink::new());
        let service = ModelService::builder()
            .sink(sink.clone())
            .model("p1", ScriptedProvider::new("p1", "", json!(null)))
            .model(
                "p2",
                ScriptedProvider::new("p2", "fine", json!({ "approved": true, "reason": "ok" })),
            )
            .build()
            .unwrap();

        assert_eq!(service.model_ids(), vec!["p1", "p2"]);
        assert_eq!(service.default_model_id().as_deref(), Some("p1"));

        let err = service.get_text("hi", None).await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse(_)));
        assert_eq!(
            sink.kinds(),
            vec![EventKind::System, EventKind::Prompt, EventKind::Error]
        );
        sink.clear();

        service.set_default_model("p2").unwrap();
        assert_eq!(service.get_text("hi", None).await.unwrap(), "fine");

        let verdict: Verdict = service.get_object_as("judge", None).await.unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.reason, "ok");

        assert_eq!(
            sink.kinds(),
            vec![
                EventKind::System,
                EventKind::Prompt,
                EventKind::Response,
                EventKind::System,
                EventKind::Prompt,
                EventKind::Response,
            ]
        );
        assert!(sink.events().iter().all(|e| e.model() == "p2"));
    }
}
