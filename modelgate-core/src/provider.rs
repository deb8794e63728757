//! Provider capability trait.

use crate::error::ModelError;
use crate::types::*;
use async_trait::async_trait;
use std::fmt::Debug;

/// Capability contract every model backend implements.
///
/// Adapters translate [`GenerationRequest`]s into their own wire format and
/// apply their own defaults (temperature, token limits). They must never
/// report success with empty content: the execution pipeline treats an empty
/// string or a JSON `null` as a failure.
#[async_trait]
pub trait ModelProvider: Send + Sync + Debug + 'static {
    /// Get provider information
    fn info(&self) -> &ProviderInfo;

    /// Free-text generation
    async fn get_text(&self, request: GenerationRequest) -> Result<String, ModelError>;

    /// Structured generation.
    ///
    /// The returned value must conform to `request.schema`; validating or
    /// coercing the model output is the adapter's job.
    async fn get_object(
        &self,
        request: StructuredGenerationRequest,
    ) -> Result<serde_json::Value, ModelError>;

    /// Optional setup hook.
    ///
    /// Never invoked by the pipeline; applications call it (or
    /// `ModelService::init_all`) before first use.
    async fn init(&self) -> Result<(), ModelError> {
        Ok(())
    }
}
