//! Service facade combining the registry and the execution pipeline.

use crate::error::ModelError;
use crate::event::{LogSink, TracingSink};
use crate::registry::{BoxedProvider, DuplicatePolicy, ModelRegistry};
use crate::runtime::ExecutionPipeline;
use crate::types::*;
use arc_swap::ArcSwap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifier used by [`ModelService::with_model`]
pub const DEFAULT_MODEL_ID: &str = "default";

/// Service-level settings, loadable from any serde format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServiceConfig {
    /// Template reported in `system` events; the built-in one when unset
    pub system_template: Option<String>,
    pub duplicate_policy: DuplicatePolicy,
    /// Registered identifier to make the default after all models are added
    pub default_model: Option<String>,
}

/// Builder for [`ModelService`].
///
/// ```ignore
/// let service = ModelService::builder()
///     .sink(Arc::new(TracingSink::new()))
///     .model("openai", Arc::new(openai))
///     .model("ollama", Arc::new(ollama))
///     .default_model("ollama")
///     .build()?;
/// ```
pub struct ModelServiceBuilder {
    sink: Arc<dyn LogSink>,
    config: ServiceConfig,
    models: Vec<(String, BoxedProvider)>,
}

impl Default for ModelServiceBuilder {
    fn default() -> Self {
        Self {
            sink: Arc::new(TracingSink::new()),
            config: ServiceConfig::default(),
            models: Vec::new(),
        }
    }
}

impl ModelServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lifecycle event sink
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Apply a full service config
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_template(mut self, template: impl Into<String>) -> Self {
        self.config.system_template = Some(template.into());
        self
    }

    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    pub fn default_model(mut self, id: impl Into<String>) -> Self {
        self.config.default_model = Some(id.into());
        self
    }

    /// Register a provider, in order
    pub fn model(mut self, id: impl Into<String>, provider: BoxedProvider) -> Self {
        self.models.push((id.into(), provider));
        self
    }

    /// Finish building.
    ///
    /// Fails if a duplicate is rejected or the configured default is unknown.
    pub fn build(self) -> Result<ModelService, ModelError> {
        let mut registry = ModelRegistry::with_duplicate_policy(self.config.duplicate_policy);
        for (id, provider) in self.models {
            registry.register(id, provider)?;
        }
        if let Some(id) = &self.config.default_model {
            registry.set_default(id)?;
        }

        let mut pipeline = ExecutionPipeline::new(self.sink);
        if let Some(template) = &self.config.system_template {
            pipeline = pipeline.with_system_template(template);
        }

        tracing::debug!(models = registry.len(), "Initializing model service");

        Ok(ModelService {
            registry: ArcSwap::from_pointee(registry),
            pipeline,
        })
    }
}

/// Entry point for generation requests.
///
/// Registry reads take a snapshot and mutations swap in a new copy, so an
/// execution keeps the provider it resolved even if the default moves while
/// it is in flight.
pub struct ModelService {
    registry: ArcSwap<ModelRegistry>,
    pipeline: ExecutionPipeline,
}

impl std::fmt::Debug for ModelService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelService")
            .field("registry", &self.registry.load_full())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl Default for ModelService {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelService {
    /// Create an empty service logging through `tracing`
    pub fn new() -> Self {
        Self {
            registry: ArcSwap::from_pointee(ModelRegistry::new()),
            pipeline: ExecutionPipeline::default(),
        }
    }

    /// Create a service with one provider registered as [`DEFAULT_MODEL_ID`]
    pub fn with_model(provider: BoxedProvider) -> Result<Self, ModelError> {
        Self::builder().model(DEFAULT_MODEL_ID, provider).build()
    }

    pub fn builder() -> ModelServiceBuilder {
        ModelServiceBuilder::new()
    }

    pub fn pipeline(&self) -> &ExecutionPipeline {
        &self.pipeline
    }

    /// Current registry snapshot
    pub fn registry(&self) -> Arc<ModelRegistry> {
        self.registry.load_full()
    }

    /// Register a provider under `id`
    pub fn register_model(
        &self,
        id: impl Into<String>,
        provider: BoxedProvider,
    ) -> Result<(), ModelError> {
        let id = id.into();
        self.update(|registry| registry.register(id.clone(), provider.clone()))
    }

    /// Move the default to a registered identifier
    pub fn set_default_model(&self, id: &str) -> Result<(), ModelError> {
        self.update(|registry| registry.set_default(id))
    }

    pub fn default_model_id(&self) -> Option<String> {
        self.registry.load().default_model_id().map(str::to_string)
    }

    /// Registered identifiers in registration order
    pub fn model_ids(&self) -> Vec<String> {
        self.registry.load().list_ids()
    }

    /// Resolve an identifier, or the default when `id` is `None`
    pub fn resolve(&self, id: Option<&str>) -> Result<(String, BoxedProvider), ModelError> {
        self.registry.load().resolve(id)
    }

    /// Generate text from a prompt.
    ///
    /// The model is taken from `config.model_id`, falling back to the default
    /// when it is unset or empty.
    pub async fn get_text(
        &self,
        prompt: impl Into<String>,
        config: Option<RequestConfig>,
    ) -> Result<String, ModelError> {
        let model_id = routed_model_id(config.as_ref());
        let request = GenerationRequest::Prompt {
            prompt: prompt.into(),
            system_prompt: None,
            config,
        };
        self.execute_text(model_id.as_deref(), request).await
    }

    /// Generate a structured value from a prompt
    pub async fn get_object(
        &self,
        prompt: impl Into<String>,
        schema: OutputSchema,
        config: Option<RequestConfig>,
    ) -> Result<serde_json::Value, ModelError> {
        let model_id = routed_model_id(config.as_ref());
        let request = GenerationRequest::Prompt {
            prompt: prompt.into(),
            system_prompt: None,
            config,
        };
        self.execute_object(model_id.as_deref(), request, schema)
            .await
    }

    /// Generate a value of type `T`, deriving the schema from the type.
    ///
    /// The provider's value is deserialized into `T` after the pipeline has
    /// reported the response.
    pub async fn get_object_as<T>(
        &self,
        prompt: impl Into<String>,
        config: Option<RequestConfig>,
    ) -> Result<T, ModelError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let value = self
            .get_object(prompt, OutputSchema::for_type::<T>(), config)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Run any request form against `model_id` or the default
    pub async fn execute_text<R>(
        &self,
        model_id: Option<&str>,
        request: R,
    ) -> Result<String, ModelError>
    where
        R: IntoGenerationRequest,
    {
        let (id, provider) = self.resolve(model_id)?;
        self.pipeline
            .execute_text(&id, provider.as_ref(), request)
            .await
    }

    /// Run any request form with a schema against `model_id` or the default
    pub async fn execute_object<R>(
        &self,
        model_id: Option<&str>,
        request: R,
        schema: OutputSchema,
    ) -> Result<serde_json::Value, ModelError>
    where
        R: IntoGenerationRequest,
    {
        let (id, provider) = self.resolve(model_id)?;
        self.pipeline
            .execute_object(&id, provider.as_ref(), request, schema)
            .await
    }

    /// Call every provider's `init` hook in registration order.
    ///
    /// Stops at the first failure.
    pub async fn init_all(&self) -> Result<(), ModelError> {
        let registry = self.registry();
        for (id, provider) in registry.providers() {
            tracing::debug!(model_id = %id, "Initializing model");
            provider.init().await?;
        }
        Ok(())
    }

    fn update(
        &self,
        mut op: impl FnMut(&mut ModelRegistry) -> Result<(), ModelError>,
    ) -> Result<(), ModelError> {
        let mut outcome = Ok(());
        self.registry.rcu(|current| {
            let mut next = ModelRegistry::clone(current);
            outcome = op(&mut next);
            next
        });
        outcome
    }
}

/// An empty `model_id` routes to the default like an absent one.
fn routed_model_id(config: Option<&RequestConfig>) -> Option<String> {
    config
        .and_then(|c| c.model_id.clone())
        .filter(|id| !id.is_empty())
}
