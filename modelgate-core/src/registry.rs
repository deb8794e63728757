//! Model registry.
//!
//! Maps identifiers to provider instances and tracks the default model.
//! Identifiers enumerate in registration order, and the first provider ever
//! registered becomes the default until [`ModelRegistry::set_default`] moves
//! it. There is no unregister operation.

use crate::error::ModelError;
use crate::provider::ModelProvider;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared provider handle
pub type BoxedProvider = Arc<dyn ModelProvider>;

/// What registering an already-known identifier does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Replace the provider in place, keeping its enumeration position
    #[default]
    Overwrite,
    /// Fail with [`ModelError::DuplicateModel`]
    Reject,
}

/// Registry of model providers keyed by identifier.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, BoxedProvider>,
    default_model_id: Option<String>,
    duplicate_policy: DuplicatePolicy,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.list_ids())
            .field("default_model_id", &self.default_model_id)
            .field("duplicate_policy", &self.duplicate_policy)
            .finish()
    }
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given duplicate policy
    pub fn with_duplicate_policy(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            duplicate_policy,
            ..Self::default()
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Register a provider under `id`.
    ///
    /// The first registration sets the default. Re-registering an identifier
    /// overwrites it unless the registry was built with
    /// [`DuplicatePolicy::Reject`].
    pub fn register(
        &mut self,
        id: impl Into<String>,
        provider: BoxedProvider,
    ) -> Result<(), ModelError> {
        let id = id.into();

        if self.models.contains_key(&id) {
            match self.duplicate_policy {
                DuplicatePolicy::Reject => return Err(ModelError::duplicate_model(id)),
                DuplicatePolicy::Overwrite => {
                    tracing::warn!(model_id = %id, "Overwriting registered model");
                }
            }
        }

        self.models.insert(id.clone(), provider);

        if self.default_model_id.is_none() {
            tracing::debug!(model_id = %id, "Using first registered model as default");
            self.default_model_id = Some(id.clone());
        }

        tracing::debug!(model_id = %id, "Registered model instance");
        Ok(())
    }

    /// Resolve an identifier, or the default when `id` is `None`.
    ///
    /// Returns the resolved identifier together with its provider.
    pub fn resolve(&self, id: Option<&str>) -> Result<(String, BoxedProvider), ModelError> {
        let id = match id {
            Some(id) => id,
            None => self
                .default_model_id
                .as_deref()
                .ok_or(ModelError::NoModelAvailable)?,
        };

        let provider = self
            .models
            .get(id)
            .ok_or_else(|| ModelError::unknown_model(id))?;

        Ok((id.to_string(), provider.clone()))
    }

    /// Point the default at a registered identifier
    pub fn set_default(&mut self, id: &str) -> Result<(), ModelError> {
        if !self.models.contains_key(id) {
            return Err(ModelError::unknown_model(id));
        }
        self.default_model_id = Some(id.to_string());
        tracing::debug!(model_id = %id, "Set default model");
        Ok(())
    }

    pub fn default_model_id(&self) -> Option<&str> {
        self.default_model_id.as_deref()
    }

    /// Registered identifiers in registration order
    pub fn list_ids(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Registered providers in registration order
    pub fn providers(&self) -> impl Iterator<Item = (&str, &BoxedProvider)> {
        self.models.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.models.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
