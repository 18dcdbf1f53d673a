use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::application::ports::TranscriptionEngine;
use crate::domain::BackendDescriptor;

use super::alias_resolver::AliasResolver;

/// Loaded backends keyed by canonical key.
///
/// Filled once during startup through [`ModelRegistry::register`] and shared
/// read-only afterwards, so lookups take no locks.
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn TranscriptionEngine>>,
    resolver: AliasResolver,
}

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub descriptor: BackendDescriptor,
    pub aliases: Vec<&'static str>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no models available. requested: {requested}")]
    NoBackendAvailable { requested: String },
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::with_resolver(AliasResolver::default())
    }

    pub fn with_resolver(resolver: AliasResolver) -> Self {
        Self {
            models: HashMap::new(),
            resolver,
        }
    }

    pub fn register(&mut self, key: impl Into<String>, engine: Arc<dyn TranscriptionEngine>) {
        let key = key.into();
        tracing::info!(
            backend = %key,
            model = %engine.descriptor().model_identifier(),
            device = %engine.descriptor().device(),
            "Registered model"
        );
        if self.models.insert(key.clone(), engine).is_some() {
            tracing::warn!(backend = %key, "Replaced previously registered model");
        }
    }

    /// Resolves a deployment id to a loaded backend and its canonical key.
    ///
    /// Alias first, then the default key when the aliased backend is not loaded.
    pub fn resolve_loaded(
        &self,
        deployment_id: &str,
    ) -> Result<(&str, Arc<dyn TranscriptionEngine>), RegistryError> {
        let requested_key = self.resolver.resolve(deployment_id);

        if let Some((key, engine)) = self.models.get_key_value(requested_key) {
            return Ok((key.as_str(), Arc::clone(engine)));
        }

        let default_key = self.resolver.default_key();
        tracing::warn!(
            deployment_id = %deployment_id,
            requested = %requested_key,
            fallback = %default_key,
            "Model not loaded, falling back to default"
        );

        self.models
            .get_key_value(default_key)
            .map(|(key, engine)| (key.as_str(), Arc::clone(engine)))
            .ok_or_else(|| RegistryError::NoBackendAvailable {
                requested: deployment_id.to_string(),
            })
    }

    pub fn get(&self, deployment_id: &str) -> Result<Arc<dyn TranscriptionEngine>, RegistryError> {
        self.resolve_loaded(deployment_id).map(|(_, engine)| engine)
    }

    pub fn list_models(&self) -> BTreeMap<String, ModelInfo> {
        self.models
            .iter()
            .map(|(key, engine)| {
                (
                    key.clone(),
                    ModelInfo {
                        descriptor: engine.descriptor().clone(),
                        aliases: self.resolver.aliases_for(key),
                    },
                )
            })
            .collect()
    }

    pub fn available_models(&self) -> BTreeSet<String> {
        self.models.keys().cloned().collect()
    }

    pub fn engines(&self) -> impl Iterator<Item = (&str, &Arc<dyn TranscriptionEngine>)> {
        self.models.iter().map(|(key, engine)| (key.as_str(), engine))
    }

    pub fn default_model(&self) -> &'static str {
        self.resolver.default_key()
    }

    pub fn resolver(&self) -> &AliasResolver {
        &self.resolver
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
