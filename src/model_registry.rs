//! Declarative list of known models.
//!
//! Command lines and experiment files usually name a model only. The registry completes such a
//! partial [`ModelSpec`] from the first entry with the same model name: the backend, and the
//! backend-specific fields the caller did not set.
//!
//! ```json
//! [
//!   { "model_name": "mock-a", "backend": "mock" },
//!   { "model_name": "gpt-4o", "backend": "openai", "context_size": 128000 }
//! ]
//! ```

use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::model::ModelSpec;

/// Known models, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRegistry {
    entries: Vec<ModelSpec>,
}

impl ModelRegistry {
    /// A registry with the given entries.
    pub fn from_entries(entries: Vec<ModelSpec>) -> Self {
        Self { entries }
    }

    /// Read a JSON array of model specs.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let entries = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self { entries })
    }

    /// All entries.
    pub fn entries(&self) -> &[ModelSpec] {
        &self.entries
    }

    /// Complete `partial` with the first entry of the same name.
    ///
    /// The generation parameters of `partial` are kept; its backend and extra fields win over the
    /// entry's. A spec that already names a backend is returned as-is when no entry matches.
    ///
    /// # Errors
    /// [`ConfigError::ModelNotFound`] when no entry matches and `partial` names no backend.
    pub fn resolve(&self, partial: &ModelSpec) -> Result<ModelSpec, ConfigError> {
        let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.model_name() == partial.model_name())
        else {
            return match partial.backend() {
                Some(_) => Ok(partial.clone()),
                None => Err(ConfigError::ModelNotFound(partial.model_name().to_owned())),
            };
        };

        let mut spec = ModelSpec::new(partial.model_name())
            .with_temperature(partial.temperature())
            .with_max_tokens(partial.max_tokens());
        if let Some(backend) = partial.backend().or(entry.backend()) {
            spec = spec.with_backend(backend);
        }
        for (key, value) in entry.extras().iter().chain(partial.extras()) {
            spec = spec.with_extra(key.clone(), value.clone());
        }
        debug!("resolved {partial} to backend {:?}", spec.backend());
        Ok(spec)
    }
}
