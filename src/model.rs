//! Model specifications and the interface every model backend implements.

use std::fmt::Display;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Author of a message in a player history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the whole conversation.
    System,
    /// Messages sent to the player (by the game master or another player).
    User,
    /// Messages produced by the player.
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        write!(f, "{s}")
    }
}

/// One entry of a player history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who wrote the message.
    pub role: Role,
    /// Text of the message.
    pub content: String,
}

impl Message {
    /// Create a message with an explicit role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// A `system` message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// A `user` message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An `assistant` message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

const DEFAULT_MAX_TOKENS: u32 = 100;

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Identifies a model: which backend serves it, its name, and its generation parameters.
///
/// A spec is immutable once built. It is used as a lookup key in the registries and as a label
/// in result directory names (see [`ModelSpec::label`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<String>,
    #[serde(default)]
    temperature: f64,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ModelSpec {
    /// A spec for `model_name` with temperature `0.0`, default max tokens and no backend.
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            backend: None,
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
            extra: Map::new(),
        }
    }

    /// Set the backend serving this model.
    #[must_use]
    pub fn with_backend(self, backend: impl Into<String>) -> Self {
        Self {
            backend: Some(backend.into()),
            ..self
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(self, temperature: f64) -> Self {
        Self {
            temperature,
            ..self
        }
    }

    /// Set the maximum number of generated tokens.
    #[must_use]
    pub fn with_max_tokens(self, max_tokens: u32) -> Self {
        Self { max_tokens, ..self }
    }

    /// Add a free-form field (backend specific settings).
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Name of the model.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Backend serving the model, if known.
    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    /// Sampling temperature.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Maximum number of generated tokens.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// A free-form field.
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub(crate) fn extras(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// `<model>-t<temperature>`, used to name result directories.
    pub fn label(&self) -> String {
        format!("{}-t{:?}", self.model_name, self.temperature)
    }
}

impl Display for ModelSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What a model returns for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// The prompt exactly as it was sent to the provider.
    pub prompt: Value,
    /// The provider response, unmodified.
    pub raw_response: Value,
    /// Role of the returned message. Anything but `assistant` is a protocol violation.
    pub role: Role,
    /// Text extracted from the response.
    pub text: String,
}

/// A callable model bound to one [`ModelSpec`].
///
/// Implementations talk to a provider. Retrying transient failures is their business (see
/// [`RetryingModel`]), the game master never retries.
pub trait Model {
    /// The spec this model was created for.
    fn spec(&self) -> &ModelSpec;

    /// Generate the next message for `history`.
    fn generate(&mut self, history: &[Message]) -> anyhow::Result<Generation>;
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, at least one.
    pub attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Wraps a model and retries failed calls according to a [`RetryPolicy`].
pub struct RetryingModel {
    inner: Box<dyn Model>,
    policy: RetryPolicy,
}

impl RetryingModel {
    /// Wrap `inner`.
    pub fn new(inner: Box<dyn Model>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl Model for RetryingModel {
    fn spec(&self) -> &ModelSpec {
        self.inner.spec()
    }

    fn generate(&mut self, history: &[Message]) -> anyhow::Result<Generation> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.inner.generate(history) {
                Ok(generation) => return Ok(generation),
                Err(e) if attempt < attempts => {
                    warn!(
                        "{}: attempt {attempt}/{attempts} failed: {e:#}",
                        self.inner.spec()
                    );
                    thread::sleep(self.policy.delay);
                    attempt += 1;
                    debug!("{}: retrying", self.inner.spec());
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("{}: giving up after {attempts} attempts", self.inner.spec())
                    })
                }
            }
        }
    }
}
