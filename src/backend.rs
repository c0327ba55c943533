//! Backends: named providers of responders, instantiated lazily by a [`BackendRegistry`].
//!
//! A backend is registered under a name with a loader. The loader runs the first time the name is
//! resolved, and the resulting backend is cached for the lifetime of the registry. Two built-in
//! backends need no external service:
//! - [`MOCK`]: deterministic canned answers, used to run whole benchmarks offline,
//! - [`HUMAN`]: an operator answering on the console.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use anyhow::Context;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::error::ConfigError;
use crate::model::{Generation, Message, Model, ModelSpec, RetryPolicy, RetryingModel, Role};
use crate::player::{HumanConsole, Responder};

/// Name of the built-in mock backend.
pub const MOCK: &str = "mock";

/// Name of the built-in human backend.
pub const HUMAN: &str = "human";

/// A provider of responders.
pub trait Backend {
    /// Name the backend is registered under.
    fn name(&self) -> &str;

    /// A responder bound to `spec`.
    fn responder(&self, spec: &ModelSpec) -> anyhow::Result<Responder>;
}

type BackendLoader = Box<dyn Fn() -> anyhow::Result<Box<dyn Backend>>>;

/// Known backends. Owned by the composition root and passed by reference.
pub struct BackendRegistry {
    loaders: BTreeMap<String, BackendLoader>,
    loaded: HashMap<String, Box<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// A registry without any backend.
    pub fn new() -> Self {
        Self {
            loaders: BTreeMap::new(),
            loaded: HashMap::new(),
        }
    }

    /// A registry knowing the [`MOCK`] and [`HUMAN`] backends.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // names are distinct on an empty registry
        let _ = registry.register(MOCK, || Ok(Box::new(MockBackend) as Box<dyn Backend>));
        let _ = registry.register(HUMAN, || Ok(Box::new(HumanBackend) as Box<dyn Backend>));
        registry
    }

    /// Register `loader` under `name`. Nothing is instantiated until the name is resolved.
    ///
    /// # Errors
    /// [`ConfigError::AmbiguousBackend`] if the name is already taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        loader: impl Fn() -> anyhow::Result<Box<dyn Backend>> + 'static,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.loaders.contains_key(&name) {
            return Err(ConfigError::AmbiguousBackend(name));
        }
        debug!("registered backend '{name}'");
        self.loaders.insert(name, Box::new(loader));
        Ok(())
    }

    /// Names of all registered backends, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// True once `name` was instantiated.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains_key(name)
    }

    /// The backend registered under `name`, instantiated on first use.
    ///
    /// # Errors
    /// [`ConfigError::BackendNotFound`] for an unknown name, or the error of the loader.
    pub fn resolve(&mut self, name: &str) -> anyhow::Result<&dyn Backend> {
        let backend = match self.loaded.entry(name.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let loader = self
                    .loaders
                    .get(name)
                    .ok_or_else(|| ConfigError::BackendNotFound(name.to_owned()))?;
                let backend = loader().with_context(|| format!("could not load backend '{name}'"))?;
                info!("loaded backend '{name}'");
                entry.insert(backend)
            }
        };
        Ok(&**backend)
    }

    /// A responder for `spec`, from the backend the spec names.
    ///
    /// Model-backed responders retry failed calls according to `retry`.
    ///
    /// # Errors
    /// [`ConfigError::MissingBackend`] if the spec names no backend, plus the errors of
    /// [`resolve`](Self::resolve) and of the backend.
    #[instrument(skip(self, retry), fields(model = %spec))]
    pub fn load_responder(
        &mut self,
        spec: &ModelSpec,
        retry: RetryPolicy,
    ) -> anyhow::Result<Responder> {
        let name = spec
            .backend()
            .ok_or_else(|| ConfigError::MissingBackend(spec.model_name().to_owned()))?;
        let responder = self
            .resolve(name)?
            .responder(spec)
            .with_context(|| format!("backend '{name}' could not serve {spec}"))?;
        Ok(match responder {
            Responder::Model(model) => Responder::Model(Box::new(RetryingModel::new(model, retry))),
            other => other,
        })
    }
}

struct MockBackend;

impl Backend for MockBackend {
    fn name(&self) -> &str {
        MOCK
    }

    fn responder(&self, spec: &ModelSpec) -> anyhow::Result<Responder> {
        Ok(Responder::Model(Box::new(MockModel { spec: spec.clone() })))
    }
}

/// Answers without calling anything.
///
/// The answer is the `response` extra field of the spec if set, else the entry of the
/// `responses` extra array indexed by the number of answers already given (cycling), else
/// `"<model>: <last message>"`.
struct MockModel {
    spec: ModelSpec,
}

impl MockModel {
    fn answer(&self, history: &[Message]) -> String {
        if let Some(text) = self.spec.extra("response").and_then(Value::as_str) {
            return text.to_owned();
        }
        if let Some(responses) = self.spec.extra("responses").and_then(Value::as_array) {
            if !responses.is_empty() {
                let given = history.iter().filter(|m| m.role == Role::Assistant).count();
                return match &responses[given % responses.len()] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
            }
        }
        let last = history.last().map(|m| m.content.as_str()).unwrap_or("");
        format!("{}: {last}", self.spec.model_name())
    }
}

impl Model for MockModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn generate(&mut self, history: &[Message]) -> anyhow::Result<Generation> {
        let text = self.answer(history);
        Ok(Generation {
            prompt: json!({
                "model": self.spec.model_name(),
                "temperature": self.spec.temperature(),
                "max_tokens": self.spec.max_tokens(),
                "messages": history,
            }),
            raw_response: json!({
                "model": self.spec.model_name(),
                "choices": [{ "message": { "role": Role::Assistant, "content": text } }],
            }),
            role: Role::Assistant,
            text,
        })
    }
}

struct HumanBackend;

impl Backend for HumanBackend {
    fn name(&self) -> &str {
        HUMAN
    }

    fn responder(&self, _spec: &ModelSpec) -> anyhow::Result<Responder> {
        Ok(Responder::Human(HumanConsole::stdio()))
    }
}
