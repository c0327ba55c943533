//! Experiments and game instances, as read from an instance file.
//!
//! ```json
//! {
//!   "experiments": [
//!     {
//!       "name": "easy",
//!       "max_turns": 3,
//!       "game_instances": [ { "game_id": 0, "target": "crane" } ]
//!     }
//!   ]
//! }
//! ```
//!
//! Every field besides `name`, `game_instances` and `game_id` is free-form and kept as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// All experiments of one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSet {
    /// Experiments, in file order.
    pub experiments: Vec<Experiment>,
}

impl InstanceSet {
    /// Read and validate an instance file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })
    }
}

/// A named group of game instances sharing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Experiment name, used in result directory names.
    pub name: String,
    /// Instances to play, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub game_instances: Vec<GameInstance>,
    /// Free-form experiment parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Experiment {
    /// An experiment without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            game_instances: vec![],
            params: Map::new(),
        }
    }

    /// A free-form parameter.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Parameters of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInstance {
    /// Identifier of the instance inside its experiment.
    pub game_id: Value,
    /// Free-form instance parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl GameInstance {
    /// An instance without parameters.
    pub fn new(game_id: impl Into<Value>) -> Self {
        Self {
            game_id: game_id.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// A free-form parameter.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// A string parameter.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    /// An integer parameter.
    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.param(key).and_then(Value::as_u64)
    }
}
