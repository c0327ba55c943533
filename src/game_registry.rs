//! Statically compiled registry of the games the benchmark can run.
//!
//! Game specs (name, path, arity) usually come from a JSON file describing every game; the
//! implementation behind each name is a [`GameFactory`] registered by the composition root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::ConfigError;
use crate::game_interface::GameFactory;

/// Number of seats of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    /// Single-player game.
    One,
    /// Two-player game.
    Two,
}

impl Arity {
    /// Number of players.
    pub fn num_players(self) -> usize {
        match self {
            Arity::One => 1,
            Arity::Two => 2,
        }
    }
}

/// A game registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSpec {
    /// Unique game name.
    pub game_name: String,
    /// Where the game's resources (instances, templates) live.
    pub game_path: PathBuf,
    /// Number of seats.
    pub players: Arity,
    /// Free-form fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameSpec {
    /// A spec without free-form fields.
    pub fn new(
        game_name: impl Into<String>,
        game_path: impl Into<PathBuf>,
        players: Arity,
    ) -> Self {
        Self {
            game_name: game_name.into(),
            game_path: game_path.into(),
            players,
            extra: Map::new(),
        }
    }

    /// Read a JSON array of game specs.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<GameSpec>, ConfigError> {
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

/// A spec bound to the factory creating its games.
pub struct GameEntry {
    spec: GameSpec,
    factory: Box<dyn GameFactory>,
}

impl GameEntry {
    /// The registry entry.
    pub fn spec(&self) -> &GameSpec {
        &self.spec
    }

    /// The factory.
    pub fn factory(&self) -> &dyn GameFactory {
        self.factory.as_ref()
    }
}

/// Games known to this process. Owned by the composition root and passed by reference.
#[derive(Default)]
pub struct GameRegistry {
    entries: BTreeMap<String, GameEntry>,
}

impl GameRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for `spec`.
    ///
    /// # Errors
    /// [`ConfigError::AmbiguousGame`] if the name is already taken.
    pub fn register(
        &mut self,
        spec: GameSpec,
        factory: impl GameFactory + 'static,
    ) -> Result<(), ConfigError> {
        if self.entries.contains_key(&spec.game_name) {
            return Err(ConfigError::AmbiguousGame(spec.game_name));
        }
        info!("registered game '{}'", spec.game_name);
        self.entries.insert(
            spec.game_name.clone(),
            GameEntry {
                spec,
                factory: Box::new(factory),
            },
        );
        Ok(())
    }

    /// Look a game up.
    pub fn get(&self, game_name: &str) -> Result<&GameEntry, ConfigError> {
        self.entries
            .get(game_name)
            .ok_or_else(|| ConfigError::GameNotFound(game_name.to_owned()))
    }

    /// Specs of all registered games, sorted by name.
    pub fn specs(&self) -> impl Iterator<Item = &GameSpec> {
        self.entries.values().map(|entry| &entry.spec)
    }
}
