//! Typed errors of the benchmark.
//!
//! Two families are distinguished:
//! - [`ConfigError`]: the benchmark is mis-configured (unknown backend or game, bad pairing,
//!   unreadable registry files). Raised before or outside of any episode and never retried.
//! - [`ProtocolError`]: an implementation defect (a game logging outside of a turn, a provider
//!   answering with the wrong role, ...). These errors cross the per-episode isolation of the
//!   benchmark runner and stop the run.
//!
//! Everything else is an ordinary [`anyhow::Error`] and is counted as a failed episode.

use std::path::PathBuf;

use crate::model::Role;

/// Errors caused by an invalid benchmark configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No backend is registered under this name.
    #[error("backend '{0}' not found")]
    BackendNotFound(String),

    /// A second implementation was registered for an already known backend name.
    #[error("backend '{0}' has more than one registered implementation")]
    AmbiguousBackend(String),

    /// The model spec does not name a backend and could not be unified with the model registry.
    #[error("model '{0}' has no backend")]
    MissingBackend(String),

    /// The model registry has no entry for this model.
    #[error("model '{0}' not found in model registry")]
    ModelNotFound(String),

    /// No game is registered under this name.
    #[error("game '{0}' not found")]
    GameNotFound(String),

    /// A second factory was registered for an already known game name.
    #[error("game '{0}' has more than one registered implementation")]
    AmbiguousGame(String),

    /// The number of player models does not fit the arity of the game.
    #[error("'{game}' is a {seats}-player game but {given} player model(s) were given")]
    Pairing {
        /// Name of the game.
        game: String,
        /// Number of seats of the game.
        seats: usize,
        /// Number of models handed to the runner.
        given: usize,
    },

    /// A game asked for a seat the runner did not fill.
    #[error("no player model for seat {0}")]
    MissingSeat(usize),

    /// IO error while reading a configuration file.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON error while parsing a configuration file.
    #[error("JSON parse error in '{path}': {source}")]
    Json {
        /// File that could not be parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Violations of the orchestration protocol.
///
/// Reaching one of these means a game or a backend is mis-implemented.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An event was logged before the first call to `begin_turn`.
    #[error("event logged before the first turn was started")]
    NoTurnStarted,

    /// A model-backed player received a message whose role is not `assistant`.
    #[error("expected a response with role 'assistant' from '{model}', got '{role}'")]
    UnexpectedRole {
        /// Model that produced the response.
        model: String,
        /// Role found in the response.
        role: Role,
    },

    /// A player was prompted while its history is empty.
    #[error("{0} has an empty message history, nothing to prompt")]
    EmptyHistory(String),

    /// A hook addressed a player index that was never registered.
    #[error("no player registered at index {0}")]
    UnknownPlayer(usize),

    /// Setup finished without registering a single player.
    #[error("game '{0}' registered no player during setup")]
    NoPlayers(String),

    /// A game master operation was called in the wrong state.
    #[error("'{operation}' is not allowed in state {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State of the game master at the time of the call.
        state: String,
    },
}

/// True if `err`, or any error in its chain, is a [`ProtocolError`].
pub fn is_protocol_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<ProtocolError>().is_some())
}
