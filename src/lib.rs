//! # Game Bench
//!
//! A Rust crate for benchmarking conversational agents by making them play multi-turn,
//! rule-governed dialogue games.
//!
//! It provides:
//! - A game master state machine driving one episode of play
//!   ([`GameMaster`](crate::game_master::GameMaster))
//! - The game extension contract via the [`DialogueGame`] and [`GameFactory`] traits
//! - A uniform player abstraction over models, human operators and programmatic stand-ins
//! - A turn-grouped interaction log with a correlated raw request log
//! - A benchmark runner iterating experiments, instances and model pairings with per-episode fault
//!   isolation ([`GameBenchmark`](crate::benchmark::GameBenchmark))
//!
//! Each episode is played by a fresh game master. Players are prompted in registration order,
//! their responses are validated and parsed by the game, and every exchange is recorded.
//!
//! # Documentation Overview
//!
//! - For the turn-taking protocol and the end-of-episode flags, see the [`game_master`] module.
//! - For implementing custom games, check out the [`DialogueGame`] and [`GameFactory`] traits.
//! - For backends and how a model spec becomes a responder, see the [`backend`] module and the
//!   [`model_registry`].
//! - For configuring the runner (console output, log file, retries, experiment filter), see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For the layout of the results tree, see the [`benchmark`] module.
//!
//! # Usage Example
//!
//! Below is a minimal example running a custom game with the built-in `mock` backend:
//!
//! ```no_run
//! use std::path::Path;
//!
//! use game_bench::prelude::*;
//!
//! struct Echo {
//!     turns: usize,
//! }
//!
//! impl DialogueGame for Echo {
//!     fn setup(&mut self, instance: &GameInstance, ctx: &mut GameContext) -> anyhow::Result<()> {
//!         let responder = ctx.take_responder(0)?;
//!         let player = ctx.add_player(Player::new(responder));
//!         let word = instance.str_param("word").unwrap_or("hello");
//!         ctx.add_message(player, Message::user(format!("Repeat: {word}")))?;
//!         Ok(())
//!     }
//!
//!     fn does_game_proceed(&self, ctx: &GameContext) -> bool {
//!         ctx.current_turn().map_or(true, |turn| turn + 1 < self.turns)
//!     }
//!
//!     fn validate_response(
//!         &mut self,
//!         _: usize,
//!         response: &str,
//!         _: &mut GameContext,
//!     ) -> Validation {
//!         if response.is_empty() { Validation::Invalid } else { Validation::Valid }
//!     }
//!
//!     fn parse_response(
//!         &mut self,
//!         _: usize,
//!         response: &str,
//!         _: &mut GameContext,
//!     ) -> anyhow::Result<String> {
//!         Ok(response.trim().to_owned())
//!     }
//!
//!     fn compute_main_score(&self, interactions: &Interactions) -> anyhow::Result<f64> {
//!         Ok(interactions.turns.len() as f64)
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut games = GameRegistry::new();
//!     games.register(
//!         GameSpec::new("echo", "games/echo", Arity::One),
//!         |_: &Experiment| -> Box<dyn DialogueGame> { Box::new(Echo { turns: 3 }) },
//!     )?;
//!
//!     let mut backends = BackendRegistry::with_builtins();
//!     let models = ModelRegistry::load("models.json")?;
//!     let model = models.resolve(&ModelSpec::new("mock-a"))?;
//!
//!     let config = Configuration::from_env();
//!     let instances = InstanceSet::load("games/echo/in/instances.json")?;
//!     let benchmark = GameBenchmark::new(games.get("echo")?, instances, config)?;
//!
//!     let results = Path::new("results");
//!     let summary = benchmark.run(&mut backends, &[model], results)?;
//!     benchmark.compute_scores(results)?;
//!     benchmark.transcribe(results)?;
//!     println!("{} episode(s), {} error(s)", summary.episodes(), summary.errors());
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

pub use anyhow;

pub mod backend;
pub mod benchmark;
pub mod configuration;
pub mod error;
mod files;
pub mod game_interface;
pub mod game_master;
pub mod game_registry;
pub mod instances;
mod logger;
pub mod model;
pub mod model_registry;
pub mod player;
pub mod recorder;
pub mod transcript;

pub use game_interface::{DialogueGame, GameFactory};

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use game_bench::prelude::*;
/// ```
///
/// Includes:
/// - [`Configuration`](crate::configuration::Configuration)
/// - [`GameBenchmark`](crate::benchmark::GameBenchmark)
/// - the registries, and everything needed to write a [`DialogueGame`](crate::DialogueGame)
pub mod prelude {
    pub use crate::backend::{Backend, BackendRegistry};
    pub use crate::benchmark::{GameBenchmark, RunSummary};
    pub use crate::configuration::Configuration;
    pub use crate::error::{ConfigError, ProtocolError};
    pub use crate::game_interface::{DialogueGame, GameFactory, Validation};
    pub use crate::game_master::{GameContext, GameMaster};
    pub use crate::game_registry::{Arity, GameRegistry, GameSpec};
    pub use crate::instances::{Experiment, GameInstance, InstanceSet};
    pub use crate::model::{Message, Model, ModelSpec, Role};
    pub use crate::model_registry::ModelRegistry;
    pub use crate::player::{CustomResponder, Player, Responder};
    pub use crate::recorder::Interactions;
}
