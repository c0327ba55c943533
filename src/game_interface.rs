//! Module defining traits that need to be implemented to add a game to the benchmark
//!
//! A game is a [`DialogueGame`]: the game master drives the turn-taking and calls its hooks.
//! Required methods must be written by every game, the compiler rejects a game that omits one:
//!
//! ```compile_fail
//! use game_bench::prelude::*;
//!
//! struct Incomplete;
//!
//! impl DialogueGame for Incomplete {
//!     fn setup(
//!         &mut self,
//!         _instance: &GameInstance,
//!         _ctx: &mut GameContext,
//!     ) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!     // does_game_proceed, validate_response, parse_response and compute_main_score missing
//! }
//! ```
//!
//! Provided hooks default to doing nothing, and the reprompt decision defaults to never.

use crate::game_master::GameContext;
use crate::instances::{Experiment, GameInstance};
use crate::recorder::Interactions;

/// Outcome of the validation of a player response.
///
/// Some games only ever use one of the two failure variants; both end the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// The response is well formed and follows the rules.
    Valid,
    /// The response is malformed: the episode is aborted.
    Invalid,
    /// The response is well formed but loses the game.
    RuleViolation,
}

/// What a game should implement
///
/// Player indices passed to the hooks are registration indices (see
/// [`GameContext::add_player`]).
pub trait DialogueGame {
    /// Register the players (with their initial prompts) for `instance`.
    fn setup(&mut self, instance: &GameInstance, ctx: &mut GameContext) -> anyhow::Result<()>;

    /// True while the game should go on. Checked before every player's turn.
    fn does_game_proceed(&self, ctx: &GameContext) -> bool;

    /// Decide whether `response` of `player` is acceptable.
    fn validate_response(
        &mut self,
        player: usize,
        response: &str,
        ctx: &mut GameContext,
    ) -> Validation;

    /// Turn a valid response into the text appended to the player history.
    fn parse_response(
        &mut self,
        player: usize,
        response: &str,
        ctx: &mut GameContext,
    ) -> anyhow::Result<String>;

    /// The main score of a finished episode, computed from its persisted interactions.
    fn compute_main_score(&self, interactions: &Interactions) -> anyhow::Result<f64>;

    /// True if the game was won. Only consulted once play is over.
    fn is_success(&self, _ctx: &GameContext) -> bool {
        false
    }

    /// Called once before the first turn.
    fn on_before_game(&mut self, _ctx: &mut GameContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after a turn was opened, before any player is prompted.
    fn on_before_turn(&mut self, _turn: usize, _ctx: &mut GameContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called at the end of every turn, also when the game stopped proceeding mid-turn.
    ///
    /// Skipped once the episode is aborted or lost.
    fn on_after_turn(&mut self, _turn: usize, _ctx: &mut GameContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once after the last turn.
    fn on_after_game(&mut self, _ctx: &mut GameContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Ask the same player again before its response is validated.
    fn should_reprompt(&mut self, _player: usize, _response: &str, _ctx: &GameContext) -> bool {
        false
    }

    /// Revise the prompt of `player` before a reprompt, usually by appending a message.
    fn on_before_reprompt(&mut self, _player: usize, _ctx: &mut GameContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after the parsed response was added to the player history. Propagate it to
    /// other players here.
    fn on_after_add_response(
        &mut self,
        _player: usize,
        _parsed: &str,
        _ctx: &mut GameContext,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What will be given to the benchmark to allow it to create games
pub trait GameFactory {
    /// Returns a fresh game for one episode of `experiment`
    fn new_game(&self, experiment: &Experiment) -> Box<dyn DialogueGame>;
}

impl<F> GameFactory for F
where
    F: Fn(&Experiment) -> Box<dyn DialogueGame>,
{
    fn new_game(&self, experiment: &Experiment) -> Box<dyn DialogueGame> {
        self(experiment)
    }
}
