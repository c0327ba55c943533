//! The game master: the turn-taking state machine driving one episode.
//!
//! ```text
//! Uninitialized --setup--> SetupDone --play--> Turn(0) -> Turn(1) -> ... -> Finished
//! ```
//!
//! During a turn every registered player, in registration order, is
//! 1. sent its next prompt (the last message of its own history),
//! 2. asked for a response,
//! 3. re-asked as long as the game requests a reprompt,
//! 4. validated; only a valid response is parsed and appended to the player history.
//!
//! The termination predicate is checked before each player, so an episode can end mid-turn.
//! An invalid response aborts the episode, a rule violation loses it. Both are reported through
//! the logged keys and the final action, never raised.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::{ConfigError, ProtocolError};
use crate::game_interface::{DialogueGame, Validation};
use crate::instances::GameInstance;
use crate::model::{Message, ModelSpec};
use crate::player::{Player, Responder};
use crate::recorder::{Action, GameRecorder, Interactions, GAME_MASTER};

/// Keys logged by the game master at the end of every episode.
pub mod keys {
    /// Episode aborted on an invalid response.
    pub const ABORTED: &str = "aborted";
    /// Episode lost on a rule violation.
    pub const LOST: &str = "lost";
    /// Episode won, as reported by the game.
    pub const SUCCESS: &str = "success";
    /// Number of turns opened.
    pub const TURNS_PLAYED: &str = "turns_played";
}

/// State of a [`GameMaster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// Created, `setup` not called yet.
    Uninitialized,
    /// Players registered and logged.
    SetupDone,
    /// Playing the given turn.
    Turn(usize),
    /// Terminal.
    Finished,
}

impl Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameState::Uninitialized => write!(f, "Uninitialized"),
            GameState::SetupDone => write!(f, "SetupDone"),
            GameState::Turn(t) => write!(f, "Turn({t})"),
            GameState::Finished => write!(f, "Finished"),
        }
    }
}

struct Seat {
    spec: ModelSpec,
    responder: Option<Responder>,
}

/// Everything a game may touch during an episode: players, seats, recorder and end flags.
pub struct GameContext {
    seats: Vec<Seat>,
    players: Vec<Player>,
    recorder: GameRecorder,
    aborted: bool,
    lost: bool,
}

impl GameContext {
    /// A context whose seats are filled with `seats`, in seat order.
    pub fn new(seats: Vec<(ModelSpec, Responder)>) -> Self {
        Self {
            seats: seats
                .into_iter()
                .map(|(spec, responder)| Seat {
                    spec,
                    responder: Some(responder),
                })
                .collect(),
            players: vec![],
            recorder: GameRecorder::new(),
            aborted: false,
            lost: false,
        }
    }

    /// Model spec of a seat.
    pub fn seat_spec(&self, seat: usize) -> Option<&ModelSpec> {
        self.seats.get(seat).map(|s| &s.spec)
    }

    /// Number of seats filled by the runner.
    pub fn num_seats(&self) -> usize {
        self.seats.len()
    }

    /// Take the responder of a seat to build a player. Each seat can be taken once.
    pub fn take_responder(&mut self, seat: usize) -> Result<Responder, ConfigError> {
        self.seats
            .get_mut(seat)
            .and_then(|s| s.responder.take())
            .ok_or(ConfigError::MissingSeat(seat))
    }

    /// Register a player and return its index. Its descriptor becomes "Player <index + 1>".
    pub fn add_player(&mut self, mut player: Player) -> usize {
        let idx = self.players.len();
        player.set_descriptor(format!("Player {}", idx + 1));
        debug!("registered {} ({})", player.descriptor(), player.name());
        self.players.push(player);
        idx
    }

    /// All players, in registration order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// A registered player.
    pub fn player(&self, idx: usize) -> Result<&Player, ProtocolError> {
        self.players
            .get(idx)
            .ok_or(ProtocolError::UnknownPlayer(idx))
    }

    /// Append `message` to the history of player `idx`.
    ///
    /// This is the only way a message reaches another player's history.
    pub fn add_message(&mut self, idx: usize, message: Message) -> Result<(), ProtocolError> {
        self.players
            .get_mut(idx)
            .ok_or(ProtocolError::UnknownPlayer(idx))?
            .add_message(message);
        Ok(())
    }

    /// The episode recorder.
    pub fn recorder(&self) -> &GameRecorder {
        &self.recorder
    }

    /// The episode recorder, for game specific events.
    pub fn recorder_mut(&mut self) -> &mut GameRecorder {
        &mut self.recorder
    }

    /// Store an episode-level fact.
    pub fn log_key(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.recorder.log_key(key, value);
    }

    /// Log a game master event in the open turn.
    pub fn log_to_self(
        &mut self,
        kind: impl Into<String>,
        content: impl Into<serde_json::Value>,
    ) -> Result<(), ProtocolError> {
        self.recorder.log_to_self(kind, content)
    }

    /// Index of the open turn.
    pub fn current_turn(&self) -> Option<usize> {
        self.recorder.current_turn()
    }

    /// End the episode as aborted.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// End the episode as lost.
    pub fn lose(&mut self) {
        self.lost = true;
    }

    /// True once the episode was aborted.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// True once the episode was lost.
    pub fn is_lost(&self) -> bool {
        self.lost
    }
}

/// Drives one episode of a [`DialogueGame`].
pub struct GameMaster {
    game_name: String,
    game: Box<dyn DialogueGame>,
    ctx: GameContext,
    state: GameState,
}

impl GameMaster {
    /// A game master for `game`, with one `(spec, responder)` per seat.
    pub fn new(
        game_name: impl Into<String>,
        game: Box<dyn DialogueGame>,
        seats: Vec<(ModelSpec, Responder)>,
    ) -> Self {
        Self {
            game_name: game_name.into(),
            game,
            ctx: GameContext::new(seats),
            state: GameState::Uninitialized,
        }
    }

    /// Current state.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// Players, seats, recorder and flags of the episode.
    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    fn expect_state(
        &self,
        operation: &'static str,
        expected: GameState,
    ) -> Result<(), ProtocolError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ProtocolError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    /// Let the game register its players for `instance`, then log the roster.
    #[instrument(skip_all, fields(game = %self.game_name, game_id = %instance.game_id))]
    pub fn setup(&mut self, instance: &GameInstance) -> anyhow::Result<()> {
        self.expect_state("setup", GameState::Uninitialized)?;
        self.game.setup(instance, &mut self.ctx)?;

        if self.ctx.players.is_empty() {
            return Err(ProtocolError::NoPlayers(self.game_name.clone()).into());
        }
        let mut roster = BTreeMap::new();
        roster.insert(
            GAME_MASTER.to_owned(),
            format!("Game master for {}", self.game_name),
        );
        for player in &self.ctx.players {
            roster.insert(
                player.descriptor().to_owned(),
                format!("{}, {}", player.name(), describe(player.responder())),
            );
        }
        self.ctx.recorder.log_players(roster);

        self.state = GameState::SetupDone;
        Ok(())
    }

    /// Play the episode to its end.
    ///
    /// # Errors
    /// Errors of the game hooks or of the players (provider faults, protocol violations) are
    /// returned as soon as they happen; the episode is then left unfinished.
    #[instrument(skip_all, fields(game = %self.game_name))]
    pub fn play(&mut self) -> anyhow::Result<()> {
        self.expect_state("play", GameState::SetupDone)?;
        self.game.on_before_game(&mut self.ctx)?;

        while self.proceeds() {
            let turn = self.ctx.recorder.begin_turn();
            self.state = GameState::Turn(turn);
            info!("turn {turn}");
            self.game.on_before_turn(turn, &mut self.ctx)?;

            for idx in 0..self.ctx.players.len() {
                if !self.proceeds() {
                    break;
                }
                self.prompt(idx, turn)?;
            }

            if !self.ctx.aborted && !self.ctx.lost {
                self.game.on_after_turn(turn, &mut self.ctx)?;
            }
        }

        self.game.on_after_game(&mut self.ctx)?;
        self.log_game_end()?;
        self.state = GameState::Finished;
        Ok(())
    }

    /// Main score of the episode recorded so far.
    pub fn compute_main_score(&self) -> anyhow::Result<f64> {
        self.game.compute_main_score(self.ctx.recorder.interactions())
    }

    /// The recorded interactions.
    pub fn interactions(&self) -> &Interactions {
        self.ctx.recorder.interactions()
    }

    /// Persist the recorder artifacts into `destination`.
    pub fn finalize(&self, destination: &Path) -> anyhow::Result<()> {
        self.ctx.recorder.finalize(destination)
    }

    fn proceeds(&self) -> bool {
        !self.ctx.aborted && !self.ctx.lost && self.game.does_game_proceed(&self.ctx)
    }

    fn prompt(&mut self, idx: usize, turn: usize) -> anyhow::Result<()> {
        let mut response = self.send_and_receive(idx, turn, "send message")?;
        while self.game.should_reprompt(idx, &response, &self.ctx) {
            self.game.on_before_reprompt(idx, &mut self.ctx)?;
            response = self.send_and_receive(idx, turn, "send message (reprompt)")?;
        }

        match self.game.validate_response(idx, &response, &mut self.ctx) {
            Validation::Valid => {
                let parsed = self.game.parse_response(idx, &response, &mut self.ctx)?;
                self.ctx.add_message(idx, Message::assistant(parsed.clone()))?;
                self.game.on_after_add_response(idx, &parsed, &mut self.ctx)?;
            }
            Validation::Invalid => {
                info!("{}: invalid response, aborting", self.ctx.players[idx].descriptor());
                self.ctx.abort();
                self.ctx.log_to_self("invalid response", response)?;
            }
            Validation::RuleViolation => {
                info!("{}: rule violation, game lost", self.ctx.players[idx].descriptor());
                self.ctx.lose();
                self.ctx.log_to_self("rule violation", response)?;
            }
        }
        Ok(())
    }

    fn send_and_receive(&mut self, idx: usize, turn: usize, kind: &str) -> anyhow::Result<String> {
        let player = self.ctx.player(idx)?;
        let descriptor = player.descriptor().to_owned();
        let prompt = player
            .history()
            .last()
            .ok_or_else(|| ProtocolError::EmptyHistory(descriptor.clone()))?
            .content
            .clone();

        self.ctx
            .recorder
            .log_event(GAME_MASTER, &descriptor, &Action::new(kind, prompt), None)?;

        let response = self.ctx.players[idx].respond(turn)?;

        self.ctx.recorder.log_event(
            &descriptor,
            GAME_MASTER,
            &Action::new("get message", response.text.as_str()),
            Some((&response.prompt, &response.raw_response)),
        )?;
        Ok(response.text)
    }

    fn log_game_end(&mut self) -> anyhow::Result<()> {
        let success = self.game.is_success(&self.ctx);
        let outcome = if self.ctx.aborted {
            "game aborted"
        } else if self.ctx.lost {
            "game lost"
        } else if success {
            "game successful"
        } else {
            "game ended"
        };

        let turns_played = self.ctx.recorder.interactions().turns.len();
        if self.ctx.recorder.current_turn().is_none() {
            // the game never proceeded: the final action still needs a turn
            self.ctx.recorder.begin_turn();
        }
        self.ctx.log_to_self("game end", outcome)?;

        self.ctx.log_key(keys::ABORTED, self.ctx.aborted);
        self.ctx.log_key(keys::LOST, self.ctx.lost);
        self.ctx.log_key(keys::SUCCESS, success && !self.ctx.aborted && !self.ctx.lost);
        self.ctx.log_key(keys::TURNS_PLAYED, turns_played);
        info!("{}: {outcome} after {turns_played} turn(s)", self.game_name);
        Ok(())
    }
}

fn describe(responder: &Responder) -> String {
    match responder {
        Responder::Model(model) => model.spec().label(),
        Responder::Human(_) => "human operator".to_owned(),
        Responder::Programmatic(_) => "programmatic player".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::model::{Generation, Model, Role};

    /// Each player must say its index; `turns` turns are played.
    struct CountGame {
        turns: usize,
        played: usize,
        reprompts_left: usize,
        invalid_at: Option<usize>,
        violation_at: Option<usize>,
        stop_after_first_player: bool,
        propagate: bool,
        closed_turns: Rc<Cell<usize>>,
    }

    impl CountGame {
        fn new(turns: usize) -> Self {
            Self {
                turns,
                played: 0,
                reprompts_left: 0,
                invalid_at: None,
                violation_at: None,
                stop_after_first_player: false,
                propagate: false,
                closed_turns: Rc::new(Cell::new(0)),
            }
        }
    }

    impl DialogueGame for CountGame {
        fn setup(&mut self, _instance: &GameInstance, ctx: &mut GameContext) -> anyhow::Result<()> {
            for seat in 0..ctx.num_seats() {
                let responder = ctx.take_responder(seat)?;
                let idx = ctx.add_player(Player::new(responder));
                ctx.add_message(idx, Message::user(format!("you are {idx}")))?;
            }
            Ok(())
        }

        fn does_game_proceed(&self, _ctx: &GameContext) -> bool {
            self.played < self.turns
        }

        fn validate_response(
            &mut self,
            _player: usize,
            _response: &str,
            ctx: &mut GameContext,
        ) -> Validation {
            let turn = ctx.current_turn().unwrap();
            if Some(turn) == self.invalid_at {
                Validation::Invalid
            } else if Some(turn) == self.violation_at {
                Validation::RuleViolation
            } else {
                Validation::Valid
            }
        }

        fn parse_response(
            &mut self,
            _player: usize,
            response: &str,
            _ctx: &mut GameContext,
        ) -> anyhow::Result<String> {
            Ok(response.trim().to_owned())
        }

        fn compute_main_score(&self, interactions: &Interactions) -> anyhow::Result<f64> {
            Ok(interactions.turns.len() as f64)
        }

        fn is_success(&self, _ctx: &GameContext) -> bool {
            self.played == self.turns
        }

        fn on_after_turn(&mut self, _turn: usize, _ctx: &mut GameContext) -> anyhow::Result<()> {
            self.played += 1;
            self.closed_turns.set(self.closed_turns.get() + 1);
            Ok(())
        }

        fn should_reprompt(&mut self, _player: usize, _response: &str, _ctx: &GameContext) -> bool {
            if self.reprompts_left > 0 {
                self.reprompts_left -= 1;
                true
            } else {
                false
            }
        }

        fn on_before_reprompt(
            &mut self,
            player: usize,
            ctx: &mut GameContext,
        ) -> anyhow::Result<()> {
            ctx.add_message(player, Message::user("try again"))?;
            Ok(())
        }

        fn on_after_add_response(
            &mut self,
            player: usize,
            parsed: &str,
            ctx: &mut GameContext,
        ) -> anyhow::Result<()> {
            if self.stop_after_first_player {
                self.played = self.turns;
            }
            if self.propagate {
                let other = (player + 1) % ctx.players().len();
                ctx.add_message(other, Message::user(parsed))?;
            }
            Ok(())
        }
    }

    fn echo_seat(name: &str) -> (ModelSpec, Responder) {
        (
            ModelSpec::new(name).with_backend("mock"),
            Responder::programmatic(|history: &[Message], turn: usize| {
                format!("{} at {turn}", history.last().map(|m| m.content.as_str()).unwrap_or(""))
            }),
        )
    }

    fn master(game: CountGame, seats: usize) -> GameMaster {
        let seats = (0..seats).map(|i| echo_seat(&format!("m{i}"))).collect();
        GameMaster::new("count", Box::new(game), seats)
    }

    fn actions(gm: &GameMaster) -> Vec<String> {
        gm.interactions()
            .events()
            .map(|e| e.action.kind.clone())
            .collect()
    }

    #[test]
    fn state_transitions() {
        let mut gm = master(CountGame::new(2), 1);
        assert_eq!(gm.state(), GameState::Uninitialized);
        assert!(gm.play().is_err());

        gm.setup(&GameInstance::new(0)).unwrap();
        assert_eq!(gm.state(), GameState::SetupDone);
        assert!(gm.setup(&GameInstance::new(0)).is_err());

        gm.play().unwrap();
        assert_eq!(gm.state(), GameState::Finished);
        let err = gm.play().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::InvalidState { .. })
        ));
    }

    #[test]
    fn plays_requested_number_of_turns() {
        let mut gm = master(CountGame::new(3), 2);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        let interactions = gm.interactions();
        assert_eq!(interactions.turns.len(), 3);
        assert_eq!(interactions.players.len(), 3);
        assert_eq!(interactions.key(keys::SUCCESS), Some(&json!(true)));
        assert_eq!(interactions.key(keys::ABORTED), Some(&json!(false)));
        assert_eq!(interactions.key(keys::TURNS_PLAYED), Some(&json!(3)));
        // two players, send + get each, plus the final action in the last turn
        assert_eq!(interactions.turns[0].len(), 4);
        assert_eq!(interactions.turns[2].len(), 5);
        assert_eq!(gm.context().recorder().requests().len(), 6);

        let last = interactions.turns[2].last().unwrap();
        assert_eq!(last.action, Action::new("game end", "game successful"));
        assert_eq!(gm.compute_main_score().unwrap(), 3.0);
    }

    #[test]
    fn player_history_grows_with_parsed_responses() {
        let mut gm = master(CountGame::new(2), 1);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        let history = gm.context().players()[0].history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1], Message::assistant("you are 0 at 0"));
        assert_eq!(history[2], Message::assistant("you are 0 at 0 at 1"));
    }

    #[test]
    fn responses_propagate_explicitly() {
        let mut game = CountGame::new(1);
        game.propagate = true;
        let mut gm = master(game, 2);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        let second = gm.context().players()[1].history();
        // initial prompt, message from player 1, own answer
        assert_eq!(second[1], Message::user("you are 0 at 0"));
        assert_eq!(second[2], Message::assistant("you are 0 at 0 at 0"));
    }

    #[test]
    fn reprompt_asks_same_player_again() {
        let mut game = CountGame::new(1);
        game.reprompts_left = 2;
        let mut gm = master(game, 1);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        assert_eq!(
            actions(&gm),
            vec![
                "send message",
                "get message",
                "send message (reprompt)",
                "get message",
                "send message (reprompt)",
                "get message",
                "game end",
            ]
        );
        let history = gm.context().players()[0].history();
        assert_eq!(history.last().unwrap(), &Message::assistant("try again at 0"));
    }

    #[test]
    fn invalid_response_aborts_immediately() {
        let mut game = CountGame::new(5);
        game.invalid_at = Some(1);
        let mut gm = master(game, 2);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        let interactions = gm.interactions();
        assert_eq!(interactions.turns.len(), 2);
        assert_eq!(interactions.key(keys::ABORTED), Some(&json!(true)));
        assert_eq!(interactions.key(keys::SUCCESS), Some(&json!(false)));
        // the second player was never prompted in turn 1
        assert!(interactions.turns[1].iter().all(|e| e.to != "Player 2"));
        assert_eq!(
            interactions.turns[1].last().unwrap().action,
            Action::new("game end", "game aborted")
        );
        // invalid responses never reach the history
        assert_eq!(gm.context().players()[0].history().len(), 2);
    }

    #[test]
    fn rule_violation_loses() {
        let mut game = CountGame::new(5);
        game.violation_at = Some(0);
        let mut gm = master(game, 1);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        let interactions = gm.interactions();
        assert_eq!(interactions.key(keys::LOST), Some(&json!(true)));
        assert_eq!(interactions.key(keys::ABORTED), Some(&json!(false)));
        assert_eq!(
            interactions.turns[0].last().unwrap().action,
            Action::new("game end", "game lost")
        );
    }

    #[test]
    fn game_can_end_mid_turn() {
        let mut game = CountGame::new(3);
        game.stop_after_first_player = true;
        let closed_turns = game.closed_turns.clone();
        let mut gm = master(game, 2);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();

        let interactions = gm.interactions();
        assert_eq!(interactions.turns.len(), 1);
        assert!(interactions.turns[0].iter().all(|e| e.to != "Player 2"));
        // the interrupted turn is still closed by the game
        assert_eq!(closed_turns.get(), 1);
    }

    #[test]
    fn setup_without_players_is_a_protocol_error() {
        struct Empty;
        impl DialogueGame for Empty {
            fn setup(&mut self, _: &GameInstance, _: &mut GameContext) -> anyhow::Result<()> {
                Ok(())
            }
            fn does_game_proceed(&self, _: &GameContext) -> bool {
                true
            }
            fn validate_response(&mut self, _: usize, _: &str, _: &mut GameContext) -> Validation {
                Validation::Valid
            }
            fn parse_response(
                &mut self,
                _: usize,
                r: &str,
                _: &mut GameContext,
            ) -> anyhow::Result<String> {
                Ok(r.to_owned())
            }
            fn compute_main_score(&self, _: &Interactions) -> anyhow::Result<f64> {
                Ok(0.0)
            }
        }

        let mut gm = GameMaster::new("empty", Box::new(Empty), vec![echo_seat("m")]);
        let err = gm.setup(&GameInstance::new(0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::NoPlayers(name)) if name == "empty"
        ));
        assert_eq!(gm.state(), GameState::Uninitialized);
        assert!(gm.play().is_err());
    }

    #[test]
    fn final_action_is_logged_when_no_turn_was_played() {
        let mut gm = master(CountGame::new(0), 1);
        gm.setup(&GameInstance::new(0)).unwrap();
        gm.play().unwrap();
        assert_eq!(actions(&gm), vec!["game end"]);
        assert_eq!(gm.interactions().key(keys::TURNS_PLAYED), Some(&json!(0)));
    }

    struct UserRole(ModelSpec);

    impl Model for UserRole {
        fn spec(&self) -> &ModelSpec {
            &self.0
        }

        fn generate(&mut self, _history: &[Message]) -> anyhow::Result<Generation> {
            Ok(Generation {
                prompt: json!([]),
                raw_response: json!({}),
                role: Role::User,
                text: "oops".into(),
            })
        }
    }

    #[test]
    fn wrong_role_surfaces_as_protocol_error() {
        let spec = ModelSpec::new("broken").with_backend("test");
        let seats = vec![(spec.clone(), Responder::Model(Box::new(UserRole(spec))))];
        let mut gm = GameMaster::new("count", Box::new(CountGame::new(1)), seats);
        gm.setup(&GameInstance::new(0)).unwrap();
        let err = gm.play().unwrap_err();
        assert!(crate::error::is_protocol_violation(&err));
    }

    #[test]
    fn empty_history_is_a_protocol_error() {
        struct Silent;
        impl DialogueGame for Silent {
            fn setup(&mut self, _: &GameInstance, ctx: &mut GameContext) -> anyhow::Result<()> {
                let responder = ctx.take_responder(0)?;
                ctx.add_player(Player::new(responder));
                Ok(())
            }
            fn does_game_proceed(&self, _: &GameContext) -> bool {
                true
            }
            fn validate_response(&mut self, _: usize, _: &str, _: &mut GameContext) -> Validation {
                Validation::Valid
            }
            fn parse_response(
                &mut self,
                _: usize,
                r: &str,
                _: &mut GameContext,
            ) -> anyhow::Result<String> {
                Ok(r.to_owned())
            }
            fn compute_main_score(&self, _: &Interactions) -> anyhow::Result<f64> {
                Ok(0.0)
            }
        }

        let mut gm = GameMaster::new("silent", Box::new(Silent), vec![echo_seat("m")]);
        gm.setup(&GameInstance::new(0)).unwrap();
        let err = gm.play().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProtocolError>(),
            Some(ProtocolError::EmptyHistory(_))
        ));
    }

    #[test]
    fn seats_can_only_be_taken_once() {
        let mut ctx = GameContext::new(vec![echo_seat("m")]);
        assert_eq!(ctx.seat_spec(0).unwrap().model_name(), "m");
        assert!(ctx.take_responder(0).is_ok());
        assert!(matches!(
            ctx.take_responder(0),
            Err(ConfigError::MissingSeat(0))
        ));
        assert!(ctx.take_responder(1).is_err());
    }
}
