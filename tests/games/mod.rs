use game_bench::prelude::*;
use serde_json::{json, Value};

pub const COUNTDOWN: &str = "countdown";
pub const TABOO: &str = "taboo";

/// Single-player: the player is prompted `n_turns` times, any non-empty answer is valid.
///
/// Instance parameters:
/// - `n_turns`: number of turns (default 1)
/// - `fail`: the first turn fails, as a broken game resource would
/// - `protocol_violation`: the game addresses an unregistered player
/// - `reject_at`: the answer of this turn is a rule violation
pub struct Countdown {
    n_turns: u64,
    done: u64,
    reject_at: Option<u64>,
    protocol_violation: bool,
    fail: bool,
}

impl DialogueGame for Countdown {
    fn setup(&mut self, instance: &GameInstance, ctx: &mut GameContext) -> anyhow::Result<()> {
        self.fail = instance.param("fail") == Some(&json!(true));
        self.n_turns = instance.u64_param("n_turns").unwrap_or(1);
        self.reject_at = instance.u64_param("reject_at");
        self.protocol_violation = instance.param("protocol_violation") == Some(&json!(true));

        let responder = ctx.take_responder(0)?;
        let player = ctx.add_player(Player::new(responder));
        ctx.add_message(player, Message::system("Answer with the next number."))?;
        ctx.add_message(player, Message::user(format!("Count down from {}", self.n_turns)))?;
        Ok(())
    }

    fn does_game_proceed(&self, _ctx: &GameContext) -> bool {
        self.done < self.n_turns
    }

    fn validate_response(
        &mut self,
        _player: usize,
        response: &str,
        _ctx: &mut GameContext,
    ) -> Validation {
        if response.trim().is_empty() {
            Validation::Invalid
        } else if Some(self.done) == self.reject_at {
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
        Ok(match interactions.key("success") {
            Some(Value::Bool(true)) => 100.0,
            _ => 0.0,
        })
    }

    fn is_success(&self, _ctx: &GameContext) -> bool {
        self.done == self.n_turns
    }

    fn on_before_game(&mut self, ctx: &mut GameContext) -> anyhow::Result<()> {
        if self.protocol_violation {
            ctx.add_message(7, Message::user("nobody is there"))?;
        }
        Ok(())
    }

    fn on_before_turn(&mut self, turn: usize, _ctx: &mut GameContext) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("resource missing for turn {turn}");
        }
        Ok(())
    }

    fn on_after_turn(&mut self, _turn: usize, ctx: &mut GameContext) -> anyhow::Result<()> {
        self.done += 1;
        ctx.add_message(0, Message::user(format!("{} left", self.n_turns - self.done)))?;
        Ok(())
    }
}

pub fn countdown(_experiment: &Experiment) -> Box<dyn DialogueGame> {
    Box::new(Countdown {
        n_turns: 0,
        done: 0,
        reject_at: None,
        protocol_violation: false,
        fail: false,
    })
}

/// Two-player: the describer gets a word, the guesser only sees the describer's clues. Won as
/// soon as a guess contains the word; lost after `max_turns` (experiment parameter) turns.
pub struct Taboo {
    word: String,
    max_turns: usize,
    turns: usize,
    guessed: bool,
}

const DESCRIBER: usize = 0;
const GUESSER: usize = 1;

impl DialogueGame for Taboo {
    fn setup(&mut self, instance: &GameInstance, ctx: &mut GameContext) -> anyhow::Result<()> {
        self.word = instance
            .str_param("word")
            .ok_or_else(|| anyhow::anyhow!("instance without word"))?
            .to_owned();

        let describer = ctx.take_responder(0)?;
        let guesser = ctx.take_responder(1)?;
        let describer = ctx.add_player(Player::new(describer));
        let guesser = ctx.add_player(Player::new(guesser));
        ctx.add_message(describer, Message::user(format!("Describe {}", self.word)))?;
        ctx.add_message(guesser, Message::system("Guess the word from the clues."))?;
        ctx.log_key("target", self.word.clone());
        Ok(())
    }

    fn does_game_proceed(&self, _ctx: &GameContext) -> bool {
        !self.guessed && self.turns < self.max_turns
    }

    fn validate_response(
        &mut self,
        _player: usize,
        _response: &str,
        _ctx: &mut GameContext,
    ) -> Validation {
        Validation::Valid
    }

    fn parse_response(
        &mut self,
        _player: usize,
        response: &str,
        _ctx: &mut GameContext,
    ) -> anyhow::Result<String> {
        Ok(response.to_owned())
    }

    fn compute_main_score(&self, interactions: &Interactions) -> anyhow::Result<f64> {
        let turns = interactions.turns.len();
        anyhow::ensure!(turns > 0, "no turn played");
        Ok(match interactions.key("success") {
            Some(Value::Bool(true)) => 100.0 / turns as f64,
            _ => 0.0,
        })
    }

    fn is_success(&self, _ctx: &GameContext) -> bool {
        self.guessed
    }

    fn on_after_turn(&mut self, _turn: usize, _ctx: &mut GameContext) -> anyhow::Result<()> {
        self.turns += 1;
        Ok(())
    }

    fn on_after_add_response(
        &mut self,
        player: usize,
        parsed: &str,
        ctx: &mut GameContext,
    ) -> anyhow::Result<()> {
        match player {
            DESCRIBER => ctx.add_message(GUESSER, Message::user(parsed))?,
            GUESSER => {
                self.guessed = parsed.contains(&self.word);
                ctx.log_to_self("guess", json!({"guess": parsed, "correct": self.guessed}))?;
                if !self.guessed {
                    ctx.add_message(DESCRIBER, Message::user(format!("Wrong guess: {parsed}")))?;
                }
            }
            _ => anyhow::bail!("taboo has two players"),
        }
        Ok(())
    }
}

pub fn taboo(experiment: &Experiment) -> Box<dyn DialogueGame> {
    Box::new(Taboo {
        word: String::new(),
        max_turns: experiment
            .param("max_turns")
            .and_then(Value::as_u64)
            .unwrap_or(3) as usize,
        turns: 0,
        guessed: false,
    })
}

pub fn registry() -> GameRegistry {
    let mut registry = GameRegistry::new();
    registry
        .register(GameSpec::new(COUNTDOWN, "games/countdown", Arity::One), countdown)
        .unwrap();
    registry
        .register(GameSpec::new(TABOO, "games/taboo", Arity::Two), taboo)
        .unwrap();
    registry
}

pub fn instances(value: Value) -> InstanceSet {
    serde_json::from_value(value).unwrap()
}
