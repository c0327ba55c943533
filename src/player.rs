//! Players: one uniform call contract over models, human operators and programmatic stand-ins.

use std::fmt::Debug;
use std::io::{BufRead, BufReader, Write};
use std::time::Instant;

use anyhow::{bail, Context};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::ProtocolError;
use crate::model::{Message, Model, Role};
use crate::recorder::timestamp;

/// A response source that answers without any external call.
///
/// Games use it for scripted opponents, and the `mock` backend uses it to run the whole
/// pipeline offline.
pub trait CustomResponder {
    /// Produce the answer to `history` at turn `turn_idx`. Must be deterministic.
    fn respond(&mut self, history: &[Message], turn_idx: usize) -> String;
}

impl<F> CustomResponder for F
where
    F: FnMut(&[Message], usize) -> String,
{
    fn respond(&mut self, history: &[Message], turn_idx: usize) -> String {
        self(history, turn_idx)
    }
}

/// An operator answering on a console.
pub struct HumanConsole {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl HumanConsole {
    /// Read from stdin, write to stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }

    /// Use custom streams (mainly for tests).
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Show `message` and block until the operator entered one line.
    pub fn ask(&mut self, message: &str) -> anyhow::Result<String> {
        writeln!(self.output, "{message}")?;
        write!(self.output, "Your response: ")?;
        self.output.flush()?;

        let mut line = String::new();
        let n = self
            .input
            .read_line(&mut line)
            .context("could not read operator input")?;
        if n == 0 {
            bail!("operator input closed");
        }
        Ok(line.trim_end_matches(['\n', '\r']).to_owned())
    }
}

/// What actually produces the answers of a [`Player`].
pub enum Responder {
    /// A model, usually talking to a remote provider.
    Model(Box<dyn Model>),
    /// An operator on a console.
    Human(HumanConsole),
    /// A deterministic stand-in.
    Programmatic(Box<dyn CustomResponder>),
}

impl Responder {
    /// A programmatic responder from a closure or a [`CustomResponder`].
    pub fn programmatic(responder: impl CustomResponder + 'static) -> Self {
        Responder::Programmatic(Box::new(responder))
    }

    /// Name shown in the player roster.
    pub fn name(&self) -> String {
        match self {
            Responder::Model(model) => model.spec().model_name().to_owned(),
            Responder::Human(_) => "human".to_owned(),
            Responder::Programmatic(_) => "programmatic".to_owned(),
        }
    }
}

impl Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Responder::Model(model) => write!(f, "Model({})", model.spec()),
            Responder::Human(_) => write!(f, "Human"),
            Responder::Programmatic(_) => write!(f, "Programmatic"),
        }
    }
}

/// The envelope returned by [`Player::respond`].
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Prompt object as sent (the history for non-model players).
    pub prompt: Value,
    /// Raw response, with the call metadata under the `"player"` key.
    pub raw_response: Value,
    /// Answer text.
    pub text: String,
}

/// A participant of one episode.
///
/// The player owns its message history; the game master appends to it, and cross-player
/// propagation goes through explicit appends as well.
#[derive(Debug)]
pub struct Player {
    descriptor: String,
    name: String,
    responder: Responder,
    history: Vec<Message>,
}

impl Player {
    /// A player answering through `responder`. Its descriptor is assigned when the game master
    /// registers it.
    pub fn new(responder: Responder) -> Self {
        Self {
            descriptor: String::new(),
            name: responder.name(),
            responder,
            history: vec![],
        }
    }

    /// Override the display name.
    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Ordinal descriptor ("Player 1", "Player 2", ...), empty before registration.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub(crate) fn set_descriptor(&mut self, descriptor: String) {
        self.descriptor = descriptor;
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Message history, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// The responder behind this player.
    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// Append a message to the history.
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Answer the current history.
    ///
    /// The call is timed, and start time and duration are folded into the raw response.
    ///
    /// # Errors
    /// Provider faults are returned as-is. A model answering with a role other than
    /// `assistant` yields a [`ProtocolError::UnexpectedRole`].
    #[instrument(skip(self), fields(player = %self.descriptor, name = %self.name))]
    pub fn respond(&mut self, turn_idx: usize) -> anyhow::Result<Response> {
        let call_start = timestamp();
        let started = Instant::now();

        let (prompt, raw_response, text) = match &mut self.responder {
            Responder::Model(model) => {
                let generation = model.generate(&self.history)?;
                if generation.role != Role::Assistant {
                    return Err(ProtocolError::UnexpectedRole {
                        model: model.spec().to_string(),
                        role: generation.role,
                    }
                    .into());
                }
                (generation.prompt, generation.raw_response, generation.text)
            }
            Responder::Human(console) => {
                let last = self
                    .history
                    .last()
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                let text = console.ask(last)?;
                (json!(self.history), json!({ "response": text }), text)
            }
            Responder::Programmatic(responder) => {
                let text = responder.respond(&self.history, turn_idx);
                (json!(self.history), json!({ "response": text }), text)
            }
        };

        let call_duration = started.elapsed().as_secs_f64();
        debug!(call_duration, "response received");

        let meta = json!({
            "call_start": call_start,
            "call_duration": call_duration,
            "response": text,
            "model_name": self.name,
        });
        let raw_response = match raw_response {
            Value::Object(mut map) => {
                map.insert("player".to_owned(), meta);
                Value::Object(map)
            }
            other => json!({ "response": other, "player": meta }),
        };

        Ok(Response {
            prompt,
            raw_response,
            text,
        })
    }
}
