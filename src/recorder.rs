//! Append-only record of everything that happened during one episode.
//!
//! The recorder keeps two logs:
//! - the *interactions*: the player roster, episode-level keys, and one bucket of [`Event`]s per
//!   turn,
//! - the *requests*: raw prompt/response pairs, correlated with the interaction events through
//!   their timestamp.
//!
//! A turn must be opened with [`GameRecorder::begin_turn`] before anything is logged in it.
//! Payloads are copied when they are logged, so the caller may keep mutating its own values.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::error::ProtocolError;
use crate::files::{read_json, write_json};

/// Name of the game master in the logs.
pub const GAME_MASTER: &str = "GM";

/// File name of the persisted interactions.
pub const INTERACTIONS_FILE: &str = "interactions.json";

/// File name of the persisted requests.
pub const REQUESTS_FILE: &str = "requests.json";

/// Current UTC time, RFC 3339 formatted.
pub(crate) fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Payload of an event: a type tag and free content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Kind of action, e.g. `"send message"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Content of the action.
    pub content: Value,
}

impl Action {
    /// Create an action.
    pub fn new(kind: impl Into<String>, content: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            content: content.into(),
        }
    }
}

/// One logged event of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sender.
    pub from: String,
    /// Receiver.
    pub to: String,
    /// RFC 3339 time of logging.
    pub timestamp: String,
    /// What happened.
    pub action: Action,
}

/// A raw provider exchange, correlated to an [`Event`] by its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Same timestamp as the event logged with it.
    pub timestamp: String,
    /// Prompt as sent.
    pub prompt: Value,
    /// Response as received.
    pub response: Value,
}

/// The persisted `interactions.json` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interactions {
    /// Player descriptor to human readable description.
    pub players: BTreeMap<String, String>,
    /// Events grouped by turn.
    pub turns: Vec<Vec<Event>>,
    /// Episode-level facts logged with [`GameRecorder::log_key`].
    #[serde(flatten)]
    pub keys: Map<String, Value>,
}

impl Interactions {
    /// Read an `interactions.json` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        read_json(path.as_ref())
    }

    /// A key logged with [`GameRecorder::log_key`].
    pub fn key(&self, key: &str) -> Option<&Value> {
        self.keys.get(key)
    }

    /// All events of all turns, in order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.turns.iter().flatten()
    }
}

#[derive(Serialize)]
struct Requests<'a> {
    requests: &'a [RequestRecord],
}

const RESERVED_KEYS: [&str; 2] = ["players", "turns"];

/// Records the interactions of one episode.
#[derive(Debug, Default)]
pub struct GameRecorder {
    current_turn: Option<usize>,
    interactions: Interactions,
    requests: Vec<RequestRecord>,
}

impl GameRecorder {
    /// An empty recorder; no turn is open yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the next turn and return its index (starting at 0).
    pub fn begin_turn(&mut self) -> usize {
        let turn = self.current_turn.map_or(0, |t| t + 1);
        self.current_turn = Some(turn);
        self.interactions.turns.push(vec![]);
        debug!(turn, "turn opened");
        turn
    }

    /// Index of the open turn, `None` before the first [`begin_turn`](Self::begin_turn).
    pub fn current_turn(&self) -> Option<usize> {
        self.current_turn
    }

    /// Append an event to the open turn.
    ///
    /// When `call` (prompt, response) is given, a request record with the same timestamp is
    /// appended to the request log. `action` and `call` are copied.
    ///
    /// # Errors
    /// [`ProtocolError::NoTurnStarted`] when no turn was opened.
    pub fn log_event(
        &mut self,
        from: &str,
        to: &str,
        action: &Action,
        call: Option<(&Value, &Value)>,
    ) -> Result<(), ProtocolError> {
        let turn = self.current_turn.ok_or(ProtocolError::NoTurnStarted)?;
        let timestamp = timestamp();
        self.interactions.turns[turn].push(Event {
            from: from.to_owned(),
            to: to.to_owned(),
            timestamp: timestamp.clone(),
            action: action.clone(),
        });
        if let Some((prompt, response)) = call {
            self.requests.push(RequestRecord {
                timestamp,
                prompt: prompt.clone(),
                response: response.clone(),
            });
        }
        Ok(())
    }

    /// Log an event from the game master to itself.
    pub fn log_to_self(
        &mut self,
        kind: impl Into<String>,
        content: impl Into<Value>,
    ) -> Result<(), ProtocolError> {
        self.log_event(GAME_MASTER, GAME_MASTER, &Action::new(kind, content), None)
    }

    /// Set the player roster.
    pub fn log_players(&mut self, descriptions: BTreeMap<String, String>) {
        self.interactions.players = descriptions;
    }

    /// Store an episode-level fact. A later call with the same key replaces the value.
    pub fn log_key(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            warn!("key '{key}' is reserved and was not logged");
            return;
        }
        self.interactions.keys.insert(key, value.into());
    }

    /// The interactions recorded so far.
    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    /// The requests recorded so far.
    pub fn requests(&self) -> &[RequestRecord] {
        &self.requests
    }

    /// Write `interactions.json` and `requests.json` into `destination`.
    ///
    /// Empty rosters, turns or requests are reported as warnings: they usually mean the game
    /// forgot to log something.
    #[instrument(skip(self))]
    pub fn finalize(&self, destination: &Path) -> anyhow::Result<()> {
        if self.interactions.players.is_empty() {
            warn!("no players logged in {}", destination.display());
        }
        if self.interactions.turns.is_empty() {
            warn!("no turns logged in {}", destination.display());
        }
        if self.requests.is_empty() {
            warn!("no requests logged in {}", destination.display());
        }
        write_json(&destination.join(INTERACTIONS_FILE), &self.interactions)?;
        write_json(
            &destination.join(REQUESTS_FILE),
            &Requests {
                requests: &self.requests,
            },
        )?;
        Ok(())
    }
}
