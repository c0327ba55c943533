//! Runs a game over all its experiments and instances.
//!
//! This module provides [`GameBenchmark`], which plays every instance of every experiment of one
//! game with a pairing of player models, one fresh [`GameMaster`] per episode.
//!
//! # Results layout
//!
//! ```text
//! <results_root>/<modelA>-t<T>--<modelB>-t<T>/<game>/<idx>_<experiment>/
//!     experiment_<experiment>.json
//!     episode_0/instance.json
//!     episode_0/interactions.json
//!     episode_0/requests.json
//!     episode_0/scores.json        (compute_scores)
//!     episode_0/transcript.md      (transcribe)
//! ```
//!
//! # Failures
//!
//! Each episode runs inside its own error boundary: a failing episode is logged, counted, and the
//! runner moves on to the next one. Its artifacts beyond `instance.json` are not written.
//! Configuration errors are raised before any episode runs, and protocol violations
//! ([`ProtocolError`](crate::error::ProtocolError)) cross the boundary and stop the run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, instrument, warn};

use crate::backend::BackendRegistry;
use crate::configuration::Configuration;
use crate::error::{is_protocol_violation, ConfigError};
use crate::files::{sorted_subdirs, write_json};
use crate::game_master::{keys, GameMaster};
use crate::game_registry::{Arity, GameEntry, GameSpec};
use crate::instances::{Experiment, GameInstance, InstanceSet};
use crate::logger::init_logger;
use crate::model::ModelSpec;
use crate::player::Responder;
use crate::recorder::{timestamp, Interactions, INTERACTIONS_FILE};
use crate::transcript::transcribe_episode;

/// File name of the persisted instance of an episode.
pub const INSTANCE_FILE: &str = "instance.json";

/// File name of the scores of an episode.
pub const SCORES_FILE: &str = "scores.json";

/// Models seated in a game, and the directory name describing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    /// One spec per seat.
    pub seats: Vec<ModelSpec>,
    /// `<modelA>-t<T>--<modelB>-t<T>`.
    pub descriptor: String,
}

/// Seat `player_models` in `game`.
///
/// A single-player game takes exactly one model and is described as a pair of that model with
/// itself. A two-player game takes one model, playing both seats, or two.
///
/// # Errors
/// [`ConfigError::Pairing`] when the number of models does not fit the game.
pub fn pairing(game: &GameSpec, player_models: &[ModelSpec]) -> Result<Pairing, ConfigError> {
    let seats = match (game.players, player_models) {
        (Arity::One, [model]) => vec![model.clone()],
        (Arity::Two, [model]) => vec![model.clone(), model.clone()],
        (Arity::Two, [a, b]) => vec![a.clone(), b.clone()],
        _ => {
            return Err(ConfigError::Pairing {
                game: game.game_name.clone(),
                seats: game.players.num_players(),
                given: player_models.len(),
            })
        }
    };
    let descriptor = match seats.as_slice() {
        [only] => format!("{}--{}", only.label(), only.label()),
        seats => seats
            .iter()
            .map(ModelSpec::label)
            .collect::<Vec<_>>()
            .join("--"),
    };
    Ok(Pairing { seats, descriptor })
}

/// Outcome of one experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    /// Experiment name.
    pub name: String,
    /// Episodes attempted.
    pub episodes: usize,
    /// Episodes that failed.
    pub errors: usize,
    /// Directory holding the experiment results.
    pub results_dir: PathBuf,
}

/// Outcome of [`GameBenchmark::run`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// One entry per experiment run, in file order.
    pub experiments: Vec<ExperimentSummary>,
}

impl RunSummary {
    /// Episodes attempted over all experiments.
    pub fn episodes(&self) -> usize {
        self.experiments.iter().map(|e| e.episodes).sum()
    }

    /// Failed episodes over all experiments.
    pub fn errors(&self) -> usize {
        self.experiments.iter().map(|e| e.errors).sum()
    }
}

/// All experiments of one game.
pub struct GameBenchmark<'r> {
    entry: &'r GameEntry,
    instances: InstanceSet,
    config: Configuration,
}

impl<'r> GameBenchmark<'r> {
    /// A benchmark of `entry` over `instances`.
    ///
    /// Installs the file logger when the configuration asks for it.
    #[instrument(skip_all, fields(game = %entry.spec().game_name))]
    pub fn new(
        entry: &'r GameEntry,
        instances: InstanceSet,
        config: Configuration,
    ) -> anyhow::Result<Self> {
        if config.log {
            let path = init_logger(&config.log_dir)?;
            info!("logging to {}", path.display());
        }
        info!(?config, experiments = instances.experiments.len());
        Ok(Self {
            entry,
            instances,
            config,
        })
    }

    /// A benchmark of `entry` over the instances in `<game_path>/in/instances.json`.
    pub fn from_game_path(entry: &'r GameEntry, config: Configuration) -> anyhow::Result<Self> {
        let path = entry.spec().game_path.join("in").join("instances.json");
        let instances = InstanceSet::load(&path)?;
        Self::new(entry, instances, config)
    }

    fn game_name(&self) -> &str {
        &self.entry.spec().game_name
    }

    /// Play every instance of every selected experiment with `player_models`.
    ///
    /// Results are written under `results_root` (see the module documentation).
    ///
    /// # Errors
    /// Configuration errors (pairing, unknown backend), protocol violations, and IO errors on the
    /// results tree. Other episode failures are only counted in the returned summary.
    #[instrument(skip_all, fields(game = %self.game_name()))]
    pub fn run(
        &self,
        backends: &mut BackendRegistry,
        player_models: &[ModelSpec],
        results_root: &Path,
    ) -> anyhow::Result<RunSummary> {
        let pairing = pairing(self.entry.spec(), player_models)?;
        let game_dir = results_root
            .join(&pairing.descriptor)
            .join(self.game_name());
        info!("running {} with {}", self.game_name(), pairing.descriptor);

        if self.config.verbose {
            disable_line_wrap();
        }
        let mut summary = RunSummary::default();
        for (exp_idx, experiment) in self.instances.experiments.iter().enumerate() {
            if !self.config.runs_experiment(&experiment.name) {
                info!("skipping experiment '{}'", experiment.name);
                continue;
            }
            let result = self.run_experiment(backends, &pairing, exp_idx, experiment, &game_dir);
            match result {
                Ok(experiment_summary) => summary.experiments.push(experiment_summary),
                Err(e) => {
                    if self.config.verbose {
                        enable_line_wrap();
                    }
                    return Err(e);
                }
            }
        }
        if self.config.verbose {
            enable_line_wrap();
        }

        info!(
            "{}: {} episode(s), {} error(s)",
            self.game_name(),
            summary.episodes(),
            summary.errors()
        );
        Ok(summary)
    }

    #[instrument(skip_all, fields(experiment = %experiment.name))]
    fn run_experiment(
        &self,
        backends: &mut BackendRegistry,
        pairing: &Pairing,
        exp_idx: usize,
        experiment: &Experiment,
        game_dir: &Path,
    ) -> anyhow::Result<ExperimentSummary> {
        let started = Instant::now();
        let exp_dir = game_dir.join(format!("{exp_idx}_{}", experiment.name));
        std::fs::create_dir_all(&exp_dir)
            .with_context(|| format!("could not create {}", exp_dir.display()))?;

        let record_path = exp_dir.join(format!("experiment_{}.json", experiment.name));
        let mut record = experiment.params.clone();
        record.insert("name".to_owned(), json!(experiment.name));
        record.insert("game_name".to_owned(), json!(self.game_name()));
        record.insert("player_models".to_owned(), json!(pairing.descriptor));
        record.insert("models".to_owned(), json!(pairing.seats));
        record.insert("timestamp".to_owned(), json!(timestamp()));
        write_json(&record_path, &record)?;

        let total = experiment.game_instances.len();
        let mut errors = 0;
        for (idx, instance) in experiment.game_instances.iter().enumerate() {
            if self.config.verbose {
                print_progress(self.game_name(), &experiment.name, idx, total);
            }
            let episode_dir = exp_dir.join(format!("episode_{idx}"));
            std::fs::create_dir_all(&episode_dir)
                .with_context(|| format!("could not create {}", episode_dir.display()))?;
            write_json(&episode_dir.join(INSTANCE_FILE), instance)?;

            let retry = self.config.retry_policy();
            let seats = pairing
                .seats
                .iter()
                .map(|spec| Ok((spec.clone(), backends.load_responder(spec, retry)?)))
                .collect::<anyhow::Result<Vec<_>>>()?;

            if let Err(err) = self.run_episode(experiment, instance, seats, &episode_dir) {
                let err = err.context(format!(
                    "{} / {} / episode {idx}",
                    self.game_name(),
                    experiment.name
                ));
                if is_protocol_violation(&err) {
                    error!("protocol violation: {err:#}");
                    return Err(err);
                }
                errors += 1;
                error!("episode failed: {err:#}");
            }
        }

        let duration = started.elapsed();
        record.insert("duration".to_owned(), json!(format_duration(duration)));
        write_json(&record_path, &record)?;

        if errors > 0 {
            warn!("{errors} of {total} episode(s) of '{}' failed", experiment.name);
        }
        if self.config.verbose {
            print_experiment_result(self.game_name(), &experiment.name, total, errors, duration);
        }
        Ok(ExperimentSummary {
            name: experiment.name.clone(),
            episodes: total,
            errors,
            results_dir: exp_dir,
        })
    }

    fn run_episode(
        &self,
        experiment: &Experiment,
        instance: &GameInstance,
        seats: Vec<(ModelSpec, Responder)>,
        episode_dir: &Path,
    ) -> anyhow::Result<()> {
        let game = self.entry.factory().new_game(experiment);
        let mut master = GameMaster::new(self.game_name(), game, seats);
        master.setup(instance)?;
        master.play()?;
        master.finalize(episode_dir)
    }

    /// Write the `scores.json` of every recorded episode of this game under `results_root`.
    ///
    /// Only reads `interactions.json` files: running it twice produces identical files.
    /// Returns the number of episodes scored.
    #[instrument(skip_all, fields(game = %self.game_name()))]
    pub fn compute_scores(&self, results_root: &Path) -> anyhow::Result<usize> {
        let mut scored = 0;
        for (experiment, episode_dir) in self.recorded_episodes(results_root)? {
            let interactions = Interactions::load(episode_dir.join(INTERACTIONS_FILE))?;
            let game = self.entry.factory().new_game(experiment);
            let main_score = match game.compute_main_score(&interactions) {
                Ok(score) => json!(score),
                Err(e) => {
                    warn!("{}: could not compute main score: {e:#}", episode_dir.display());
                    Value::Null
                }
            };

            let mut scores = Map::new();
            scores.insert("main_score".to_owned(), main_score);
            for key in [keys::ABORTED, keys::LOST, keys::SUCCESS, keys::TURNS_PLAYED] {
                scores.insert(
                    key.to_owned(),
                    interactions.key(key).cloned().unwrap_or(Value::Null),
                );
            }
            write_json(&episode_dir.join(SCORES_FILE), &scores)?;
            scored += 1;
        }
        info!("scored {scored} episode(s)");
        Ok(scored)
    }

    /// Write the `transcript.md` of every recorded episode of this game under `results_root`.
    ///
    /// Returns the number of transcripts written.
    #[instrument(skip_all, fields(game = %self.game_name()))]
    pub fn transcribe(&self, results_root: &Path) -> anyhow::Result<usize> {
        let mut written = 0;
        for (experiment, episode_dir) in self.recorded_episodes(results_root)? {
            let episode = episode_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let title = format!("{} / {} / {episode}", self.game_name(), experiment.name);
            transcribe_episode(&title, &episode_dir)?;
            written += 1;
        }
        info!("wrote {written} transcript(s)");
        Ok(written)
    }

    /// Episode directories with an `interactions.json`, for every pairing, sorted.
    fn recorded_episodes(
        &self,
        results_root: &Path,
    ) -> anyhow::Result<Vec<(&Experiment, PathBuf)>> {
        let mut episodes = vec![];
        for pairing_dir in sorted_subdirs(results_root)? {
            for exp_dir in sorted_subdirs(&pairing_dir.join(self.game_name()))? {
                let Some(experiment) = self.experiment_of(&exp_dir) else {
                    warn!("{}: no matching experiment, skipped", exp_dir.display());
                    continue;
                };
                for episode_dir in sorted_subdirs(&exp_dir)? {
                    if episode_dir.join(INTERACTIONS_FILE).is_file() {
                        episodes.push((experiment, episode_dir));
                    }
                }
            }
        }
        Ok(episodes)
    }

    fn experiment_of(&self, exp_dir: &Path) -> Option<&Experiment> {
        let dir_name = exp_dir.file_name()?.to_str()?;
        self.instances
            .experiments
            .iter()
            .enumerate()
            .find(|(idx, e)| format!("{idx}_{}", e.name) == dir_name)
            .map(|(_, e)| e)
    }
}

/// `H:MM:SS.ffffff`
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        secs / 60 % 60,
        secs % 60,
        duration.subsec_micros()
    )
}

fn print_progress(game: &str, experiment: &str, idx: usize, total: usize) {
    // clear, green, default, start of line
    print!(
        "\x1b[2K\x1b[32mRunning...:\x1b[39m {game} {experiment} episode {}/{total}\x1b[0G",
        idx + 1
    );
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

fn print_experiment_result(
    game: &str,
    experiment: &str,
    episodes: usize,
    errors: usize,
    duration: Duration,
) {
    // clear line, green experiment, results, red errors, start of line
    println!(
        "\x1b[2K\x1b[32m{game} {experiment}: \x1b[39m{episodes} episode(s) in {} \x1b[31m{}\x1b[39m\x1b[0G",
        format_duration(duration),
        if errors > 0 {
            format!("{errors} error(s), see the log")
        } else {
            String::new()
        }
    );
}

fn disable_line_wrap() {
    print!("\x1b[?7l");
}

fn enable_line_wrap() {
    print!("\x1b[?7h");
}
