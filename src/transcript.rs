//! Markdown transcripts of recorded episodes.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use serde_json::Value;

use crate::recorder::{Interactions, INTERACTIONS_FILE};

/// File name of a rendered transcript.
pub const TRANSCRIPT_FILE: &str = "transcript.md";

/// Render `interactions` as markdown. The output only depends on its input.
pub fn render(title: &str, interactions: &Interactions) -> String {
    let mut out = String::new();
    // writing to a String never fails
    let _ = write_transcript(&mut out, title, interactions);
    out
}

fn write_transcript(
    out: &mut String,
    title: &str,
    interactions: &Interactions,
) -> std::fmt::Result {
    writeln!(out, "# {title}")?;
    writeln!(out)?;
    writeln!(out, "## Players")?;
    writeln!(out)?;
    for (descriptor, description) in &interactions.players {
        writeln!(out, "- **{descriptor}**: {description}")?;
    }

    for (idx, turn) in interactions.turns.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "## Turn {}", idx + 1)?;
        for event in turn {
            writeln!(out)?;
            writeln!(out, "**{} → {}** _{}_", event.from, event.to, event.action.kind)?;
            writeln!(out)?;
            for line in content_text(&event.action.content).lines() {
                writeln!(out, "> {line}")?;
            }
        }
    }

    if !interactions.keys.is_empty() {
        writeln!(out)?;
        writeln!(out, "## Episode")?;
        writeln!(out)?;
        for (key, value) in &interactions.keys {
            writeln!(out, "- {key}: {}", content_text(value))?;
        }
    }
    Ok(())
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) if s.is_empty() => "(empty)".to_owned(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render the `interactions.json` of `episode_dir` into its `transcript.md`.
pub fn transcribe_episode(title: &str, episode_dir: &Path) -> anyhow::Result<()> {
    let interactions = Interactions::load(episode_dir.join(INTERACTIONS_FILE))?;
    let path = episode_dir.join(TRANSCRIPT_FILE);
    std::fs::write(&path, render(title, &interactions))
        .with_context(|| format!("could not write {}", path.display()))
}
