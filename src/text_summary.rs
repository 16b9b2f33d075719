//! Text rendering of a workflow snapshot.
//!
//! Shared by text mode and the TUI columns so both present the same wording.

use crate::model::Mode;
use crate::workflow::Snapshot;
use anyhow::{Context, Result};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Left column: the workflow of the current run.
pub(crate) fn workflow_lines(snap: &Snapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if snap.mode == Mode::List {
        return lines;
    }
    if snap.busy {
        lines.push("Processing... The agent is thinking...".into());
    }
    let Some(result) = snap.result.as_ref() else {
        return lines;
    };

    lines.push("Agent Workflow".into());
    if let Some(issue) = result.issue_report.as_deref() {
        lines.push(format!("Issue: {issue}"));
    }
    if result.updates.is_empty() {
        lines.push("No updates available.".into());
    } else {
        lines.extend(result.updates.iter().map(|u| format!("  • {u}")));
    }
    if let Some(cot) = result.chain_of_thought.as_deref() {
        lines.push(String::new());
        lines.push("Chain-of-Thought".into());
        lines.extend(cot.lines().map(str::to_string));
    }
    if let Some(rec) = result.recommendation_text.as_deref() {
        lines.push(String::new());
        lines.push("Final Recommendation".into());
        lines.extend(rec.lines().map(str::to_string));
        if let Some(thread) = result.addressable_thread() {
            lines.push(String::new());
            lines.push(format!("Thread ID: {thread}"));
        }
    }
    if let Some(step) = result.next_step.as_deref() {
        lines.push(format!("Next step: {step}"));
    }
    lines
}

/// Right column: run documents, or session records in `List` mode.
pub(crate) fn documents_lines(snap: &Snapshot) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    if snap.mode == Mode::List {
        lines.push("Session Documents".into());
        match snap.sessions.as_deref() {
            None if snap.sessions_loading => lines.push("Loading sessions...".into()),
            None => {}
            Some([]) => lines.push("No sessions found.".into()),
            Some(sessions) => {
                for (idx, doc) in sessions.iter().enumerate() {
                    lines.push(format!("Session Document #{}", idx + 1));
                    let pretty =
                        serde_json::to_string_pretty(doc).context("serialize session document")?;
                    lines.extend(pretty.lines().map(str::to_string));
                    lines.push(String::new());
                }
            }
        }
        return Ok(lines);
    }

    lines.push("Agent Run Documents".into());
    let has_thread = snap
        .result
        .as_ref()
        .and_then(|r| r.addressable_thread())
        .is_some();
    if !has_thread {
        lines.push("Run an agent to see inserted documents.".into());
        return Ok(lines);
    }
    match snap.documents.as_ref() {
        Some(docs) => {
            for (collection, doc) in docs {
                lines.push(collection.clone());
                let pretty = serde_json::to_string_pretty(doc)
                    .with_context(|| format!("serialize document from {collection}"))?;
                lines.extend(pretty.lines().map(str::to_string));
                lines.push(String::new());
            }
        }
        None if snap.documents_pending => lines.push("Loading run documents...".into()),
        None => lines.push("No run documents available.".into()),
    }
    Ok(lines)
}

/// Build the full text-mode output for a finished one-shot action.
pub(crate) fn build_text_summary(snap: &Snapshot) -> Result<TextSummary> {
    let mut lines = vec![format!("== {} ==", snap.mode.label())];
    lines.extend(workflow_lines(snap));
    if snap.mode != Mode::List {
        lines.push(String::new());
    }
    lines.extend(documents_lines(snap)?);
    if let Some(err) = snap.error.as_ref() {
        lines.push(format!("Error ({:?}): {}", err.kind, err.message));
    }
    Ok(TextSummary { lines })
}
