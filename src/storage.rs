//! Local files: snapshot exports and the debug log location.

use crate::workflow::Snapshot;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "agent-diagnosis-cli";

/// Snapshot as written to disk, stamped with the export time.
#[derive(Serialize)]
struct ExportedSnapshot<'a> {
    exported_at_utc: String,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Base directory for application data (`~/.local/share/agent-diagnosis-cli` on Linux).
pub fn base_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .context("no data directory available")?
        .join(APP_DIR);
    Ok(dir)
}

pub fn debug_log_path() -> Result<PathBuf> {
    let dir = base_dir()?;
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir.join("debug.log"))
}

pub fn export_json(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let doc = ExportedSnapshot {
        exported_at_utc: now_rfc3339(),
        snapshot,
    };
    let data = serde_json::to_vec_pretty(&doc).context("serialize snapshot")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Default file name for an export of `snapshot`: thread id if known, else a timestamp.
pub fn default_export_name(snapshot: &Snapshot) -> String {
    let stamp = now_rfc3339().replace(':', "-").replace('T', "_");
    match snapshot.result.as_ref().and_then(|r| r.addressable_thread()) {
        Some(thread) => {
            let safe: String = thread
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                .collect();
            format!("agent-run-{safe}-{stamp}.json")
        }
        None => format!("agent-{}-{stamp}.json", snapshot.mode.label().to_lowercase().replace(' ', "-")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mode, WorkflowResult};
    use crate::workflow::Workflow;

    #[test]
    fn export_writes_snapshot_with_timestamp() {
        let dir = std::env::temp_dir().join(format!("agent-diagnosis-cli-test-{}", std::process::id()));
        let path = dir.join("nested").join("snap.json");
        let snap = Workflow::new("q").snapshot();

        export_json(&path, &snap).unwrap();
        let v: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(v["mode"], "new");
        assert!(v["exported_at_utc"].is_string());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn export_name_prefers_thread_id() {
        let mut snap = Workflow::new("").snapshot();
        assert!(default_export_name(&snap).starts_with("agent-new-diagnosis-"));

        snap.mode = Mode::Resume;
        snap.result = Some(WorkflowResult {
            thread_id: Some("abc/12".into()),
            ..Default::default()
        });
        assert!(default_export_name(&snap).starts_with("agent-run-abc_12-"));
    }
}
