use crate::workflow::Snapshot;
use anyhow::{Context, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Export the current view to the working directory.
/// Returns the absolute path of the exported file.
pub fn export_snapshot_json(snapshot: &Snapshot) -> Result<std::path::PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(crate::storage::default_export_name(snapshot));
    crate::storage::export_json(&path, snapshot)?;
    Ok(path)
}

/// Export and report the outcome in the status line.
pub fn export_and_show_path(state: &mut UiState) {
    match export_snapshot_json(&state.snapshot) {
        Ok(path) => {
            state.last_exported_path = Some(path.to_string_lossy().to_string());
            state.info = format!("Saved: {}", path.display());
        }
        Err(e) => {
            state.info = format!("Save failed: {e:#}");
        }
    }
}

/// Copy the thread id of the current run (or the typed one) to the clipboard.
pub fn copy_thread_id(state: &mut UiState) {
    let Some(thread) = state.thread_to_copy() else {
        state.info = "No thread id to copy yet.".into();
        return;
    };
    state.info = match copy_to_clipboard(&thread) {
        Ok(()) => format!("✓ Copied thread id: {thread}"),
        Err(e) => format!("Clipboard copy failed: {e:#}"),
    };
}

/// Initialize the clipboard manager thread if not already initialized.
/// Each clipboard instance is kept alive for a while so clipboard managers on
/// Linux have time to read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
