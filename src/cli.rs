use crate::model::{ClientConfig, Mode};
use crate::orchestrator::{self, ActionRequest};
use crate::transport::HttpTransport;
use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "agent-diagnosis-cli",
    version,
    about = "Drive diagnostic agent runs: start, resume, or list sessions"
)]
pub struct Cli {
    /// Base URL of the agent backend API
    #[arg(long, env = "AGENT_API_URL", default_value = "http://localhost:8000/api")]
    pub base_url: String,

    /// Query text pre-filled in the New Diagnosis view
    #[arg(long, env = "AGENT_INITIAL_QUERY", default_value = "")]
    pub initial_query: String,

    /// Per-call timeout (agent runs can take minutes)
    #[arg(long, default_value = "300s")]
    pub timeout: humantime::Duration,

    /// Action for --json / --text
    #[arg(long, value_enum, default_value_t = Mode::New)]
    pub mode: Mode,

    /// Query text for --mode new (defaults to --initial-query)
    #[arg(long)]
    pub query: Option<String>,

    /// Thread id for --mode resume
    #[arg(long, default_value = "")]
    pub thread_id: String,

    /// Print the final state as JSON and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Also write the final state to this file
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text && cfg!(feature = "tui")
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        timeout: Duration::from(args.timeout),
        user_agent: format!("agent-diagnosis-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }
    run_oneshot(args).await
}

/// Perform a single action, print the outcome, and fail if the backend reported an error.
async fn run_oneshot(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let transport = HttpTransport::new(&cfg)?;
    let request = ActionRequest {
        mode: args.mode,
        query: args.query.clone().unwrap_or_else(|| args.initial_query.clone()),
        thread_id: args.thread_id.clone(),
    };

    let snapshot = orchestrator::run_once(&transport, &request)
        .await
        .context("action rejected")?;

    if let Some(path) = args.export_json.as_deref() {
        crate::storage::export_json(path, &snapshot)?;
        tracing::info!(path = %path.display(), "exported snapshot");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        let summary = crate::text_summary::build_text_summary(&snapshot)?;
        for line in summary.lines {
            println!("{line}");
        }
    }

    match snapshot.error {
        Some(err) => Err(anyhow::anyhow!("{:?}: {}", err.kind, err.message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["agent-diagnosis-cli", "--text"]).unwrap();
        assert_eq!(cli.mode, Mode::New);
        assert!(!cli.is_interactive());
        let cfg = build_config(&cli);
        assert_eq!(cfg.timeout, Duration::from_secs(300));
        assert!(cfg.user_agent.starts_with("agent-diagnosis-cli/"));
    }

    #[test]
    fn parses_resume_request() {
        let cli = Cli::try_parse_from([
            "agent-diagnosis-cli",
            "--json",
            "--mode",
            "resume",
            "--thread-id",
            "t-1",
            "--timeout",
            "2m",
            "--base-url",
            "http://backend:9000/api",
        ])
        .unwrap();
        assert_eq!(cli.mode, Mode::Resume);
        assert_eq!(cli.thread_id, "t-1");
        let cfg = build_config(&cli);
        assert_eq!(cfg.timeout, Duration::from_secs(120));
        assert_eq!(cfg.base_url, "http://backend:9000/api");
    }

    #[test]
    fn json_and_text_conflict() {
        assert!(Cli::try_parse_from(["agent-diagnosis-cli", "--json", "--text"]).is_err());
    }
}
