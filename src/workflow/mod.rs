//! Session workflow state machine.
//!
//! The workflow never performs I/O. Actions return a `PendingCall` describing the
//! backend request to make; the caller executes it and hands the outcome back to
//! `complete` together with the call's `Ticket`. Tickets carry the mode epoch so
//! responses that arrive after a mode switch are dropped, and a sequence number so
//! only the latest session load and documents fetch are applied.

mod documents;

use crate::model::{Mode, RunDocumentMap, SessionSummary, WorkflowResult};
use crate::transport::{ErrorKind, Operation, Params, TransportError, QUERY_PARAM, THREAD_ID_PARAM};
use documents::DocumentFetchRule;
use serde::Serialize;
use thiserror::Error;

/// An action the workflow refused. State is left untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("{action} is not available in {} mode", mode.label())]
    WrongMode { action: &'static str, mode: Mode },
    #[error("a run is already in progress")]
    Busy,
    #[error("thread id is required")]
    EmptyThreadId,
    #[error("query text is required")]
    EmptyQuery,
}

impl Rejection {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ValidationError
    }
}

/// A failed call, recorded in the workflow for display.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{operation}: unexpected response shape: {reason}")]
    UnexpectedShape { operation: Operation, reason: String },
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(e) => e.kind(),
            ClientError::UnexpectedShape { .. } => ErrorKind::ProtocolViolation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Purpose {
    Run { fresh: bool },
    Sessions,
    Documents { thread_id: String },
}

/// Identifies an issued call when its outcome comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    seq: u64,
    purpose: Purpose,
}

/// A backend request the workflow wants executed.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub ticket: Ticket,
    pub operation: Operation,
    pub params: Params,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

/// Read-only view of the workflow for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub busy: bool,
    pub query_input: String,
    pub thread_input: String,
    pub result: Option<WorkflowResult>,
    pub sessions: Option<Vec<SessionSummary>>,
    pub sessions_loading: bool,
    pub documents: Option<RunDocumentMap>,
    pub documents_pending: bool,
    pub error: Option<ErrorReport>,
}

#[derive(Debug)]
pub struct Workflow {
    mode: Mode,
    epoch: u64,
    next_seq: u64,
    busy: bool,
    query_input: String,
    thread_input: String,
    result: Option<WorkflowResult>,
    sessions: Option<Vec<SessionSummary>>,
    sessions_loading: bool,
    latest_sessions: Option<u64>,
    documents: Option<RunDocumentMap>,
    documents_pending: bool,
    latest_documents: Option<u64>,
    fetch_rule: DocumentFetchRule,
    last_error: Option<ClientError>,
}

impl Workflow {
    pub fn new(initial_query: impl Into<String>) -> Self {
        Self {
            mode: Mode::New,
            epoch: 0,
            next_seq: 0,
            busy: false,
            query_input: initial_query.into(),
            thread_input: String::new(),
            result: None,
            sessions: None,
            sessions_loading: false,
            latest_sessions: None,
            documents: None,
            documents_pending: false,
            latest_documents: None,
            fetch_rule: DocumentFetchRule::default(),
            last_error: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn result(&self) -> Option<&WorkflowResult> {
        self.result.as_ref()
    }

    pub fn sessions(&self) -> Option<&[SessionSummary]> {
        self.sessions.as_deref()
    }

    pub fn documents(&self) -> Option<&RunDocumentMap> {
        self.documents.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.last_error.as_ref()
    }

    pub fn query_input(&self) -> &str {
        &self.query_input
    }

    pub fn thread_input(&self) -> &str {
        &self.thread_input
    }

    pub fn set_query_input(&mut self, text: impl Into<String>) {
        self.query_input = text.into();
    }

    pub fn set_thread_input(&mut self, text: impl Into<String>) {
        self.thread_input = text.into();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode,
            busy: self.busy,
            query_input: self.query_input.clone(),
            thread_input: self.thread_input.clone(),
            result: self.result.clone(),
            sessions: self.sessions.clone(),
            sessions_loading: self.sessions_loading,
            documents: self.documents.clone(),
            documents_pending: self.documents_pending,
            error: self.last_error.as_ref().map(|e| ErrorReport {
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }

    /// Enter `mode`, discarding everything scoped to the previous one.
    ///
    /// Switching to the current mode still resets. Entering `List` returns the
    /// session load to perform.
    pub fn switch_mode(&mut self, mode: Mode) -> Option<PendingCall> {
        tracing::debug!(from = ?self.mode, to = ?mode, "switching mode");
        self.mode = mode;
        self.epoch += 1;
        self.busy = false;
        self.result = None;
        self.thread_input.clear();
        self.sessions = None;
        self.sessions_loading = false;
        self.latest_sessions = None;
        self.documents = None;
        self.documents_pending = false;
        self.latest_documents = None;
        self.fetch_rule.reset();
        self.last_error = None;

        if mode == Mode::List {
            Some(self.issue_sessions_load())
        } else {
            None
        }
    }

    pub fn start_run(&mut self, query: &str) -> Result<PendingCall, Rejection> {
        if self.mode != Mode::New {
            return Err(Rejection::WrongMode {
                action: "start run",
                mode: self.mode,
            });
        }
        if self.busy {
            return Err(Rejection::Busy);
        }
        if query.trim().is_empty() {
            return Err(Rejection::EmptyQuery);
        }

        self.busy = true;
        self.last_error = None;
        Ok(self.issue(
            Purpose::Run { fresh: true },
            Operation::StartRun,
            vec![(QUERY_PARAM, query.to_string())],
        ))
    }

    pub fn resume_run(&mut self, thread_id: &str) -> Result<PendingCall, Rejection> {
        if self.mode != Mode::Resume {
            return Err(Rejection::WrongMode {
                action: "resume run",
                mode: self.mode,
            });
        }
        let thread_id = thread_id.trim();
        if thread_id.is_empty() {
            return Err(Rejection::EmptyThreadId);
        }
        if self.busy {
            return Err(Rejection::Busy);
        }

        self.busy = true;
        self.last_error = None;
        Ok(self.issue(
            Purpose::Run { fresh: false },
            Operation::ResumeRun,
            vec![(THREAD_ID_PARAM, thread_id.to_string())],
        ))
    }

    /// Reload the session list while in `List` mode.
    pub fn refresh_sessions(&mut self) -> Result<PendingCall, Rejection> {
        if self.mode != Mode::List {
            return Err(Rejection::WrongMode {
                action: "refresh sessions",
                mode: self.mode,
            });
        }
        Ok(self.issue_sessions_load())
    }

    /// Evaluate the document fetch rule against the current result.
    ///
    /// Returns a call only the first time a given thread is observed. A result
    /// without a thread leaves the documents of the current run in place.
    pub fn observe(&mut self) -> Option<PendingCall> {
        let thread_id = self.result.as_ref().and_then(|r| r.addressable_thread())?;
        let thread_id = self.fetch_rule.observe(thread_id)?;

        tracing::debug!(%thread_id, "fetching run documents");
        self.documents = None;
        self.documents_pending = true;
        let call = self.issue(
            Purpose::Documents {
                thread_id: thread_id.clone(),
            },
            Operation::GetRunDocuments,
            vec![(THREAD_ID_PARAM, thread_id)],
        );
        self.latest_documents = Some(call.ticket.seq);
        Some(call)
    }

    /// Apply the outcome of a call issued earlier. Returns a follow-up call, if any.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<serde_json::Value, TransportError>,
    ) -> Option<PendingCall> {
        if ticket.epoch != self.epoch {
            tracing::debug!(?ticket, epoch = self.epoch, "discarding stale response");
            return None;
        }

        match ticket.purpose {
            Purpose::Run { fresh } => {
                self.busy = false;
                let operation = if fresh {
                    Operation::StartRun
                } else {
                    Operation::ResumeRun
                };
                match outcome.map_err(ClientError::from).and_then(|v| {
                    parse_shape::<WorkflowResult>(operation, v)
                }) {
                    Ok(result) => {
                        tracing::debug!(
                            updates = result.updates.len(),
                            thread_id = ?result.thread_id,
                            "run result received"
                        );
                        if fresh {
                            self.fetch_rule.reset();
                            self.documents = None;
                            self.documents_pending = false;
                            self.latest_documents = None;
                        }
                        self.result = Some(result);
                        self.observe()
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "run failed");
                        self.last_error = Some(e);
                        None
                    }
                }
            }
            Purpose::Sessions => {
                if self.latest_sessions != Some(ticket.seq) {
                    tracing::debug!(seq = ticket.seq, "discarding superseded session load");
                    return None;
                }
                self.latest_sessions = None;
                self.sessions_loading = false;
                match outcome
                    .map_err(ClientError::from)
                    .and_then(|v| parse_shape::<Vec<SessionSummary>>(Operation::ListSessions, v))
                {
                    Ok(sessions) => {
                        tracing::debug!(count = sessions.len(), "sessions loaded");
                        self.sessions = Some(sessions);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "session load failed");
                        self.last_error = Some(e);
                    }
                }
                None
            }
            Purpose::Documents { thread_id } => {
                if self.latest_documents != Some(ticket.seq) {
                    tracing::debug!(%thread_id, "discarding superseded documents response");
                    return None;
                }
                self.latest_documents = None;
                self.documents_pending = false;
                match outcome.map_err(ClientError::from).and_then(|v| {
                    parse_shape::<RunDocumentMap>(Operation::GetRunDocuments, v)
                }) {
                    Ok(docs) => {
                        tracing::debug!(%thread_id, collections = docs.len(), "run documents loaded");
                        self.documents = Some(docs);
                    }
                    Err(e) => {
                        tracing::warn!(%thread_id, error = %e, "run documents fetch failed");
                        self.last_error = Some(e);
                    }
                }
                None
            }
        }
    }

    fn issue_sessions_load(&mut self) -> PendingCall {
        self.sessions_loading = true;
        let call = self.issue(Purpose::Sessions, Operation::ListSessions, Vec::new());
        self.latest_sessions = Some(call.ticket.seq);
        call
    }

    fn issue(&mut self, purpose: Purpose, operation: Operation, params: Params) -> PendingCall {
        let seq = self.next_seq;
        self.next_seq += 1;
        PendingCall {
            ticket: Ticket {
                epoch: self.epoch,
                seq,
                purpose,
            },
            operation,
            params,
        }
    }
}

fn parse_shape<T: serde::de::DeserializeOwned>(
    operation: Operation,
    value: serde_json::Value,
) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::UnexpectedShape {
        operation,
        reason: e.to_string(),
    })
}
