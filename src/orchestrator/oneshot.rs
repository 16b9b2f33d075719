//! Non-interactive driver used by `--json` and `--text`.

use crate::model::Mode;
use crate::transport::Transport;
use crate::workflow::{Rejection, Snapshot, Workflow};
use std::collections::VecDeque;

/// What a one-shot invocation should do.
#[derive(Debug, Clone)]
pub(crate) struct ActionRequest {
    pub mode: Mode,
    pub query: String,
    pub thread_id: String,
}

/// Perform `request` and every follow-up call it triggers, then return the final state.
pub(crate) async fn run_once(
    transport: &dyn Transport,
    request: &ActionRequest,
) -> Result<Snapshot, Rejection> {
    let mut workflow = Workflow::new(request.query.clone());
    let mut queue = VecDeque::new();

    queue.extend(workflow.switch_mode(request.mode));
    match request.mode {
        Mode::New => queue.push_back(workflow.start_run(&request.query)?),
        Mode::Resume => {
            workflow.set_thread_input(request.thread_id.clone());
            queue.push_back(workflow.resume_run(&request.thread_id)?);
        }
        Mode::List => {}
    }

    while let Some(call) = queue.pop_front() {
        tracing::info!(operation = %call.operation, "calling backend");
        let outcome = transport.call(call.operation, &call.params).await;
        queue.extend(workflow.complete(call.ticket, outcome));
    }

    Ok(workflow.snapshot())
}
