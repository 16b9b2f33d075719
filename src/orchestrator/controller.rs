//! Interactive session controller.
//!
//! Owns the workflow state machine, executes the calls it asks for and publishes
//! snapshots for presentation layers.

use crate::model::{ClientEvent, Mode};
use crate::transport::{Transport, TransportError};
use crate::workflow::{PendingCall, Rejection, Ticket, Workflow};
use anyhow::Result;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant};

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum UiCommand {
    SwitchMode(Mode),
    SetQuery(String),
    SetThreadId(String),
    StartRun,
    ResumeRun,
    RefreshSessions,
    Quit,
}

type Completed = (Ticket, Result<serde_json::Value, TransportError>);

fn spawn_call(in_flight: &mut JoinSet<Completed>, transport: &Arc<dyn Transport>, call: PendingCall) {
    let transport = Arc::clone(transport);
    in_flight.spawn(async move {
        let PendingCall {
            ticket,
            operation,
            params,
        } = call;
        let outcome = AssertUnwindSafe(transport.call(operation, &params))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(TransportError::network(operation, "transport task panicked")));
        (ticket, outcome)
    });
}

fn publish(event_tx: &UnboundedSender<ClientEvent>, workflow: &Workflow) {
    let _ = event_tx.send(ClientEvent::Snapshot(Box::new(workflow.snapshot())));
}

fn reject(event_tx: &UnboundedSender<ClientEvent>, rejection: Rejection) {
    tracing::debug!(%rejection, "action rejected");
    let _ = event_tx.send(ClientEvent::Info(rejection.to_string()));
}

/// Drive the workflow from UI commands until `Quit` or the command channel closes.
pub(crate) async fn run_controller(
    transport: Arc<dyn Transport>,
    initial_query: String,
    event_tx: UnboundedSender<ClientEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut workflow = Workflow::new(initial_query);
    let mut in_flight: JoinSet<Completed> = JoinSet::new();
    let mut busy_since: Option<Instant> = None;
    // While a run is in flight, keep the operator informed about elapsed time.
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    publish(&event_tx, &workflow);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::SwitchMode(mode)) => {
                        // Everything in flight belongs to the old mode.
                        in_flight.abort_all();
                        busy_since = None;
                        if let Some(call) = workflow.switch_mode(mode) {
                            spawn_call(&mut in_flight, &transport, call);
                        }
                        let _ = event_tx.send(ClientEvent::Info(mode.label().to_string()));
                    }
                    Some(UiCommand::SetQuery(text)) => workflow.set_query_input(text),
                    Some(UiCommand::SetThreadId(text)) => workflow.set_thread_input(text),
                    Some(UiCommand::StartRun) => {
                        let query = workflow.query_input().to_string();
                        match workflow.start_run(&query) {
                            Ok(call) => {
                                busy_since = Some(Instant::now());
                                spawn_call(&mut in_flight, &transport, call);
                            }
                            Err(rejection) => reject(&event_tx, rejection),
                        }
                    }
                    Some(UiCommand::ResumeRun) => {
                        let thread_id = workflow.thread_input().to_string();
                        match workflow.resume_run(&thread_id) {
                            Ok(call) => {
                                busy_since = Some(Instant::now());
                                spawn_call(&mut in_flight, &transport, call);
                            }
                            Err(rejection) => reject(&event_tx, rejection),
                        }
                    }
                    Some(UiCommand::RefreshSessions) => match workflow.refresh_sessions() {
                        Ok(call) => spawn_call(&mut in_flight, &transport, call),
                        Err(rejection) => reject(&event_tx, rejection),
                    },
                    Some(UiCommand::Quit) | None => {
                        in_flight.abort_all();
                        break;
                    }
                }
                publish(&event_tx, &workflow);
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                match joined {
                    Ok((ticket, outcome)) => {
                        if let Some(follow_up) = workflow.complete(ticket, outcome) {
                            spawn_call(&mut in_flight, &transport, follow_up);
                        }
                        if !workflow.is_busy() {
                            busy_since = None;
                        }
                        publish(&event_tx, &workflow);
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => tracing::error!(error = %e, "backend call task failed"),
                }
            }
            _ = ticker.tick() => {
                if let Some(since) = busy_since {
                    let _ = event_tx.send(ClientEvent::Info(format!(
                        "Processing... The agent is thinking... ({}s)",
                        since.elapsed().as_secs()
                    )));
                }
            }
        }
    }

    Ok(())
}
