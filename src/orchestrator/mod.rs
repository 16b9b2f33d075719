//! Application-level orchestration.
//!
//! Connects the workflow state machine to a transport: an interactive controller
//! for the TUI and a sequential driver for one-shot output modes.

#[cfg(any(feature = "tui", test))]
mod controller;
mod oneshot;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use oneshot::{run_once, ActionRequest};
