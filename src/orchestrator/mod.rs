//! Application-level orchestration.
//!
//! This module owns the capture → validate → classify → present workflow: the state
//! machine, the preview it holds and the classification it runs. UI/CLI layers call into
//! this module and render the events it emits.

mod controller;

#[cfg_attr(not(feature = "tui"), allow(unused_imports))]
pub(crate) use controller::{run_workflow, UiCommand};
pub(crate) use controller::{Admission, WorkflowController};
