//! The churn state machine.
//!
//! ## Structure
//!
//! - [`window`] - [`Window`], the per-worker rotation of live names.
//! - [`worker`] - [`ChurnWorker`], the delete-then-create step loop and its
//!   teardown.

pub mod window;
pub mod worker;

pub use window::Window;
pub use worker::{ChurnWorker, ExitReason, WorkerReport, WorkerState};
