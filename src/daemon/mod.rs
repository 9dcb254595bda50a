mod reconciler;
mod service;

pub use reconciler::{CycleOutcome, Reconciler};
pub use service::{run, run_loop};
