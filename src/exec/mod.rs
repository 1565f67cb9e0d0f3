//! Execution unit: creates the subordinate that stands in for a job on the
//! CPU and reports its lifecycle changes back to the controller.

pub mod fork;
pub mod sim;

use crate::{
    core::{Handle, LifecycleEvent, Seconds},
    error::SchedError,
};
pub use fork::{ForkExecutor, Forked, fork_subordinate};
pub use sim::{SimCommand, SimExecutor};

/// The work a subordinate performs.
///
/// The burst is consumed in slices of `min(quantum, remaining)` seconds. Every
/// slice but the last ends with the subordinate stopping itself, which the
/// controller sees as [`LifecycleEvent::Stopped`]; the last ends with a normal
/// exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    pub burst: Seconds,
    /// `None` runs the whole burst in one slice.
    pub quantum: Option<Seconds>,
}

impl Workload {
    pub fn run_to_completion(burst: Seconds) -> Self {
        Self {
            burst,
            quantum: None,
        }
    }

    pub fn sliced(burst: Seconds, quantum: Seconds) -> Self {
        Self {
            burst,
            quantum: Some(quantum),
        }
    }

    pub(crate) fn next_slice(&self, remaining: Seconds) -> Seconds {
        match self.quantum {
            Some(q) => q.min(remaining),
            None => remaining,
        }
    }
}

pub trait Executor {
    /// Start a subordinate running `work`. The controller does not block.
    fn spawn(&mut self, name: &str, work: &Workload) -> Result<Handle, SchedError>;

    /// Block until the subordinate changes state and classify the change.
    fn next_event(&mut self, handle: Handle) -> Result<LifecycleEvent, SchedError>;

    /// Let a stopped subordinate run its next slice.
    fn resume(&mut self, handle: Handle) -> Result<(), SchedError>;

    /// Kill and reap a subordinate. Used when a run is abandoned.
    fn terminate(&mut self, handle: Handle) -> Result<(), SchedError>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn spawn(&mut self, name: &str, work: &Workload) -> Result<Handle, SchedError> {
        (**self).spawn(name, work)
    }

    fn next_event(&mut self, handle: Handle) -> Result<LifecycleEvent, SchedError> {
        (**self).next_event(handle)
    }

    fn resume(&mut self, handle: Handle) -> Result<(), SchedError> {
        (**self).resume(handle)
    }

    fn terminate(&mut self, handle: Handle) -> Result<(), SchedError> {
        (**self).terminate(handle)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn spawn(&mut self, name: &str, work: &Workload) -> Result<Handle, SchedError> {
        (**self).spawn(name, work)
    }

    fn next_event(&mut self, handle: Handle) -> Result<LifecycleEvent, SchedError> {
        (**self).next_event(handle)
    }

    fn resume(&mut self, handle: Handle) -> Result<(), SchedError> {
        (**self).resume(handle)
    }

    fn terminate(&mut self, handle: Handle) -> Result<(), SchedError> {
        (**self).terminate(handle)
    }
}
