use std::io;

use rustc_hash::FxHashMap;

use super::{Executor, Workload};
use crate::{
    core::{Handle, LifecycleEvent, Seconds},
    error::SchedError,
};

const FIRST_HANDLE: i32 = 1000;

/// Command received by the in-process executor, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCommand {
    Spawn { name: String, handle: Handle },
    Resume { handle: Handle },
    Terminate { handle: Handle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubState {
    Running,
    // SIGCONT delivered, continuation not yet reported
    Resumed,
    Stopped,
    Gone,
}

#[derive(Debug)]
struct Subordinate {
    work: Workload,
    remaining: Seconds,
    state: SubState,
    crash: bool,
}

/// Deterministic stand-in for real processes.
///
/// Follows the same slice discipline as a forked subordinate without creating
/// processes or sleeping, and records every command it receives.
#[derive(Debug)]
pub struct SimExecutor {
    subs: FxHashMap<Handle, Subordinate>,
    next_handle: i32,
    spawned: usize,
    fail_spawn_at: Option<usize>,
    crash_at: Option<usize>,
    trace: Vec<SimCommand>,
}

impl Default for SimExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SimExecutor {
    pub fn new() -> Self {
        Self {
            subs: FxHashMap::default(),
            next_handle: FIRST_HANDLE,
            spawned: 0,
            fail_spawn_at: None,
            crash_at: None,
            trace: Vec::new(),
        }
    }

    /// Make the `n`th spawn (0-based) fail as if the process table were full.
    pub fn with_spawn_failure(mut self, n: usize) -> Self {
        self.fail_spawn_at = Some(n);
        self
    }

    /// Make the `n`th spawned subordinate (0-based) die from SIGKILL.
    pub fn with_crash(mut self, n: usize) -> Self {
        self.crash_at = Some(n);
        self
    }

    pub fn trace(&self) -> &[SimCommand] {
        &self.trace
    }

    /// Handles of spawned and resumed subordinates, in dispatch order.
    pub fn dispatch_order(&self) -> Vec<Handle> {
        self.trace
            .iter()
            .filter_map(|cmd| match cmd {
                SimCommand::Spawn { handle, .. } | SimCommand::Resume { handle } => Some(*handle),
                SimCommand::Terminate { .. } => None,
            })
            .collect()
    }

    pub fn live(&self) -> usize {
        self.subs
            .values()
            .filter(|s| s.state != SubState::Gone)
            .count()
    }

    fn sub_mut(&mut self, handle: Handle) -> Result<&mut Subordinate, SchedError> {
        self.subs.get_mut(&handle).ok_or_else(|| SchedError::Wait {
            handle,
            source: io::Error::from_raw_os_error(libc::ECHILD),
        })
    }
}

impl Executor for SimExecutor {
    fn spawn(&mut self, name: &str, work: &Workload) -> Result<Handle, SchedError> {
        if work.quantum == Some(0) {
            return Err(SchedError::Protocol(format!(
                "job {name} dispatched with a zero quantum"
            )));
        }
        let index = self.spawned;
        self.spawned += 1;
        if self.fail_spawn_at == Some(index) {
            return Err(SchedError::Spawn {
                name: name.to_string(),
                source: io::Error::from_raw_os_error(libc::EAGAIN),
            });
        }

        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.subs.insert(
            handle,
            Subordinate {
                work: *work,
                remaining: work.burst,
                state: SubState::Running,
                crash: self.crash_at == Some(index),
            },
        );
        self.trace.push(SimCommand::Spawn {
            name: name.to_string(),
            handle,
        });
        Ok(handle)
    }

    fn next_event(&mut self, handle: Handle) -> Result<LifecycleEvent, SchedError> {
        let sub = self.sub_mut(handle)?;
        match sub.state {
            SubState::Gone => Err(SchedError::Wait {
                handle,
                source: io::Error::from_raw_os_error(libc::ECHILD),
            }),
            SubState::Stopped => Err(SchedError::Protocol(format!(
                "waiting on stopped subordinate {handle} would block forever"
            ))),
            SubState::Resumed => {
                sub.state = SubState::Running;
                Ok(LifecycleEvent::Continued)
            }
            SubState::Running if sub.crash => {
                sub.state = SubState::Gone;
                Ok(LifecycleEvent::Signaled(libc::SIGKILL))
            }
            SubState::Running => {
                let slice = sub.work.next_slice(sub.remaining);
                sub.remaining -= slice;
                if sub.remaining == 0 {
                    sub.state = SubState::Gone;
                    Ok(LifecycleEvent::Exited(0))
                } else {
                    sub.state = SubState::Stopped;
                    Ok(LifecycleEvent::Stopped(libc::SIGSTOP))
                }
            }
        }
    }

    fn resume(&mut self, handle: Handle) -> Result<(), SchedError> {
        let sub = self.sub_mut(handle)?;
        if sub.state == SubState::Gone {
            return Err(SchedError::Signal {
                handle,
                signal: libc::SIGCONT,
                source: io::Error::from_raw_os_error(libc::ESRCH),
            });
        }
        if sub.state == SubState::Stopped {
            sub.state = SubState::Resumed;
        }
        self.trace.push(SimCommand::Resume { handle });
        Ok(())
    }

    fn terminate(&mut self, handle: Handle) -> Result<(), SchedError> {
        let sub = self.sub_mut(handle)?;
        sub.state = SubState::Gone;
        self.trace.push(SimCommand::Terminate { handle });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliced_subordinate_stops_between_slices() {
        let mut exec = SimExecutor::new();
        let h = exec.spawn("A", &Workload::sliced(5, 2)).unwrap();

        assert_eq!(exec.next_event(h).unwrap(), LifecycleEvent::Stopped(libc::SIGSTOP));
        exec.resume(h).unwrap();
        assert_eq!(exec.next_event(h).unwrap(), LifecycleEvent::Continued);
        assert_eq!(exec.next_event(h).unwrap(), LifecycleEvent::Stopped(libc::SIGSTOP));
        exec.resume(h).unwrap();
        assert_eq!(exec.next_event(h).unwrap(), LifecycleEvent::Continued);
        assert_eq!(exec.next_event(h).unwrap(), LifecycleEvent::Exited(0));
        assert_eq!(exec.live(), 0);
    }

    #[test]
    fn waiting_on_a_stopped_subordinate_is_refused() {
        let mut exec = SimExecutor::new();
        let h = exec.spawn("A", &Workload::sliced(5, 2)).unwrap();
        exec.next_event(h).unwrap();
        assert!(matches!(exec.next_event(h), Err(SchedError::Protocol(_))));
    }

    #[test]
    fn injected_spawn_failure() {
        let mut exec = SimExecutor::new().with_spawn_failure(1);
        assert!(exec.spawn("A", &Workload::run_to_completion(1)).is_ok());
        assert!(matches!(
            exec.spawn("B", &Workload::run_to_completion(1)),
            Err(SchedError::Spawn { .. })
        ));
    }

    #[test]
    fn handles_are_distinct() {
        let mut exec = SimExecutor::new();
        let a = exec.spawn("A", &Workload::run_to_completion(1)).unwrap();
        let b = exec.spawn("B", &Workload::run_to_completion(1)).unwrap();
        assert_ne!(a, b);
    }
}
