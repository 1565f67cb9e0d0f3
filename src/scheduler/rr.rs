use super::{Policy, run_slice};
use crate::{
    core::{JobState, RunTotals, Seconds, Session, SliceEnd},
    error::SchedError,
    exec::Executor,
};

/// Preemptive round-robin with a fixed quantum.
///
/// The first pass dispatches every job in arrival order. Later passes sweep
/// the tracked jobs for STOPPED ones and give each another slice. The run ends
/// when every tracked job has exited, counted per job rather than by queue
/// emptiness.
pub struct RoundRobin {
    quantum: Seconds,
}

impl RoundRobin {
    pub fn new(quantum: Seconds) -> Self {
        Self { quantum }
    }
}

impl Policy for RoundRobin {
    fn run<E: Executor>(&mut self, session: &mut Session<'_, E>) -> Result<RunTotals, SchedError> {
        let tracked = session.queue().keys();
        let mut exited = 0;

        for &key in &tracked {
            if run_slice(session, key, self.quantum)? == SliceEnd::Completed {
                exited += 1;
            }
        }

        while exited < tracked.len() {
            let mut resumed = false;
            for &key in &tracked {
                if session.state_of(key) != Some(JobState::Stopped) {
                    continue;
                }
                resumed = true;
                if run_slice(session, key, self.quantum)? == SliceEnd::Completed {
                    exited += 1;
                }
            }
            if !resumed {
                return Err(SchedError::Protocol(format!(
                    "{} of {} jobs unfinished but none is stopped",
                    tracked.len() - exited,
                    tracked.len()
                )));
            }
        }

        Ok(session.totals())
    }
}
