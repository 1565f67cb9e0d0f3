use super::{Policy, run_to_completion};
use crate::{
    core::{RunTotals, Session},
    error::SchedError,
    exec::Executor,
};

/// First-come-first-served: arrival order, each job runs its full burst.
pub struct Fcfs;

impl Policy for Fcfs {
    fn run<E: Executor>(&mut self, session: &mut Session<'_, E>) -> Result<RunTotals, SchedError> {
        for key in session.queue().keys() {
            run_to_completion(session, key)?;
        }
        Ok(session.totals())
    }
}
