use log::{error, info};

use super::job::JobSpec;
use crate::{
    core::{ExitListener, JobQueue, Seconds, Session},
    error::SchedError,
    exec::Executor,
    report::RunReport,
    scheduler::PolicyKind,
};

/// One scheduling run of a policy over a job list.
#[derive(Debug, Clone, Copy)]
pub struct Sim {
    policy: PolicyKind,
    quantum: Option<Seconds>,
}

impl Sim {
    pub fn new(policy: PolicyKind, quantum: Option<Seconds>) -> Self {
        Self { policy, quantum }
    }

    /// Load `jobs` into a fresh queue (all READY, arrival order) and run the
    /// policy until every job has exited.
    ///
    /// Every exiting job is handed to `listener` as it exits. On a fatal
    /// error any subordinate still alive is killed before returning.
    pub fn run<E: Executor>(
        &self,
        jobs: Vec<JobSpec>,
        executor: E,
        listener: &mut dyn ExitListener,
    ) -> Result<RunReport, SchedError> {
        let accepted = jobs.len();
        let queue: JobQueue = jobs
            .into_iter()
            .enumerate()
            .map(|(arrival, spec)| spec.into_job(arrival))
            .collect();

        info!(
            "Running {} over {accepted} jobs{}",
            self.policy,
            self.quantum
                .map(|q| format!(" with a {q}s quantum"))
                .unwrap_or_default()
        );

        let mut session = Session::new(queue, executor, listener);
        let totals = match self.policy.run(self.quantum, &mut session) {
            Ok(totals) => totals,
            Err(e) => {
                error!("{} run aborted: {e}", self.policy);
                session.abandon();
                return Err(e);
            }
        };

        if totals.completed != accepted {
            return Err(SchedError::Protocol(format!(
                "{} of {accepted} jobs exited",
                totals.completed
            )));
        }

        let clock = session.clock();
        let (_, jobs, totals) = session.into_parts();
        Ok(RunReport {
            policy: self.policy,
            accepted,
            jobs,
            totals,
            clock,
        })
    }
}
