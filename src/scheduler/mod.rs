pub mod fcfs;
pub mod prio;
pub mod rr;
pub mod sjf;

use std::{fmt, str::FromStr};

use crate::{
    core::{Accounting, JobKey, JobState, RunTotals, Seconds, Session, SliceEnd},
    error::{ArgumentError, SchedError},
    exec::Executor,
};
pub use fcfs::Fcfs;
pub use prio::Priority;
pub use rr::RoundRobin;
pub use sjf::ShortestJobFirst;

/// A scheduling strategy: repeatedly picks the next job from the session's
/// queue and drives it through the execution unit until every job exits.
pub trait Policy {
    fn run<E: Executor>(&mut self, session: &mut Session<'_, E>) -> Result<RunTotals, SchedError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fcfs,
    Sjf,
    Rr,
    Prio,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Fcfs,
        PolicyKind::Sjf,
        PolicyKind::Rr,
        PolicyKind::Prio,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "FCFS",
            PolicyKind::Sjf => "SJF",
            PolicyKind::Rr => "RR",
            PolicyKind::Prio => "PRIO",
        }
    }

    pub fn is_preemptive(&self) -> bool {
        matches!(self, PolicyKind::Rr | PolicyKind::Prio)
    }

    /// Run this policy to completion over the session's queue.
    pub fn run<E: Executor>(
        self,
        quantum: Option<Seconds>,
        session: &mut Session<'_, E>,
    ) -> Result<RunTotals, SchedError> {
        match (self, quantum) {
            (PolicyKind::Fcfs, _) => Fcfs.run(session),
            (PolicyKind::Sjf, _) => ShortestJobFirst.run(session),
            (PolicyKind::Rr, Some(q)) => RoundRobin::new(q).run(session),
            (PolicyKind::Prio, Some(q)) => Priority::new(q).run(session),
            (kind, None) => Err(SchedError::Protocol(format!(
                "{} needs a quantum",
                kind.name()
            ))),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PolicyKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ArgumentError::UnknownPolicy(s.to_string()))
    }
}

/// Dispatch a READY job for its whole burst and block until it exits.
pub(crate) fn run_to_completion<E: Executor>(
    session: &mut Session<'_, E>,
    key: JobKey,
) -> Result<(), SchedError> {
    session.dispatch(key, Accounting::RunToCompletion)?;
    match session.await_slice()? {
        SliceEnd::Completed => Ok(()),
        SliceEnd::Preempted => Err(SchedError::Protocol(
            "non-preemptive job was preempted".into(),
        )),
    }
}

/// Give a READY or STOPPED job one slice of at most `quantum` seconds.
pub(crate) fn run_slice<E: Executor>(
    session: &mut Session<'_, E>,
    key: JobKey,
    quantum: Seconds,
) -> Result<SliceEnd, SchedError> {
    match session.state_of(key) {
        Some(JobState::Ready) => {
            session.dispatch(key, Accounting::Sliced { quantum })?;
        }
        Some(JobState::Stopped) => session.resume(key)?,
        state => {
            return Err(SchedError::Protocol(format!(
                "cannot give a slice to job {key:?} in state {state:?}"
            )))
        }
    }
    session.await_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!("FCFS".parse::<PolicyKind>(), Ok(PolicyKind::Fcfs));
        assert_eq!("PRIO".parse::<PolicyKind>(), Ok(PolicyKind::Prio));
        assert_eq!(
            "fcfs".parse::<PolicyKind>(),
            Err(ArgumentError::UnknownPolicy("fcfs".into()))
        );
    }

    #[test]
    fn only_slicing_policies_are_preemptive() {
        let preemptive: Vec<_> = PolicyKind::ALL
            .into_iter()
            .filter(PolicyKind::is_preemptive)
            .collect();
        assert_eq!(preemptive, [PolicyKind::Rr, PolicyKind::Prio]);
    }
}
