use log::{debug, info, warn};
use slotmap::SecondaryMap;

use super::{
    event::{LifecycleEvent, SliceEnd},
    observer::{ExitListener, Observer},
    state::{Handle, Job, JobKey, JobQueue, JobState, Seconds},
};
use crate::{
    error::SchedError,
    exec::{Executor, Workload},
};

/// How a dispatched job's timing statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accounting {
    /// Non-preemptive: one slice covering the whole burst.
    RunToCompletion,
    /// Preemptive: slices of at most `quantum` seconds.
    Sliced { quantum: Seconds },
}

impl Accounting {
    fn quantum(&self) -> Option<Seconds> {
        match self {
            Accounting::RunToCompletion => None,
            Accounting::Sliced { quantum } => Some(*quantum),
        }
    }
}

/// Totals over the jobs that reached EXITED.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub waiting: Seconds,
    pub turnaround: Seconds,
    pub completed: usize,
}

impl RunTotals {
    fn add(&self, job: &Job) -> Option<Self> {
        Some(Self {
            waiting: self.waiting.checked_add(job.waiting.unwrap_or_default())?,
            turnaround: self
                .turnaround
                .checked_add(job.turnaround.unwrap_or_default())?,
            completed: self.completed + 1,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Active {
    key: JobKey,
    handle: Handle,
    slice: Seconds,
    accounting: Accounting,
}

/// One scheduling run: owns the queue, the execution unit and the single
/// current-job slot.
///
/// Subordinate state changes are consumed explicitly through
/// [`Session::await_slice`], which applies the completion and suspend
/// notifications; [`Session::resume`] applies the resume notification.
/// At most one job occupies the slot, so a new dispatch or resume is refused
/// until the previous slice has been resolved.
pub struct Session<'a, E: Executor> {
    queue: JobQueue,
    executor: E,
    listener: &'a mut dyn ExitListener,
    observer: Observer,
    plans: SecondaryMap<JobKey, Accounting>,
    current: Option<Active>,
    clock: Seconds,
    totals: RunTotals,
    finished: Vec<Job>,
}

impl<'a, E: Executor> Session<'a, E> {
    pub fn new(queue: JobQueue, executor: E, listener: &'a mut dyn ExitListener) -> Self {
        Self {
            queue,
            executor,
            listener,
            observer: Observer::new(),
            plans: SecondaryMap::new(),
            current: None,
            clock: 0,
            totals: RunTotals::default(),
            finished: Vec::new(),
        }
    }

    pub fn clock(&self) -> Seconds {
        self.clock
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn totals(&self) -> RunTotals {
        self.totals
    }

    /// Jobs that reached EXITED, in completion order.
    pub fn finished(&self) -> &[Job] {
        &self.finished
    }

    pub fn current(&self) -> Option<JobKey> {
        self.current.map(|a| a.key)
    }

    pub fn state_of(&self, key: JobKey) -> Option<JobState> {
        match self.queue.get(key) {
            Some(job) => Some(job.state),
            // Completed jobs leave the queue
            None if self.plans.contains_key(key) => Some(JobState::Exited),
            None => None,
        }
    }

    pub fn into_parts(self) -> (E, Vec<Job>, RunTotals) {
        (self.executor, self.finished, self.totals)
    }

    /// Spawn a READY job. Its start time is the current clock.
    pub fn dispatch(&mut self, key: JobKey, accounting: Accounting) -> Result<Handle, SchedError> {
        self.ensure_idle("dispatch")?;
        if accounting == (Accounting::Sliced { quantum: 0 }) {
            return Err(SchedError::Protocol("quantum must be positive".into()));
        }
        let job = self.job(key)?;
        if job.state != JobState::Ready {
            return Err(SchedError::Protocol(format!(
                "cannot dispatch job {} in state {}",
                job.name, job.state
            )));
        }
        let quantum = accounting.quantum();
        let work = Workload {
            burst: job.remaining,
            quantum,
        };
        let slice = job.execution_time(quantum);
        let name = job.name.clone();

        let handle = self.executor.spawn(&name, &work)?;
        self.queue.assign_handle(key, handle)?;
        self.plans.insert(key, accounting);

        let clock = self.clock;
        let job = self.job_mut(key)?;
        job.start_time = Some(clock);
        job.state = JobState::Running;
        info!("Dispatched {name} as {handle} at t={clock}s for {slice}s");

        self.current = Some(Active {
            key,
            handle,
            slice,
            accounting,
        });
        self.observer.observe(&self.queue, self.current());
        Ok(handle)
    }

    /// Continue a STOPPED job for its next slice.
    pub fn resume(&mut self, key: JobKey) -> Result<(), SchedError> {
        self.ensure_idle("resume")?;
        let job = self.job(key)?;
        if job.state != JobState::Stopped {
            return Err(SchedError::Protocol(format!(
                "cannot resume job {} in state {}",
                job.name, job.state
            )));
        }
        let handle = job.handle.ok_or_else(|| {
            SchedError::Protocol(format!("stopped job {} has no handle", job.name))
        })?;
        let accounting = self
            .plans
            .get(key)
            .copied()
            .unwrap_or(Accounting::RunToCompletion);
        let slice = job.execution_time(accounting.quantum());

        self.executor.resume(handle)?;

        // Resume notification
        let clock = self.clock;
        let job = self.job_mut(key)?;
        job.state = JobState::Running;
        info!("Process {handle} ({}) resumed at t={clock}s for {slice}s", job.name);

        self.current = Some(Active {
            key,
            handle,
            slice,
            accounting,
        });
        self.observer.observe(&self.queue, self.current());
        Ok(())
    }

    /// Block until the current job's slice ends, then apply the matching
    /// notification.
    pub fn await_slice(&mut self) -> Result<SliceEnd, SchedError> {
        let active = self
            .current
            .ok_or_else(|| SchedError::Protocol("no job is running".into()))?;

        loop {
            let event = self.executor.next_event(active.handle)?;
            match event {
                LifecycleEvent::Continued => {
                    debug!("Resume of {} confirmed", active.handle);
                }
                LifecycleEvent::Stopped(sig)
                    if active.accounting == Accounting::RunToCompletion =>
                {
                    // Stopped from outside; a non-preemptive job just keeps going
                    warn!(
                        "Process {} stopped by signal {sig} during a full burst, continuing it",
                        active.handle
                    );
                    self.executor.resume(active.handle)?;
                }
                LifecycleEvent::Stopped(_) => return self.suspended(active),
                LifecycleEvent::Exited(0) => return self.completed(active),
                outcome => {
                    self.current = None;
                    let name = self.job(active.key)?.name.clone();
                    return Err(SchedError::Subordinate { name, outcome });
                }
            }
        }
    }

    /// Kill every subordinate still alive. Used when a run is abandoned.
    pub fn abandon(&mut self) {
        self.current = None;
        let handles: Vec<Handle> = self
            .queue
            .scan()
            .filter(|(_, job)| job.is_live())
            .filter_map(|(_, job)| job.handle)
            .collect();
        for handle in handles {
            if let Err(e) = self.executor.terminate(handle) {
                warn!("{e}");
            }
        }
    }

    // Suspend notification
    fn suspended(&mut self, active: Active) -> Result<SliceEnd, SchedError> {
        self.current = None;
        self.account(active)?;
        let job = self.job_mut(active.key)?;
        if job.remaining == 0 {
            return Err(SchedError::Protocol(format!(
                "job {} stopped with no burst left",
                job.name
            )));
        }
        if job.state == JobState::Running {
            job.state = JobState::Stopped;
            info!(
                "Process {} ({}) stopped at t={}s, {}s left",
                active.handle,
                job.name,
                job.end_time.unwrap_or_default(),
                job.remaining
            );
        } else {
            warn!(
                "Ignoring stop of {} ({}) which was never running",
                active.handle, job.name
            );
        }
        self.observer.observe(&self.queue, self.current());
        Ok(SliceEnd::Preempted)
    }

    // Completion notification
    fn completed(&mut self, active: Active) -> Result<SliceEnd, SchedError> {
        self.current = None;
        self.account(active)?;
        let job = self.job_mut(active.key)?;
        if job.remaining != 0 {
            return Err(SchedError::Protocol(format!(
                "job {} exited with {}s of burst left",
                job.name, job.remaining
            )));
        }
        job.state = JobState::Exited;
        info!("Process {} ({}) has terminated", active.handle, job.name);

        let job = match self.queue.remove_by_handle(active.handle) {
            Some(job) => job,
            None => self.job(active.key)?.clone(),
        };
        self.totals = self.totals.add(&job).ok_or_else(|| {
            SchedError::Protocol(format!("run totals overflow at job {}", job.name))
        })?;
        self.observer.observe_exit(&job);
        self.listener.job_exited(&job)?;
        self.finished.push(job);
        self.observer.observe(&self.queue, self.current());
        Ok(SliceEnd::Completed)
    }

    fn account(&mut self, active: Active) -> Result<(), SchedError> {
        let clock = self.clock;
        // Every end time is at most the advanced clock
        let advanced = clock.checked_add(active.slice).ok_or_else(|| {
            SchedError::Protocol(format!(
                "simulated clock overflows: {clock}s + {}s",
                active.slice
            ))
        })?;
        let job = self.job_mut(active.key)?;
        match active.accounting {
            Accounting::RunToCompletion => job.record_run_to_completion(),
            Accounting::Sliced { .. } => job.record_slice(clock, active.slice),
        }
        self.clock = advanced;
        Ok(())
    }

    fn ensure_idle(&self, what: &str) -> Result<(), SchedError> {
        match self.current {
            Some(active) => Err(SchedError::Protocol(format!(
                "cannot {what} while {} is running",
                active.handle
            ))),
            None => Ok(()),
        }
    }

    fn job(&self, key: JobKey) -> Result<&Job, SchedError> {
        self.queue
            .get(key)
            .ok_or_else(|| SchedError::Protocol(format!("job {key:?} is not queued")))
    }

    fn job_mut(&mut self, key: JobKey) -> Result<&mut Job, SchedError> {
        self.queue
            .get_mut(key)
            .ok_or_else(|| SchedError::Protocol(format!("job {key:?} is not queued")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::SimExecutor;

    fn session<'a>(jobs: &[(&str, Seconds)], exited: &'a mut Vec<Job>) -> Session<'a, SimExecutor> {
        let queue = jobs
            .iter()
            .enumerate()
            .map(|(i, (name, burst))| Job::new(*name, i, 0, *burst))
            .collect();
        Session::new(queue, SimExecutor::new(), exited)
    }

    #[test]
    fn full_burst_completes_and_leaves_queue() {
        let mut exited = Vec::new();
        let mut s = session(&[("A", 5)], &mut exited);
        let key = s.queue().keys()[0];

        s.dispatch(key, Accounting::RunToCompletion).unwrap();
        assert_eq!(s.state_of(key), Some(JobState::Running));
        assert_eq!(s.await_slice().unwrap(), SliceEnd::Completed);

        assert!(s.queue().is_empty());
        assert_eq!(s.state_of(key), Some(JobState::Exited));
        assert_eq!(s.clock(), 5);
        assert_eq!(s.totals().completed, 1);
        drop(s);
        assert_eq!(exited.len(), 1);
        assert_eq!(exited[0].turnaround, Some(5));
    }

    #[test]
    fn second_dispatch_while_running_is_refused() {
        let mut exited = Vec::new();
        let mut s = session(&[("A", 5), ("B", 3)], &mut exited);
        let keys = s.queue().keys();
        s.dispatch(keys[0], Accounting::RunToCompletion).unwrap();
        assert!(matches!(
            s.dispatch(keys[1], Accounting::RunToCompletion),
            Err(SchedError::Protocol(_))
        ));
    }

    #[test]
    fn resume_requires_stopped_job() {
        let mut exited = Vec::new();
        let mut s = session(&[("A", 5)], &mut exited);
        let key = s.queue().keys()[0];
        assert!(matches!(s.resume(key), Err(SchedError::Protocol(_))));

        s.dispatch(key, Accounting::Sliced { quantum: 2 }).unwrap();
        assert_eq!(s.await_slice().unwrap(), SliceEnd::Preempted);
        assert_eq!(s.state_of(key), Some(JobState::Stopped));
        s.resume(key).unwrap();
        assert_eq!(s.state_of(key), Some(JobState::Running));
    }

    #[test]
    fn await_without_running_job_is_refused() {
        let mut exited = Vec::new();
        let mut s = session(&[("A", 1)], &mut exited);
        assert!(matches!(s.await_slice(), Err(SchedError::Protocol(_))));
    }

    #[test]
    fn crashed_subordinate_is_fatal() {
        let mut exited: Vec<Job> = Vec::new();
        let queue: JobQueue = [Job::new("A", 0, 0, 2)].into_iter().collect();
        let mut s = Session::new(queue, SimExecutor::new().with_crash(0), &mut exited);
        let key = s.queue().keys()[0];
        s.dispatch(key, Accounting::RunToCompletion).unwrap();
        match s.await_slice() {
            Err(SchedError::Subordinate { name, outcome }) => {
                assert_eq!(name, "A");
                assert!(matches!(outcome, LifecycleEvent::Signaled(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(s.current().is_none());
    }
}
