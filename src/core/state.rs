use log::warn;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{SlotMap, new_key_type};

use crate::error::SchedError;

/// Simulated seconds.
pub type Seconds = u64;

new_key_type! {
    pub struct JobKey;
}

/// Identifier of the subordinate process executing a job.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone, PartialOrd, Ord)]
pub struct Handle(pub i32);

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Ready,
    Running,
    Stopped,
    Exited,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Ready => "READY",
            JobState::Running => "RUNNING",
            JobState::Stopped => "STOPPED",
            JobState::Exited => "EXITED",
        };
        f.write_str(s)
    }
}

/// Job control block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    /// Position in the job list, used as the tie-breaker for every policy.
    pub arrival: usize,
    pub priority: i64,
    pub burst: Seconds,
    pub remaining: Seconds,
    pub handle: Option<Handle>,
    pub start_time: Option<Seconds>,
    pub end_time: Option<Seconds>,
    pub turnaround: Option<Seconds>,
    pub waiting: Option<Seconds>,
    pub state: JobState,
}

impl Job {
    pub fn new(name: impl Into<String>, arrival: usize, priority: i64, burst: Seconds) -> Self {
        Self {
            name: name.into(),
            arrival,
            priority,
            burst,
            remaining: burst,
            handle: None,
            start_time: None,
            end_time: None,
            turnaround: None,
            waiting: None,
            state: JobState::Ready,
        }
    }

    /// Length of the next slice under a quantum; `None` runs the rest of the burst.
    pub fn execution_time(&self, quantum: Option<Seconds>) -> Seconds {
        match quantum {
            Some(q) => q.min(self.remaining),
            None => self.remaining,
        }
    }

    /// Non-preemptive bookkeeping: the whole burst ran in one piece.
    pub fn record_run_to_completion(&mut self) {
        let start = self.start_time.unwrap_or(0);
        self.end_time = Some(start + self.burst);
        self.turnaround = Some(self.burst);
        self.waiting = Some(start);
        self.remaining = self.remaining.saturating_sub(self.burst);
    }

    /// Preemptive bookkeeping for one slice of `execution_time` that began at `clock`.
    pub fn record_slice(&mut self, clock: Seconds, execution_time: Seconds) {
        debug_assert!(
            execution_time <= self.remaining,
            "Slice of {execution_time}s exceeds remaining {}s of {}",
            self.remaining,
            self.name
        );
        let start = self.start_time.unwrap_or(clock);
        let end = clock + execution_time;
        let turnaround = end - start;
        self.end_time = Some(end);
        self.turnaround = Some(turnaround);
        self.waiting = Some(turnaround.saturating_sub(self.burst));
        self.remaining = self.remaining.saturating_sub(execution_time);
    }

    pub fn is_live(&self) -> bool {
        self.state != JobState::Exited
    }
}

/// Arrival-ordered collection of job control blocks.
///
/// Jobs live in an arena so removal by handle never invalidates other keys.
/// The arrival-order key list is compacted lazily; `scan` skips keys whose
/// job has already been removed.
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: SlotMap<JobKey, Job>,
    order: Vec<JobKey>,
    by_handle: FxHashMap<Handle, JobKey>,
    // Handles that were assigned at some point in this run
    retired: FxHashSet<Handle>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, job: Job) -> JobKey {
        let key = self.jobs.insert(job);
        self.order.push(key);
        key
    }

    /// Remove the job executed by `handle`. A missing handle is a protocol
    /// anomaly: it is logged and the queue is left untouched.
    pub fn remove_by_handle(&mut self, handle: Handle) -> Option<Job> {
        let Some(key) = self.by_handle.remove(&handle) else {
            warn!("{}", SchedError::QueueConsistency { handle });
            return None;
        };
        let job = self.jobs.remove(key);
        if job.is_none() {
            warn!("{}", SchedError::QueueConsistency { handle });
        }
        if self.order.len() > 2 * self.jobs.len() + 8 {
            let jobs = &self.jobs;
            self.order.retain(|k| jobs.contains_key(*k));
        }
        job
    }

    /// Bind a subordinate handle to a job. Handles are never reused within a run.
    pub fn assign_handle(&mut self, key: JobKey, handle: Handle) -> Result<(), SchedError> {
        if !self.retired.insert(handle) {
            return Err(SchedError::Protocol(format!(
                "handle {handle} was already assigned in this run"
            )));
        }
        let job = self.jobs.get_mut(key).ok_or_else(|| {
            SchedError::Protocol(format!("no queued job for key {key:?}"))
        })?;
        if let Some(previous) = job.handle {
            return Err(SchedError::Protocol(format!(
                "job {} already runs as {previous}",
                job.name
            )));
        }
        job.handle = Some(handle);
        self.by_handle.insert(handle, key);
        Ok(())
    }

    pub fn key_of(&self, handle: Handle) -> Option<JobKey> {
        self.by_handle.get(&handle).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn get(&self, key: JobKey) -> Option<&Job> {
        self.jobs.get(key)
    }

    pub fn get_mut(&mut self, key: JobKey) -> Option<&mut Job> {
        self.jobs.get_mut(key)
    }

    /// Queued jobs in arrival order. Calling it again restarts from the head.
    pub fn scan(&self) -> impl Iterator<Item = (JobKey, &Job)> + '_ {
        self.order
            .iter()
            .filter_map(|&key| self.jobs.get(key).map(|job| (key, job)))
    }

    pub fn keys(&self) -> Vec<JobKey> {
        self.scan().map(|(key, _)| key).collect()
    }
}

impl FromIterator<Job> for JobQueue {
    fn from_iter<I: IntoIterator<Item = Job>>(iter: I) -> Self {
        let mut queue = JobQueue::new();
        for job in iter {
            queue.append(job);
        }
        queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(bursts: &[Seconds]) -> JobQueue {
        bursts
            .iter()
            .enumerate()
            .map(|(i, &b)| Job::new(format!("J{i}"), i, 0, b))
            .collect()
    }

    #[test]
    fn scan_preserves_arrival_order() {
        let queue = queue_of(&[5, 3, 8]);
        let names: Vec<_> = queue.scan().map(|(_, j)| j.name.as_str()).collect();
        assert_eq!(names, ["J0", "J1", "J2"]);
        // restartable
        assert_eq!(queue.scan().count(), 3);
    }

    #[test]
    fn remove_by_handle_drops_only_that_job() {
        let mut queue = queue_of(&[5, 3, 8]);
        let keys = queue.keys();
        queue.assign_handle(keys[1], Handle(42)).unwrap();

        let removed = queue.remove_by_handle(Handle(42)).unwrap();
        assert_eq!(removed.name, "J1");
        assert_eq!(queue.len(), 2);
        let names: Vec<_> = queue.scan().map(|(_, j)| j.name.clone()).collect();
        assert_eq!(names, ["J0", "J2"]);
        assert!(queue.get(keys[0]).is_some());
    }

    #[test]
    fn remove_of_unknown_handle_is_a_no_op() {
        let mut queue = queue_of(&[1, 2]);
        assert!(queue.remove_by_handle(Handle(7)).is_none());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn handles_are_never_reused() {
        let mut queue = queue_of(&[1, 2]);
        let keys = queue.keys();
        queue.assign_handle(keys[0], Handle(10)).unwrap();
        queue.remove_by_handle(Handle(10)).unwrap();
        assert!(matches!(
            queue.assign_handle(keys[1], Handle(10)),
            Err(SchedError::Protocol(_))
        ));
    }

    #[test]
    fn draining_the_queue_empties_it() {
        let mut queue = queue_of(&[1; 20]);
        for (i, key) in queue.keys().into_iter().enumerate() {
            queue.assign_handle(key, Handle(100 + i as i32)).unwrap();
        }
        for i in 0..20 {
            assert!(queue.remove_by_handle(Handle(100 + i)).is_some());
        }
        assert!(queue.is_empty());
        assert_eq!(queue.scan().count(), 0);
    }

    #[test]
    fn run_to_completion_accounting() {
        let mut job = Job::new("B", 1, 2, 3);
        job.start_time = Some(5);
        job.record_run_to_completion();
        assert_eq!(job.end_time, Some(8));
        assert_eq!(job.turnaround, Some(3));
        assert_eq!(job.waiting, Some(5));
        assert_eq!(job.remaining, 0);
    }

    #[test]
    fn sliced_accounting_tracks_first_dispatch() {
        let mut job = Job::new("A", 0, 1, 5);
        job.start_time = Some(0);
        for (clock, slice) in [(0, 2), (2, 2), (4, 1)] {
            assert_eq!(job.execution_time(Some(2)), slice);
            job.record_slice(clock, slice);
        }
        assert_eq!(job.remaining, 0);
        assert_eq!(job.end_time, Some(5));
        assert_eq!(job.turnaround, Some(5));
        assert_eq!(job.waiting, Some(0));
    }
}
