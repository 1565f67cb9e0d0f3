use super::{Policy, run_to_completion};
use crate::{
    core::{JobKey, JobQueue, JobState, RunTotals, Session},
    error::SchedError,
    exec::Executor,
};

/// Non-preemptive shortest-job-first.
pub struct ShortestJobFirst;

impl ShortestJobFirst {
    /// READY job with the smallest total burst; the earliest arrival wins ties.
    pub fn select(queue: &JobQueue) -> Option<JobKey> {
        queue
            .scan()
            .filter(|(_, job)| job.state == JobState::Ready)
            .min_by_key(|(_, job)| job.burst)
            .map(|(key, _)| key)
    }
}

impl Policy for ShortestJobFirst {
    fn run<E: Executor>(&mut self, session: &mut Session<'_, E>) -> Result<RunTotals, SchedError> {
        // Completed jobs leave the queue, so every pass selects over what remains
        while let Some(key) = Self::select(session.queue()) {
            run_to_completion(session, key)?;
        }
        Ok(session.totals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Job;

    #[test]
    fn ties_go_to_the_earlier_arrival() {
        let queue: JobQueue = [
            Job::new("A", 0, 0, 4),
            Job::new("B", 1, 0, 2),
            Job::new("C", 2, 0, 2),
        ]
        .into_iter()
        .collect();
        let key = ShortestJobFirst::select(&queue).unwrap();
        assert_eq!(queue.get(key).unwrap().name, "B");
    }

    #[test]
    fn empty_queue_selects_nothing() {
        assert!(ShortestJobFirst::select(&JobQueue::new()).is_none());
    }
}
