use std::cmp::Ordering;

use keyed_priority_queue::KeyedPriorityQueue;

use super::{Policy, run_slice};
use crate::{
    core::{JobKey, JobQueue, JobState, RunTotals, Seconds, Session},
    error::SchedError,
    exec::Executor,
};

/// Selection rank: lower priority value first, then earlier arrival.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
struct Rank {
    priority: i64,
    arrival: usize,
}

// KeyedPriorityQueue pops the greatest element, so the natural order is flipped
impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}

/// Preemptive priority scheduling with RR's slice discipline.
///
/// Each round orders every unfinished job by ascending priority value and
/// gives each one slice of at most `quantum` seconds.
pub struct Priority {
    quantum: Seconds,
}

impl Priority {
    pub fn new(quantum: Seconds) -> Self {
        Self { quantum }
    }

    /// Dispatch order of the next round.
    pub fn round(queue: &JobQueue) -> Vec<JobKey> {
        let mut ranked = KeyedPriorityQueue::new();
        for (key, job) in queue.scan() {
            if matches!(job.state, JobState::Ready | JobState::Stopped) {
                ranked.push(
                    key,
                    Rank {
                        priority: job.priority,
                        arrival: job.arrival,
                    },
                );
            }
        }

        let mut order = Vec::with_capacity(ranked.len());
        while let Some((key, _)) = ranked.pop() {
            order.push(key);
        }
        order
    }
}

impl Policy for Priority {
    fn run<E: Executor>(&mut self, session: &mut Session<'_, E>) -> Result<RunTotals, SchedError> {
        loop {
            let round = Self::round(session.queue());
            if round.is_empty() {
                break;
            }
            for key in round {
                run_slice(session, key, self.quantum)?;
            }
        }
        Ok(session.totals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Job;

    #[test]
    fn round_orders_by_priority_then_arrival() {
        let queue: JobQueue = [
            Job::new("A", 0, 3, 4),
            Job::new("B", 1, 1, 2),
            Job::new("C", 2, 3, 2),
            Job::new("D", 3, -2, 2),
        ]
        .into_iter()
        .collect();
        let names: Vec<_> = Priority::round(&queue)
            .into_iter()
            .map(|k| queue.get(k).unwrap().name.clone())
            .collect();
        assert_eq!(names, ["D", "B", "A", "C"]);
    }
}
