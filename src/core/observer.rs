use super::state::{Job, JobKey, JobQueue, JobState};

/// Receives every job as it reaches EXITED.
pub trait ExitListener {
    fn job_exited(&mut self, job: &Job) -> std::io::Result<()>;
}

impl ExitListener for () {
    fn job_exited(&mut self, _job: &Job) -> std::io::Result<()> {
        Ok(())
    }
}

impl ExitListener for Vec<Job> {
    fn job_exited(&mut self, job: &Job) -> std::io::Result<()> {
        self.push(job.clone());
        Ok(())
    }
}

/// Checks control block invariants after every transition (debug builds).
#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn observe(&mut self, queue: &JobQueue, current: Option<JobKey>) {
        self.step += 1;

        let mut running = 0;
        for (key, job) in queue.scan() {
            debug_assert_ne!(
                job.state,
                JobState::Exited,
                "Exited job {} still queued",
                job.name
            );
            debug_assert!(
                job.remaining <= job.burst,
                "Job {} remaining {}s exceeds burst {}s",
                job.name,
                job.remaining,
                job.burst
            );
            match job.state {
                JobState::Ready => {
                    debug_assert!(job.handle.is_none(), "Ready job {} has a handle", job.name);
                    debug_assert_eq!(job.remaining, job.burst);
                }
                JobState::Running => {
                    running += 1;
                    debug_assert_eq!(
                        current,
                        Some(key),
                        "Running job {} is not the current job",
                        job.name
                    );
                }
                JobState::Stopped => {
                    debug_assert!(
                        job.remaining > 0,
                        "Stopped job {} has no remaining burst",
                        job.name
                    );
                }
                JobState::Exited => {}
            }
            if let Some(handle) = job.handle {
                debug_assert_eq!(
                    queue.key_of(handle),
                    Some(key),
                    "Handle {handle} index does not point at job {}",
                    job.name
                );
            }
        }
        debug_assert!(
            running <= 1,
            "{running} jobs RUNNING at once (step {})",
            self.step
        );
    }

    pub fn observe_exit(&mut self, job: &Job) {
        self.step += 1;
        debug_assert_eq!(job.state, JobState::Exited);
        debug_assert_eq!(
            job.remaining, 0,
            "Job {} exited with burst left (step {})",
            job.name, self.step
        );
        debug_assert!(job.end_time.is_some() && job.turnaround.is_some() && job.waiting.is_some());
    }
}
