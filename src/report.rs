//! Human-readable run report.

use std::io::{self, Write};

use average::{Estimate, Mean};

use crate::{
    core::{ExitListener, Job, RunTotals, Seconds},
    scheduler::PolicyKind,
};

/// Result of one completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub policy: PolicyKind,
    /// Number of accepted job list lines.
    pub accepted: usize,
    /// Exited jobs in completion order.
    pub jobs: Vec<Job>,
    pub totals: RunTotals,
    /// Simulated clock at the end of the run.
    pub clock: Seconds,
}

impl RunReport {
    pub fn average_waiting(&self) -> f64 {
        avg(self.jobs.iter().map(|j| j.waiting.unwrap_or_default() as f64))
    }

    pub fn average_turnaround(&self) -> f64 {
        avg(self.jobs.iter().map(|j| j.turnaround.unwrap_or_default() as f64))
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    iter.collect::<Mean>().estimate()
}

/// Writes the banner, one block per exited job, and the run summary.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "------------------------------- WELCOME TO THE CPU SCHEDULER -------------------------------\n"
        )
    }

    pub fn policy_header(&mut self, policy: PolicyKind) -> io::Result<()> {
        writeln!(
            self.out,
            "#####################   {policy} POLICY: INFORMATION ABOUT EACH PROCESS   #####################\n"
        )
    }

    pub fn job_block(&mut self, job: &Job) -> io::Result<()> {
        let handle = job
            .handle
            .map(|h| h.to_string())
            .unwrap_or_else(|| "-".into());
        let secs = |v: Option<Seconds>| v.map(|s| s.to_string()).unwrap_or_else(|| "-".into());

        writeln!(self.out, "-----------------------------------------")?;
        writeln!(self.out, "| Process name:     {}", job.name)?;
        writeln!(self.out, "| Process id:       {handle}")?;
        writeln!(self.out, "| Start Time:       {} seconds", secs(job.start_time))?;
        writeln!(self.out, "| End Time:         {} seconds", secs(job.end_time))?;
        writeln!(self.out, "| Burst Time:       {} seconds", job.burst)?;
        writeln!(self.out, "| Remaining Time:   {} seconds", job.remaining)?;
        writeln!(self.out, "| Turnaround Time:  {} seconds", secs(job.turnaround))?;
        writeln!(self.out, "| Waiting Time:     {} seconds", secs(job.waiting))?;
        writeln!(self.out, "-----------------------------------------")
    }

    pub fn summary(&mut self, report: &RunReport) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "Average Waiting Time: {} seconds",
            report.average_waiting()
        )?;
        writeln!(
            self.out,
            "Average Turnaround Time: {} seconds",
            report.average_turnaround()
        )?;
        writeln!(
            self.out,
            "\n#####################   CPU SCHEDULER IS DONE   #####################"
        )?;
        self.out.flush()
    }
}

impl<W: Write> ExitListener for Reporter<W> {
    fn job_exited(&mut self, job: &Job) -> io::Result<()> {
        self.job_block(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Handle, JobState};

    fn exited(name: &str, start: Seconds, burst: Seconds) -> Job {
        let mut job = Job::new(name, 0, 1, burst);
        job.handle = Some(Handle(4242));
        job.start_time = Some(start);
        job.record_run_to_completion();
        job.state = JobState::Exited;
        job
    }

    #[test]
    fn averages_over_exited_jobs() {
        let report = RunReport {
            policy: PolicyKind::Fcfs,
            accepted: 2,
            jobs: vec![exited("A", 0, 5), exited("B", 5, 3)],
            totals: RunTotals {
                waiting: 5,
                turnaround: 8,
                completed: 2,
            },
            clock: 8,
        };
        assert_eq!(report.average_waiting(), 2.5);
        assert_eq!(report.average_turnaround(), 4.0);
    }

    #[test]
    fn job_block_lists_every_statistic() {
        let mut reporter = Reporter::new(Vec::new());
        reporter.job_exited(&exited("B", 5, 3)).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        assert!(text.contains("Process name:     B"));
        assert!(text.contains("Process id:       4242"));
        assert!(text.contains("Start Time:       5 seconds"));
        assert!(text.contains("End Time:         8 seconds"));
        assert!(text.contains("Remaining Time:   0 seconds"));
        assert!(text.contains("Turnaround Time:  3 seconds"));
        assert!(text.contains("Waiting Time:     5 seconds"));
    }

    #[test]
    fn summary_prints_averages() {
        let report = RunReport {
            policy: PolicyKind::Sjf,
            accepted: 2,
            jobs: vec![exited("B", 0, 3), exited("A", 3, 5)],
            totals: RunTotals::default(),
            clock: 8,
        };
        let mut reporter = Reporter::new(Vec::new());
        reporter.summary(&report).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(text.contains("Average Waiting Time: 1.5 seconds"));
        assert!(text.contains("Average Turnaround Time: 4 seconds"));
    }
}
