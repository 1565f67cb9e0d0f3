use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;

use crate::{
    core::{Job, Seconds},
    error::SchedError,
};

/// Longest burst a job list line may ask for. The subordinate sleeps in
/// `u32` multiples of the tick.
pub const MAX_BURST: Seconds = u32::MAX as Seconds;

/// One accepted line of the job list: `<name> <priority> <burst_seconds>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub priority: i64,
    pub burst: Seconds,
}

impl JobSpec {
    pub fn new(name: impl Into<String>, priority: i64, burst: Seconds) -> Self {
        Self {
            name: name.into(),
            priority,
            burst,
        }
    }

    /// Parse one line. Tokens after the third are ignored.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let name = fields.next()?;
        let priority = fields.next()?.parse().ok()?;
        let burst = fields
            .next()?
            .parse::<Seconds>()
            .ok()
            .filter(|&burst| burst <= MAX_BURST)?;
        Some(Self::new(name, priority, burst))
    }

    pub fn into_job(self, arrival: usize) -> Job {
        Job::new(self.name, arrival, self.priority, self.burst)
    }
}

/// Parse a job list; lines that do not yield three fields are skipped, as
/// are lines that are not UTF-8. Only read errors fail the whole list.
pub fn parse_job_list<R: BufRead>(reader: R) -> std::io::Result<Vec<JobSpec>> {
    let mut jobs = Vec::new();
    for (lineno, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let parsed = std::str::from_utf8(&raw)
            .ok()
            .and_then(JobSpec::parse_line);
        match parsed {
            Some(spec) => jobs.push(spec),
            None => debug!(
                "Skipping job list line {}: {:?}",
                lineno + 1,
                String::from_utf8_lossy(&raw)
            ),
        }
    }
    Ok(jobs)
}

pub fn load_job_list(path: &Path) -> Result<Vec<JobSpec>, SchedError> {
    let file = File::open(path).map_err(|source| SchedError::InputOpen {
        path: path.to_path_buf(),
        source,
    })?;
    parse_job_list(BufReader::new(file)).map_err(|source| SchedError::InputOpen {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_three_field_lines_in_order() {
        let input = "A 1 5\nB 2 3\n";
        let jobs = parse_job_list(input.as_bytes()).unwrap();
        assert_eq!(jobs, [JobSpec::new("A", 1, 5), JobSpec::new("B", 2, 3)]);
    }

    #[test]
    fn skips_malformed_lines() {
        let input = "A 1 5\n\nB two 3\nC 1\nD 0 -4\n  E   -3   7  trailing\n";
        let jobs = parse_job_list(input.as_bytes()).unwrap();
        assert_eq!(jobs, [JobSpec::new("A", 1, 5), JobSpec::new("E", -3, 7)]);
    }

    #[test]
    fn skips_lines_that_are_not_utf8() {
        let input: &[u8] = b"A 1 5\nJ\xe9r 2 3\nB 2 3\r\n";
        let jobs = parse_job_list(input).unwrap();
        assert_eq!(jobs, [JobSpec::new("A", 1, 5), JobSpec::new("B", 2, 3)]);
    }

    #[test]
    fn skips_bursts_too_long_to_sleep() {
        let input = format!("A 1 {MAX_BURST}\nB 1 {}\nC 1 {}\n", MAX_BURST + 1, u64::MAX);
        let jobs = parse_job_list(input.as_bytes()).unwrap();
        assert_eq!(jobs, [JobSpec::new("A", 1, MAX_BURST)]);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "A 1 5").unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, "B 2 3").unwrap();
        drop(file);

        let jobs = load_job_list(&path).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].name, "B");
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_job_list(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, SchedError::InputOpen { .. }));
    }
}
