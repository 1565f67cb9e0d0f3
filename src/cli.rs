//! Invocation parser.
//!
//! Hand-rolled; the grammar is a single positional form.
//!
//! ```text
//! procsched <FCFS|SJF> <input_file>
//! procsched <RR|PRIO> <quantum_ms> <input_file>
//! procsched --help | -h
//! ```

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::{core::Seconds, error::ArgumentError, scheduler::PolicyKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub policy: PolicyKind,
    /// Whole seconds; present exactly for the preemptive policies.
    pub quantum: Option<Seconds>,
    pub input: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Invocation),
    Help,
}

pub fn usage(exe: &str) -> String {
    format!(
        "usage: {exe} <FCFS|SJF> <input_file>\n       {exe} <RR|PRIO> <quantum_ms> <input_file>\n\n\
         Each input line is `<name> <priority> <burst_seconds>`.\n\
         The quantum is given in milliseconds and truncated to whole seconds."
    )
}

/// Parse the arguments that follow the program name.
///
/// The input path is passed through untouched; only the policy and quantum
/// have to be UTF-8.
pub fn parse_args<I, S>(args: I) -> Result<Command, ArgumentError>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    if let [flag] = args.as_slice() {
        if flag == "--help" || flag == "-h" {
            return Ok(Command::Help);
        }
    }

    let (policy, quantum, input) = match args.as_slice() {
        [policy, input] => (policy, None, input),
        [policy, quantum, input] => (policy, Some(quantum), input),
        _ => return Err(ArgumentError::WrongArgCount),
    };

    let policy: PolicyKind = match policy.to_str() {
        Some(name) => name.parse()?,
        None => {
            return Err(ArgumentError::UnknownPolicy(
                policy.to_string_lossy().into_owned(),
            ));
        }
    };
    let quantum = match (policy.is_preemptive(), quantum) {
        (true, Some(ms)) => Some(quantum_secs(ms)?),
        (true, None) => return Err(ArgumentError::MissingQuantum(policy.name())),
        (false, Some(_)) => return Err(ArgumentError::UnexpectedQuantum(policy.name())),
        (false, None) => None,
    };

    Ok(Command::Run(Invocation {
        policy,
        quantum,
        input: PathBuf::from(input),
    }))
}

fn quantum_secs(raw: &OsStr) -> Result<Seconds, ArgumentError> {
    let ms: i64 = raw
        .to_str()
        .and_then(|ms| ms.trim().parse().ok())
        .ok_or_else(|| ArgumentError::InvalidQuantum(raw.to_string_lossy().into_owned()))?;
    let secs = ms / 1000;
    if secs <= 0 {
        return Err(ArgumentError::QuantumTooSmall(ms));
    }
    Ok(secs as Seconds)
}
