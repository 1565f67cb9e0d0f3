use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::{Handle, LifecycleEvent};

/// Invalid invocation. Nothing is scheduled when one of these is raised.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("wrong format: expected <policy> [quantum_ms] <input_file>")]
    WrongArgCount,
    #[error("invalid policy '{0}': expected FCFS, SJF, RR or PRIO")]
    UnknownPolicy(String),
    #[error("policy {0} requires a quantum")]
    MissingQuantum(&'static str),
    #[error("only RR or PRIO take a quantum, got one for {0}")]
    UnexpectedQuantum(&'static str),
    #[error("quantum '{0}' is not a number of milliseconds")]
    InvalidQuantum(String),
    #[error("quantum of {0} ms is less than one whole second")]
    QuantumTooSmall(i64),
}

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("cannot open job list {}: {source}", path.display())]
    InputOpen { path: PathBuf, source: io::Error },

    #[error("failed to spawn subordinate for job {name}: {source}")]
    Spawn { name: String, source: io::Error },

    #[error("no queued job runs as handle {handle}")]
    QueueConsistency { handle: Handle },

    #[error("scheduling protocol violated: {0}")]
    Protocol(String),

    #[error("failed to deliver signal {signal} to {handle}: {source}")]
    Signal {
        handle: Handle,
        signal: i32,
        source: io::Error,
    },

    #[error("failed to wait on {handle}: {source}")]
    Wait { handle: Handle, source: io::Error },

    #[error("subordinate of job {name} ended abnormally: {outcome}")]
    Subordinate {
        name: String,
        outcome: LifecycleEvent,
    },

    #[error("report output failed: {0}")]
    Output(#[from] io::Error),
}
