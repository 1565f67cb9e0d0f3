pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod exec;
pub mod logging;
pub mod report;
pub mod scheduler;
pub mod sim;

pub use core::{Job, JobQueue, JobState, Session};
pub use error::{ArgumentError, SchedError};
pub use exec::{Executor, ForkExecutor, SimExecutor};
pub use report::{Reporter, RunReport};
pub use scheduler::{Policy, PolicyKind};
pub use sim::{JobSpec, Sim};
