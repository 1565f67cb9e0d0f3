pub mod driver;
pub mod job;

pub use driver::Sim;
pub use job::{JobSpec, MAX_BURST, load_job_list, parse_job_list};
