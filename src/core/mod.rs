pub mod driver;
pub mod event;
pub mod observer;
pub mod state;

pub use driver::{Accounting, RunTotals, Session};
pub use event::{LifecycleEvent, SliceEnd};
pub use observer::{ExitListener, Observer};
pub use state::{Handle, Job, JobKey, JobQueue, JobState, Seconds};
