use std::fmt;

/// State change of a subordinate, as reported by the execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Normal termination with the given exit status.
    Exited(i32),
    /// Terminated by a signal.
    Signaled(i32),
    /// Stopped by a signal; for a well-behaved subordinate this ends a slice.
    Stopped(i32),
    Continued,
    /// Raw wait status that matched none of the above.
    Unknown(i32),
}

impl LifecycleEvent {
    /// Whether the subordinate is gone after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleEvent::Exited(_) | LifecycleEvent::Signaled(_))
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Exited(status) => write!(f, "exited with status {status}"),
            LifecycleEvent::Signaled(sig) => write!(f, "terminated by signal {sig}"),
            LifecycleEvent::Stopped(sig) => write!(f, "stopped by signal {sig}"),
            LifecycleEvent::Continued => f.write_str("continued"),
            LifecycleEvent::Unknown(raw) => write!(f, "reason unknown (status {raw:#x})"),
        }
    }
}

/// How a slice handed to the execution unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceEnd {
    Completed,
    Preempted,
}
