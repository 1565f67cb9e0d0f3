use std::io;
use std::time::Duration;

use log::{debug, info, warn};
use rustc_hash::FxHashSet;

use super::{Executor, Workload};
use crate::{
    core::{Handle, LifecycleEvent, Seconds},
    error::SchedError,
};

/// Which side of the fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forked {
    Controller { handle: Handle },
    Subordinate,
}

/// Create a new execution context.
///
/// # Safety
///
/// On the [`Forked::Subordinate`] branch only async-signal-safe work may be
/// done (no allocation, no locks, no logging) and the branch must end in
/// `libc::_exit`, since the controller may have had other threads at the time
/// of the fork.
pub unsafe fn fork_subordinate() -> io::Result<Forked> {
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(Forked::Subordinate),
        pid => Ok(Forked::Controller {
            handle: Handle(pid),
        }),
    }
}

/// Runs every job as a real child process.
///
/// One simulated second lasts `tick` of wall-clock time inside the child.
#[derive(Debug)]
pub struct ForkExecutor {
    tick: Duration,
    // Spawned and not yet reaped
    live: FxHashSet<Handle>,
}

impl ForkExecutor {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            live: FxHashSet::default(),
        }
    }

    pub fn live(&self) -> usize {
        self.live.len()
    }

    fn signal(&self, handle: Handle, signal: i32) -> Result<(), SchedError> {
        if unsafe { libc::kill(handle.0, signal) } == -1 {
            return Err(SchedError::Signal {
                handle,
                signal,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    fn wait(&mut self, handle: Handle, flags: i32) -> Result<LifecycleEvent, SchedError> {
        let mut status: libc::c_int = 0;
        loop {
            let rc = unsafe { libc::waitpid(handle.0, &mut status, flags) };
            if rc != -1 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(SchedError::Wait {
                    handle,
                    source: err,
                });
            }
        }

        let event = classify(status);
        if event.is_terminal() {
            self.live.remove(&handle);
        }
        Ok(event)
    }
}

impl Executor for ForkExecutor {
    fn spawn(&mut self, name: &str, work: &Workload) -> Result<Handle, SchedError> {
        if work.quantum == Some(0) {
            return Err(SchedError::Protocol(format!(
                "job {name} dispatched with a zero quantum"
            )));
        }

        let forked = unsafe { fork_subordinate() }.map_err(|source| SchedError::Spawn {
            name: name.to_string(),
            source,
        })?;

        match forked {
            Forked::Subordinate => run_subordinate(work, self.tick),
            Forked::Controller { handle } => {
                self.live.insert(handle);
                info!(
                    "Spawned job {name} as process {handle} ({}s burst, slice {}s)",
                    work.burst,
                    work.next_slice(work.burst)
                );
                Ok(handle)
            }
        }
    }

    fn next_event(&mut self, handle: Handle) -> Result<LifecycleEvent, SchedError> {
        let event = self.wait(handle, libc::WUNTRACED | libc::WCONTINUED)?;
        debug!("Process {handle} {event}");
        Ok(event)
    }

    fn resume(&mut self, handle: Handle) -> Result<(), SchedError> {
        self.signal(handle, libc::SIGCONT)
    }

    fn terminate(&mut self, handle: Handle) -> Result<(), SchedError> {
        if !self.live.contains(&handle) {
            return Ok(());
        }
        self.signal(handle, libc::SIGKILL)?;
        // Reap; a stopped child still dies from SIGKILL
        while self.live.contains(&handle) {
            self.wait(handle, 0)?;
        }
        Ok(())
    }
}

impl Drop for ForkExecutor {
    fn drop(&mut self) {
        let live: Vec<Handle> = self.live.iter().copied().collect();
        for handle in live {
            warn!("Killing orphaned subordinate {handle}");
            if let Err(e) = self.terminate(handle) {
                warn!("{e}");
                self.live.remove(&handle);
            }
        }
    }
}

/// Classify a raw `waitpid` status.
pub fn classify(status: libc::c_int) -> LifecycleEvent {
    if libc::WIFEXITED(status) {
        LifecycleEvent::Exited(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        LifecycleEvent::Signaled(libc::WTERMSIG(status))
    } else if libc::WIFSTOPPED(status) {
        LifecycleEvent::Stopped(libc::WSTOPSIG(status))
    } else if libc::WIFCONTINUED(status) {
        LifecycleEvent::Continued
    } else {
        LifecycleEvent::Unknown(status)
    }
}

// Child side of the fork. Only sleeps, raises and exits.
fn run_subordinate(work: &Workload, tick: Duration) -> ! {
    let mut remaining: Seconds = work.burst;
    loop {
        let slice = work.next_slice(remaining);
        let factor = u32::try_from(slice).unwrap_or(u32::MAX);
        std::thread::sleep(tick.saturating_mul(factor));
        remaining -= slice;
        if remaining == 0 {
            unsafe { libc::_exit(0) }
        }
        unsafe {
            libc::raise(libc::SIGSTOP);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn classifies_wait_statuses() {
        // Encodings per the Linux wait status layout
        assert_eq!(classify(0), LifecycleEvent::Exited(0));
        assert_eq!(classify(3 << 8), LifecycleEvent::Exited(3));
        assert_eq!(classify(libc::SIGKILL), LifecycleEvent::Signaled(libc::SIGKILL));
        assert_eq!(
            classify((libc::SIGSTOP << 8) | 0x7f),
            LifecycleEvent::Stopped(libc::SIGSTOP)
        );
        assert_eq!(classify(0xffff), LifecycleEvent::Continued);
    }

    #[test]
    fn zero_quantum_is_rejected_before_forking() {
        let mut exec = ForkExecutor::new(Duration::ZERO);
        let err = exec.spawn("A", &Workload::sliced(3, 0)).unwrap_err();
        assert!(matches!(err, SchedError::Protocol(_)));
        assert_eq!(exec.live(), 0);
    }
}
