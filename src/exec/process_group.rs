// src/exec/process_group.rs

//! Every command runs as the leader of its own process group, so stopping
//! an action reaches whatever its shell started (`make` and its compilers,
//! `npm` and its node children, `cmd &` jobs), not only the shell itself.
//!
//! A consequence is that children are no longer in the terminal's
//! foreground group: a Ctrl-C reaches bpm only, and bpm passes it on by
//! cancelling the invocation.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupSignal {
    /// Ask politely (SIGTERM).
    Terminate,
    /// SIGKILL.
    Kill,
}

/// Put the command in a new process group led by the spawned shell.
///
/// Stdin is closed: a background process group reading the terminal would
/// be stopped by `SIGTTIN` instead of seeing end-of-file.
pub(crate) fn isolate(cmd: &mut Command) {
    cmd.stdin(Stdio::null());
    #[cfg(unix)]
    cmd.process_group(0);
}

/// Send `signal` to the process group led by `leader`.
///
/// A group that no longer exists is not an error.
#[cfg(unix)]
pub(crate) fn signal_group(leader: Option<u32>, signal: GroupSignal, member: &str) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = leader.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    let sig = match signal {
        GroupSignal::Terminate => Signal::SIGTERM,
        GroupSignal::Kill => Signal::SIGKILL,
    };

    match killpg(Pid::from_raw(pgid), sig) {
        Ok(()) => debug!(member = %member, pgid, signal = %sig, "signalled process group"),
        Err(Errno::ESRCH) => debug!(member = %member, pgid, "process group already gone"),
        Err(e) => warn!(member = %member, pgid, signal = %sig, error = %e, "failed to signal process group"),
    }
}

/// Without process groups only the direct child can be stopped; the
/// caller's `Child::kill` does that.
#[cfg(not(unix))]
pub(crate) fn signal_group(_leader: Option<u32>, _signal: GroupSignal, _member: &str) {}
