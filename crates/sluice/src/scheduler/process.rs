//! Launching external commands against negotiated descriptors.

use std::os::fd::OwnedFd;
use std::process::Stdio;

use nix::fcntl::OFlag;
use nix::unistd::pipe2;
use tokio::process::Command;
use tracing::{debug, warn};

use super::handle::Handle;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::expr::Arg;
use crate::stream::{StreamSet, StreamSlot};

/// Spawn one external program.
///
/// Deferred arguments are resolved here, immediately before the spawn —
/// never earlier. The child sees only the environment's exported entries.
///
/// A program that cannot be launched is not an error in the caller's
/// frame: the result is an already-completed handle whose status is the
/// OS error code, observable through `wait` like any other exit.
pub(super) fn start(args: &[Arg], streams: StreamSet, env: &Env) -> Result<Handle> {
    if args.is_empty() {
        return Err(Error::EmptyCommand);
    }
    let argv = args.iter().map(|arg| arg.resolve(env)).collect::<Result<Vec<_>>>()?;

    let StreamSet { stdin, stdout, stderr } = streams;
    let (child_in, keep_in) = wire(stdin, true)?;
    let (child_out, keep_out) = wire(stdout, false)?;
    let (child_err, keep_err) = wire(stderr, false)?;
    let surviving = StreamSet::new(keep_in, keep_out, keep_err);

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .env_clear()
        .envs(env.exported())
        .stdin(child_in)
        .stdout(child_out)
        .stderr(child_err);

    // The child-side descriptors held by `command` are closed when it goes
    // out of scope, leaving this process with only the surviving ends.
    match command.spawn() {
        Ok(child) => {
            debug!(program = %argv[0], pid = ?child.id(), "spawned");
            Ok(Handle::from_child(child, surviving))
        }
        Err(err) => {
            warn!(program = %argv[0], error = %err, "launch failed");
            Ok(Handle::completed(err.raw_os_error().unwrap_or(127), surviving))
        }
    }
}

/// Turn one requested slot into the child's `Stdio` plus whatever this
/// process keeps: the far pipe end for `New`, nothing for `Fd` (the
/// descriptor is handed to the child and closed here) or `Unset` (the
/// child inherits the host stream).
fn wire(slot: StreamSlot, child_reads: bool) -> Result<(Stdio, StreamSlot)> {
    match slot {
        StreamSlot::Unset => Ok((Stdio::inherit(), StreamSlot::Unset)),
        StreamSlot::Fd(fd) => Ok((Stdio::from(fd), StreamSlot::Unset)),
        StreamSlot::New => {
            let (read_end, write_end) = new_pipe()?;
            if child_reads {
                Ok((Stdio::from(read_end), StreamSlot::Fd(write_end)))
            } else {
                Ok((Stdio::from(write_end), StreamSlot::Fd(read_end)))
            }
        }
    }
}

/// An anonymous pipe, close-on-exec so unrelated children never inherit
/// either end.
pub(super) fn new_pipe() -> Result<(OwnedFd, OwnedFd)> {
    pipe2(OFlag::O_CLOEXEC).map_err(|errno| Error::system("pipe", errno.into()))
}
