//! Worker-task nodes: short-circuit logic, capture, and echo.
//!
//! None of these fork a process. Logic nodes drive the engine recursively
//! from a spawned task; capture and echo pump bytes over a descriptor on
//! the blocking pool. Each reports completion through its task's status,
//! joined by the owning [`Handle`].

use std::io::{Read, Write};
use std::os::fd::OwnedFd;
use std::sync::Arc;

use tracing::warn;

use super::handle::Handle;
use super::process::new_pipe;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::expr::{Arg, Expr};
use crate::stream::{StreamName, StreamSet, StreamSlot};

#[derive(Debug, Clone, Copy)]
pub(super) enum LogicOp {
    And,
    Or,
}

/// Start an `And`/`Or` node as a task that fully evaluates the left
/// subtree, then decides whether the right one runs at all. The skipped
/// branch is never started — no process is forked for it.
pub(super) fn start_logic(op: LogicOp, lhs: &Arc<Expr>, rhs: &Arc<Expr>, env: &Env) -> Handle {
    let lhs = Arc::clone(lhs);
    let rhs = Arc::clone(rhs);
    let env = env.clone();
    let task = tokio::spawn(async move {
        let left = evaluate(&lhs, &env).await;
        match op {
            LogicOp::And if left == 0 => evaluate(&rhs, &env).await,
            LogicOp::Or if left != 0 => evaluate(&rhs, &env).await,
            _ => left,
        }
    });
    Handle::from_task(task, StreamSet::default())
}

/// Run one branch to completion. A branch that fails to start has no
/// caller to report to, so the error degrades to a failing status.
async fn evaluate(expr: &Expr, env: &Env) -> i32 {
    match super::start(expr, StreamSet::default(), env).await {
        Ok(mut handle) => handle.wait().await,
        Err(err) => {
            warn!(error = %err, "branch failed to start");
            err.exit_status()
        }
    }
}

/// Start a capture node: read stdin to end-of-stream, strip one trailing
/// newline, store the result under `name` with the exported flag off.
///
/// The environment must be writable; anything else is rejected here,
/// before the reader task — or anything upstream of it — can observe a
/// side effect from this node.
pub(super) fn start_capture(name: &str, mut streams: StreamSet, env: &Env) -> Result<Handle> {
    if !env.is_writable() {
        return Err(Error::ReadOnlyEnvironment);
    }
    let reader = match streams.stdin.take() {
        StreamSlot::New => {
            let (read_end, write_end) = new_pipe()?;
            streams.stdin = StreamSlot::Fd(write_end);
            read_end
        }
        StreamSlot::Fd(fd) => fd,
        StreamSlot::Unset => return Err(Error::StreamMismatch { stream: StreamName::Stdin }),
    };
    let name = name.to_string();
    let env = env.clone();
    let task = tokio::task::spawn_blocking(move || pump_capture(reader, &name, &env));
    Ok(Handle::from_task(task, streams))
}

fn pump_capture(reader: OwnedFd, name: &str, env: &Env) -> i32 {
    let mut source = std::fs::File::from(reader);
    let mut bytes = Vec::new();
    if let Err(err) = source.read_to_end(&mut bytes) {
        warn!(variable = name, error = %err, "capture read failed");
        return err.raw_os_error().unwrap_or(1);
    }
    drop(source);

    let mut value = String::from_utf8_lossy(&bytes).into_owned();
    if value.ends_with('\n') {
        value.pop();
    }
    match env.set(name, value, false) {
        Ok(()) => 0,
        Err(err) => err.exit_status(),
    }
}

/// Start an echo node: write the resolved arguments, space-joined plus a
/// trailing newline, then close the descriptor so the reader sees
/// end-of-stream.
pub(super) fn start_echo(args: &[Arg], mut streams: StreamSet, env: &Env) -> Result<Handle> {
    let words = args.iter().map(|arg| arg.resolve(env)).collect::<Result<Vec<_>>>()?;
    let mut line = words.join(" ");
    line.push('\n');

    let writer = match streams.stdout.take() {
        StreamSlot::New => {
            let (read_end, write_end) = new_pipe()?;
            streams.stdout = StreamSlot::Fd(read_end);
            write_end
        }
        StreamSlot::Fd(fd) => fd,
        StreamSlot::Unset => return Err(Error::StreamMismatch { stream: StreamName::Stdout }),
    };
    let task = tokio::task::spawn_blocking(move || pump_echo(writer, &line));
    Ok(Handle::from_task(task, streams))
}

fn pump_echo(writer: OwnedFd, line: &str) -> i32 {
    let mut sink = std::fs::File::from(writer);
    match sink.write_all(line.as_bytes()) {
        Ok(()) => 0,
        Err(err) => {
            warn!(error = %err, "echo write failed");
            err.raw_os_error().unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::var;

    fn read_all(fd: OwnedFd) -> String {
        let mut text = String::new();
        std::fs::File::from(fd).read_to_string(&mut text).unwrap();
        text
    }

    #[tokio::test]
    async fn echo_writes_space_joined_newline_terminated() {
        let env = Env::empty();
        let args: Vec<Arg> = vec!["alpha".into(), "beta".into()];
        let request = StreamSet::new(StreamSlot::Unset, StreamSlot::New, StreamSlot::Unset);
        let mut handle = start_echo(&args, request, &env).unwrap();
        let fd = handle.streams_mut().stdout.take_fd().unwrap();
        assert_eq!(handle.wait().await, 0);
        assert_eq!(read_all(fd), "alpha beta\n");
    }

    #[tokio::test]
    async fn echo_resolves_variables_at_start() {
        let env = Env::empty();
        env.set("WHO", "world", false).unwrap();
        let args: Vec<Arg> = vec!["hello".into(), var("WHO")];
        let request = StreamSet::new(StreamSlot::Unset, StreamSlot::New, StreamSlot::Unset);
        let mut handle = start_echo(&args, request, &env).unwrap();
        let fd = handle.streams_mut().stdout.take_fd().unwrap();
        assert_eq!(handle.wait().await, 0);
        assert_eq!(read_all(fd), "hello world\n");
    }

    #[tokio::test]
    async fn echo_with_unresolved_variable_fails_before_spawning() {
        let env = Env::empty();
        let args: Vec<Arg> = vec![var("ABSENT")];
        let request = StreamSet::new(StreamSlot::Unset, StreamSlot::New, StreamSlot::Unset);
        let err = start_echo(&args, request, &env).unwrap_err();
        assert!(matches!(err, Error::MissingVariable(_)));
    }

    #[tokio::test]
    async fn capture_stores_the_trimmed_input() {
        let env = Env::empty();
        let request = StreamSet::new(StreamSlot::New, StreamSlot::Unset, StreamSlot::Unset);
        let mut handle = start_capture("RESULT", request, &env).unwrap();
        let fd = handle.streams_mut().stdin.take_fd().unwrap();

        let mut sink = std::fs::File::from(fd);
        sink.write_all(b"captured text\n").unwrap();
        drop(sink);

        assert_eq!(handle.wait().await, 0);
        assert_eq!(env.get("RESULT").unwrap(), "captured text");
    }

    #[tokio::test]
    async fn capture_strips_only_one_trailing_newline() {
        let env = Env::empty();
        let request = StreamSet::new(StreamSlot::New, StreamSlot::Unset, StreamSlot::Unset);
        let mut handle = start_capture("RESULT", request, &env).unwrap();
        let fd = handle.streams_mut().stdin.take_fd().unwrap();

        let mut sink = std::fs::File::from(fd);
        sink.write_all(b"a\nb\n\n").unwrap();
        drop(sink);

        assert_eq!(handle.wait().await, 0);
        assert_eq!(env.get("RESULT").unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn capture_rejects_read_only_environment() {
        let env = Env::inherited();
        let request = StreamSet::new(StreamSlot::New, StreamSlot::Unset, StreamSlot::Unset);
        let err = start_capture("RESULT", request, &env).unwrap_err();
        assert!(matches!(err, Error::ReadOnlyEnvironment));
    }

    #[tokio::test]
    async fn logic_truth_tables() {
        let env = Env::empty();
        let t = Arc::new(Expr::True);
        let f = Arc::new(Expr::False);

        assert_eq!(start_logic(LogicOp::And, &t, &t, &env).wait().await, 0);
        assert_ne!(start_logic(LogicOp::And, &f, &t, &env).wait().await, 0);
        assert_ne!(start_logic(LogicOp::And, &t, &f, &env).wait().await, 0);
        assert_eq!(start_logic(LogicOp::Or, &t, &f, &env).wait().await, 0);
        assert_eq!(start_logic(LogicOp::Or, &f, &t, &env).wait().await, 0);
        assert_ne!(start_logic(LogicOp::Or, &f, &f, &env).wait().await, 0);
    }
}
