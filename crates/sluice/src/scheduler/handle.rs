//! Running units of work and their completion.

use std::process::ExitStatus;

use futures::future::BoxFuture;
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::stream::StreamSet;

#[derive(Debug)]
enum Work {
    /// Nothing left to do; the status was known at start.
    Done,
    /// A spawned OS process.
    Child(Child),
    /// A worker task producing a status.
    Task(JoinHandle<i32>),
    /// Two aggregated children, waited left then right.
    Pair(Box<Handle>, Box<Handle>),
}

/// A started node: the descriptors it still owns, plus whatever must be
/// joined to learn its exit status.
///
/// `wait` caches the status, so calling it again is harmless even though
/// the underlying process or task is only ever joined once. Dropping a
/// handle without waiting closes its surviving descriptors but does not
/// stop a running child.
#[derive(Debug)]
pub struct Handle {
    streams: StreamSet,
    status: Option<i32>,
    work: Work,
}

impl Handle {
    pub(crate) fn completed(status: i32, streams: StreamSet) -> Self {
        Handle { streams, status: Some(status), work: Work::Done }
    }

    pub(crate) fn from_child(child: Child, streams: StreamSet) -> Self {
        Handle { streams, status: None, work: Work::Child(child) }
    }

    pub(crate) fn from_task(task: JoinHandle<i32>, streams: StreamSet) -> Self {
        Handle { streams, status: None, work: Work::Task(task) }
    }

    /// Aggregate two started nodes. The combined handle exposes the left
    /// child's stdin and the right child's stdout/stderr — the ends a pipe
    /// leaves unconsumed.
    pub(crate) fn pair(mut lhs: Handle, mut rhs: Handle) -> Self {
        let streams = StreamSet::new(
            lhs.streams.stdin.take(),
            rhs.streams.stdout.take(),
            rhs.streams.stderr.take(),
        );
        Handle { streams, status: None, work: Work::Pair(Box::new(lhs), Box::new(rhs)) }
    }

    /// The descriptors this node created for its caller to use.
    pub fn streams(&self) -> &StreamSet {
        &self.streams
    }

    /// The OS process id, for handles backed by a process that has not
    /// been reaped yet.
    pub fn pid(&self) -> Option<u32> {
        match &self.work {
            Work::Child(child) => child.id(),
            _ => None,
        }
    }

    pub fn streams_mut(&mut self) -> &mut StreamSet {
        &mut self.streams
    }

    /// Block until the unit of work completes and return its status.
    ///
    /// For aggregated pipe handles the statuses combine as `left | right`:
    /// zero only when both sides exited zero. This intentionally differs
    /// from the usual rightmost-status shell convention.
    pub fn wait(&mut self) -> BoxFuture<'_, i32> {
        Box::pin(async move {
            if let Some(status) = self.status {
                return status;
            }
            let status = match &mut self.work {
                Work::Done => 0,
                Work::Child(child) => match child.wait().await {
                    Ok(exit) => exit_code(exit),
                    Err(err) => {
                        warn!(error = %err, "wait on child process failed");
                        -1
                    }
                },
                Work::Task(task) => match task.await {
                    Ok(status) => status,
                    Err(err) => {
                        warn!(error = %err, "worker task failed");
                        -1
                    }
                },
                Work::Pair(lhs, rhs) => {
                    let lhs = lhs.wait().await;
                    let rhs = rhs.wait().await;
                    lhs | rhs
                }
            };
            self.status = Some(status);
            status
        })
    }
}

/// Map a process exit to an integer status: the exit code, or the negated
/// signal number when the process was killed.
fn exit_code(exit: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    exit.code()
        .or_else(|| exit.signal().map(|sig| -sig))
        .unwrap_or(-1)
}
