//! Error types for pipeline construction and execution.

use std::io;

use thiserror::Error;

use crate::stream::StreamName;

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while validating, wiring, or launching a pipeline.
///
/// Validation errors (`StreamMismatch`, `PipeWiring`, `ReadOnlyEnvironment`,
/// `EmptyCommand`) are raised synchronously, before any process or worker
/// task has been started. `MissingVariable` is raised only at the moment a
/// deferred argument is resolved, which happens at node start time, never at
/// tree construction time. `System` wraps an OS primitive failure and may
/// surface after sibling nodes of the same tree have already been started;
/// no rollback of those siblings is attempted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{stream} request not allowed by node capabilities")]
    StreamMismatch { stream: StreamName },
    #[error("cannot connect pipe: neither side can create the shared descriptor")]
    PipeWiring,
    #[error("cannot capture into a read-only environment")]
    ReadOnlyEnvironment,
    #[error("command node has no arguments")]
    EmptyCommand,
    #[error("undefined variable: {0}")]
    MissingVariable(String),
    #[error("{context}: {source}")]
    System {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn system(context: &'static str, source: io::Error) -> Self {
        Error::System { context, source }
    }

    /// True for errors caught before anything was started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::StreamMismatch { .. }
                | Error::PipeWiring
                | Error::ReadOnlyEnvironment
                | Error::EmptyCommand
        )
    }

    /// The raw OS error code, for `System` errors that carry one.
    pub fn os_error(&self) -> Option<i32> {
        match self {
            Error::System { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Exit status reported when this error occurs inside a worker task,
    /// where there is no caller left to propagate it to.
    pub(crate) fn exit_status(&self) -> i32 {
        self.os_error().unwrap_or(1)
    }
}
