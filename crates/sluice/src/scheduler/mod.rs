//! Execution engine: dispatching expression trees into running handles.
//!
//! `start` is the single entry point every composite recurses through. It
//! validates the requested streams against the node's declared
//! capabilities, then hands off to the matching starter: OS processes for
//! commands, worker tasks for logic/capture/echo, immediate handles for
//! files and literals, and pipe wiring for composition.

mod control;
mod file;
mod handle;
mod pipeline;
mod process;

pub use handle::Handle;

use futures::future::BoxFuture;

use crate::env::Env;
use crate::error::Result;
use crate::expr::Expr;
use crate::stream::StreamSet;

/// Start one node against the requested streams.
///
/// The request is checked against the node's capabilities before anything
/// launches; composites apply the same check recursively on the way down.
/// Instantiation happens bottom-up: the returned handle aggregates
/// whatever children the node started.
pub fn start<'a>(expr: &'a Expr, streams: StreamSet, env: &'a Env) -> BoxFuture<'a, Result<Handle>> {
    Box::pin(async move {
        expr.caps().check(&streams)?;
        match expr {
            Expr::Command(args) => process::start(args, streams, env),
            Expr::Echo(args) => control::start_echo(args, streams, env),
            Expr::Capture(name) => control::start_capture(name, streams, env),
            Expr::File { path, mode } => file::start(path, *mode, streams, env),
            Expr::Pipe(lhs, rhs) => pipeline::start(lhs, rhs, streams, env).await,
            Expr::And(lhs, rhs) => Ok(control::start_logic(control::LogicOp::And, lhs, rhs, env)),
            Expr::Or(lhs, rhs) => Ok(control::start_logic(control::LogicOp::Or, lhs, rhs, env)),
            Expr::True => Ok(Handle::completed(0, streams)),
            Expr::False => Ok(Handle::completed(-1, streams)),
        }
    })
}

/// Execute one expression to completion and return its status.
pub async fn run(expr: &Expr, env: &Env) -> Result<i32> {
    let mut handle = start(expr, StreamSet::default(), env).await?;
    Ok(handle.wait().await)
}

/// Execute expressions in order, stopping at the first non-zero status
/// and returning it; zero when every expression succeeded.
pub async fn run_all(exprs: &[Expr], env: &Env) -> Result<i32> {
    for expr in exprs {
        let status = run(expr, env).await?;
        if status != 0 {
            return Ok(status);
        }
    }
    Ok(0)
}
