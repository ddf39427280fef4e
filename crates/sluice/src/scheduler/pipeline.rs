//! Pipe wiring: deciding which side creates the shared descriptor.

use tracing::debug;

use super::handle::Handle;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::stream::{Cap, StreamSet, StreamSlot};

/// Start both sides of a pipe.
///
/// The creator side is started first with a request to allocate the shared
/// descriptor; the resulting end is handed to the other side as a bound
/// descriptor. Left-creates wiring is preferred; right-creates covers data
/// sinks like write-mode file endpoints, which can only open their own
/// descriptor. If neither side can create, nothing is started at all.
///
/// The caller's stdin goes to the left child; stdout and stderr go to the
/// right child. The left child's stderr is left unwired.
pub(super) async fn start(lhs: &Expr, rhs: &Expr, streams: StreamSet, env: &Env) -> Result<Handle> {
    let lhs_caps = lhs.caps();
    let rhs_caps = rhs.caps();
    let StreamSet { stdin, stdout, stderr } = streams;

    if lhs_caps.stdout.contains(Cap::Create) && rhs_caps.stdin.contains(Cap::Accept) {
        debug!("pipe wiring: left creates");
        let mut left = super::start(
            lhs,
            StreamSet::new(stdin, StreamSlot::New, StreamSlot::Unset),
            env,
        )
        .await?;
        let shared = left.streams_mut().stdout.take();
        let right = super::start(rhs, StreamSet::new(shared, stdout, stderr), env).await?;
        Ok(Handle::pair(left, right))
    } else if lhs_caps.stdout.contains(Cap::Accept) && rhs_caps.stdin.contains(Cap::Create) {
        debug!("pipe wiring: right creates");
        let mut right = super::start(
            rhs,
            StreamSet::new(StreamSlot::New, stdout, stderr),
            env,
        )
        .await?;
        let shared = right.streams_mut().stdin.take();
        let left = super::start(lhs, StreamSet::new(stdin, shared, StreamSlot::Unset), env).await?;
        Ok(Handle::pair(left, right))
    } else {
        Err(Error::PipeWiring)
    }
}
