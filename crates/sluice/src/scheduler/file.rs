//! File endpoints: open-at-start nodes that expose a descriptor.

use std::fs::OpenOptions;
use std::os::fd::OwnedFd;
use std::os::unix::fs::OpenOptionsExt;

use tracing::debug;

use super::handle::Handle;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::expr::{Arg, OpenMode};
use crate::stream::{StreamSet, StreamSlot};

/// Open the path and return an already-completed handle exposing the
/// descriptor: as stdout when reading (the node is a data source), as
/// stdin when writing (a data sink). The pipe machinery hands that
/// descriptor to whatever sits on the other side.
pub(super) fn start(path: &Arg, mode: OpenMode, mut streams: StreamSet, env: &Env) -> Result<Handle> {
    let path = path.resolve(env)?;

    let mut options = OpenOptions::new();
    match mode {
        OpenMode::Read => options.read(true),
        OpenMode::Truncate => options.write(true).create(true).truncate(true),
        OpenMode::Append => options.write(true).create(true).append(true),
    };
    options.mode(0o644);

    let file = options.open(&path).map_err(|err| Error::system("open", err))?;
    debug!(path = %path, ?mode, "opened file endpoint");
    let fd = OwnedFd::from(file);
    match mode {
        OpenMode::Read => streams.stdout = StreamSlot::Fd(fd),
        OpenMode::Truncate | OpenMode::Append => streams.stdin = StreamSlot::Fd(fd),
    }
    Ok(Handle::completed(0, streams))
}
