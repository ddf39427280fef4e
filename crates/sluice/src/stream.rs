//! Stream descriptors and the wiring vocabulary.
//!
//! Every node is started against a [`StreamSet`]: one [`StreamSlot`] each
//! for stdin, stdout, and stderr. A slot is either absent, a request for
//! the node to create its own descriptor, or a concrete descriptor handed
//! over by whoever owned it. Each node kind declares, per stream, which of
//! those three shapes it supports — that declaration is what pipe wiring
//! is decided against, and what every start request is checked against
//! before anything is launched.

use std::os::fd::OwnedFd;

use enumset::{enum_set, EnumSet, EnumSetType};

use crate::error::{Error, Result};

/// What a node can do with one of its streams.
#[derive(Debug, EnumSetType)]
pub enum Cap {
    /// Tolerates the slot being absent.
    Ignore,
    /// Can allocate its own descriptor when asked to.
    Create,
    /// Can consume a descriptor someone else opened.
    Accept,
}

/// A set of [`Cap`] flags for one stream.
pub type CapSet = EnumSet<Cap>;

/// Any wiring at all: absent, created, or handed over.
pub const CAP_ANY: CapSet = enum_set!(Cap::Ignore | Cap::Create | Cap::Accept);
/// The stream is never used.
pub const CAP_UNUSED: CapSet = enum_set!(Cap::Ignore);
/// The stream must carry data: either end of a fresh pipe, or a given fd.
pub const CAP_WIRED: CapSet = enum_set!(Cap::Create | Cap::Accept);
/// The node always opens the descriptor itself.
pub const CAP_CREATES: CapSet = enum_set!(Cap::Create);

/// One of the three standard streams, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamName {
    Stdin,
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StreamName::Stdin => "stdin",
            StreamName::Stdout => "stdout",
            StreamName::Stderr => "stderr",
        };
        f.write_str(name)
    }
}

/// The wiring requested (before start) or surviving (after start) for one
/// standard stream.
///
/// A `Fd` slot owns its descriptor; moving the slot moves the close
/// responsibility with it, and dropping it closes the descriptor.
#[derive(Debug, Default)]
pub enum StreamSlot {
    /// No descriptor; the stream is left to the host default.
    #[default]
    Unset,
    /// The node must allocate a descriptor; the far end is exposed on its
    /// handle after start.
    New,
    /// A concrete descriptor, owned by the slot.
    Fd(OwnedFd),
}

impl StreamSlot {
    /// Move the slot out, leaving `Unset` behind.
    pub fn take(&mut self) -> StreamSlot {
        std::mem::take(self)
    }

    /// Move the descriptor out, if the slot holds one.
    pub fn take_fd(&mut self) -> Option<OwnedFd> {
        match self.take() {
            StreamSlot::Fd(fd) => Some(fd),
            other => {
                *self = other;
                None
            }
        }
    }

    fn allowed(&self, caps: CapSet) -> bool {
        match self {
            StreamSlot::Unset => caps.contains(Cap::Ignore),
            StreamSlot::New => caps.contains(Cap::Create),
            StreamSlot::Fd(_) => caps.contains(Cap::Accept),
        }
    }
}

/// The three standard-stream slots of one node.
#[derive(Debug, Default)]
pub struct StreamSet {
    pub stdin: StreamSlot,
    pub stdout: StreamSlot,
    pub stderr: StreamSlot,
}

impl StreamSet {
    pub fn new(stdin: StreamSlot, stdout: StreamSlot, stderr: StreamSlot) -> Self {
        StreamSet { stdin, stdout, stderr }
    }
}

/// A node's declared capabilities, one [`CapSet`] per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCaps {
    pub stdin: CapSet,
    pub stdout: CapSet,
    pub stderr: CapSet,
}

impl StreamCaps {
    pub fn new(stdin: CapSet, stdout: CapSet, stderr: CapSet) -> Self {
        StreamCaps { stdin, stdout, stderr }
    }

    /// Reject a start request whose slots this node cannot honor.
    pub fn check(&self, streams: &StreamSet) -> Result<()> {
        for (slot, caps, stream) in [
            (&streams.stdin, self.stdin, StreamName::Stdin),
            (&streams.stdout, self.stdout, StreamName::Stdout),
            (&streams.stderr, self.stderr, StreamName::Stderr),
        ] {
            if !slot.allowed(caps) {
                return Err(Error::StreamMismatch { stream });
            }
        }
        Ok(())
    }
}
