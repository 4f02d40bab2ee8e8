// File Descriptor Disposition Model

use crate::port::DescriptorResolver;
use std::fmt;
use std::os::fd::RawFd;
use std::str::FromStr;
use std::sync::Arc;

/// Symbolic standard channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Input,
    Output,
    Error,
}

impl Channel {
    pub fn fd(self) -> RawFd {
        match self {
            Channel::Input => 0,
            Channel::Output => 1,
            Channel::Error => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Input => write!(f, "in"),
            Channel::Output => write!(f, "out"),
            Channel::Error => write!(f, "err"),
        }
    }
}

/// Reference to a file descriptor in the parent
#[derive(Clone)]
pub enum FdRef {
    /// Raw descriptor number; negative numbers never resolve
    Raw(RawFd),
    /// One of stdin / stdout / stderr
    Symbolic(Channel),
    /// Object that knows its own descriptor (an open file, socket, ...)
    External(Arc<dyn DescriptorResolver>),
}

impl FdRef {
    pub fn external(resolver: impl DescriptorResolver + 'static) -> Self {
        FdRef::External(Arc::new(resolver))
    }

    /// Resolve to a descriptor number, or `None` when unresolvable
    pub fn resolve(&self) -> Option<RawFd> {
        let fd = match self {
            FdRef::Raw(fd) => Some(*fd),
            FdRef::Symbolic(channel) => Some(channel.fd()),
            FdRef::External(resolver) => resolver.resolve_descriptor(),
        };
        fd.filter(|fd| *fd >= 0)
    }

    /// Map-key equality: same number, same channel, or the same shared resolver
    pub fn same_key(&self, other: &FdRef) -> bool {
        match (self, other) {
            (FdRef::Raw(a), FdRef::Raw(b)) => a == b,
            (FdRef::Symbolic(a), FdRef::Symbolic(b)) => a == b,
            (FdRef::External(a), FdRef::External(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for FdRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FdRef::Raw(fd) => f.debug_tuple("Raw").field(fd).finish(),
            FdRef::Symbolic(channel) => f.debug_tuple("Symbolic").field(channel).finish(),
            FdRef::External(_) => f.write_str("External(..)"),
        }
    }
}

impl From<RawFd> for FdRef {
    fn from(fd: RawFd) -> Self {
        FdRef::Raw(fd)
    }
}

impl From<Channel> for FdRef {
    fn from(channel: Channel) -> Self {
        FdRef::Symbolic(channel)
    }
}

impl FromStr for FdRef {
    type Err = String;

    /// Accepts `in` / `out` / `err` or a descriptor number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" | "stdin" => Ok(FdRef::Symbolic(Channel::Input)),
            "out" | "stdout" => Ok(FdRef::Symbolic(Channel::Output)),
            "err" | "stderr" => Ok(FdRef::Symbolic(Channel::Error)),
            other => other
                .parse::<RawFd>()
                .map(FdRef::Raw)
                .map_err(|_| format!("not a descriptor reference: {}", other)),
        }
    }
}

/// What to do with a descriptor in the child
///
/// Only `Close` is acted upon. Other tags may be carried for other consumers
/// of the same map and are ignored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Close,
    Other(String),
}

impl From<&str> for Disposition {
    fn from(tag: &str) -> Self {
        match tag {
            "close" => Disposition::Close,
            other => Disposition::Other(other.to_string()),
        }
    }
}

/// Ordered fd-reference -> disposition mapping
#[derive(Debug, Clone, Default)]
pub struct FdDispositions {
    entries: Vec<(FdRef, Disposition)>,
}

impl FdDispositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the disposition for `fd_ref`
    pub fn insert(&mut self, fd_ref: impl Into<FdRef>, disposition: Disposition) -> &mut Self {
        let fd_ref = fd_ref.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.same_key(&fd_ref))
        {
            Some((_, slot)) => *slot = disposition,
            None => self.entries.push((fd_ref, disposition)),
        }
        self
    }

    pub fn close(&mut self, fd_ref: impl Into<FdRef>) -> &mut Self {
        self.insert(fd_ref, Disposition::Close)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FdRef, &Disposition)> {
        self.entries.iter().map(|(fd_ref, disposition)| (fd_ref, disposition))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
