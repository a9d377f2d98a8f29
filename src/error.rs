use std::error::Error;
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Every way an oplog operation can fail.
///
/// Note there's no "duplicate" variant here. Re-ingesting operations we've
/// already seen is normal in any gossip protocol, so duplicates are silently
/// trimmed and reported through the returned length instead.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum OpLogError {
    /// A local version was referenced which is outside the known range.
    UnknownVersion,

    /// An (agent, seq) pair was referenced which this peer hasn't seen.
    UnknownId,

    /// A remote operation names parents which are missing from the local
    /// causal graph. The caller should fetch & apply the missing operations
    /// first.
    MissingParents,

    /// Zero length operation (eg a delete of 0 items).
    InvalidLength,

    /// An attempt to assign a sequence number lower than the agent's next
    /// valid seq.
    InvalidSeq,

    /// A replay invariant was violated - eg, retreating an item which isn't
    /// currently inserted. This means the operation log itself is
    /// inconsistent. Not recoverable.
    CorruptState,
}

impl Display for OpLogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpLogError::{:?}", self)
    }
}

impl Error for OpLogError {}
