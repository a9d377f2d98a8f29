#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single edit to the sequence. Every operation occupies exactly one local
/// version.
///
/// Positions are expressed in the document as it was at the operation's
/// parents. Replaying the graph is what turns these into positions in the
/// final document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ListOp<T> {
    Ins { pos: usize, content: T },
    Del { pos: usize },
}

impl<T> ListOp<T> {
    pub fn new_insert(pos: usize, content: T) -> Self {
        ListOp::Ins { pos, content }
    }

    pub fn new_delete(pos: usize) -> Self {
        ListOp::Del { pos }
    }

    pub fn pos(&self) -> usize {
        match self {
            ListOp::Ins { pos, .. } => *pos,
            ListOp::Del { pos } => *pos,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, ListOp::Ins { .. })
    }
}
