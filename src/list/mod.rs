//! The list oplog: operations paired with the causal graph, and branches
//! (materialized documents) computed from them.

pub mod operation;
mod oplog;
mod branch;

#[cfg(test)]
mod fuzzer;

use crate::Frontier;
use crate::causalgraph::CausalGraph;
use crate::list::operation::ListOp;

/// An append-only log of list operations with their causal history.
///
/// This is the shared data structure of the system. Two oplogs can always be
/// merged, and any version of the document can be checked out from one.
#[derive(Debug, Clone)]
pub struct ListOpLog<T> {
    pub cg: CausalGraph,

    /// The operation at each local version. Always exactly as long as the
    /// causal graph.
    pub(crate) ops: Vec<ListOp<T>>,
}

/// A materialized document at some version.
///
/// A branch is a value, not a view: it owns its content and can lag
/// arbitrarily far behind the oplog it came from. Catch it up with
/// [`ListBranch::merge_from`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListBranch<T> {
    /// The document content at `version`.
    pub content: Vec<T>,

    /// The version of the oplog this branch has incorporated.
    pub version: Frontier,
}
