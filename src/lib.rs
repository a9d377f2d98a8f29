//! # reglist
//!
//! A replayable event-graph list CRDT.
//!
//! The crate keeps a grow-only log of character-level insert / delete
//! operations ([`ListOpLog`]), each stamped with an `(agent, seq)` identifier
//! and a set of causal parents. The document state at any version is computed
//! by replaying the log through a Fugue / Sync9 style sequence CRDT. Two
//! peers which have seen the same set of operations will always produce
//! byte-identical documents, no matter what order the operations arrived in.
//!
//! ```
//! use reglist::ListOpLog;
//!
//! let mut oplog: ListOpLog<char> = ListOpLog::new();
//! let seph = oplog.get_or_create_agent_id("seph");
//! oplog.local_insert(seph, 0, 'h');
//! oplog.local_insert(seph, 1, 'i');
//!
//! assert_eq!(oplog.checkout_simple().unwrap(), vec!['h', 'i']);
//! ```
//!
//! Versions come in two flavours:
//!
//! - A **local version** ([`LV`]) is a `usize` assigned in log-append order.
//!   Local versions are compact and fast, but they're meaningless outside the
//!   process which assigned them.
//! - A **remote version** ([`RemoteVersion`]) is an `(agent, seq)` pair.
//!   These are stable across peers, and they're what goes over the wire.
//!
//! The [`causalgraph`] module maps between the two and answers graph queries
//! (diff, dominators, conflict walks). The [`list`] module owns the
//! operations themselves, and `merge` hosts the replay engine.

pub mod rle;
mod lvrange;
mod frontier;
mod error;
pub mod causalgraph;
pub mod list;
mod merge;

pub use error::OpLogError;
pub use lvrange::LVRange;
pub use frontier::Frontier;
pub use causalgraph::CausalGraph;
pub use causalgraph::remote_ids::{RemoteVersion, RemoteVersionSpan, RemoteFrontier};
pub use causalgraph::summary::VersionSummary;
pub use causalgraph::partial::PartialCGEntry;
pub use list::{ListOpLog, ListBranch};
pub use list::operation::ListOp;

/// A local version. Opaque integers assigned densely, in the order operations
/// were appended to the local oplog. Not portable between peers.
pub type LV = usize;

/// Agents are interned to small integers internally. The mapping back to the
/// agent's name lives in the causal graph.
pub type AgentId = u32;

pub type Result<T> = std::result::Result<T, OpLogError>;
