//! gesture_arena_core
//!
//! Arbitration among gesture recognizers competing for the same pointer:
//! every member that joins a pointer's arena ends up with exactly one
//! accept or reject, and at most one member is accepted.
//!
//! Two pieces:
//! - [`DeferredQueue`]: intra-frame deferred tasks, flushed by the host
//! - [`GestureArenaManager`]: per-pointer arenas, driven by the dispatch layer
//!
//! Single-threaded, no IO, no async.

pub mod cfg;
pub mod entry;
pub mod fault;
pub mod manager;
pub mod member;
pub mod pointer;
pub mod queue;
pub mod snapshot;
pub mod state;

pub use cfg::ArenaCfg;
pub use entry::ArenaEntry;
pub use fault::{ArenaFault, Callback};
pub use manager::GestureArenaManager;
pub use member::{GestureArenaMember, GestureDisposition, MemberHandle};
pub use pointer::PointerId;
pub use queue::{DeferredQueue, DeferredTask, FlushStats};
pub use snapshot::{ArenaSnapshot, ArenaSummary};
pub use state::{ArenaPhase, Latch};
