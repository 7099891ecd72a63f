//! gesture_arena_dispatch
//!
//! Host-facing orchestration layer for `gesture_arena_core`.
//!
//! Responsibilities:
//! - own the arena manager and its deferred queue
//! - turn the pointer lifecycle into add / close / sweep calls
//! - route events to the handlers that joined a pointer
//! - flush deferred work once per processed batch
//!
//! Non-goals:
//! - no IO
//! - no async
//! - no gesture interpretation (lives in the recognizers)

pub mod adapter;
pub mod dispatcher;

pub use adapter::{HandlerHandle, PointerEvent, PointerHandler, PointerPhase};

pub use dispatcher::{BatchStats, GestureDispatcher};
