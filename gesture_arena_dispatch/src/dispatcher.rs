//! Gesture dispatcher.
//!
//! The host-facing orchestration layer around `gesture_arena_core`:
//! - owns the arena manager and the deferred queue
//! - offers each new pointer to the registered handlers
//! - routes pointer events to the handlers that took the pointer
//! - drives close / sweep from the pointer lifecycle
//! - flushes the deferred queue once per batch
//!
//! No IO. No async. One thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use gesture_arena_core::{
    ArenaCfg, ArenaSnapshot, DeferredQueue, FlushStats, GestureArenaManager, PointerId,
};

use crate::adapter::{HandlerHandle, PointerEvent, PointerPhase};

/// Counters for one processed batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub events: usize,
    /// Handler invocations across the batch.
    pub routed: usize,
    pub flushed: FlushStats,
}

pub struct GestureDispatcher {
    arena: Rc<GestureArenaManager>,
    queue: Rc<DeferredQueue>,
    handlers: Vec<HandlerHandle>,
    routes: RefCell<HashMap<PointerId, Vec<HandlerHandle>>>,
}

impl GestureDispatcher {
    pub fn new(cfg: ArenaCfg) -> Self {
        let queue = Rc::new(DeferredQueue::new());
        let arena = GestureArenaManager::new(Rc::clone(&queue), cfg);
        Self {
            arena,
            queue,
            handlers: Vec::new(),
            routes: RefCell::default(),
        }
    }

    pub fn arena(&self) -> &Rc<GestureArenaManager> {
        &self.arena
    }

    pub fn queue(&self) -> &Rc<DeferredQueue> {
        &self.queue
    }

    /// Handlers are offered new pointers in registration order.
    pub fn add_handler(&mut self, handler: HandlerHandle) {
        self.handlers.push(handler);
    }

    /// Pointers with an interaction in progress, sorted.
    pub fn active_pointers(&self) -> Vec<PointerId> {
        let mut pointers: Vec<PointerId> = self.routes.borrow().keys().copied().collect();
        pointers.sort();
        pointers
    }

    pub fn snapshot(&self) -> ArenaSnapshot {
        self.arena.snapshot()
    }

    /// Process a batch of events in order, then flush deferred work once.
    ///
    /// Deterministic for a given input ordering.
    pub fn dispatch_batch(&self, events: &[PointerEvent]) -> BatchStats {
        let mut stats = BatchStats {
            events: events.len(),
            ..BatchStats::default()
        };
        for event in events {
            stats.routed += self.handle_event(event);
        }
        stats.flushed = self.flush();
        stats
    }

    /// Process one event without flushing. Returns how many handlers saw it.
    pub fn handle_event(&self, event: &PointerEvent) -> usize {
        match event.phase {
            PointerPhase::Down => {
                self.discard_unfinished(event.pointer);
                let taken: Vec<HandlerHandle> = self
                    .handlers
                    .iter()
                    .filter(|handler| handler.add_pointer(event, &self.arena))
                    .cloned()
                    .collect();
                self.routes.borrow_mut().insert(event.pointer, taken);
                let routed = self.route(event, false);
                self.arena.close(event.pointer);
                routed
            }
            PointerPhase::Move => self.route(event, false),
            PointerPhase::Up | PointerPhase::Cancel => {
                let routed = self.route(event, true);
                self.arena.sweep(event.pointer);
                routed
            }
        }
    }

    pub fn flush(&self) -> FlushStats {
        self.queue.flush()
    }

    // A Down on a pointer whose previous interaction never saw Up or Cancel:
    // the old arena can no longer take members, so its competitors lose.
    fn discard_unfinished(&self, pointer: PointerId) {
        let stale_routes = self.routes.borrow_mut().remove(&pointer);
        if stale_routes.is_none() && !self.arena.contains(pointer) {
            return;
        }
        tracing::warn!(
            target: "gesture_arena",
            pointer = pointer.0,
            "down on a pointer that never ended; abandoning its arena"
        );
        self.arena.abandon(pointer);
    }

    fn route(&self, event: &PointerEvent, finish: bool) -> usize {
        // Handlers may dispatch re-entrantly, so the route table is not
        // borrowed while they run.
        let handlers = if finish {
            self.routes.borrow_mut().remove(&event.pointer)
        } else {
            self.routes.borrow().get(&event.pointer).cloned()
        };
        let Some(handlers) = handlers else {
            tracing::trace!(target: "gesture_arena", pointer = event.pointer.0, "no route");
            return 0;
        };
        for handler in &handlers {
            handler.handle_event(event);
        }
        handlers.len()
    }
}

impl fmt::Debug for GestureDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureDispatcher")
            .field("arena", &self.arena)
            .field("handlers", &self.handlers.len())
            .field("active_pointers", &self.active_pointers())
            .finish()
    }
}

impl Default for GestureDispatcher {
    fn default() -> Self {
        Self::new(ArenaCfg::default())
    }
}
