//! Gesture arena manager.
//!
//! Owns one arena per active pointer and decides which of the competing
//! members wins it. Members learn the outcome through exactly one
//! `accept_gesture` / `reject_gesture` call each.
//!
//! Single-threaded. Member callbacks may re-enter the manager, so no
//! registry borrow is ever held across a callback, and a winning arena is
//! removed from the registry before any of its members are notified.
//! Continuations that run after a callback re-look-up the arena by
//! `(pointer, serial)` and stop if it was finalized or replaced meanwhile.
//! Diagnostics format member `Debug` output, which may call back into the
//! manager, so they are emitted only after the registry borrow is released.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::cfg::ArenaCfg;
use crate::entry::ArenaEntry;
use crate::fault::{panic_message, ArenaFault, Callback};
use crate::member::{same_member, GestureDisposition, MemberHandle};
use crate::pointer::PointerId;
use crate::queue::DeferredQueue;
use crate::snapshot::{ArenaSnapshot, ArenaSummary};
use crate::state::Arena;

#[derive(Debug, Default)]
struct Registry {
    arenas: HashMap<PointerId, Arena>,
    next_serial: u64,
}

impl Registry {
    fn get(&self, pointer: PointerId, serial: u64) -> Option<&Arena> {
        self.arenas.get(&pointer).filter(|arena| arena.serial == serial)
    }

    fn get_mut(&mut self, pointer: PointerId, serial: u64) -> Option<&mut Arena> {
        self.arenas
            .get_mut(&pointer)
            .filter(|arena| arena.serial == serial)
    }

    /// Remove the arena only if it is still the one identified by `serial`.
    fn take(&mut self, pointer: PointerId, serial: u64) -> Option<Arena> {
        self.get(pointer, serial)?;
        self.arenas.remove(&pointer)
    }
}

#[derive(Debug)]
pub struct GestureArenaManager {
    registry: RefCell<Registry>,
    queue: Rc<DeferredQueue>,
    cfg: ArenaCfg,
    this: Weak<GestureArenaManager>,
}

impl GestureArenaManager {
    /// Default wins are scheduled on `queue`; the host must flush it once
    /// per processed input batch.
    pub fn new(queue: Rc<DeferredQueue>, cfg: ArenaCfg) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            registry: RefCell::default(),
            queue,
            cfg,
            this: this.clone(),
        })
    }

    pub fn with_defaults(queue: Rc<DeferredQueue>) -> Rc<Self> {
        Self::new(queue, ArenaCfg::default())
    }

    pub fn cfg(&self) -> &ArenaCfg {
        &self.cfg
    }

    pub fn queue(&self) -> &Rc<DeferredQueue> {
        &self.queue
    }

    /// Register `member` as a competitor for `pointer`, opening the arena if needed.
    ///
    /// The arena must still be open.
    pub fn add(&self, pointer: PointerId, member: MemberHandle) -> ArenaEntry {
        let (serial, opened) = {
            let mut guard = self.registry.borrow_mut();
            let Registry { arenas, next_serial } = &mut *guard;
            let mut opened = false;
            let arena = arenas.entry(pointer).or_insert_with(|| {
                *next_serial += 1;
                opened = true;
                Arena::new(*next_serial)
            });
            arena.add(Rc::clone(&member));
            (arena.serial, opened)
        };
        if opened {
            self.trace(pointer, format_args!("★ Opening new gesture arena."), None);
        }
        self.trace(pointer, format_args!("Adding: {member:?}"), None);
        ArenaEntry::new(self.this.clone(), pointer, serial, &member)
    }

    /// No more members will join. Resolves at once if the outcome is already decided.
    pub fn close(&self, pointer: PointerId) {
        let (serial, shown) = {
            let mut registry = self.registry.borrow_mut();
            let Some(arena) = registry.arenas.get_mut(&pointer) else {
                return;
            };
            arena.phase = arena.phase.closed();
            (arena.serial, self.capture(arena))
        };
        self.trace(pointer, format_args!("Closing"), shown.as_ref());
        self.try_to_resolve(pointer, serial);
    }

    /// Force a closed arena to finish: the first member wins, the rest lose.
    ///
    /// Deferred until `release` while the arena is held.
    pub fn sweep(&self, pointer: PointerId) {
        let delayed = {
            let mut registry = self.registry.borrow_mut();
            let Some(arena) = registry.arenas.get_mut(&pointer) else {
                return;
            };
            debug_assert!(!arena.phase.is_open(), "cannot sweep an open gesture arena");
            if arena.phase.is_held() {
                arena.phase = arena.phase.with_pending_sweep();
                Some(self.capture(arena))
            } else {
                None
            }
        };
        if let Some(shown) = delayed {
            self.trace(pointer, format_args!("Delaying sweep"), shown.as_ref());
            return;
        }

        let swept = self.registry.borrow_mut().arenas.remove(&pointer);
        let Some(arena) = swept else {
            return;
        };
        self.trace(pointer, format_args!("Sweeping"), Some(&arena));
        let mut members = arena.members.into_iter();
        if let Some(winner) = members.next() {
            self.trace(pointer, format_args!("Winner: {winner:?}"), None);
            notify(pointer, &winner, Callback::Accept);
            for loser in members {
                notify(pointer, &loser, Callback::Reject);
            }
        }
    }

    /// Postpone any sweep until `release`.
    pub fn hold(&self, pointer: PointerId) {
        let shown = {
            let mut registry = self.registry.borrow_mut();
            let Some(arena) = registry.arenas.get_mut(&pointer) else {
                return;
            };
            arena.phase = arena.phase.held();
            self.capture(arena)
        };
        self.trace(pointer, format_args!("Holding"), shown.as_ref());
    }

    /// Lift a hold, replaying a sweep that arrived while held.
    pub fn release(&self, pointer: PointerId) {
        let (pending_sweep, shown) = {
            let mut registry = self.registry.borrow_mut();
            let Some(arena) = registry.arenas.get_mut(&pointer) else {
                return;
            };
            let pending = arena.phase.has_pending_sweep();
            arena.phase = arena.phase.released();
            (pending, self.capture(arena))
        };
        self.trace(pointer, format_args!("Releasing"), shown.as_ref());
        if pending_sweep {
            self.sweep(pointer);
        }
    }

    /// Drop the arena for `pointer` without a winner, rejecting every member.
    ///
    /// For hosts that will never close or sweep a pointer (lost up event,
    /// torn-down surface); otherwise the arena stays in the registry forever.
    pub fn abandon(&self, pointer: PointerId) {
        let taken = self.registry.borrow_mut().arenas.remove(&pointer);
        let Some(arena) = taken else {
            return;
        };
        self.trace(pointer, format_args!("Abandoning"), Some(&arena));
        for member in &arena.members {
            notify(pointer, member, Callback::Reject);
        }
    }

    pub fn contains(&self, pointer: PointerId) -> bool {
        self.registry.borrow().arenas.contains_key(&pointer)
    }

    /// Number of live arenas.
    pub fn len(&self) -> usize {
        self.registry.borrow().arenas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.borrow().arenas.is_empty()
    }

    /// Deterministic ordering: arenas are returned sorted by pointer.
    pub fn snapshot(&self) -> ArenaSnapshot {
        let registry = self.registry.borrow();
        let mut arenas: Vec<ArenaSummary> = registry
            .arenas
            .iter()
            .map(|(pointer, arena)| ArenaSummary {
                pointer: *pointer,
                members: arena.members.len(),
                has_eager_winner: arena.eager_winner.is_some(),
                phase: arena.phase,
            })
            .collect();
        arenas.sort_by_key(|summary| summary.pointer);
        ArenaSnapshot { arenas }
    }

    /// Entry point for [`ArenaEntry::resolve`].
    ///
    /// A no-op once the arena identified by `serial` has been finalized,
    /// including when `pointer` already hosts a newer arena.
    pub(crate) fn resolve(
        &self,
        pointer: PointerId,
        serial: u64,
        member: &MemberHandle,
        disposition: GestureDisposition,
    ) {
        let was_open = {
            let mut registry = self.registry.borrow_mut();
            let Some(arena) = registry.get_mut(pointer, serial) else {
                return;
            };
            debug_assert!(
                arena.contains(member),
                "member {member:?} is not in the gesture arena for pointer {pointer}"
            );

            match disposition {
                GestureDisposition::Rejected => arena.remove(member),
                GestureDisposition::Accepted if arena.phase.is_open() => {
                    arena.record_eager_winner(member)
                }
                GestureDisposition::Accepted => {}
            }
            arena.phase.is_open()
        };
        let verb = match disposition {
            GestureDisposition::Accepted => "Accepting",
            GestureDisposition::Rejected => "Rejecting",
        };
        self.trace(pointer, format_args!("{verb}: {member:?}"), None);

        match disposition {
            GestureDisposition::Rejected => {
                notify(pointer, member, Callback::Reject);
                if self.is_closed(pointer, serial) {
                    self.try_to_resolve(pointer, serial);
                }
            }
            GestureDisposition::Accepted if was_open => {}
            GestureDisposition::Accepted => {
                self.trace(pointer, format_args!("Self-declared winner: {member:?}"), None);
                self.resolve_in_favor_of(pointer, serial, member);
            }
        }
    }

    fn is_closed(&self, pointer: PointerId, serial: u64) -> bool {
        self.registry
            .borrow()
            .get(pointer, serial)
            .is_some_and(|arena| !arena.phase.is_open())
    }

    fn try_to_resolve(&self, pointer: PointerId, serial: u64) {
        let eager_winner = {
            let mut registry = self.registry.borrow_mut();
            let Some(arena) = registry.get_mut(pointer, serial) else {
                return;
            };
            debug_assert!(!arena.phase.is_open());
            let count = arena.members.len();
            let eager_winner = arena.eager_winner.clone();

            if count == 1 {
                drop(registry);
                self.schedule_default(pointer, serial);
                return;
            }
            if count == 0 {
                registry.arenas.remove(&pointer);
                drop(registry);
                self.trace(pointer, format_args!("Arena empty."), None);
                return;
            }
            let Some(winner) = eager_winner else {
                return;
            };
            winner
        };
        self.trace(pointer, format_args!("Eager winner: {eager_winner:?}"), None);
        self.resolve_in_favor_of(pointer, serial, &eager_winner);
    }

    // A sole survivor only wins once the current synchronous pass is over,
    // giving it a last chance to reject itself.
    fn schedule_default(&self, pointer: PointerId, serial: u64) {
        let this = self.this.clone();
        self.queue.schedule(move || {
            if let Some(manager) = this.upgrade() {
                manager.resolve_by_default(pointer, serial);
            }
            Ok(())
        });
    }

    fn resolve_by_default(&self, pointer: PointerId, serial: u64) {
        let taken = self.registry.borrow_mut().take(pointer, serial);
        let Some(arena) = taken else {
            return;
        };
        debug_assert!(!arena.phase.is_open());
        debug_assert_eq!(arena.members.len(), 1);

        let Some(winner) = arena.members.into_iter().next() else {
            return;
        };
        self.trace(pointer, format_args!("Default winner: {winner:?}"), None);
        notify(pointer, &winner, Callback::Accept);
    }

    // Removal comes first so re-entrant calls from the callbacks below see
    // no arena; accept goes last so the loser bookkeeping is already done if
    // the winner starts new pointer activity.
    fn resolve_in_favor_of(&self, pointer: PointerId, serial: u64, winner: &MemberHandle) {
        let taken = self.registry.borrow_mut().take(pointer, serial);
        let Some(arena) = taken else {
            return;
        };
        debug_assert!(!arena.phase.is_open());

        for loser in arena.members.iter().filter(|m| !same_member(m, winner)) {
            notify(pointer, loser, Callback::Reject);
        }
        notify(pointer, winner, Callback::Accept);
    }

    /// Copy of `arena` for a trace emitted once the registry is released.
    fn capture(&self, arena: &Arena) -> Option<Arena> {
        self.cfg.debug_diagnostics.then(|| arena.clone())
    }

    fn trace(&self, pointer: PointerId, message: fmt::Arguments<'_>, arena: Option<&Arena>) {
        if !self.cfg.debug_diagnostics {
            return;
        }
        match arena {
            Some(arena) => tracing::debug!(
                target: "gesture_arena",
                pointer = pointer.0,
                members = arena.members.len(),
                state = %arena,
                "{message}"
            ),
            None => tracing::debug!(target: "gesture_arena", pointer = pointer.0, "{message}"),
        }
    }
}

/// Invoke a member callback; failures and panics are logged and absorbed.
fn notify(pointer: PointerId, member: &MemberHandle, callback: Callback) {
    let outcome = catch_unwind(AssertUnwindSafe(|| match callback {
        Callback::Accept => member.accept_gesture(pointer),
        Callback::Reject => member.reject_gesture(pointer),
    }));

    let fault = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(err)) => ArenaFault::CallbackFailed {
            pointer,
            callback,
            member: format!("{member:?}"),
            message: format!("{err:#}"),
        },
        Err(payload) => ArenaFault::CallbackPanicked {
            pointer,
            callback,
            member: format!("{member:?}"),
            message: panic_message(payload.as_ref()),
        },
    };
    tracing::error!(target: "gesture_arena", error = %fault, "gesture arena member callback failed");
}
