use std::fmt;

use serde::{Deserialize, Serialize};

use crate::member::{same_member, MemberHandle};

/// Hold latch of a closed arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Latch {
    Free,
    Held,
    /// Held, and a sweep arrived while held. Replayed on release.
    SweepPending,
}

/// Lifecycle of a live arena. A resolved arena is simply gone from the registry.
///
/// A pending sweep can only exist on a closed, held arena; `Open` never
/// carries one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArenaPhase {
    Open { held: bool },
    Closed(Latch),
}

impl Default for ArenaPhase {
    fn default() -> Self {
        ArenaPhase::Open { held: false }
    }
}

impl ArenaPhase {
    #[inline]
    pub fn is_open(self) -> bool {
        matches!(self, ArenaPhase::Open { .. })
    }

    #[inline]
    pub fn is_held(self) -> bool {
        match self {
            ArenaPhase::Open { held } => held,
            ArenaPhase::Closed(latch) => latch != Latch::Free,
        }
    }

    #[inline]
    pub fn has_pending_sweep(self) -> bool {
        self == ArenaPhase::Closed(Latch::SweepPending)
    }

    #[must_use]
    pub fn closed(self) -> Self {
        match self {
            ArenaPhase::Open { held: true } => ArenaPhase::Closed(Latch::Held),
            ArenaPhase::Open { held: false } => ArenaPhase::Closed(Latch::Free),
            closed => closed,
        }
    }

    #[must_use]
    pub fn held(self) -> Self {
        match self {
            ArenaPhase::Open { .. } => ArenaPhase::Open { held: true },
            ArenaPhase::Closed(Latch::Free) => ArenaPhase::Closed(Latch::Held),
            held => held,
        }
    }

    #[must_use]
    pub fn released(self) -> Self {
        match self {
            ArenaPhase::Open { .. } => ArenaPhase::Open { held: false },
            ArenaPhase::Closed(_) => ArenaPhase::Closed(Latch::Free),
        }
    }

    /// Only a closed, held arena can defer a sweep; anything else is unchanged.
    #[must_use]
    pub fn with_pending_sweep(self) -> Self {
        match self {
            ArenaPhase::Closed(Latch::Held | Latch::SweepPending) => {
                ArenaPhase::Closed(Latch::SweepPending)
            }
            other => other,
        }
    }
}

/// Per-pointer arbitration state.
#[derive(Clone, Debug)]
pub(crate) struct Arena {
    /// Distinguishes this arena from a later one on the same pointer.
    pub(crate) serial: u64,
    /// Registration order.
    pub(crate) members: Vec<MemberHandle>,
    pub(crate) phase: ArenaPhase,
    /// Always a current member when set.
    pub(crate) eager_winner: Option<MemberHandle>,
}

impl Arena {
    pub(crate) fn new(serial: u64) -> Self {
        Self {
            serial,
            members: Vec::new(),
            phase: ArenaPhase::default(),
            eager_winner: None,
        }
    }

    pub(crate) fn add(&mut self, member: MemberHandle) {
        debug_assert!(self.phase.is_open(), "gesture arena is already closed");
        debug_assert!(
            !self.contains(&member),
            "member {member:?} is already registered in this gesture arena"
        );
        self.members.push(member);
    }

    pub(crate) fn contains(&self, member: &MemberHandle) -> bool {
        self.members.iter().any(|m| same_member(m, member))
    }

    pub(crate) fn remove(&mut self, member: &MemberHandle) {
        self.members.retain(|m| !same_member(m, member));
        if self.is_eager_winner(member) {
            self.eager_winner = None;
        }
    }

    /// First declaration while open takes the slot; later ones are ignored.
    pub(crate) fn record_eager_winner(&mut self, member: &MemberHandle) {
        if self.eager_winner.is_none() {
            self.eager_winner = Some(MemberHandle::clone(member));
        }
    }

    pub(crate) fn is_eager_winner(&self, member: &MemberHandle) -> bool {
        self.eager_winner
            .as_ref()
            .is_some_and(|winner| same_member(winner, member))
    }
}

impl fmt::Display for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            f.write_str("<empty>")?;
        } else {
            for (i, member) in self.members.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{member:?}")?;
                if self.is_eager_winner(member) {
                    f.write_str(" (eager winner)")?;
                }
            }
        }

        if self.phase.is_open() {
            f.write_str(" [open]")?;
        }
        if self.phase.is_held() {
            f.write_str(" [held]")?;
        }
        if self.phase.has_pending_sweep() {
            f.write_str(" [hasPendingSweep]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::GestureArenaMember;
    use crate::pointer::PointerId;
    use std::rc::Rc;

    struct Named(&'static str);

    impl fmt::Debug for Named {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl GestureArenaMember for Named {
        fn accept_gesture(&self, _pointer: PointerId) -> anyhow::Result<()> {
            Ok(())
        }

        fn reject_gesture(&self, _pointer: PointerId) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn member(name: &'static str) -> MemberHandle {
        Rc::new(Named(name))
    }

    #[test]
    fn phase_transitions() {
        let open = ArenaPhase::default();
        assert!(open.is_open());
        assert!(!open.is_held());

        let held_open = open.held();
        assert_eq!(held_open, ArenaPhase::Open { held: true });
        // Pending sweep is not representable while open.
        assert_eq!(held_open.with_pending_sweep(), held_open);

        let closed = held_open.closed();
        assert_eq!(closed, ArenaPhase::Closed(Latch::Held));
        assert_eq!(closed.closed(), closed);

        let pending = closed.with_pending_sweep();
        assert!(pending.has_pending_sweep());
        assert!(pending.is_held());
        assert_eq!(pending.held(), pending);

        let released = pending.released();
        assert_eq!(released, ArenaPhase::Closed(Latch::Free));
        assert!(!released.has_pending_sweep());
        assert_eq!(released.with_pending_sweep(), released);
    }

    #[test]
    fn first_eager_declaration_keeps_the_slot() {
        let (a, b) = (member("a"), member("b"));
        let mut arena = Arena::new(1);
        arena.add(Rc::clone(&a));
        arena.add(Rc::clone(&b));

        arena.record_eager_winner(&a);
        arena.record_eager_winner(&b);

        assert!(arena.is_eager_winner(&a));
        assert!(!arena.is_eager_winner(&b));
    }

    #[test]
    fn removing_eager_winner_clears_the_slot() {
        let (a, b) = (member("a"), member("b"));
        let mut arena = Arena::new(1);
        arena.add(Rc::clone(&a));
        arena.add(Rc::clone(&b));
        arena.record_eager_winner(&a);

        arena.remove(&a);

        assert!(arena.eager_winner.is_none());
        assert_eq!(arena.members.len(), 1);
        assert!(arena.contains(&b));
    }

    #[test]
    fn display_marks_winner_and_flags() {
        let (a, b) = (member("tap"), member("drag"));
        let mut arena = Arena::new(1);
        assert_eq!(arena.to_string(), "<empty> [open]");

        arena.add(Rc::clone(&a));
        arena.add(Rc::clone(&b));
        arena.record_eager_winner(&b);
        arena.phase = arena.phase.held().closed().with_pending_sweep();

        assert_eq!(
            arena.to_string(),
            "tap, drag (eager winner) [held] [hasPendingSweep]"
        );
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "already closed")]
    fn adding_to_closed_arena_is_a_bug() {
        let mut arena = Arena::new(1);
        arena.phase = arena.phase.closed();
        arena.add(member("late"));
    }
}
