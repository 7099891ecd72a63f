//! Pointer-event adapter layer: the shapes a host feeds the dispatcher, and
//! the seam recognizers implement to be routed events.
//!
//! Policy-light:
//! - No IO
//! - No gesture interpretation
//!
//! Recognizers decide for themselves whether to compete for a pointer and
//! when to resolve their arena entry.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use gesture_arena_core::{GestureArenaManager, PointerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw pointer event from the windowing layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub pointer: PointerId,
    pub phase: PointerPhase,
    /// Logical position, passed through untouched.
    pub position: (f32, f32),
}

impl PointerEvent {
    pub fn new(pointer: impl Into<PointerId>, phase: PointerPhase) -> Self {
        Self {
            pointer: pointer.into(),
            phase,
            position: (0.0, 0.0),
        }
    }

    pub fn down(pointer: impl Into<PointerId>) -> Self {
        Self::new(pointer, PointerPhase::Down)
    }

    pub fn moved(pointer: impl Into<PointerId>) -> Self {
        Self::new(pointer, PointerPhase::Move)
    }

    pub fn up(pointer: impl Into<PointerId>) -> Self {
        Self::new(pointer, PointerPhase::Up)
    }

    pub fn cancel(pointer: impl Into<PointerId>) -> Self {
        Self::new(pointer, PointerPhase::Cancel)
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = (x, y);
        self
    }

    /// Up and Cancel both end the interaction.
    #[inline]
    pub fn ends_interaction(&self) -> bool {
        matches!(self.phase, PointerPhase::Up | PointerPhase::Cancel)
    }
}

/// Trait: something that wants to see pointer interactions.
///
/// A gesture recognizer typically implements this alongside
/// `GestureArenaMember` and calls `arena.add(..)` from `add_pointer`.
pub trait PointerHandler {
    /// Offered every new pointer on Down, before the arena closes.
    /// Return `true` to be routed the rest of this interaction.
    fn add_pointer(&self, event: &PointerEvent, arena: &Rc<GestureArenaManager>) -> bool;

    /// Called for every event of an interaction this handler accepted,
    /// including the Down that started it.
    fn handle_event(&self, event: &PointerEvent);
}

pub type HandlerHandle = Rc<dyn PointerHandler>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_phase_and_pointer() {
        let ev = PointerEvent::moved(4).with_position(1.5, -2.0);
        assert_eq!(ev.pointer, PointerId(4));
        assert_eq!(ev.phase, PointerPhase::Move);
        assert_eq!(ev.position, (1.5, -2.0));
        assert!(!ev.ends_interaction());
    }

    #[test]
    fn up_and_cancel_end_the_interaction() {
        assert!(PointerEvent::up(1).ends_interaction());
        assert!(PointerEvent::cancel(1).ends_interaction());
        assert!(!PointerEvent::down(1).ends_interaction());
    }
}
