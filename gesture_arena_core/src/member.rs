use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::pointer::PointerId;

/// What a member wants for itself when it resolves its entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureDisposition {
    Accepted,
    Rejected,
}

/// A competitor for ownership of a pointer interaction.
///
/// For every pointer it registered on, a member receives exactly one of
/// these calls once the arena finalizes. Members are driven from inside the
/// manager and may call back into it (register on a new pointer, resolve a
/// different entry); the manager never holds arena state across the call.
///
/// Returning `Err` (or panicking) is logged and absorbed; it does not affect
/// how the rest of the arena is resolved.
pub trait GestureArenaMember: fmt::Debug {
    fn accept_gesture(&self, pointer: PointerId) -> anyhow::Result<()>;
    fn reject_gesture(&self, pointer: PointerId) -> anyhow::Result<()>;
}

/// Shared handle to a member. Identity is pointer identity.
pub type MemberHandle = Rc<dyn GestureArenaMember>;

#[inline]
pub(crate) fn same_member(a: &MemberHandle, b: &MemberHandle) -> bool {
    Rc::ptr_eq(a, b)
}
