use std::fmt;
use std::rc::{Rc, Weak};

use crate::manager::GestureArenaManager;
use crate::member::{GestureArenaMember, GestureDisposition, MemberHandle};
use crate::pointer::PointerId;

/// Capability handed to a member when it joins an arena.
///
/// Resolving through the entry is the only way a member affects its own
/// standing. The entry is bound to the arena it joined, not just the pointer:
/// once that arena is finalized, `resolve` does nothing even if the pointer
/// id has been reused. Only weak references are held, so a dropped manager
/// or member also makes `resolve` a no-op.
#[derive(Clone)]
pub struct ArenaEntry {
    manager: Weak<GestureArenaManager>,
    pointer: PointerId,
    serial: u64,
    member: Weak<dyn GestureArenaMember>,
}

impl ArenaEntry {
    pub(crate) fn new(
        manager: Weak<GestureArenaManager>,
        pointer: PointerId,
        serial: u64,
        member: &MemberHandle,
    ) -> Self {
        Self {
            manager,
            pointer,
            serial,
            member: Rc::downgrade(member),
        }
    }

    #[inline]
    pub fn pointer(&self) -> PointerId {
        self.pointer
    }

    pub fn resolve(&self, disposition: GestureDisposition) {
        let (Some(manager), Some(member)) = (self.manager.upgrade(), self.member.upgrade()) else {
            return;
        };
        manager.resolve(self.pointer, self.serial, &member, disposition);
    }
}

impl fmt::Debug for ArenaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaEntry")
            .field("pointer", &self.pointer)
            .field("serial", &self.serial)
            .field("member", &self.member.upgrade())
            .finish()
    }
}
