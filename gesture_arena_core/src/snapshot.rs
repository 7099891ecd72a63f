use serde::{Deserialize, Serialize};

use crate::pointer::PointerId;
use crate::state::ArenaPhase;

/// Diagnostic view of one live arena.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSummary {
    pub pointer: PointerId,
    pub members: usize,
    pub has_eager_winner: bool,
    pub phase: ArenaPhase,
}

/// Snapshot of every live arena, sorted by pointer.
///
/// Pure data for logging and debugging; it cannot be fed back into a manager.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaSnapshot {
    pub arenas: Vec<ArenaSummary>,
}

impl ArenaSnapshot {
    pub fn get(&self, pointer: PointerId) -> Option<&ArenaSummary> {
        self.arenas
            .binary_search_by_key(&pointer, |summary| summary.pointer)
            .ok()
            .map(|idx| &self.arenas[idx])
    }

    pub fn len(&self) -> usize {
        self.arenas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arenas.is_empty()
    }
}
