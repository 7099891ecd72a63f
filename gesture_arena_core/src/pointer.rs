use std::fmt;

use serde::{Deserialize, Serialize};

/// One continuous physical pointer interaction (a finger from down to up).
///
/// Opaque to the arena: the dispatch layer hands these out and guarantees
/// uniqueness among active interactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointerId(pub i64);

impl From<i64> for PointerId {
    #[inline]
    fn from(raw: i64) -> Self {
        PointerId(raw)
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
