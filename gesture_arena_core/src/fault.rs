//! Faults absorbed by the arena and the deferred queue.
//!
//! Nothing here is ever returned to a caller. A member callback or deferred
//! task that fails is logged through `tracing` and arbitration carries on.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::pointer::PointerId;

/// Which member callback was being invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Callback {
    Accept,
    Reject,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Accept => f.write_str("accept_gesture"),
            Callback::Reject => f.write_str("reject_gesture"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ArenaFault {
    #[error("{callback} on {member} for pointer {pointer} failed: {message}")]
    CallbackFailed {
        pointer: PointerId,
        callback: Callback,
        member: String,
        message: String,
    },

    #[error("{callback} on {member} for pointer {pointer} panicked: {message}")]
    CallbackPanicked {
        pointer: PointerId,
        callback: Callback,
        member: String,
        message: String,
    },

    #[error("deferred task failed: {0}")]
    TaskFailed(String),

    #[error("deferred task panicked: {0}")]
    TaskPanicked(String),
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
