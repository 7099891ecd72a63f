//! Deferred-task queue.
//!
//! A single-threaded FIFO of zero-argument callbacks that run later in the
//! same thread's control flow, when the host calls [`DeferredQueue::flush`]
//! (once per processed input batch). The arena uses it to grant a default
//! win only after the current synchronous pass has finished.
//!
//! No async, no timers: "later" means "at the next flush".

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::fault::{panic_message, ArenaFault};

pub type DeferredTask = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Counters returned by a flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushStats {
    /// Tasks dequeued and run, including ones that failed.
    pub ran: usize,
    /// Tasks that returned `Err` or panicked.
    pub failed: usize,
}

#[derive(Default)]
pub struct DeferredQueue {
    tasks: RefCell<VecDeque<DeferredTask>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. It runs on the next `flush`, after everything already queued.
    pub fn schedule<F>(&self, task: F)
    where
        F: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run queued tasks in FIFO order until the queue is empty.
    ///
    /// Tasks scheduled by a running task are picked up by this same call.
    /// A failing task is logged and does not stop the flush.
    pub fn flush(&self) -> FlushStats {
        let mut stats = FlushStats::default();

        while let Some(task) = self.pop() {
            stats.ran += 1;
            let fault = match catch_unwind(AssertUnwindSafe(task)) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => ArenaFault::TaskFailed(format!("{err:#}")),
                Err(payload) => ArenaFault::TaskPanicked(panic_message(payload.as_ref())),
            };
            stats.failed += 1;
            tracing::error!(target: "gesture_arena", error = %fault, "error executing deferred task");
        }

        stats
    }

    // The borrow ends before the task runs, so tasks may schedule more tasks.
    fn pop(&self) -> Option<DeferredTask> {
        self.tasks.borrow_mut().pop_front()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn journal() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn runs_in_schedule_order() {
        let queue = DeferredQueue::new();
        let log = journal();
        for name in ["a", "b", "c"] {
            let log = Rc::clone(&log);
            queue.schedule(move || {
                log.borrow_mut().push(name);
                Ok(())
            });
        }

        assert_eq!(queue.len(), 3);
        let stats = queue.flush();

        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(stats, FlushStats { ran: 3, failed: 0 });
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_scheduled_during_flush_run_in_same_flush() {
        let queue = Rc::new(DeferredQueue::new());
        let log = journal();

        {
            let inner_queue = Rc::clone(&queue);
            let log = Rc::clone(&log);
            queue.schedule(move || {
                log.borrow_mut().push("outer");
                let log = Rc::clone(&log);
                inner_queue.schedule(move || {
                    log.borrow_mut().push("nested");
                    Ok(())
                });
                Ok(())
            });
        }
        {
            let log = Rc::clone(&log);
            queue.schedule(move || {
                log.borrow_mut().push("second");
                Ok(())
            });
        }

        let stats = queue.flush();
        assert_eq!(*log.borrow(), vec!["outer", "second", "nested"]);
        assert_eq!(stats.ran, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn failures_do_not_stop_the_flush() {
        let queue = DeferredQueue::new();
        let log = journal();

        queue.schedule(|| anyhow::bail!("first task fails"));
        queue.schedule(|| panic!("second task panics"));
        {
            let log = Rc::clone(&log);
            queue.schedule(move || {
                log.borrow_mut().push("survivor");
                Ok(())
            });
        }

        let stats = queue.flush();
        assert_eq!(stats, FlushStats { ran: 3, failed: 2 });
        assert_eq!(*log.borrow(), vec!["survivor"]);
    }

    #[test]
    fn flush_on_empty_queue_is_a_no_op() {
        let queue = DeferredQueue::new();
        assert_eq!(queue.flush(), FlushStats::default());
    }
}
