//! Serial execution for connection callbacks.
//!
//! Every connection is owned by exactly one serial executor; handlers are
//! never invoked concurrently, which is what lets the rest of the library
//! stay single-threaded (`Rc`/`RefCell`) per connection.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use crate::tty::Task;

/// Something that can run tasks for a connection, in submission order.
pub trait Executor {
    /// Queue a task to run as soon as possible.
    fn execute(&self, task: Task);

    /// Queue a task to run after `delay`.
    fn schedule(&self, task: Task, delay: Duration);
}

struct TaskQueueInner {
    now: Duration,
    ready: VecDeque<Task>,
    timers: Vec<(Duration, Task)>,
}

/// A manually-driven serial executor with a virtual clock.
///
/// Embedders that already have an event loop implement [`Executor`] on top
/// of it; this queue is for tests and for simple blocking servers that
/// drain it between reads. Tasks submitted while the queue is draining run
/// in the same drain.
pub struct TaskQueue {
    inner: RefCell<TaskQueueInner>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(TaskQueueInner {
                now: Duration::ZERO,
                ready: VecDeque::new(),
                timers: Vec::new(),
            }),
        }
    }

    /// Run queued tasks until none are ready. Scheduled tasks whose delay
    /// has not elapsed on the virtual clock stay parked.
    pub fn run_until_idle(&self) {
        loop {
            // release the borrow before running so a task can enqueue more
            let task = self.inner.borrow_mut().ready.pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Advance the virtual clock, promoting due timers, and drain.
    pub fn advance(&self, delta: Duration) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.now += delta;
            let now = inner.now;
            let mut due: Vec<(Duration, Task)> = Vec::new();
            let mut remaining: Vec<(Duration, Task)> = Vec::new();
            for (deadline, task) in inner.timers.drain(..) {
                if deadline <= now {
                    due.push((deadline, task));
                } else {
                    remaining.push((deadline, task));
                }
            }
            due.sort_by_key(|(deadline, _)| *deadline);
            inner.timers = remaining;
            for (_, task) in due {
                inner.ready.push_back(task);
            }
        }
        self.run_until_idle();
    }

    /// Tasks waiting to run, immediate and scheduled.
    pub fn pending(&self) -> usize {
        let inner = self.inner.borrow();
        inner.ready.len() + inner.timers.len()
    }
}

impl Executor for TaskQueue {
    fn execute(&self, task: Task) {
        self.inner.borrow_mut().ready.push_back(task);
    }

    fn schedule(&self, task: Task, delay: Duration) {
        let deadline = self.inner.borrow().now + delay;
        self.inner.borrow_mut().timers.push((deadline, task));
    }
}
