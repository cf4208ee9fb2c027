//! A bounded, blocking producer/consumer task queue (spec.md ยง4.6).
//!
//! A fixed-capacity ring buffer guarded by one mutex and two condition
//! variables: `not_empty` wakes waiting consumers, `not_full` wakes a
//! waiting producer. `shutdown` broadcasts both so no waiter on either
//! side is stranded, per spec.md ยง9's note that a single-signal design
//! risks a missed wake during shutdown.

use crate::worker::Task;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Capacity of the task queue's ring buffer.
pub const MAX_TASKS: usize = 10;

struct State {
    storage: VecDeque<Task>,
    running: bool,
}

/// The bounded task queue shared between the producer (the REPL) and the
/// worker pool.
pub struct TaskQueue {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl TaskQueue {
    /// Builds an empty, running queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                storage: VecDeque::with_capacity(MAX_TASKS),
                running: true,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Enqueues `task`, blocking while the queue is full. Does nothing if
    /// shutdown has already been requested.
    pub fn enqueue(&self, task: Task) {
        let mut state = self.state.lock().unwrap();
        while state.storage.len() == MAX_TASKS && state.running {
            state = self.not_full.wait(state).unwrap();
        }
        if !state.running {
            return;
        }
        state.storage.push_back(task);
        self.not_empty.notify_one();
    }

    /// Dequeues the next task in FIFO order, blocking while the queue is
    /// empty. Returns `None` once shutdown has been requested and the
    /// queue has drained.
    pub fn dequeue(&self) -> Option<Task> {
        let mut state = self.state.lock().unwrap();
        while state.storage.is_empty() && state.running {
            state = self.not_empty.wait(state).unwrap();
        }
        if state.storage.is_empty() && !state.running {
            return None;
        }
        let task = state.storage.pop_front();
        self.not_full.notify_one();
        task
    }

    /// Signals shutdown: no further tasks will be admitted, and every
    /// waiter on either condition wakes up to observe `running == false`.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::worker::Task;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order_is_preserved() {
        let queue = TaskQueue::new();
        for i in 0..5 {
            queue.enqueue(Task::Touch {
                name: format!("f{i}"),
            });
        }
        for i in 0..5 {
            match queue.dequeue().unwrap() {
                Task::Touch { name } => assert_eq!(name, format!("f{i}")),
                _ => panic!("wrong task variant"),
            }
        }
    }

    #[test]
    fn shutdown_wakes_blocked_consumer() {
        let queue = Arc::new(TaskQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.dequeue())
        };
        // Give the consumer time to block on not_empty.
        thread::sleep(std::time::Duration::from_millis(20));
        queue.shutdown();
        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn shutdown_drops_enqueue_without_blocking_forever() {
        let queue = TaskQueue::new();
        queue.shutdown();
        queue.enqueue(Task::Ls);
        assert!(queue.dequeue().is_none());
    }
}
