// src/fetch/work_queue.rs
//! Shared task queue and per-task result slots for one batch.

use crossbeam::deque::{Injector, Steal};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// One-way cancellation signal for a batch.
///
/// Can be polled with [`is_cancelled`](Self::is_cancelled) or awaited with
/// [`cancelled`](Self::cancelled), so a task sleeping between attempts wakes
/// up as soon as the batch is cancelled.
#[derive(Debug, Default)]
pub struct Cancellation {
    flag: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        loop {
            // Register before checking the flag so a concurrent cancel
            // cannot slip in between.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.notify.notified());
        }
    }
}

/// FIFO queue of task indices shared by every worker of a batch.
///
/// The queue is filled once up front; workers pop until it is empty or the
/// batch is cancelled. Cancellation only stops tasks that have not started.
pub struct TaskQueue {
    injector: Injector<usize>,
    /// Number of task indices handed out so far
    started: AtomicUsize,
    cancellation: Cancellation,
}

impl TaskQueue {
    /// Creates a queue holding the indices `0..task_count`.
    pub fn new(task_count: usize) -> Self {
        let injector = Injector::new();
        for index in 0..task_count {
            injector.push(index);
        }
        Self {
            injector,
            started: AtomicUsize::new(0),
            cancellation: Cancellation::new(),
        }
    }

    /// Takes the next task index, or `None` once the queue is drained or
    /// cancelled.
    pub fn next_task(&self) -> Option<usize> {
        loop {
            if self.is_cancelled() {
                return None;
            }
            match self.injector.steal() {
                Steal::Success(index) => {
                    self.started.fetch_add(1, Ordering::SeqCst);
                    return Some(index);
                }
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    /// Stops handing out tasks and wakes running tasks waiting to retry.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Signal watched by running tasks between attempts.
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

/// One pre-allocated result slot per task.
///
/// Each slot has a single writer (the worker that took the task), so the
/// per-slot lock is never contended.
pub struct OutcomeSlots<T> {
    slots: Vec<Mutex<Option<T>>>,
}

impl<T> OutcomeSlots<T> {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Stores the outcome for `index`. Returns `false` if the slot was
    /// already filled, which would mean a task ran twice.
    pub fn fill(&self, index: usize, value: T) -> bool {
        match self.slots.get(index) {
            Some(slot) => {
                let mut slot = slot.lock();
                if slot.is_some() {
                    return false;
                }
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Takes every slot's content, leaving the slots empty.
    pub fn take_all(&self) -> Vec<Option<T>> {
        self.slots.iter().map(|slot| slot.lock().take()).collect()
    }
}
