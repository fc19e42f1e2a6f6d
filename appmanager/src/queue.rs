//! Bounded channels standing in for the RTOS counting queues the real
//! guest/controller tasks block on: a bounded channel of a tagged union
//! `{Button, Tick, Quit}`, built on `Mutex` + `Condvar` the way a hosted
//! stand-in for a hardware primitive is built in `boards/host_emulation`
//! (real OS primitives standing in for RTOS ones, e.g. `std::process::Child`
//! for a task).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::ErrorCode;

/// Identifies the click callback resolved from the window subsystem.
pub type ButtonCallback = fn(clickref: usize, context: usize);
/// Identifies the tick callback resolved from the tick service.
pub type TickCallback = fn(tick_time: u64, tick_units: u32);

#[derive(Clone, Copy, Debug)]
pub enum Msg {
    Button { callback: ButtonCallback, clickref: usize, context: usize },
    Tick { callback: TickCallback, tick_time: u64, tick_units: u32 },
    Quit,
}

struct Inner<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

/// A single bounded FIFO channel, generic over its payload so the same
/// implementation serves both `thread_q` (`String`, capacity 1) and
/// `msg_q` (`Msg`, capacity 5).
pub struct BoundedQueue<T> {
    inner: Inner<T>,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedQueue {
            inner: Inner {
                capacity,
                items: Mutex::new(VecDeque::with_capacity(capacity)),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            },
        }
    }

    /// Blocking send with a bounded wait, used by task-context posters
    /// (`start`, `quit`, `post_button`). Times out with `EFull`.
    pub fn send_timeout(&self, item: T, timeout: Duration) -> Result<(), ErrorCode> {
        let deadline = Instant::now() + timeout;
        let mut items = self.inner.items.lock().unwrap();
        while items.len() >= self.inner.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(ErrorCode::EFull);
            }
            let (guard, result) = self.inner.not_full.wait_timeout(items, deadline - now).unwrap();
            items = guard;
            if result.timed_out() && items.len() >= self.inner.capacity {
                return Err(ErrorCode::EFull);
            }
        }
        items.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Non-blocking send for ISR context (`post_tick`). Never suspends;
    /// returns `EFull` immediately if the queue has no room, in which case
    /// the caller drops the event silently.
    pub fn try_send(&self, item: T) -> Result<(), ErrorCode> {
        let mut items = self.inner.items.lock().unwrap();
        if items.len() >= self.inner.capacity {
            return Err(ErrorCode::EFull);
        }
        items.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Bounded receive, used by the event pump's 1-second wait.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut items = self.inner.items.lock().unwrap();
        loop {
            if let Some(item) = items.pop_front() {
                self.inner.not_full.notify_one();
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _result) = self.inner.not_empty.wait_timeout(items, deadline - now).unwrap();
            items = guard;
        }
    }

    /// Infinite-wait receive, used by the controller task blocking on
    /// `thread_q`.
    pub fn recv_blocking(&self) -> T {
        let mut items = self.inner.items.lock().unwrap();
        loop {
            if let Some(item) = items.pop_front() {
                self.inner.not_full.notify_one();
                return item;
            }
            items = self.inner.not_empty.wait(items).unwrap();
        }
    }

    /// Discards any pending items, used on app start to give the new guest
    /// a fresh queue.
    pub fn drain(&self) {
        let mut items = self.inner.items.lock().unwrap();
        items.clear();
        self.inner.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.items.lock().unwrap().len()
    }
}

/// Type alias for the UI event queue handed to a running guest.
pub type MsgQueue = BoundedQueue<Msg>;
