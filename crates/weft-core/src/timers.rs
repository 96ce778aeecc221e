//! A single-threaded timer queue standing in for the host's event loop.
//!
//! Nothing here runs on its own: the host calls [`Timers::run_due`] whenever it
//! wakes up (after sleeping until [`Timers::next_deadline`], on an animation
//! frame, ...). Throttled states and [`Tasks`](crate::Tasks) schedule their
//! deferred work here.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;
use web_time::{Duration, Instant};

use crate::clock::{self, Clock};

new_key_type! {
    pub struct TimerKey;
}

struct TimerEntry {
    deadline: Instant,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct TimerQueue {
    entries: SlotMap<TimerKey, TimerEntry>,
    next_seq: u64,
}

#[derive(Clone)]
pub struct Timers {
    queue: Rc<RefCell<TimerQueue>>,
    clock: Rc<dyn Clock>,
}

impl Timers {
    pub fn new(clock: impl Clock) -> Self {
        Self::with_clock(Rc::new(clock))
    }

    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            queue: Rc::new(RefCell::new(TimerQueue::default())),
            clock,
        }
    }

    /// Timers driven by the wall clock.
    pub fn system() -> Self {
        Self::with_clock(clock::system())
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        self.clock.clone()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Schedules `f` to run once `delay` has elapsed.
    pub fn schedule(&self, delay: Duration, f: impl FnOnce() + 'static) -> TimerKey {
        let deadline = self.now() + delay;
        let mut q = self.queue.borrow_mut();
        let seq = q.next_seq;
        q.next_seq += 1;
        q.entries.insert(TimerEntry {
            deadline,
            seq,
            callback: Box::new(f),
        })
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&self, key: TimerKey) -> bool {
        self.queue.borrow_mut().entries.remove(key).is_some()
    }

    pub fn is_pending(&self, key: TimerKey) -> bool {
        self.queue.borrow().entries.contains_key(key)
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().entries.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.borrow().entries.values().map(|e| e.deadline).min()
    }

    /// Runs every timer that is due now, earliest first. Timers scheduled by
    /// those callbacks wait for the next call, even with a zero delay.
    pub fn run_due(&self) -> usize {
        let now = self.now();
        let mut due: SmallVec<[(Instant, u64, TimerKey); 8]> = self
            .queue
            .borrow()
            .entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .map(|(k, e)| (e.deadline, e.seq, k))
            .collect();
        due.sort_unstable();

        let mut ran = 0;
        for (_, _, key) in due {
            // An earlier callback may have cancelled this one.
            let entry = self.queue.borrow_mut().entries.remove(key);
            if let Some(entry) = entry {
                (entry.callback)();
                ran += 1;
            }
        }
        ran
    }
}
