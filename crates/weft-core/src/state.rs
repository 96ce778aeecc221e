//! # States
//!
//! `State<T>` is a cloneable handle to an observable value. Every write goes
//! through an equality check; a change emits `Previous` (old value and
//! timestamp) and then `State` (new value) on the state's [`Events`] channel.
//!
//! ```rust
//! use weft_core::*;
//!
//! let count = State::new(1);
//! let doubled = State::computed({
//!     let count = count.clone();
//!     move |t| t.get(&count) * 2
//! });
//!
//! count.set(10);
//! assert_eq!(doubled.get(), 20);
//! ```
//!
//! Throttled states still commit every write immediately; only the
//! notification is held back until the window ends, and the last write is
//! always delivered.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::{Duration, Instant};

use crate::clock::{self, Clock};
use crate::source::{Gettable, Subscribable, Tracker, rc_id};
use crate::timers::{TimerKey, Timers};
use crate::{Disposable, Event, Events, Manager, Unsubscribe};

pub type Equality<T> = Rc<dyn Fn(&T, &T) -> bool>;
pub type MergeFn<T> = Rc<dyn Fn(&T, T) -> T>;

/// Nested recomputation deeper than this is treated as a dependency cycle.
const MAX_RECOMPUTE_DEPTH: u32 = 32;

/// Combines a partial update into a full value.
pub trait Merge<P> {
    fn merge(&self, partial: P) -> Self;
}

#[derive(Clone)]
pub struct Throttle {
    pub window: Duration,
    pub timers: Timers,
}

pub struct StateOptions<T> {
    /// `None` means every write notifies.
    pub equality: Option<Equality<T>>,
    /// Applied to every value passed to `set`/`write` before it is compared
    /// and committed.
    pub merge: Option<MergeFn<T>>,
    pub throttle: Option<Throttle>,
    /// Defaults to the throttle's timer clock, or the system clock.
    pub clock: Option<Rc<dyn Clock>>,
}

impl<T: PartialEq + 'static> Default for StateOptions<T> {
    fn default() -> Self {
        Self {
            equality: Some(Rc::new(|a: &T, b: &T| a == b)),
            merge: None,
            throttle: None,
            clock: None,
        }
    }
}

impl<T> Clone for StateOptions<T> {
    fn clone(&self) -> Self {
        Self {
            equality: self.equality.clone(),
            merge: self.merge.clone(),
            throttle: self.throttle.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<T: 'static> StateOptions<T> {
    /// No equality gate: for values without `PartialEq`, or when every write
    /// should notify.
    pub fn unchecked() -> Self {
        Self {
            equality: None,
            merge: None,
            throttle: None,
            clock: None,
        }
    }

    pub fn equality(mut self, f: impl Fn(&T, &T) -> bool + 'static) -> Self {
        self.equality = Some(Rc::new(f));
        self
    }

    pub fn merge(mut self, f: impl Fn(&T, T) -> T + 'static) -> Self {
        self.merge = Some(Rc::new(f));
        self
    }

    pub fn throttle(mut self, window: Duration, timers: &Timers) -> Self {
        self.throttle = Some(Throttle {
            window,
            timers: timers.clone(),
        });
        self
    }

    pub fn clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StateEvent<T> {
    State(T),
    Previous(Instant, T),
    Dispose,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateTopic {
    State,
    Previous,
    Dispose,
}

impl<T: 'static> Event for StateEvent<T> {
    type Topic = StateTopic;

    fn topic(&self) -> StateTopic {
        match self {
            StateEvent::State(_) => StateTopic::State,
            StateEvent::Previous(..) => StateTopic::Previous,
            StateEvent::Dispose => StateTopic::Dispose,
        }
    }
}

pub struct State<T: 'static> {
    inner: Rc<StateInner<T>>,
}

struct StateInner<T: 'static> {
    value: RefCell<T>,
    equality: Option<Equality<T>>,
    merge: Option<MergeFn<T>>,
    throttle: Option<Throttle>,
    clock: Rc<dyn Clock>,
    events: Events<StateEvent<T>>,
    manager: Manager,
    last_sync: Cell<Option<Instant>>,
    flush: Cell<Option<TimerKey>>,
    /// Value subscribers last saw, captured when a throttle window opens.
    notified: RefCell<Option<T>>,
    forced: Cell<bool>,
    disposed: Cell<bool>,
}

impl<T: 'static> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &*self.inner.value.borrow())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> State<T> {
    pub fn new(value: T) -> Self {
        Self::with_options(value, StateOptions::default())
    }

    /// A state derived from others. Dependencies are the sources read through
    /// the tracker during this first evaluation.
    pub fn computed(compute: impl Fn(&Tracker) -> T + 'static) -> Self {
        Self::computed_with_options(compute, StateOptions::default())
    }
}

impl<T: Clone + 'static> State<T> {
    pub fn with_options(value: T, options: StateOptions<T>) -> Self {
        let clock = options
            .clock
            .or_else(|| options.throttle.as_ref().map(|t| t.timers.clock()))
            .unwrap_or_else(clock::system);
        Self {
            inner: Rc::new(StateInner {
                value: RefCell::new(value),
                equality: options.equality,
                merge: options.merge,
                throttle: options.throttle,
                clock,
                events: Events::new(),
                manager: Manager::new(),
                last_sync: Cell::new(None),
                flush: Cell::new(None),
                notified: RefCell::new(None),
                forced: Cell::new(false),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn computed_with_options(
        compute: impl Fn(&Tracker) -> T + 'static,
        options: StateOptions<T>,
    ) -> Self {
        let tracker = Tracker::recording();
        let initial = compute(&tracker);
        let state = Self::with_options(initial, options);
        state.wire(tracker, move |t| Some(compute(t)));
        state
    }

    /// Like [`computed_with_options`](Self::computed_with_options) with a
    /// fallible compute function. A failing first evaluation is returned; a
    /// failing recomputation is logged and the last value is kept.
    pub fn try_computed<E: fmt::Display + 'static>(
        compute: impl Fn(&Tracker) -> Result<T, E> + 'static,
        options: StateOptions<T>,
    ) -> Result<Self, E> {
        let tracker = Tracker::recording();
        let initial = compute(&tracker)?;
        let state = Self::with_options(initial, options);
        state.wire(tracker, move |t| match compute(t) {
            Ok(v) => Some(v),
            Err(err) => {
                log::warn!("state: recompute failed, keeping last value: {err}");
                None
            }
        });
        Ok(state)
    }

    fn wire(&self, tracker: Tracker, recompute: impl Fn(&Tracker) -> Option<T> + 'static) {
        let weak: Weak<StateInner<T>> = Rc::downgrade(&self.inner);
        let depth = Rc::new(Cell::new(0u32));
        let rerun: Rc<dyn Fn()> = Rc::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            if depth.get() >= MAX_RECOMPUTE_DEPTH {
                log::warn!("state: computed state keeps re-triggering itself; skipping recompute");
                return;
            }
            let _guard = DepthGuard::enter(&depth);
            if let Some(next) = recompute(&Tracker::passive()) {
                State { inner }.set(next);
            }
        });
        for unsub in tracker.wire(rerun) {
            self.inner.manager.add(unsub);
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrows the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.inner.value.borrow())
    }

    pub fn set(&self, value: T) {
        self.write(value, false);
    }

    /// Writes `value`; with `force` the change is emitted even if it compares
    /// equal to the current value.
    pub fn write(&self, value: T, force: bool) {
        let next = match &self.inner.merge {
            Some(merge) => {
                let current = self.inner.value.borrow();
                merge(&*current, value)
            }
            None => value,
        };
        self.commit(next, force);
    }

    /// Computes the next value from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.with(f);
        self.set(next);
    }

    /// Applies a partial update through [`Merge`].
    pub fn patch<P>(&self, partial: P)
    where
        T: Merge<P>,
    {
        let next = self.with(|v| v.merge(partial));
        self.commit(next, false);
    }

    /// Commits without applying the merge function.
    pub(crate) fn commit(&self, next: T, force: bool) {
        let inner = &self.inner;
        if !force && self.unchanged(&next) {
            return;
        }
        if self.throttled() {
            if inner.flush.get().is_none() {
                let seen = inner.value.borrow().clone();
                *inner.notified.borrow_mut() = Some(seen);
            }
            if force {
                inner.forced.set(true);
            }
            *inner.value.borrow_mut() = next;
            self.schedule_flush();
            return;
        }

        let now = inner.clock.now();
        inner.last_sync.set(Some(now));
        let previous = inner.value.borrow().clone();
        inner.events.emit(StateEvent::Previous(now, previous));
        *inner.value.borrow_mut() = next.clone();
        inner.events.emit(StateEvent::State(next));
    }

    /// Edits the value in place and notifies subscribers.
    ///
    /// `f` must not read this state.
    pub fn mutate(&self, f: impl FnOnce(&mut T)) {
        self.mutate_with(f, true);
    }

    /// Edits the value in place; notifies only if `sync` is set. The edit is
    /// applied even inside a throttle window.
    pub fn mutate_with(&self, f: impl FnOnce(&mut T), sync: bool) {
        {
            let mut value = self.inner.value.borrow_mut();
            f(&mut *value);
        }
        if !sync {
            return;
        }
        if self.throttled() {
            self.inner.forced.set(true);
            self.schedule_flush();
            return;
        }
        self.inner.last_sync.set(Some(self.inner.clock.now()));
        let value = self.get();
        self.inner.events.emit(StateEvent::State(value));
    }

    fn unchanged(&self, next: &T) -> bool {
        match &self.inner.equality {
            Some(eq) => eq(&*self.inner.value.borrow(), next),
            None => false,
        }
    }

    fn throttled(&self) -> bool {
        let Some(throttle) = &self.inner.throttle else {
            return false;
        };
        match self.inner.last_sync.get() {
            Some(last) => self.inner.clock.now().saturating_duration_since(last) < throttle.window,
            None => false,
        }
    }

    fn schedule_flush(&self) {
        let inner = &self.inner;
        if inner.flush.get().is_some() || inner.disposed.get() {
            return;
        }
        let Some(throttle) = &inner.throttle else { return };
        let elapsed = inner
            .last_sync
            .get()
            .map(|last| inner.clock.now().saturating_duration_since(last))
            .unwrap_or_default();
        let weak = Rc::downgrade(inner);
        let key = throttle
            .timers
            .schedule(throttle.window.saturating_sub(elapsed), move || {
                if let Some(inner) = weak.upgrade() {
                    State { inner }.flush();
                }
            });
        inner.flush.set(Some(key));
    }

    fn flush(&self) {
        let inner = &self.inner;
        inner.flush.set(None);
        let notified = inner.notified.borrow_mut().take();
        let forced = inner.forced.replace(false);
        if !forced && notified.is_some_and(|seen| self.unchanged(&seen)) {
            log::trace!("state: throttled writes settled on the notified value");
            return;
        }
        inner.last_sync.set(Some(inner.clock.now()));
        log::trace!("state: flushing throttled value");
        let value = self.get();
        inner.events.emit(StateEvent::State(value));
    }

    /// Subscribes to new values.
    pub fn on(&self, f: impl Fn(&T) + 'static) -> Unsubscribe {
        self.inner.events.on(StateTopic::State, move |e| {
            if let StateEvent::State(v) = e {
                f(v)
            }
        })
    }

    /// Subscribes to outgoing values, with the time of the change.
    pub fn on_previous(&self, f: impl Fn(Instant, &T) + 'static) -> Unsubscribe {
        self.inner.events.on(StateTopic::Previous, move |e| {
            if let StateEvent::Previous(at, v) = e {
                f(*at, v)
            }
        })
    }

    pub fn on_dispose(&self, f: impl Fn() + 'static) -> Unsubscribe {
        self.inner.events.on(StateTopic::Dispose, move |_| f())
    }

    pub fn events(&self) -> &Events<StateEvent<T>> {
        &self.inner.events
    }

    /// Resources owned by this state, released when it is disposed.
    pub fn manager(&self) -> &Manager {
        &self.inner.manager
    }

    /// Emits `Dispose`, releases dependency subscriptions and owned resources
    /// and drops every subscriber. Later calls do nothing.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.replace(true) {
            return;
        }
        if let (Some(key), Some(throttle)) = (inner.flush.take(), &inner.throttle) {
            throttle.timers.cancel(key);
        }
        inner.events.emit(StateEvent::Dispose);
        inner.manager.dispose();
        inner.events.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Time of the last notification.
    pub fn last_sync(&self) -> Option<Instant> {
        self.inner.last_sync.get()
    }

    pub fn ptr_eq(&self, other: &State<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakState<T> {
        WeakState(Rc::downgrade(&self.inner))
    }
}

/// A handle that does not keep the state alive.
pub(crate) struct WeakState<T: 'static>(Weak<StateInner<T>>);

impl<T: 'static> Clone for WeakState<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> WeakState<T> {
    pub(crate) fn upgrade(&self) -> Option<State<T>> {
        self.0.upgrade().map(|inner| State { inner })
    }
}

struct DepthGuard<'a>(&'a Cell<u32>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<u32>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl<T: Clone + 'static> Subscribable for State<T> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.on(move |_| f())
    }

    fn source_id(&self) -> usize {
        rc_id(&self.inner)
    }
}

impl<T: Clone + 'static> Gettable for State<T> {
    type Value = T;

    fn get(&self) -> T {
        State::get(self)
    }
}

impl<T: Clone + 'static> Disposable for State<T> {
    fn dispose(&self) {
        State::dispose(self)
    }
}
