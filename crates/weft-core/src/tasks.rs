//! # Tasks
//!
//! Named recurring callbacks on a [`Timers`] queue.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use weft_core::*;
//!
//! let clock = ManualClock::new();
//! let timers = Timers::new(clock.clone());
//! let tasks = Tasks::new(&timers);
//!
//! let hits = Rc::new(Cell::new(0));
//! let task = {
//!     let hits = hits.clone();
//!     let every_second = TaskOptions::every(Duration::from_secs(1)).times(2);
//!     tasks.add("poll", move || hits.set(hits.get() + 1), every_second)
//! }
//! .unwrap();
//!
//! for _ in 0..3 {
//!     clock.advance(Duration::from_secs(1));
//!     timers.run_due();
//! }
//! assert_eq!(hits.get(), 2);
//! assert!(!task.active().get());
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::error::{Error, Result};
use crate::timers::{TimerKey, Timers};
use crate::{Disposable, Event, Events, Manager, State, Unsubscribe};

#[derive(Clone, Copy, Debug)]
pub struct TaskOptions {
    pub interval: Duration,
    /// `None` repeats until disposed.
    pub count: Option<u64>,
}

impl TaskOptions {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            count: None,
        }
    }

    pub fn times(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskEvent {
    /// The task with this id has just run.
    Fired(String),
    Dispose,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TaskTopic {
    Task(String),
    Dispose,
}

impl Event for TaskEvent {
    type Topic = TaskTopic;

    fn topic(&self) -> TaskTopic {
        match self {
            TaskEvent::Fired(id) => TaskTopic::Task(id.clone()),
            TaskEvent::Dispose => TaskTopic::Dispose,
        }
    }
}

struct TaskInner {
    id: String,
    run: Box<dyn Fn()>,
    interval: Duration,
    active: State<bool>,
    remaining: State<Option<u64>>,
    timer: Cell<Option<TimerKey>>,
    timers: Timers,
    events: Events<TaskEvent>,
    manager: Manager,
    registry: Weak<RefCell<Vec<Task>>>,
}

/// Handle to one scheduled task.
#[derive(Clone)]
pub struct Task {
    inner: Rc<TaskInner>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("active", &self.inner.active.get())
            .field("remaining", &self.inner.remaining.get())
            .finish()
    }
}

impl Task {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// `false` once the task has run out of repetitions or was disposed.
    pub fn active(&self) -> &State<bool> {
        &self.inner.active
    }

    /// Runs left; `None` for an unbounded task.
    pub fn remaining(&self) -> &State<Option<u64>> {
        &self.inner.remaining
    }

    /// Cancels the pending run and releases the task's states.
    pub fn dispose(&self) {
        let inner = &self.inner;
        if let Some(key) = inner.timer.take() {
            inner.timers.cancel(key);
        }
        inner.active.set(false);
        inner.manager.dispose();
        if let Some(registry) = inner.registry.upgrade() {
            registry
                .borrow_mut()
                .retain(|t| !Rc::ptr_eq(&t.inner, inner));
        }
    }
}

impl Disposable for Task {
    fn dispose(&self) {
        Task::dispose(self)
    }
}

fn schedule(task: &Rc<TaskInner>) {
    let weak = Rc::downgrade(task);
    let key = task.timers.schedule(task.interval, move || {
        if let Some(task) = weak.upgrade() {
            tick(&task);
        }
    });
    task.timer.set(Some(key));
}

fn tick(task: &Rc<TaskInner>) {
    task.timer.set(None);
    if !task.active.get() || task.remaining.get() == Some(0) {
        return;
    }

    (task.run)();
    log::trace!("tasks: `{}` fired", task.id);
    task.events.emit(TaskEvent::Fired(task.id.clone()));

    if let Some(n) = task.remaining.get() {
        task.remaining.set(Some(n.saturating_sub(1)));
    }
    // The callback may have disposed the task.
    if !task.active.get() {
        return;
    }
    if task.remaining.get() == Some(0) {
        task.active.set(false);
    } else {
        schedule(task);
    }
}

/// A registry of named recurring tasks sharing one event channel.
#[derive(Clone)]
pub struct Tasks {
    timers: Timers,
    events: Events<TaskEvent>,
    manager: Manager,
    active: Rc<RefCell<Vec<Task>>>,
}

impl fmt::Debug for Tasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tasks").field("active", &self.active.borrow()).finish()
    }
}

impl Tasks {
    pub fn new(timers: &Timers) -> Self {
        let manager = Manager::new();
        let events = manager.track(Events::new());
        Self {
            timers: timers.clone(),
            events,
            manager,
            active: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Schedules `f` to run every `options.interval`, first after one
    /// interval. Ids are labels for the event channel and need not be unique.
    pub fn add(
        &self,
        id: impl Into<String>,
        f: impl Fn() + 'static,
        options: TaskOptions,
    ) -> Result<Task> {
        let id = id.into();
        if options.interval.is_zero() {
            return Err(Error::ZeroInterval { id });
        }

        let manager = Manager::new();
        let exhausted = options.count == Some(0);
        let inner = Rc::new(TaskInner {
            id,
            run: Box::new(f),
            interval: options.interval,
            active: manager.track(State::new(!exhausted)),
            remaining: manager.track(State::new(options.count)),
            timer: Cell::new(None),
            timers: self.timers.clone(),
            events: self.events.clone(),
            manager,
            registry: Rc::downgrade(&self.active),
        });
        if !exhausted {
            schedule(&inner);
        }
        log::debug!("tasks: added `{}` every {:?}", inner.id, options.interval);

        let task = Task { inner };
        self.active.borrow_mut().push(task.clone());
        Ok(task)
    }

    /// Tasks not yet disposed, including ones that have finished.
    pub fn len(&self) -> usize {
        self.active.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to runs of the tasks labelled `id`.
    pub fn on_fired(&self, id: impl Into<String>, f: impl Fn() + 'static) -> Unsubscribe {
        self.events.on(TaskTopic::Task(id.into()), move |_| f())
    }

    pub fn events(&self) -> &Events<TaskEvent> {
        &self.events
    }

    /// Disposes every task, emits `Dispose`, then drops all listeners.
    pub fn dispose(&self) {
        let tasks = std::mem::take(&mut *self.active.borrow_mut());
        for task in tasks {
            task.dispose();
        }
        self.events.emit(TaskEvent::Dispose);
        self.manager.dispose();
    }
}

impl Disposable for Tasks {
    fn dispose(&self) {
        Tasks::dispose(self)
    }
}
