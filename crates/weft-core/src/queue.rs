use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::source::{Gettable, Subscribable};
use crate::state::Throttle;
use crate::{Disposable, Event, Events, Manager, State, StateOptions, Unsubscribe};

#[derive(Clone, Debug, PartialEq)]
pub enum QueueEvent<T> {
    Enqueue(T),
    Dequeue(T),
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueTopic {
    Enqueue,
    Dequeue,
    Clear,
}

impl<T: 'static> Event for QueueEvent<T> {
    type Topic = QueueTopic;

    fn topic(&self) -> QueueTopic {
        match self {
            QueueEvent::Enqueue(_) => QueueTopic::Enqueue,
            QueueEvent::Dequeue(_) => QueueTopic::Dequeue,
            QueueEvent::Clear => QueueTopic::Clear,
        }
    }
}

#[derive(Clone, Default)]
pub struct QueueOptions {
    /// `0` means unbounded.
    pub max_size: usize,
    /// Throttles notifications of the contents state.
    pub throttle: Option<Throttle>,
}

impl QueueOptions {
    pub fn bounded(max_size: usize) -> Self {
        Self {
            max_size,
            throttle: None,
        }
    }
}

/// A FIFO whose contents are a state. When full, enqueuing evicts the oldest
/// item without a `Dequeue` event.
pub struct Queue<T: 'static> {
    items: State<VecDeque<T>>,
    events: Events<QueueEvent<T>>,
    manager: Manager,
    max_size: usize,
}

impl<T: 'static> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            events: self.events.clone(),
            manager: self.manager.clone(),
            max_size: self.max_size,
        }
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("items", &self.items.get())
            .field("max_size", &self.max_size)
            .finish()
    }
}

impl<T: Clone + 'static> Default for Queue<T> {
    fn default() -> Self {
        Self::new(QueueOptions::default())
    }
}

impl<T: Clone + 'static> Queue<T> {
    pub fn new(options: QueueOptions) -> Self {
        let manager = Manager::new();
        let mut state_options = StateOptions::unchecked();
        state_options.throttle = options.throttle;
        let items = manager.track(State::with_options(VecDeque::new(), state_options));
        let events = manager.track(Events::new());
        Self {
            items,
            events,
            manager,
            max_size: options.max_size,
        }
    }

    pub fn enqueue(&self, item: T) {
        let max = self.max_size;
        let pushed = item.clone();
        self.items.mutate(move |q| {
            q.push_back(pushed);
            if max > 0 && q.len() > max {
                q.pop_front();
            }
        });
        self.events.emit(QueueEvent::Enqueue(item));
    }

    pub fn dequeue(&self) -> Option<T> {
        let item = self.peek()?;
        self.items.mutate(|q| {
            q.pop_front();
        });
        self.events.emit(QueueEvent::Dequeue(item.clone()));
        Some(item)
    }

    pub fn peek(&self) -> Option<T> {
        self.items.with(|q| q.front().cloned())
    }

    pub fn clear(&self) {
        self.items.set(VecDeque::new());
        self.events.emit(QueueEvent::Clear);
    }

    pub fn len(&self) -> usize {
        self.items.with(VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the contents, front first.
    pub fn get(&self) -> VecDeque<T> {
        self.items.get()
    }

    /// Subscribes to the contents after each change.
    pub fn on(&self, f: impl Fn(&VecDeque<T>) + 'static) -> Unsubscribe {
        self.items.on(f)
    }

    pub fn events(&self) -> &Events<QueueEvent<T>> {
        &self.events
    }

    pub fn state(&self) -> &State<VecDeque<T>> {
        &self.items
    }

    pub fn dispose(&self) {
        self.manager.dispose();
    }
}

impl<T: Clone + 'static> Subscribable for Queue<T> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.items.subscribe_change(f)
    }

    fn source_id(&self) -> usize {
        self.items.source_id()
    }
}

impl<T: Clone + 'static> Gettable for Queue<T> {
    type Value = VecDeque<T>;

    fn get(&self) -> VecDeque<T> {
        Queue::get(self)
    }
}

impl<T: Clone + 'static> Disposable for Queue<T> {
    fn dispose(&self) {
        Queue::dispose(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, Timers};
    use std::cell::RefCell;
    use web_time::Duration;

    fn log_events(q: &Queue<i32>) -> Rc<RefCell<Vec<QueueEvent<i32>>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        q.events().all(move |_, e| sink.borrow_mut().push(e.clone()));
        log
    }

    #[test]
    fn fifo_order() {
        let q = Queue::default();
        q.enqueue(1);
        q.enqueue(2);
        assert_eq!(q.peek(), Some(1));
        assert_eq!(q.dequeue(), Some(1));
        assert_eq!(q.dequeue(), Some(2));
        assert_eq!(q.dequeue(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn emits_queue_events() {
        let q = Queue::default();
        let log = log_events(&q);
        q.enqueue(1);
        q.dequeue();
        q.dequeue();
        q.clear();
        assert_eq!(
            *log.borrow(),
            vec![QueueEvent::Enqueue(1), QueueEvent::Dequeue(1), QueueEvent::Clear]
        );
    }

    #[test]
    fn max_size_evicts_oldest_silently() {
        let q = Queue::new(QueueOptions::bounded(2));
        let log = log_events(&q);
        for v in 1..=3 {
            q.enqueue(v);
        }
        assert_eq!(q.get(), VecDeque::from([2, 3]));
        assert_eq!(log.borrow().len(), 3);
        assert!(
            log.borrow()
                .iter()
                .all(|e| matches!(e, QueueEvent::Enqueue(_)))
        );
    }

    #[test]
    fn contents_state_notifies() {
        let q = Queue::default();
        let lens = Rc::new(RefCell::new(Vec::new()));
        {
            let lens = lens.clone();
            q.on(move |items| lens.borrow_mut().push(items.len()));
        }
        q.enqueue(1);
        q.enqueue(2);
        q.dequeue();
        q.clear();
        assert_eq!(*lens.borrow(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn throttled_contents_stay_current() {
        let clock = ManualClock::new();
        let timers = Timers::new(clock.clone());
        let q = Queue::new(QueueOptions {
            max_size: 0,
            throttle: Some(Throttle {
                window: Duration::from_millis(10),
                timers: timers.clone(),
            }),
        });
        let hits = Rc::new(RefCell::new(0));
        {
            let hits = hits.clone();
            q.on(move |_| *hits.borrow_mut() += 1);
        }
        q.enqueue(1);
        q.enqueue(2);
        q.enqueue(3);
        assert_eq!(q.len(), 3);
        assert_eq!(*hits.borrow(), 1);
        clock.advance(Duration::from_millis(10));
        timers.run_due();
        assert_eq!(*hits.borrow(), 2);
    }

    #[test]
    fn dispose_drops_all_listeners() {
        let q = Queue::<i32>::default();
        q.on(|_| {});
        q.events().on(QueueTopic::Enqueue, |_| {});
        q.dispose();
        assert_eq!(q.events().size(), 0);
        assert_eq!(q.state().events().size(), 0);
    }
}
