//! Typed publish/subscribe channels.
//!
//! An [`Events`] channel carries one event type `E`; each event names its own
//! topic through [`Event::topic`]. Topic subscribers are notified first, then
//! the wildcard subscribers registered with [`Events::all`].
//!
//! ```rust
//! use weft_core::*;
//!
//! let bus: Events<(&'static str, i32)> = Events::new();
//! let unsub = bus.on("tick", |(_, n)| println!("tick {n}"));
//! bus.emit(("tick", 1));
//! unsub.run();
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

use crate::source::Subscribable;
use crate::subscriptions::{Subscriber, Subscriptions, TopicSubscriptions};
use crate::{Disposable, Unsubscribe};

pub trait Event: 'static {
    type Topic: Clone + Eq + Hash + Debug + 'static;

    fn topic(&self) -> Self::Topic;
}

/// `(topic, payload)` pairs are events keyed by their first element.
impl<K, V> Event for (K, V)
where
    K: Clone + Eq + Hash + Debug + 'static,
    V: 'static,
{
    type Topic = K;

    fn topic(&self) -> K {
        self.0.clone()
    }
}

pub struct Events<E: Event> {
    topics: TopicSubscriptions<E::Topic, E>,
    all: Subscriptions<E>,
}

impl<E: Event> Clone for Events<E> {
    fn clone(&self) -> Self {
        Self {
            topics: self.topics.clone(),
            all: self.all.clone(),
        }
    }
}

impl<E: Event> Default for Events<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Events<E> {
    pub fn new() -> Self {
        Self {
            topics: TopicSubscriptions::new(),
            all: Subscriptions::new(),
        }
    }

    /// Subscribes to a single topic.
    pub fn on(&self, topic: E::Topic, f: impl Fn(&E) + 'static) -> Unsubscribe {
        self.topics.add(topic, Rc::new(f))
    }

    /// Subscribes to several topics at once; one handle undoes every
    /// registration made by this call.
    pub fn on_many(
        &self,
        listeners: impl IntoIterator<Item = (E::Topic, Subscriber<E>)>,
    ) -> Unsubscribe {
        Unsubscribe::all(
            listeners
                .into_iter()
                .map(|(topic, sub)| self.topics.add(topic, sub))
                .collect::<Vec<_>>(),
        )
    }

    /// Subscribes to every emission regardless of topic.
    pub fn all(&self, f: impl Fn(&E::Topic, &E) + 'static) -> Unsubscribe {
        self.all.subscribe(move |event: &E| f(&event.topic(), event))
    }

    pub fn emit(&self, event: E) {
        let topic = event.topic();
        self.topics.each(&topic, &event);
        self.all.each(&event);
    }

    pub fn dispose(&self) {
        self.all.dispose();
        self.topics.dispose();
    }

    /// Subscriber count over all topics plus wildcard listeners.
    pub fn size(&self) -> usize {
        self.all.size() + self.topics.size()
    }
}

impl<E: Event> Disposable for Events<E> {
    fn dispose(&self) {
        Events::dispose(self)
    }
}

/// Any emission counts as a change.
impl<E: Event> Subscribable for Events<E> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.all.subscribe(move |_: &E| f())
    }

    fn source_id(&self) -> usize {
        self.all.id()
    }
}
