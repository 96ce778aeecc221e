//! Multicast callback registries.
//!
//! [`Subscriptions`] is a flat, insertion-ordered set of callbacks.
//! [`TopicSubscriptions`] keeps one such set per topic, allocated on first use.
//! Both are synchronous: `each` calls every subscriber on the caller's stack and
//! does not catch panics.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::Unsubscribe;

/// A callback registered with a registry. Identity is the `Rc` allocation.
pub type Subscriber<A> = Rc<dyn Fn(&A)>;

struct Entry<A> {
    callback: Subscriber<A>,
    live: Cell<bool>,
}

struct Registry<A> {
    entries: SmallVec<[Rc<Entry<A>>; 4]>,
}

impl<A> Registry<A> {
    fn position(&self, sub: &Subscriber<A>) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| std::ptr::addr_eq(Rc::as_ptr(&e.callback), Rc::as_ptr(sub)))
    }

    fn remove(&mut self, sub: &Subscriber<A>) {
        if let Some(idx) = self.position(sub) {
            let entry = self.entries.remove(idx);
            entry.live.set(false);
        }
    }
}

pub struct Subscriptions<A: 'static> {
    inner: Rc<RefCell<Registry<A>>>,
}

impl<A: 'static> Clone for Subscriptions<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: 'static> Default for Subscriptions<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> Subscriptions<A> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                entries: SmallVec::new(),
            })),
        }
    }

    /// Registers `sub`. Adding an already-registered subscriber is a no-op
    /// apart from returning another handle for it.
    pub fn add(&self, sub: Subscriber<A>) -> Unsubscribe {
        self.add_all([sub])
    }

    /// Registers several subscribers; the returned handle removes all of them.
    pub fn add_all(&self, subs: impl IntoIterator<Item = Subscriber<A>>) -> Unsubscribe {
        let mut added: SmallVec<[Subscriber<A>; 2]> = SmallVec::new();
        {
            let mut reg = self.inner.borrow_mut();
            for sub in subs {
                if reg.position(&sub).is_none() {
                    reg.entries.push(Rc::new(Entry {
                        callback: sub.clone(),
                        live: Cell::new(true),
                    }));
                }
                added.push(sub);
            }
        }
        let weak: Weak<RefCell<Registry<A>>> = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(reg) = weak.upgrade() {
                let mut reg = reg.borrow_mut();
                for sub in &added {
                    reg.remove(sub);
                }
            }
        })
    }

    /// Convenience for registering a plain closure.
    pub fn subscribe(&self, f: impl Fn(&A) + 'static) -> Unsubscribe {
        self.add(Rc::new(f))
    }

    /// Removes subscribers; unknown ones are ignored.
    pub fn delete(&self, subs: &[Subscriber<A>]) {
        let mut reg = self.inner.borrow_mut();
        for sub in subs {
            reg.remove(sub);
        }
    }

    /// Calls every current subscriber with `value`, in insertion order.
    ///
    /// Works on a snapshot, so subscribers may add or remove registrations
    /// while it runs. One that gets removed mid-way is skipped.
    pub fn each(&self, value: &A) {
        let snapshot: SmallVec<[Rc<Entry<A>>; 8]> =
            self.inner.borrow().entries.iter().cloned().collect();
        for entry in snapshot {
            if entry.live.get() {
                (entry.callback)(value);
            }
        }
    }

    pub fn dispose(&self) {
        let entries = std::mem::take(&mut self.inner.borrow_mut().entries);
        for entry in entries {
            entry.live.set(false);
        }
    }

    pub fn size(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub(crate) fn id(&self) -> usize {
        crate::source::rc_id(&self.inner)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// Registries keyed by topic.
pub struct TopicSubscriptions<K: 'static, A: 'static> {
    topics: Rc<RefCell<HashMap<K, Subscriptions<A>>>>,
}

impl<K: 'static, A: 'static> Clone for TopicSubscriptions<K, A> {
    fn clone(&self) -> Self {
        Self {
            topics: self.topics.clone(),
        }
    }
}

impl<K: Eq + Hash + Clone + 'static, A: 'static> Default for TopicSubscriptions<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone + 'static, A: 'static> TopicSubscriptions<K, A> {
    pub fn new() -> Self {
        Self {
            topics: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    fn registry(&self, topic: &K) -> Subscriptions<A> {
        self.topics
            .borrow_mut()
            .entry(topic.clone())
            .or_default()
            .clone()
    }

    pub fn add(&self, topic: K, sub: Subscriber<A>) -> Unsubscribe {
        self.registry(&topic).add(sub)
    }

    pub fn add_all(&self, topic: K, subs: impl IntoIterator<Item = Subscriber<A>>) -> Unsubscribe {
        self.registry(&topic).add_all(subs)
    }

    /// Notifies the subscribers of `topic`. Unknown topics are a no-op.
    pub fn each(&self, topic: &K, value: &A) {
        let registry = self.topics.borrow().get(topic).cloned();
        if let Some(registry) = registry {
            registry.each(value);
        }
    }

    pub fn dispose(&self) {
        let topics = std::mem::take(&mut *self.topics.borrow_mut());
        for (_, registry) in topics {
            registry.dispose();
        }
    }

    /// Total subscriber count across every topic.
    pub fn size(&self) -> usize {
        self.topics.borrow().values().map(Subscriptions::size).sum()
    }
}
