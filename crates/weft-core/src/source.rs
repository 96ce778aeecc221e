//! Traits shared by everything that can be observed, and the dependency
//! tracker handed to compute functions.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Unsubscribe;

/// A source of change notifications.
pub trait Subscribable {
    /// Calls `f` after every change of this source.
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe;

    /// Identity used to deduplicate dependencies.
    fn source_id(&self) -> usize;
}

/// A source that also has a current value.
pub trait Gettable: Subscribable {
    type Value;

    fn get(&self) -> Self::Value;
}

pub(crate) fn rc_id<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

struct Dependency {
    id: usize,
    subscribe: Box<dyn FnOnce(Rc<dyn Fn()>) -> Unsubscribe>,
}

/// Accessor passed to compute functions.
///
/// Reads made through [`Tracker::get`] during the first evaluation become the
/// state's dependencies; later evaluations read without recording, so a
/// source that is only read on some branches after the first run is never
/// picked up.
pub struct Tracker {
    deps: Option<RefCell<Vec<Dependency>>>,
}

impl Tracker {
    pub(crate) fn recording() -> Self {
        Self {
            deps: Some(RefCell::new(Vec::new())),
        }
    }

    pub(crate) fn passive() -> Self {
        Self { deps: None }
    }

    /// Reads `source`, recording it as a dependency on the first run.
    pub fn get<S>(&self, source: &S) -> S::Value
    where
        S: Gettable + Clone + 'static,
    {
        self.watch(source);
        source.get()
    }

    /// Records `source` as a dependency without reading it.
    pub fn watch<S>(&self, source: &S)
    where
        S: Subscribable + Clone + 'static,
    {
        let Some(deps) = &self.deps else { return };
        let id = source.source_id();
        let mut deps = deps.borrow_mut();
        if deps.iter().any(|d| d.id == id) {
            return;
        }
        let source = source.clone();
        deps.push(Dependency {
            id,
            subscribe: Box::new(move |f| source.subscribe_change(f)),
        });
    }

    pub fn is_recording(&self) -> bool {
        self.deps.is_some()
    }

    /// Subscribes `rerun` to every recorded dependency.
    pub(crate) fn wire(self, rerun: Rc<dyn Fn()>) -> Vec<Unsubscribe> {
        let Some(deps) = self.deps else {
            return Vec::new();
        };
        deps.into_inner()
            .into_iter()
            .map(|d| (d.subscribe)(rerun.clone()))
            .collect()
    }
}
