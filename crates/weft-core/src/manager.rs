//! Ownership nodes that batch the disposal of everything registered on them.
//!
//! ```rust
//! use weft_core::*;
//!
//! let m = Manager::new();
//! let s = m.track(State::new(1));
//! m.defer(|| println!("released"));
//! m.dispose();
//! assert!(s.is_disposed());
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use crate::{Disposable, Error, Resource, Result};

/// Key for [`Manager::unique`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UniqueKey {
    Name(Cow<'static, str>),
    Index(u64),
    Type(TypeId),
}

impl UniqueKey {
    /// A key unique to the type `T`.
    pub fn of<T: 'static>() -> Self {
        UniqueKey::Type(TypeId::of::<T>())
    }
}

impl From<&'static str> for UniqueKey {
    fn from(s: &'static str) -> Self {
        UniqueKey::Name(Cow::Borrowed(s))
    }
}

impl From<String> for UniqueKey {
    fn from(s: String) -> Self {
        UniqueKey::Name(Cow::Owned(s))
    }
}

impl From<u64> for UniqueKey {
    fn from(i: u64) -> Self {
        UniqueKey::Index(i)
    }
}

pub struct Manager {
    inner: Rc<ManagerInner>,
}

struct ManagerInner {
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    keyed: RefCell<HashMap<UniqueKey, Box<dyn Any>>>,
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                cleanups: RefCell::new(Vec::new()),
                keyed: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Takes ownership of a resource; it is released on [`dispose`](Self::dispose).
    pub fn add(&self, resource: impl Into<Resource>) {
        let cleanup = resource.into().into_cleanup();
        self.inner.cleanups.borrow_mut().push(cleanup);
    }

    /// Registers a cleanup closure.
    pub fn defer(&self, f: impl FnOnce() + 'static) {
        self.add(Resource::cleanup(f));
    }

    /// Registers a disposable and hands it back, so construction and
    /// registration can happen inline.
    pub fn track<D: Disposable + Clone + 'static>(&self, d: D) -> D {
        self.add(Resource::disposable(d.clone()));
        d
    }

    /// Returns the instance cached under `key`, building and tracking it on
    /// first use. The cache is cleared by `dispose`, after which the factory
    /// runs again.
    pub fn unique<D: Disposable + Clone + 'static>(
        &self,
        key: impl Into<UniqueKey>,
        factory: impl FnOnce() -> D,
    ) -> Result<D> {
        let key = key.into();
        if let Some(existing) = self.inner.keyed.borrow().get(&key) {
            return match existing.downcast_ref::<D>() {
                Some(d) => Ok(d.clone()),
                None => Err(Error::UniqueTypeMismatch { key }),
            };
        }

        let instance = self.track(factory());
        self.inner
            .keyed
            .borrow_mut()
            .insert(key, Box::new(instance.clone()));
        Ok(instance)
    }

    /// A sub-manager released together with this one.
    pub fn child(&self) -> Manager {
        self.track(Manager::new())
    }

    /// Runs every registered cleanup once, in registration order.
    ///
    /// A cleanup that panics is logged and does not stop the rest. Cleanups
    /// registered while disposing are kept for the next `dispose`.
    pub fn dispose(&self) {
        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        let keyed = std::mem::take(&mut *self.inner.keyed.borrow_mut());
        if !cleanups.is_empty() {
            log::trace!("manager: running {} cleanups", cleanups.len());
        }
        run_isolated(cleanups);
        drop(keyed);
    }

    /// Number of cleanups waiting to run.
    pub fn len(&self) -> usize {
        self.inner.cleanups.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Clone for Manager {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("pending", &self.len())
            .field("keyed", &self.inner.keyed.borrow().len())
            .finish()
    }
}

impl Disposable for Manager {
    fn dispose(&self) {
        Manager::dispose(self)
    }
}

fn run_isolated(cleanups: Vec<Box<dyn FnOnce()>>) {
    for cleanup in cleanups {
        if let Err(err) = catch_unwind(AssertUnwindSafe(cleanup)) {
            let message = if let Some(s) = err.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = err.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "unknown panic".to_string()
            };
            log::error!("manager: cleanup panicked: {message}");
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let cleanups = std::mem::take(self.cleanups.get_mut());
        run_isolated(cleanups);
    }
}
