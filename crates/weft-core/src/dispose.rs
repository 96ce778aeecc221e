use std::cell::RefCell;
use std::rc::Rc;

/// A cleanup closure that runs at most once, shared between clones.
///
/// Every subscription in weft hands one of these back; running it (or any of
/// its clones) tears the registration down.
#[derive(Clone)]
pub struct Dispose(Rc<RefCell<Option<Box<dyn FnOnce()>>>>);

/// Handle returned by every `on`/`add`/`subscribe` call.
pub type Unsubscribe = Dispose;

impl Dispose {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Rc::new(RefCell::new(Some(Box::new(f)))))
    }

    /// A handle with nothing to clean up.
    pub fn noop() -> Self {
        Self(Rc::new(RefCell::new(None)))
    }

    /// Runs at most once (safe to call multiple times, also from inside the
    /// closure being run).
    pub fn run(&self) {
        let f = self.0.borrow_mut().take();
        if let Some(f) = f {
            f()
        }
    }

    pub fn is_done(&self) -> bool {
        self.0.borrow().is_none()
    }

    /// Combines several handles into one that runs them in order.
    pub fn all(handles: impl IntoIterator<Item = Dispose>) -> Self {
        let handles: Vec<Dispose> = handles.into_iter().collect();
        Self::new(move || {
            for h in handles {
                h.run();
            }
        })
    }
}

impl std::fmt::Debug for Dispose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispose")
            .field("done", &self.is_done())
            .finish()
    }
}

/// Anything that owns resources which must be released explicitly.
pub trait Disposable {
    fn dispose(&self);
}

impl Disposable for Dispose {
    fn dispose(&self) {
        self.run()
    }
}

/// Something a [`Manager`](crate::Manager) can take ownership of.
///
/// Both variants are normalised into a single boxed closure when registered.
pub enum Resource {
    Cleanup(Box<dyn FnOnce()>),
    Disposable(Rc<dyn Disposable>),
}

impl Resource {
    pub fn cleanup(f: impl FnOnce() + 'static) -> Self {
        Resource::Cleanup(Box::new(f))
    }

    pub fn disposable(d: impl Disposable + 'static) -> Self {
        Resource::Disposable(Rc::new(d))
    }

    pub(crate) fn into_cleanup(self) -> Box<dyn FnOnce()> {
        match self {
            Resource::Cleanup(f) => f,
            Resource::Disposable(d) => Box::new(move || d.dispose()),
        }
    }
}

impl From<Dispose> for Resource {
    fn from(d: Dispose) -> Self {
        Resource::Cleanup(Box::new(move || d.run()))
    }
}

/// Wraps a closure as a [`Disposable`] value.
pub fn disposable(f: impl FnOnce() + 'static) -> Dispose {
    Dispose::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dispose_runs_once_across_clones() {
        let count = Rc::new(Cell::new(0));
        let d = {
            let count = count.clone();
            Dispose::new(move || count.set(count.get() + 1))
        };
        let d2 = d.clone();
        d.run();
        d2.run();
        d.dispose();
        assert_eq!(count.get(), 1);
        assert!(d2.is_done());
    }

    #[test]
    fn dispose_can_run_itself_reentrantly() {
        let slot: Rc<RefCell<Option<Dispose>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(Cell::new(0));
        let d = {
            let slot = slot.clone();
            let hits = hits.clone();
            Dispose::new(move || {
                hits.set(hits.get() + 1);
                if let Some(me) = slot.borrow().as_ref() {
                    me.run();
                }
            })
        };
        *slot.borrow_mut() = Some(d.clone());
        d.run();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn resource_variants_normalise_to_closures() {
        let hits = Rc::new(Cell::new(0));
        let a = {
            let hits = hits.clone();
            Resource::cleanup(move || hits.set(hits.get() + 1))
        };
        let b = {
            let hits = hits.clone();
            Resource::disposable(disposable(move || hits.set(hits.get() + 10)))
        };
        (a.into_cleanup())();
        (b.into_cleanup())();
        assert_eq!(hits.get(), 11);
    }
}
