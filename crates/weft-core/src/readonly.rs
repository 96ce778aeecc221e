use std::fmt;
use std::rc::Rc;

use web_time::Instant;

use crate::source::{Gettable, Subscribable};
use crate::{Disposable, Events, State, StateEvent, StateOptions, Unsubscribe};

/// A read-only view of another state. It follows every notification of the
/// source and has no way to write back.
pub struct ReadonlyState<T: 'static> {
    state: State<T>,
}

impl<T: 'static> Clone for ReadonlyState<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ReadonlyState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadonlyState").field(&self.state).finish()
    }
}

impl<T: Clone + 'static> State<T> {
    /// A view that is disposed together with this state.
    pub fn readonly(&self) -> ReadonlyState<T> {
        let source = self.clone();
        let state = State::computed_with_options(
            move |t| t.get(&source),
            StateOptions::unchecked(),
        );
        self.manager().track(ReadonlyState { state })
    }
}

impl<T: Clone + 'static> ReadonlyState<T> {
    pub fn get(&self) -> T {
        self.state.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.state.with(f)
    }

    pub fn on(&self, f: impl Fn(&T) + 'static) -> Unsubscribe {
        self.state.on(f)
    }

    pub fn on_previous(&self, f: impl Fn(Instant, &T) + 'static) -> Unsubscribe {
        self.state.on_previous(f)
    }

    pub fn events(&self) -> &Events<StateEvent<T>> {
        self.state.events()
    }

    /// Detaches the view from its source. The source is unaffected.
    pub fn dispose(&self) {
        self.state.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}

impl<T: Clone + 'static> Subscribable for ReadonlyState<T> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.state.subscribe_change(f)
    }

    fn source_id(&self) -> usize {
        self.state.source_id()
    }
}

impl<T: Clone + 'static> Gettable for ReadonlyState<T> {
    type Value = T;

    fn get(&self) -> T {
        ReadonlyState::get(self)
    }
}

impl<T: Clone + 'static> Disposable for ReadonlyState<T> {
    fn dispose(&self) {
        ReadonlyState::dispose(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn follows_source() {
        let s = State::new(1);
        let r = s.readonly();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            r.on(move |v| seen.borrow_mut().push(*v));
        }
        s.set(2);
        s.set(3);
        assert_eq!(r.get(), 3);
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }

    #[test]
    fn forced_source_writes_pass_through() {
        let s = State::new(1);
        let r = s.readonly();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = hits.clone();
            r.on(move |_| hits.set(hits.get() + 1));
        }
        s.write(1, true);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn disposed_with_source() {
        let s = State::new(1);
        let r = s.readonly();
        let disposed = Rc::new(Cell::new(false));
        {
            let disposed = disposed.clone();
            r.events()
                .on(crate::StateTopic::Dispose, move |_| disposed.set(true));
        }
        s.dispose();
        assert!(disposed.get());
        assert!(r.is_disposed());
    }

    #[test]
    fn disposing_view_leaves_source_alone() {
        let s = State::new(1);
        let r = s.readonly();
        assert_eq!(s.events().size(), 1);
        r.dispose();
        assert_eq!(s.events().size(), 0);
        s.set(5);
        assert_eq!(s.get(), 5);
        assert_eq!(r.get(), 1);
    }
}
