use std::rc::Rc;

use crate::source::Subscribable;
use crate::{Disposable, Manager};

#[derive(Clone, Copy, Debug, Default)]
pub struct EffectOptions {
    /// Run once right away, before any source changes.
    pub trigger: bool,
}

/// A side effect bound to a set of sources. Extra cleanups can be attached to
/// [`Effect::manager`]; they run when the effect is disposed.
#[derive(Clone, Debug)]
pub struct Effect {
    manager: Manager,
}

/// Runs `f` after every change of any of `sources`. Dropping the returned
/// handle disposes the effect.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use weft_core::*;
///
/// let count = State::new(0);
/// let bus: Events<(&'static str, ())> = Events::new();
/// let runs = Rc::new(Cell::new(0));
/// let fx = {
///     let runs = runs.clone();
///     effect(&[&count, &bus], move || runs.set(runs.get() + 1), EffectOptions::default())
/// };
/// count.set(1);
/// bus.emit(("ping", ()));
/// fx.dispose();
/// count.set(2);
/// assert_eq!(runs.get(), 2);
/// ```
#[must_use = "dropping the effect unsubscribes it"]
pub fn effect(
    sources: &[&dyn Subscribable],
    f: impl Fn() + 'static,
    options: EffectOptions,
) -> Effect {
    let manager = Manager::new();
    let f: Rc<dyn Fn()> = Rc::new(f);
    for source in sources {
        manager.add(source.subscribe_change(f.clone()));
    }
    if options.trigger {
        f();
    }
    Effect { manager }
}

impl Effect {
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// Unsubscribes from every source and runs attached cleanups.
    pub fn dispose(&self) {
        self.manager.dispose();
    }
}

impl Disposable for Effect {
    fn dispose(&self) {
        Effect::dispose(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Events, State};
    use std::cell::{Cell, RefCell};

    #[test]
    fn listens_to_states_and_events() {
        let bus: Events<(&'static str, i32)> = Events::new();
        let s = State::new(10);
        let runs = Rc::new(Cell::new(0));
        let _fx = {
            let runs = runs.clone();
            effect(&[&bus, &s], move || runs.set(runs.get() + 1), EffectOptions::default())
        };
        bus.emit(("something", 10));
        s.set(20);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn trigger_runs_immediately() {
        let s = State::new(1);
        let runs = Rc::new(Cell::new(0));
        let _fx = {
            let runs = runs.clone();
            effect(&[&s], move || runs.set(runs.get() + 1), EffectOptions { trigger: true })
        };
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let s = State::new(1);
        let runs = Rc::new(Cell::new(0));
        {
            let runs = runs.clone();
            let _fx = effect(&[&s], move || runs.set(runs.get() + 1), EffectOptions::default());
            s.set(2);
        }
        s.set(3);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn dispose_runs_attached_cleanups() {
        let s = State::new(1);
        let runs = Rc::new(Cell::new(0));
        let cleaned = Rc::new(Cell::new(0));
        let fx = {
            let runs = runs.clone();
            effect(&[&s], move || runs.set(runs.get() + 1), EffectOptions::default())
        };
        {
            let cleaned = cleaned.clone();
            fx.manager().defer(move || cleaned.set(cleaned.get() + 1));
        }
        s.set(2);
        fx.dispose();
        fx.dispose();
        s.set(3);
        assert_eq!(runs.get(), 1);
        assert_eq!(cleaned.get(), 1);
        assert_eq!(s.events().size(), 0);
    }

    #[test]
    fn reads_current_values() {
        let a = State::new(1);
        let b = State::new(2);
        let sums = Rc::new(RefCell::new(Vec::new()));
        let _fx = {
            let (a2, b2, sums) = (a.clone(), b.clone(), sums.clone());
            effect(
                &[&a, &b],
                move || sums.borrow_mut().push(a2.get() + b2.get()),
                EffectOptions { trigger: true },
            )
        };
        a.set(10);
        b.set(20);
        assert_eq!(*sums.borrow(), vec![3, 12, 30]);
    }
}
