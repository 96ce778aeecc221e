//! # Wrapped instances
//!
//! [`Wrap`] lets an opaque, non-reactive value (a big-number type, a parser,
//! a native handle) take part in the graph. The instance is kept as-is; a
//! projection of it is published through an ordinary [`State`].
//!
//! ```rust
//! use weft_core::*;
//!
//! let meters = Wrap::new(
//!     |cm: u32| vec![cm],
//!     |samples: &Vec<u32>| samples.iter().sum::<u32>() as f64 / 100.0,
//!     |samples: &mut Vec<u32>, cm| samples.push(cm),
//! );
//! let m = meters.create(150);
//! m.set(50);
//! assert_eq!(m.get(), 2.0);
//! assert_eq!(m.instance().len(), 2);
//! ```

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::source::{Gettable, Subscribable};
use crate::{Disposable, State, StateOptions, Unsubscribe};

type CreateFn<I, X> = Rc<dyn Fn(I) -> X>;
type ProjectFn<X, O> = Rc<dyn Fn(&X) -> O>;
type ApplyFn<I, X> = Rc<dyn Fn(&mut X, I)>;
type OnCreateFn<I, X, O> = Rc<dyn Fn(&Wrapped<I, X, O>)>;

/// A factory for [`Wrapped`] values sharing the same projections.
pub struct Wrap<I: 'static, X: 'static, O: 'static> {
    create: CreateFn<I, X>,
    get: ProjectFn<X, O>,
    set: ApplyFn<I, X>,
    on_create: Option<OnCreateFn<I, X, O>>,
    options: StateOptions<O>,
}

impl<I: 'static, X: 'static, O: 'static> Clone for Wrap<I, X, O> {
    fn clone(&self) -> Self {
        Self {
            create: self.create.clone(),
            get: self.get.clone(),
            set: self.set.clone(),
            on_create: self.on_create.clone(),
            options: self.options.clone(),
        }
    }
}

impl<I: 'static, X: 'static, O: Clone + PartialEq + 'static> Wrap<I, X, O> {
    /// `get` projects the instance to the published value; `set` applies an
    /// input to the live instance.
    pub fn new(
        create: impl Fn(I) -> X + 'static,
        get: impl Fn(&X) -> O + 'static,
        set: impl Fn(&mut X, I) + 'static,
    ) -> Self {
        Self {
            create: Rc::new(create),
            get: Rc::new(get),
            set: Rc::new(set),
            on_create: None,
            options: StateOptions::default(),
        }
    }
}

impl<I: 'static, X: 'static, O: Clone + 'static> Wrap<I, X, O> {
    /// Options for the projected state.
    pub fn options(mut self, options: StateOptions<O>) -> Self {
        self.options = options;
        self
    }

    /// Runs for every value this factory creates.
    pub fn on_create(mut self, f: impl Fn(&Wrapped<I, X, O>) + 'static) -> Self {
        self.on_create = Some(Rc::new(f));
        self
    }

    pub fn create(&self, input: I) -> Wrapped<I, X, O> {
        let instance = (self.create)(input);
        let projected = (self.get)(&instance);
        let wrapped = Wrapped {
            instance: Rc::new(RefCell::new(instance)),
            state: State::with_options(projected, self.options.clone()),
            get: self.get.clone(),
            set: self.set.clone(),
        };
        if let Some(f) = &self.on_create {
            f(&wrapped);
        }
        wrapped
    }

    /// Creates a value from the default input.
    pub fn create_default(&self) -> Wrapped<I, X, O>
    where
        I: Default,
    {
        self.create(I::default())
    }
}

pub struct Wrapped<I: 'static, X: 'static, O: 'static> {
    instance: Rc<RefCell<X>>,
    state: State<O>,
    get: ProjectFn<X, O>,
    set: ApplyFn<I, X>,
}

impl<I: 'static, X: 'static, O: 'static> Clone for Wrapped<I, X, O> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            state: self.state.clone(),
            get: self.get.clone(),
            set: self.set.clone(),
        }
    }
}

impl<I: 'static, X: fmt::Debug + 'static, O: fmt::Debug + 'static> fmt::Debug for Wrapped<I, X, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("instance", &*self.instance.borrow())
            .field("state", &self.state)
            .finish()
    }
}

impl<I: 'static, X: 'static, O: Clone + 'static> Wrapped<I, X, O> {
    pub fn get(&self) -> O {
        self.state.get()
    }

    /// Applies `input` to the instance, then republishes the projection.
    pub fn set(&self, input: I) {
        (self.set)(&mut *self.instance.borrow_mut(), input);
        self.sync();
    }

    /// Edits the instance in place, then republishes the projection.
    pub fn mutate(&self, f: impl FnOnce(&mut X)) {
        f(&mut *self.instance.borrow_mut());
        self.sync();
    }

    fn sync(&self) {
        let projected = (self.get)(&*self.instance.borrow());
        self.state.set(projected);
    }

    /// Borrows the live instance. Drop the guard before writing.
    pub fn instance(&self) -> Ref<'_, X> {
        self.instance.borrow()
    }

    /// A state computed from the live instance, recomputed after every
    /// published change and disposed with this value.
    pub fn derive<D: Clone + PartialEq + 'static>(
        &self,
        f: impl Fn(&X) -> D + 'static,
    ) -> State<D> {
        let state = self.state.clone();
        let instance = self.instance.clone();
        let derived = State::computed(move |t| {
            t.watch(&state);
            f(&*instance.borrow())
        });
        self.state.manager().track(derived)
    }

    pub fn on(&self, f: impl Fn(&O) + 'static) -> Unsubscribe {
        self.state.on(f)
    }

    /// The projected state.
    pub fn state(&self) -> &State<O> {
        &self.state
    }

    pub fn dispose(&self) {
        self.state.dispose()
    }
}

impl<I: 'static, X: 'static, O: Clone + 'static> Subscribable for Wrapped<I, X, O> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.state.subscribe_change(f)
    }

    fn source_id(&self) -> usize {
        self.state.source_id()
    }
}

impl<I: 'static, X: 'static, O: Clone + 'static> Gettable for Wrapped<I, X, O> {
    type Value = O;

    fn get(&self) -> O {
        Wrapped::get(self)
    }
}

impl<I: 'static, X: 'static, O: Clone + 'static> Disposable for Wrapped<I, X, O> {
    fn dispose(&self) {
        Wrapped::dispose(self)
    }
}

/// A reactive `HashMap`. `set` replaces the whole contents.
///
/// ```rust
/// use weft_core::wrap;
///
/// let scores = wrap::map().create(vec![("ada", 1)]);
/// scores.mutate(|m| {
///     m.insert("grace", 2);
/// });
/// assert_eq!(scores.get().len(), 2);
/// ```
pub fn map<K, V>() -> Wrap<Vec<(K, V)>, HashMap<K, V>, HashMap<K, V>>
where
    K: Eq + Hash + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    Wrap::new(
        |entries: Vec<(K, V)>| entries.into_iter().collect(),
        |m: &HashMap<K, V>| m.clone(),
        |m: &mut HashMap<K, V>, entries: Vec<(K, V)>| *m = entries.into_iter().collect(),
    )
}

/// A reactive `HashSet`. `set` replaces the whole contents.
pub fn set<T>() -> Wrap<Vec<T>, HashSet<T>, HashSet<T>>
where
    T: Eq + Hash + Clone + 'static,
{
    Wrap::new(
        |values: Vec<T>| values.into_iter().collect(),
        |s: &HashSet<T>| s.clone(),
        |s: &mut HashSet<T>, values: Vec<T>| *s = values.into_iter().collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fixed-point decimal with two places, stored as hundredths.
    #[derive(Debug)]
    struct Cents(i64);

    fn decimal() -> Wrap<i64, Cents, String> {
        Wrap::new(
            |units: i64| Cents(units * 100),
            |c: &Cents| format!("{}.{:02}", c.0 / 100, c.0 % 100),
            |c: &mut Cents, units: i64| c.0 = units * 100,
        )
    }

    #[test]
    fn projects_initial_value() {
        let d = decimal().create(10);
        assert_eq!(d.get(), "10.00");
    }

    #[test]
    fn set_replaces_and_notifies() {
        let d = decimal().create(10);
        let seen = Rc::new(RefCell::new(String::new()));
        let unsub = {
            let seen = seen.clone();
            d.on(move |v| *seen.borrow_mut() = v.clone())
        };
        d.set(20);
        assert_eq!(*seen.borrow(), "20.00");
        unsub.run();
        d.set(30);
        assert_eq!(*seen.borrow(), "20.00");
        assert_eq!(d.get(), "30.00");
    }

    #[test]
    fn mutate_edits_instance_in_place() {
        let d = decimal().create(1);
        d.mutate(|c| c.0 += 5);
        assert_eq!(d.get(), "1.05");
        assert_eq!(d.instance().0, 105);
    }

    #[test]
    fn derive_follows_instance() {
        let d = decimal().create(10);
        let doubled = d.derive(|c| c.0 * 2);
        assert_eq!(doubled.get(), 2000);
        d.set(15);
        assert_eq!(doubled.get(), 3000);
        let chained = {
            let doubled = doubled.clone();
            State::computed(move |t| t.get(&doubled) + 1)
        };
        d.set(0);
        assert_eq!(chained.get(), 1);
    }

    #[test]
    fn on_create_runs_per_value() {
        let calls = Rc::new(Cell::new(0));
        let factory = {
            let calls = calls.clone();
            decimal().on_create(move |w| {
                assert_eq!(w.instance().0 % 100, 0);
                calls.set(calls.get() + 1);
            })
        };
        factory.create(1);
        factory.create(2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn dispose_releases_derived() {
        let d = decimal().create(10);
        let doubled = d.derive(|c| c.0 * 2);
        d.dispose();
        assert!(doubled.is_disposed());
        d.set(1);
        assert_eq!(doubled.get(), 2000);
    }

    #[test]
    fn map_starts_with_initial_entries() {
        let m = map().create(vec![("a", 1), ("b", 2)]);
        assert_eq!(m.get(), HashMap::from([("a", 1), ("b", 2)]));
    }

    #[test]
    fn map_set_replaces_contents() {
        let m = map().create(vec![("a", 1), ("b", 2)]);
        m.set(vec![("a", 3), ("c", 4)]);
        assert_eq!(m.get(), HashMap::from([("a", 3), ("c", 4)]));
    }

    #[test]
    fn map_mutate_inserts_in_place() {
        let m = map().create(vec![("a", 1), ("b", 2)]);
        m.mutate(|entries| {
            entries.insert("c", 3);
        });
        assert_eq!(m.get(), HashMap::from([("a", 1), ("b", 2), ("c", 3)]));
    }

    #[test]
    fn map_notifies_until_unsubscribed() {
        let m = map().create(vec![("a", 1)]);
        let received = Rc::new(RefCell::new(HashMap::new()));
        let calls = Rc::new(Cell::new(0));
        let unsub = {
            let (received, calls) = (received.clone(), calls.clone());
            m.on(move |v| {
                *received.borrow_mut() = v.clone();
                calls.set(calls.get() + 1);
            })
        };
        m.set(vec![("b", 2)]);
        assert_eq!(*received.borrow(), HashMap::from([("b", 2)]));
        unsub.run();
        m.set(vec![("c", 3)]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn map_defaults_to_empty() {
        let m = map::<String, i32>().create_default();
        assert!(m.get().is_empty());
    }

    #[test]
    fn set_replaces_and_mutates() {
        let s = set().create(vec![1, 2]);
        s.mutate(|values| {
            values.insert(3);
        });
        assert_eq!(s.get(), HashSet::from([1, 2, 3]));
        s.set(vec![3, 4]);
        assert_eq!(s.get(), HashSet::from([3, 4]));
    }

    #[test]
    fn set_notifies_until_unsubscribed() {
        let s = set().create(vec![1]);
        let calls = Rc::new(Cell::new(0));
        let unsub = {
            let calls = calls.clone();
            s.on(move |v| {
                assert_eq!(*v, HashSet::from([2]));
                calls.set(calls.get() + 1);
            })
        };
        s.set(vec![2]);
        unsub.run();
        s.set(vec![3]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn set_defaults_to_empty() {
        let s = set::<u8>().create_default();
        assert!(s.get().is_empty());
        assert!(s.instance().is_empty());
    }
}
