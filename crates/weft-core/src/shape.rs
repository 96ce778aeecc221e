//! # Structs
//!
//! A [`Struct`] is a state whose value is a fixed-shape record, backed by one
//! child [`State`] per field. Writing a child resynchronises the aggregate;
//! writing the aggregate fans out to the matching children.
//!
//! ```rust
//! use weft_core::*;
//!
//! #[derive(Clone, Debug, PartialEq, Shape)]
//! struct Point {
//!     x: i32,
//!     label: String,
//! }
//!
//! let p = Struct::new(Point { x: 1, label: "a".into() });
//! p.fields().x.set(5);
//! assert_eq!(p.get().x, 5);
//!
//! p.set(PointPatch { label: Some("b".into()), ..Default::default() });
//! assert_eq!(p.fields().label.get(), "b");
//! assert_eq!(p.fields().x.get(), 5);
//! ```

use std::fmt;
use std::rc::{Rc, Weak};

use crate::source::{Gettable, Subscribable};
use crate::{Disposable, Events, Manager, State, StateEvent, StateOptions, Unsubscribe};

/// A record type that can be split into per-field states.
///
/// Usually derived with `#[derive(Shape)]`, which also generates the
/// `<Name>Fields` and `<Name>Patch` types.
pub trait Shape: Clone + 'static {
    /// One child state per field.
    type Fields: 'static;
    /// A partial record: `None` leaves the field alone.
    type Patch: Default + 'static;

    const KEYS: &'static [&'static str];

    /// Builds fresh child states seeded from `self`.
    fn split(&self) -> Self::Fields;

    /// Reads every child back into a record.
    fn join(fields: &Self::Fields) -> Self;

    /// Calls `notify` whenever any child changes.
    fn watch(fields: &Self::Fields, notify: Rc<dyn Fn()>) -> Vec<Unsubscribe>;

    fn dispose(fields: &Self::Fields);

    /// Writes every present patch field into its child.
    fn apply(fields: &Self::Fields, patch: Self::Patch, force: bool);

    /// A patch touching every field.
    fn into_patch(self) -> Self::Patch;
}

pub struct Struct<R: Shape> {
    parent: State<R>,
    fields: Rc<R::Fields>,
}

impl<R: Shape> Clone for Struct<R> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
            fields: self.fields.clone(),
        }
    }
}

impl<R: Shape + fmt::Debug> fmt::Debug for Struct<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Struct").field(&self.parent).finish()
    }
}

impl<R: Shape + PartialEq> Struct<R> {
    pub fn new(initial: R) -> Self {
        Self::with_options(initial, StateOptions::default())
    }
}

impl<R: Shape> Struct<R> {
    /// `options` apply to the aggregate state; children use their own
    /// `PartialEq` gating.
    pub fn with_options(initial: R, options: StateOptions<R>) -> Self {
        let fields = Rc::new(initial.split());
        let parent = State::with_options(initial, options);

        let weak_fields: Weak<R::Fields> = Rc::downgrade(&fields);
        let weak_parent = parent.downgrade();
        let resync: Rc<dyn Fn()> = Rc::new(move || {
            if let (Some(fields), Some(parent)) = (weak_fields.upgrade(), weak_parent.upgrade()) {
                parent.commit(R::join(&fields), false);
            }
        });
        for unsub in R::watch(&fields, resync) {
            parent.manager().add(unsub);
        }
        {
            let fields = fields.clone();
            parent.manager().defer(move || R::dispose(&fields));
        }

        Self { parent, fields }
    }

    /// The per-field child states. Their identity is stable for the lifetime
    /// of the struct.
    pub fn fields(&self) -> &R::Fields {
        &self.fields
    }

    pub fn keys(&self) -> &'static [&'static str] {
        R::KEYS
    }

    pub fn get(&self) -> R {
        self.parent.get()
    }

    pub fn with<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        self.parent.with(f)
    }

    /// Writes the fields present in `patch`.
    pub fn set(&self, patch: R::Patch) {
        self.write(patch, false);
    }

    /// With `force`, every touched child notifies even if unchanged.
    pub fn write(&self, patch: R::Patch, force: bool) {
        R::apply(&self.fields, patch, force);
    }

    /// Writes every field of `value`.
    pub fn replace(&self, value: R) {
        self.set(value.into_patch());
    }

    /// Computes a patch from the current value.
    pub fn update(&self, f: impl FnOnce(&R) -> R::Patch) {
        let patch = self.parent.with(f);
        self.set(patch);
    }

    pub fn on(&self, f: impl Fn(&R) + 'static) -> Unsubscribe {
        self.parent.on(f)
    }

    pub fn events(&self) -> &Events<StateEvent<R>> {
        self.parent.events()
    }

    pub fn manager(&self) -> &Manager {
        self.parent.manager()
    }

    /// The aggregate state.
    pub fn state(&self) -> &State<R> {
        &self.parent
    }

    /// Disposes the aggregate and every child.
    pub fn dispose(&self) {
        self.parent.dispose();
    }
}

impl<R: Shape> Subscribable for Struct<R> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.parent.subscribe_change(f)
    }

    fn source_id(&self) -> usize {
        self.parent.source_id()
    }
}

impl<R: Shape> Gettable for Struct<R> {
    type Value = R;

    fn get(&self) -> R {
        Struct::get(self)
    }
}

impl<R: Shape> Disposable for Struct<R> {
    fn dispose(&self) {
        Struct::dispose(self)
    }
}
