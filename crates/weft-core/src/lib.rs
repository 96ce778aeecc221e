//! # States, Events, and Managers
//!
//! Weft is a small single-threaded reactive core. There are four main pieces:
//!
//! - `State<T>`: an observable value, plain or computed from other states.
//! - `Events<E>`: a typed publish/subscribe channel keyed by topic.
//! - `Manager`: an ownership node that disposes everything registered on it.
//! - `Struct<R>`: a record-shaped state backed by one child state per field.
//!
//! ## States
//!
//! `State<T>` is a cloneable handle. Writes are gated by equality and notify
//! subscribers synchronously:
//!
//! ```rust
//! use weft_core::*;
//!
//! let count = State::new(0);
//! let seen = count.on(|v| println!("count = {v}"));
//! count.set(1);
//! count.update(|v| v + 1);
//! assert_eq!(count.get(), 2);
//! seen.run();
//! ```
//!
//! ## Computed states
//!
//! A compute function reads its inputs through a [`Tracker`]. Inputs read on
//! the first run become dependencies; each of their changes recomputes the
//! state:
//!
//! ```rust
//! use weft_core::*;
//!
//! let first = State::new("Jane".to_string());
//! let last = State::new("Doe".to_string());
//!
//! let full = State::computed({
//!     let first = first.clone();
//!     let last = last.clone();
//!     move |t| format!("{} {}", t.get(&first), t.get(&last))
//! });
//!
//! last.set("Roe".into());
//! assert_eq!(full.get(), "Jane Roe");
//! ```
//!
//! ## Lifetimes
//!
//! Every state owns a [`Manager`]; anything tracked on it is released when the
//! state is disposed. Managers nest, so a whole feature can be torn down with
//! one call:
//!
//! ```rust
//! use weft_core::*;
//!
//! let feature = Manager::new();
//! let volume = feature.track(State::new(3u8));
//! let label = feature.track(volume.readonly());
//! feature.dispose();
//! assert!(volume.is_disposed() && label.is_disposed());
//! ```
//!
//! ## Time
//!
//! Nothing here sleeps or spawns. Throttled states and [`Tasks`] schedule work
//! on a [`Timers`] queue that the host drains with [`Timers::run_due`]; tests
//! drive the same queue with a [`ManualClock`].

extern crate self as weft_core;

pub mod clock;
pub mod dispose;
pub mod effect;
pub mod error;
pub mod events;
pub mod history;
pub mod manager;
pub mod persist;
pub mod prelude;
pub mod queue;
pub mod readonly;
pub mod shape;
pub mod source;
pub mod state;
pub mod subscriptions;
pub mod tasks;
pub mod timers;
pub mod wrap;


pub use clock::*;
pub use dispose::*;
pub use effect::*;
pub use error::*;
pub use events::*;
pub use history::*;
pub use manager::*;
pub use persist::*;
pub use queue::*;
pub use readonly::*;
pub use shape::*;
pub use source::*;
pub use state::*;
pub use subscriptions::*;
pub use tasks::*;
pub use timers::*;
pub use wrap::*;

pub use web_time::{Duration, Instant};

#[cfg(feature = "derive")]
pub use weft_macros::Shape;
