//! Bridges a state to an external store. No backends live here; callers
//! implement [`Storage`] over whatever they persist to.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::{State, Unsubscribe};

pub trait Storage<T> {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<T>>;

    fn save(&self, value: &T) -> Result<()>;
}

/// Wraps any backend error as [`Error::Storage`].
pub fn storage_error(err: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::Storage(Box::new(err))
}

/// Seeds `state` from `storage`, then writes every later value back.
///
/// Failed writes are logged and the state keeps its value. The returned
/// handle stops the write-back; it is also registered on the state's manager.
pub fn persist<T, S>(state: &State<T>, storage: S) -> Result<Unsubscribe>
where
    T: Clone + 'static,
    S: Storage<T> + 'static,
{
    if let Some(value) = storage.load()? {
        state.set(value);
    }
    let storage = Rc::new(storage);
    let unsub = state.on(move |value| {
        if let Err(err) = storage.save(value) {
            log::warn!("persist: write failed: {err}");
        }
    });
    state.manager().add(unsub.clone());
    Ok(unsub)
}
