//! A bounded log of the values a state has moved away from.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use web_time::Instant;

use crate::error::{Error, Result};
use crate::source::Subscribable;
use crate::state::WeakState;
use crate::{Disposable, State, StateOptions, Unsubscribe};

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry<T> {
    pub at: Instant,
    pub value: T,
}

#[derive(Clone, Copy, Debug)]
pub struct HistoryOptions {
    /// Oldest entries are dropped past this many.
    pub limit: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self { limit: 50 }
    }
}

pub struct History<T: 'static> {
    source: WeakState<T>,
    log: State<VecDeque<HistoryEntry<T>>>,
}

impl<T: 'static> Clone for History<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            log: self.log.clone(),
        }
    }
}

impl<T: fmt::Debug + Clone + 'static> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.log.get())
            .finish()
    }
}

impl<T: Clone + 'static> State<T> {
    /// Starts recording outgoing values, newest last.
    pub fn history(&self, options: HistoryOptions) -> History<T> {
        let log = State::with_options(VecDeque::new(), StateOptions::unchecked());
        let limit = options.limit;
        let sink = log.clone();
        let unsub = self.on_previous(move |at, value| {
            sink.mutate(|entries: &mut VecDeque<HistoryEntry<T>>| {
                entries.push_back(HistoryEntry {
                    at,
                    value: value.clone(),
                });
                while entries.len() > limit {
                    entries.pop_front();
                }
            });
        });
        log.manager().add(unsub);
        self.manager().track(History {
            source: self.downgrade(),
            log,
        })
    }
}

impl<T: Clone + 'static> History<T> {
    pub fn entries(&self) -> Vec<HistoryEntry<T>> {
        self.log.with(|entries| entries.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.log.with(VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes an entry back into the source. `offset` counts from the end:
    /// `-1` is the most recent entry.
    ///
    /// The restore is itself a change, so the replaced value is recorded as a
    /// new entry. Does nothing once the source has been dropped.
    pub fn restore(&self, offset: isize) -> Result<()> {
        let len = self.len();
        let index = len as isize + offset;
        let value = usize::try_from(index)
            .ok()
            .and_then(|i| self.log.with(|entries| entries.get(i).map(|e| e.value.clone())))
            .ok_or(Error::HistoryOutOfRange { offset, len })?;
        if let Some(source) = self.source.upgrade() {
            source.set(value);
        }
        Ok(())
    }

    /// Subscribes to the log after each change.
    pub fn on(&self, f: impl Fn(&VecDeque<HistoryEntry<T>>) + 'static) -> Unsubscribe {
        self.log.on(f)
    }

    /// The underlying log state.
    pub fn log(&self) -> &State<VecDeque<HistoryEntry<T>>> {
        &self.log
    }

    /// Stops recording and drops the log's subscribers.
    pub fn dispose(&self) {
        self.log.dispose();
    }
}

impl<T: Clone + 'static> Subscribable for History<T> {
    fn subscribe_change(&self, f: Rc<dyn Fn()>) -> Unsubscribe {
        self.log.subscribe_change(f)
    }

    fn source_id(&self) -> usize {
        self.log.source_id()
    }
}

impl<T: Clone + 'static> Disposable for History<T> {
    fn dispose(&self) {
        History::dispose(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Clock, ManualClock};
    use std::cell::Cell;
    use web_time::Duration;

    fn values(h: &History<i32>) -> Vec<i32> {
        h.entries().into_iter().map(|e| e.value).collect()
    }

    #[test]
    fn records_outgoing_values() {
        let s = State::new(1);
        let h = s.history(HistoryOptions::default());
        s.set(2);
        s.set(3);
        s.set(3);
        assert_eq!(values(&h), vec![1, 2]);
    }

    #[test]
    fn respects_limit() {
        let s = State::new(0);
        let h = s.history(HistoryOptions { limit: 3 });
        for v in 1..=10 {
            s.set(v);
        }
        assert_eq!(values(&h), vec![7, 8, 9]);
    }

    #[test]
    fn restore_from_end() {
        let s = State::new(1);
        let h = s.history(HistoryOptions::default());
        s.set(2);
        s.set(3);
        h.restore(-1).unwrap();
        assert_eq!(s.get(), 2);
        assert_eq!(values(&h), vec![1, 2, 3]);
        h.restore(-3).unwrap();
        assert_eq!(s.get(), 1);
    }

    #[test]
    fn restore_out_of_range_is_an_error() {
        let s = State::new(1);
        let h = s.history(HistoryOptions::default());
        s.set(2);
        assert!(matches!(
            h.restore(-2),
            Err(Error::HistoryOutOfRange { offset: -2, len: 1 })
        ));
        assert!(h.restore(0).is_err());
        assert_eq!(s.get(), 2);
    }

    #[test]
    fn entries_carry_change_time() {
        let clock = ManualClock::new();
        let s = State::with_options(1, StateOptions::default().clock(Rc::new(clock.clone())));
        let h = s.history(HistoryOptions::default());
        clock.advance(Duration::from_secs(1));
        s.set(2);
        assert_eq!(h.entries()[0].at, clock.now());
    }

    #[test]
    fn notifies_on_each_entry() {
        let s = State::new(1);
        let h = s.history(HistoryOptions::default());
        let lens = Rc::new(Cell::new(0));
        {
            let lens = lens.clone();
            h.on(move |entries| lens.set(entries.len()));
        }
        s.set(2);
        s.set(4);
        assert_eq!(lens.get(), 2);
    }

    #[test]
    fn dispose_stops_recording() {
        let s = State::new(1);
        let h = s.history(HistoryOptions::default());
        h.dispose();
        s.set(2);
        assert!(h.is_empty());
        assert_eq!(s.events().size(), 0);
    }
}
