use thiserror::Error;

use crate::manager::UniqueKey;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unique key {key:?} already holds an instance of a different type")]
    UniqueTypeMismatch { key: UniqueKey },

    #[error("no history entry at offset {offset} (history holds {len})")]
    HistoryOutOfRange { offset: isize, len: usize },

    #[error("task `{id}` needs a non-zero interval")]
    ZeroInterval { id: String },

    #[error("storage failed")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
