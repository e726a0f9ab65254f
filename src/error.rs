//! Error taxonomy shared by the table, its cursors, views and the guard.

use thiserror::Error;

/// Errors reported synchronously at the point of misuse.
#[derive(Error, Debug)]
pub enum TableError {
    /// A constructor or batch argument is out of range.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument
        reason: String,
    },

    /// A cursor was advanced past its last element.
    #[error("cursor exhausted: no more pairs to visit")]
    Exhausted,

    /// `remove` was called without a preceding `next`, or twice for one `next`.
    #[error("invalid cursor state: remove requires a preceding next")]
    InvalidIteratorState,

    /// A mutation was attempted through a read-only view.
    #[error("unsupported mutation through a read-only view")]
    UnsupportedMutation,

    /// A scoped view, or something derived from it, was used after its
    /// critical section ended.
    #[error("scoped view used after its critical section ended")]
    StaleView,

    /// An entry handle outlived its key or the generation it was taken in.
    #[error("entry handle is stale")]
    StaleEntry,

    /// An entry handle was used with a table other than the one it came from.
    #[error("entry handle belongs to a different table")]
    WrongTable,

    /// The persisted form declares a pair count that does not match its body.
    #[error("corrupt persisted form: declared {declared} pairs, found {actual}")]
    CorruptPersistedForm {
        /// Pair count written in the header
        declared: usize,
        /// Pairs actually present
        actual: usize,
    },

    /// Byte codec failure while reading or writing the persisted form.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl TableError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        TableError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, TableError>;
