//! Collection error taxonomy.
//!
//! # Invariants
//! - Every error is raised before any element is merged, appended or moved.
//! - Errors are never retried or swallowed inside the core.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result alias for collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Errors from reconciling collection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    /// Incoming snapshot is null or malformed.
    InvalidArgument(String),
    /// `change_ordinal` index is outside `0..len`.
    IndexOutOfRange { index: usize, len: usize },
    /// Mutation requested while the collection is mutating or dispatching.
    ReentrancyViolation,
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range for collection of length {len}")
            }
            Self::ReentrancyViolation => write!(
                f,
                "collection cannot be mutated while a change is being applied or dispatched"
            ),
        }
    }
}

impl Error for CollectionError {}
