//! Browse Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use snapshelf_catalog::error::{Error as CatalogError, ErrorKind as CatalogErrorKind};

/// A browse error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for browse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// There is no local catalog, or it could not be read.
    #[display("local catalog unavailable")]
    StoreUnavailable,
    /// No fileset satisfies the selector.
    #[display("no snapshot matches the selector")]
    NoMatchingSnapshot,
    /// More than one fileset satisfies the selector.
    #[display("more than one snapshot matches the selector")]
    AmbiguousSnapshot,
    /// The request was rejected before the catalog was touched.
    #[display("invalid request: {_0}")]
    InvalidRequestShape(#[error(not(source))] String),
    /// The caller's cancellation token fired.
    #[display("listing cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Convert a catalog error into a browse error, keeping the catalog's
    /// `Exn` frame as a child in the error tree.
    ///
    /// Catalog cancellation stays cancellation; everything else means the
    /// store could not serve the request.
    #[track_caller]
    pub fn store(err: CatalogError) -> Error {
        let kind = match &*err {
            CatalogErrorKind::Cancelled => Self::Cancelled,
            _ => Self::StoreUnavailable,
        };
        err.raise(kind)
    }

    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        Self::InvalidRequestShape(reason.into())
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
