//! SQLite metadata catalog of backup filesets.
//!
//! The catalog indexes what the backup-write path has already stored in
//! remote volumes. It never talks to remote storage itself: block and volume
//! handling belongs elsewhere, the catalog only knows which paths exist in
//! which fileset.
//!
//! # Architecture
//! - **Filesets**: one row per snapshot, ranked by recency into versions
//!   (`0` is the newest).
//! - **Prefixes**: normalized folder paths, so folders are compared by
//!   identifier instead of by string.
//! - **Entries**: files and folders, shared between every fileset in which
//!   they are unchanged.
//!
//! Reads go through a request-scoped [`Session`] whose every query can be
//! cancelled; writes go through the [`Recorder`].

mod cancel;
mod db;
pub mod error;
mod models;
pub mod path;
mod recorder;
mod session;

pub use crate::db::Database;
pub use crate::models::{Entry, EntryKind, Fileset, FilesetFilter, FilesetId, PrefixId};
pub use crate::recorder::Recorder;
pub use crate::session::Session;
pub use tokio_util::sync::CancellationToken;
