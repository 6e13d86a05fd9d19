//! Read-only browsing of the snapshelf catalog.
//!
//! A [`Browser`] answers one kind of question: *what did this folder look
//! like in that snapshot?* Requests select a fileset by time and/or version,
//! then either ask for the compressed root view of the whole fileset or for
//! one page of the merged contents of several folders.
//!
//! Every request runs on one pooled connection and honours the caller's
//! [`CancellationToken`]. The catalog is never written to.

pub mod error;
mod fileset;
mod index;
mod list;
mod paginate;
mod prefix;
mod request;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::{TryStreamExt, future};
use snapshelf_config::{Config, ListingConfig, TimeGranularity};
use tracing::instrument;

pub use crate::paginate::Paginated;
pub use crate::request::{ListFolderRequest, Selector, Shape, TimeSelector, Window};
pub use snapshelf_catalog::{CancellationToken, Database, Entry, EntryKind, Fileset, FilesetId};

/// How folder strings and times in requests are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingOptions {
    pub time_granularity: TimeGranularity,
    pub case_sensitive: bool,
}
impl Default for ListingOptions {
    fn default() -> Self {
        Self::from(&ListingConfig::default())
    }
}
impl From<&ListingConfig> for ListingOptions {
    fn from(config: &ListingConfig) -> Self {
        Self { time_granularity: config.time_granularity, case_sensitive: config.case_sensitive }
    }
}

#[derive(Debug, Clone)]
pub struct Browser {
    db: Database,
    options: ListingOptions,
}

impl Browser {
    pub fn new(db: Database, options: ListingOptions) -> Self {
        Self { db, options }
    }

    /// Open the local catalog named by `config`, read-only.
    ///
    /// A disabled or missing catalog is [`ErrorKind::StoreUnavailable`]; the
    /// catalog is only ever created by the backup-write path.
    #[instrument(skip_all)]
    pub async fn open(config: &Config) -> Result<Self> {
        if config.database.disabled {
            tracing::warn!("Local catalog disabled by configuration");
            exn::bail!(ErrorKind::StoreUnavailable);
        }
        let path = config.database.resolved_path().or_raise(|| ErrorKind::StoreUnavailable)?;
        if !path.is_file() {
            tracing::warn!(path = %path.display(), "No local catalog");
            exn::bail!(ErrorKind::StoreUnavailable);
        }
        let db = Database::open(&path, Some(config.database.max_connections)).await.map_err(ErrorKind::store)?;
        Ok(Self::new(db, ListingOptions::from(&config.listing)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Resolve the request's selector to one fileset and list it.
    ///
    /// The request is validated before any connection is taken. The root
    /// view ignores `offset` and `limit` and always fits on a single page.
    #[instrument(skip_all, fields(folders = request.folders.len(), offset = request.offset, limit = request.limit))]
    pub async fn list_folder(&self, request: &ListFolderRequest, token: &CancellationToken) -> Result<Paginated<Entry>> {
        let shape = request.shape()?;
        let filter = request.selector.filter(self.options.time_granularity)?;

        let mut session = self.db.session(token).await.map_err(ErrorKind::store)?;
        let fileset = fileset::resolve(&mut session, filter).await?;
        tracing::debug!(fileset = %fileset.id, version = fileset.version, "Resolved fileset");

        match shape {
            Shape::Root => {
                let entries: Vec<Entry> = index::root_prefixes(&mut session, fileset.id).try_collect().await?;
                Ok(Paginated::whole(entries))
            },
            Shape::Folders(folders, window) => {
                let prefixes: Vec<_> = prefix::resolve_many(&mut session, fileset.id, folders, self.options.case_sensitive)
                    .try_filter_map(|prefix| future::ready(Ok(prefix)))
                    .try_collect()
                    .await?;
                list::list(&mut session, fileset.id, &prefixes, window).await
            },
        }
    }

    /// Every fileset in the catalog, most recent first.
    #[instrument(skip_all)]
    pub async fn filesets(&self, token: &CancellationToken) -> Result<Vec<Fileset>> {
        let mut session = self.db.session(token).await.map_err(ErrorKind::store)?;
        fileset::all(&mut session).await
    }
}
