//! Snapshot resolution: which fileset does a selector mean?

use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use futures::{StreamExt, TryStreamExt};
use snapshelf_catalog::{Fileset, FilesetFilter, Session};

/// Find the single fileset matching `filter`.
///
/// Fails with [`ErrorKind::NoMatchingSnapshot`] when nothing matches and with
/// [`ErrorKind::AmbiguousSnapshot`] when more than one fileset does. Never
/// picks one of several candidates on the caller's behalf.
#[tracing::instrument(level = "debug", skip(session))]
pub(crate) async fn resolve(session: &mut Session, filter: FilesetFilter) -> Result<Fileset> {
    let mut matches = std::pin::pin!(session.find_filesets(filter));
    let first = matches
        .next()
        .await
        .transpose()
        .map_err(ErrorKind::store)?
        .ok_or_raise(|| ErrorKind::NoMatchingSnapshot)?;
    if let Some(second) = matches.next().await.transpose().map_err(ErrorKind::store)? {
        tracing::debug!(first = %first.id, second = %second.id, ?filter, "Selector matches several filesets");
        exn::bail!(ErrorKind::AmbiguousSnapshot);
    }
    Ok(first)
}

/// Every fileset in the catalog, most recent first.
pub(crate) async fn all(session: &mut Session) -> Result<Vec<Fileset>> {
    session.filesets().try_collect().await.map_err(ErrorKind::store)
}
