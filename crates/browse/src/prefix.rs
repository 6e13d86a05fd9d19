//! Mapping requested folder strings to catalog prefixes.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use futures::Stream;
use snapshelf_catalog::{FilesetId, PrefixId, Session};

/// Resolve each of `folders` within `fileset`, in order.
///
/// Produces `None` for a folder that does not exist in the fileset. Stops
/// after the first error.
pub(crate) fn resolve_many<'a, I>(
    session: &'a mut Session,
    fileset: FilesetId,
    folders: I,
    case_sensitive: bool,
) -> impl Stream<Item = Result<Option<PrefixId>>> + 'a
where
    I: IntoIterator + 'a,
    I::Item: AsRef<str>,
{
    stream! {
        for folder in folders {
            let folder = folder.as_ref();
            match session.resolve_prefix(fileset, folder, case_sensitive).await {
                Ok(prefix) => {
                    if prefix.is_none() {
                        tracing::debug!(folder, %fileset, "Folder not found in fileset");
                    }
                    yield Ok(prefix);
                },
                Err(e) => {
                    yield Err(ErrorKind::store(e));
                    return;
                },
            }
        }
    }
}
