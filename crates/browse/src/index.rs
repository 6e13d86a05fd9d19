//! The root view: a compressed overview of a whole fileset.
//!
//! Each child of the root is walked downwards for as long as the current
//! folder has exactly one child, so a lone `a/b/c/file.txt` shows up as a
//! single entry instead of as folder `a` with nothing else of interest in it.
//! Walks stop at files, at empty folders and at folders with several
//! children.

use crate::error::{ErrorKind, Result};
use async_stream::stream;
use futures::Stream;
use snapshelf_catalog::{Entry, FilesetId, Session};

/// Children of the root fetched per round trip.
const ROOT_BATCH: u32 = 64;

/// Stream the compressed top-level entries of `fileset`, ordered by name.
///
/// Every recorded path of the fileset is covered by exactly one produced
/// entry: either it is that entry, lies below it, or is one of the folders
/// collapsed into it.
pub(crate) fn root_prefixes(session: &mut Session, fileset: FilesetId) -> impl Stream<Item = Result<Entry>> + '_ {
    stream! {
        let root = match session.root_prefix().await {
            Ok(root) => root,
            Err(e) => {
                yield Err(ErrorKind::store(e));
                return;
            },
        };
        let mut after: Option<Entry> = None;
        loop {
            let batch = match session.children(fileset, root, after.as_ref(), ROOT_BATCH).await {
                Ok(batch) => batch,
                Err(e) => {
                    yield Err(ErrorKind::store(e));
                    return;
                },
            };
            let exhausted = batch.len() < ROOT_BATCH as usize;
            after = batch.last().cloned();
            for child in batch {
                match collapse(session, fileset, child).await {
                    Ok(entry) => yield Ok(entry),
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                }
            }
            if exhausted {
                break;
            }
        }
    }
}

/// Follow single-child folders down from `node` and return where the walk
/// stops.
async fn collapse(session: &mut Session, fileset: FilesetId, mut node: Entry) -> Result<Entry> {
    // Only folders carry a prefix.
    while let Some(prefix) = node.prefix {
        let mut children = session.children(fileset, prefix, None, 2).await.map_err(ErrorKind::store)?;
        if children.len() != 1 {
            break;
        }
        let Some(child) = children.pop() else { break };
        tracing::trace!(from = %node.path, to = %child.path, "Collapsing single-child folder");
        node = child;
    }
    Ok(node)
}
