//! Folder listing: the merged, paginated contents of resolved prefixes.

use crate::error::{ErrorKind, Result};
use crate::paginate::Paginated;
use crate::request::Window;
use futures::TryStreamExt;
use snapshelf_catalog::{Entry, FilesetId, PrefixId, Session};

/// List the immediate children of every prefix in `prefixes`, ordered by
/// full path, one `window` of them.
///
/// Duplicate prefixes are listed once. Without any prefix nothing is read
/// from the catalog at all.
#[tracing::instrument(level = "debug", skip(session, prefixes), fields(count = prefixes.len()))]
pub(crate) async fn list(
    session: &mut Session,
    fileset: FilesetId,
    prefixes: &[PrefixId],
    window: Window,
) -> Result<Paginated<Entry>> {
    let mut prefixes = prefixes.to_vec();
    prefixes.sort_unstable();
    prefixes.dedup();
    if prefixes.is_empty() {
        return Ok(Paginated::empty(window));
    }
    let total = session.count_children_of(fileset, &prefixes).await.map_err(ErrorKind::store)?;
    let items = match window.offset() < total {
        true => session
            .children_of(fileset, &prefixes, window.offset(), window.limit())
            .try_collect()
            .await
            .map_err(ErrorKind::store)?,
        false => Vec::new(),
    };
    Ok(Paginated::new(window, total, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefix::resolve_many;
    use rstest::rstest;
    use snapshelf_catalog::{CancellationToken, Database, Recorder};
    use time::UtcDateTime;

    async fn catalog() -> (Database, FilesetId) {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let now = UtcDateTime::from_unix_timestamp(1_000).unwrap();
        let fileset = recorder.record_fileset(now).await.unwrap();
        for i in 0..25 {
            recorder.record_file(fileset, &format!("big/{i:02}.txt"), 1, "h", now).await.unwrap();
        }
        recorder.record_file(fileset, "small/a.txt", 1, "h", now).await.unwrap();
        recorder.record_folder(fileset, "small/sub", now).await.unwrap();
        recorder.record_file(fileset, "small/sub/deep.txt", 1, "h", now).await.unwrap();
        (db, fileset)
    }

    async fn listing(folders: &[&str], offset: i64, limit: i64) -> Paginated<Entry> {
        let (db, fileset) = catalog().await;
        let mut session = db.session(&CancellationToken::new()).await.unwrap();
        let prefixes: Vec<PrefixId> = resolve_many(&mut session, fileset, folders.iter(), true)
            .try_filter_map(|prefix| futures::future::ready(Ok(prefix)))
            .try_collect()
            .await
            .unwrap();
        list(&mut session, fileset, &prefixes, Window::new(offset, limit).unwrap()).await.unwrap()
    }

    fn paths(page: &Paginated<Entry>) -> Vec<&str> {
        page.items().iter().map(|entry| entry.path.as_str()).collect()
    }

    #[rstest]
    #[case(0, 10, 10, 1)]
    #[case(20, 10, 5, 3)]
    #[case(25, 10, 0, 3)]
    #[case(40, 10, 0, 5)]
    #[tokio::test]
    async fn test_pages(#[case] offset: i64, #[case] limit: i64, #[case] count: u64, #[case] page: u64) {
        let result = listing(&["big"], offset, limit).await;
        assert_eq!(result.total(), 25);
        assert_eq!(result.count(), count);
        assert_eq!(result.page(), page);
        assert_eq!(result.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_pages_partition_listing() {
        let whole = listing(&["big"], 0, 100).await;
        let mut stitched = Vec::new();
        for offset in (0..25).step_by(7) {
            stitched.extend(listing(&["big"], offset, 7).await.into_items());
        }
        assert_eq!(stitched, whole.into_items());
    }

    #[tokio::test]
    async fn test_only_immediate_children() {
        let result = listing(&["small"], 0, 10).await;
        assert_eq!(paths(&result), ["small/a.txt", "small/sub"]);
        assert_eq!(result.items()[0].size, Some(1));
        assert!(result.items()[1].is_folder());
    }

    #[tokio::test]
    async fn test_union_is_ordered_by_path() {
        let result = listing(&["small", "small/sub", "big"], 0, 100).await;
        assert_eq!(result.total(), 28);
        let listed = paths(&result);
        let mut sorted = listed.clone();
        sorted.sort_unstable();
        assert_eq!(listed, sorted);
        assert_eq!(listed.last(), Some(&"small/sub/deep.txt"));
    }

    #[tokio::test]
    async fn test_duplicate_folders_listed_once() {
        let result = listing(&["small", "/small/", "small"], 0, 10).await;
        assert_eq!(result.total(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_folders_are_empty() {
        let result = listing(&["nowhere", "../small"], 0, 10).await;
        assert_eq!((result.total(), result.count(), result.total_pages()), (0, 0, 1));
    }
}
