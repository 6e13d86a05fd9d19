//! Request-scoped, cancellable read access to the catalog.

use crate::cancel::{cursor, guard};
use crate::error::{ErrorKind, Result};
use crate::models::{Entry, EntryRow, Fileset, FilesetFilter, FilesetId, FilesetRow, PrefixId};
use crate::path::normalize_folder;
use async_stream::stream;
use exn::ResultExt;
use futures::{Stream, TryStreamExt};
use sqlx::Sqlite;
use sqlx::pool::PoolConnection;
use tokio_util::sync::CancellationToken;

/// One pooled connection plus the cancellation token of the request that
/// owns it.
///
/// Every method is a cancellation checkpoint. The connection goes back to
/// the pool when the session is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct Session {
    conn: PoolConnection<Sqlite>,
    token: CancellationToken,
}

impl Session {
    pub(crate) fn new(conn: PoolConnection<Sqlite>, token: CancellationToken) -> Self {
        Self { conn, token }
    }

    // =========================================================================
    // Filesets
    // =========================================================================

    /// Stream every fileset, most recent first.
    pub fn filesets(&mut self) -> impl Stream<Item = Result<Fileset>> + '_ {
        let rows = sqlx::query_as::<_, FilesetRow>(include_str!("../queries/list_filesets.sql")).fetch(&mut *self.conn);
        cursor(&self.token, rows)
    }

    /// Stream the filesets matching `filter`, most recent first.
    ///
    /// At most two filesets are ever produced: enough for the caller to tell
    /// a single match from an ambiguous one without reading the whole table.
    pub fn find_filesets(&mut self, filter: FilesetFilter) -> impl Stream<Item = Result<Fileset>> + '_ {
        let rows = sqlx::query_as::<_, FilesetRow>(include_str!("../queries/find_filesets.sql"))
            .bind(filter.version.map(i64::from))
            .bind(filter.from)
            .bind(filter.until)
            .fetch(&mut *self.conn);
        cursor(&self.token, rows)
    }

    // =========================================================================
    // Prefixes
    // =========================================================================

    /// The prefix of the root folder, present in every fileset.
    pub async fn root_prefix(&mut self) -> Result<PrefixId> {
        let id: i64 =
            guard(&self.token, sqlx::query_scalar(include_str!("../queries/root_prefix.sql")).fetch_one(&mut *self.conn))
                .await?;
        Ok(PrefixId(id))
    }

    /// Resolve a literal folder string to the prefix holding its contents in
    /// `fileset`.
    ///
    /// Returns `None` when the folder does not normalize (it escapes the root)
    /// or is not part of the fileset.
    pub async fn resolve_prefix(
        &mut self,
        fileset: FilesetId,
        folder: &str,
        case_sensitive: bool,
    ) -> Result<Option<PrefixId>> {
        let Some(prefix) = normalize_folder(folder) else {
            tracing::debug!(folder, "Folder escapes the root; leaving it unresolved");
            return Ok(None);
        };
        if prefix.is_empty() {
            return self.root_prefix().await.map(Some);
        }
        let query = match case_sensitive {
            true => include_str!("../queries/resolve_prefix.sql"),
            false => include_str!("../queries/resolve_prefix_nocase.sql"),
        };
        let id: Option<i64> = guard(
            &self.token,
            sqlx::query_scalar(query).bind(fileset.0).bind(prefix.as_str()).fetch_optional(&mut *self.conn),
        )
        .await?;
        Ok(id.map(PrefixId))
    }

    // =========================================================================
    // Entries
    // =========================================================================

    /// Immediate children of `parent` in `fileset`, ordered by name (then kind
    /// and row, so entries sharing a name are never skipped), starting
    /// strictly after `after` (keyset pagination), at most `limit` of them.
    pub async fn children(
        &mut self,
        fileset: FilesetId,
        parent: PrefixId,
        after: Option<&Entry>,
        limit: u32,
    ) -> Result<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(include_str!("../queries/list_children.sql"))
            .bind(fileset.0)
            .bind(parent.0)
            .bind(after.map(|entry| entry.name().to_string()))
            .bind(after.map(|entry| entry.kind.as_str()))
            .bind(after.map(|entry| entry.id))
            .bind(i64::from(limit))
            .fetch(&mut *self.conn);
        cursor(&self.token, rows).try_collect().await
    }

    /// Number of immediate children across every prefix in `parents`.
    pub async fn count_children_of(&mut self, fileset: FilesetId, parents: &[PrefixId]) -> Result<u64> {
        let parents = Self::json_ids(parents)?;
        let count: i64 = guard(
            &self.token,
            sqlx::query_scalar(include_str!("../queries/count_folder.sql"))
                .bind(fileset.0)
                .bind(parents)
                .fetch_one(&mut *self.conn),
        )
        .await?;
        u64::try_from(count).or_raise(|| ErrorKind::InvalidData("child count"))
    }

    /// Stream the union of immediate children across every prefix in
    /// `parents`, ordered by full path, skipping `offset` and producing at
    /// most `limit` entries.
    pub fn children_of(
        &mut self,
        fileset: FilesetId,
        parents: &[PrefixId],
        offset: u64,
        limit: u64,
    ) -> impl Stream<Item = Result<Entry>> + '_ {
        let bounds = Self::json_ids(parents).and_then(|parents| {
            let offset = i64::try_from(offset).or_raise(|| ErrorKind::InvalidData("offset"))?;
            let limit = i64::try_from(limit).or_raise(|| ErrorKind::InvalidData("limit"))?;
            Ok((parents, offset, limit))
        });
        let (conn, token) = (&mut self.conn, &self.token);
        stream! {
            let (parents, offset, limit) = match bounds {
                Ok(bounds) => bounds,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let rows = sqlx::query_as::<_, EntryRow>(include_str!("../queries/list_folder.sql"))
                .bind(fileset.0)
                .bind(parents)
                .bind(limit)
                .bind(offset)
                .fetch(&mut **conn);
            for await entry in cursor(token, rows) {
                yield entry;
            }
        }
    }

    fn json_ids(ids: &[PrefixId]) -> Result<String> {
        let ids = ids.iter().map(|id| id.0).collect::<Vec<_>>();
        serde_json::to_string(&ids).or_raise(|| ErrorKind::InvalidData("prefix ids"))
    }
}
