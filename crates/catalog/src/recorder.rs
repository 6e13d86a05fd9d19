//! Write access to the catalog for the backup-write path.
//!
//! Listing never writes. The recorder exists so that a sealed backup can
//! describe what it stored, and so that other crates can build fixtures.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{EntryKind, FilesetId};
use crate::path::components;
use exn::{OptionExt, ResultExt};
use sqlx::{SqliteConnection, SqlitePool};
use time::UtcDateTime;

/// Content reference of a recorded file.
struct Content<'a> {
    size: u64,
    blockset_hash: &'a str,
}

/// Records filesets and the entries that belong to them.
///
/// # Relationships
///
/// - An entry is shared by every fileset in which it is unchanged
/// - Changed content at the same path is a new entry
/// - Recording a path also records every missing ancestor folder in the
///   fileset, so a fileset never holds an entry whose parent it lacks
#[derive(Debug, Clone)]
pub struct Recorder {
    pool: SqlitePool,
}
impl From<&Database> for Recorder {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Recorder {
    /// Create a new fileset taken at `timestamp`.
    pub async fn record_fileset(&self, timestamp: UtcDateTime) -> Result<FilesetId> {
        let id: i64 = sqlx::query_scalar(include_str!("../queries/insert_fileset.sql"))
            .bind(timestamp.unix_timestamp())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!(fileset = id, "Recorded fileset");
        Ok(FilesetId(id))
    }

    /// Record a file (and its ancestor folders) as part of `fileset`.
    pub async fn record_file(
        &self,
        fileset: FilesetId,
        path: &str,
        size: u64,
        blockset_hash: &str,
        last_modified: UtcDateTime,
    ) -> Result<()> {
        let content = Content { size, blockset_hash };
        self.record(fileset, path, EntryKind::File, Some(content), last_modified).await
    }

    /// Record a folder (and its ancestor folders) as part of `fileset`.
    pub async fn record_folder(&self, fileset: FilesetId, path: &str, last_modified: UtcDateTime) -> Result<()> {
        self.record(fileset, path, EntryKind::Folder, None, last_modified).await
    }

    async fn record(
        &self,
        fileset: FilesetId,
        path: &str,
        kind: EntryKind,
        content: Option<Content<'_>>,
        last_modified: UtcDateTime,
    ) -> Result<()> {
        let components = components(path).ok_or_raise(|| ErrorKind::InvalidData("path"))?;
        let (name, ancestors) = components.split_last().ok_or_raise(|| ErrorKind::InvalidData("path"))?;
        let last_modified = last_modified.unix_timestamp();

        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let mut parent: i64 = sqlx::query_scalar(include_str!("../queries/root_prefix.sql"))
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut prefix = String::new();
        for ancestor in ancestors {
            prefix = format!("{prefix}{ancestor}/");
            let folder = Self::upsert_prefix(&mut tx, &prefix).await?;
            let entry = Self::upsert_entry(&mut tx, parent, ancestor, EntryKind::Folder, Some(folder), None).await?;
            // Ancestors keep whatever modification time they were given
            // when they were recorded for their own sake.
            Self::link(&mut tx, fileset, entry, last_modified, include_str!("../queries/link_fileset_entry.sql")).await?;
            parent = folder;
        }
        let entry = match kind {
            EntryKind::Folder => {
                let folder = Self::upsert_prefix(&mut tx, &format!("{prefix}{name}/")).await?;
                Self::upsert_entry(&mut tx, parent, name, kind, Some(folder), None).await?
            },
            EntryKind::File => Self::upsert_entry(&mut tx, parent, name, kind, None, content).await?,
        };
        Self::link(&mut tx, fileset, entry, last_modified, include_str!("../queries/upsert_fileset_entry.sql")).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    /// Make `entry` the fileset's only entry at its path, then add it to the
    /// fileset with `query`.
    async fn link(
        conn: &mut SqliteConnection,
        fileset: FilesetId,
        entry: i64,
        last_modified: i64,
        query: &'static str,
    ) -> Result<()> {
        sqlx::query(include_str!("../queries/unlink_shadowed.sql"))
            .bind(fileset.0)
            .bind(entry)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(query)
            .bind(fileset.0)
            .bind(entry)
            .bind(last_modified)
            .execute(&mut *conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }

    async fn upsert_prefix(conn: &mut SqliteConnection, prefix: &str) -> Result<i64> {
        sqlx::query_scalar(include_str!("../queries/upsert_prefix.sql"))
            .bind(prefix)
            .fetch_one(conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    async fn upsert_entry(
        conn: &mut SqliteConnection,
        parent: i64,
        name: &str,
        kind: EntryKind,
        prefix: Option<i64>,
        content: Option<Content<'_>>,
    ) -> Result<i64> {
        let size = content
            .as_ref()
            .map(|c| i64::try_from(c.size).or_raise(|| ErrorKind::InvalidData("file size")))
            .transpose()?;
        sqlx::query_scalar(include_str!("../queries/upsert_entry.sql"))
            .bind(parent)
            .bind(name)
            .bind(kind.as_str())
            .bind(prefix)
            .bind(size)
            .bind(content.as_ref().map_or("", |c| c.blockset_hash))
            .fetch_one(conn)
            .await
            .or_raise(|| ErrorKind::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: i64) -> UtcDateTime {
        UtcDateTime::from_unix_timestamp(ts).unwrap()
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(db.pool()).await.unwrap()
    }

    #[tokio::test]
    async fn test_records_ancestors() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let fileset = recorder.record_fileset(at(100)).await.unwrap();
        recorder.record_file(fileset, "/a/b/c/file.txt", 5, "hash", at(50)).await.unwrap();
        // Root plus a/, a/b/, a/b/c/
        assert_eq!(count(&db, "prefixes").await, 4);
        // Three folders and one file
        assert_eq!(count(&db, "entries").await, 4);
        assert_eq!(count(&db, "fileset_entries").await, 4);
    }

    #[tokio::test]
    async fn test_unchanged_entries_are_shared() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        for ts in [100, 200] {
            let fileset = recorder.record_fileset(at(ts)).await.unwrap();
            recorder.record_file(fileset, "docs/a.txt", 5, "same", at(50)).await.unwrap();
        }
        assert_eq!(count(&db, "entries").await, 2);
        assert_eq!(count(&db, "fileset_entries").await, 4);
    }

    #[tokio::test]
    async fn test_changed_content_is_a_new_entry() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let first = recorder.record_fileset(at(100)).await.unwrap();
        recorder.record_file(first, "a.txt", 5, "old", at(50)).await.unwrap();
        let second = recorder.record_fileset(at(200)).await.unwrap();
        recorder.record_file(second, "a.txt", 6, "new", at(150)).await.unwrap();
        assert_eq!(count(&db, "entries").await, 2);
    }

    async fn memberships(db: &Database, fileset: FilesetId) -> Vec<(String, String, Option<i64>)> {
        sqlx::query_as(
            "SELECT p.prefix || e.name, e.kind, e.size FROM fileset_entries fe
             JOIN entries e ON e.id = fe.entry_id JOIN prefixes p ON p.id = e.parent_id
             WHERE fe.fileset_id = ?1 ORDER BY 1, 2",
        )
        .bind(fileset.0)
        .fetch_all(db.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_rerecorded_path_replaces_membership() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let fileset = recorder.record_fileset(at(100)).await.unwrap();
        recorder.record_file(fileset, "docs/a.txt", 1, "old", at(50)).await.unwrap();
        recorder.record_file(fileset, "docs/a.txt", 2, "new", at(60)).await.unwrap();
        recorder.record_file(fileset, "x", 3, "file", at(50)).await.unwrap();
        recorder.record_folder(fileset, "x", at(60)).await.unwrap();
        let expected = vec![
            ("docs".to_string(), "folder".to_string(), None),
            ("docs/a.txt".to_string(), "file".to_string(), Some(2)),
            ("x".to_string(), "folder".to_string(), None),
        ];
        assert_eq!(memberships(&db, fileset).await, expected);
    }

    #[tokio::test]
    async fn test_ancestor_replaces_file_of_same_name() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let fileset = recorder.record_fileset(at(100)).await.unwrap();
        recorder.record_file(fileset, "x", 3, "file", at(50)).await.unwrap();
        recorder.record_file(fileset, "x/inner.txt", 4, "inner", at(50)).await.unwrap();
        let paths: Vec<(String, String)> =
            memberships(&db, fileset).await.into_iter().map(|(path, kind, _)| (path, kind)).collect();
        assert_eq!(
            paths,
            vec![("x".to_string(), "folder".to_string()), ("x/inner.txt".to_string(), "file".to_string())]
        );
    }

    #[tokio::test]
    async fn test_replacement_is_per_fileset() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let first = recorder.record_fileset(at(100)).await.unwrap();
        recorder.record_file(first, "a.txt", 1, "old", at(50)).await.unwrap();
        let second = recorder.record_fileset(at(200)).await.unwrap();
        recorder.record_file(second, "a.txt", 2, "new", at(150)).await.unwrap();
        assert_eq!(memberships(&db, first).await, vec![("a.txt".to_string(), "file".to_string(), Some(1))]);
        assert_eq!(memberships(&db, second).await, vec![("a.txt".to_string(), "file".to_string(), Some(2))]);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_escaping_paths() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let fileset = recorder.record_fileset(at(100)).await.unwrap();
        for path in ["", "/", "../outside"] {
            let err = recorder.record_folder(fileset, path, at(50)).await.unwrap_err();
            assert_eq!(*err, ErrorKind::InvalidData("path"));
        }
    }

    #[tokio::test]
    async fn test_unknown_fileset_is_rejected() {
        let db = Database::connect_in_memory().await.unwrap();
        let recorder = Recorder::from(&db);
        let err = recorder.record_folder(FilesetId(42), "docs", at(50)).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
    }
}
