use crate::error::{Error, ErrorKind};
use crate::models::{PrefixId, serialize_rfc3339};
use derive_more::Display;
use exn::{OptionExt, ResultExt};
use serde::Serialize;
use std::str::FromStr;
use time::UtcDateTime;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("folder")]
    Folder,
}
impl EntryKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}
impl FromStr for EntryKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            _ => exn::bail!(ErrorKind::InvalidData("entry kind")),
        }
    }
}

/// A file or folder as it exists in one fileset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Full path from the root, without leading or trailing separators.
    pub path: String,
    pub kind: EntryKind,
    /// Content size; only known for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub last_modified: UtcDateTime,
    /// Prefix holding the contents of a folder; `None` for files.
    #[serde(skip)]
    pub prefix: Option<PrefixId>,
    /// Catalog row; orders entries that share a path.
    #[serde(skip)]
    pub(crate) id: i64,
}
impl Entry {
    /// Last path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    pub(crate) id: i64,
    pub(crate) path: String,
    pub(crate) kind: String,
    #[sqlx(default)]
    pub(crate) size: Option<i64>,
    #[sqlx(default)]
    pub(crate) prefix_id: Option<i64>,
    pub(crate) last_modified: i64,
}
impl TryFrom<EntryRow> for Entry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let kind = row.kind.parse::<EntryKind>()?;
        let prefix = match kind {
            EntryKind::Folder => Some(PrefixId(row.prefix_id.ok_or_raise(|| ErrorKind::InvalidData("folder prefix"))?)),
            EntryKind::File => None,
        };
        Ok(Self {
            path: row.path,
            kind,
            size: row.size.map(|s| u64::try_from(s).or_raise(|| ErrorKind::InvalidData("entry size"))).transpose()?,
            last_modified: UtcDateTime::from_unix_timestamp(row.last_modified)
                .or_raise(|| ErrorKind::InvalidData("last modified date"))?,
            prefix,
            id: row.id,
        })
    }
}
