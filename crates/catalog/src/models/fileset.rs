use crate::error::{Error, ErrorKind};
use crate::models::serialize_rfc3339;
use derive_more::Display;
use exn::ResultExt;
use serde::Serialize;
use time::UtcDateTime;

/// Opaque identifier of a recorded fileset (snapshot).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FilesetId(pub(crate) i64);

/// Opaque identifier of a normalized folder path.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixId(pub(crate) i64);

/// One recorded snapshot of the backed-up tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fileset {
    pub id: FilesetId,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: UtcDateTime,
    /// Rank by recency: `0` is the most recent fileset.
    pub version: u32,
}

/// Store-level fileset filter. Every supplied bound must hold for a fileset
/// to match; timestamp bounds are inclusive unix seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilesetFilter {
    pub version: Option<u32>,
    pub from: Option<i64>,
    pub until: Option<i64>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct FilesetRow {
    pub(crate) id: i64,
    pub(crate) timestamp: i64,
    pub(crate) version: i64,
}
impl TryFrom<FilesetRow> for Fileset {
    type Error = Error;
    fn try_from(row: FilesetRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: FilesetId(row.id),
            timestamp: UtcDateTime::from_unix_timestamp(row.timestamp)
                .or_raise(|| ErrorKind::InvalidData("fileset timestamp"))?,
            version: u32::try_from(row.version).or_raise(|| ErrorKind::InvalidData("fileset version"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = FilesetRow { id: 7, timestamp: 1_700_000_000, version: 2 };
        let model = Fileset::try_from(row).unwrap();
        assert_eq!(model.id, FilesetId(7));
        assert_eq!(model.version, 2);
        assert_eq!(model.timestamp.unix_timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_negative_version_is_invalid() {
        let row = FilesetRow { id: 7, timestamp: 0, version: -1 };
        let err = Fileset::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("fileset version"));
    }

    #[test]
    fn test_serializes_timestamp_as_rfc3339() {
        let model = Fileset {
            id: FilesetId(1),
            timestamp: UtcDateTime::from_unix_timestamp(0).unwrap(),
            version: 0,
        };
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#"{"id":1,"timestamp":"1970-01-01T00:00:00Z","version":0}"#);
    }
}
