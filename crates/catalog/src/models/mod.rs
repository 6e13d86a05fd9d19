mod entry;
mod fileset;

pub use self::entry::{Entry, EntryKind};
pub(crate) use self::entry::EntryRow;
pub use self::fileset::{Fileset, FilesetFilter, FilesetId, PrefixId};
pub(crate) use self::fileset::FilesetRow;
use serde::Serializer;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcDateTime};

/// Serialize a UTC timestamp as an RFC 3339 string.
pub(crate) fn serialize_rfc3339<S: Serializer>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = OffsetDateTime::from_unix_timestamp(value.unix_timestamp())
        .map_err(serde::ser::Error::custom)?
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}
