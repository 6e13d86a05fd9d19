//! Listing requests and their validation.
//!
//! Everything here runs before the catalog is touched, so a malformed
//! request never costs a connection.

use crate::error::{ErrorKind, Result};
use snapshelf_catalog::FilesetFilter;
use snapshelf_config::TimeGranularity;
use time::UtcDateTime;

/// Time part of a [`Selector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSelector {
    /// Filesets whose timestamp falls in the granularity window around this
    /// instant.
    At(UtcDateTime),
    /// Filesets whose timestamp falls in this inclusive range.
    Between(UtcDateTime, UtcDateTime),
}

/// Identifies which fileset a request refers to.
///
/// An empty selector means the most recent fileset (version `0`). When both
/// parts are given, a fileset has to satisfy both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selector {
    pub time: Option<TimeSelector>,
    pub version: Option<u32>,
}
impl Selector {
    pub fn latest() -> Self {
        Self::default()
    }

    pub fn at(time: UtcDateTime) -> Self {
        Self { time: Some(TimeSelector::At(time)), version: None }
    }

    pub fn version(version: u32) -> Self {
        Self { time: None, version: Some(version) }
    }

    /// Translate the selector into a catalog filter.
    pub fn filter(&self, granularity: TimeGranularity) -> Result<FilesetFilter> {
        let (from, until) = match self.time {
            None => (None, None),
            Some(TimeSelector::At(time)) => {
                let unit = granularity.seconds();
                let start = time.unix_timestamp().div_euclid(unit) * unit;
                (Some(start), Some(start + unit - 1))
            },
            Some(TimeSelector::Between(from, until)) => {
                if from > until {
                    exn::bail!(ErrorKind::shape("time range ends before it starts"));
                }
                (Some(from.unix_timestamp()), Some(until.unix_timestamp()))
            },
        };
        let version = match (self.time, self.version) {
            (None, None) => Some(0),
            (_, version) => version,
        };
        Ok(FilesetFilter { version, from, until })
    }
}

/// Offset and page size of a folder listing, both already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    offset: u64,
    limit: u64,
}
impl Window {
    pub fn new(offset: i64, limit: i64) -> Result<Self> {
        let offset = u64::try_from(offset).map_err(|_| ErrorKind::shape("offset must not be negative"))?;
        let limit = u64::try_from(limit)
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| ErrorKind::shape("limit must be positive"))?;
        Ok(Self { offset, limit })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A request to list one or more folders of one fileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFolderRequest {
    pub selector: Selector,
    /// Folders to list. Empty, or a single empty string, asks for the root
    /// view.
    pub folders: Vec<String>,
    pub offset: i64,
    pub limit: i64,
}
impl ListFolderRequest {
    /// A root view of the most recent fileset.
    pub fn root(selector: Selector) -> Self {
        Self { selector, folders: Vec::new(), offset: 0, limit: 1 }
    }

    pub fn folders<I, S>(selector: Selector, folders: I, offset: i64, limit: i64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { selector, folders: folders.into_iter().map(Into::into).collect(), offset, limit }
    }

    /// Validate the request and decide which kind of listing it asks for.
    pub fn shape(&self) -> Result<Shape<'_>> {
        let window = Window::new(self.offset, self.limit)?;
        match self.folders.first() {
            None => Ok(Shape::Root),
            Some(first) if first.is_empty() => {
                if self.folders.len() > 1 {
                    exn::bail!(ErrorKind::shape("the root view cannot be combined with other folders"));
                }
                Ok(Shape::Root)
            },
            Some(_) => Ok(Shape::Folders(&self.folders, window)),
        }
    }
}

/// What a validated [`ListFolderRequest`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
    /// The compressed top-level view of the whole fileset.
    Root,
    /// The merged contents of the given folders, one page of it.
    Folders(&'a [String], Window),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(ts: i64) -> UtcDateTime {
        UtcDateTime::from_unix_timestamp(ts).unwrap()
    }

    #[test]
    fn test_empty_selector_means_latest() {
        let filter = Selector::latest().filter(TimeGranularity::Second).unwrap();
        assert_eq!(filter, FilesetFilter { version: Some(0), from: None, until: None });
    }

    #[rstest]
    #[case(TimeGranularity::Second, 1_000_123, 1_000_123, 1_000_123)]
    #[case(TimeGranularity::Minute, 1_000_123, 1_000_080, 1_000_139)]
    #[case(TimeGranularity::Hour, 1_000_123, 997_200, 1_000_799)]
    #[case(TimeGranularity::Day, 1_000_123, 950_400, 1_036_799)]
    #[case(TimeGranularity::Minute, -30, -60, -1)]
    fn test_time_window(
        #[case] granularity: TimeGranularity,
        #[case] ts: i64,
        #[case] from: i64,
        #[case] until: i64,
    ) {
        let filter = Selector::at(at(ts)).filter(granularity).unwrap();
        assert_eq!(filter, FilesetFilter { version: None, from: Some(from), until: Some(until) });
    }

    #[test]
    fn test_time_and_version_combine() {
        let selector = Selector { time: Some(TimeSelector::Between(at(10), at(20))), version: Some(3) };
        let filter = selector.filter(TimeGranularity::Day).unwrap();
        assert_eq!(filter, FilesetFilter { version: Some(3), from: Some(10), until: Some(20) });
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let selector = Selector { time: Some(TimeSelector::Between(at(20), at(10))), version: None };
        let err = selector.filter(TimeGranularity::Second).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRequestShape(_)));
    }

    #[rstest]
    #[case(-1, 10)]
    #[case(0, 0)]
    #[case(0, -5)]
    fn test_window_rejects(#[case] offset: i64, #[case] limit: i64) {
        let err = Window::new(offset, limit).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRequestShape(_)));
    }

    #[test]
    fn test_window_accepts() {
        let window = Window::new(20, 10).unwrap();
        assert_eq!((window.offset(), window.limit()), (20, 10));
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![""])]
    fn test_root_shapes(#[case] folders: Vec<&str>) {
        let request = ListFolderRequest::folders(Selector::latest(), folders, 0, 10);
        assert_eq!(request.shape().unwrap(), Shape::Root);
    }

    #[test]
    fn test_root_cannot_be_combined() {
        let request = ListFolderRequest::folders(Selector::latest(), ["", "docs"], 0, 10);
        let err = request.shape().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRequestShape(_)));
    }

    #[test]
    fn test_root_still_validates_window() {
        let request = ListFolderRequest::folders(Selector::latest(), Vec::<String>::new(), 0, 0);
        assert!(request.shape().is_err());
    }

    #[test]
    fn test_folder_shape() {
        let request = ListFolderRequest::folders(Selector::latest(), ["docs", "Photos"], 5, 10);
        let Shape::Folders(folders, window) = request.shape().unwrap() else {
            panic!("expected a folder listing");
        };
        assert_eq!(folders, ["docs".to_string(), "Photos".to_string()]);
        assert_eq!(window, Window::new(5, 10).unwrap());
    }
}
