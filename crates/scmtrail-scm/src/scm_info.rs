//! The resolved SCM information of a file.

use std::collections::BTreeMap;
use std::fmt;

use scmtrail_core::Changeset;
use serde::Serialize;

use crate::generator::GeneratedScmInfo;

/// Line number → changeset mapping shared by every [`ScmInfo`] variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineChangesets(BTreeMap<u32, Changeset>);

impl LineChangesets {
    pub(crate) fn new(changesets: BTreeMap<u32, Changeset>) -> Self {
        Self(changesets)
    }

    /// Most recent changeset; on equal dates the highest line number wins.
    pub(crate) fn latest(&self) -> Option<&Changeset> {
        // max_by_key keeps the last maximum, and BTreeMap iterates lines ascending
        self.0.values().max_by_key(|changeset| changeset.date)
    }

    pub(crate) fn for_line(&self, line: u32) -> Option<&Changeset> {
        self.0.get(&line)
    }

    pub(crate) fn contains(&self, line: u32) -> bool {
        self.0.contains_key(&line)
    }

    pub(crate) fn all(&self) -> &BTreeMap<u32, Changeset> {
        &self.0
    }
}

/// Changesets taken verbatim from the current scan report.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use chrono::{DateTime, Utc};
/// use scmtrail_core::Changeset;
/// use scmtrail_scm::{ReportScmInfo, ScmInfo};
///
/// let date = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
/// let mut lines = BTreeMap::new();
/// lines.insert(1, Changeset::new(date).with_author("alice"));
///
/// let info = ScmInfo::Report(ReportScmInfo::new(lines));
/// assert!(info.has_changeset_for_line(1));
/// assert!(!info.has_changeset_for_line(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportScmInfo {
    changesets: LineChangesets,
}

impl ReportScmInfo {
    /// Wrap the report's per-line changesets without transformation.
    pub fn new(changesets: BTreeMap<u32, Changeset>) -> Self {
        Self {
            changesets: LineChangesets::new(changesets),
        }
    }
}

/// Changesets loaded from a previous analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedScmInfo {
    changesets: LineChangesets,
}

impl PersistedScmInfo {
    pub fn new(changesets: BTreeMap<u32, Changeset>) -> Self {
        Self {
            changesets: LineChangesets::new(changesets),
        }
    }
}

/// Where a file's SCM information came from.
///
/// # Examples
///
/// ```
/// use scmtrail_scm::ScmSource;
///
/// assert_eq!(ScmSource::Generated.to_string(), "generated");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmSource {
    /// Fresh data from the current scan report.
    Report,
    /// Data stored by a previous analysis.
    Persisted,
    /// Synthesized for new or changed lines.
    Generated,
}

impl fmt::Display for ScmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmSource::Report => write!(f, "report"),
            ScmSource::Persisted => write!(f, "persisted"),
            ScmSource::Generated => write!(f, "generated"),
        }
    }
}

/// Per-line SCM information of one file.
///
/// "No information" is not a variant: the resolver reports it as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScmInfo {
    /// Fresh changesets from the scan report.
    Report(ReportScmInfo),
    /// Changesets persisted by a previous analysis.
    Persisted(PersistedScmInfo),
    /// Changesets generated for new or changed lines.
    Generated(GeneratedScmInfo),
}

impl ScmInfo {
    fn changesets(&self) -> &LineChangesets {
        match self {
            ScmInfo::Report(info) => &info.changesets,
            ScmInfo::Persisted(info) => &info.changesets,
            ScmInfo::Generated(info) => info.changesets(),
        }
    }

    /// Which source produced this information.
    pub fn source(&self) -> ScmSource {
        match self {
            ScmInfo::Report(_) => ScmSource::Report,
            ScmInfo::Persisted(_) => ScmSource::Persisted,
            ScmInfo::Generated(_) => ScmSource::Generated,
        }
    }

    /// The changeset with the most recent date across all lines.
    ///
    /// When several lines share the most recent date, the one with the
    /// highest line number is returned. `None` only for an empty mapping.
    pub fn latest_changeset(&self) -> Option<&Changeset> {
        self.changesets().latest()
    }

    /// The changeset attributed to `line`, if any.
    pub fn changeset_for_line(&self, line: u32) -> Option<&Changeset> {
        self.changesets().for_line(line)
    }

    pub fn has_changeset_for_line(&self, line: u32) -> bool {
        self.changesets().contains(line)
    }

    /// The full line → changeset mapping, ordered by line number.
    pub fn all_changesets(&self) -> &BTreeMap<u32, Changeset> {
        self.changesets().all()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap()
    }

    fn report(entries: &[(u32, &str, i64)]) -> ScmInfo {
        let lines = entries
            .iter()
            .map(|(line, author, millis)| (*line, Changeset::new(at(*millis)).with_author(*author)))
            .collect();
        ScmInfo::Report(ReportScmInfo::new(lines))
    }

    #[test]
    fn latest_changeset_picks_most_recent_date() {
        let info = report(&[(1, "alice", 1_000), (2, "bob", 3_000), (3, "carol", 2_000)]);
        assert_eq!(
            info.latest_changeset().unwrap().author.as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn latest_changeset_tie_goes_to_highest_line() {
        let info = report(&[(4, "dave", 5_000), (9, "erin", 5_000), (2, "frank", 5_000)]);
        assert_eq!(
            info.latest_changeset().unwrap().author.as_deref(),
            Some("erin")
        );
    }

    #[test]
    fn latest_changeset_of_empty_mapping_is_none() {
        let info = ScmInfo::Persisted(PersistedScmInfo::new(BTreeMap::new()));
        assert!(info.latest_changeset().is_none());
    }

    #[test]
    fn line_lookups() {
        let info = report(&[(1, "alice", 1_000), (3, "bob", 2_000)]);
        assert!(info.has_changeset_for_line(3));
        assert!(!info.has_changeset_for_line(2));
        assert_eq!(
            info.changeset_for_line(1).unwrap().author.as_deref(),
            Some("alice")
        );
        assert!(info.changeset_for_line(2).is_none());
        assert_eq!(info.all_changesets().keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn source_matches_variant() {
        assert_eq!(report(&[]).source(), ScmSource::Report);
        assert_eq!(
            ScmInfo::Persisted(PersistedScmInfo::new(BTreeMap::new())).source(),
            ScmSource::Persisted
        );
    }
}
