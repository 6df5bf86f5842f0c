//! Synthetic changesets for lines without a real SCM record.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use scmtrail_core::Changeset;

use crate::scm_info::LineChangesets;

/// SCM information synthesized for new or changed lines.
///
/// Every line carries a changeset dated at the analysis timestamp, with
/// author and revision unknown.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use chrono::{DateTime, Utc};
/// use scmtrail_scm::GeneratedScmInfo;
///
/// let analysis_date = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap();
/// let lines: BTreeSet<u32> = [3, 7, 9].into_iter().collect();
///
/// let info = GeneratedScmInfo::build(analysis_date, &lines);
/// assert_eq!(info.lines().collect::<Vec<_>>(), vec![3, 7, 9]);
/// assert_eq!(info.analysis_date(), analysis_date);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScmInfo {
    analysis_date: DateTime<Utc>,
    changesets: LineChangesets,
}

impl GeneratedScmInfo {
    /// Associate a changeset dated `analysis_date` with each of `lines`.
    pub fn build(analysis_date: DateTime<Utc>, lines: &BTreeSet<u32>) -> Self {
        let changesets = lines
            .iter()
            .map(|&line| (line, Changeset::new(analysis_date)))
            .collect();
        Self {
            analysis_date,
            changesets: LineChangesets::new(changesets),
        }
    }

    pub fn analysis_date(&self) -> DateTime<Utc> {
        self.analysis_date
    }

    /// Line numbers carrying a generated changeset, ascending.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.changesets.all().keys().copied()
    }

    pub(crate) fn changesets(&self) -> &LineChangesets {
        &self.changesets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scm_info::ScmInfo;

    fn analysis_date() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(1_710_000_000_000).unwrap()
    }

    #[test]
    fn every_line_is_dated_at_analysis_time() {
        let lines: BTreeSet<u32> = [1, 2, 10].into_iter().collect();
        let info = ScmInfo::Generated(GeneratedScmInfo::build(analysis_date(), &lines));

        for line in [1, 2, 10] {
            let changeset = info.changeset_for_line(line).unwrap();
            assert_eq!(changeset.date, analysis_date());
            assert!(changeset.author.is_none());
            assert!(changeset.revision.is_none());
        }
    }

    #[test]
    fn only_input_lines_have_changesets() {
        let lines: BTreeSet<u32> = [3, 7, 9].into_iter().collect();
        let info = ScmInfo::Generated(GeneratedScmInfo::build(analysis_date(), &lines));

        assert!(info.has_changeset_for_line(7));
        assert!(!info.has_changeset_for_line(5));
        assert!(info.changeset_for_line(5).is_none());
        assert_eq!(info.all_changesets().len(), 3);
    }

    #[test]
    fn latest_changeset_is_highest_line() {
        let lines: BTreeSet<u32> = [4, 12, 8].into_iter().collect();
        let info = GeneratedScmInfo::build(analysis_date(), &lines);
        let latest = info.changesets().latest().unwrap();
        assert_eq!(latest.date, analysis_date());
        assert!(std::ptr::eq(latest, info.changesets().for_line(12).unwrap()));
    }

    #[test]
    fn build_is_deterministic() {
        let lines: BTreeSet<u32> = [5, 6].into_iter().collect();
        assert_eq!(
            GeneratedScmInfo::build(analysis_date(), &lines),
            GeneratedScmInfo::build(analysis_date(), &lines)
        );
    }
}
