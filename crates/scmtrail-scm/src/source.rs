//! Collaborators queried by the resolver.
//!
//! Each trait is a synchronous call that either completes or fails before
//! the decision policy proceeds. Absence of data is `Ok(None)` (or an empty
//! line set), never an error.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use scmtrail_core::{Changeset, Component, ReportRef, Result};

use crate::scm_info::ScmInfo;

/// Changeset data found in the scan report for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportChangesets {
    /// The file is identical to the baseline; the scanner left the
    /// changesets out on purpose and the persisted ones still apply.
    CopyFromPrevious,
    /// Fresh per-line changesets.
    Fresh(BTreeMap<u32, Changeset>),
}

/// Reads changesets from the current scan report.
pub trait ReportSource {
    /// Changesets for the component at `report_ref`, or `None` when the
    /// report has no SCM data for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be read or decoded.
    fn read_changesets(&self, report_ref: ReportRef) -> Result<Option<ReportChangesets>>;
}

/// Loads SCM information stored by a previous analysis.
pub trait PersistedSource {
    /// Stored SCM information for `component`, or `None` if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn load(&self, component: &Component) -> Result<Option<ScmInfo>>;
}

/// Computes which lines of a file are new or changed against the baseline.
pub trait DiffProvider {
    /// # Errors
    ///
    /// Returns an error if either side of the comparison cannot be read.
    fn new_or_changed_lines(&self, component: &Component) -> Result<BTreeSet<u32>>;
}

/// Supplies the timestamp of the current analysis run.
pub trait AnalysisClock {
    fn now(&self) -> DateTime<Utc>;
}

/// A clock frozen at a given instant.
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, Utc};
/// use scmtrail_scm::{AnalysisClock, FixedClock};
///
/// let date = DateTime::<Utc>::from_timestamp_millis(42).unwrap();
/// assert_eq!(FixedClock(date).now(), date);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl AnalysisClock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Wall-clock time, sampled once when the clock is created so that every
/// file of an analysis run gets the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    started_at: DateTime<Utc>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_stable_within_a_run() {
        let clock = SystemClock::new();
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.now(), first);
    }
}
