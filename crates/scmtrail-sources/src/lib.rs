//! Concrete collaborators for the SCM resolver.
//!
//! - [`report::ScanReport`]: JSON scan report, the [`ReportSource`](scmtrail_scm::ReportSource)
//! - [`store::ScmStore`]: SQLite store of previously resolved changesets
//! - [`diff::GitLineDiff`]: new/changed lines against a git baseline

pub mod diff;
pub mod report;
pub mod store;
