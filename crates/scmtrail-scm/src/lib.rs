//! Per-line SCM information resolution.
//!
//! Reconciles changesets from the current scan report, SCM data persisted by
//! a previous analysis, and changesets generated for new or changed lines.
//! The [`resolver::ScmInfoResolver`] applies the decision policy once per
//! file and caches the outcome for the rest of the analysis run.

pub mod generator;
pub mod resolver;
pub mod scm_info;
pub mod source;

pub use generator::GeneratedScmInfo;
pub use resolver::ScmInfoResolver;
pub use scm_info::{PersistedScmInfo, ReportScmInfo, ScmInfo, ScmSource};
pub use source::{
    AnalysisClock, DiffProvider, FixedClock, PersistedSource, ReportChangesets, ReportSource,
    SystemClock,
};
