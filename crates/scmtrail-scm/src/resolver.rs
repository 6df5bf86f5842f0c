//! Per-file SCM information resolution with a run-scoped cache.

use std::collections::HashMap;
use std::sync::Arc;

use scmtrail_core::{Component, ComponentKey, ComponentStatus, Result};
use tracing::{debug, trace};

use crate::generator::GeneratedScmInfo;
use crate::scm_info::{ReportScmInfo, ScmInfo};
use crate::source::{AnalysisClock, DiffProvider, PersistedSource, ReportChangesets, ReportSource};

/// Outcome of resolving one file, as held in the cache.
#[derive(Debug)]
enum Resolution {
    Found(Arc<ScmInfo>),
    Absent,
}

impl Resolution {
    fn from_option(info: Option<ScmInfo>) -> Self {
        match info {
            Some(info) => Resolution::Found(Arc::new(info)),
            None => Resolution::Absent,
        }
    }

    fn to_option(&self) -> Option<Arc<ScmInfo>> {
        match self {
            Resolution::Found(info) => Some(Arc::clone(info)),
            Resolution::Absent => None,
        }
    }
}

/// Resolves the SCM information of files for one analysis run.
///
/// Each file is resolved at most once: the outcome, including "no
/// information", is cached by component key until the resolver is dropped.
/// Failed lookups are not cached. The resolver is meant to be driven by a
/// single worker; it takes `&mut self` and does no locking.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use chrono::{DateTime, Utc};
/// use scmtrail_core::{Component, ComponentStatus, ReportRef, Result};
/// use scmtrail_scm::{
///     DiffProvider, FixedClock, PersistedSource, ReportChangesets, ReportSource, ScmInfo,
///     ScmInfoResolver, ScmSource,
/// };
///
/// struct NoReport;
/// impl ReportSource for NoReport {
///     fn read_changesets(&self, _: ReportRef) -> Result<Option<ReportChangesets>> {
///         Ok(None)
///     }
/// }
///
/// struct NothingStored;
/// impl PersistedSource for NothingStored {
///     fn load(&self, _: &Component) -> Result<Option<ScmInfo>> {
///         Ok(None)
///     }
/// }
///
/// struct FirstTwoLines;
/// impl DiffProvider for FirstTwoLines {
///     fn new_or_changed_lines(&self, _: &Component) -> Result<BTreeSet<u32>> {
///         Ok([1, 2].into_iter().collect())
///     }
/// }
///
/// let clock = FixedClock(DateTime::<Utc>::from_timestamp_millis(0).unwrap());
/// let mut resolver = ScmInfoResolver::new(NoReport, NothingStored, FirstTwoLines, clock);
///
/// let file = Component::file("p:new.rs", ReportRef(1), ComponentStatus::Added, "new.rs");
/// let info = resolver.scm_info(&file).unwrap().unwrap();
/// assert_eq!(info.source(), ScmSource::Generated);
/// assert!(info.has_changeset_for_line(2));
/// ```
pub struct ScmInfoResolver<R, P, D, C> {
    report: R,
    persisted: P,
    diff: D,
    clock: C,
    cache: HashMap<ComponentKey, Resolution>,
}

impl<R, P, D, C> ScmInfoResolver<R, P, D, C>
where
    R: ReportSource,
    P: PersistedSource,
    D: DiffProvider,
    C: AnalysisClock,
{
    /// Create a resolver with an empty cache.
    pub fn new(report: R, persisted: P, diff: D, clock: C) -> Self {
        Self {
            report,
            persisted,
            diff,
            clock,
            cache: HashMap::new(),
        }
    }

    /// SCM information of `component`, or `None` if there is none.
    ///
    /// Non-file components always yield `None` without touching the cache
    /// or any collaborator.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures. Nothing is cached in that case, so
    /// a later call retries.
    pub fn scm_info(&mut self, component: &Component) -> Result<Option<Arc<ScmInfo>>> {
        if !component.is_file() {
            return Ok(None);
        }
        if let Some(cached) = self.cache.get(&component.key) {
            return Ok(cached.to_option());
        }

        let resolution = Resolution::from_option(self.resolve(component)?);
        let info = resolution.to_option();
        self.cache.insert(component.key.clone(), resolution);
        Ok(info)
    }

    /// Number of files resolved so far, including those without information.
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }

    /// The store consulted for persisted information.
    pub fn persisted_source(&self) -> &P {
        &self.persisted
    }

    fn resolve(&self, component: &Component) -> Result<Option<ScmInfo>> {
        match self.report.read_changesets(component.report_ref)? {
            None => {
                trace!("No SCM info in report for file '{}'", component.key);
                if component.status == ComponentStatus::Same {
                    self.persisted.load(component)
                } else {
                    self.generate(component)
                }
            }
            Some(ReportChangesets::CopyFromPrevious) => {
                trace!("File '{}' unchanged, reusing persisted SCM info", component.key);
                self.persisted.load(component)
            }
            Some(ReportChangesets::Fresh(changesets)) => {
                trace!("Reading SCM info from report for file '{}'", component.key);
                Ok(Some(ScmInfo::Report(ReportScmInfo::new(changesets))))
            }
        }
    }

    // TODO: merge generated lines into persisted info instead of discarding it
    fn generate(&self, component: &Component) -> Result<Option<ScmInfo>> {
        let persisted = self.persisted.load(component)?;
        let lines = self.diff.new_or_changed_lines(component)?;
        if lines.is_empty() {
            debug!("No new or changed lines in file '{}'", component.key);
            return Ok(None);
        }
        debug!(
            "Generating SCM info for {} lines of file '{}' (persisted info {})",
            lines.len(),
            component.key,
            if persisted.is_some() { "discarded" } else { "absent" }
        );
        let info = GeneratedScmInfo::build(self.clock.now(), &lines);
        Ok(Some(ScmInfo::Generated(info)))
    }
}
