//! JSON scan report reader.
//!
//! The report lists the analyzed component tree and, per file, the
//! changesets emitted by the scanner. Changesets are stored once in a table
//! and referenced from each line by index, the way scanners emit them.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use scmtrail_core::{Changeset, Component, ReportRef, ScmTrailError};
use scmtrail_scm::{ReportChangesets, ReportSource};
use serde::{Deserialize, Serialize};

/// A scanner changeset as written in the report.
///
/// # Examples
///
/// ```
/// use scmtrail_sources::report::RawChangeset;
///
/// let raw: RawChangeset =
///     serde_json::from_str(r#"{"revision":"abc","author":"alice","date":1700000000000}"#).unwrap();
/// assert_eq!(raw.author.as_deref(), Some("alice"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChangeset {
    /// Revision identifier.
    pub revision: Option<String>,
    /// Author login or name.
    pub author: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub date: i64,
}

/// The SCM section of one file in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangesets {
    /// Report reference of the file.
    pub component_ref: ReportRef,
    /// Set when the file is unchanged and its changesets were left out.
    #[serde(default)]
    pub copy_from_previous: bool,
    /// Distinct changesets of the file.
    #[serde(default)]
    pub changesets: Vec<RawChangeset>,
    /// Element `i` is the index into `changesets` for line `i + 1`.
    #[serde(default)]
    pub changeset_index_by_line: Vec<usize>,
}

/// On-disk layout of a scan report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportFile {
    #[serde(default)]
    components: Vec<Component>,
    #[serde(default)]
    changesets: Vec<FileChangesets>,
}

/// A scan report loaded in memory.
///
/// # Examples
///
/// ```
/// use scmtrail_core::ReportRef;
/// use scmtrail_scm::{ReportChangesets, ReportSource};
/// use scmtrail_sources::report::ScanReport;
///
/// let report = ScanReport::from_json(r#"{
///     "components": [
///         {"key": "p:a.rs", "type": "file", "status": "same", "reportRef": 2, "path": "a.rs"}
///     ],
///     "changesets": [
///         {"componentRef": 2, "copyFromPrevious": true}
///     ]
/// }"#).unwrap();
///
/// assert_eq!(report.components().len(), 1);
/// assert_eq!(
///     report.read_changesets(ReportRef(2)).unwrap(),
///     Some(ReportChangesets::CopyFromPrevious)
/// );
/// assert_eq!(report.read_changesets(ReportRef(9)).unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct ScanReport {
    components: Vec<Component>,
    changesets: HashMap<ReportRef, FileChangesets>,
}

impl ScanReport {
    /// Load a report from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::FileNotFound`] if `path` does not exist,
    /// otherwise the errors of [`ScanReport::from_json`].
    pub fn from_file(path: &Path) -> Result<Self, ScmTrailError> {
        if !path.exists() {
            return Err(ScmTrailError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a report from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Serialization`] on malformed JSON and
    /// [`ScmTrailError::Report`] when two entries share a component reference.
    pub fn from_json(content: &str) -> Result<Self, ScmTrailError> {
        let file: ReportFile = serde_json::from_str(content)?;

        let mut changesets = HashMap::with_capacity(file.changesets.len());
        for entry in file.changesets {
            let component_ref = entry.component_ref;
            if changesets.insert(component_ref, entry).is_some() {
                return Err(ScmTrailError::Report(format!(
                    "duplicate changesets for component {component_ref}"
                )));
            }
        }

        Ok(Self {
            components: file.components,
            changesets,
        })
    }

    /// Components of the analyzed project, in report order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }
}

impl ReportSource for ScanReport {
    fn read_changesets(
        &self,
        report_ref: ReportRef,
    ) -> scmtrail_core::Result<Option<ReportChangesets>> {
        let Some(entry) = self.changesets.get(&report_ref) else {
            return Ok(None);
        };
        if entry.copy_from_previous {
            return Ok(Some(ReportChangesets::CopyFromPrevious));
        }
        if entry.changeset_index_by_line.is_empty() {
            return Err(ScmTrailError::Report(format!(
                "component {report_ref} has changesets but no lines"
            )));
        }

        let mut lines = BTreeMap::new();
        for (offset, &index) in entry.changeset_index_by_line.iter().enumerate() {
            let raw = entry.changesets.get(index).ok_or_else(|| {
                ScmTrailError::Report(format!(
                    "component {report_ref}: changeset index {index} out of range ({} changesets)",
                    entry.changesets.len()
                ))
            })?;
            lines.insert(offset as u32 + 1, to_changeset(raw, report_ref)?);
        }
        Ok(Some(ReportChangesets::Fresh(lines)))
    }
}

fn to_changeset(raw: &RawChangeset, report_ref: ReportRef) -> Result<Changeset, ScmTrailError> {
    let date = DateTime::<Utc>::from_timestamp_millis(raw.date).ok_or_else(|| {
        ScmTrailError::Report(format!(
            "component {report_ref}: invalid changeset date {}",
            raw.date
        ))
    })?;
    Ok(Changeset {
        author: raw.author.clone(),
        revision: raw.revision.clone(),
        date,
    })
}
