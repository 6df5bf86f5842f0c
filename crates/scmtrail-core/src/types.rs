use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity of a component within one analysis run.
///
/// Used as the resolver's cache key and as the persisted store's row key.
///
/// # Examples
///
/// ```
/// use scmtrail_core::ComponentKey;
///
/// let key = ComponentKey::from("my-project:src/lib.rs");
/// assert_eq!(key.as_str(), "my-project:src/lib.rs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentKey(String);

impl ComponentKey {
    /// Borrow the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ComponentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference of a component inside the current scan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRef(pub u32);

impl fmt::Display for ReportRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of node in the analyzed project's tree.
///
/// Only [`ComponentType::File`] components carry SCM information.
///
/// # Examples
///
/// ```
/// use scmtrail_core::ComponentType;
///
/// let t: ComponentType = serde_json::from_str("\"file\"").unwrap();
/// assert_eq!(t, ComponentType::File);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    /// Root of the analyzed project.
    Project,
    /// A directory grouping files.
    Directory,
    /// A source file.
    File,
}

/// Status of a component relative to the baseline analysis.
///
/// # Examples
///
/// ```
/// use scmtrail_core::ComponentStatus;
///
/// let status = ComponentStatus::Changed;
/// assert_eq!(format!("{status}"), "changed");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Unchanged since the baseline.
    Same,
    /// Not present in the baseline.
    Added,
    /// Present in the baseline but modified.
    Changed,
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Same => write!(f, "same"),
            ComponentStatus::Added => write!(f, "added"),
            ComponentStatus::Changed => write!(f, "changed"),
        }
    }
}

/// A node of the analyzed project's tree, as seen by one analysis run.
///
/// # Examples
///
/// ```
/// use scmtrail_core::{Component, ComponentStatus, ComponentType, ReportRef};
///
/// let file = Component::file("proj:src/main.rs", ReportRef(3), ComponentStatus::Added, "src/main.rs");
/// assert_eq!(file.component_type, ComponentType::File);
/// assert_eq!(file.key.as_str(), "proj:src/main.rs");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Stable identity of the component.
    pub key: ComponentKey,
    /// Node kind.
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Status relative to the baseline.
    pub status: ComponentStatus,
    /// Reference into the current scan report.
    pub report_ref: ReportRef,
    /// Path relative to the project root.
    #[serde(default)]
    pub path: PathBuf,
}

impl Component {
    /// Create a file component.
    pub fn file(
        key: impl Into<ComponentKey>,
        report_ref: ReportRef,
        status: ComponentStatus,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            key: key.into(),
            component_type: ComponentType::File,
            status,
            report_ref,
            path: path.into(),
        }
    }

    /// Whether this component is a file.
    pub fn is_file(&self) -> bool {
        self.component_type == ComponentType::File
    }
}

/// Authorship of a single source line.
///
/// Author and revision are unknown for generated changesets.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use scmtrail_core::Changeset;
///
/// let date = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
/// let cs = Changeset::new(date).with_author("alice").with_revision("abc123");
/// assert_eq!(cs.author.as_deref(), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    /// Author login or name, if known.
    pub author: Option<String>,
    /// Revision identifier, if known.
    pub revision: Option<String>,
    /// When the line was last changed.
    pub date: DateTime<Utc>,
}

impl Changeset {
    /// A changeset with only a date.
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            author: None,
            revision: None,
            date,
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the revision.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// Output format for CLI results.
///
/// # Examples
///
/// ```
/// use scmtrail_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "markdown".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn component_deserializes_from_report_json() {
        let json = r#"{"key":"p:a.rs","type":"file","status":"changed","reportRef":7,"path":"a.rs"}"#;
        let component: Component = serde_json::from_str(json).unwrap();
        assert!(component.is_file());
        assert_eq!(component.status, ComponentStatus::Changed);
        assert_eq!(component.report_ref, ReportRef(7));
        assert_eq!(component.path, PathBuf::from("a.rs"));
    }

    #[test]
    fn directory_path_defaults_to_empty() {
        let json = r#"{"key":"p:src","type":"directory","status":"same","reportRef":2}"#;
        let component: Component = serde_json::from_str(json).unwrap();
        assert!(!component.is_file());
        assert_eq!(component.path, PathBuf::new());
    }

    #[test]
    fn changeset_builder_sets_optional_fields() {
        let date = DateTime::<Utc>::from_timestamp_millis(1_000).unwrap();
        let bare = Changeset::new(date);
        assert!(bare.author.is_none());
        assert!(bare.revision.is_none());

        let full = bare.clone().with_author("bob").with_revision("r1");
        assert_eq!(full.author.as_deref(), Some("bob"));
        assert_eq!(full.revision.as_deref(), Some("r1"));
        assert_eq!(full.date, bare.date);
    }
}
