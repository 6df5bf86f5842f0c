use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::ScmTrailError;

/// Top-level configuration loaded from `.scmtrail.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use scmtrail_core::ScmTrailConfig;
///
/// let config = ScmTrailConfig::default();
/// assert_eq!(config.analysis.baseline, "HEAD");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScmTrailConfig {
    /// Analysis run settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Persisted SCM store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Scan report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl ScmTrailConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Io`] if the file cannot be read, or
    /// [`ScmTrailError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use scmtrail_core::ScmTrailConfig;
    /// use std::path::Path;
    ///
    /// let config = ScmTrailConfig::from_file(Path::new(".scmtrail.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ScmTrailError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use scmtrail_core::ScmTrailConfig;
    ///
    /// let toml = r#"
    /// [analysis]
    /// baseline = "origin/main"
    /// "#;
    /// let config = ScmTrailConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.analysis.baseline, "origin/main");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ScmTrailError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Analysis run configuration.
///
/// # Examples
///
/// ```
/// use scmtrail_core::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.baseline, "HEAD");
/// assert!(config.date.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Git revision the working tree is diffed against (default: `"HEAD"`).
    #[serde(default = "default_baseline")]
    pub baseline: String,
    /// Fixed analysis timestamp; the current time when unset. Accepts a
    /// TOML offset datetime or an RFC 3339 string.
    #[serde(default, deserialize_with = "deserialize_date")]
    pub date: Option<DateTime<Utc>>,
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = match Option::<toml::Value>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(toml::Value::String(text)) => text,
        Some(toml::Value::Datetime(datetime)) => datetime.to_string(),
        Some(other) => {
            return Err(de::Error::custom(format!(
                "expected a date and time, found {}",
                other.type_str()
            )))
        }
    };
    DateTime::parse_from_rfc3339(&text)
        .map(|date| Some(date.with_timezone(&Utc)))
        .map_err(|e| de::Error::custom(format!("invalid date '{text}': {e}")))
}

fn default_baseline() -> String {
    "HEAD".into()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            date: None,
        }
    }
}

/// Persisted SCM store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path (default: `.scmtrail/scm.db`).
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".scmtrail/scm.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Scan report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// JSON scan report path (default: `.scmtrail/report.json`).
    #[serde(default = "default_report_path")]
    pub path: PathBuf,
}

fn default_report_path() -> PathBuf {
    PathBuf::from(".scmtrail/report.json")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}
