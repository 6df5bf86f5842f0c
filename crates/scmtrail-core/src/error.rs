use std::path::PathBuf;

/// Errors that can occur while resolving SCM information.
///
/// Missing SCM data is never an error: providers report it as `None`.
/// These variants cover I/O and decoding failures in the collaborators that
/// feed the resolver. Library crates return this type directly; the binary
/// renders it through `miette` at the boundary.
///
/// # Examples
///
/// ```
/// use scmtrail_core::ScmTrailError;
///
/// let err = ScmTrailError::Report("changeset index 4 out of range".into());
/// assert!(err.to_string().contains("out of range"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ScmTrailError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(scmtrail::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(scmtrail::config), help("check .scmtrail.toml"))]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(code(scmtrail::git))]
    Git(String),

    /// Persisted SCM store failure.
    #[error("database error: {0}")]
    #[diagnostic(code(scmtrail::database))]
    Database(String),

    /// Malformed scan report content.
    #[error("report error: {0}")]
    #[diagnostic(code(scmtrail::report))]
    Report(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(scmtrail::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(scmtrail::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(scmtrail::file_not_found))]
    FileNotFound(PathBuf),
}
