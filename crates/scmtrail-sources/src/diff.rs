//! New and changed lines of working-tree files against a git baseline.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use git2::{ErrorCode, Oid, Patch, Repository};
use scmtrail_core::{Component, ScmTrailError};
use scmtrail_scm::DiffProvider;
use tracing::trace;

/// Line diff of working-tree files against the tree of a baseline revision.
///
/// Component paths are relative to the project directory, which may be a
/// subdirectory of the repository's working tree.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use scmtrail_core::{Component, ComponentStatus, ReportRef};
/// use scmtrail_scm::DiffProvider;
/// use scmtrail_sources::diff::GitLineDiff;
///
/// let diff = GitLineDiff::open(Path::new("."), "HEAD").unwrap();
/// let file = Component::file("p:src/lib.rs", ReportRef(1), ComponentStatus::Changed, "src/lib.rs");
/// let lines = diff.new_or_changed_lines(&file).unwrap();
/// println!("{} new or changed lines", lines.len());
/// ```
pub struct GitLineDiff {
    repo: Repository,
    project_dir: PathBuf,
    prefix: PathBuf,
    baseline_tree: Oid,
}

impl GitLineDiff {
    /// Open the repository containing the project directory `repo_path` and
    /// resolve `baseline` (any revision git understands, such as `HEAD` or a
    /// tag) to a tree.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Git`] if no repository is found, the
    /// repository is bare, or `baseline` does not name a tree-ish object.
    /// Returns [`ScmTrailError::Io`] if `repo_path` cannot be canonicalized.
    pub fn open(repo_path: &Path, baseline: &str) -> Result<Self, ScmTrailError> {
        let repo = Repository::discover(repo_path)
            .map_err(|e| ScmTrailError::Git(format!("failed to open repository: {e}")))?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| ScmTrailError::Git("repository has no working tree".into()))?
            .canonicalize()?;
        let project_dir = repo_path.canonicalize()?;
        let prefix = project_dir
            .strip_prefix(&workdir)
            .map_err(|_| {
                ScmTrailError::Git(format!(
                    "'{}' is outside the working tree '{}'",
                    project_dir.display(),
                    workdir.display()
                ))
            })?
            .to_path_buf();
        if !prefix.as_os_str().is_empty() {
            trace!("Project is '{}' within the repository", prefix.display());
        }

        let baseline_tree = repo
            .revparse_single(baseline)
            .and_then(|object| object.peel_to_tree())
            .map_err(|e| {
                ScmTrailError::Git(format!("failed to resolve baseline '{baseline}': {e}"))
            })?
            .id();

        Ok(Self {
            repo,
            project_dir,
            prefix,
            baseline_tree,
        })
    }

    fn baseline_content(&self, path: &Path) -> Result<Option<Vec<u8>>, ScmTrailError> {
        let tree = self
            .repo
            .find_tree(self.baseline_tree)
            .map_err(|e| ScmTrailError::Git(format!("failed to load baseline tree: {e}")))?;

        let entry = match tree.get_path(path) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => {
                return Err(ScmTrailError::Git(format!(
                    "failed to look up '{}' in baseline: {e}",
                    path.display()
                )))
            }
        };

        let blob = self.repo.find_blob(entry.id()).map_err(|e| {
            ScmTrailError::Git(format!(
                "'{}' is not a file in baseline: {e}",
                path.display()
            ))
        })?;
        Ok(Some(blob.content().to_vec()))
    }
}

impl DiffProvider for GitLineDiff {
    fn new_or_changed_lines(&self, component: &Component) -> scmtrail_core::Result<BTreeSet<u32>> {
        let path = component.path.as_path();
        let current = match std::fs::read(self.project_dir.join(path)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("File '{}' missing from working tree", path.display());
                return Ok(BTreeSet::new());
            }
            Err(e) => return Err(e.into()),
        };

        let tree_path = self.prefix.join(path);
        let Some(baseline) = self.baseline_content(&tree_path)? else {
            trace!("File '{}' not in baseline, all lines are new", path.display());
            return Ok((1..=line_count(&current)).collect());
        };

        let patch = Patch::from_buffers(
            &baseline,
            Some(&tree_path),
            &current,
            Some(&tree_path),
            None,
        )
        .map_err(|e| ScmTrailError::Git(format!("failed to diff '{}': {e}", path.display())))?;

        let mut lines = BTreeSet::new();
        for hunk in 0..patch.num_hunks() {
            let line_total = patch.num_lines_in_hunk(hunk).map_err(|e| {
                ScmTrailError::Git(format!("failed to read hunk of '{}': {e}", path.display()))
            })?;
            for index in 0..line_total {
                let line = patch.line_in_hunk(hunk, index).map_err(|e| {
                    ScmTrailError::Git(format!("failed to read line of '{}': {e}", path.display()))
                })?;
                if line.origin() == '+' {
                    if let Some(number) = line.new_lineno() {
                        lines.insert(number);
                    }
                }
            }
        }
        Ok(lines)
    }
}

/// Number of lines in `content`; a trailing newline does not start a line.
fn line_count(content: &[u8]) -> u32 {
    if content.is_empty() {
        return 0;
    }
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    let unterminated = usize::from(!content.ends_with(b"\n"));
    (newlines + unterminated) as u32
}
