//! SQLite storage for resolved per-line changesets.
//!
//! What one analysis run resolves is saved here and becomes the persisted
//! SCM information of the next run.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use scmtrail_core::{Changeset, Component, ComponentKey, ScmTrailError};
use scmtrail_scm::{PersistedScmInfo, PersistedSource, ScmInfo};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Store statistics.
///
/// # Examples
///
/// ```
/// use scmtrail_sources::store::StoreStats;
///
/// let stats = StoreStats { total_files: 3, total_lines: 120 };
/// assert_eq!(stats.total_files, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Files with at least one stored changeset.
    pub total_files: usize,
    /// Stored line changesets across all files.
    pub total_lines: usize,
}

/// SQLite-backed store of per-line changesets, keyed by component key.
///
/// # Examples
///
/// ```
/// use scmtrail_sources::store::ScmStore;
///
/// let store = ScmStore::in_memory().unwrap();
/// assert_eq!(store.stats().unwrap().total_files, 0);
/// ```
pub struct ScmStore {
    conn: Connection,
}

impl ScmStore {
    /// Open or create a store database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Database`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use scmtrail_sources::store::ScmStore;
    ///
    /// let store = ScmStore::open(Path::new(".scmtrail/scm.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, ScmTrailError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ScmTrailError::Database(format!("failed to create store directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| ScmTrailError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, ScmTrailError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            ScmTrailError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), ScmTrailError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS line_changesets (
                    component_key TEXT NOT NULL,
                    line INTEGER NOT NULL,
                    author TEXT,
                    revision TEXT,
                    date_ms INTEGER NOT NULL,
                    PRIMARY KEY (component_key, line)
                );
                ",
            )
            .map_err(|e| ScmTrailError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Replace the stored changesets of `key` with those of `info`.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Database`] on write failure; the previous
    /// rows are kept in that case.
    pub fn save(&self, key: &ComponentKey, info: &ScmInfo) -> Result<(), ScmTrailError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| ScmTrailError::Database(format!("failed to begin transaction: {e}")))?;

        tx.execute(
            "DELETE FROM line_changesets WHERE component_key = ?1",
            params![key.as_str()],
        )
        .map_err(|e| ScmTrailError::Database(format!("failed to clear '{key}': {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO line_changesets (component_key, line, author, revision, date_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| ScmTrailError::Database(format!("failed to prepare insert: {e}")))?;

            for (line, changeset) in info.all_changesets() {
                stmt.execute(params![
                    key.as_str(),
                    line,
                    changeset.author,
                    changeset.revision,
                    changeset.date.timestamp_millis(),
                ])
                .map_err(|e| {
                    ScmTrailError::Database(format!("failed to insert line {line} of '{key}': {e}"))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| ScmTrailError::Database(format!("failed to commit '{key}': {e}")))?;
        debug!(
            "Stored {} line changesets for file '{}'",
            info.all_changesets().len(),
            key
        );
        Ok(())
    }

    /// Load the stored changesets of `key`, or `None` if there are none.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Database`] on query failure or an
    /// unrepresentable stored date.
    pub fn load_key(&self, key: &ComponentKey) -> Result<Option<ScmInfo>, ScmTrailError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT line, author, revision, date_ms FROM line_changesets
                 WHERE component_key = ?1 ORDER BY line",
            )
            .map_err(|e| ScmTrailError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![key.as_str()], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })
            .map_err(|e| ScmTrailError::Database(format!("failed to query '{key}': {e}")))?;

        let mut lines = BTreeMap::new();
        for row in rows {
            let (line, author, revision, date_ms) =
                row.map_err(|e| ScmTrailError::Database(format!("failed to read row: {e}")))?;
            let date = DateTime::<Utc>::from_timestamp_millis(date_ms).ok_or_else(|| {
                ScmTrailError::Database(format!(
                    "corrupted date {date_ms} for line {line} of '{key}'"
                ))
            })?;
            lines.insert(
                line,
                Changeset {
                    author,
                    revision,
                    date,
                },
            );
        }

        if lines.is_empty() {
            return Ok(None);
        }
        Ok(Some(ScmInfo::Persisted(PersistedScmInfo::new(lines))))
    }

    /// Remove every stored changeset of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Database`] on delete failure.
    pub fn remove(&self, key: &ComponentKey) -> Result<(), ScmTrailError> {
        self.conn
            .execute(
                "DELETE FROM line_changesets WHERE component_key = ?1",
                params![key.as_str()],
            )
            .map_err(|e| ScmTrailError::Database(format!("failed to remove '{key}': {e}")))?;
        Ok(())
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns [`ScmTrailError::Database`] on query failure.
    pub fn stats(&self) -> Result<StoreStats, ScmTrailError> {
        let (total_files, total_lines): (i64, i64) = self
            .conn
            .query_row(
                "SELECT COUNT(DISTINCT component_key), COUNT(*) FROM line_changesets",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| ScmTrailError::Database(format!("failed to count rows: {e}")))?;

        Ok(StoreStats {
            total_files: total_files as usize,
            total_lines: total_lines as usize,
        })
    }
}

impl PersistedSource for ScmStore {
    fn load(&self, component: &Component) -> scmtrail_core::Result<Option<ScmInfo>> {
        self.load_key(&component.key)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use scmtrail_core::{ComponentStatus, ReportRef};
    use scmtrail_scm::{GeneratedScmInfo, ReportScmInfo, ScmSource};

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(millis).unwrap()
    }

    fn report_info() -> ScmInfo {
        let mut lines = BTreeMap::new();
        lines.insert(1, Changeset::new(at(1_000)).with_author("alice").with_revision("r1"));
        lines.insert(2, Changeset::new(at(2_000)).with_revision("r2"));
        ScmInfo::Report(ReportScmInfo::new(lines))
    }

    #[test]
    fn saved_info_loads_as_persisted() {
        let store = ScmStore::in_memory().unwrap();
        let key = ComponentKey::from("p:a.rs");
        store.save(&key, &report_info()).unwrap();

        let loaded = store.load_key(&key).unwrap().unwrap();
        assert_eq!(loaded.source(), ScmSource::Persisted);
        assert_eq!(loaded.all_changesets(), report_info().all_changesets());
    }

    #[test]
    fn unknown_file_loads_nothing() {
        let store = ScmStore::in_memory().unwrap();
        let component = Component::file("p:none.rs", ReportRef(1), ComponentStatus::Same, "none.rs");
        assert!(store.load(&component).unwrap().is_none());
    }

    #[test]
    fn save_replaces_previous_lines() {
        let store = ScmStore::in_memory().unwrap();
        let key = ComponentKey::from("p:a.rs");
        store.save(&key, &report_info()).unwrap();

        let lines: BTreeSet<u32> = [5].into_iter().collect();
        let generated = ScmInfo::Generated(GeneratedScmInfo::build(at(9_000), &lines));
        store.save(&key, &generated).unwrap();

        let loaded = store.load_key(&key).unwrap().unwrap();
        assert_eq!(loaded.all_changesets().keys().copied().collect::<Vec<_>>(), vec![5]);
        assert!(loaded.changeset_for_line(5).unwrap().author.is_none());
    }

    #[test]
    fn remove_and_stats() {
        let store = ScmStore::in_memory().unwrap();
        store.save(&ComponentKey::from("p:a.rs"), &report_info()).unwrap();
        store.save(&ComponentKey::from("p:b.rs"), &report_info()).unwrap();
        assert_eq!(
            store.stats().unwrap(),
            StoreStats {
                total_files: 2,
                total_lines: 4
            }
        );

        store.remove(&ComponentKey::from("p:a.rs")).unwrap();
        assert_eq!(store.stats().unwrap().total_files, 1);
        assert!(store.load_key(&ComponentKey::from("p:a.rs")).unwrap().is_none());
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/scm.db");
        let key = ComponentKey::from("p:a.rs");
        {
            let store = ScmStore::open(&path).unwrap();
            store.save(&key, &report_info()).unwrap();
        }
        let reopened = ScmStore::open(&path).unwrap();
        assert!(reopened.load_key(&key).unwrap().is_some());
    }
}
