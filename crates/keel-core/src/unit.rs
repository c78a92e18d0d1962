//! Migration unit: one version's up/down script pair.

use crate::version::VersionIdentifier;
use std::path::PathBuf;

/// A single migration loaded for one engine.
///
/// Immutable once loaded; fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    id: VersionIdentifier,
    name: String,
    up_script: String,
    down_script: Option<String>,
    origin: Option<PathBuf>,
}

impl MigrationUnit {
    /// Create a unit. A down-script with no SQL (blank or only `--` comments)
    /// is treated as absent, so the unit is irreversible.
    pub fn new(
        id: VersionIdentifier,
        name: impl Into<String>,
        up_script: impl Into<String>,
        down_script: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            up_script: up_script.into(),
            down_script: down_script.filter(|s| !is_blank_script(s)),
            origin: None,
        }
    }

    /// Record where the unit was loaded from (used in error messages).
    pub fn with_origin(mut self, origin: PathBuf) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Derive a human label from an identifier (`20240101_add_users` -> `add users`).
    pub fn name_from_version(id: &VersionIdentifier) -> String {
        id.label()
            .map(|l| l.replace('_', " "))
            .unwrap_or_default()
    }

    pub fn id(&self) -> &VersionIdentifier {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn up_script(&self) -> &str {
        &self.up_script
    }

    pub fn down_script(&self) -> Option<&str> {
        self.down_script.as_deref()
    }

    /// Whether this unit can be reverted.
    pub fn is_reversible(&self) -> bool {
        self.down_script.is_some()
    }

    /// Directory the unit was loaded from, if it came from disk.
    pub fn origin(&self) -> Option<&PathBuf> {
        self.origin.as_ref()
    }
}

/// True if the script has nothing but whitespace and `--` comment lines.
pub fn is_blank_script(sql: &str) -> bool {
    sql.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> VersionIdentifier {
        VersionIdentifier::parse(raw).unwrap()
    }

    #[test]
    fn test_blank_down_script_is_irreversible() {
        let unit = MigrationUnit::new(v("1_a"), "a", "CREATE TABLE a (id INT);", Some("  \n".into()));
        assert!(!unit.is_reversible());
        assert_eq!(unit.down_script(), None);
    }

    #[test]
    fn test_comment_only_down_script_is_irreversible() {
        let down = "-- Revert: a\n-- Undo the changes made by up.sql here.\n";
        let unit = MigrationUnit::new(v("1_a"), "a", "CREATE TABLE a (id INT);", Some(down.into()));
        assert!(!unit.is_reversible());
    }

    #[test]
    fn test_is_blank_script() {
        assert!(is_blank_script(""));
        assert!(is_blank_script("  \n-- nothing here\n  -- still nothing\n"));
        assert!(!is_blank_script("-- header\nSELECT 1;"));
    }

    #[test]
    fn test_down_script_kept() {
        let unit = MigrationUnit::new(
            v("1_a"),
            "a",
            "CREATE TABLE a (id INT);",
            Some("DROP TABLE a;".into()),
        );
        assert!(unit.is_reversible());
        assert_eq!(unit.down_script(), Some("DROP TABLE a;"));
    }

    #[test]
    fn test_name_from_version() {
        assert_eq!(
            MigrationUnit::name_from_version(&v("20240101_add_users_table")),
            "add users table"
        );
        assert_eq!(MigrationUnit::name_from_version(&v("20240101")), "");
    }
}
