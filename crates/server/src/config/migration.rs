use serde::Deserialize;

/// Legacy image migration configuration (`[migration]`).
#[derive(Debug, Deserialize)]
pub struct MigrationSection {
    /// Directory the legacy image names are relative to.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    /// Report what would be migrated without writing anything.
    #[serde(default)]
    pub dry_run: bool,
    /// Delete legacy files after a successful migration.
    #[serde(default)]
    pub remove_source: bool,
}

impl Default for MigrationSection {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            dry_run: false,
            remove_source: false,
        }
    }
}

fn default_uploads_dir() -> String {
    "uploads".to_owned()
}
