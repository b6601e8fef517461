use std::fmt;

use serde::Serialize;
use vitrine_catalog::ProductId;

use crate::error::MigrationItemError;

/// One product that could not be migrated.
#[derive(Debug)]
pub struct ItemFailure {
    pub product_id: ProductId,
    pub image: String,
    pub error: MigrationItemError,
}

/// Outcome of a migration run.
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Products with an image reference that were examined.
    pub scanned: usize,
    /// Legacy files uploaded and repointed (or that would be, in a dry run).
    pub migrated: usize,
    /// Products already referencing a blob.
    pub already_stored: usize,
    /// Products referencing an external URL.
    pub external: usize,
    /// Legacy references whose file no longer exists.
    pub missing: usize,
    /// Products that failed; see [`MigrationReport::failures`].
    pub failures: Vec<ItemFailure>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl MigrationReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Whether every examined product ended in a non-error state.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Counters only, for structured output.
    pub fn summary(&self) -> MigrationSummary {
        MigrationSummary {
            scanned: self.scanned,
            migrated: self.migrated,
            already_stored: self.already_stored,
            external: self.external,
            missing: self.missing,
            failed: self.failed(),
            dry_run: self.dry_run,
        }
    }
}

/// Serializable counters of a [`MigrationReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub scanned: usize,
    pub migrated: usize,
    pub already_stored: usize,
    pub external: usize,
    pub missing: usize,
    pub failed: usize,
    pub dry_run: bool,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would migrate" } else { "migrated" };
        write!(
            f,
            "scanned {}, {verb} {}, already stored {}, external {}, missing {}, failed {}",
            self.scanned,
            self.migrated,
            self.already_stored,
            self.external,
            self.missing,
            self.failed()
        )?;
        for failure in &self.failures {
            write!(
                f,
                "\n  product {} ({}): {}",
                failure.product_id, failure.image, failure.error
            )?;
        }
        Ok(())
    }
}
