//! Migration of legacy on-disk product images into the blob store.
//!
//! [`ImageMigration`] walks every product with an image reference, uploads
//! the files that still live in the legacy uploads directory and repoints
//! the product at the new blob. Re-running it is safe: products that already
//! reference a blob are skipped.

mod error;
mod job;
mod report;
mod runner;

pub use error::{MigrationError, MigrationItemError};
pub use job::{ImageMigration, MIGRATED_FROM, MigrationOptions};
pub use report::{ItemFailure, MigrationReport, MigrationSummary};
pub use runner::{MigrationConfig, run_with_database};
