//! Services module
//!
//! Backup/restore orchestration and asset relocation.

pub mod backup;
pub mod relocate;

pub use backup::{BackupService, ExportReport, ImportReport};
