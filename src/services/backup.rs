//! Backup orchestration
//!
//! Exports all user data into a single portable archive and imports such an
//! archive back into a cleared database. Both operations run sequentially
//! inside one background task; an in-flight flag rejects overlapping
//! invocations, which would otherwise race on the scratch directory and on
//! the clear-then-repopulate sequence.
//!
//! Import is destructive and not transactional: the existing collections
//! are cleared before the archive is even opened, and a failure after that
//! point does not bring them back. Import therefore never propagates
//! errors; it reports what it managed to restore.

use crate::config;
use crate::database::{Folder, Note, NoteTagCrossRef, QuickNote, Repository, Tag};
use crate::error::{AppError, Result};
use crate::services::relocate;
use crate::storage::archive::{self, ArchiveEntry};
use crate::storage::AssetStore;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;

/// Outcome of an export
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExportReport {
    pub notes: usize,
    pub quick_notes: usize,
    pub folders: usize,
    pub tags: usize,
    pub cross_refs: usize,
    /// Assets whose source was unreadable and were left out of the archive
    pub skipped_assets: usize,
}

/// Outcome of an import
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    /// False when the import aborted partway; the previous data is gone
    /// either way
    pub completed: bool,
    pub notes: usize,
    pub quick_notes: usize,
    pub folders: usize,
    pub tags: usize,
    pub cross_refs: usize,
    /// Content items dropped because their asset was missing from the
    /// archive or could not be copied
    pub dropped_items: usize,
    /// Entity kinds whose archive file failed to parse and were restored
    /// as empty
    pub discarded_kinds: usize,
}

/// Backup service
#[derive(Clone)]
pub struct BackupService {
    repo: Repository,
    assets: AssetStore,
    cache_dir: PathBuf,
    in_flight: Arc<AtomicBool>,
}

impl BackupService {
    pub fn new(repo: Repository, assets: AssetStore, cache_dir: PathBuf) -> Self {
        Self {
            repo,
            assets,
            cache_dir,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Export all user data into a portable archive at `dest`.
    ///
    /// The archive is built in a temporary file first and copied to `dest`
    /// as the final step, so a failed export leaves the destination
    /// untouched. The temporary file is removed on the way out either way.
    pub async fn export_all_backup(&self, dest: &Path) -> Result<ExportReport> {
        let _guard = self.acquire()?;

        tracing::info!("Exporting backup to {:?}", dest);
        fs::create_dir_all(&self.cache_dir).await?;

        let temp_path = self.cache_dir.join(format!(
            "backup_{}.zip.tmp",
            Local::now().format("%Y%m%d_%H%M%S")
        ));

        let result = self.export_inner(&temp_path, dest).await;

        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path).await;
        }

        result
    }

    async fn export_inner(&self, temp_path: &Path, dest: &Path) -> Result<ExportReport> {
        let mut notes = self.repo.get_all_notes().await?;
        let quick_notes = self.repo.get_all_quick_notes().await?;
        let folders = self.repo.get_all_folders().await?;
        let tags = self.repo.get_all_tags().await?;
        let cross_refs = self.repo.get_all_cross_refs().await?;

        let mut report = ExportReport {
            notes: notes.len(),
            quick_notes: quick_notes.len(),
            folders: folders.len(),
            tags: tags.len(),
            cross_refs: cross_refs.len(),
            skipped_assets: 0,
        };

        // Stage every referenced asset and rewrite the (copied) content to
        // archive-relative names. The persisted notes are not mutated.
        let mut staged_assets = Vec::new();
        for note in &mut notes {
            note.content.ensure_trailing_text();
            let staged = relocate::stage_content(&self.assets, &note.content).await;
            note.content = staged.content;
            staged_assets.extend(staged.assets);
            report.skipped_assets += staged.skipped;
        }

        let mut entries = vec![
            ArchiveEntry::text(config::NOTES_ENTRY, to_json_array(&notes)?),
            ArchiveEntry::text(config::QUICK_NOTES_ENTRY, to_json_array(&quick_notes)?),
            ArchiveEntry::text(config::FOLDERS_ENTRY, to_json_array(&folders)?),
            ArchiveEntry::text(config::TAGS_ENTRY, to_json_array(&tags)?),
            ArchiveEntry::text(config::CROSS_REFS_ENTRY, to_json_array(&cross_refs)?),
        ];
        for asset in staged_assets {
            entries.push(ArchiveEntry::bytes(asset.entry_name, asset.data));
        }

        archive::pack(temp_path, &entries)?;

        fs::copy(temp_path, dest).await?;

        tracing::info!(
            "Backup exported: {} notes, {} assets staged, {} skipped",
            report.notes,
            entries.len() - 5,
            report.skipped_assets
        );

        Ok(report)
    }

    /// Import a portable archive, replacing all current user data.
    ///
    /// Clears every collection first, then unpacks and restores in
    /// dependency order: folders, quick notes, tags, notes, cross-refs.
    /// Errors are swallowed and logged; the report says whether the import
    /// completed and what was skipped along the way.
    pub async fn import_all_backup(&self, source: &Path) -> ImportReport {
        let mut report = ImportReport::default();

        let _guard = match self.acquire() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::warn!("Import rejected: {}", e);
                return report;
            }
        };

        tracing::info!("Importing backup from {:?}", source);
        let scratch = self.cache_dir.join(config::RESTORE_SCRATCH_DIR);

        if let Err(e) = self.import_inner(source, &scratch, &mut report).await {
            tracing::error!("Import failed: {}", e);
        } else {
            report.completed = true;
            tracing::info!(
                "Backup imported: {} notes, {} items dropped, {} kinds discarded",
                report.notes,
                report.dropped_items,
                report.discarded_kinds
            );
        }

        // The scratch directory goes away regardless of success
        let _ = fs::remove_dir_all(&scratch).await;

        report
    }

    async fn import_inner(
        &self,
        source: &Path,
        scratch: &Path,
        report: &mut ImportReport,
    ) -> Result<()> {
        // Destructive clear. Cross-refs go by cascade from notes and tags.
        self.repo.clear_notes().await?;
        self.repo.clear_tags().await?;
        self.repo.clear_quick_notes().await?;
        self.repo.clear_folders().await?;

        if scratch.exists() {
            fs::remove_dir_all(scratch).await?;
        }
        fs::create_dir_all(scratch).await?;

        archive::unpack(source, scratch)?;

        let folders: Vec<Folder> =
            read_records(scratch, config::FOLDERS_ENTRY, &mut report.discarded_kinds).await;
        let quick_notes: Vec<QuickNote> =
            read_records(scratch, config::QUICK_NOTES_ENTRY, &mut report.discarded_kinds).await;
        let tags: Vec<Tag> =
            read_records(scratch, config::TAGS_ENTRY, &mut report.discarded_kinds).await;
        let notes: Vec<Note> =
            read_records(scratch, config::NOTES_ENTRY, &mut report.discarded_kinds).await;
        let cross_refs: Vec<NoteTagCrossRef> =
            read_records(scratch, config::CROSS_REFS_ENTRY, &mut report.discarded_kinds).await;

        // Materialize assets into permanent storage, rewriting references
        // and dropping items whose bytes never made it into the archive
        let mut restored_notes = Vec::with_capacity(notes.len());
        for mut note in notes {
            let materialized =
                relocate::materialize_content(&self.assets, scratch, note.content).await;
            note.content = materialized.content;
            report.dropped_items += materialized.dropped;
            restored_notes.push(note);
        }

        // Insert in dependency order: notes reference folders by id, and
        // cross-refs require both notes and tags to exist
        for folder in &folders {
            self.repo.insert_folder(folder).await?;
        }
        for quick_note in &quick_notes {
            self.repo.insert_quick_note(quick_note).await?;
        }
        for tag in &tags {
            self.repo.insert_tag(tag).await?;
        }
        for note in &restored_notes {
            self.repo.insert_note(note).await?;
        }
        for cross_ref in &cross_refs {
            self.repo.insert_cross_ref(cross_ref).await?;
        }

        report.folders = folders.len();
        report.quick_notes = quick_notes.len();
        report.tags = tags.len();
        report.notes = restored_notes.len();
        report.cross_refs = cross_refs.len();

        Ok(())
    }

    /// Claim the single in-flight slot; released when the guard drops.
    fn acquire(&self) -> Result<InFlightGuard> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AppError::Backup(
                "another backup or restore is already running".to_string(),
            ));
        }

        Ok(InFlightGuard(self.in_flight.clone()))
    }
}

struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn to_json_array<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Read one entity kind's records out of the scratch directory.
///
/// A missing file means the archive simply has none of that kind. Any
/// parse error discards the whole kind: a single malformed record (an
/// unknown content-item variant included) empties the collection rather
/// than failing the import.
async fn read_records<T: DeserializeOwned>(
    scratch: &Path,
    entry: &str,
    discarded: &mut usize,
) -> Vec<T> {
    let path = scratch.join(entry);

    let raw = match fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Archive has no {}, restoring empty collection", entry);
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", entry, e);
            *discarded += 1;
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Discarding {}: {}", entry, e);
            *discarded += 1;
            Vec::new()
        }
    }
}
