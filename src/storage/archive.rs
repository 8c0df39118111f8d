//! Backup archive packing and unpacking
//!
//! A backup is a single ZIP container holding named UTF-8 text entries
//! (the serialized entity collections) plus named binary entries (the
//! staged assets, namespaced as `images/<name>` and `files/<name>`).
//! Packing and unpacking are synchronous; the orchestrator calls them from
//! its one background task.

use crate::error::{AppError, Result};
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Payload of one archive entry
pub enum EntryData {
    Text(String),
    Bytes(Vec<u8>),
}

/// One named archive entry
pub struct ArchiveEntry {
    pub name: String,
    pub data: EntryData,
}

impl ArchiveEntry {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: EntryData::Text(text.into()),
        }
    }

    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: EntryData::Bytes(bytes),
        }
    }
}

/// Pack entries into a single archive file at `dest`.
pub fn pack(dest: &Path, entries: &[ArchiveEntry]) -> Result<()> {
    let file = std::fs::File::create(dest)?;
    let mut zip = ZipWriter::new(file);
    let options =
        FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in entries {
        zip.start_file(&entry.name, options)?;
        match &entry.data {
            EntryData::Text(text) => zip.write_all(text.as_bytes())?,
            EntryData::Bytes(bytes) => zip.write_all(bytes)?,
        }
    }

    zip.finish()?;

    tracing::debug!("Packed {} entries into {:?}", entries.len(), dest);
    Ok(())
}

/// Unpack every entry of `source` into `scratch`, preserving relative paths.
///
/// A failure on one entry is logged and skipped so the remaining entries
/// still extract; the importer discovers missing assets later when it
/// resolves references. An unreadable or invalid container is fatal.
/// Returns the number of entries extracted.
pub fn unpack(source: &Path, scratch: &Path) -> Result<usize> {
    let file = std::fs::File::open(source)
        .map_err(|e| AppError::Restore(format!("Cannot open archive {:?}: {}", source, e)))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| AppError::Restore(format!("Invalid archive {:?}: {}", source, e)))?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping undecodable archive entry {}: {}", index, e);
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }

        // enclosed_name rejects paths escaping the scratch directory
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let dest = scratch.join(relative);

        if let Err(e) = extract_entry(&mut entry, &dest) {
            tracing::warn!("Failed to extract {}: {}", entry.name(), e);
            continue;
        }

        extracted += 1;
    }

    tracing::debug!("Extracted {} entries into {:?}", extracted, scratch);
    Ok(extracted)
}

fn extract_entry(entry: &mut impl std::io::Read, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = std::fs::File::create(dest)?;
    std::io::copy(entry, &mut out)?;
    Ok(())
}
