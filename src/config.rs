//! Application configuration constants
//!
//! Central location for the archive layout and storage naming used
//! throughout the backup/restore engine.

// ===== Archive entry names =====

/// Top-level archive entry holding the serialized notes array
pub const NOTES_ENTRY: &str = "notes.json";
/// Top-level archive entry holding the serialized quick notes array
pub const QUICK_NOTES_ENTRY: &str = "quicknotes.json";
/// Top-level archive entry holding the serialized folders array
pub const FOLDERS_ENTRY: &str = "folders.json";
/// Top-level archive entry holding the serialized tags array
pub const TAGS_ENTRY: &str = "tags.json";
/// Top-level archive entry holding the serialized note-tag associations
pub const CROSS_REFS_ENTRY: &str = "crossrefs.json";

// ===== Asset namespaces =====

/// Archive namespace (and permanent storage subdirectory) for image assets
pub const IMAGES_DIR: &str = "images";
/// Archive namespace (and permanent storage subdirectory) for file assets
pub const FILES_DIR: &str = "files";

// ===== Temporary locations =====

/// Directory name, under the cache dir, where an archive is unpacked
/// before its contents are parsed and materialized
pub const RESTORE_SCRATCH_DIR: &str = "restore_scratch";
