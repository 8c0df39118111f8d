//! Storage module
//!
//! Filesystem-backed collaborators for the backup engine:
//! - Asset store for permanent image/file storage
//! - Archive packing and unpacking

pub mod archive;
pub mod asset_store;

pub use asset_store::AssetStore;
