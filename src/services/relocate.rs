//! Asset relocation across the export/import boundary
//!
//! An asset is addressed by different naming schemes at different times:
//! a live device path before export, an archive-relative name inside a
//! backup, and a fresh permanent path after import. This module owns the
//! mapping between those namespaces and rewrites content-item references
//! as assets cross each boundary.

use crate::config;
use crate::content::{Content, ContentItem};
use crate::storage::AssetStore;
use std::path::Path;
use uuid::Uuid;

/// Bytes staged for packing, under their archive entry name
pub struct StagedAsset {
    pub entry_name: String,
    pub data: Vec<u8>,
}

/// Result of staging one note's content for export
pub struct StagedContent {
    /// Copy of the content with asset references rewritten to
    /// archive-relative names
    pub content: Content,
    pub assets: Vec<StagedAsset>,
    /// Assets whose source could not be read and were left out of the
    /// archive
    pub skipped: usize,
}

/// Result of materializing one note's content on import
pub struct MaterializedContent {
    pub content: Content,
    /// Items dropped because their asset was absent or unreadable
    pub dropped: usize,
}

/// Export direction: read every referenced asset through the store, stage
/// its bytes under a fresh collision-resistant archive name, and rewrite
/// the reference on a copy of the content. The live note is never mutated.
///
/// An unreadable source still gets its reference rewritten even though no
/// bytes are staged; the importer drops entries whose bytes never made it
/// into the archive.
pub async fn stage_content(store: &AssetStore, content: &Content) -> StagedContent {
    let mut staged = StagedContent {
        content: Content::default(),
        assets: Vec::new(),
        skipped: 0,
    };

    for item in &content.list {
        let rewritten = match item {
            ContentItem::Text { .. } => item.clone(),

            ContentItem::Image { path } => {
                let entry_name = format!(
                    "{}/{}{}",
                    config::IMAGES_DIR,
                    Uuid::new_v4(),
                    extension_of(path)
                );
                stage_asset(store, path, &entry_name, &mut staged).await;
                ContentItem::Image { path: entry_name }
            }

            ContentItem::File { path, display_name } => {
                let original = file_name_of(path).unwrap_or_else(|| display_name.clone());
                let entry_name =
                    format!("{}/{}_{}", config::FILES_DIR, Uuid::new_v4(), original);
                stage_asset(store, path, &entry_name, &mut staged).await;
                ContentItem::File {
                    path: entry_name,
                    display_name: display_name.clone(),
                }
            }
        };

        staged.content.list.push(rewritten);
    }

    staged
}

async fn stage_asset(
    store: &AssetStore,
    reference: &str,
    entry_name: &str,
    staged: &mut StagedContent,
) {
    match store.open_read(reference).await {
        Ok(Some(data)) => staged.assets.push(StagedAsset {
            entry_name: entry_name.to_string(),
            data,
        }),
        Ok(None) => {
            tracing::warn!("Asset reference no longer resolves, skipping: {}", reference);
            staged.skipped += 1;
        }
        Err(e) => {
            tracing::warn!("Failed to read asset {}: {}", reference, e);
            staged.skipped += 1;
        }
    }
}

/// Import direction: resolve each archive-relative reference inside the
/// unpacked scratch directory, copy the asset into permanent storage, and
/// rewrite the reference to the new location. Items whose asset is missing
/// or uncopyable are dropped from the content entirely.
pub async fn materialize_content(
    store: &AssetStore,
    scratch: &Path,
    content: Content,
) -> MaterializedContent {
    let mut materialized = MaterializedContent {
        content: Content::default(),
        dropped: 0,
    };

    for item in content.list {
        let kept = match item {
            ContentItem::Text { .. } => Some(item),

            ContentItem::Image { ref path } => {
                match materialize_asset(store, scratch, path, true).await {
                    Some(new_path) => Some(ContentItem::Image { path: new_path }),
                    None => None,
                }
            }

            ContentItem::File {
                ref path,
                ref display_name,
            } => match materialize_asset(store, scratch, path, false).await {
                Some(new_path) => Some(ContentItem::File {
                    path: new_path,
                    display_name: display_name.clone(),
                }),
                None => None,
            },
        };

        match kept {
            Some(item) => materialized.content.list.push(item),
            None => materialized.dropped += 1,
        }
    }

    // A dropped trailing item would otherwise leave the list ending in a
    // non-text item
    materialized.content.ensure_trailing_text();

    materialized
}

async fn materialize_asset(
    store: &AssetStore,
    scratch: &Path,
    reference: &str,
    is_image: bool,
) -> Option<String> {
    let relative = Path::new(reference);
    // Only references resolving inside the scratch directory are usable;
    // absolute paths and `..` traversal would escape it
    let escapes = relative
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir));
    if reference.is_empty() || relative.is_absolute() || escapes {
        tracing::warn!("Dropping item with unusable asset reference: {:?}", reference);
        return None;
    }

    let src = scratch.join(relative);
    if !src.exists() {
        tracing::warn!("Dropping item, asset missing from archive: {}", reference);
        return None;
    }

    let result = if is_image {
        store.materialize_image(&src).await
    } else {
        store.materialize_file(&src).await
    };

    match result {
        Ok(dest) => Some(dest.to_string_lossy().into_owned()),
        Err(e) => {
            tracing::warn!("Dropping item, failed to materialize {}: {}", reference, e);
            None
        }
    }
}

fn extension_of(reference: &str) -> String {
    Path::new(reference)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

fn file_name_of(reference: &str) -> Option<String> {
    Path::new(reference)
        .file_name()
        .and_then(|name| name.to_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_store() -> (AssetStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = AssetStore::new(temp_dir.path().join("assets"));
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_stage_rewrites_references_and_stages_bytes() {
        let (store, temp) = create_test_store().await;

        let image_src = temp.path().join("photo.png");
        fs::write(&image_src, b"png").await.unwrap();
        let file_src = temp.path().join("report.pdf");
        fs::write(&file_src, b"pdf").await.unwrap();

        let content = Content::new(vec![
            ContentItem::text("before"),
            ContentItem::Image {
                path: image_src.to_string_lossy().into_owned(),
            },
            ContentItem::File {
                path: file_src.to_string_lossy().into_owned(),
                display_name: "Quarterly report".to_string(),
            },
        ]);

        let staged = stage_content(&store, &content).await;

        assert_eq!(staged.skipped, 0);
        assert_eq!(staged.assets.len(), 2);

        let ContentItem::Image { path } = &staged.content.list[1] else {
            panic!("expected image item");
        };
        assert!(path.starts_with("images/"));
        assert!(path.ends_with(".png"));
        assert_eq!(staged.assets[0].entry_name, *path);
        assert_eq!(staged.assets[0].data, b"png");

        let ContentItem::File { path, display_name } = &staged.content.list[2] else {
            panic!("expected file item");
        };
        assert!(path.starts_with("files/"));
        assert!(path.ends_with("_report.pdf"));
        assert_eq!(display_name, "Quarterly report");

        // The input content is untouched
        assert!(matches!(&content.list[1], ContentItem::Image { path } if path.ends_with("photo.png")));
    }

    #[tokio::test]
    async fn test_stage_skips_unreadable_source_but_rewrites() {
        let (store, temp) = create_test_store().await;

        let gone = temp.path().join("gone.jpg");
        let content = Content::new(vec![ContentItem::Image {
            path: gone.to_string_lossy().into_owned(),
        }]);

        let staged = stage_content(&store, &content).await;

        assert_eq!(staged.skipped, 1);
        assert!(staged.assets.is_empty());
        // The reference is rewritten anyway; import drops it later
        assert!(
            matches!(&staged.content.list[0], ContentItem::Image { path } if path.starts_with("images/"))
        );
    }

    #[tokio::test]
    async fn test_materialize_rewrites_to_permanent_path() {
        let (store, temp) = create_test_store().await;

        let scratch = temp.path().join("scratch");
        fs::create_dir_all(scratch.join("images")).await.unwrap();
        fs::write(scratch.join("images/u1.png"), b"png").await.unwrap();

        let content = Content::new(vec![
            ContentItem::Image {
                path: "images/u1.png".to_string(),
            },
            ContentItem::text(""),
        ]);

        let materialized = materialize_content(&store, &scratch, content).await;

        assert_eq!(materialized.dropped, 0);
        let ContentItem::Image { path } = &materialized.content.list[0] else {
            panic!("expected image item");
        };
        assert!(Path::new(path).starts_with(store.images_dir()));
        assert_eq!(fs::read(path).await.unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_materialize_drops_missing_assets_in_place() {
        let (store, temp) = create_test_store().await;

        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).await.unwrap();

        let content = Content::new(vec![
            ContentItem::text("keep me"),
            ContentItem::Image {
                path: "images/never_packed.png".to_string(),
            },
            ContentItem::text("and me"),
        ]);

        let materialized = materialize_content(&store, &scratch, content).await;

        assert_eq!(materialized.dropped, 1);
        assert_eq!(
            materialized.content.list,
            vec![ContentItem::text("keep me"), ContentItem::text("and me")]
        );
    }

    #[tokio::test]
    async fn test_materialize_rejects_traversal_references() {
        let (store, temp) = create_test_store().await;

        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).await.unwrap();
        // A real file one level above the scratch directory
        fs::write(temp.path().join("secret.png"), b"secret").await.unwrap();

        let content = Content::new(vec![ContentItem::Image {
            path: "../secret.png".to_string(),
        }]);

        let materialized = materialize_content(&store, &scratch, content).await;

        // The item is dropped, never copied into permanent storage
        assert_eq!(materialized.dropped, 1);
        assert_eq!(materialized.content.list, vec![ContentItem::text("")]);
        assert!(!store.images_dir().join("secret.png").exists());
    }

    #[tokio::test]
    async fn test_materialize_drops_unparseable_references() {
        let (store, temp) = create_test_store().await;
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).await.unwrap();

        let content = Content::new(vec![
            ContentItem::Image {
                path: String::new(),
            },
            ContentItem::File {
                path: "/absolute/escape.txt".to_string(),
                display_name: "escape".to_string(),
            },
        ]);

        let materialized = materialize_content(&store, &scratch, content).await;

        assert_eq!(materialized.dropped, 2);
        // Only the re-established trailing text paragraph remains
        assert_eq!(materialized.content.list, vec![ContentItem::text("")]);
    }
}
