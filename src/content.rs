//! Note content model and codec
//!
//! A note body is an ordered sequence of content items: text paragraphs,
//! embedded images, and attached files. On the wire each item carries an
//! explicit `type` discriminator next to a `data` payload so archives stay
//! self-describing; an unrecognized discriminator fails the decode rather
//! than being skipped.

use serde::{Deserialize, Serialize};

/// One paragraph-like unit within a note's content sequence.
///
/// Image and file variants hold an asset reference whose concrete scheme
/// changes over an asset's life: a live-device path before export, an
/// archive-relative name (`images/<name>`, `files/<name>`) inside a backup,
/// and a permanent local path after import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ContentItem {
    #[serde(rename = "ItemText")]
    Text { text: String },

    #[serde(rename = "ItemImage")]
    Image { path: String },

    #[serde(rename = "ItemFile", rename_all = "camelCase")]
    File {
        path: String,
        /// User-visible filename, independent of the storage name.
        display_name: String,
    },
}

impl ContentItem {
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentItem::Text { .. })
    }
}

/// Ordered list of content items. Item order is reading order and is
/// preserved exactly across serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub list: Vec<ContentItem>,
}

impl Content {
    pub fn new(list: Vec<ContentItem>) -> Self {
        Self { list }
    }

    /// Append an empty text paragraph when the list does not end with one.
    ///
    /// Editing and display always expect a trailing text item. The invariant
    /// is not part of the wire format; callers re-establish it explicitly
    /// before serializing and after removing items. Idempotent.
    pub fn ensure_trailing_text(&mut self) {
        match self.list.last() {
            Some(ContentItem::Text { .. }) => {}
            _ => self.list.push(ContentItem::text("")),
        }
    }
}
