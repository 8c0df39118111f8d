//! Database models
//!
//! Rust structs representing persisted entities. Serde field names follow
//! the portable archive format, which is the only wire these entities
//! travel over.

use crate::content::Content;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Reminder attached to a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    /// Local date-time, no offset
    pub date: NaiveDateTime,
    // The archive field name is misspelled; kept for compatibility with
    // backups written by earlier releases.
    #[serde(rename = "descrition")]
    pub description: String,
}

/// A note with polymorphic content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Assigned by persistence on insert
    pub id: i64,
    pub name: String,
    pub content: Content,
    pub last_edit: NaiveDateTime,
    #[serde(default)]
    pub reminder: Option<Reminder>,
    pub is_secret: bool,
    /// Weak reference to a folder; cleared (not cascaded) when the folder
    /// is deleted
    #[serde(default)]
    pub folder_id: Option<i64>,
}

/// A lightweight note with plain text only, no assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuickNote {
    pub id: i64,
    pub text: String,
    pub last_edit: NaiveDateTime,
}

/// A folder grouping notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: i64,
    pub name: String,
}

/// A tag with a unique name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub tag_id: i64,
    pub name: String,
}

/// Many-to-many association between a note and a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NoteTagCrossRef {
    pub note_id: i64,
    pub tag_id: i64,
}
