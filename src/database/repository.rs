//! Repository layer for database operations
//!
//! CRUD operations for all entities, plus the bulk read / bulk clear /
//! explicit-id insert operations the backup engine is built on. Backup
//! restores records under their original ids, so inserts here come in two
//! flavors: `create_*` (persistence assigns the id) and `insert_*` (the
//! caller supplies the whole record, id included).

use super::models::*;
use crate::content::Content;
use crate::error::{AppError, Result};
use chrono::{Local, NaiveDateTime};
use sqlx::{FromRow, SqlitePool};

/// Flat row shape for `notes`; content and reminder are assembled
/// into their model types after fetching.
#[derive(FromRow)]
struct NoteRow {
    id: i64,
    name: String,
    content_json: String,
    last_edit: NaiveDateTime,
    reminder_date: Option<NaiveDateTime>,
    reminder_description: Option<String>,
    is_secret: bool,
    folder_id: Option<i64>,
}

impl TryFrom<NoteRow> for Note {
    type Error = AppError;

    fn try_from(row: NoteRow) -> Result<Note> {
        let content: Content = serde_json::from_str(&row.content_json)?;
        let reminder = row.reminder_date.map(|date| Reminder {
            date,
            description: row.reminder_description.unwrap_or_default(),
        });

        Ok(Note {
            id: row.id,
            name: row.name,
            content,
            last_edit: row.last_edit,
            reminder,
            is_secret: row.is_secret,
            folder_id: row.folder_id,
        })
    }
}

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ===== Notes =====

    /// Create a new note; persistence assigns the id.
    pub async fn create_note(&self, name: &str, content: &Content) -> Result<Note> {
        let now = Local::now().naive_local();
        let content_json = serde_json::to_string(content)?;

        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            INSERT INTO notes (name, content_json, last_edit, is_secret)
            VALUES (?, ?, ?, 0)
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(&content_json)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created note: {}", row.id);
        Note::try_from(row)
    }

    /// Get a note by ID
    pub async fn get_note(&self, id: i64) -> Result<Note> {
        let row = sqlx::query_as::<_, NoteRow>("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NoteNotFound(id))?;

        Note::try_from(row)
    }

    /// List all notes
    pub async fn get_all_notes(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query_as::<_, NoteRow>("SELECT * FROM notes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Note::try_from).collect()
    }

    /// Update a note's name and content; bumps last_edit.
    pub async fn update_note(&self, id: i64, name: &str, content: &Content) -> Result<Note> {
        let now = Local::now().naive_local();
        let content_json = serde_json::to_string(content)?;

        let rows_affected = sqlx::query(
            "UPDATE notes SET name = ?, content_json = ?, last_edit = ? WHERE id = ?",
        )
        .bind(name)
        .bind(&content_json)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NoteNotFound(id));
        }

        self.get_note(id).await
    }

    /// Move a note into a folder (or out of any folder with `None`)
    pub async fn move_note_to_folder(&self, id: i64, folder_id: Option<i64>) -> Result<()> {
        let rows = sqlx::query("UPDATE notes SET folder_id = ? WHERE id = ?")
            .bind(folder_id)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id));
        }

        Ok(())
    }

    /// Delete a note; its cross-refs cascade.
    pub async fn delete_note(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::NoteNotFound(id));
        }

        tracing::debug!("Deleted note: {}", id);
        Ok(())
    }

    /// Insert a note under its original id (restore path)
    pub async fn insert_note(&self, note: &Note) -> Result<()> {
        let content_json = serde_json::to_string(&note.content)?;

        sqlx::query(
            r#"
            INSERT INTO notes (id, name, content_json, last_edit,
                               reminder_date, reminder_description, is_secret, folder_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.id)
        .bind(&note.name)
        .bind(&content_json)
        .bind(note.last_edit)
        .bind(note.reminder.as_ref().map(|r| r.date))
        .bind(note.reminder.as_ref().map(|r| r.description.as_str()))
        .bind(note.is_secret)
        .bind(note.folder_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete every note; cross-refs cascade.
    pub async fn clear_notes(&self) -> Result<()> {
        sqlx::query("DELETE FROM notes").execute(&self.pool).await?;
        tracing::debug!("Cleared notes");
        Ok(())
    }

    // ===== Quick notes =====

    pub async fn create_quick_note(&self, text: &str) -> Result<QuickNote> {
        let now = Local::now().naive_local();

        let quick_note = sqlx::query_as::<_, QuickNote>(
            "INSERT INTO quick_notes (text, last_edit) VALUES (?, ?) RETURNING *",
        )
        .bind(text)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created quick note: {}", quick_note.id);
        Ok(quick_note)
    }

    pub async fn get_all_quick_notes(&self) -> Result<Vec<QuickNote>> {
        let quick_notes =
            sqlx::query_as::<_, QuickNote>("SELECT * FROM quick_notes ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(quick_notes)
    }

    pub async fn insert_quick_note(&self, quick_note: &QuickNote) -> Result<()> {
        sqlx::query("INSERT INTO quick_notes (id, text, last_edit) VALUES (?, ?, ?)")
            .bind(quick_note.id)
            .bind(&quick_note.text)
            .bind(quick_note.last_edit)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn clear_quick_notes(&self) -> Result<()> {
        sqlx::query("DELETE FROM quick_notes")
            .execute(&self.pool)
            .await?;
        tracing::debug!("Cleared quick notes");
        Ok(())
    }

    // ===== Folders =====

    pub async fn create_folder(&self, name: &str) -> Result<Folder> {
        let folder =
            sqlx::query_as::<_, Folder>("INSERT INTO folders (name) VALUES (?) RETURNING *")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;

        tracing::debug!("Created folder: {}", folder.id);
        Ok(folder)
    }

    pub async fn get_all_folders(&self) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>("SELECT * FROM folders ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(folders)
    }

    /// Delete a folder. Notes referencing it keep existing with their
    /// folder reference cleared, never cascaded.
    pub async fn delete_folder(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE notes SET folder_id = NULL WHERE folder_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted folder: {}", id);
        Ok(())
    }

    pub async fn insert_folder(&self, folder: &Folder) -> Result<()> {
        sqlx::query("INSERT INTO folders (id, name) VALUES (?, ?)")
            .bind(folder.id)
            .bind(&folder.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn clear_folders(&self) -> Result<()> {
        sqlx::query("DELETE FROM folders")
            .execute(&self.pool)
            .await?;
        tracing::debug!("Cleared folders");
        Ok(())
    }

    // ===== Tags =====

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES (?) RETURNING *")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!("Created tag: {}", tag.tag_id);
        Ok(tag)
    }

    pub async fn get_all_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY tag_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(tags)
    }

    /// Delete a tag; its cross-refs cascade.
    pub async fn delete_tag(&self, tag_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tags WHERE tag_id = ?")
            .bind(tag_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted tag: {}", tag_id);
        Ok(())
    }

    pub async fn insert_tag(&self, tag: &Tag) -> Result<()> {
        sqlx::query("INSERT INTO tags (tag_id, name) VALUES (?, ?)")
            .bind(tag.tag_id)
            .bind(&tag.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn clear_tags(&self) -> Result<()> {
        sqlx::query("DELETE FROM tags").execute(&self.pool).await?;
        tracing::debug!("Cleared tags");
        Ok(())
    }

    // ===== Note-tag cross-references =====

    pub async fn tag_note(&self, note_id: i64, tag_id: i64) -> Result<()> {
        self.insert_cross_ref(&NoteTagCrossRef { note_id, tag_id })
            .await
    }

    pub async fn get_all_cross_refs(&self) -> Result<Vec<NoteTagCrossRef>> {
        let cross_refs = sqlx::query_as::<_, NoteTagCrossRef>(
            "SELECT * FROM note_tag_cross_refs ORDER BY note_id, tag_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(cross_refs)
    }

    pub async fn insert_cross_ref(&self, cross_ref: &NoteTagCrossRef) -> Result<()> {
        sqlx::query("INSERT INTO note_tag_cross_refs (note_id, tag_id) VALUES (?, ?)")
            .bind(cross_ref.note_id)
            .bind(cross_ref.tag_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentItem;
    use crate::database::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        // A single connection keeps the in-memory database (and its
        // foreign_keys pragma) shared across every query.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();
        Repository::new(pool)
    }

    #[tokio::test]
    async fn test_note_crud() {
        let repo = create_test_repo().await;

        let content = Content::new(vec![ContentItem::text("hello")]);
        let note = repo.create_note("First", &content).await.unwrap();
        assert!(note.id > 0);
        assert_eq!(note.content, content);

        let updated_content = Content::new(vec![ContentItem::text("edited")]);
        let updated = repo
            .update_note(note.id, "Renamed", &updated_content)
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.content, updated_content);

        repo.delete_note(note.id).await.unwrap();
        assert!(repo.get_note(note.id).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_note_preserves_id_and_reminder() {
        let repo = create_test_repo().await;

        let note = Note {
            id: 42,
            name: "kept".to_string(),
            content: Content::new(vec![ContentItem::text("body")]),
            last_edit: "2026-02-01T12:00:00".parse().unwrap(),
            reminder: Some(Reminder {
                date: "2026-02-02T08:00:00".parse().unwrap(),
                description: "ping".to_string(),
            }),
            is_secret: true,
            folder_id: None,
        };

        repo.insert_note(&note).await.unwrap();

        let fetched = repo.get_note(42).await.unwrap();
        assert_eq!(fetched, note);
    }

    #[tokio::test]
    async fn test_insert_note_tolerates_dangling_folder_id() {
        let repo = create_test_repo().await;

        let note = Note {
            id: 1,
            name: "orphan".to_string(),
            content: Content::default(),
            last_edit: "2026-02-01T12:00:00".parse().unwrap(),
            reminder: None,
            is_secret: false,
            folder_id: Some(999),
        };

        repo.insert_note(&note).await.unwrap();
        assert_eq!(repo.get_note(1).await.unwrap().folder_id, Some(999));
    }

    #[tokio::test]
    async fn test_delete_folder_clears_note_reference() {
        let repo = create_test_repo().await;

        let folder = repo.create_folder("work").await.unwrap();
        let note = repo
            .create_note("in folder", &Content::default())
            .await
            .unwrap();
        repo.move_note_to_folder(note.id, Some(folder.id))
            .await
            .unwrap();

        repo.delete_folder(folder.id).await.unwrap();

        // The note survives with its folder reference cleared
        let note = repo.get_note(note.id).await.unwrap();
        assert_eq!(note.folder_id, None);
        assert!(repo.get_all_folders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_cascade() {
        let repo = create_test_repo().await;

        let note = repo.create_note("tagged", &Content::default()).await.unwrap();
        let tag = repo.create_tag("urgent").await.unwrap();
        repo.tag_note(note.id, tag.tag_id).await.unwrap();

        assert_eq!(repo.get_all_cross_refs().await.unwrap().len(), 1);

        // Deleting either end removes the association
        repo.delete_tag(tag.tag_id).await.unwrap();
        assert!(repo.get_all_cross_refs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_notes_cascades_cross_refs() {
        let repo = create_test_repo().await;

        let note = repo.create_note("n", &Content::default()).await.unwrap();
        let tag = repo.create_tag("t").await.unwrap();
        repo.tag_note(note.id, tag.tag_id).await.unwrap();

        repo.clear_notes().await.unwrap();

        assert!(repo.get_all_notes().await.unwrap().is_empty());
        assert!(repo.get_all_cross_refs().await.unwrap().is_empty());
        // Tags themselves are untouched
        assert_eq!(repo.get_all_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tag_name_unique() {
        let repo = create_test_repo().await;

        repo.create_tag("dup").await.unwrap();
        assert!(repo.create_tag("dup").await.is_err());
    }
}
