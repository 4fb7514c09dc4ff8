//! Request/response types for note endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::store::Note;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
}

/// Partial update. Absent fields are left unchanged.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_archived: Option<bool>,
}

/// Query parameters are taken as text so junk values fall back to defaults.
#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct ListNotesQuery {
    /// Page number, starting at 1.
    pub page: Option<String>,
    /// Page size, 1 to 100 (default 10).
    pub limit: Option<String>,
    /// Whitespace separated terms; every term must appear in the title or content.
    pub search: Option<String>,
    /// `true` or `false` to filter on the archived flag.
    pub archived: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteView {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            user_id: note.user_id,
            title: note.title,
            content: note.content,
            is_archived: note.is_archived,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NoteResponse {
    pub message: String,
    pub note: NoteView,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NoteDetailResponse {
    pub note: NoteView,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_notes: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct NoteListResponse {
    pub notes: Vec<NoteView>,
    pub pagination: Pagination,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeletedNote {
    pub id: Uuid,
    pub title: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNoteResponse {
    pub message: String,
    pub deleted_note: DeletedNote,
}
