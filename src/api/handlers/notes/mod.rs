//! Note CRUD for the authenticated user.
//!
//! Every store call is keyed by `(note_id, owner)`. A note that belongs to
//! someone else, does not exist, or whose id does not parse is reported as
//! `404 Note not found`.

pub mod types;

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use self::types::{
    CreateNoteRequest, DeleteNoteResponse, DeletedNote, ListNotesQuery, NoteDetailResponse,
    NoteListResponse, NoteResponse, NoteView, Pagination, UpdateNoteRequest,
};
use super::auth::{require_auth, AuthState};
use crate::{
    api::error::{ApiError, ErrorBody, FieldError},
    store::{search_terms, NewNote, NoteChanges, NoteQuery, NoteStore},
};

const TITLE_MAX: usize = 100;
const CONTENT_MAX: usize = 10_000;
const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: i64 = 100;

const NOT_FOUND: &str = "Note not found";

fn validate_text(field: &str, label: &str, value: &str, max: usize) -> Result<String, FieldError> {
    let value = value.trim();
    let length = value.chars().count();
    if length == 0 {
        Err(FieldError::new(field, &format!("{label} is required")))
    } else if length > max {
        Err(FieldError::new(
            field,
            &format!("{label} must be at most {max} characters"),
        ))
    } else {
        Ok(value.to_string())
    }
}

fn validate_title(title: &str) -> Result<String, FieldError> {
    validate_text("title", "Title", title, TITLE_MAX)
}

fn validate_content(content: &str) -> Result<String, FieldError> {
    validate_text("content", "Content", content, CONTENT_MAX)
}

fn validate_new_note(request: &CreateNoteRequest) -> Result<NewNote, ApiError> {
    match (validate_title(&request.title), validate_content(&request.content)) {
        (Ok(title), Ok(content)) => Ok(NewNote { title, content }),
        (title, content) => Err(ApiError::Validation(
            [title.err(), content.err()].into_iter().flatten().collect(),
        )),
    }
}

fn validate_changes(request: &UpdateNoteRequest) -> Result<NoteChanges, ApiError> {
    let title = request.title.as_deref().map(validate_title).transpose();
    let content = request.content.as_deref().map(validate_content).transpose();
    match (title, content) {
        (Ok(title), Ok(content)) => Ok(NoteChanges {
            title,
            content,
            is_archived: request.is_archived,
        }),
        (title, content) => Err(ApiError::Validation(
            [title.err(), content.err()].into_iter().flatten().collect(),
        )),
    }
}

/// Resolved paging: `(page, limit)` with `page >= 1` and `limit` in `1..=100`.
fn paging(query: &ListNotesQuery) -> (u64, u64) {
    let parse = |value: Option<&String>| value.and_then(|v| v.trim().parse::<i64>().ok());
    let page = parse(query.page.as_ref())
        .map_or(1, |page| u64::try_from(page.max(1)).unwrap_or(1));
    let limit = parse(query.limit.as_ref()).map_or(DEFAULT_LIMIT, |limit| {
        u64::try_from(limit.clamp(1, MAX_LIMIT)).unwrap_or(DEFAULT_LIMIT)
    });
    (page, limit)
}

fn archived_filter(query: &ListNotesQuery) -> Option<bool> {
    match query.archived.as_deref().map(str::trim) {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

fn pagination(page: u64, limit: u64, total: u64) -> Pagination {
    let total_pages = total.div_ceil(limit);
    Pagination {
        current_page: page,
        total_pages,
        total_notes: total,
        has_next: page < total_pages,
        has_prev: page > 1,
    }
}

fn parse_note_id(note_id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(note_id).map_err(|_| ApiError::NotFound(NOT_FOUND))
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created", body = NoteResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
#[instrument(skip(auth_state, notes, headers, payload))]
pub async fn create_note(
    auth_state: Extension<Arc<AuthState>>,
    notes: Extension<Arc<dyn NoteStore>>,
    headers: HeaderMap,
    payload: Option<Json<CreateNoteRequest>>,
) -> Result<(StatusCode, Json<NoteResponse>), ApiError> {
    let principal = require_auth(&headers, &auth_state).await?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let new_note = validate_new_note(&request)?;
    let note = notes.create_note(principal.user_id, &new_note).await?;
    info!(user_id = %principal.user_id, note_id = %note.id, "note created");

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            message: "Note created successfully".to_string(),
            note: note.into(),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/notes",
    params(ListNotesQuery),
    responses(
        (status = 200, description = "Page of notes, newest first", body = NoteListResponse),
        (status = 401, description = "Authentication required", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
#[instrument(skip(auth_state, notes, headers, query))]
pub async fn list_notes(
    auth_state: Extension<Arc<AuthState>>,
    notes: Extension<Arc<dyn NoteStore>>,
    headers: HeaderMap,
    query: Option<Query<ListNotesQuery>>,
) -> Result<Json<NoteListResponse>, ApiError> {
    let principal = require_auth(&headers, &auth_state).await?;
    let Query(query) = query.unwrap_or_default();

    let (page, limit) = paging(&query);
    let store_query = NoteQuery {
        offset: (page - 1).saturating_mul(limit),
        limit,
        terms: query.search.as_deref().map(search_terms).unwrap_or_default(),
        archived: archived_filter(&query),
    };
    let result = notes.list_notes(principal.user_id, &store_query).await?;

    Ok(Json(NoteListResponse {
        notes: result.notes.into_iter().map(NoteView::from).collect(),
        pagination: pagination(page, limit, result.total),
    }))
}

#[utoipa::path(
    get,
    path = "/notes/{noteId}",
    params(("noteId" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "The note", body = NoteDetailResponse),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 404, description = "Note not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
#[instrument(skip(auth_state, notes, headers))]
pub async fn get_note(
    auth_state: Extension<Arc<AuthState>>,
    notes: Extension<Arc<dyn NoteStore>>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
) -> Result<Json<NoteDetailResponse>, ApiError> {
    let principal = require_auth(&headers, &auth_state).await?;
    let note_id = parse_note_id(&note_id)?;

    let note = notes
        .get_note(principal.user_id, note_id)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    Ok(Json(NoteDetailResponse { note: note.into() }))
}

#[utoipa::path(
    put,
    path = "/notes/{noteId}",
    params(("noteId" = String, Path, description = "Note id")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated", body = NoteResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 404, description = "Note not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
#[instrument(skip(auth_state, notes, headers, payload))]
pub async fn update_note(
    auth_state: Extension<Arc<AuthState>>,
    notes: Extension<Arc<dyn NoteStore>>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
    payload: Option<Json<UpdateNoteRequest>>,
) -> Result<Json<NoteResponse>, ApiError> {
    let principal = require_auth(&headers, &auth_state).await?;
    let note_id = parse_note_id(&note_id)?;
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let changes = validate_changes(&request)?;
    let note = notes
        .update_note(principal.user_id, note_id, &changes)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    Ok(Json(NoteResponse {
        message: "Note updated successfully".to_string(),
        note: note.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/notes/{noteId}",
    params(("noteId" = String, Path, description = "Note id")),
    responses(
        (status = 200, description = "Note deleted", body = DeleteNoteResponse),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 404, description = "Note not found", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
#[instrument(skip(auth_state, notes, headers))]
pub async fn delete_note(
    auth_state: Extension<Arc<AuthState>>,
    notes: Extension<Arc<dyn NoteStore>>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
) -> Result<Json<DeleteNoteResponse>, ApiError> {
    let principal = require_auth(&headers, &auth_state).await?;
    let note_id = parse_note_id(&note_id)?;

    let note = notes
        .delete_note(principal.user_id, note_id)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    info!(user_id = %principal.user_id, note_id = %note.id, "note deleted");

    Ok(Json(DeleteNoteResponse {
        message: "Note deleted successfully".to_string(),
        deleted_note: DeletedNote {
            id: note.id,
            title: note.title,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_of_101_chars_names_title() {
        let request = CreateNoteRequest {
            title: "t".repeat(101),
            content: "body".to_string(),
        };
        match validate_new_note(&request) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "title");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn blank_fields_are_required() {
        let request = CreateNoteRequest {
            title: "   ".to_string(),
            content: String::new(),
        };
        match validate_new_note(&request) {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "content"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn limits_are_inclusive() {
        let request = CreateNoteRequest {
            title: format!("  {}  ", "t".repeat(100)),
            content: "c".repeat(10_000),
        };
        let note = validate_new_note(&request);
        assert_eq!(note.map(|n| n.title.len()).ok(), Some(100));
    }

    #[test]
    fn changes_validate_only_present_fields() {
        let changes = validate_changes(&UpdateNoteRequest {
            is_archived: Some(true),
            ..UpdateNoteRequest::default()
        });
        assert!(matches!(
            changes,
            Ok(NoteChanges {
                title: None,
                content: None,
                is_archived: Some(true)
            })
        ));

        let changes = validate_changes(&UpdateNoteRequest {
            content: Some("c".repeat(10_001)),
            ..UpdateNoteRequest::default()
        });
        assert!(matches!(changes, Err(ApiError::Validation(ref e)) if e[0].field == "content"));
    }

    #[test]
    fn paging_defaults_and_clamps() {
        let query = |page: Option<&str>, limit: Option<&str>| ListNotesQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
            ..ListNotesQuery::default()
        };
        assert_eq!(paging(&query(None, None)), (1, 10));
        assert_eq!(paging(&query(Some("0"), Some("500"))), (1, 100));
        assert_eq!(paging(&query(Some("-3"), Some("0"))), (1, 1));
        assert_eq!(paging(&query(Some("abc"), Some("x"))), (1, 10));
        assert_eq!(paging(&query(Some("3"), Some("25"))), (3, 25));
    }

    #[test]
    fn pagination_flags() {
        assert_eq!(
            pagination(1, 10, 0),
            Pagination {
                current_page: 1,
                total_pages: 0,
                total_notes: 0,
                has_next: false,
                has_prev: false,
            }
        );
        let page = pagination(2, 10, 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);
        assert!(!pagination(3, 10, 25).has_next);
    }

    #[test]
    fn archived_filter_parses_booleans_only() {
        let query = |value: &str| ListNotesQuery {
            archived: Some(value.to_string()),
            ..ListNotesQuery::default()
        };
        assert_eq!(archived_filter(&query("true")), Some(true));
        assert_eq!(archived_filter(&query("false")), Some(false));
        assert_eq!(archived_filter(&query("maybe")), None);
        assert_eq!(archived_filter(&ListNotesQuery::default()), None);
    }

    #[test]
    fn malformed_note_id_is_not_found() {
        assert!(matches!(
            parse_note_id("not-a-uuid"),
            Err(ApiError::NotFound(NOT_FOUND))
        ));
    }
}
