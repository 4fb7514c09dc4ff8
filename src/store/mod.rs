//! Persistence for users (with their pending OTP challenge) and notes.
//!
//! Every mutation of challenge state is a single conditional write so that
//! concurrent issuance and verification for the same user cannot lose updates.
//! Implementations must never emulate these operations with a separate read
//! followed by a write.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Pending one-time passcode bound to a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub date_of_birth: NaiveDate,
    pub challenge: Option<Challenge>,
    pub is_email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields required to create a user on signup.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub date_of_birth: NaiveDate,
}

/// Result of a signup challenge write.
#[derive(Debug)]
pub struct SignupRecord {
    pub user: User,
    pub created: bool,
}

/// Result of a successful challenge consumption.
#[derive(Debug)]
pub struct ConsumedChallenge {
    pub user: User,
    /// Whether the email had already been verified before this consumption.
    pub was_verified: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user with `challenge`, or, if the email already exists,
    /// overwrite the existing user's challenge. Profile fields of an existing
    /// user are left untouched.
    async fn upsert_signup_challenge(
        &self,
        new_user: &NewUser,
        challenge: &Challenge,
    ) -> Result<SignupRecord>;

    /// Overwrite the challenge of the user owning `email`.
    /// Returns `None` when no such user exists.
    async fn set_challenge_by_email(
        &self,
        email: &str,
        challenge: &Challenge,
    ) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>>;

    /// Clear the challenge iff it still equals `code` and expires after `now`,
    /// recording `now` as the last login and marking the email verified.
    /// Returns `None` when the conditional update matched nothing.
    async fn consume_challenge(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ConsumedChallenge>>;

    /// Liveness check used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct NoteChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_archived: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct NoteQuery {
    pub offset: u64,
    pub limit: u64,
    /// Lower-cased terms; a note matches when every term occurs in its title or content.
    pub terms: Vec<String>,
    pub archived: Option<bool>,
}

#[derive(Debug)]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub total: u64,
}

/// Owner-scoped note persistence. Every call takes the owner id, and a note
/// owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn create_note(&self, owner: Uuid, note: &NewNote) -> Result<Note>;

    async fn list_notes(&self, owner: Uuid, query: &NoteQuery) -> Result<NotePage>;

    async fn get_note(&self, owner: Uuid, note_id: Uuid) -> Result<Option<Note>>;

    async fn update_note(
        &self,
        owner: Uuid,
        note_id: Uuid,
        changes: &NoteChanges,
    ) -> Result<Option<Note>>;

    async fn delete_note(&self, owner: Uuid, note_id: Uuid) -> Result<Option<Note>>;
}

/// Split a free-text search into lower-cased terms.
#[must_use]
pub fn search_terms(search: &str) -> Vec<String> {
    search
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}
