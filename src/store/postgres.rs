use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{
    Challenge, ConsumedChallenge, NewNote, NewUser, Note, NoteChanges, NotePage, NoteQuery,
    NoteStore, SignupRecord, User, UserStore,
};

const USER_COLUMNS: &str = "id, email, username, date_of_birth, otp_code, otp_expires_at, \
     is_email_verified, last_login, created_at, updated_at";

const NOTE_COLUMNS: &str = "id, user_id, title, content, is_archived, created_at, updated_at";

/// Postgres-backed store (schema in `db/sql/01_hdnotes.sql`).
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let code: Option<String> = row.try_get("otp_code")?;
    let expires_at: Option<DateTime<Utc>> = row.try_get("otp_expires_at")?;
    let challenge = match (code, expires_at) {
        (Some(code), Some(expires_at)) => Some(Challenge { code, expires_at }),
        _ => None,
    };

    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        date_of_birth: row.try_get("date_of_birth")?,
        challenge,
        is_email_verified: row.try_get("is_email_verified")?,
        last_login: row.try_get("last_login")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn note_from_row(row: &PgRow) -> Result<Note> {
    Ok(Note {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        is_archived: row.try_get("is_archived")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserStore for PgStore {
    async fn upsert_signup_challenge(
        &self,
        new_user: &NewUser,
        challenge: &Challenge,
    ) -> Result<SignupRecord> {
        // `xmax = 0` only holds for freshly inserted tuples.
        let query = format!(
            r"
            INSERT INTO users (email, username, date_of_birth, otp_code, otp_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
                SET otp_code = EXCLUDED.otp_code,
                    otp_expires_at = EXCLUDED.otp_expires_at,
                    updated_at = NOW()
            RETURNING {USER_COLUMNS}, (xmax = 0) AS inserted
            "
        );
        let row = sqlx::query(&query)
            .bind(&new_user.email)
            .bind(&new_user.username)
            .bind(new_user.date_of_birth)
            .bind(&challenge.code)
            .bind(challenge.expires_at)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .context("failed to upsert signup challenge")?;

        Ok(SignupRecord {
            user: user_from_row(&row)?,
            created: row.try_get("inserted")?,
        })
    }

    async fn set_challenge_by_email(
        &self,
        email: &str,
        challenge: &Challenge,
    ) -> Result<Option<User>> {
        let query = format!(
            r"
            UPDATE users
            SET otp_code = $2,
                otp_expires_at = $3,
                updated_at = NOW()
            WHERE email = $1
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(email)
            .bind(&challenge.code)
            .bind(challenge.expires_at)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .context("failed to store login challenge")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn consume_challenge(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ConsumedChallenge>> {
        // The row lock in `prev` serializes concurrent consumers; only the
        // first one still sees the matching code.
        let query = format!(
            r"
            WITH prev AS (
                SELECT id, is_email_verified
                FROM users
                WHERE id = $1
                FOR UPDATE
            )
            UPDATE users u
            SET otp_code = NULL,
                otp_expires_at = NULL,
                is_email_verified = TRUE,
                last_login = $3,
                updated_at = NOW()
            FROM prev
            WHERE u.id = prev.id
              AND u.otp_code = $2
              AND u.otp_expires_at > $3
            RETURNING {}, prev.is_email_verified AS was_verified
            ",
            USER_COLUMNS
                .split(", ")
                .map(|column| format!("u.{column}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(code)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .context("failed to consume challenge")?;

        match row {
            Some(row) => Ok(Some(ConsumedChallenge {
                user: user_from_row(&row)?,
                was_verified: row.try_get("was_verified")?,
            })),
            None => Ok(None),
        }
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn create_note(&self, owner: Uuid, note: &NewNote) -> Result<Note> {
        let query = format!(
            r"
            INSERT INTO notes (user_id, title, content)
            VALUES ($1, $2, $3)
            RETURNING {NOTE_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(owner)
            .bind(&note.title)
            .bind(&note.content)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .context("failed to insert note")?;

        note_from_row(&row)
    }

    async fn list_notes(&self, owner: Uuid, query: &NoteQuery) -> Result<NotePage> {
        // Every term must occur in the title or the content.
        let filter = r"
            WHERE user_id = $1
              AND ($2::boolean IS NULL OR is_archived = $2)
              AND NOT EXISTS (
                  SELECT 1 FROM unnest($3::text[]) AS term
                  WHERE position(term IN lower(title || ' ' || content)) = 0
              )
        ";
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

        let select = format!(
            "SELECT {NOTE_COLUMNS} FROM notes {filter} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query(&select)
            .bind(owner)
            .bind(query.archived)
            .bind(&query.terms)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &select))
            .await
            .context("failed to list notes")?;

        let count = format!("SELECT COUNT(*) AS total FROM notes {filter}");
        let total: i64 = sqlx::query(&count)
            .bind(owner)
            .bind(query.archived)
            .bind(&query.terms)
            .fetch_one(&self.pool)
            .instrument(query_span("SELECT", &count))
            .await
            .context("failed to count notes")?
            .try_get("total")?;

        Ok(NotePage {
            notes: rows.iter().map(note_from_row).collect::<Result<_>>()?,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn get_note(&self, owner: Uuid, note_id: Uuid) -> Result<Option<Note>> {
        let query = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND user_id = $2");
        let row = sqlx::query(&query)
            .bind(note_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to fetch note")?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn update_note(
        &self,
        owner: Uuid,
        note_id: Uuid,
        changes: &NoteChanges,
    ) -> Result<Option<Note>> {
        let query = format!(
            r"
            UPDATE notes
            SET title = COALESCE($3, title),
                content = COALESCE($4, content),
                is_archived = COALESCE($5, is_archived),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTE_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(note_id)
            .bind(owner)
            .bind(changes.title.as_deref())
            .bind(changes.content.as_deref())
            .bind(changes.is_archived)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .context("failed to update note")?;

        row.as_ref().map(note_from_row).transpose()
    }

    async fn delete_note(&self, owner: Uuid, note_id: Uuid) -> Result<Option<Note>> {
        let query =
            format!("DELETE FROM notes WHERE id = $1 AND user_id = $2 RETURNING {NOTE_COLUMNS}");
        let row = sqlx::query(&query)
            .bind(note_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .instrument(query_span("DELETE", &query))
            .await
            .context("failed to delete note")?;

        row.as_ref().map(note_from_row).transpose()
    }
}
