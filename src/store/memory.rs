use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{
    Challenge, ConsumedChallenge, NewNote, NewUser, Note, NoteChanges, NotePage, NoteQuery,
    NoteStore, SignupRecord, User, UserStore,
};
use crate::clock::{Clock, SystemClock};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    // Insertion order doubles as a tie breaker for equal timestamps.
    notes: Vec<Note>,
}

/// In-memory store for tests and local experiments.
///
/// One mutex guards all state, so each trait call is atomic just like the
/// single-statement updates of the Postgres store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MemoryStore")
            .field("users", &inner.users.len())
            .field("notes", &inner.notes.len())
            .finish()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert_signup_challenge(
        &self,
        new_user: &NewUser,
        challenge: &Challenge,
    ) -> Result<SignupRecord> {
        let now = self.clock.now();
        let mut inner = self.lock();

        if let Some(id) = inner.emails.get(&new_user.email).copied() {
            if let Some(user) = inner.users.get_mut(&id) {
                user.challenge = Some(challenge.clone());
                user.updated_at = now;
                return Ok(SignupRecord {
                    user: user.clone(),
                    created: false,
                });
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            username: new_user.username.clone(),
            date_of_birth: new_user.date_of_birth,
            challenge: Some(challenge.clone()),
            is_email_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        inner.emails.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());

        Ok(SignupRecord {
            user,
            created: true,
        })
    }

    async fn set_challenge_by_email(
        &self,
        email: &str,
        challenge: &Challenge,
    ) -> Result<Option<User>> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let Some(id) = inner.emails.get(email).copied() else {
            return Ok(None);
        };
        Ok(inner.users.get_mut(&id).map(|user| {
            user.challenge = Some(challenge.clone());
            user.updated_at = now;
            user.clone()
        }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.lock();
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn consume_challenge(
        &self,
        user_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ConsumedChallenge>> {
        let mut inner = self.lock();
        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(None);
        };

        let matches = user
            .challenge
            .as_ref()
            .is_some_and(|challenge| challenge.code == code && challenge.expires_at > now);
        if !matches {
            return Ok(None);
        }

        let was_verified = user.is_email_verified;
        user.challenge = None;
        user.is_email_verified = true;
        user.last_login = Some(now);
        user.updated_at = now;

        Ok(Some(ConsumedChallenge {
            user: user.clone(),
            was_verified,
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn note_matches(note: &Note, query: &NoteQuery) -> bool {
    if let Some(archived) = query.archived {
        if note.is_archived != archived {
            return false;
        }
    }
    if query.terms.is_empty() {
        return true;
    }
    let haystack = format!("{} {}", note.title, note.content).to_lowercase();
    query.terms.iter().all(|term| haystack.contains(term.as_str()))
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn create_note(&self, owner: Uuid, note: &NewNote) -> Result<Note> {
        let now = self.clock.now();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: owner,
            title: note.title.clone(),
            content: note.content.clone(),
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        self.lock().notes.push(note.clone());
        Ok(note)
    }

    async fn list_notes(&self, owner: Uuid, query: &NoteQuery) -> Result<NotePage> {
        let inner = self.lock();
        let mut matching: Vec<&Note> = inner
            .notes
            .iter()
            .rev()
            .filter(|note| note.user_id == owner && note_matches(note, query))
            .collect();
        // Stable sort keeps newer insertions first among equal timestamps.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let notes = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(NotePage { notes, total })
    }

    async fn get_note(&self, owner: Uuid, note_id: Uuid) -> Result<Option<Note>> {
        Ok(self
            .lock()
            .notes
            .iter()
            .find(|note| note.id == note_id && note.user_id == owner)
            .cloned())
    }

    async fn update_note(
        &self,
        owner: Uuid,
        note_id: Uuid,
        changes: &NoteChanges,
    ) -> Result<Option<Note>> {
        let now = self.clock.now();
        let mut inner = self.lock();
        Ok(inner
            .notes
            .iter_mut()
            .find(|note| note.id == note_id && note.user_id == owner)
            .map(|note| {
                if let Some(title) = &changes.title {
                    note.title.clone_from(title);
                }
                if let Some(content) = &changes.content {
                    note.content.clone_from(content);
                }
                if let Some(is_archived) = changes.is_archived {
                    note.is_archived = is_archived;
                }
                note.updated_at = now;
                note.clone()
            }))
    }

    async fn delete_note(&self, owner: Uuid, note_id: Uuid) -> Result<Option<Note>> {
        let mut inner = self.lock();
        let position = inner
            .notes
            .iter()
            .position(|note| note.id == note_id && note.user_id == owner);
        Ok(position.map(|index| inner.notes.remove(index)))
    }
}
