//! In-memory adapters and fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::{DatabaseError, ErrorKind};
use uuid::Uuid;

use crate::models::user::User;
use crate::notification::{NotificationError, VerificationNotifier};
use crate::repository::UserRepository;
use crate::storage::{check_path, object_name, public_url, ObjectStorage, StorageError};

pub const STORAGE_URL: &str = "http://localhost:3000/storage";

pub fn user(name: &str, email: &str, verified: bool) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        email_verified_at: verified.then_some(now),
        profile_photo_path: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(b"\0\0\0\rIHDR");
    bytes
}

pub fn jpeg_bytes() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(b"\0\x10JFIF\0");
    bytes
}

/// How the next `save` should fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaveFailure {
    Unavailable,
    UniqueEmail,
}

/// What Postgres reports when the `users.email` unique index rejects a row.
#[derive(Debug)]
struct UniqueEmailViolation;

impl std::fmt::Display for UniqueEmailViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("duplicate key value violates unique constraint \"users_email_key\"")
    }
}

impl std::error::Error for UniqueEmailViolation {}

impl DatabaseError for UniqueEmailViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint \"users_email_key\""
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<String, Uuid>>,
    next_save_failure: Mutex<Option<SaveFailure>>,
}

impl InMemoryUserRepository {
    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn add_session(&self, token: &str, user_id: Uuid) {
        self.sessions
            .lock()
            .unwrap()
            .insert(token.to_string(), user_id);
    }

    pub fn fail_next_save(&self, failure: SaveFailure) {
        *self.next_save_failure.lock().unwrap() = Some(failure);
    }

    pub fn get(&self, id: Uuid) -> User {
        self.users.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_session_token(&self, token: &str) -> Result<Option<User>, sqlx::Error> {
        let user_id = self.sessions.lock().unwrap().get(token).copied();
        Ok(user_id.and_then(|id| self.users.lock().unwrap().get(&id).cloned()))
    }

    async fn email_taken(&self, email: &str, ignore: Uuid) -> Result<bool, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .any(|user| user.email == email && user.id != ignore))
    }

    async fn save(&self, user: &User) -> Result<User, sqlx::Error> {
        match self.next_save_failure.lock().unwrap().take() {
            Some(SaveFailure::Unavailable) => return Err(sqlx::Error::PoolTimedOut),
            Some(SaveFailure::UniqueEmail) => {
                return Err(sqlx::Error::Database(Box::new(UniqueEmailViolation)))
            }
            None => {}
        }

        let mut users = self.users.lock().unwrap();
        let stored = users.get_mut(&user.id).ok_or(sqlx::Error::RowNotFound)?;

        *stored = User {
            updated_at: Utc::now(),
            ..user.clone()
        };
        Ok(stored.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, (Vec<u8>, DateTime<Utc>)>>,
}

impl InMemoryStorage {
    pub fn insert_at(&self, path: &str, bytes: Vec<u8>, modified: DateTime<Utc>) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (bytes, modified));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn put(&self, dir: &str, bytes: Vec<u8>, extension: &str) -> Result<String, StorageError> {
        let path = format!("{dir}/{}", object_name(extension));
        check_path(&path)?;
        self.insert_at(&path, bytes, Utc::now());
        Ok(path)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        check_path(path)?;
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        check_path(path)?;
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, StorageError> {
        check_path(path)?;
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        check_path(dir)?;
        let prefix = format!("{dir}/");
        Ok(self
            .paths()
            .into_iter()
            .filter(|path| path.starts_with(&prefix))
            .collect())
    }

    fn url(&self, path: &str) -> String {
        public_url(STORAGE_URL, path)
    }
}

/// Remembers who was sent a verification notice.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Uuid>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Uuid> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerificationNotifier for RecordingNotifier {
    async fn send_verification(&self, user: &User) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(user.id);
        Ok(())
    }
}

/// Adapters wired together the way `main` wires the real ones.
#[derive(Default)]
pub struct Fixture {
    pub users: Arc<InMemoryUserRepository>,
    pub storage: Arc<InMemoryStorage>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }
}
