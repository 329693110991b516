use async_trait::async_trait;
use uuid::Uuid;

use crate::database::Database;
use crate::models::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_session_token(&self, token: &str) -> Result<Option<User>, sqlx::Error>;

    /// Whether a user other than `ignore` already owns `email`.
    async fn email_taken(&self, email: &str, ignore: Uuid) -> Result<bool, sqlx::Error>;

    /// Persists name, email, verification and photo path of an existing user.
    async fn save(&self, user: &User) -> Result<User, sqlx::Error>;
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    db: Database,
}

impl PgUserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_session_token(&self, token: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u
             JOIN user_sessions s ON s.user_id = u.id
             WHERE s.token = $1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
    }

    async fn email_taken(&self, email: &str, ignore: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND id != $2)",
        )
        .bind(email)
        .bind(ignore)
        .fetch_one(&self.db)
        .await
    }

    async fn save(&self, user: &User) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET
             name = $1,
             email = $2,
             email_verified_at = $3,
             profile_photo_path = $4,
             updated_at = NOW()
             WHERE id = $5
             RETURNING *",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.email_verified_at)
        .bind(&user.profile_photo_path)
        .bind(user.id)
        .fetch_one(&self.db)
        .await
    }
}
