use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub profile_photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_verified_email(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Applies a validated name and email. A changed email drops the
    /// verification timestamp; returns whether the email changed.
    pub fn fill(&mut self, name: String, email: String) -> bool {
        let email_changed = self.email != email;
        self.name = name;
        self.email = email;

        if email_changed {
            self.email_verified_at = None;
        }

        email_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verified_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Rani".to_string(),
            email: "rani@example.com".to_string(),
            email_verified_at: Some(now),
            profile_photo_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fill_with_new_email_clears_verification() {
        let mut user = verified_user();

        assert!(user.fill("Rani".to_string(), "rani@work.example".to_string()));
        assert_eq!(user.email, "rani@work.example");
        assert!(!user.has_verified_email());
    }

    #[test]
    fn fill_with_same_email_keeps_verification() {
        let mut user = verified_user();

        assert!(!user.fill("Rani Putri".to_string(), "rani@example.com".to_string()));
        assert_eq!(user.name, "Rani Putri");
        assert!(user.has_verified_email());
    }
}
