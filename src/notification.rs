use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::user::User;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("failed to deliver verification notice: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait VerificationNotifier: Send + Sync {
    async fn send_verification(&self, user: &User) -> Result<(), NotificationError>;
}

/// Link the verification mail points at. The hash ties it to the address
/// it was issued for, so it stops working once the email changes.
pub fn verification_link(app_url: &str, user: &User) -> String {
    let hash = hex::encode(Sha256::digest(user.email.as_bytes()));
    format!(
        "{}/verify-email/{}/{}",
        app_url.trim_end_matches('/'),
        user.id,
        hash
    )
}

/// Writes the verification notice to the log instead of a mailbox.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    app_url: String,
}

impl LogNotifier {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into(),
        }
    }
}

#[async_trait]
impl VerificationNotifier for LogNotifier {
    async fn send_verification(&self, user: &User) -> Result<(), NotificationError> {
        let link = verification_link(&self.app_url, user);
        tracing::info!(user_id = %user.id, email = %user.email, link = %link, "sending email verification notice");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::user;

    #[test]
    fn link_contains_user_id_and_email_hash() {
        let user = user("Sari", "sari@example.com", false);
        let link = verification_link("http://localhost:3000/", &user);

        assert!(link.starts_with(&format!("http://localhost:3000/verify-email/{}/", user.id)));
        let hash = link.rsplit('/').next().unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hex::encode(Sha256::digest(b"sari@example.com")));
    }

    #[test]
    fn link_changes_with_email() {
        let mut user = user("Sari", "sari@example.com", false);
        let before = verification_link("http://localhost", &user);
        user.email = "sari@work.example".to_string();

        assert_ne!(before, verification_link("http://localhost", &user));
    }

    #[tokio::test]
    async fn log_notifier_succeeds() {
        let notifier = LogNotifier::new("http://localhost");
        let user = user("Sari", "sari@example.com", false);

        assert!(notifier.send_verification(&user).await.is_ok());
    }
}
