use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::models::profile::{
    PendingUpload, PhotoSource, ProfileForm, ProfileInput, ProfileUpdated, UploadedPhoto,
    VerificationOutcome, PROFILE_UPDATED,
};
use crate::models::user::User;
use crate::notification::VerificationNotifier;
use crate::repository::{is_unique_violation, UserRepository};
use crate::storage::{ObjectStorage, StorageError, PENDING_UPLOAD_DIR, PROFILE_PHOTO_DIR};
use crate::validation::{self, FieldErrors, EMAIL_TAKEN, PHOTO_UPLOAD_FAILED};

/// A validated photo waiting to be written under `profile-photos/`.
struct StagedPhoto {
    bytes: Vec<u8>,
    extension: &'static str,
    pending_path: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn ObjectStorage>,
    notifier: Arc<dyn VerificationNotifier>,
    dashboard_path: String,
    upload_ttl: Duration,
}

impl ProfileService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<dyn VerificationNotifier>,
        dashboard_path: impl Into<String>,
        upload_ttl: Duration,
    ) -> Self {
        Self {
            users,
            storage,
            notifier,
            dashboard_path: dashboard_path.into(),
            upload_ttl,
        }
    }

    pub fn mount(&self, user: &User) -> ProfileForm {
        let photo_url = user
            .profile_photo_path
            .as_deref()
            .map(|path| self.storage.url(path));

        ProfileForm::new(user, photo_url)
    }

    /// Validates and stores a photo ahead of the form submit. Pending
    /// uploads live under the uploader's own prefix.
    pub async fn upload_pending_photo(
        &self,
        user: &User,
        photo: UploadedPhoto,
    ) -> AppResult<PendingUpload> {
        let mut errors = FieldErrors::default();
        let extension = validation::validate_photo(&photo, &mut errors);
        let Some(extension) = extension else {
            return Err(AppError::Validation(errors));
        };

        self.prune_expired_uploads().await;

        let path = self
            .storage
            .put(&pending_dir(user), photo.bytes, extension)
            .await?;
        let upload_id = path
            .rsplit('/')
            .next()
            .unwrap_or(path.as_str())
            .to_string();

        Ok(PendingUpload {
            upload_id,
            temporary_url: self.storage.url(&path),
        })
    }

    pub async fn update_profile(&self, user: &User, input: ProfileInput) -> AppResult<ProfileUpdated> {
        let name = input.name.trim().to_string();
        let email = input.email.trim().to_string();
        let mut errors = FieldErrors::default();

        validation::validate_name(&name, &mut errors);
        if validation::validate_email(&email, &mut errors)
            && self.users.email_taken(&email, user.id).await?
        {
            errors.add("email", EMAIL_TAKEN);
        }

        let photo = match input.photo {
            None => None,
            Some(PhotoSource::Upload(photo)) => {
                validation::validate_photo(&photo, &mut errors).map(|extension| StagedPhoto {
                    bytes: photo.bytes,
                    extension,
                    pending_path: None,
                })
            }
            Some(PhotoSource::Pending(upload_id)) => {
                self.load_pending(user, &upload_id, &mut errors).await?
            }
        };

        errors.into_result()?;

        let mut updated = user.clone();
        let mut stored_path = None;

        if let Some(photo) = photo {
            let path = self
                .storage
                .put(PROFILE_PHOTO_DIR, photo.bytes, photo.extension)
                .await?;
            updated.profile_photo_path = Some(path.clone());
            stored_path = Some((path, photo.pending_path));
        }

        let email_changed = updated.fill(name, email);

        let saved = match self.users.save(&updated).await {
            Ok(saved) => saved,
            Err(err) => {
                if let Some((path, _)) = &stored_path {
                    self.discard(path).await;
                }

                if is_unique_violation(&err) {
                    let mut errors = FieldErrors::default();
                    errors.add("email", EMAIL_TAKEN);
                    return Err(AppError::Validation(errors));
                }
                return Err(err.into());
            }
        };

        if let Some((_, pending_path)) = &stored_path {
            if let Some(old) = &user.profile_photo_path {
                self.discard(old).await;
            }
            if let Some(pending) = pending_path {
                self.discard(pending).await;
            }
        }

        info!(
            user_id = %saved.id,
            email_changed,
            photo_replaced = stored_path.is_some(),
            "profile updated"
        );

        Ok(ProfileUpdated {
            event: PROFILE_UPDATED,
            name: saved.name.clone(),
            profile: self.mount(&saved),
        })
    }

    pub async fn send_verification(
        &self,
        user: &User,
        intended: Option<&str>,
    ) -> AppResult<VerificationOutcome> {
        if user.has_verified_email() {
            let redirect_to = intended
                .filter(|path| is_local_path(path))
                .unwrap_or(self.dashboard_path.as_str())
                .to_string();
            return Ok(VerificationOutcome::AlreadyVerified { redirect_to });
        }

        self.notifier.send_verification(user).await?;
        info!(user_id = %user.id, "verification notice sent");

        Ok(VerificationOutcome::Sent)
    }

    async fn load_pending(
        &self,
        user: &User,
        upload_id: &str,
        errors: &mut FieldErrors,
    ) -> AppResult<Option<StagedPhoto>> {
        if upload_id.contains('/') {
            errors.add("photo", PHOTO_UPLOAD_FAILED);
            return Ok(None);
        }
        let path = format!("{}/{upload_id}", pending_dir(user));

        let modified = match self.storage.last_modified(&path).await {
            Ok(modified) => modified,
            Err(StorageError::NotFound(_)) | Err(StorageError::InvalidPath(_)) => {
                errors.add("photo", PHOTO_UPLOAD_FAILED);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if Utc::now() - modified > self.upload_ttl {
            self.discard(&path).await;
            errors.add("photo", PHOTO_UPLOAD_FAILED);
            return Ok(None);
        }

        let photo = UploadedPhoto {
            file_name: Some(upload_id.to_string()),
            content_type: None,
            bytes: self.storage.get(&path).await?,
        };

        Ok(validation::validate_photo(&photo, errors).map(|extension| StagedPhoto {
            bytes: photo.bytes,
            extension,
            pending_path: Some(path),
        }))
    }

    /// Drops every pending upload older than the TTL, whoever made it.
    async fn prune_expired_uploads(&self) {
        let paths = match self.storage.list(PENDING_UPLOAD_DIR).await {
            Ok(paths) => paths,
            Err(err) => {
                warn!(error = %err, "failed to list pending uploads");
                return;
            }
        };

        let cutoff = Utc::now() - self.upload_ttl;
        for path in paths {
            match self.storage.last_modified(&path).await {
                Ok(modified) if modified < cutoff => self.discard(&path).await,
                Ok(_) | Err(StorageError::NotFound(_)) => {}
                Err(err) => warn!(path = %path, error = %err, "failed to inspect pending upload"),
            }
        }
    }

    /// Removes an object the record no longer points at. Failure leaves an
    /// orphan behind but does not undo the saved record.
    async fn discard(&self, path: &str) {
        if let Err(err) = self.storage.delete(path).await {
            warn!(path = %path, error = %err, "failed to delete stored object");
        }
    }
}

fn pending_dir(user: &User) -> String {
    format!("{PENDING_UPLOAD_DIR}/{}", user.id)
}

fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
