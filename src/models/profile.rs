use serde::Serialize;

use crate::models::user::User;

pub const PROFILE_UPDATED: &str = "profile-updated";
pub const VERIFICATION_LINK_SENT: &str = "verification-link-sent";

/// A photo file as received in a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum PhotoSource {
    Upload(UploadedPhoto),
    /// Id returned by an earlier temporary upload.
    Pending(String),
}

#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub name: String,
    pub email: String,
    pub photo: Option<PhotoSource>,
}

/// Current state of the form, as shown when it is mounted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub photo_url: Option<String>,
}

impl ProfileForm {
    pub fn new(user: &User, photo_url: Option<String>) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            email_verified: user.has_verified_email(),
            photo_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdated {
    pub event: &'static str,
    pub name: String,
    pub profile: ProfileForm,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingUpload {
    pub upload_id: String,
    pub temporary_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    AlreadyVerified { redirect_to: String },
    Sent,
}
