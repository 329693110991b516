use axum::{
    extract::{multipart::Field, Multipart, Query, State},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::CurrentUser;
use crate::errors::{AppError, AppResult};
use crate::models::profile::{
    PendingUpload, PhotoSource, ProfileForm, ProfileInput, ProfileUpdated, UploadedPhoto,
    VerificationOutcome, VERIFICATION_LINK_SENT,
};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct ResendVerificationParams {
    pub intended: Option<String>,
}

pub async fn show_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Json<ProfileForm> {
    Json(state.profiles.mount(&user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ProfileUpdated>> {
    let mut input = ProfileInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("name") => input.name = field.text().await?,
            Some("email") => input.email = field.text().await?,
            Some("photo") => {
                if let Some(photo) = read_photo(field).await? {
                    input.photo = Some(PhotoSource::Upload(photo));
                }
            }
            Some("photo_upload") => {
                let upload_id = field.text().await?;
                // a file sent alongside wins over an earlier upload
                if !upload_id.trim().is_empty() && input.photo.is_none() {
                    input.photo = Some(PhotoSource::Pending(upload_id.trim().to_string()));
                }
            }
            _ => {}
        }
    }

    let updated = state.profiles.update_profile(&user, input).await?;
    Ok(Json(updated))
}

pub async fn upload_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<PendingUpload>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("photo") {
            continue;
        }

        let Some(photo) = read_photo(field).await? else {
            break;
        };

        tracing::debug!(
            user_id = %user.id,
            file_name = photo.file_name.as_deref().unwrap_or(""),
            content_type = photo.content_type.as_deref().unwrap_or(""),
            size = photo.bytes.len(),
            "temporary photo upload"
        );
        let pending = state.profiles.upload_pending_photo(&user, photo).await?;
        return Ok(Json(pending));
    }

    Err(AppError::BadRequest("No photo was uploaded.".to_string()))
}

pub async fn send_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ResendVerificationParams>,
) -> AppResult<Response> {
    let outcome = state
        .profiles
        .send_verification(&user, params.intended.as_deref())
        .await?;

    let response = match outcome {
        VerificationOutcome::AlreadyVerified { redirect_to } => {
            Redirect::to(&redirect_to).into_response()
        }
        VerificationOutcome::Sent => Json(json!({
            "success": true,
            "status": VERIFICATION_LINK_SENT,
        }))
        .into_response(),
    };

    Ok(response)
}

/// Browsers send an empty, unnamed part when no file was picked.
async fn read_photo(field: Field<'_>) -> AppResult<Option<UploadedPhoto>> {
    let file_name = field
        .file_name()
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await?;

    if file_name.is_none() && bytes.is_empty() {
        return Ok(None);
    }

    Ok(Some(UploadedPhoto {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}
