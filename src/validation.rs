use std::collections::BTreeMap;

use image::ImageFormat;
use serde::Serialize;
use validator::ValidateEmail;

use crate::models::profile::UploadedPhoto;

pub const MAX_STRING_LENGTH: usize = 255;
pub const MAX_PHOTO_KILOBYTES: usize = 1024;
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const EMAIL_TAKEN: &str = "The email has already been taken.";
pub const PHOTO_UPLOAD_FAILED: &str = "The photo failed to upload.";

/// Messages collected per form field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// First message, followed by how many more there are.
    pub fn summary(&self) -> String {
        let Some(first) = self.0.values().flatten().next() else {
            return "The given data was invalid.".to_string();
        };

        match self.count() - 1 {
            0 => first.clone(),
            1 => format!("{first} (and 1 more error)"),
            more => format!("{first} (and {more} more errors)"),
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn too_long(field: &str) -> String {
    format!("The {field} field must not be greater than {MAX_STRING_LENGTH} characters.")
}

pub fn validate_name(name: &str, errors: &mut FieldErrors) {
    if name.is_empty() {
        errors.add("name", "The name field is required.");
        return;
    }

    if name.chars().count() > MAX_STRING_LENGTH {
        errors.add("name", too_long("name"));
    }
}

/// Runs the local email rules. Returns true when they all pass, so the
/// caller can go on to the uniqueness lookup.
pub fn validate_email(email: &str, errors: &mut FieldErrors) -> bool {
    if email.is_empty() {
        errors.add("email", "The email field is required.");
        return false;
    }

    let mut valid = true;

    if email != email.to_lowercase() {
        errors.add("email", "The email field must be lowercase.");
        valid = false;
    }

    if !email.validate_email() {
        errors.add("email", "The email field must be a valid email address.");
        valid = false;
    }

    if email.chars().count() > MAX_STRING_LENGTH {
        errors.add("email", too_long("email"));
        valid = false;
    }

    valid
}

/// Guesses the file extension from the leading bytes of an image.
pub fn sniff_image_extension(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpg"),
        _ => None,
    }
}

/// Checks type and size of a photo. Returns the extension to store it
/// under when both pass. The type comes from the file content, never the
/// client supplied name or content type.
pub fn validate_photo(photo: &UploadedPhoto, errors: &mut FieldErrors) -> Option<&'static str> {
    if photo.bytes.is_empty() {
        errors.add("photo", PHOTO_UPLOAD_FAILED);
        return None;
    }

    let extension = sniff_image_extension(&photo.bytes)
        .filter(|extension| PHOTO_EXTENSIONS.contains(extension));

    if extension.is_none() {
        errors.add(
            "photo",
            format!(
                "The photo field must be a file of type: {}.",
                PHOTO_EXTENSIONS.join(", ")
            ),
        );
    }

    let oversized = photo.bytes.len() > MAX_PHOTO_KILOBYTES * 1024;
    if oversized {
        errors.add(
            "photo",
            format!("The photo field must not be greater than {MAX_PHOTO_KILOBYTES} kilobytes."),
        );
    }

    if oversized {
        None
    } else {
        extension
    }
}
