use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::repository::UserRepository;
use crate::service::ProfileService;

pub mod profile;

/// Large enough that oversized photos reach validation instead of being cut off.
pub const MAX_UPLOAD_BYTES: usize = 12 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub profiles: ProfileService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route(
            "/profile",
            get(profile::show_profile).post(profile::update_profile),
        )
        .route("/profile/photo", post(profile::upload_photo))
        .route(
            "/profile/email/verification-notification",
            post(profile::send_verification),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
