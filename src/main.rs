use std::sync::Arc;

use axum::http::StatusCode;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use profile_settings::config::Settings;
use profile_settings::notification::LogNotifier;
use profile_settings::repository::PgUserRepository;
use profile_settings::routes::{self, AppState};
use profile_settings::service::ProfileService;
use profile_settings::storage::LocalDiskStorage;
use profile_settings::{database, telemetry};

async fn handle_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    telemetry::init();

    let pool = database::create_database_connection(&settings).await?;
    database::run_migrations(&pool).await?;

    let users = Arc::new(PgUserRepository::new(pool));
    let storage = Arc::new(LocalDiskStorage::new(
        settings.storage_root.clone(),
        settings.storage_public_url.clone(),
    ));
    let notifier = Arc::new(LogNotifier::new(settings.app_url.clone()));

    let profiles = ProfileService::new(
        users.clone(),
        storage,
        notifier,
        settings.dashboard_path.clone(),
        settings.upload_ttl,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(AppState { users, profiles })
        .nest_service("/storage", ServeDir::new(&settings.storage_root))
        .fallback(handle_404)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "server running");

    axum::serve(listener, app).await?;
    Ok(())
}
