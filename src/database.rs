use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::Settings;

pub type Database = PgPool;

pub async fn create_database_connection(settings: &Settings) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .connect(&settings.database_url)
        .await?;

    tracing::info!("database connected");
    Ok(pool)
}

pub async fn run_migrations(pool: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("migrations executed");
    Ok(())
}
