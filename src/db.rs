//! Database connection pool and migration management.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<Sqlite>;

/// Create a new SQLite connection pool.
///
/// The database file is created on first use. Foreign keys are enabled per
/// connection since SQLite leaves them off by default.
///
/// # Errors
///
/// Returns an error if the connection string is invalid or the database
/// file cannot be opened.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// The macro embeds the migration files at compile time; each migration is
/// tracked in `_sqlx_migrations` and runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
