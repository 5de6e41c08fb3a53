//! Database connection utilities.

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

/// Configure SQLite pragmas for concurrent readers and a writer.
///
/// - `journal_mode=WAL` so readers don't block the writer
/// - `busy_timeout=5000` to wait on locks instead of failing immediately
/// - `synchronous=NORMAL`, safe with WAL
async fn configure_sqlite(db: &DatabaseConnection) -> Result<(), DbErr> {
    for pragma in [
        "PRAGMA journal_mode=WAL",
        "PRAGMA busy_timeout=5000",
        "PRAGMA synchronous=NORMAL",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            pragma.to_string(),
        ))
        .await?;
    }

    Ok(())
}

fn is_sqlite(database_url: &str) -> bool {
    database_url.starts_with("sqlite:")
}

fn is_sqlite_memory(database_url: &str) -> bool {
    is_sqlite(database_url) && database_url.contains(":memory:")
}

/// Pool options for a database URL.
///
/// An in-memory SQLite database lives inside a single connection, so the pool
/// is pinned to exactly one.
pub fn connect_options(database_url: &str) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    if is_sqlite_memory(database_url) {
        options.max_connections(1).min_connections(1);
    }
    options
}

/// Establish a connection to the database.
///
/// File-backed SQLite databases get WAL mode, a 5 second busy timeout, and
/// NORMAL synchronous mode.
///
/// # Arguments
/// * `database_url` - e.g. `sqlite://twixter.db?mode=rwc` or `postgres://user@host/twixter`
///
/// # Errors
/// Returns `DbErr` if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(connect_options(database_url)).await?;

    if is_sqlite(database_url) && !is_sqlite_memory(database_url) {
        configure_sqlite(&db).await?;
    }

    tracing::debug!(backend = ?db.get_database_backend(), "Connected to database");
    Ok(db)
}

/// Establish a connection and run all pending migrations.
///
/// # Example
/// ```ignore
/// let db = twixter::connect_and_migrate("sqlite://twixter.db?mode=rwc").await?;
/// let store = twixter::store::SeaOrmGraphStore::new(db);
/// ```
#[cfg(feature = "migrate")]
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    use sea_orm_migration::MigratorTrait;

    let db = connect(database_url).await?;
    crate::migration::Migrator::up(&db, None).await?;
    Ok(db)
}
