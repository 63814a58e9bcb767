//! Schema migrations, tracked in SQLite's `user_version` header field.

use super::Error;
use tokio_rusqlite::{Connection, rusqlite};

struct Migration {
    version: i64,
    sql: &'static str,
}

/// Applied in ascending version order; append only.
const MIGRATIONS: &[Migration] =
    &[Migration { version: 1, sql: include_str!("../../migrations/001_cache_storage.sql") }];

/// Latest schema version this build knows about.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Bring the schema up to [`latest_version`].
///
/// Each migration runs in its own transaction together with the version bump.
/// A database written by a newer build is refused.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        let current = schema_version(conn)?;
        if current > latest_version() {
            return Err(Error::MigrationFailed(format!(
                "schema version {current} is newer than supported {}",
                latest_version()
            )));
        }

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .map_err(|e| Error::MigrationFailed(format!("migration {}: {e}", migration.version)))?;
            tx.pragma_update(None, "user_version", migration.version)?;
            tx.commit()?;
            tracing::debug!(version = migration.version, "applied cache schema migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn schema_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
