use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial",
    sql: include_str!("migrations/001_initial.sql"),
}];

/// Brings the schema up to date, applying any migrations the database
/// has not seen yet. Each migration runs inside its own transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = applied_versions(conn)?;
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");
        conn.execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", migration.sql))
            .with_context(|| format!("Migration {} ({}) failed", migration.version, migration.name))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            (
                migration.version,
                migration.name,
                chrono::Utc::now().to_rfc3339(),
            ),
        )?;
    }

    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<HashSet<i64>, _>>()?;
    Ok(versions)
}
