use anyhow::Result;
use sqlx::SqlitePool;

/// Create the two local collections: `bios` (registry identity cache, keyed
/// by registry id) and `profiles` (per-user claim state, keyed by OAuth
/// subject id). Set-valued fields are stored as JSON text. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bios (
            id TEXT PRIMARY KEY,
            uri TEXT,
            family_name TEXT NOT NULL DEFAULT '',
            given_names TEXT NOT NULL DEFAULT '',
            other_names TEXT NOT NULL DEFAULT '[]',
            works TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            orcid TEXT PRIMARY KEY,
            ids TEXT NOT NULL DEFAULT '[]',
            locked_ids TEXT NOT NULL DEFAULT '[]',
            work_ids TEXT NOT NULL DEFAULT '[]',
            name TEXT,
            given_name TEXT,
            family_name TEXT,
            other_names TEXT NOT NULL DEFAULT '[]',
            updated INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
