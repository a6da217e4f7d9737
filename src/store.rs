//! Local document store.
//!
//! Two logical collections over SQLite: `bios`, an upsert-only cache of
//! normalized registry identities, and `profiles`, the per-user claim state.
//! Set-valued fields travel as JSON text columns. Store failures are not
//! converted to engine signals; they propagate as plain errors.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::models::{Identity, UserProfile, WorkId};

fn pack<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

fn unpack<T: serde::de::DeserializeOwned + Default>(text: &str) -> T {
    serde_json::from_str(text).unwrap_or_default()
}

/// Insert or update one identity in the `bios` cache. Rows are never
/// deleted; a fresh search hit overwrites whatever was cached before.
pub async fn upsert_bio(pool: &SqlitePool, identity: &Identity) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO bios (id, uri, family_name, given_names, other_names, works, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            uri = excluded.uri,
            family_name = excluded.family_name,
            given_names = excluded.given_names,
            other_names = excluded.other_names,
            works = excluded.works,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&identity.id)
    .bind(&identity.uri)
    .bind(&identity.family_name)
    .bind(&identity.given_names)
    .bind(pack(&identity.other_names))
    .bind(pack(&identity.works))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_bio(pool: &SqlitePool, id: &str) -> Result<Option<Identity>> {
    let row = sqlx::query(
        "SELECT id, uri, family_name, given_names, other_names, works FROM bios WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let other_names: String = row.get("other_names");
        let works: String = row.get("works");
        Identity {
            id: row.get("id"),
            uri: row.get("uri"),
            family_name: row.get("family_name"),
            given_names: row.get("given_names"),
            other_names: unpack::<Vec<String>>(&other_names),
            works: unpack::<Vec<WorkId>>(&works),
        }
    }))
}

pub async fn find_profile(pool: &SqlitePool, orcid: &str) -> Result<Option<UserProfile>> {
    let row = sqlx::query(
        r#"
        SELECT orcid, ids, locked_ids, work_ids, name, given_name, family_name, other_names, updated
        FROM profiles WHERE orcid = ?
        "#,
    )
    .bind(orcid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| {
        let ids: String = row.get("ids");
        let locked_ids: String = row.get("locked_ids");
        let work_ids: String = row.get("work_ids");
        let other_names: String = row.get("other_names");
        UserProfile {
            orcid: row.get("orcid"),
            ids: unpack::<Vec<String>>(&ids),
            locked_ids: unpack::<Vec<String>>(&locked_ids),
            work_ids: unpack::<Vec<WorkId>>(&work_ids),
            name: row.get("name"),
            given_name: row.get("given_name"),
            family_name: row.get("family_name"),
            other_names: unpack::<Vec<String>>(&other_names),
            updated: row.get("updated"),
        }
    }))
}

/// Insert or overwrite the full profile row for its subject id.
pub async fn save_profile(pool: &SqlitePool, profile: &UserProfile) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO profiles (orcid, ids, locked_ids, work_ids, name, given_name, family_name, other_names, updated, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(orcid) DO UPDATE SET
            ids = excluded.ids,
            locked_ids = excluded.locked_ids,
            work_ids = excluded.work_ids,
            name = excluded.name,
            given_name = excluded.given_name,
            family_name = excluded.family_name,
            other_names = excluded.other_names,
            updated = excluded.updated,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&profile.orcid)
    .bind(pack(&profile.ids))
    .bind(pack(&profile.locked_ids))
    .bind(pack(&profile.work_ids))
    .bind(&profile.name)
    .bind(&profile.given_name)
    .bind(&profile.family_name)
    .bind(pack(&profile.other_names))
    .bind(profile.updated)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
