//! Profile sync agent.
//!
//! Fetches the user's full external profile, normalizes it, and upserts it
//! into the local `profiles` store. The external data is authoritative for
//! `ids`, `work_ids`, and the name fields; `locked_ids` is *merged* (union)
//! so that an identifier claimed through this system but not yet publicly
//! visible survives the sync instead of being erased until the next
//! visibility check.

use serde_json::Value;
use sqlx::SqlitePool;

use crate::error::{EngineError, SyncOutcome};
use crate::models::{UserProfile, WorkId};
use crate::orcid::{OrcidClient, ProfileFetch};
use crate::store;

/// Run one sync for the session's subject id and return the stored record,
/// or the token signal if the profile API refused the credential (the local
/// profile is left untouched in that case).
pub async fn run_sync(
    pool: &SqlitePool,
    client: &OrcidClient,
    session: &crate::models::OauthSession,
) -> Result<SyncOutcome, EngineError> {
    let body = match client.fetch_profile(session).await? {
        ProfileFetch::TokenExpired => return Ok(SyncOutcome::TokenExpired),
        ProfileFetch::Profile(body) => body,
    };

    let parsed = parse_profile(&body);
    tracing::info!(
        uid = %session.uid,
        ids = parsed.ids.len(),
        works = parsed.work_ids.len(),
        "parsed external profile"
    );

    let existing = store::find_profile(pool, &session.uid)
        .await
        .map_err(EngineError::Internal)?;
    let profile = apply_sync(existing, parsed, &session.uid);

    store::save_profile(pool, &profile)
        .await
        .map_err(EngineError::Internal)?;

    Ok(SyncOutcome::Updated(profile))
}

/// Fields extracted from the raw profile JSON.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ParsedProfile {
    pub ids: Vec<String>,
    pub work_ids: Vec<WorkId>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub other_names: Vec<String>,
}

fn walk<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Treat a lone object where a list is expected as a list of one. The API
/// flips between the two shapes depending on how many entries exist.
fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn value_field(value: &Value, field: &str) -> Option<String> {
    walk(value, &[field, "value"])
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Tolerant extraction: every block may be absent (empty result, not an
/// error), and list-valued fields may arrive as a single object.
pub(crate) fn parse_profile(body: &Value) -> ParsedProfile {
    let ids = walk(
        body,
        &["orcid-profile", "orcid-bio", "external-identifiers", "external-identifier"],
    )
    .map(|entries| {
        as_list(entries)
            .into_iter()
            .filter_map(|entry| value_field(entry, "external-id-reference"))
            .collect()
    })
    .unwrap_or_default();

    let work_ids = walk(
        body,
        &["orcid-profile", "orcid-activities", "orcid-works", "orcid-work"],
    )
    .map(|works| {
        as_list(works)
            .into_iter()
            .flat_map(|work| {
                walk(work, &["work-external-identifiers", "work-external-identifier"])
                    .map(as_list)
                    .unwrap_or_default()
            })
            .filter_map(|entry| {
                let id = value_field(entry, "work-external-identifier-id")?;
                let id_type = entry
                    .get("work-external-identifier-type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                Some(WorkId { id, id_type })
            })
            .collect()
    })
    .unwrap_or_default();

    let details = walk(body, &["orcid-profile", "orcid-bio", "personal-details"]);
    let given_name = details.and_then(|d| value_field(d, "given-names"));
    let family_name = details.and_then(|d| value_field(d, "family-name"));

    // The API ships multiple other names bundled into one comma-packed
    // string; split them apart here. Matches the external service's known
    // mis-encoding, not intentional design.
    let other_names = details
        .and_then(|d| walk(d, &["other-names", "other-name"]))
        .map(|entries| {
            as_list(entries)
                .into_iter()
                .filter_map(|entry| {
                    entry
                        .get("value")
                        .and_then(|v| v.as_str())
                        .or_else(|| entry.as_str())
                })
                .flat_map(|packed| {
                    packed
                        .split(',')
                        .map(|name| name.trim().to_string())
                        .filter(|name| !name.is_empty())
                        .collect::<Vec<_>>()
                })
                .collect()
        })
        .unwrap_or_default();

    ParsedProfile {
        ids,
        work_ids,
        given_name,
        family_name,
        other_names,
    }
}

/// Merge freshly fetched external data into the stored profile.
///
/// External data overwrites `ids`, `work_ids`, and names. `locked_ids`
/// takes the union of what was locked locally and what the external
/// profile now shows, so privately claimed identifiers are never erased by
/// a sync. A first-ever sync creates the record with empty `locked_ids`.
pub(crate) fn apply_sync(
    existing: Option<UserProfile>,
    parsed: ParsedProfile,
    uid: &str,
) -> UserProfile {
    let name = match (&parsed.given_name, &parsed.family_name) {
        (Some(given), Some(family)) => Some(format!("{} {}", given, family)),
        (Some(given), None) => Some(given.clone()),
        (None, Some(family)) => Some(family.clone()),
        (None, None) => None,
    };

    let mut profile = match existing {
        Some(mut profile) => {
            for id in &parsed.ids {
                if !profile.locked_ids.contains(id) {
                    profile.locked_ids.push(id.clone());
                }
            }
            profile
        }
        // First sync: nothing has been claimed through this system yet.
        None => UserProfile::new(uid),
    };

    profile.ids = parsed.ids;
    profile.work_ids = parsed.work_ids;
    profile.name = name;
    profile.given_name = parsed.given_name;
    profile.family_name = parsed.family_name;
    profile.other_names = parsed.other_names;
    profile.updated = true;
    profile
}
