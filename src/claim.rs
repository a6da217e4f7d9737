//! Claim and unclaim agent.
//!
//! Claiming drives the full workflow: idempotence check against the locked
//! list, claim document construction, authenticated POST, response
//! interpretation, local bookkeeping, then a profile re-sync to decide
//! whether the fresh claim is already publicly visible. Unclaiming is
//! local-only: the external profile is never contacted.
//!
//! Per identifier or work the states move
//! `Unclaimed → ClaimSubmitted → {Visible, PrivatelyClaimed, Failed}` and
//! `PrivatelyClaimed → (unclaim) → Unclaimed`.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use sqlx::SqlitePool;

use crate::claim_state;
use crate::error::{ClaimOutcome, EngineError, SyncOutcome};
use crate::models::{Identity, OauthSession, UserProfile, WorkId, WorkRef};
use crate::orcid::{ClaimEndpoint, OrcidClient};
use crate::profile_sync;
use crate::store;
use crate::works::LookupClient;

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const ORCID_NS: &str = "http://www.orcid.org/ns/orcid";
const SCHEMA_LOCATION: &str = "http://www.orcid.org/ns/orcid \
     http://orcid.github.com/ORCID-Parent/schemas/orcid-message/1.1/orcid-message-1.1.xsd";
const MESSAGE_VERSION: &str = "1.1";

/// Claim a registry identity for the signed-in user.
///
/// Already-locked identifiers short-circuit to success without touching the
/// external API. The identity must have been cached in the `bios` store by
/// a previous search.
pub async fn claim_identity(
    pool: &SqlitePool,
    client: &OrcidClient,
    common_name: &str,
    session: &OauthSession,
    registry_id: &str,
) -> Result<ClaimOutcome, EngineError> {
    let profile = store::find_profile(pool, &session.uid)
        .await
        .map_err(EngineError::Internal)?;

    let already = profile
        .as_ref()
        .map(|p| p.locked_ids.iter().any(|i| i == registry_id))
        .unwrap_or(false);
    if already {
        tracing::info!(id = %registry_id, "identifier already claimed, skipping external call");
        return Ok(ClaimOutcome::AlreadyClaimed);
    }

    let record = store::find_bio(pool, registry_id)
        .await
        .map_err(EngineError::Internal)?
        .ok_or_else(|| EngineError::NoSuchIdentity(registry_id.to_string()))?;

    let xml = external_id_claim_xml(common_name, &record).map_err(EngineError::Internal)?;
    client
        .post_claim(session, ClaimEndpoint::ExternalIdentifiers, xml)
        .await?;

    let locked = lock_identity(profile, &session.uid, registry_id);
    store::save_profile(pool, &locked)
        .await
        .map_err(EngineError::Internal)?;

    // The claim may have landed as public or limited; re-sync to find out.
    match profile_sync::run_sync(pool, client, session).await? {
        SyncOutcome::Updated(fresh) if fresh.ids.iter().any(|i| i == registry_id) => {
            Ok(ClaimOutcome::Visible)
        }
        _ => Ok(ClaimOutcome::PrivatelyClaimed),
    }
}

/// Claim a work for the signed-in user, enriching it with bibliographic
/// metadata first so the claim document carries a title and citation.
pub async fn claim_work(
    pool: &SqlitePool,
    client: &OrcidClient,
    lookup: &LookupClient,
    session: &OauthSession,
    work_id: &WorkId,
) -> Result<ClaimOutcome, EngineError> {
    let profile = store::find_profile(pool, &session.uid)
        .await
        .map_err(EngineError::Internal)?;

    let already = claim_state::resolve_work(profile.as_ref(), work_id).claimed;
    if already {
        tracing::info!(id = %work_id.id, "work already claimed, skipping external call");
        return Ok(ClaimOutcome::AlreadyClaimed);
    }

    let mut work = lookup.enrich(WorkRef::from_id(work_id)).await;
    if work.title.is_none() {
        // The profile API rejects untitled works; fall back to the
        // identifier when enrichment produced nothing.
        work.title = Some(work.identifier.clone());
    }

    let xml = work_claim_xml(&work).map_err(EngineError::Internal)?;
    client
        .post_claim(session, ClaimEndpoint::Works, xml)
        .await?;

    let locked = lock_work(profile, &session.uid, work_id);
    store::save_profile(pool, &locked)
        .await
        .map_err(EngineError::Internal)?;

    match profile_sync::run_sync(pool, client, session).await? {
        SyncOutcome::Updated(fresh) if fresh.work_ids.contains(work_id) => {
            Ok(ClaimOutcome::Visible)
        }
        _ => Ok(ClaimOutcome::PrivatelyClaimed),
    }
}

/// Unclaim an identity: drop it from the locked list and persist. No
/// external call; the external profile keeps whatever it already shows.
pub async fn unclaim_identity(
    pool: &SqlitePool,
    uid: &str,
    registry_id: &str,
) -> Result<(), EngineError> {
    let profile = store::find_profile(pool, uid)
        .await
        .map_err(EngineError::Internal)?;

    if let Some(mut profile) = profile {
        profile.locked_ids.retain(|i| i != registry_id);
        store::save_profile(pool, &profile)
            .await
            .map_err(EngineError::Internal)?;
    }

    Ok(())
}

/// Unclaim a work. Equality is the whole `(id, type)` pair.
pub async fn unclaim_work(
    pool: &SqlitePool,
    uid: &str,
    work_id: &WorkId,
) -> Result<(), EngineError> {
    let profile = store::find_profile(pool, uid)
        .await
        .map_err(EngineError::Internal)?;

    if let Some(mut profile) = profile {
        profile.work_ids.retain(|w| w != work_id);
        store::save_profile(pool, &profile)
            .await
            .map_err(EngineError::Internal)?;
    }

    Ok(())
}

/// Record a successful identity claim in the profile, creating the profile
/// on the user's very first claim.
pub(crate) fn lock_identity(
    profile: Option<UserProfile>,
    uid: &str,
    registry_id: &str,
) -> UserProfile {
    let mut profile = profile.unwrap_or_else(|| UserProfile::new(uid));
    if !profile.locked_ids.iter().any(|i| i == registry_id) {
        profile.locked_ids.push(registry_id.to_string());
    }
    profile.updated = true;
    profile
}

pub(crate) fn lock_work(profile: Option<UserProfile>, uid: &str, work_id: &WorkId) -> UserProfile {
    let mut profile = profile.unwrap_or_else(|| UserProfile::new(uid));
    if !profile.work_ids.contains(work_id) {
        profile.work_ids.push(work_id.clone());
    }
    profile.updated = true;
    profile
}

// ---- claim document construction ----

fn text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn open<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close<W: std::io::Write>(writer: &mut Writer<W>, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn message_start<W: std::io::Write>(writer: &mut Writer<W>) -> anyhow::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("orcid-message");
    root.push_attribute(("xmlns:xsi", XSI_NS));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    root.push_attribute(("xmlns", ORCID_NS));
    writer.write_event(Event::Start(root))?;

    text_element(writer, "message-version", MESSAGE_VERSION)?;
    open(writer, "orcid-profile")?;
    Ok(())
}

fn message_end<W: std::io::Write>(writer: &mut Writer<W>) -> anyhow::Result<()> {
    close(writer, "orcid-profile")?;
    close(writer, "orcid-message")?;
    Ok(())
}

/// Claim document attaching a registry identifier to the user's bio:
/// common name, reference, and URI inside a single external-identifier
/// block.
pub(crate) fn external_id_claim_xml(
    common_name: &str,
    record: &Identity,
) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    message_start(&mut writer)?;
    open(&mut writer, "orcid-bio")?;
    open(&mut writer, "external-identifiers")?;
    open(&mut writer, "external-identifier")?;
    text_element(&mut writer, "external-id-common-name", common_name)?;
    text_element(&mut writer, "external-id-reference", &record.id)?;
    text_element(
        &mut writer,
        "external-id-url",
        record.uri.as_deref().unwrap_or(""),
    )?;
    close(&mut writer, "external-identifier")?;
    close(&mut writer, "external-identifiers")?;
    close(&mut writer, "orcid-bio")?;
    message_end(&mut writer)?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Claim document for a single work: title, synthesized BibTeX citation,
/// publication year, and the external identifier block.
pub(crate) fn work_claim_xml(work: &WorkRef) -> anyhow::Result<String> {
    let title = work.title.as_deref().unwrap_or("");
    let year = work.year.as_deref().unwrap_or("");

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    message_start(&mut writer)?;
    open(&mut writer, "orcid-activities")?;
    open(&mut writer, "orcid-works")?;
    open(&mut writer, "orcid-work")?;

    open(&mut writer, "work-title")?;
    text_element(&mut writer, "title", title)?;
    close(&mut writer, "work-title")?;

    open(&mut writer, "work-citation")?;
    text_element(&mut writer, "work-citation-type", "bibtex")?;
    open(&mut writer, "citation")?;
    writer.write_event(Event::CData(BytesCData::new(synthesize_citation(work))))?;
    close(&mut writer, "citation")?;
    close(&mut writer, "work-citation")?;

    text_element(&mut writer, "work-type", "book")?;

    open(&mut writer, "publication-date")?;
    text_element(&mut writer, "year", year)?;
    close(&mut writer, "publication-date")?;

    open(&mut writer, "work-external-identifiers")?;
    open(&mut writer, "work-external-identifier")?;
    text_element(
        &mut writer,
        "work-external-identifier-type",
        &work.identifier_type,
    )?;
    text_element(&mut writer, "work-external-identifier-id", &work.identifier)?;
    close(&mut writer, "work-external-identifier")?;
    close(&mut writer, "work-external-identifiers")?;

    close(&mut writer, "orcid-work")?;
    close(&mut writer, "orcid-works")?;
    close(&mut writer, "orcid-activities")?;
    message_end(&mut writer)?;

    Ok(String::from_utf8(writer.into_inner())?)
}

/// BibTeX entry for the citation block. The key is author + year +
/// identifier with non-alphanumerics squeezed out.
pub(crate) fn synthesize_citation(work: &WorkRef) -> String {
    let author = work.author.as_deref().unwrap_or("");
    let key_author: String = author.chars().filter(|c| c.is_alphanumeric()).collect();

    format!(
        "@BOOK{{{}_{}_{},\n  isbn = {{{}}},\n  title = {{{}}},\n  url = {{{}}},\n  author = {{{}}},\n  publisher = {{{}}},\n  year = {{{}}},\n  address = {{{}}}\n}}",
        key_author,
        work.year.as_deref().unwrap_or(""),
        work.identifier,
        work.identifier,
        work.title.as_deref().unwrap_or(""),
        work.url.as_deref().unwrap_or(""),
        author,
        work.publisher.as_deref().unwrap_or(""),
        work.year.as_deref().unwrap_or(""),
        work.city.as_deref().unwrap_or(""),
    )
}
