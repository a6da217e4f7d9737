//! Registry search response normalization.
//!
//! The registry's searchRetrieve envelope is deeply nested and
//! inconsistently shaped: the variant-name block and the works block may be
//! entirely absent, and a lone hit arrives as a single `record` element
//! rather than a list. The decoder below treats both as the normal case:
//! every block is `default`-able and repeated elements collect into vectors
//! whether one or many are present.
//!
//! Normalization per record:
//! 1. pool = primary names ++ name variants
//! 2. drop candidates whose surname and forename are both empty
//! 3. render survivors as `"surname, given"`, dedup preserving first-seen order
//! 4. first survivor becomes the primary name; the deduplicated list minus
//!    that entry becomes `other_names`
//! 5. records whose pool filters down to nothing are skipped entirely
//!
//! Associated works are collected as `(id, type)` pairs, deduplicated by
//! the pair as a whole.

use serde::Deserialize;
use std::collections::HashSet;

use crate::models::{Identity, WorkId};

// ---- raw wire shapes ----

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchEnvelope {
    number_of_records: Option<u64>,
    records: Option<RecordList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordList {
    record: Vec<RawRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawRecord {
    record_data: RecordData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RecordData {
    response_record: ResponseRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseRecord {
    #[serde(rename = "ISNIAssigned")]
    assigned: Option<AssignedRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssignedRecord {
    #[serde(rename = "isniUnformatted")]
    isni_unformatted: Option<String>,
    #[serde(rename = "isniURI")]
    isni_uri: Option<String>,
    #[serde(rename = "ISNIMetadata")]
    metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMetadata {
    identity: RawIdentityBlock,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIdentityBlock {
    #[serde(rename = "personOrFiction")]
    person: RawPerson,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPerson {
    #[serde(rename = "personalName")]
    personal_names: Vec<RawName>,
    #[serde(rename = "personalNameVariant")]
    name_variants: Vec<RawName>,
    #[serde(rename = "creativeActivity")]
    creative_activities: Vec<RawActivity>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
struct RawName {
    surname: Option<String>,
    forename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawActivity {
    identifier: Vec<RawWorkIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawWorkIdentifier {
    identifier_value: Option<String>,
    identifier_type: Option<String>,
}

// ---- normalized output ----

/// One-shot sequence of normalized identities plus the envelope's total.
///
/// Records are normalized lazily as the iterator is consumed; records whose
/// name pool filters down to nothing are skipped without being emitted.
pub struct NormalizedRecords {
    /// Total hit count read from the envelope's explicit count field,
    /// never recomputed from the page contents.
    pub total: u64,
    records: std::vec::IntoIter<RawRecord>,
}

impl Iterator for NormalizedRecords {
    type Item = Identity;

    fn next(&mut self) -> Option<Identity> {
        loop {
            let record = self.records.next()?;
            if let Some(identity) = normalize_record(record) {
                return Some(identity);
            }
        }
    }
}

/// Parse a raw searchRetrieve body into a normalized record sequence.
pub fn parse_search_response(body: &str) -> Result<NormalizedRecords, quick_xml::DeError> {
    let envelope: SearchEnvelope = quick_xml::de::from_str(body)?;

    let records = envelope
        .records
        .map(|list| list.record)
        .unwrap_or_default();

    Ok(NormalizedRecords {
        total: envelope.number_of_records.unwrap_or(0),
        records: records.into_iter(),
    })
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().unwrap_or("").is_empty()
}

fn render_name(name: &RawName) -> String {
    format!(
        "{}, {}",
        name.surname.as_deref().unwrap_or(""),
        name.forename.as_deref().unwrap_or("")
    )
}

fn normalize_record(record: RawRecord) -> Option<Identity> {
    let assigned = record.record_data.response_record.assigned?;
    // A record without its registry identifier cannot be cached or claimed.
    let id = assigned.isni_unformatted?;

    let person = assigned.metadata.identity.person;

    let pool: Vec<&RawName> = person
        .personal_names
        .iter()
        .chain(person.name_variants.iter())
        .filter(|n| !(is_blank(&n.surname) && is_blank(&n.forename)))
        .collect();

    let primary = *pool.first()?;

    let mut seen = HashSet::new();
    let mut rendered: Vec<String> = Vec::new();
    for name in &pool {
        let text = render_name(name);
        if seen.insert(text.clone()) {
            rendered.push(text);
        }
    }

    // The rendered primary is always rendered[0]; everything after it is an
    // "other name".
    let other_names: Vec<String> = rendered.into_iter().skip(1).collect();

    let mut seen_works = HashSet::new();
    let mut works: Vec<WorkId> = Vec::new();
    for activity in &person.creative_activities {
        for identifier in &activity.identifier {
            let (Some(value), Some(id_type)) =
                (identifier.identifier_value.as_ref(), identifier.identifier_type.as_ref())
            else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let work = WorkId {
                id: value.clone(),
                id_type: id_type.clone(),
            };
            if seen_works.insert((work.id.clone(), work.id_type.clone())) {
                works.push(work);
            }
        }
    }

    Some(Identity {
        id,
        uri: assigned.isni_uri,
        family_name: primary.surname.clone().unwrap_or_default(),
        given_names: primary.forename.clone().unwrap_or_default(),
        other_names,
        works,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = r#"
<searchRetrieveResponse>
  <version>1.1</version>
  <numberOfRecords>2</numberOfRecords>
  <records>
    <record>
      <recordData>
        <responseRecord>
          <ISNIAssigned>
            <isniUnformatted>0000000121032683</isniUnformatted>
            <isniURI>https://isni.org/isni/0000000121032683</isniURI>
            <ISNIMetadata>
              <identity>
                <personOrFiction>
                  <personalName>
                    <surname>Thorisson</surname>
                    <forename>Hermann</forename>
                  </personalName>
                  <personalNameVariant>
                    <surname>Thorisson</surname>
                    <forename>H.</forename>
                  </personalNameVariant>
                  <personalNameVariant>
                    <surname>Thorisson</surname>
                    <forename>Hermann</forename>
                  </personalNameVariant>
                  <creativeActivity>
                    <identifier>
                      <identifierValue>9780387987798</identifierValue>
                      <identifierType>ISBN</identifierType>
                    </identifier>
                    <identifier>
                      <identifierValue>9780387987798</identifierValue>
                      <identifierType>ISBN</identifierType>
                    </identifier>
                  </creativeActivity>
                </personOrFiction>
              </identity>
            </ISNIMetadata>
          </ISNIAssigned>
        </responseRecord>
      </recordData>
    </record>
    <record>
      <recordData>
        <responseRecord>
          <ISNIAssigned>
            <isniUnformatted>0000000042111111</isniUnformatted>
            <ISNIMetadata>
              <identity>
                <personOrFiction>
                  <personalName>
                    <surname>Jones</surname>
                  </personalName>
                </personOrFiction>
              </identity>
            </ISNIMetadata>
          </ISNIAssigned>
        </responseRecord>
      </recordData>
    </record>
  </records>
</searchRetrieveResponse>
"#;

    const LONE_RECORD: &str = r#"
<searchRetrieveResponse>
  <numberOfRecords>1</numberOfRecords>
  <records>
    <record>
      <recordData>
        <responseRecord>
          <ISNIAssigned>
            <isniUnformatted>0000000099999999</isniUnformatted>
            <ISNIMetadata>
              <identity>
                <personOrFiction>
                  <personalName>
                    <surname>Solo</surname>
                    <forename>Only</forename>
                  </personalName>
                </personOrFiction>
              </identity>
            </ISNIMetadata>
          </ISNIAssigned>
        </responseRecord>
      </recordData>
    </record>
  </records>
</searchRetrieveResponse>
"#;

    #[test]
    fn empty_envelope_yields_nothing() {
        let body = "<searchRetrieveResponse><numberOfRecords>0</numberOfRecords></searchRetrieveResponse>";
        let mut normalized = parse_search_response(body).unwrap();
        assert_eq!(normalized.total, 0);
        assert!(normalized.next().is_none());
    }

    #[test]
    fn total_comes_from_envelope_not_page() {
        // One record on the page, 250 reported in the envelope.
        let body = LONE_RECORD.replace(
            "<numberOfRecords>1</numberOfRecords>",
            "<numberOfRecords>250</numberOfRecords>",
        );
        let normalized = parse_search_response(&body).unwrap();
        assert_eq!(normalized.total, 250);
        assert_eq!(normalized.count(), 1);
    }

    #[test]
    fn lone_record_is_handled() {
        let identities: Vec<Identity> = parse_search_response(LONE_RECORD).unwrap().collect();
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].id, "0000000099999999");
        assert_eq!(identities[0].family_name, "Solo");
    }

    #[test]
    fn names_are_pooled_rendered_and_deduped() {
        let identities: Vec<Identity> = parse_search_response(TWO_RECORDS).unwrap().collect();
        assert_eq!(identities.len(), 2);

        let first = &identities[0];
        assert_eq!(first.family_name, "Thorisson");
        assert_eq!(first.given_names, "Hermann");
        // The duplicate variant "Thorisson, Hermann" collapses into the
        // primary; only the distinct variant survives.
        assert_eq!(first.other_names, vec!["Thorisson, H.".to_string()]);
    }

    #[test]
    fn other_names_never_contain_primary_or_duplicates() {
        let identities: Vec<Identity> = parse_search_response(TWO_RECORDS).unwrap().collect();
        for identity in &identities {
            let primary = format!("{}, {}", identity.family_name, identity.given_names);
            assert!(!identity.other_names.contains(&primary));
            let mut seen = std::collections::HashSet::new();
            for name in &identity.other_names {
                assert!(seen.insert(name.clone()), "duplicate other name: {}", name);
            }
        }
    }

    #[test]
    fn surname_only_name_renders_with_empty_given() {
        let identities: Vec<Identity> = parse_search_response(TWO_RECORDS).unwrap().collect();
        let second = &identities[1];
        assert_eq!(second.family_name, "Jones");
        assert_eq!(second.given_names, "");
        assert!(second.other_names.is_empty());
        assert!(second.works.is_empty());
    }

    #[test]
    fn works_are_deduped_by_pair() {
        let identities: Vec<Identity> = parse_search_response(TWO_RECORDS).unwrap().collect();
        assert_eq!(
            identities[0].works,
            vec![WorkId {
                id: "9780387987798".to_string(),
                id_type: "ISBN".to_string(),
            }]
        );
    }

    #[test]
    fn record_with_only_empty_names_is_skipped() {
        let body = r#"
<searchRetrieveResponse>
  <numberOfRecords>1</numberOfRecords>
  <records>
    <record>
      <recordData>
        <responseRecord>
          <ISNIAssigned>
            <isniUnformatted>0000000012345678</isniUnformatted>
            <ISNIMetadata>
              <identity>
                <personOrFiction>
                  <personalName>
                    <surname></surname>
                    <forename></forename>
                  </personalName>
                </personOrFiction>
              </identity>
            </ISNIMetadata>
          </ISNIAssigned>
        </responseRecord>
      </recordData>
    </record>
  </records>
</searchRetrieveResponse>
"#;
        let identities: Vec<Identity> = parse_search_response(body).unwrap().collect();
        assert!(identities.is_empty());
    }

    #[test]
    fn truncated_body_is_an_error() {
        assert!(parse_search_response("<searchRetrieveResponse><records><record>").is_err());
    }
}
