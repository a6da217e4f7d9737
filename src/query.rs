//! Registry query construction.
//!
//! Turns a list of name variants into the fixed-operation parameter set the
//! registry's searchRetrieve endpoint expects.

use crate::config::RegistryConfig;

/// Build the OR-joined query term from a list of names.
///
/// Each name is wrapped in the registry's name-search predicate and quoted,
/// e.g. `pica.nw="thorisson, hermann" OR pica.nw="jones"`. Embedded quote
/// characters in names are passed through unsanitized; the registry's
/// grammar has no escape for them, so a name containing `"` produces a
/// malformed term. Known limitation.
pub fn names_to_query(field: &str, names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("{}=\"{}\"", field, n))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// 1-based record offset for a 1-based page number.
pub fn start_record(page: u32, page_size: u32) -> u32 {
    page_size * (page.max(1) - 1) + 1
}

/// Full parameter set for one search request. `names` must be non-empty.
pub fn build_search_params(
    config: &RegistryConfig,
    names: &[String],
    page: u32,
    page_size: u32,
) -> Vec<(String, String)> {
    vec![
        ("operation".to_string(), "searchRetrieve".to_string()),
        ("recordSchema".to_string(), config.record_schema.clone()),
        (
            "query".to_string(),
            names_to_query(&config.query_field, names),
        ),
        ("maximumRecords".to_string(), page_size.to_string()),
        ("startRecord".to_string(), start_record(page, page_size).to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn query_joins_names_with_or() {
        let q = names_to_query("pica.nw", &names(&["Smith, John", "J. Smith"]));
        assert_eq!(q, "pica.nw=\"Smith, John\" OR pica.nw=\"J. Smith\"");
    }

    #[test]
    fn single_name_has_no_join() {
        let q = names_to_query("pica.nw", &names(&["jones"]));
        assert_eq!(q, "pica.nw=\"jones\"");
    }

    #[test]
    fn start_record_is_one_based() {
        assert_eq!(start_record(1, 10), 1);
        assert_eq!(start_record(2, 10), 11);
        assert_eq!(start_record(3, 25), 51);
    }

    #[test]
    fn params_carry_fixed_operation() {
        let config = RegistryConfig::default();
        let params = build_search_params(&config, &names(&["Smith, John"]), 2, 10);
        let get = |k: &str| {
            params
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("operation"), "searchRetrieve");
        assert_eq!(get("recordSchema"), "isni-b");
        assert_eq!(get("query"), "pica.nw=\"Smith, John\"");
        assert_eq!(get("maximumRecords"), "10");
        assert_eq!(get("startRecord"), "11");
    }
}
