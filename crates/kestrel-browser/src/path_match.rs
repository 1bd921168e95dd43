//! Pure location-matching rules for path assertions.

use kestrel_core::QueryMap;
use url::Url;

/// The current location's query parameters as an unordered key/value map.
pub(crate) fn query_map(url: &Url) -> QueryMap {
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// With a query map the path must match exactly and the parameters must be
/// equivalent as a set; without one, the path is a prefix match on whole
/// segments and any query string on the current location is ignored.
pub(crate) fn location_matches(current: &Url, path: &str, query: Option<&QueryMap>) -> bool {
    match query {
        Some(expected) => current.path() == path && query_map(current) == *expected,
        None => path_prefix_matches(current.path(), path),
    }
}

/// Prefix match that only breaks at segment boundaries: `/dashboard`
/// covers `/dashboard` and `/dashboard/settings` but not `/dashboards`.
fn path_prefix_matches(current: &str, expected: &str) -> bool {
    match current.strip_prefix(expected) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || expected.ends_with('/'),
        None => false,
    }
}

pub(crate) fn describe_expected(path: &str, query: Option<&QueryMap>) -> String {
    match query {
        Some(query) => format!("{path} with query {query:?}"),
        None => format!("{path} (prefix match, ignoring query)"),
    }
}

pub(crate) fn describe_current(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> QueryMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_path_only_ignores_query_string() {
        let url = Url::parse("https://app.example.com/dashboard?tab=x").unwrap();
        assert!(location_matches(&url, "/dashboard", None));
        assert!(!location_matches(&url, "/dash", None));
        assert!(!location_matches(&url, "/dashboard/x", None));
    }

    #[test]
    fn test_path_only_form_is_a_segment_prefix_match() {
        let url = Url::parse("https://app.example.com/dashboard/settings?tab=x").unwrap();
        assert!(location_matches(&url, "/dashboard", None));
        assert!(location_matches(&url, "/dashboard/", None));
        assert!(location_matches(&url, "/dashboard/settings", None));
        assert!(location_matches(&url, "/", None));
        // A partial segment is not a prefix.
        assert!(!location_matches(&url, "/dash", None));
        assert!(!location_matches(&url, "/dashboard/set", None));
    }

    #[test]
    fn test_query_form_requires_the_exact_path_not_a_prefix() {
        let url = Url::parse("https://app.example.com/dashboard/settings?tab=x").unwrap();
        let expected = query(&[("tab", "x")]);
        assert!(!location_matches(&url, "/dashboard", Some(&expected)));
        assert!(location_matches(&url, "/dashboard/settings", Some(&expected)));
    }

    #[test]
    fn test_query_match_is_order_independent() {
        let url = Url::parse("https://app.example.com/dashboard?b=2&a=1").unwrap();
        let expected = query(&[("a", "1"), ("b", "2")]);
        assert!(location_matches(&url, "/dashboard", Some(&expected)));
    }

    #[test]
    fn test_query_match_rejects_superset_subset_and_changed_values() {
        let expected = query(&[("tab", "x")]);

        let exact = Url::parse("https://app.example.com/dashboard?tab=x").unwrap();
        assert!(location_matches(&exact, "/dashboard", Some(&expected)));

        let superset = Url::parse("https://app.example.com/dashboard?tab=x&page=2").unwrap();
        assert!(!location_matches(&superset, "/dashboard", Some(&expected)));

        let subset = Url::parse("https://app.example.com/dashboard").unwrap();
        assert!(!location_matches(&subset, "/dashboard", Some(&expected)));

        let changed = Url::parse("https://app.example.com/dashboard?tab=y").unwrap();
        assert!(!location_matches(&changed, "/dashboard", Some(&expected)));
    }

    #[test]
    fn test_query_match_still_requires_the_exact_path() {
        let url = Url::parse("https://app.example.com/other?tab=x").unwrap();
        let expected = query(&[("tab", "x")]);
        assert!(!location_matches(&url, "/dashboard", Some(&expected)));
    }

    #[test]
    fn test_descriptions_read_like_locations() {
        let url = Url::parse("https://app.example.com/dashboard?tab=x").unwrap();
        assert_eq!(describe_current(&url), "/dashboard?tab=x");
        assert_eq!(
            describe_expected("/dashboard", None),
            "/dashboard (prefix match, ignoring query)"
        );
    }
}
