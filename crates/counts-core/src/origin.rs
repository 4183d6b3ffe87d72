//! Extraction of first-visited pages from the `Origin` column.
//!
//! A cell holds either one serialized mapping or a list of them; each mapping
//! may carry a `firstVisitedPage` entry. Extraction is total: anything that
//! does not decode yields an empty list for that row.

use crate::literal::{parse_literal, Literal};

/// Key naming the landing page inside each serialized event.
pub const FIRST_VISITED_PAGE_KEY: &str = "firstVisitedPage";

/// Shape of a decoded `Origin` cell.
#[derive(Debug, Clone, PartialEq)]
pub enum OriginPayload {
    /// A single mapping (`{...}`), as key / value pairs.
    Mapping(Literal),
    /// A list whose elements are expected to be mappings.
    Sequence(Vec<Literal>),
    /// Valid literal text of any other shape (scalar, tuple, set, ...).
    Other,
    /// Text that is not a literal at all.
    Malformed,
}

impl OriginPayload {
    /// Ordered base URLs of every `firstVisitedPage` in the payload.
    ///
    /// Mappings without the key and non-mapping list elements are skipped.
    /// A page value that is not a string spoils the whole payload, which
    /// then yields nothing.
    pub fn first_visited_pages(&self) -> Vec<String> {
        let entries: &[Literal] = match self {
            OriginPayload::Mapping(mapping) => std::slice::from_ref(mapping),
            OriginPayload::Sequence(items) => items,
            OriginPayload::Other | OriginPayload::Malformed => return Vec::new(),
        };

        let mut pages = Vec::new();
        for entry in entries {
            match page_entry(entry) {
                PageEntry::Absent => {}
                PageEntry::Page(page) => pages.push(base_url(page).to_string()),
                PageEntry::NotText => return Vec::new(),
            }
        }
        pages
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, OriginPayload::Malformed)
    }
}

/// Decode the raw `Origin` text into an [`OriginPayload`].
pub fn decode_origin(text: &str) -> OriginPayload {
    // Leading spaces and tabs are tolerated; anything else is the parser's call.
    match parse_literal(text.trim_start_matches([' ', '\t'])) {
        Ok(value @ Literal::Dict(_)) => OriginPayload::Mapping(value),
        Ok(Literal::List(items)) => OriginPayload::Sequence(items),
        Ok(_) => OriginPayload::Other,
        Err(_) => OriginPayload::Malformed,
    }
}

/// Strip any query string: everything from the first `?` onward.
pub fn base_url(page: &str) -> &str {
    match page.find('?') {
        Some(idx) => &page[..idx],
        None => page,
    }
}

/// Ordered base URLs of every `firstVisitedPage` found in `origin`.
pub fn extract_first_visited_pages(origin: &str) -> Vec<String> {
    decode_origin(origin).first_visited_pages()
}

/// The exact text the upstream serializer writes for `url`, used to find the
/// page inside free-text columns.
pub fn serialized_page_pattern(url: &str) -> String {
    format!("'{FIRST_VISITED_PAGE_KEY}': '{url}'")
}

/// What one decoded element says about its landing page.
enum PageEntry<'a> {
    Absent,
    Page(&'a str),
    NotText,
}

fn page_entry(entry: &Literal) -> PageEntry<'_> {
    if !entry.is_dict() {
        return PageEntry::Absent;
    }
    match entry.get(FIRST_VISITED_PAGE_KEY) {
        None => PageEntry::Absent,
        Some(value) => value.as_str().map_or(PageEntry::NotText, PageEntry::Page),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── base_url ──────────────────────────────────────────────────────────────

    #[test]
    fn test_base_url_truncates_at_first_question_mark() {
        assert_eq!(base_url("/a?x=1"), "/a");
        assert_eq!(base_url("/a?x=1?y=2"), "/a");
        assert_eq!(base_url("/plain"), "/plain");
        assert_eq!(base_url("?only=query"), "");
        assert_eq!(base_url(""), "");
    }

    // ── decode_origin ─────────────────────────────────────────────────────────

    #[test]
    fn test_decode_shapes() {
        assert!(matches!(
            decode_origin("{'firstVisitedPage': '/a'}"),
            OriginPayload::Mapping(_)
        ));
        assert!(matches!(
            decode_origin("[{'firstVisitedPage': '/a'}]"),
            OriginPayload::Sequence(ref items) if items.len() == 1
        ));
        assert_eq!(decode_origin("42"), OriginPayload::Other);
        assert_eq!(decode_origin("({'firstVisitedPage': '/a'},)"), OriginPayload::Other);
        assert_eq!(decode_origin("not a literal"), OriginPayload::Malformed);
        assert_eq!(decode_origin("nan"), OriginPayload::Malformed);
        assert!(decode_origin("{'a'").is_malformed());
        assert!(!decode_origin("42").is_malformed());
    }

    // ── extract_first_visited_pages ───────────────────────────────────────────

    #[test]
    fn test_single_mapping_strips_query() {
        assert_eq!(
            extract_first_visited_pages("{'firstVisitedPage': '/a?x=1'}"),
            vec!["/a"]
        );
    }

    #[test]
    fn test_list_preserves_order_and_duplicates() {
        let origin = "[{'firstVisitedPage': '/a'}, {'firstVisitedPage': '/b?q'}, {'firstVisitedPage': '/a'}]";
        assert_eq!(extract_first_visited_pages(origin), vec!["/a", "/b", "/a"]);
    }

    #[test]
    fn test_list_skips_entries_without_key_and_non_mappings() {
        let origin = "[{'other': 1}, 'text', 7, None, {'firstVisitedPage': '/x'}, [{'firstVisitedPage': '/nested'}]]";
        assert_eq!(extract_first_visited_pages(origin), vec!["/x"]);
    }

    #[test]
    fn test_mapping_without_key_is_empty() {
        assert!(extract_first_visited_pages("{'lastVisitedPage': '/a'}").is_empty());
        assert!(extract_first_visited_pages("{}").is_empty());
        assert!(extract_first_visited_pages("[]").is_empty());
    }

    #[test]
    fn test_non_string_page_value_empties_the_row() {
        for origin in [
            "{'firstVisitedPage': 3}",
            "{'firstVisitedPage': None}",
            "{'firstVisitedPage': b'/a'}",
            "[{'firstVisitedPage': 3}, {'firstVisitedPage': '/ok'}]",
            "[{'firstVisitedPage': '/ok'}, {'firstVisitedPage': ['/a']}]",
            "[{'firstVisitedPage': '/ok'}, {'firstVisitedPage': b'/ok'}]",
        ] {
            assert!(
                extract_first_visited_pages(origin).is_empty(),
                "{origin:?} should extract nothing"
            );
        }
        // Well-formed rows around it are untouched.
        assert_eq!(
            extract_first_visited_pages("[{'other': 3}, {'firstVisitedPage': '/ok'}]"),
            vec!["/ok"]
        );
    }

    #[test]
    fn test_mapping_with_extra_keys_and_double_quotes() {
        let origin = r#"{"source": "ads", 'firstVisitedPage': "/landing?utm=1", 'n': 2}"#;
        assert_eq!(extract_first_visited_pages(origin), vec!["/landing"]);
    }

    #[test]
    fn test_malformed_inputs_yield_empty() {
        for origin in [
            "",
            "not a literal",
            "nan",
            "{'firstVisitedPage': '/a'",
            "{\"firstVisitedPage\": \"/a\"} trailing",
            "\u{0}\u{1}\u{fffd}\u{7f}",
            "{'firstVisitedPage': f'/a'}",
        ] {
            assert!(
                extract_first_visited_pages(origin).is_empty(),
                "{origin:?} should extract nothing"
            );
        }
    }

    #[test]
    fn test_deeply_nested_input_does_not_panic() {
        let deep = "[".repeat(50_000);
        assert!(extract_first_visited_pages(&deep).is_empty());
        let deep_dict = "{'a': ".repeat(20_000);
        assert!(extract_first_visited_pages(&deep_dict).is_empty());
    }

    #[test]
    fn test_arbitrary_byte_soup_does_not_panic() {
        // A deterministic sweep over short strings built from the grammar's
        // special characters.
        let alphabet = ['{', '}', '[', ']', '(', ')', '\'', '"', ':', ',', '\\', 'b', 'r', '1', '.', '#', '\n', '?'];
        for a in alphabet {
            for b in alphabet {
                for c in alphabet {
                    for d in alphabet {
                        let text: String = [a, b, c, d].iter().collect();
                        let _ = extract_first_visited_pages(&text);
                    }
                }
            }
        }
    }

    #[test]
    fn test_payload_with_deep_sibling_still_yields_page() {
        let meta = "[".repeat(120) + &"]".repeat(120);
        let origin = format!("{{'firstVisitedPage': '/a', 'meta': {meta}}}");
        assert_eq!(extract_first_visited_pages(&origin), vec!["/a"]);
    }

    #[test]
    fn test_numeric_siblings_follow_literal_rules() {
        assert_eq!(
            extract_first_visited_pages("[1+2j, {'firstVisitedPage': '/c'}]"),
            vec!["/c"]
        );
        assert!(extract_first_visited_pages("[01, {'firstVisitedPage': '/z'}]").is_empty());
    }

    #[test]
    fn test_named_escape_in_page_is_decoded() {
        assert_eq!(
            extract_first_visited_pages(r"{'firstVisitedPage': '/caf\N{LATIN SMALL LETTER E WITH ACUTE}?x=1'}"),
            vec!["/café"]
        );
    }

    #[test]
    fn test_serialized_page_pattern() {
        assert_eq!(serialized_page_pattern("/a"), "'firstVisitedPage': '/a'");
        assert_eq!(
            serialized_page_pattern("/a.b*(c)"),
            "'firstVisitedPage': '/a.b*(c)'"
        );
    }
}
