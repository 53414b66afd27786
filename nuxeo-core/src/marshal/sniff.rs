//! Legacy entity-type discovery.
//!
//! Older servers did not declare the entity type of automation results in the response
//! headers, it was only written inside the JSON payload. This is a plain text scan, not a JSON
//! parse: it finds the first `"entity-type" : "<value>"` pair at any nesting depth.

const ENTITY_TYPE_KEY: &str = "\"entity-type\"";

/// Scans `body` for an embedded `entity-type` value.
///
/// Whitespace around the colon is tolerated. A value that is empty after trimming counts as
/// not found.
pub(crate) fn sniff_entity_type(body: &str) -> Option<String> {
    let mut offset = 0;
    while let Some(found) = body[offset..].find(ENTITY_TYPE_KEY) {
        let after_key = offset + found + ENTITY_TYPE_KEY.len();
        if let Some(value) = quoted_value_after_colon(&body[after_key..]) {
            let value = value.trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
        offset = after_key;
    }
    None
}

fn quoted_value_after_colon(rest: &str) -> Option<&str> {
    let rest = rest.trim_start().strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_payload() {
        let body = r#"{"entity-type":"user","id":"x"}"#;
        assert_eq!(sniff_entity_type(body).as_deref(), Some("user"));
    }

    #[test]
    fn test_whitespace_and_nesting() {
        let body = r#"{
            "value": {
                "entity-type" :  "document",
                "uid": "1234"
            }
        }"#;
        assert_eq!(sniff_entity_type(body).as_deref(), Some("document"));
    }

    #[test]
    fn test_first_match_wins() {
        let body = r#"{"entity-type":"documents","entries":[{"entity-type":"document"}]}"#;
        assert_eq!(sniff_entity_type(body).as_deref(), Some("documents"));
    }

    #[test]
    fn test_key_used_as_value_is_skipped() {
        let body = r#"{"label":"entity-type","nested":{"entity-type":"user"}}"#;
        assert_eq!(sniff_entity_type(body).as_deref(), Some("user"));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(sniff_entity_type(r#"{"id":"x"}"#), None);
        assert_eq!(sniff_entity_type(r#"{"entity-type": 3}"#), None);
        assert_eq!(sniff_entity_type(r#"{"entity-type":"   "}"#), None);
        assert_eq!(sniff_entity_type(""), None);
    }
}
