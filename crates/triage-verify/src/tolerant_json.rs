//! `spec.md` §4.6 step 6 / §9 item 4: the LLM is asked for JSON but not
//! constrained to it. Recovery is strict parse, then a brace-slice
//! reparse, then giving up — documented and tested rather than left as an
//! ad-hoc `find('{')`/`rfind('}')` one-liner at the call site.

use serde_json::Value;

/// Tries [`serde_json::from_str`] first; on failure, slices from the first
/// `{` to the last `}` and retries. Returns `None` if neither parse
/// succeeds, or the input contains no `{`/`}` pair — the caller is
/// responsible for falling through to its own fallback value.
pub fn extract_object(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Some(value);
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_json_parses_directly() {
        let raw = r#"{"verdict": "FALSE", "trust_score": 10}"#;
        assert_eq!(
            extract_object(raw),
            Some(json!({"verdict": "FALSE", "trust_score": 10}))
        );
    }

    #[test]
    fn surrounding_prose_is_stripped() {
        let raw = "Sure, here's the JSON:\n{\"verdict\": \"TRUE\"}\nHope that helps!";
        assert_eq!(extract_object(raw), Some(json!({"verdict": "TRUE"})));
    }

    #[test]
    fn no_braces_returns_none() {
        assert_eq!(extract_object("I cannot answer that."), None);
    }

    #[test]
    fn malformed_interior_returns_none() {
        assert_eq!(extract_object("{not json at all}"), None);
    }
}
