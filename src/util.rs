//! Small text helpers shared across the crate.

use std::borrow::Cow;

/// Decode raw document bytes to a string.
///
/// Tries UTF-8 first (handles BOM automatically via encoding_rs), then
/// falls back to Windows-1252, which is a superset of ISO-8859-1 and
/// common in output from older structuring services.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return result;
    }
    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Collapse all runs of whitespace to single spaces and trim the ends.
pub fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append `chunk` to `parts` unless it repeats the previous chunk exactly.
///
/// The structuring service frequently duplicates whole blocks when a
/// subtree nests the same paragraph twice.
pub fn push_deduped(parts: &mut Vec<String>, chunk: String) {
    if chunk.is_empty() {
        return;
    }
    if parts.last().map(String::as_str) != Some(chunk.as_str()) {
        parts.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // 0xE9 is é in Windows-1252 but invalid UTF-8
        assert_eq!(decode_text(b"caf\xe9"), "café");
    }

    #[test]
    fn test_norm_ws() {
        assert_eq!(norm_ws("  a \t b\n\nc "), "a b c");
    }

    #[test]
    fn test_push_deduped_collapses_consecutive() {
        let mut parts = Vec::new();
        push_deduped(&mut parts, "a".into());
        push_deduped(&mut parts, "a".into());
        push_deduped(&mut parts, "b".into());
        push_deduped(&mut parts, "a".into());
        assert_eq!(parts, vec!["a", "b", "a"]);
    }
}
