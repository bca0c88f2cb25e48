//! Opaque cursor encoding for connection pagination.
//!
//! A cursor packs a collection type tag and a record key into one opaque,
//! URL-safe string. Decoding a cursor produced by [`encode`] always yields
//! the original pair; cursors carrying a different type tag are rejected so
//! a cursor minted for one connection cannot be replayed against another.
//!
//! Encoding is deterministic: `start_cursor`/`end_cursor` computed
//! independently from the same record match client-supplied cursors
//! byte-for-byte. Decoding never checks that the key still exists; that is
//! the caller's concern.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::error::ValidationError;

/// Separator between the type tag and the key inside the encoded payload.
///
/// Type tags are fixed identifiers that never contain it, so splitting on
/// the first occurrence is unambiguous even when keys contain it.
const SEPARATOR: char = ':';

/// Encode a `(type_tag, key)` pair into an opaque cursor string.
pub fn encode(type_tag: &str, key: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}{}{}", type_tag, SEPARATOR, key))
}

/// Decode a cursor back into its `(type_tag, key)` pair.
///
/// `connection` is the display name of the connection the cursor was
/// supplied to; it only parameterizes the error message.
pub fn decode(connection: &str, cursor: &str) -> Result<(String, String), ValidationError> {
    let malformed = || ValidationError::MalformedCursor {
        connection: connection.to_string(),
    };

    let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| malformed())?;
    let payload = String::from_utf8(bytes).map_err(|_| malformed())?;
    let (tag, key) = payload.split_once(SEPARATOR).ok_or_else(malformed)?;

    if tag.is_empty() || key.is_empty() {
        return Err(malformed());
    }

    Ok((tag.to_string(), key.to_string()))
}

/// Decode a cursor and require it to carry the expected type tag.
///
/// Returns the record key, or [`ValidationError::CursorTypeMismatch`] when
/// the cursor belongs to a different collection.
pub fn decode_for(
    connection: &str,
    expected_tag: &str,
    cursor: &str,
) -> Result<String, ValidationError> {
    let (tag, key) = decode(connection, cursor)?;
    if tag != expected_tag {
        return Err(ValidationError::CursorTypeMismatch {
            connection: connection.to_string(),
            found: tag,
        });
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let cursor = encode("domains", "domains/4821");
        let (tag, key) = decode("Domain", &cursor).unwrap();
        assert_eq!(tag, "domains");
        assert_eq!(key, "domains/4821");
    }

    #[test]
    fn encode_is_deterministic() {
        assert_eq!(encode("scans", "scans/1"), encode("scans", "scans/1"));
    }

    #[test]
    fn keys_containing_the_separator_survive() {
        let cursor = encode("organizations", "org:with:colons");
        let (tag, key) = decode("Organization", &cursor).unwrap();
        assert_eq!(tag, "organizations");
        assert_eq!(key, "org:with:colons");
    }

    #[test]
    fn cursor_is_url_safe() {
        let cursor = encode("dmarcSummaries", "summaries/2024-06?x=1&y=2");
        assert!(
            cursor
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let empty_tag = encode("", "key");
        for bad in ["", "not base64 at all!!", "YWJj", empty_tag.as_str()] {
            let err = decode("Domain", bad).unwrap_err();
            assert!(
                matches!(err, ValidationError::MalformedCursor { ref connection } if connection == "Domain"),
                "expected MalformedCursor for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    // Test critique: un curseur d'une autre collection est rejeté
    #[test]
    fn foreign_type_tag_is_rejected() {
        let cursor = encode("scans", "scans/77");
        let err = decode_for("Domain", "domains", &cursor).unwrap_err();
        match err {
            ValidationError::CursorTypeMismatch { connection, found } => {
                assert_eq!(connection, "Domain");
                assert_eq!(found, "scans");
            }
            other => panic!("expected CursorTypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn matching_type_tag_yields_key() {
        let cursor = encode("domains", "domains/9");
        assert_eq!(
            decode_for("Domain", "domains", &cursor).unwrap(),
            "domains/9"
        );
    }
}
