//! Resumable pagination pointers and their opaque token form

use std::fmt;

use derive_deref::Deref;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::{
    domain::item::{Item, ItemKey},
    error::DecodeError,
};

const TOKEN_VERSION: &str = "v1";

/// A comparable pagination pointer
///
/// Cursors are totally ordered by `(sort_key, tie_break_id)`, the same order as
/// [`ItemKey`]. Only [`CursorCodec`] knows how a cursor looks on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cursor {
    #[serde(rename = "k")]
    pub sort_key: i64,
    #[serde(rename = "i")]
    pub tie_break_id: String,
}

impl Cursor {
    pub fn new(sort_key: i64, tie_break_id: impl Into<String>) -> Self {
        Self {
            sort_key,
            tie_break_id: tie_break_id.into(),
        }
    }

    /// Cursor pointing at the given item
    pub fn from_item<T: Item>(item: &T) -> Self {
        Self::new(item.sort_key(), item.id())
    }

    /// Whether the item sorts strictly before this cursor
    pub fn is_after(&self, key: &ItemKey) -> bool {
        (key.sort_key, key.id.as_str()) < (self.sort_key, self.tie_break_id.as_str())
    }
}

impl From<&ItemKey> for Cursor {
    fn from(key: &ItemKey) -> Self {
        Self::new(key.sort_key, key.id.clone())
    }
}

/// Opaque, transportable form of a [`Cursor`]
///
/// Callers store and replay tokens as-is; they must not look inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorToken(String);

impl CursorToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for CursorToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CursorToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes cursors into tokens and back
///
/// A token is `v1.` followed by the percent-encoded compact JSON of the
/// pointer. Decoding is strict: anything that was not produced by [`encode`]
/// is rejected with a [`DecodeError`].
///
/// [`encode`]: CursorCodec::encode
pub struct CursorCodec;

impl CursorCodec {
    pub fn encode(cursor: &Cursor) -> CursorToken {
        // Serializing a struct of an integer and a string cannot fail
        let json = serde_json::to_string(cursor).unwrap_or_default();
        let payload = utf8_percent_encode(&json, NON_ALPHANUMERIC);
        CursorToken(format!("{TOKEN_VERSION}.{payload}"))
    }

    pub fn decode(token: &str) -> Result<Cursor, DecodeError> {
        let (version, payload) = token.split_once('.').ok_or(DecodeError::MissingPrefix)?;
        if version != TOKEN_VERSION {
            return Err(DecodeError::UnsupportedVersion(version.to_owned()));
        }

        let json = percent_decode_str(payload)
            .decode_utf8()
            .map_err(|_| DecodeError::Encoding)?;

        serde_json::from_str(&json).map_err(|e| DecodeError::Payload(e.to_string()))
    }

    /// Decode a token, failing closed
    ///
    /// A corrupt token yields `None`, which restarts pagination from the first
    /// page instead of surfacing an error.
    pub fn decode_or_restart(token: &str) -> Option<Cursor> {
        match Self::decode(token) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                log::warn!("Discarding unreadable cursor token, restarting pagination: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(Cursor::new(1_700_000_000, "note1abc"))]
    #[case(Cursor::new(0, ""))]
    #[case(Cursor::new(-42, "negative"))]
    #[case(Cursor::new(i64::MAX, "max"))]
    #[case(Cursor::new(i64::MIN, "min"))]
    #[case(Cursor::new(1000, "ひらがな and spaces / slashes.dots"))]
    #[case(Cursor::new(1000, "{\"k\":1}"))]
    fn test_round_trip(#[case] cursor: Cursor) {
        let token = CursorCodec::encode(&cursor);
        assert_eq!(CursorCodec::decode(&token), Ok(cursor));
    }

    #[test]
    fn test_token_is_opaque_ascii() {
        let token = CursorCodec::encode(&Cursor::new(1000, "a b/c"));

        assert!(token.starts_with("v1."));
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '%' || c == '.'));
    }

    #[rstest]
    #[case("", DecodeError::MissingPrefix)]
    #[case("garbage", DecodeError::MissingPrefix)]
    #[case("v2.%7B%7D", DecodeError::UnsupportedVersion("v2".to_owned()))]
    #[case("v1.%FF%FE", DecodeError::Encoding)]
    fn test_decode_errors(#[case] token: &str, #[case] expected: DecodeError) {
        assert_eq!(CursorCodec::decode(token), Err(expected));
    }

    #[rstest]
    #[case("v1.")]
    #[case("v1.not-json")]
    #[case("v1.%7B%22k%22%3A1%7D")]
    #[case("v1.%7B%22k%22%3A1%2C%22i%22%3A%22a%22%2C%22x%22%3A1%7D")]
    #[case("v1.%7B%22k%22%3A%22one%22%2C%22i%22%3A%22a%22%7D")]
    fn test_decode_malformed_payload(#[case] token: &str) {
        assert!(matches!(
            CursorCodec::decode(token),
            Err(DecodeError::Payload(_))
        ));
    }

    #[test]
    fn test_tampered_token_fails_closed() {
        let token = CursorCodec::encode(&Cursor::new(1000, "abc"));
        let tampered = token.as_str().replacen("%7B", "%5B", 1);

        assert!(CursorCodec::decode(&tampered).is_err());
        assert_eq!(CursorCodec::decode_or_restart(&tampered), None);
    }

    #[test]
    fn test_decode_or_restart_accepts_valid_token() {
        let cursor = Cursor::new(1000, "abc");
        let token = CursorCodec::encode(&cursor);

        assert_eq!(CursorCodec::decode_or_restart(&token), Some(cursor));
    }

    #[test]
    fn test_cursor_ordering() {
        let a = Cursor::new(1000, "b");
        let b = Cursor::new(1001, "a");
        let c = Cursor::new(1001, "b");

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }

    #[test]
    fn test_is_after() {
        let cursor = Cursor::new(1000, "m");

        assert!(cursor.is_after(&ItemKey::new(999, "z")));
        assert!(cursor.is_after(&ItemKey::new(1000, "a")));
        assert!(!cursor.is_after(&ItemKey::new(1000, "m")));
        assert!(!cursor.is_after(&ItemKey::new(1001, "a")));
    }
}
