//! Ordered response decoding.
//!
//! The backend answers the same logical endpoint with structurally
//! different bodies and no version discriminator: a `{"data": ...}`
//! wrapper, an object with a named field, the value itself, or (for order
//! placement) a bare 24-hex identifier. One fixed list of strategies is
//! applied to every response; the first strategy whose candidate value
//! deserializes as `T` wins.
//!
//! Tolerating this many shapes is a workaround for an under-specified
//! backend contract. Keep the list short so genuine schema drift still
//! surfaces as [`CourierError::DecodingFailed`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{CourierError, Result};

/// Field holding the payload in wrapper objects.
const WRAPPER_FIELD: &str = "data";

/// One way of locating the payload inside a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// `{"data": <payload>}`.
    Wrapper,
    /// `{"<key>": <payload>}`, at the top level or inside `data`.
    NamedKey,
    /// The whole body is the payload (raw array or object).
    Raw,
    /// The body is a bare identifier, quoted or not.
    BareIdentifier,
}

/// Strategies in the order they are tried.
pub const STRATEGIES: [DecodeStrategy; 4] = [
    DecodeStrategy::Wrapper,
    DecodeStrategy::NamedKey,
    DecodeStrategy::Raw,
    DecodeStrategy::BareIdentifier,
];

/// Whether `s` is a 24-character lowercase-hex object id.
pub fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

impl DecodeStrategy {
    /// Candidate payload for this strategy, if the body has the right shape.
    fn extract(self, body: &[u8], parsed: Option<&Value>, key: Option<&str>) -> Option<Value> {
        match self {
            DecodeStrategy::Wrapper => parsed?.get(WRAPPER_FIELD).cloned(),
            DecodeStrategy::NamedKey => {
                let key = key?;
                let parsed = parsed?;
                parsed
                    .get(key)
                    .or_else(|| parsed.get(WRAPPER_FIELD).and_then(|d| d.get(key)))
                    .cloned()
            }
            DecodeStrategy::Raw => parsed.cloned(),
            DecodeStrategy::BareIdentifier => {
                let text = std::str::from_utf8(body).ok()?.trim();
                let text = text
                    .strip_prefix('"')
                    .and_then(|t| t.strip_suffix('"'))
                    .unwrap_or(text);
                is_object_id(text).then(|| Value::String(text.to_owned()))
            }
        }
    }
}

/// Decode `body` as `T`, trying every strategy in [`STRATEGIES`] order.
///
/// `key` names the field used by [`DecodeStrategy::NamedKey`]; without it
/// that strategy is skipped. An empty body is [`CourierError::NoData`].
pub fn decode<T: DeserializeOwned>(body: &[u8], key: Option<&str>) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(CourierError::NoData);
    }

    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let mut first_err = None;
    for strategy in STRATEGIES {
        let Some(candidate) = strategy.extract(body, parsed.as_ref(), key) else {
            continue;
        };
        match serde_json::from_value::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_err.get_or_insert_with(|| format!("{strategy:?}: {e}"));
            }
        }
    }

    Err(CourierError::DecodingFailed(first_err.unwrap_or_else(|| {
        "body matched no known response shape".to_owned()
    })))
}
