//! Unpadded base64url codec (RFC 4648 §5) used by every VAPID artifact.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use crate::{PushError, Result};

/// Encode bytes as base64url without `=` padding.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode an unpadded base64url string.
///
/// The URL-safe alphabet is mapped back to the standard one and the input is
/// re-padded to a multiple of four before decoding, so strings that already
/// carry their padding are accepted too. Input that cannot be decoded fails
/// with [`PushError::Decode`]; partial output is never returned.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let mut standard: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let padding = (4 - standard.len() % 4) % 4;
    standard.extend(std::iter::repeat_n('=', padding));

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| PushError::Decode(format!("{} (input length {})", e, input.len())))
}
