//! Portable session-string envelopes.
//!
//! The two client-library flavours package their string sessions differently:
//! Telethon-style strings are padded url-safe base64 behind a version marker,
//! Pyrogram-style strings are unpadded url-safe base64. Both envelopes here
//! wrap the serialized session payload produced by the login client.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;

/// Version marker prefixed to Telethon-style strings
pub const TELETHON_VERSION: char = '1';

/// Encode a session payload as a Telethon-style string
#[must_use]
pub fn encode_telethon(payload: &[u8]) -> String {
    format!("{TELETHON_VERSION}{}", URL_SAFE.encode(payload))
}

/// Encode a session payload as a Pyrogram-style string
#[must_use]
pub fn encode_pyrogram(payload: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(payload)
}

/// Recover the payload from a Telethon-style string
#[must_use]
pub fn decode_telethon(value: &str) -> Option<Vec<u8>> {
    let body = value.strip_prefix(TELETHON_VERSION)?;
    URL_SAFE.decode(body).ok()
}

/// Recover the payload from a Pyrogram-style string
#[must_use]
pub fn decode_pyrogram(value: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"\x01\x02session payload\xff\xfe";

    #[test]
    fn test_telethon_envelope() {
        let encoded = encode_telethon(PAYLOAD);
        assert!(encoded.starts_with(TELETHON_VERSION));
        assert_eq!(decode_telethon(&encoded).as_deref(), Some(PAYLOAD));
    }

    #[test]
    fn test_pyrogram_envelope_is_unpadded() {
        let encoded = encode_pyrogram(PAYLOAD);
        assert!(!encoded.contains('='));
        assert_eq!(decode_pyrogram(&encoded).as_deref(), Some(PAYLOAD));
    }

    #[test]
    fn test_envelopes_are_distinct() {
        assert_ne!(encode_telethon(PAYLOAD), encode_pyrogram(PAYLOAD));
        // A Pyrogram-style string is not mistaken for a Telethon-style one
        assert_eq!(decode_telethon(&encode_pyrogram(b"AAAA")), None);
    }
}
