//! Modified UTF-8 as used by `CONSTANT_Utf8_info` (JVMS §4.4.7).
//!
//! Differences from standard UTF-8: `U+0000` is encoded as the two bytes `C0 80`, and
//! supplementary characters are encoded as a surrogate pair with each surrogate taking
//! three bytes. Valid standard UTF-8 without NUL or supplementary characters is identical
//! in both encodings, which is the fast path taken by [`decode`].

use crate::Result;

/// Decode modified UTF-8 bytes into a `String`.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] on truncated sequences, invalid lead bytes or
/// unpaired surrogates.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if let Some(text) = fast_path(bytes) {
        return Ok(text);
    }
    String::from_utf16(&decode_units(bytes)?)
        .map_err(|_| malformed_error!("Unpaired surrogate in modified UTF-8"))
}

/// Decode modified UTF-8 only if the text re-encodes to exactly the same bytes.
///
/// Returns `Ok(None)` for structurally valid input that has no exact `String` form: lone
/// surrogates, which the JVM accepts in string constants, and non-shortest encodings.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] on truncated sequences, raw NUL bytes or invalid lead
/// bytes.
pub fn decode_exact(bytes: &[u8]) -> Result<Option<String>> {
    if let Some(text) = fast_path(bytes) {
        return Ok(Some(text));
    }
    let units = decode_units(bytes)?;
    Ok(String::from_utf16(&units)
        .ok()
        .filter(|text| encode(text) == bytes))
}

// Plain UTF-8 without NUL, surrogates or 4-byte forms is already canonical modified UTF-8.
fn fast_path(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| *b == 0xC0 || *b == 0xED || *b == 0x00 || *b >= 0xF0) {
        return None;
    }
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

fn decode_units(bytes: &[u8]) -> Result<Vec<u16>> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let first = bytes[index];
        if first & 0x80 == 0 {
            if first == 0 {
                return Err(malformed_error!("NUL byte in modified UTF-8 at {}", index));
            }
            units.push(u16::from(first));
            index += 1;
        } else if first & 0xE0 == 0xC0 {
            let second = continuation(bytes, index + 1)?;
            units.push((u16::from(first & 0x1F) << 6) | u16::from(second));
            index += 2;
        } else if first & 0xF0 == 0xE0 {
            let second = continuation(bytes, index + 1)?;
            let third = continuation(bytes, index + 2)?;
            units.push(
                (u16::from(first & 0x0F) << 12) | (u16::from(second) << 6) | u16::from(third),
            );
            index += 3;
        } else {
            return Err(malformed_error!(
                "Invalid modified UTF-8 lead byte 0x{:02X} at {}",
                first,
                index
            ));
        }
    }
    Ok(units)
}

fn continuation(bytes: &[u8], index: usize) -> Result<u8> {
    match bytes.get(index) {
        Some(byte) if byte & 0xC0 == 0x80 => Ok(byte & 0x3F),
        Some(byte) => Err(malformed_error!(
            "Invalid continuation byte 0x{:02X} at {}",
            byte,
            index
        )),
        None => Err(malformed_error!("Truncated modified UTF-8 sequence")),
    }
}

/// Encode a string as modified UTF-8.
#[must_use]
pub fn encode(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for unit in text.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_unchanged() -> Result<()> {
        assert_eq!(encode("java/lang/Object"), b"java/lang/Object".to_vec());
        assert_eq!(decode(b"java/lang/Object")?, "java/lang/Object");
        Ok(())
    }

    #[test]
    fn nul_uses_two_bytes() -> Result<()> {
        let encoded = encode("a\0b");
        assert_eq!(encoded, vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(decode(&encoded)?, "a\0b");
        Ok(())
    }

    #[test]
    fn supplementary_uses_surrogates() -> Result<()> {
        let encoded = encode("\u{1F600}");
        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded[0], 0xED);
        assert_eq!(decode(&encoded)?, "\u{1F600}");
        Ok(())
    }

    #[test]
    fn two_and_three_byte_forms() -> Result<()> {
        let text = "Grüße, 世界";
        assert_eq!(decode(&encode(text))?, text);
        Ok(())
    }

    #[test]
    fn lone_surrogate_has_no_exact_text() -> Result<()> {
        let bytes = [0xED, 0xA0, 0x80, b'x'];
        assert!(decode(&bytes).is_err());
        assert_eq!(decode_exact(&bytes)?, None);
        assert_eq!(decode_exact(&encode("\u{1F600}"))?, Some("\u{1F600}".to_string()));
        Ok(())
    }

    #[test]
    fn overlong_form_has_no_exact_text() -> Result<()> {
        // 'A' spelled with two bytes
        assert_eq!(decode(&[0xC1, 0x81])?, "A");
        assert_eq!(decode_exact(&[0xC1, 0x81])?, None);
        Ok(())
    }

    #[test]
    fn raw_nul_rejected() {
        assert!(decode(&[b'a', 0x00]).is_err());
        assert!(decode(&[0xC3]).is_err());
        assert!(decode_exact(&[b'a', 0x00]).is_err());
    }
}
