//! Decoding of the "modified UTF-8" encoding used by `CONSTANT_Utf8` entries.

/// Decode modified UTF-8 into a Rust string.
///
/// Plain UTF-8 (the overwhelmingly common case for symbol names) is accepted
/// directly. Otherwise the two-byte null (`C0 80`) and surrogate pairs encoded
/// as two three-byte sequences are decoded; anything else that is malformed
/// becomes `U+FFFD`.
pub(crate) fn decode(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            units.push(u16::from(b0));
            i += 1;
        } else if b0 & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            let b1 = bytes[i + 1];
            units.push((u16::from(b0 & 0x1F) << 6) | u16::from(b1 & 0x3F));
            i += 2;
        } else if b0 & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            let b1 = bytes[i + 1];
            let b2 = bytes[i + 2];
            units.push(
                (u16::from(b0 & 0x0F) << 12) | (u16::from(b1 & 0x3F) << 6) | u16::from(b2 & 0x3F),
            );
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }

    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_ascii() {
        assert_eq!(decode(b"lambda$render$0"), "lambda$render$0");
    }

    #[test]
    fn test_encoded_null() {
        assert_eq!(decode(&[b'a', 0xC0, 0x80, b'b']), "a\0b");
    }

    #[test]
    fn test_surrogate_pair() {
        // U+1F600 as a CESU-8 style surrogate pair
        let bytes = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode(&bytes), "\u{1F600}");
    }
}
