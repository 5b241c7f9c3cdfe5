//! Outer framing of `.dat` / `.bytes` files.
//!
//! Files exported from asset editors carry a small header in front of the
//! payload:
//!
//! ```text
//! [i32 name length][UTF-8 name][pad to 4][i32 payload length][payload][pad to 4]
//! ```
//!
//! Files written by the game itself are just `[payload]`. Nothing in the data
//! says which one it is, see [`has_header`].

use byteorder::{ReadBytesExt, LE};
use log::debug;
use std::io::Cursor;

use crate::io::utils::{padding, truncated, ReadUtils, WriteUtils};
use crate::io::Result;

/// Guesses whether `bytes` starts with a header.
///
/// Looks at the low byte of what would be the name length. Payloads start
/// with a small tag byte, so anything above 2 is taken as a name length.
/// Names of length 0, 1 or 2 (and any length whose low byte is 0..=2) are
/// therefore read as "no header". Existing files depend on this rule.
pub fn has_header(bytes: &[u8]) -> bool {
    bytes.first().is_some_and(|&first| first > 2)
}

/// Parses a header unconditionally and returns `(name, payload)`.
///
/// The payload length stored in the header is read and ignored; the payload
/// is everything after the header, trailing padding included.
pub fn strip_header(bytes: &[u8]) -> Result<(String, &[u8])> {
    let mut r = Cursor::new(bytes);

    let name = r.read_aligned_string("header name")?;
    let payload_len = r.read_i32::<LE>().map_err(truncated("header payload length"))?;
    debug!("[header] name = {name:?}, payload length = {payload_len}");

    let offset = r.position() as usize;
    Ok((name, &bytes[offset..]))
}

/// Strips the header when [`has_header`] says there is one.
/// Without a header the name is empty and the payload is the whole buffer.
pub fn split_container(bytes: &[u8]) -> Result<(String, &[u8])> {
    if has_header(bytes) {
        strip_header(bytes)
    } else {
        debug!("[header] none");
        Ok((String::new(), bytes))
    }
}

/// Frames `payload` with a header for `name`. `pad_payload` appends zero
/// padding after the payload (binary payloads only).
pub fn add_header(name: &str, payload: &[u8], pad_payload: bool) -> Result<Vec<u8>> {
    let mut w = Vec::with_capacity(name.len() + payload.len() + 16);

    w.write_aligned_string(name)?;
    w.write_len(payload.len(), "payload")?;
    w.extend_from_slice(payload);
    if pad_payload {
        w.write_padding(payload.len())?;
    }

    Ok(w)
}

/// Payload followed by zero padding up to a multiple of 4.
pub fn pad_to_4(payload: &[u8]) -> Vec<u8> {
    let mut w = Vec::with_capacity(payload.len() + 3);
    w.extend_from_slice(payload);
    w.resize(payload.len() + padding(payload.len()), 0);
    w
}

/// Reads back the payload length recorded in a header. Mostly for tooling,
/// decoding never relies on it.
pub fn header_payload_len(bytes: &[u8]) -> Result<usize> {
    let mut r = Cursor::new(bytes);
    r.read_aligned_string("header name")?;
    r.read_len("header payload length")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Error;

    const PAYLOAD: &[u8] = &[0x01, 0x02, 0x03, 0x04, 0x05];

    #[test]
    fn header_layout() {
        let framed = add_header("peg", PAYLOAD, true).unwrap();
        assert_eq!(
            framed,
            [
                3, 0, 0, 0, b'p', b'e', b'g', 0, // name + pad
                5, 0, 0, 0, // payload length
                1, 2, 3, 4, 5, 0, 0, 0, // payload + pad
            ]
        );
        assert_eq!(header_payload_len(&framed).unwrap(), 5);
    }

    #[test]
    fn unpadded_payload_for_json() {
        let framed = add_header("pegboard", b"{}", false).unwrap();
        assert_eq!(framed.len(), 4 + 8 + 4 + 2);
    }

    #[test]
    fn strip_reverses_add() {
        for name in ["", "a", "ab", "abc", "abcd", "abcde", "level_1-3", "ünïcödé"] {
            let framed = add_header(name, PAYLOAD, false).unwrap();
            let (stripped_name, payload) = strip_header(&framed).unwrap();
            assert_eq!(stripped_name, name);
            assert_eq!(payload, PAYLOAD);
        }
    }

    #[test]
    fn detection_matches_documented_heuristic() {
        for len in [3usize, 4, 5, 17, 255] {
            let name = "x".repeat(len);
            let framed = add_header(&name, PAYLOAD, false).unwrap();
            let (stripped_name, payload) = split_container(&framed).unwrap();
            assert_eq!(stripped_name, name);
            assert_eq!(payload, PAYLOAD);
        }
        // Short names (and lengths whose low byte is 0..=2) are misread as headerless.
        for len in [0usize, 1, 2, 256, 258] {
            let framed = add_header(&"x".repeat(len), PAYLOAD, false).unwrap();
            let (stripped_name, payload) = split_container(&framed).unwrap();
            assert_eq!(stripped_name, "");
            assert_eq!(payload, &framed[..]);
        }
    }

    #[test]
    fn headerless_input() {
        assert!(!has_header(&[]));
        assert!(!has_header(&[0x02, 0xFF]));
        assert!(has_header(&[0x03]));
        assert_eq!(split_container(&[]).unwrap(), (String::new(), &[][..]));
    }

    #[test]
    fn truncated_headers_fail() {
        // Length prefix cut short.
        assert!(matches!(strip_header(&[5, 0]), Err(Error::Truncated { .. })));
        // Name longer than the buffer.
        assert!(matches!(strip_header(&[9, 0, 0, 0, b'a', b'b']), Err(Error::Truncated { .. })));
        // Missing padding.
        assert!(matches!(strip_header(&[3, 0, 0, 0, b'a', b'b', b'c']), Err(Error::Truncated { .. })));
        // Missing payload length.
        assert!(matches!(
            strip_header(&[3, 0, 0, 0, b'a', b'b', b'c', 0, 1]),
            Err(Error::Truncated { what: "header payload length" })
        ));
    }

    #[test]
    fn invalid_name_is_rejected() {
        let framed = [4, 0, 0, 0, 0xFF, 0xFE, 0xFD, 0xFC, 0, 0, 0, 0];
        assert!(matches!(strip_header(&framed), Err(Error::InvalidUtf8 { .. })));
    }

    #[test]
    fn padding_bytes_are_zero() {
        for len in 0..16 {
            let padded = pad_to_4(&vec![0xEE; len]);
            assert_eq!(padded.len() % 4, 0);
            assert!(padded.len() >= len && padded.len() < len + 4);
            assert!(padded[len..].iter().all(|&b| b == 0));
        }
    }
}
