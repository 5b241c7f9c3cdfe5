//! Post-encode byte rewrite for colour channels.
//!
//! The object-graph writer emits a colour channel that sits at its default as
//! a *named* float holding `0.0`. The game expects an *unnamed* `1.0`. Each
//! channel has its own 12-byte signature (the name differs), and each is
//! replaced by the same 5-byte entry. The tables below are data, the bytes
//! are matched exactly and never reinterpreted.

use log::trace;

/// `[named float tag][utf-16 flag][i32 len = 1][channel char, 0][f32 0.0]`
const fn channel_pattern(channel: u8) -> [u8; 12] {
    [0x1F, 0x01, 0x01, 0x00, 0x00, 0x00, channel, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// `[unnamed float tag][f32 1.0]`
pub const CHANNEL_REPLACEMENT: [u8; 5] = [0x20, 0x00, 0x00, 0x80, 0x3F];

pub const RED_CHANNEL_PATTERN: [u8; 12] = channel_pattern(b'r');
pub const GREEN_CHANNEL_PATTERN: [u8; 12] = channel_pattern(b'g');
pub const BLUE_CHANNEL_PATTERN: [u8; 12] = channel_pattern(b'b');
pub const ALPHA_CHANNEL_PATTERN: [u8; 12] = channel_pattern(b'a');

/// Search/replace pairs, applied in this order.
pub const COLOR_CHANNEL_PATCHES: [(&[u8; 12], &[u8; 5]); 4] = [
    (&RED_CHANNEL_PATTERN, &CHANNEL_REPLACEMENT),
    (&GREEN_CHANNEL_PATTERN, &CHANNEL_REPLACEMENT),
    (&BLUE_CHANNEL_PATTERN, &CHANNEL_REPLACEMENT),
    (&ALPHA_CHANNEL_PATTERN, &CHANNEL_REPLACEMENT),
];

/// First index `>= start` where `pattern` occurs in `data`.
pub fn find_bytes(data: &[u8], pattern: &[u8], start: usize) -> Option<usize> {
    if pattern.is_empty() || start > data.len() {
        return None;
    }
    data[start..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|i| i + start)
}

/// Replaces every non-overlapping occurrence of `search`, scanning left to
/// right and resuming right after each inserted `replace`.
pub fn replace_bytes(data: &[u8], search: &[u8], replace: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut index = 0;

    while let Some(found) = find_bytes(data, search, index) {
        trace!("[patch] {} bytes at {found}", search.len());
        result.extend_from_slice(&data[index..found]);
        result.extend_from_slice(replace);
        index = found + search.len();
    }
    result.extend_from_slice(&data[index..]);

    result
}

/// Applies every entry of [`COLOR_CHANNEL_PATCHES`]. Input without a match
/// comes back unchanged.
pub fn fix_color_channels(data: &[u8]) -> Vec<u8> {
    let mut data = data.to_vec();
    for (search, replace) in COLOR_CHANNEL_PATCHES.iter() {
        data = replace_bytes(&data, &search[..], &replace[..]);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn red_channel_shrinks_by_seven() {
        let mut data = vec![0xAA, 0xBB];
        data.extend_from_slice(&RED_CHANNEL_PATTERN);
        data.extend_from_slice(&[0xCC]);

        let fixed = fix_color_channels(&data);
        assert_eq!(fixed.len(), data.len() - 7);
        assert_eq!(fixed, [0xAA, 0xBB, 0x20, 0x00, 0x00, 0x80, 0x3F, 0xCC]);
    }

    #[test]
    fn all_channels_are_rewritten() {
        let mut data = Vec::new();
        for (search, _) in COLOR_CHANNEL_PATCHES.iter() {
            data.extend_from_slice(&search[..]);
        }
        let fixed = fix_color_channels(&data);
        assert_eq!(fixed, CHANNEL_REPLACEMENT.repeat(4));
    }

    #[test]
    fn overlapping_candidates_match_left_to_right() {
        assert_eq!(replace_bytes(b"aaaa", b"aa", b"b"), b"bb");
        assert_eq!(replace_bytes(b"aaa", b"aa", b"b"), b"ba");
    }

    #[test]
    fn no_match_is_noop() {
        let data = [0x1F, 0x01, 0x01, 0x00, 0x00, 0x00, b'x', 0, 0, 0, 0, 0];
        assert_eq!(fix_color_channels(&data), data);
        assert!(fix_color_channels(&[]).is_empty());
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let mut rng = rand::rng();

        for _ in 0..500 {
            let mut data = Vec::new();
            for _ in 0..rng.random_range(0..8) {
                let noise: Vec<u8> = (0..rng.random_range(0..16)).map(|_| rng.random()).collect();
                data.extend_from_slice(&noise);
                let (search, _) = COLOR_CHANNEL_PATCHES[rng.random_range(0..4)];
                data.extend_from_slice(&search[..]);
            }

            let once = fix_color_channels(&data);
            let twice = fix_color_channels(&once);
            assert_eq!(once, twice, "input {data:02X?}");
        }
    }
}
