use crate::bytesearch::ByteBitmap;
use crate::codepointset::{Interval, CODE_POINT_MAX};
use core::ops::{Index, IndexMut};
use core::slice::SliceIndex;

// A macro which expresses either checked or unchecked reachability, depending on prohibit-unsafe.
macro_rules! rs_unreachable {
    () => {{
        if cfg!(feature = "prohibit-unsafe") {
            unreachable!();
        } else {
            unsafe { core::hint::unreachable_unchecked() }
        }
    }};
    ($msg:expr) => {
        if cfg!(feature = "prohibit-unsafe") {
            unreachable!($msg);
        } else {
            unsafe { core::hint::unreachable_unchecked() }
        }
    };
}

// Logging goes through the `log` facade when the "logging" feature is on and
// compiles away otherwise.
macro_rules! debug {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::debug!($($tt)*);
        }
    };
}

macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "logging")]
        {
            log::trace!($($tt)*);
        }
    };
}

/// A trait which performs bounds checking only in debug mode.
pub trait DebugCheckIndex<Idx>: Index<Idx> + IndexMut<Idx> {
    fn iat(&self, index: Idx) -> &Self::Output;
    fn mat(&mut self, index: Idx) -> &mut Self::Output;
}

impl<Idx, T> DebugCheckIndex<Idx> for Vec<T>
where
    Idx: SliceIndex<[T]> + Clone,
{
    #[inline(always)]
    fn iat(&self, idx: Idx) -> &Self::Output {
        debug_assert!(self.get(idx.clone()).is_some(), "Index out of bounds");
        if cfg!(feature = "prohibit-unsafe") {
            self.index(idx)
        } else {
            unsafe { self.get_unchecked(idx) }
        }
    }

    #[inline(always)]
    fn mat(&mut self, idx: Idx) -> &mut Self::Output {
        debug_assert!(self.get(idx.clone()).is_some(), "Index out of bounds");
        if cfg!(feature = "prohibit-unsafe") {
            self.index_mut(idx)
        } else {
            unsafe { self.get_unchecked_mut(idx) }
        }
    }
}

impl<Idx, T> DebugCheckIndex<Idx> for [T]
where
    Idx: SliceIndex<[T]> + Clone,
{
    #[inline(always)]
    fn iat(&self, idx: Idx) -> &Self::Output {
        debug_assert!(self.get(idx.clone()).is_some(), "Index out of bounds");
        if cfg!(feature = "prohibit-unsafe") {
            self.index(idx)
        } else {
            unsafe { self.get_unchecked(idx) }
        }
    }

    #[inline(always)]
    fn mat(&mut self, idx: Idx) -> &mut Self::Output {
        debug_assert!(self.get(idx.clone()).is_some(), "Index out of bounds");
        if cfg!(feature = "prohibit-unsafe") {
            self.index_mut(idx)
        } else {
            unsafe { self.get_unchecked_mut(idx) }
        }
    }
}

/// Convert a u32 to a char for pattern matching against literals, saturating
/// at the largest char.
pub fn to_char_sat(c: u32) -> char {
    char::from_u32(c).unwrap_or(char::MAX)
}

/// \return the first byte of a UTF-8 encoded code point.
#[inline(always)]
pub fn utf8_first_byte(cp: u32) -> u8 {
    debug_assert!(cp <= CODE_POINT_MAX);
    if cp < 0x80 {
        cp as u8
    } else if cp < 0x800 {
        ((cp >> 6) & 0x1F) as u8 | 0b1100_0000
    } else if cp < 0x10000 {
        ((cp >> 12) & 0x0F) as u8 | 0b1110_0000
    } else {
        ((cp >> 18) & 0x07) as u8 | 0b1111_0000
    }
}

/// Add all of the first bytes of a code point interval to a byte bitmap.
/// If \p utf is false, code points are bytes and only [0, 255] is added.
pub fn add_first_bytes_to_bitmap(interval: Interval, utf: bool, bitmap: &mut ByteBitmap) {
    let Interval { first, last } = interval;
    if !utf {
        if first <= 0xFF {
            for byte in first..=last.min(0xFF) {
                bitmap.set(byte as u8);
            }
        }
        return;
    }
    let ranges = [
        (first, last.min(0x7F)),
        (first.max(0x80), last.min(0x7FF)),
        (first.max(0x800), last.min(0xFFFF)),
        (first.max(0x10000), last),
    ];
    for (first, last) in ranges.into_iter() {
        if first <= last {
            for byte in utf8_first_byte(first)..=utf8_first_byte(last) {
                bitmap.set(byte);
            }
        }
    }
}

/// Encode a code point as UTF-8 into \p buff, returning the used prefix.
/// Surrogates and other non-chars yield None.
pub fn encode_utf8(cp: u32, buff: &mut [u8; 4]) -> Option<&[u8]> {
    let c = char::from_u32(cp)?;
    Some(c.encode_utf8(buff).as_bytes())
}

/// \return true if \p b is a UTF8 continuation byte.
#[inline(always)]
pub fn is_utf8_continuation(b: u8) -> bool {
    (b & 0b1100_0000) == 0b1000_0000
}

/// \return the length of a UTF8 sequence introduced by lead byte \p b, or 0
/// if \p b cannot start a sequence.
#[inline(always)]
const fn utf8_seq_len(b: u8) -> usize {
    match b {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

/// Decode the code point starting at \p pos.
/// Malformed sequences decode as their lead byte with length 1, so decoding
/// never fails and never reads out of bounds.
#[inline(always)]
pub fn decode_utf8_right(bytes: &[u8], pos: usize) -> Option<(u32, usize)> {
    let b0 = *bytes.get(pos)?;
    if b0 < 0x80 {
        return Some((b0 as u32, 1));
    }
    let len = utf8_seq_len(b0);
    if len < 2 || pos + len > bytes.len() {
        return Some((b0 as u32, 1));
    }
    let seq = &bytes[pos..pos + len];
    match core::str::from_utf8(seq) {
        Ok(s) => s.chars().next().map(|c| (c as u32, len)),
        Err(_) => Some((b0 as u32, 1)),
    }
}

/// Decode the code point ending just before \p pos.
/// Malformed sequences decode as a single byte.
#[inline(always)]
pub fn decode_utf8_left(bytes: &[u8], pos: usize) -> Option<(u32, usize)> {
    if pos == 0 || pos > bytes.len() {
        return None;
    }
    let z = bytes[pos - 1];
    if z < 0x80 || !is_utf8_continuation(z) {
        return Some((z as u32, 1));
    }
    let lowest = pos.saturating_sub(4);
    let mut start = pos - 1;
    while start > lowest && is_utf8_continuation(bytes[start]) {
        start -= 1;
    }
    match decode_utf8_right(bytes, start) {
        Some((cp, len)) if start + len == pos => Some((cp, len)),
        _ => Some((z as u32, 1)),
    }
}

/// Validate that \p bytes is UTF-8.
/// \return the offset of the first invalid byte on failure.
pub fn validate_utf8(bytes: &[u8]) -> Result<(), usize> {
    match core::str::from_utf8(bytes) {
        Ok(_) => Ok(()),
        Err(err) => Err(err.valid_up_to()),
    }
}

/// \return whether \p pos lies on a UTF-8 sequence boundary of \p bytes.
pub fn is_utf8_boundary(bytes: &[u8], pos: usize) -> bool {
    match bytes.get(pos) {
        None => pos == bytes.len(),
        Some(&b) => !is_utf8_continuation(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_both_directions() {
        let text = "a\u{E9}\u{20AC}\u{1F600}z";
        let bytes = text.as_bytes();
        let mut pos = 0;
        let mut forwards = Vec::new();
        while let Some((cp, len)) = decode_utf8_right(bytes, pos) {
            forwards.push(cp);
            pos += len;
        }
        let expected: Vec<u32> = text.chars().map(u32::from).collect();
        assert_eq!(forwards, expected);

        let mut backwards = Vec::new();
        while let Some((cp, len)) = decode_utf8_left(bytes, pos) {
            backwards.push(cp);
            pos -= len;
        }
        backwards.reverse();
        assert_eq!(backwards, expected);
    }

    #[test]
    fn malformed_utf8_decodes_bytewise() {
        let bytes = [b'a', 0xFF, 0xE2, 0x82, b'b'];
        assert_eq!(decode_utf8_right(&bytes, 1), Some((0xFF, 1)));
        assert_eq!(decode_utf8_right(&bytes, 2), Some((0xE2, 1)));
        assert_eq!(decode_utf8_left(&bytes, 4), Some((0x82, 1)));
        assert_eq!(validate_utf8(&bytes), Err(1));
    }

    #[test]
    fn first_bytes() {
        for &cp in &[0x0, 0x7F, 0x80, 0x7FF, 0x800, 0xFFFF, 0x10000, CODE_POINT_MAX] {
            let mut buff = [0; 4];
            let bytes = encode_utf8(cp, &mut buff).unwrap();
            assert_eq!(bytes[0], utf8_first_byte(cp));
        }
        let mut bitmap = ByteBitmap::default();
        add_first_bytes_to_bitmap(Interval::new(0x41, 0x43), true, &mut bitmap);
        assert_eq!(bitmap.count_bits(), 3);
        let mut bitmap = ByteBitmap::default();
        add_first_bytes_to_bitmap(Interval::new(0xF0, 0x1000), false, &mut bitmap);
        assert_eq!(bitmap.count_bits(), 16);
    }
}
