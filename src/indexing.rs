use crate::bytesearch::ByteSearcher;
use crate::folds;
use crate::util::{decode_utf8_left, decode_utf8_right};

/// A helper type that holds a subject and allows indexing into it.
/// Positions are byte offsets. Elements are code points: decoded UTF-8 for
/// `Utf8Input`, raw bytes for `ByteInput`.
pub trait InputIndexer: core::fmt::Debug + Copy + Clone {
    /// Whether elements are decoded from UTF-8.
    const UTF: bool;

    /// \return the byte contents.
    fn contents(&self) -> &[u8];

    /// \return the length of the contents, in bytes.
    #[inline(always)]
    fn bytelength(&self) -> usize {
        self.contents().len()
    }

    /// \return the char to the right of (starting at) \p pos, or None if we
    /// are at the end. Advance the position by its length.
    fn next_right(&self, pos: &mut usize) -> Option<u32>;

    /// \return the char to the left of (ending just before) \p pos, or None if
    /// we are at the start. Retreat the position by its length.
    fn next_left(&self, pos: &mut usize) -> Option<u32>;

    /// Case-fold an element.
    #[inline(always)]
    fn fold(c: u32) -> u32 {
        folds::fold(c, Self::UTF)
    }

    /// \return the byte to the right of \p pos, or None at the end.
    #[inline(always)]
    fn peek_byte_right(&self, pos: usize) -> Option<u8> {
        self.contents().get(pos).copied()
    }

    /// \return the byte to the left of \p pos, or None at the start.
    #[inline(always)]
    fn peek_byte_left(&self, pos: usize) -> Option<u8> {
        if pos == 0 {
            None
        } else {
            self.contents().get(pos - 1).copied()
        }
    }

    #[inline(always)]
    fn peek_right(&self, mut pos: usize) -> Option<u32> {
        self.next_right(&mut pos)
    }

    #[inline(always)]
    fn peek_left(&self, mut pos: usize) -> Option<u32> {
        self.next_left(&mut pos)
    }

    /// Find the next match of a byte searcher at or after \p pos.
    /// \return the position of the match.
    #[inline]
    fn find_bytes<Search: ByteSearcher>(&self, pos: usize, search: &Search) -> Option<usize> {
        let rem = self.contents().get(pos..)?;
        search.find_in(rem).map(|idx| pos + idx)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Utf8Input<'a> {
    input: &'a [u8],
}

impl<'a> Utf8Input<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }
}

impl<'a> InputIndexer for Utf8Input<'a> {
    const UTF: bool = true;

    #[inline(always)]
    fn contents(&self) -> &[u8] {
        self.input
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        let b0 = *self.input.get(*pos)?;
        if b0 < 0x80 {
            *pos += 1;
            return Some(b0 as u32);
        }
        let (cp, len) = decode_utf8_right(self.input, *pos)?;
        *pos += len;
        Some(cp)
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        let (cp, len) = decode_utf8_left(self.input, *pos)?;
        *pos -= len;
        Some(cp)
    }
}

/// Input in which every byte is a character.
#[derive(Debug, Copy, Clone)]
pub struct ByteInput<'a> {
    input: &'a [u8],
}

impl<'a> ByteInput<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input }
    }
}

impl<'a> InputIndexer for ByteInput<'a> {
    const UTF: bool = false;

    #[inline(always)]
    fn contents(&self) -> &[u8] {
        self.input
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        let b = *self.input.get(*pos)?;
        *pos += 1;
        Some(b as u32)
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        if *pos == 0 {
            return None;
        }
        let b = *self.input.get(*pos - 1)?;
        *pos -= 1;
        Some(b as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_walks_code_points() {
        let input = Utf8Input::new("x\u{e9}y".as_bytes());
        let mut pos = 0;
        assert_eq!(input.next_right(&mut pos), Some('x' as u32));
        assert_eq!(input.next_right(&mut pos), Some(0xE9));
        assert_eq!(pos, 3);
        assert_eq!(input.next_left(&mut pos), Some(0xE9));
        assert_eq!(pos, 1);
        assert_eq!(input.peek_left(0), None);
        assert_eq!(input.peek_right(4), None);
    }

    #[test]
    fn bytes_walk_bytes() {
        let input = ByteInput::new("\u{e9}".as_bytes());
        let mut pos = 0;
        assert_eq!(input.next_right(&mut pos), Some(0xC3));
        assert_eq!(input.next_right(&mut pos), Some(0xA9));
        assert_eq!(input.next_right(&mut pos), None);
        assert_eq!(input.next_left(&mut pos), Some(0xA9));
        assert_eq!(ByteInput::fold('Q' as u32), 'q' as u32);
        assert_eq!(ByteInput::fold(0xC9), 0xC9);
        assert_eq!(Utf8Input::fold(0xC9), 0xE9);
    }
}
