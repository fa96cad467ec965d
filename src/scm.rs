use crate::bytesearch::{AsciiBitmap, ByteBitmap};
use crate::cursor;
use crate::cursor::Direction;
use crate::indexing::InputIndexer;
use crate::matchers;
use crate::options::Newline;
use crate::types::BracketContents;

/// A trait for things that match a single character.
pub trait SingleCharMatcher<Input: InputIndexer, Dir: Direction> {
    /// \return whether we match the character at the given position, advancing
    /// the position if so. On a false return, the position is unspecified.
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool;
}

/// Insn::Char
pub struct Char {
    pub c: u32,
}
impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for Char {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        cursor::next(input, dir, pos) == Some(self.c)
    }
}

/// Insn::CharICase
pub struct CharICase {
    pub c: u32,
}
impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for CharICase {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos) {
            Some(c2) => c2 == self.c || Input::fold(c2) == self.c,
            _ => false,
        }
    }
}

/// Insn::CharSet
pub struct CharSet<'a> {
    pub chars: &'a [u32],
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for CharSet<'_> {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos) {
            Some(c) => self.chars.contains(&c),
            None => false,
        }
    }
}

/// Insn::Bracket
pub struct Bracket<'a> {
    pub bc: &'a BracketContents,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for Bracket<'_> {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos) {
            Some(c) => self.bc.bracket(c),
            _ => false,
        }
    }
}

/// Insn::AsciiBracket
pub struct AsciiBracket<'a> {
    pub bits: &'a AsciiBitmap,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for AsciiBracket<'_> {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        match cursor::next(input, dir, pos) {
            Some(c) => self.bits.contains(c),
            _ => false,
        }
    }
}

/// Insn::ByteSet, which matches a single byte.
pub struct MatchByteSet<'a> {
    pub bytes: &'a ByteBitmap,
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for MatchByteSet<'_> {
    #[inline(always)]
    fn matches(&self, input: &Input, _dir: Dir, pos: &mut usize) -> bool {
        let b = if Dir::FORWARD {
            input.peek_byte_right(*pos)
        } else {
            input.peek_byte_left(*pos)
        };
        match b {
            Some(b) if self.bytes.contains(b) => {
                if Dir::FORWARD {
                    *pos += 1
                } else {
                    *pos -= 1
                }
                true
            }
            _ => false,
        }
    }
}

/// Insn::ByteSeq, in byte mode where a one-byte sequence is one char.
pub struct MatchByteSeq<'a> {
    pub bytes: &'a [u8],
}

impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for MatchByteSeq<'_> {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        cursor::try_match_lit(input, dir, pos, self.bytes)
    }
}

/// Insn::MatchAny
pub struct MatchAny {}
impl MatchAny {
    pub fn new() -> Self {
        Self {}
    }
}
impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for MatchAny {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        // If there is a character, it counts as a match.
        cursor::next(input, dir, pos).is_some()
    }
}

/// Insn::MatchAnyExceptNewline
pub struct MatchAnyExceptNewline {
    pub newline: Newline,
}
impl<Input: InputIndexer, Dir: Direction> SingleCharMatcher<Input, Dir> for MatchAnyExceptNewline {
    #[inline(always)]
    fn matches(&self, input: &Input, dir: Dir, pos: &mut usize) -> bool {
        matchers::any_except_newline(input, dir, self.newline, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{Backward, Forward};
    use crate::indexing::Utf8Input;

    #[test]
    fn byte_sets_move_by_bytes() {
        let input = Utf8Input::new(b"ab");
        let bytes = ByteBitmap::new(b"ab");
        let m = MatchByteSet { bytes: &bytes };
        let mut pos = 0;
        assert!(SingleCharMatcher::<_, Forward>::matches(&m, &input, Forward, &mut pos));
        assert_eq!(pos, 1);
        assert!(SingleCharMatcher::<_, Backward>::matches(&m, &input, Backward, &mut pos));
        assert_eq!(pos, 0);
        assert!(!SingleCharMatcher::<_, Backward>::matches(&m, &input, Backward, &mut pos));
    }

    #[test]
    fn icase_compares_folds() {
        let input = Utf8Input::new("\u{C9}".as_bytes());
        let mut pos = 0;
        let m = CharICase { c: 0xE9 };
        assert!(SingleCharMatcher::<_, Forward>::matches(&m, &input, Forward, &mut pos));
        assert_eq!(pos, 2);
    }
}
