use crate::cursor;
use crate::cursor::Direction;
use crate::indexing::InputIndexer;
use crate::options::{Bsr, Newline};

const LF: u32 = 0x0A;
const CR: u32 = 0x0D;

/// \return whether this is a word char.
#[inline(always)]
pub fn is_word_char(c: u32) -> bool {
    matches!(c, 0x30..=0x39 | 0x41..=0x5A | 0x5F | 0x61..=0x7A)
}

/// \return whether a word char is on the left or right of \p pos.
#[inline]
pub fn word_boundary<Input: InputIndexer>(input: &Input, pos: usize) -> bool {
    let before = input.peek_left(pos).map_or(false, is_word_char);
    let after = input.peek_right(pos).map_or(false, is_word_char);
    before != after
}

/// \return whether \p c is a line ending under the "any" convention.
#[inline(always)]
fn is_any_newline(c: u32) -> bool {
    matches!(c, 0x0A..=0x0D | 0x85 | 0x2028 | 0x2029)
}

/// \return the length in bytes of a newline starting at \p pos, or 0.
#[inline]
pub fn newline_len_at<Input: InputIndexer>(input: &Input, nl: Newline, pos: usize) -> usize {
    let mut end = pos;
    let c = match input.next_right(&mut end) {
        Some(c) => c,
        None => return 0,
    };
    let crlf = c == CR && input.peek_byte_right(end) == Some(b'\n');
    let matched = match nl {
        Newline::Lf => c == LF,
        Newline::Cr => c == CR,
        Newline::Nul => c == 0,
        Newline::CrLf => crlf,
        Newline::AnyCrLf => c == LF || c == CR,
        Newline::Any => is_any_newline(c),
    };
    match (matched, crlf, nl) {
        (false, _, _) => 0,
        (true, true, Newline::CrLf | Newline::AnyCrLf | Newline::Any) => 2,
        (true, _, _) => end - pos,
    }
}

/// \return the length in bytes of a newline ending at \p pos, or 0.
/// A position between CR and LF is not after a newline when CR LF is one
/// newline, since the LF is still to come.
#[inline]
pub fn newline_len_before<Input: InputIndexer>(input: &Input, nl: Newline, pos: usize) -> usize {
    let mut start = pos;
    let c = match input.next_left(&mut start) {
        Some(c) => c,
        None => return 0,
    };
    let after_cr = c == LF && input.peek_byte_left(start) == Some(b'\r');
    let cr_before_lf = c == CR && input.peek_byte_right(pos) == Some(b'\n');
    match nl {
        Newline::Lf => (c == LF) as usize,
        Newline::Cr => (c == CR) as usize,
        Newline::Nul => (c == 0) as usize,
        Newline::CrLf => {
            if after_cr {
                2
            } else {
                0
            }
        }
        Newline::AnyCrLf | Newline::Any => {
            let matched = if nl == Newline::Any {
                is_any_newline(c)
            } else {
                c == LF || c == CR
            };
            if !matched || cr_before_lf {
                0
            } else if after_cr {
                2
            } else {
                pos - start
            }
        }
    }
}

/// \return whether \p pos is at the very end, or before a newline which ends
/// the subject.
#[inline]
pub fn at_end_or_final_newline<Input: InputIndexer>(input: &Input, nl: Newline, pos: usize) -> bool {
    let len = input.bytelength();
    pos == len || {
        let nl_len = newline_len_at(input, nl, pos);
        nl_len > 0 && pos + nl_len == len
    }
}

/// Match a single non-newline character, in the direction \p dir.
#[inline(always)]
pub fn any_except_newline<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    nl: Newline,
    pos: &mut usize,
) -> bool {
    let orig = *pos;
    if cursor::next(input, dir, pos).is_none() {
        return false;
    }
    let char_start = if Dir::FORWARD { orig } else { *pos };
    newline_len_at(input, nl, char_start) == 0
}

/// Match \R: any line ending, with CR LF as one unit, in the direction \p dir.
#[inline]
pub fn line_break<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    bsr: Bsr,
    pos: &mut usize,
) -> bool {
    let mut end = *pos;
    let c = match cursor::next(input, dir, &mut end) {
        Some(c) => c,
        None => return false,
    };
    let matched = match bsr {
        Bsr::Unicode => is_any_newline(c),
        Bsr::AnyCrLf => c == LF || c == CR,
    };
    if !matched {
        return false;
    }
    if Dir::FORWARD && c == CR && input.peek_byte_right(end) == Some(b'\n') {
        end += 1;
    } else if !Dir::FORWARD && c == LF && input.peek_byte_left(end) == Some(b'\r') {
        end -= 1;
    }
    *pos = end;
    true
}

/// Check whether the subject range [start, end) matches again at \p pos.
pub fn backref<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    orig_range: core::ops::Range<usize>,
    pos: &mut usize,
) -> bool {
    cursor::subrange_eq(input, dir, pos, orig_range.start, orig_range.end)
}

/// Like backref, but characters are compared by their case folds.
pub fn backref_icase<Input: InputIndexer, Dir: Direction>(
    input: &Input,
    dir: Dir,
    orig_range: core::ops::Range<usize>,
    pos: &mut usize,
) -> bool {
    let mut ref_pos = if Dir::FORWARD {
        orig_range.start
    } else {
        orig_range.end
    };
    let mut cur = *pos;
    loop {
        let done = if Dir::FORWARD {
            ref_pos >= orig_range.end
        } else {
            ref_pos <= orig_range.start
        };
        if done {
            break;
        }
        let c1 = match cursor::next(input, dir, &mut ref_pos) {
            Some(c) => c,
            None => return false,
        };
        match cursor::next(input, dir, &mut cur) {
            Some(c2) if c1 == c2 || Input::fold(c1) == Input::fold(c2) => {}
            _ => return false,
        }
    }
    *pos = cur;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{Backward, Forward};
    use crate::indexing::{ByteInput, Utf8Input};

    #[test]
    fn newline_conventions() {
        let input = Utf8Input::new(b"a\r\nb\rc\nd\xc2\x85");
        assert_eq!(newline_len_at(&input, Newline::Lf, 2), 1);
        assert_eq!(newline_len_at(&input, Newline::Lf, 1), 0);
        assert_eq!(newline_len_at(&input, Newline::CrLf, 1), 2);
        assert_eq!(newline_len_at(&input, Newline::CrLf, 4), 0);
        assert_eq!(newline_len_at(&input, Newline::AnyCrLf, 4), 1);
        assert_eq!(newline_len_at(&input, Newline::Any, 8), 2);
        assert_eq!(newline_len_before(&input, Newline::Any, 3), 2);
        assert_eq!(newline_len_before(&input, Newline::Any, 2), 0);
        assert_eq!(newline_len_before(&input, Newline::Cr, 2), 1);
        assert_eq!(newline_len_before(&input, Newline::CrLf, 3), 2);
        assert!(at_end_or_final_newline(&input, Newline::Any, 8));
        assert!(!at_end_or_final_newline(&input, Newline::Lf, 8));
    }

    #[test]
    fn dot_skips_newlines_both_ways() {
        let input = ByteInput::new(b"x\ny");
        let mut pos = 1;
        assert!(!any_except_newline(&input, Forward, Newline::Lf, &mut pos));
        let mut pos = 2;
        assert!(!any_except_newline(&input, Backward, Newline::Lf, &mut pos));
        let mut pos = 1;
        assert!(any_except_newline(&input, Backward, Newline::Lf, &mut pos));
        assert_eq!(pos, 0);
    }

    #[test]
    fn caseless_backrefs() {
        let input = Utf8Input::new("abcABC".as_bytes());
        let mut pos = 3;
        assert!(!backref(&input, Forward, 0..3, &mut pos));
        assert!(backref_icase(&input, Forward, 0..3, &mut pos));
        assert_eq!(pos, 6);
        let mut pos = 3;
        assert!(backref_icase(&input, Backward, 3..6, &mut pos));
        assert_eq!(pos, 0);
    }

    #[test]
    fn line_breaks() {
        let input = Utf8Input::new(b"\r\n\x0b");
        let mut pos = 0;
        assert!(line_break(&input, Forward, Bsr::Unicode, &mut pos));
        assert_eq!(pos, 2);
        assert!(line_break(&input, Forward, Bsr::Unicode, &mut pos));
        let mut pos = 2;
        assert!(!line_break(&input, Forward, Bsr::AnyCrLf, &mut pos));
        assert!(line_break(&input, Backward, Bsr::AnyCrLf, &mut pos));
        assert_eq!(pos, 0);
        assert!(word_boundary(&Utf8Input::new(b"a b"), 1));
    }
}
