use crate::codepointset::{CodePointSet, Interval};
use crate::types::CharacterClassType;

// Character classes like \d or \S, and POSIX [:name:] classes.
// Classes are ASCII-only except \h and \v, which list the Unicode spaces.

/// Construct an interval from an inclusive range of char.
const fn r(first: char, last: char) -> Interval {
    Interval::new(first as u32, last as u32)
}

/// Construct an interval from a single char.
const fn r1(c: char) -> Interval {
    Interval::new(c as u32, c as u32)
}

// Note all of these are sorted.

pub const WORD_CHARS: [Interval; 4] = [r('0', '9'), r('A', 'Z'), r1('_'), r('a', 'z')];

pub const DIGITS: [Interval; 1] = [r('0', '9')];

/// TAB, LF, VT, FF, CR and space.
pub const WHITESPACE: [Interval; 2] = [r('\u{0009}', '\u{000D}'), r1(' ')];

pub const HORIZONTAL_SPACE: [Interval; 9] = [
    r1('\u{0009}'),
    r1('\u{0020}'),
    r1('\u{00A0}'),
    r1('\u{1680}'),
    // Mongolian vowel separator
    r1('\u{180E}'),
    r('\u{2000}', '\u{200A}'),
    r1('\u{202F}'),
    r1('\u{205F}'),
    r1('\u{3000}'),
];

pub const VERTICAL_SPACE: [Interval; 3] = [
    r('\u{000A}', '\u{000D}'),
    r1('\u{0085}'),
    r('\u{2028}', '\u{2029}'),
];

/// \return the set for a backslash class like \d, before any inversion.
pub fn class_set(cls: CharacterClassType) -> CodePointSet {
    match cls {
        CharacterClassType::Digits => CodePointSet::from_intervals(DIGITS),
        CharacterClassType::Spaces => CodePointSet::from_intervals(WHITESPACE),
        CharacterClassType::Words => CodePointSet::from_intervals(WORD_CHARS),
        CharacterClassType::HorizontalSpaces => CodePointSet::from_intervals(HORIZONTAL_SPACE),
        CharacterClassType::VerticalSpaces => CodePointSet::from_intervals(VERTICAL_SPACE),
    }
}

/// \return the set for a POSIX class name such as "alpha", or None if the
/// name is unknown.
pub fn posix_class(name: &str) -> Option<CodePointSet> {
    let ivs: &[Interval] = match name {
        "alpha" => &[r('A', 'Z'), r('a', 'z')],
        "digit" => &DIGITS,
        "alnum" => &[r('0', '9'), r('A', 'Z'), r('a', 'z')],
        "lower" => &[r('a', 'z')],
        "upper" => &[r('A', 'Z')],
        "space" => &WHITESPACE,
        "blank" => &[r1('\t'), r1(' ')],
        "cntrl" => &[r('\u{0}', '\u{1F}'), r1('\u{7F}')],
        "graph" => &[r('!', '~')],
        "print" => &[r(' ', '~')],
        "punct" => &[r('!', '/'), r(':', '@'), r('[', '`'), r('{', '~')],
        "xdigit" => &[r('0', '9'), r('A', 'F'), r('a', 'f')],
        "word" => &WORD_CHARS,
        "ascii" => &[r('\u{0}', '\u{7F}')],
        _ => return None,
    };
    Some(CodePointSet::from_intervals(ivs.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_names() {
        let punct = posix_class("punct").unwrap();
        let alnum = posix_class("alnum").unwrap();
        let graph = posix_class("graph").unwrap();
        assert!(punct.is_disjoint(&alnum));
        let mut both = punct.clone();
        both.add_set(&alnum);
        assert_eq!(both, graph);
        assert!(posix_class("alphabet").is_none());
    }

    #[test]
    fn line_spaces() {
        let h = class_set(CharacterClassType::HorizontalSpaces);
        let v = class_set(CharacterClassType::VerticalSpaces);
        assert!(h.contains(0x3000) && h.contains('\t' as u32));
        assert!(v.contains(0x85) && v.contains('\r' as u32));
        assert!(h.is_disjoint(&v));
    }
}
