//! Replacement templates: parsing `$`-references, and expanding them against
//! a match.

use crate::error::MatchError;
use crate::util::{decode_utf8_right, encode_utf8};

/// A forced case.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
}

/// A group reference as written in the template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupRef {
    Number(usize),
    Name(Box<str>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(Vec<u8>),
    Group(GroupRef),
    Mark,
    /// `\U`, `\L`, or `\E` (None).
    CaseMode(Option<Case>),
    /// `\u` or `\l`.
    CaseNext(Case),
    /// `${n:-default}`
    Default(GroupRef, Template),
    /// `${n:+set:unset}`
    Conditional(GroupRef, Template, Template),
}

/// A parsed replacement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Template {
    pieces: Vec<Piece>,
}

/// What stops a nested template.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Terminator {
    End,
    Brace,
    ColonOrBrace,
}

struct Parser<'a> {
    text: &'a [u8],
    pos: usize,
    extended: bool,
}

fn bad(offset: usize) -> MatchError {
    MatchError::BadReplacement { offset }
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.text.get(self.pos).copied()
    }

    fn push_literal(pieces: &mut Vec<Piece>, bytes: &[u8]) {
        if let Some(Piece::Literal(lit)) = pieces.last_mut() {
            lit.extend_from_slice(bytes);
        } else {
            pieces.push(Piece::Literal(bytes.to_vec()));
        }
    }

    fn parse(&mut self, term: Terminator) -> Result<Template, MatchError> {
        let mut pieces = Vec::new();
        loop {
            let b = match self.peek() {
                Some(b) => b,
                None if term == Terminator::End => break,
                None => return Err(bad(self.pos)),
            };
            match (b, term) {
                (b'}', Terminator::Brace | Terminator::ColonOrBrace) => break,
                (b':', Terminator::ColonOrBrace) => break,
                (b'$', _) => self.parse_dollar(&mut pieces)?,
                (b'\\', _) if self.extended => self.parse_escape(&mut pieces)?,
                _ => {
                    Self::push_literal(&mut pieces, &[b]);
                    self.pos += 1;
                }
            }
        }
        Ok(Template { pieces })
    }

    fn parse_number(&mut self) -> Option<usize> {
        let start = self.pos;
        let mut value: usize = 0;
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            value = value.saturating_mul(10).saturating_add(usize::from(b - b'0'));
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn parse_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.peek().map_or(false, is_name_char) {
            self.pos += 1;
        }
        let name = &self.text[start..self.pos];
        // Names are ASCII so this never fails.
        core::str::from_utf8(name).ok().filter(|n| !n.is_empty())
    }

    /// Parse a group reference: digits, or a name which does not start with
    /// a digit.
    fn parse_group_ref(&mut self) -> Option<GroupRef> {
        match self.peek() {
            Some(b) if b.is_ascii_digit() => self.parse_number().map(GroupRef::Number),
            Some(b) if is_name_char(b) => self.parse_name().map(|n| GroupRef::Name(n.into())),
            _ => None,
        }
    }

    fn parse_dollar(&mut self, pieces: &mut Vec<Piece>) -> Result<(), MatchError> {
        let dollar = self.pos;
        self.pos += 1;
        match self.peek() {
            Some(b'$') => {
                self.pos += 1;
                Self::push_literal(pieces, b"$");
            }
            Some(b'{') => {
                self.pos += 1;
                if self.text[self.pos..].starts_with(b"*MARK}") {
                    self.pos += 6;
                    pieces.push(Piece::Mark);
                    return Ok(());
                }
                let group = self.parse_group_ref().ok_or_else(|| bad(self.pos))?;
                match self.peek() {
                    Some(b'}') => {
                        self.pos += 1;
                        pieces.push(Piece::Group(group));
                    }
                    Some(b':') if self.extended => {
                        self.pos += 1;
                        let piece = match self.peek() {
                            Some(b'-') => {
                                self.pos += 1;
                                let default = self.parse(Terminator::Brace)?;
                                Piece::Default(group, default)
                            }
                            Some(b'+') => {
                                self.pos += 1;
                                let set = self.parse(Terminator::ColonOrBrace)?;
                                let unset = if self.peek() == Some(b':') {
                                    self.pos += 1;
                                    self.parse(Terminator::Brace)?
                                } else {
                                    Template::default()
                                };
                                Piece::Conditional(group, set, unset)
                            }
                            _ => return Err(bad(self.pos)),
                        };
                        // The closing brace.
                        if self.peek() != Some(b'}') {
                            return Err(bad(self.pos));
                        }
                        self.pos += 1;
                        pieces.push(piece);
                    }
                    _ => return Err(bad(self.pos)),
                }
            }
            Some(b'*') => {
                if self.text[self.pos..].starts_with(b"*MARK") {
                    self.pos += 5;
                    pieces.push(Piece::Mark);
                } else {
                    return Err(bad(dollar));
                }
            }
            _ => match self.parse_group_ref() {
                Some(group) => pieces.push(Piece::Group(group)),
                None => return Err(bad(dollar)),
            },
        }
        Ok(())
    }

    fn parse_hex(&mut self, max_digits: usize) -> Option<u32> {
        let start = self.pos;
        let mut value: u32 = 0;
        while self.pos - start < max_digits {
            let digit = match self.peek().and_then(|b| char::from(b).to_digit(16)) {
                Some(d) => d,
                None => break,
            };
            value = value.checked_mul(16)?.checked_add(digit)?;
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }

    fn parse_escape(&mut self, pieces: &mut Vec<Piece>) -> Result<(), MatchError> {
        let backslash = self.pos;
        self.pos += 1;
        let b = self.peek().ok_or_else(|| bad(backslash))?;
        self.pos += 1;
        let literal: u32 = match b {
            b'U' => {
                pieces.push(Piece::CaseMode(Some(Case::Upper)));
                return Ok(());
            }
            b'L' => {
                pieces.push(Piece::CaseMode(Some(Case::Lower)));
                return Ok(());
            }
            b'E' => {
                pieces.push(Piece::CaseMode(None));
                return Ok(());
            }
            b'u' => {
                pieces.push(Piece::CaseNext(Case::Upper));
                return Ok(());
            }
            b'l' => {
                pieces.push(Piece::CaseNext(Case::Lower));
                return Ok(());
            }
            b'n' => 0x0A,
            b'r' => 0x0D,
            b't' => 0x09,
            b'a' => 0x07,
            b'e' => 0x1B,
            b'f' => 0x0C,
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                value
            }
            b'x' => {
                if self.peek() == Some(b'{') {
                    self.pos += 1;
                    let value = self.parse_hex(8).ok_or_else(|| bad(self.pos))?;
                    if self.peek() != Some(b'}') {
                        return Err(bad(self.pos));
                    }
                    self.pos += 1;
                    value
                } else {
                    self.parse_hex(2).unwrap_or(0)
                }
            }
            b if b.is_ascii_alphanumeric() => return Err(bad(backslash)),
            b => u32::from(b),
        };
        let mut buff = [0; 4];
        let bytes = encode_utf8(literal, &mut buff).ok_or_else(|| bad(backslash))?;
        Self::push_literal(pieces, bytes);
        Ok(())
    }
}

impl Template {
    /// Parse \p text. With \p literal the text is used verbatim; with
    /// \p extended backslash escapes and conditional references apply.
    pub(crate) fn parse(text: &[u8], extended: bool, literal: bool) -> Result<Template, MatchError> {
        if literal {
            let pieces = if text.is_empty() {
                Vec::new()
            } else {
                vec![Piece::Literal(text.to_vec())]
            };
            return Ok(Template { pieces });
        }
        let mut parser = Parser {
            text,
            pos: 0,
            extended,
        };
        parser.parse(Terminator::End)
    }
}

/// Resolves group references while expanding.
pub(crate) trait GroupSource {
    /// \return the highest group number.
    fn capture_count(&self) -> usize;

    /// \return the group numbers for \p name, ascending; empty if unknown.
    fn indexes_for(&self, name: &str) -> &[usize];

    /// \return the subject text of group \p idx, if it is set.
    fn group_text(&self, idx: usize) -> Option<&[u8]>;

    /// \return the mark of the match.
    fn mark(&self) -> Option<&str>;
}

/// Receives expanded bytes.
pub(crate) trait Sink {
    fn push(&mut self, bytes: &[u8]);
}

impl Sink for Vec<u8> {
    fn push(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes)
    }
}

/// Options that affect expansion.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct ExpandOptions {
    pub unknown_unset: bool,
    pub unset_empty: bool,
}

/// Applies forced case to bytes on their way to the sink.
struct CaseWriter<'s, S: Sink> {
    sink: &'s mut S,
    mode: Option<Case>,
    next: Option<Case>,
}

impl<S: Sink> CaseWriter<'_, S> {
    fn write(&mut self, bytes: &[u8]) {
        if self.mode.is_none() && self.next.is_none() {
            self.sink.push(bytes);
            return;
        }
        let mut pos = 0;
        while pos < bytes.len() {
            let (c, next) = match decode_utf8_right(bytes, pos) {
                Some((c, len)) if c < 0x80 || len > 1 => (c, pos + len),
                _ => {
                    // Not UTF-8: pass the byte through.
                    self.sink.push(&bytes[pos..pos + 1]);
                    pos += 1;
                    continue;
                }
            };
            let case = self.next.take().or(self.mode);
            match (case, char::from_u32(c)) {
                (Some(Case::Upper), Some(ch)) => self.push_chars(ch.to_uppercase()),
                (Some(Case::Lower), Some(ch)) => self.push_chars(ch.to_lowercase()),
                _ => self.sink.push(&bytes[pos..next]),
            }
            pos = next;
        }
    }

    fn push_chars(&mut self, chars: impl Iterator<Item = char>) {
        let mut buff = [0; 4];
        for ch in chars {
            self.sink.push(ch.encode_utf8(&mut buff).as_bytes());
        }
    }
}

/// The state of a group reference during expansion.
enum Resolved<'g> {
    Set(&'g [u8]),
    Unset,
}

fn resolve<'g, G: GroupSource>(
    group: &GroupRef,
    groups: &'g G,
    opts: ExpandOptions,
) -> Result<Resolved<'g>, MatchError> {
    let text = match group {
        GroupRef::Number(n) => {
            if *n > groups.capture_count() {
                if opts.unknown_unset {
                    return Ok(Resolved::Unset);
                }
                return Err(MatchError::UnknownGroup);
            }
            groups.group_text(*n)
        }
        GroupRef::Name(name) => {
            let indexes = groups.indexes_for(name);
            if indexes.is_empty() {
                if opts.unknown_unset {
                    return Ok(Resolved::Unset);
                }
                return Err(MatchError::UnknownGroup);
            }
            // With duplicate names the first set group is used.
            indexes.iter().find_map(|&idx| groups.group_text(idx))
        }
    };
    Ok(text.map_or(Resolved::Unset, Resolved::Set))
}

impl Template {
    /// Expand against \p groups into \p sink.
    pub(crate) fn expand<G: GroupSource, S: Sink>(
        &self,
        groups: &G,
        opts: ExpandOptions,
        sink: &mut S,
    ) -> Result<(), MatchError> {
        let mut writer = CaseWriter {
            sink,
            mode: None,
            next: None,
        };
        self.expand_into(groups, opts, &mut writer)
    }

    fn expand_into<G: GroupSource, S: Sink>(
        &self,
        groups: &G,
        opts: ExpandOptions,
        writer: &mut CaseWriter<'_, S>,
    ) -> Result<(), MatchError> {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(bytes) => writer.write(bytes),
                Piece::Group(group) => match resolve(group, groups, opts)? {
                    Resolved::Set(text) => writer.write(text),
                    Resolved::Unset if opts.unset_empty => {}
                    Resolved::Unset => return Err(MatchError::UnsetGroup),
                },
                Piece::Mark => {
                    if let Some(mark) = groups.mark() {
                        writer.write(mark.as_bytes());
                    }
                }
                Piece::CaseMode(mode) => {
                    writer.mode = *mode;
                    writer.next = None;
                }
                Piece::CaseNext(case) => writer.next = Some(*case),
                Piece::Default(group, default) => match resolve(group, groups, opts)? {
                    Resolved::Set(text) => writer.write(text),
                    Resolved::Unset => default.expand_into(groups, opts, writer)?,
                },
                Piece::Conditional(group, set, unset) => match resolve(group, groups, opts)? {
                    Resolved::Set(_) => set.expand_into(groups, opts, writer)?,
                    Resolved::Unset => unset.expand_into(groups, opts, writer)?,
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        subject: &'static [u8],
        groups: Vec<Option<(usize, usize)>>,
        names: Vec<(&'static str, Vec<usize>)>,
        mark: Option<&'static str>,
    }

    impl GroupSource for Fixed {
        fn capture_count(&self) -> usize {
            self.groups.len() - 1
        }
        fn indexes_for(&self, name: &str) -> &[usize] {
            self.names
                .iter()
                .find(|(n, _)| *n == name)
                .map_or(&[], |(_, idx)| idx.as_slice())
        }
        fn group_text(&self, idx: usize) -> Option<&[u8]> {
            let (s, e) = (*self.groups.get(idx)?)?;
            Some(&self.subject[s..e])
        }
        fn mark(&self) -> Option<&str> {
            self.mark
        }
    }

    fn fixture() -> Fixed {
        // (some)?(?<b>body) against "body"
        Fixed {
            subject: b"body",
            groups: vec![Some((0, 4)), None, Some((0, 4))],
            names: vec![("b", vec![2])],
            mark: Some("M"),
        }
    }

    fn expand(template: &str, extended: bool, opts: ExpandOptions) -> Result<String, MatchError> {
        let t = Template::parse(template.as_bytes(), extended, false)?;
        let mut out = Vec::new();
        t.expand(&fixture(), opts, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn ok(template: &str, extended: bool) -> String {
        expand(template, extended, ExpandOptions::default()).unwrap()
    }

    #[test]
    fn plain_references() {
        assert_eq!(ok("<$0>", false), "<body>");
        assert_eq!(ok("$2${2}x$b${b}", false), "bodybodyxbodybody");
        assert_eq!(ok("$$1", false), "$1");
        assert_eq!(ok("${*MARK}:$*MARK", false), "M:M");
        assert_eq!(ok("\\n", false), "\\n");
    }

    #[test]
    fn unset_and_unknown() {
        assert!(matches!(expand("$1", false, ExpandOptions::default()), Err(MatchError::UnsetGroup)));
        assert!(matches!(expand("$9", false, ExpandOptions::default()), Err(MatchError::UnknownGroup)));
        assert!(matches!(expand("$zz", false, ExpandOptions::default()), Err(MatchError::UnknownGroup)));
        let lenient = ExpandOptions {
            unknown_unset: true,
            unset_empty: true,
        };
        assert_eq!(expand("[$1$9]", false, lenient).unwrap(), "[]");
    }

    #[test]
    fn syntax_errors_report_offsets() {
        let offset = |t: &str, extended| match Template::parse(t.as_bytes(), extended, false) {
            Err(MatchError::BadReplacement { offset }) => offset,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(offset("ab$", false), 2);
        assert_eq!(offset("a${1", false), 4);
        assert_eq!(offset("${1:-x}", false), 3);
        assert_eq!(offset("x\\q", true), 1);
        assert_eq!(offset("${1:+a:b", true), 8);
        assert_eq!(offset("$*MAR", false), 0);
    }

    #[test]
    fn extended_features() {
        assert_eq!(ok("${1:+\\U:\\L}HeLLo", true), "hello");
        assert_eq!(ok("${2:+\\U:\\L}HeLLo", true), "HELLO");
        assert_eq!(ok("${1:-none}/${2:-none}", true), "none/body");
        assert_eq!(ok("\\u$2 \\U$2\\E $2", true), "Body BODY body");
        assert_eq!(ok("\\x41\\x{263A}\\101\\$\\t", true), "A\u{263A}A$\t");
    }

    #[test]
    fn literal_templates_are_verbatim() {
        let t = Template::parse(b"$1\\U", false, true).unwrap();
        assert!(t.pieces.iter().all(|p| matches!(p, Piece::Literal(..))));
        let mut out = Vec::new();
        t.expand(&fixture(), ExpandOptions::default(), &mut out).unwrap();
        assert_eq!(out, b"$1\\U");
    }
}
