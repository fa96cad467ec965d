//! Parser from regex patterns to IR

use crate::callout::CalloutSite;
use crate::charclasses;
use crate::codepointset::{CodePointSet, Interval, CODE_POINT_MAX};
use crate::error::{CompileError, ErrorKind};
use crate::folds;
use crate::ir;
use crate::ir::AnchorType;
use crate::options::{Bsr, CompileOptions, Newline, OptimizationDirective, PatternLimits};
use crate::types::{
    BracketContents, CaptureGroupID, CaptureGroupName, CharacterClassType, MAX_CAPTURE_GROUPS,
    MAX_LOOPS,
};
use smallvec::smallvec;

/// The largest repeat count in a braced quantifier.
const MAX_QUANTIFIER: usize = 65535;

/// The longest group name.
const MAX_NAME_LENGTH: usize = 32;

/// The number reported by automatic callouts.
const AUTO_CALLOUT_NUMBER: u8 = 255;

/// Characters which may delimit a callout string. `{` closes with `}`.
const CALLOUT_DELIMITERS: &str = "`'\"^%#${";

fn error<T>(kind: ErrorKind, offset: usize) -> Result<T, CompileError> {
    Err(CompileError::new(kind, offset))
}

enum ClassAtom {
    CodePoint(u32),
    Set(CodePointSet),
}

/// The result of parsing one item of a term.
enum Atom {
    /// Something which may be quantified.
    Item(ir::Node),

    /// A lookaround; quantifiers are capped at one iteration.
    Assertion(ir::Node),

    /// Something zero-width which may not be quantified.
    Fixed(ir::Node),

    /// An explicit callout, with its index in the callout table.
    Callout(ir::Node, usize),

    /// Literal nodes, already pushed onto the term.
    Literal,

    /// Nothing was produced: a comment, an option setting, or a quoting escape.
    Nothing,
}

fn make_cat(nodes: ir::NodeList) -> ir::Node {
    let mut nodes = nodes;
    match nodes.len() {
        0 => ir::Node::Empty,
        1 => nodes.pop().unwrap_or(ir::Node::Empty),
        _ => ir::Node::Cat(nodes),
    }
}

fn make_alt(nodes: ir::NodeList) -> ir::Node {
    let mut mright = None;
    for node in nodes.into_iter().rev() {
        match mright {
            None => mright = Some(node),
            Some(right) => mright = Some(ir::Node::Alt(Box::new(node), Box::new(right))),
        }
    }
    mright.unwrap_or(ir::Node::Empty)
}

/// \return a Bracket for a backslash class, inverted when \p positive is false.
fn make_bracket_class(ct: CharacterClassType, positive: bool) -> ir::Node {
    ir::Node::Bracket(BracketContents {
        invert: !positive,
        cps: charclasses::class_set(ct),
    })
}

/// \return the class named by a backslash letter like 'd' or 'W'.
fn class_for_escape(c: char) -> Option<(CharacterClassType, bool)> {
    let ct = match c.to_ascii_lowercase() {
        'd' => CharacterClassType::Digits,
        's' => CharacterClassType::Spaces,
        'w' => CharacterClassType::Words,
        'h' => CharacterClassType::HorizontalSpaces,
        'v' => CharacterClassType::VerticalSpaces,
        _ => return None,
    };
    Some((ct, c.is_ascii_lowercase()))
}

/// \return whether \p c is skipped in extended mode.
fn is_pattern_white_space(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | '\u{85}' | '\u{200E}' | '\u{200F}'
            | '\u{2028}' | '\u{2029}'
    )
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Flags which may change within the pattern. They are saved when a group
/// opens and restored when it closes.
#[derive(Debug, Copy, Clone)]
struct Flags {
    caseless: bool,
    multiline: bool,
    dotall: bool,
    extended: bool,
    ungreedy: bool,
    no_auto_capture: bool,
    dup_names: bool,
}

struct LookaroundParams {
    negate: bool,
    backwards: bool,
}

/// Represents the state used to parse a regex.
struct Parser<'a> {
    /// The pattern and our byte offset into it.
    pattern: &'a str,
    pos: usize,

    options: &'a CompileOptions,

    /// Flags in effect at the current position.
    flags: Flags,

    /// Whether the pattern is UTF; a leading (*UTF) may turn it on.
    utf: bool,
    newline: Newline,
    bsr: Bsr,
    directives: Vec<OptimizationDirective>,
    limits: PatternLimits,

    /// Number of loops.
    loop_count: u32,

    /// Number of capturing groups.
    group_count: CaptureGroupID,

    /// Current parenthesis nesting.
    depth: u32,

    /// Largest numbered backreference, with the offset of its backslash.
    max_backref: Option<(usize, usize)>,

    /// Whether a lookbehind was encountered.
    has_lookbehind: bool,

    has_backrefs: bool,

    /// Whether a duplicate group name was permitted, by option or by (?J).
    dup_names: bool,

    group_names: Vec<(CaptureGroupName, CaptureGroupID)>,
    callouts: Vec<CalloutSite>,

    /// Explicit callouts still waiting for the item that follows them.
    pending_callouts: Vec<usize>,

    marks: Vec<Box<str>>,

    /// Inside \Q...\E.
    literal_mode: bool,
}

impl<'a> Parser<'a> {
    /// \return the unparsed remainder of the pattern.
    fn rest(&self) -> &'a str {
        let pattern: &'a str = self.pattern;
        &pattern[self.pos..]
    }

    /// Consume a character, returning it.
    fn consume(&mut self, c: char) -> char {
        debug_assert!(self.peek() == Some(c), "char was not next");
        self.pos += c.len_utf8();
        c
    }

    /// If our contents begin with the char c, consume it from our contents
    /// and return true. Otherwise return false.
    fn try_consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// If our contents begin with the string \p s, consume it from our contents
    /// and return true. Otherwise return false.
    fn try_consume_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    /// Peek at the next character.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Peek at the character after the next one.
    fn peek2(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    /// \return the next character.
    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// \return whether \p c ends a comment in extended mode.
    fn ends_comment(&self, c: char) -> bool {
        match self.newline {
            Newline::Lf | Newline::CrLf => c == '\n',
            Newline::Cr => c == '\r',
            Newline::Nul => c == '\0',
            Newline::AnyCrLf => c == '\n' || c == '\r',
            Newline::Any => matches!(c, '\n'..='\r' | '\u{85}' | '\u{2028}' | '\u{2029}'),
        }
    }

    /// Skip whitespace and comments if in extended mode.
    fn skip_extended(&mut self) {
        if !self.flags.extended || self.literal_mode {
            return;
        }
        loop {
            match self.peek() {
                Some(c) if is_pattern_white_space(c) => {
                    self.consume(c);
                }
                Some('#') => {
                    self.consume('#');
                    while let Some(c) = self.next() {
                        if self.ends_comment(c) {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn try_parse(&mut self) -> Result<ir::Node, CompileError> {
        if let Some(max) = self.options.max_pattern_length {
            if self.pattern.len() > max {
                return error(ErrorKind::PatternTooLong, 0);
            }
        }
        self.consume_leading_verbs()?;
        // Parse a disjunction. If we consume everything, it's success. If there's
        // something left, it's an excess closing paren.
        let body = self.consume_disjunction()?;
        match self.peek() {
            Some(')') => error(ErrorKind::UnmatchedParenthesis, self.pos),
            Some(_) => error(ErrorKind::Internal, self.pos),
            None => Ok(body),
        }
    }

    /// Consume start-of-pattern settings like (*UTF) or (*LIMIT_MATCH=10).
    fn consume_leading_verbs(&mut self) -> Result<(), CompileError> {
        loop {
            let start = self.pos;
            let rest = self.rest();
            if !rest.starts_with("(*") {
                return Ok(());
            }
            let end = match rest.find(')') {
                Some(end) => end,
                None => return Ok(()),
            };
            let verb = &rest[2..end];
            match verb {
                "UTF" => self.utf = true,
                "UCP" | "NO_JIT" => {}
                "CR" => self.newline = Newline::Cr,
                "LF" => self.newline = Newline::Lf,
                "CRLF" => self.newline = Newline::CrLf,
                "ANYCRLF" => self.newline = Newline::AnyCrLf,
                "ANY" => self.newline = Newline::Any,
                "NUL" => self.newline = Newline::Nul,
                "BSR_ANYCRLF" => self.bsr = Bsr::AnyCrLf,
                "BSR_UNICODE" => self.bsr = Bsr::Unicode,
                "NO_AUTO_POSSESS" => self.directives.push(OptimizationDirective::NoAutoPossess),
                "NO_DOTSTAR_ANCHOR" => {
                    self.directives.push(OptimizationDirective::NoDotStarAnchor)
                }
                "NO_START_OPT" => self.directives.push(OptimizationDirective::NoStartOptimize),
                _ => {
                    let (slot, value) = if let Some(v) = verb.strip_prefix("LIMIT_MATCH=") {
                        (&mut self.limits.match_limit, v)
                    } else if let Some(v) = verb.strip_prefix("LIMIT_DEPTH=") {
                        (&mut self.limits.depth_limit, v)
                    } else if let Some(v) = verb.strip_prefix("LIMIT_HEAP=") {
                        (&mut self.limits.heap_limit, v)
                    } else {
                        // Not a setting; an ordinary verb.
                        return Ok(());
                    };
                    let limit: u64 = match value.parse() {
                        Ok(limit) if value.bytes().all(|b| b.is_ascii_digit()) => limit,
                        _ => return error(ErrorKind::UnknownVerb, start),
                    };
                    // The smallest of repeated settings wins.
                    *slot = Some(slot.map_or(limit, |prev| prev.min(limit)));
                }
            }
            self.pos += end + 1;
        }
    }

    fn consume_disjunction(&mut self) -> Result<ir::Node, CompileError> {
        let mut terms = vec![self.consume_term()?];
        while self.try_consume('|') {
            terms.push(self.consume_term()?)
        }
        Ok(make_alt(terms))
    }

    fn consume_term(&mut self) -> Result<ir::Node, CompileError> {
        let mut result: Vec<ir::Node> = Vec::new();
        loop {
            self.skip_extended();
            let start_group = self.group_count;
            let item_start = self.pos;
            let start_offset = result.len();

            let c = match self.peek() {
                None => break,
                Some(c) => c,
            };
            if !self.literal_mode && (c == ')' || c == '|') {
                // A catenation is terminated by closing parens or vertical bar.
                break;
            }

            // Automatic callouts precede every item. The site is reserved now so
            // that it is numbered before any callouts nested in the item.
            let auto_site = if self.options.auto_callout && !self.rest().starts_with("(?C") {
                Some(self.push_callout(CalloutSite {
                    pattern_position: item_start,
                    next_item_length: 0,
                    number: AUTO_CALLOUT_NUMBER,
                    string: None,
                    string_offset: None,
                })?)
            } else {
                None
            };

            // Where a quantifier applies from. In byte mode a multibyte literal
            // is several nodes and only the last is repeated.
            let mut quant_offset = start_offset;
            let atom = if self.literal_mode {
                self.consume(c);
                quant_offset = self.push_literal(&mut result, c);
                if self.try_consume_str("\\E") {
                    self.literal_mode = false;
                }
                Atom::Literal
            } else {
                self.consume_atom(c, &mut result, &mut quant_offset)?
            };

            let mut explicit_callout = None;
            let mut quantifier: Option<bool> = None;
            match atom {
                Atom::Literal => quantifier = Some(false),
                Atom::Item(node) => {
                    result.push(node);
                    quantifier = Some(false);
                }
                Atom::Assertion(node) => {
                    result.push(node);
                    quantifier = Some(true);
                }
                Atom::Fixed(node) => result.push(node),
                Atom::Callout(node, idx) => {
                    result.push(node);
                    explicit_callout = Some(idx);
                }
                Atom::Nothing => {}
            }

            // We just parsed an item; try parsing a quantifier.
            if !self.literal_mode {
                self.skip_extended();
                let quant_start = self.pos;
                if let Some((mut quant, possessive)) = self.try_consume_quantifier()? {
                    let is_assertion = match quantifier {
                        Some(is_assertion) if result.len() > start_offset => is_assertion,
                        _ => return error(ErrorKind::NothingToRepeat, quant_start),
                    };
                    if is_assertion {
                        quant.min = quant.min.min(1);
                        quant.max = Some(quant.max.map_or(1, |m| m.min(1)));
                    }
                    let quantifee = result.split_off(quant_offset);
                    if self.loop_count as usize >= MAX_LOOPS {
                        return error(ErrorKind::PatternTooLarge, quant_start);
                    }
                    self.loop_count += 1;
                    let looped = ir::Node::Loop {
                        loopee: Box::new(make_cat(quantifee)),
                        quant,
                        enclosed_groups: start_group..self.group_count,
                    };
                    result.push(if possessive {
                        ir::Node::Atomic {
                            start_group,
                            end_group: self.group_count,
                            contents: Box::new(looped),
                        }
                    } else {
                        looped
                    });
                }
            }

            let produced = result.len() > start_offset;
            let item_len = self.pos - item_start;
            match auto_site {
                Some(idx) if produced => {
                    self.callouts[idx].next_item_length = item_len;
                    result.insert(start_offset, ir::Node::Callout(idx as u16));
                }
                Some(idx) => {
                    // Nothing nests in an unproduced item, so the site is last.
                    debug_assert!(idx + 1 == self.callouts.len());
                    self.callouts.pop();
                }
                None => {}
            }
            if produced {
                for idx in core::mem::take(&mut self.pending_callouts) {
                    self.callouts[idx].next_item_length = item_len;
                }
            }
            if let Some(idx) = explicit_callout {
                self.pending_callouts.push(idx);
            }
        }
        // Callouts before a ')' or '|' have no next item.
        self.pending_callouts.clear();
        Ok(make_cat(result))
    }

    /// Parse one item starting with \p c, which is not ')' or '|'.
    /// Literals are pushed straight onto \p result.
    fn consume_atom(
        &mut self,
        c: char,
        result: &mut Vec<ir::Node>,
        quant_offset: &mut usize,
    ) -> Result<Atom, CompileError> {
        Ok(match c {
            '^' => {
                self.consume('^');
                Atom::Fixed(ir::Node::Anchor(if self.flags.multiline {
                    AnchorType::MultilineStart
                } else {
                    AnchorType::LineStart
                }))
            }

            '$' => {
                self.consume('$');
                Atom::Fixed(ir::Node::Anchor(self.dollar_anchor()))
            }

            '\\' => {
                let backslash = self.pos;
                self.consume('\\');
                self.consume_atom_escape(backslash)?
            }

            '.' => {
                self.consume('.');
                Atom::Item(if self.flags.dotall {
                    ir::Node::MatchAny
                } else {
                    ir::Node::MatchAnyExceptNewline
                })
            }

            '(' => self.consume_group()?,

            '[' => {
                if self.looks_like_posix_class() {
                    return error(ErrorKind::PosixClassOutsideClass, self.pos);
                }
                Atom::Item(self.consume_bracket()?)
            }

            '*' | '+' | '?' => return error(ErrorKind::NothingToRepeat, self.pos),

            c => {
                if c == '{' {
                    // It's an error if this parses successfully as a quantifier.
                    let saved = self.pos;
                    if self.try_consume_braced_quantifier()?.is_some() {
                        return error(ErrorKind::NothingToRepeat, saved);
                    }
                }
                self.consume(c);
                *quant_offset = self.push_literal(result, c);
                Atom::Literal
            }
        })
    }

    /// \return the anchor for '$' under the current flags.
    fn dollar_anchor(&self) -> AnchorType {
        if self.flags.multiline {
            AnchorType::MultilineEnd
        } else if self.options.dollar_endonly {
            AnchorType::LineEndOnly
        } else {
            AnchorType::LineEnd
        }
    }

    /// \return a literal node for the code point \p cp.
    fn make_literal(&self, cp: u32) -> ir::Node {
        if self.flags.caseless {
            let cased = folds::case_variants(cp, self.utf).len() > 1;
            ir::Node::Char {
                c: if cased { folds::fold(cp, self.utf) } else { cp },
                icase: cased,
            }
        } else {
            ir::Node::Char { c: cp, icase: false }
        }
    }

    /// Push a literal pattern character. In byte mode a non-ASCII char
    /// matches its UTF-8 bytes one at a time.
    /// \return the index of the last node pushed.
    fn push_literal(&self, result: &mut Vec<ir::Node>, c: char) -> usize {
        if self.utf || c.is_ascii() {
            result.push(self.make_literal(c as u32));
        } else {
            let mut buf = [0; 4];
            for &b in c.encode_utf8(&mut buf).as_bytes() {
                result.push(self.make_literal(u32::from(b)));
            }
        }
        result.len() - 1
    }

    /// \return whether the remainder looks like [:name:], [.x.] or [=x=].
    fn looks_like_posix_class(&self) -> bool {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        if bytes.len() < 2 || bytes[0] != b'[' || !matches!(bytes[1], b':' | b'.' | b'=') {
            return false;
        }
        let term = bytes[1];
        for (i, &b) in bytes.iter().enumerate().skip(2) {
            if b == b']' {
                return i > 2 && bytes[i - 1] == term;
            }
            if b == b'\\' || b == b'[' {
                return false;
            }
        }
        false
    }

    fn push_callout(&mut self, site: CalloutSite) -> Result<usize, CompileError> {
        if self.callouts.len() > u16::MAX as usize {
            return error(ErrorKind::PatternTooLarge, self.pos);
        }
        self.callouts.push(site);
        Ok(self.callouts.len() - 1)
    }

    fn add_mark(&mut self, name: &str, at: usize) -> Result<u16, CompileError> {
        if let Some(idx) = self.marks.iter().position(|m| &**m == name) {
            return Ok(idx as u16);
        }
        if self.marks.len() > u16::MAX as usize {
            return error(ErrorKind::PatternTooLarge, at);
        }
        self.marks.push(name.into());
        Ok((self.marks.len() - 1) as u16)
    }

    /// Consume a parenthesized construct.
    fn consume_group(&mut self) -> Result<Atom, CompileError> {
        let open = self.pos;
        self.consume('(');
        self.depth += 1;
        if self.depth > self.options.parens_nest_limit {
            return error(ErrorKind::ParensNestTooDeep, open);
        }
        let result = self.consume_group_body(open);
        self.depth -= 1;
        result
    }

    fn consume_group_body(&mut self, open: usize) -> Result<Atom, CompileError> {
        if self.try_consume('*') {
            return self.consume_verb(open);
        }
        if !self.try_consume('?') {
            if self.flags.no_auto_capture {
                return Ok(Atom::Item(self.consume_group_contents()?));
            }
            return Ok(Atom::Item(self.consume_capture_group(open, None)?));
        }
        let at = self.pos;
        let c = match self.peek() {
            Some(c) => c,
            None => return error(ErrorKind::MissingParenthesis, self.pattern.len()),
        };
        match c {
            '#' => {
                self.consume('#');
                loop {
                    match self.next() {
                        Some(')') => return Ok(Atom::Nothing),
                        Some(_) => {}
                        None => return error(ErrorKind::MissingCommentEnd, open),
                    }
                }
            }
            ':' => {
                self.consume(':');
                Ok(Atom::Item(self.consume_group_contents()?))
            }
            '|' => error(ErrorKind::UnsupportedConstruct, open),
            '>' => {
                self.consume('>');
                let start_group = self.group_count;
                let contents = self.consume_group_contents()?;
                Ok(Atom::Item(ir::Node::Atomic {
                    start_group,
                    end_group: self.group_count,
                    contents: Box::new(contents),
                }))
            }
            '=' | '!' => {
                self.consume(c);
                let params = LookaroundParams {
                    negate: c == '!',
                    backwards: false,
                };
                Ok(Atom::Assertion(self.consume_lookaround_assertion(params)?))
            }
            '<' => {
                self.consume('<');
                match self.peek() {
                    Some(d @ ('=' | '!')) => {
                        self.consume(d);
                        self.has_lookbehind = true;
                        let params = LookaroundParams {
                            negate: d == '!',
                            backwards: true,
                        };
                        Ok(Atom::Assertion(self.consume_lookaround_assertion(params)?))
                    }
                    _ => {
                        let name = self.consume_group_name('>')?;
                        Ok(Atom::Item(self.consume_capture_group(open, Some(name))?))
                    }
                }
            }
            '\'' => {
                self.consume('\'');
                let name = self.consume_group_name('\'')?;
                Ok(Atom::Item(self.consume_capture_group(open, Some(name))?))
            }
            'P' => {
                self.consume('P');
                if self.try_consume('<') {
                    let name = self.consume_group_name('>')?;
                    Ok(Atom::Item(self.consume_capture_group(open, Some(name))?))
                } else if self.try_consume('=') {
                    let name = self.consume_group_name(')')?;
                    self.has_backrefs = true;
                    Ok(Atom::Item(ir::Node::NamedBackRef {
                        name,
                        icase: self.flags.caseless,
                        offset: open,
                    }))
                } else if self.peek() == Some('>') {
                    error(ErrorKind::RecursionNotSupported, open)
                } else {
                    error(ErrorKind::BadGroupSyntax, at)
                }
            }
            'C' => {
                self.consume('C');
                self.consume_callout()
            }
            'R' | '&' | '+' | '0'..='9' => error(ErrorKind::RecursionNotSupported, open),
            '-' if self.peek2().map_or(false, |d| d.is_ascii_digit()) => {
                error(ErrorKind::RecursionNotSupported, open)
            }
            '(' => error(ErrorKind::UnsupportedConstruct, open),
            _ => self.consume_options(),
        }
    }

    /// Parse the contents of a group through its closing paren, restoring
    /// flags afterwards.
    fn consume_group_contents(&mut self) -> Result<ir::Node, CompileError> {
        let saved = self.flags;
        let contents = self.consume_disjunction()?;
        self.flags = saved;
        if !self.try_consume(')') {
            return error(ErrorKind::MissingParenthesis, self.pattern.len());
        }
        Ok(contents)
    }

    fn consume_capture_group(
        &mut self,
        open: usize,
        name: Option<CaptureGroupName>,
    ) -> Result<ir::Node, CompileError> {
        if self.group_count as usize >= MAX_CAPTURE_GROUPS {
            return error(ErrorKind::PatternTooLarge, open);
        }
        let group = self.group_count;
        self.group_count += 1;
        if let Some(name) = &name {
            let dup = self.group_names.iter().any(|(n, _)| n == name);
            if dup && !self.flags.dup_names {
                return error(ErrorKind::DuplicateName, open);
            }
            self.dup_names |= dup;
            self.group_names.push((name.clone(), group));
        }
        let contents = Box::new(self.consume_group_contents()?);
        Ok(match name {
            Some(name) => ir::Node::NamedCaptureGroup(contents, group, name),
            None => ir::Node::CaptureGroup(contents, group),
        })
    }

    /// Consume a group name through its \p terminator.
    fn consume_group_name(&mut self, terminator: char) -> Result<CaptureGroupName, CompileError> {
        let start = self.pos;
        match self.peek() {
            Some(c) if is_name_start(c) => {}
            _ => return error(ErrorKind::BadGroupName, start),
        }
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_name_char(c) {
                break;
            }
            name.push(self.consume(c));
        }
        if name.len() > MAX_NAME_LENGTH || !self.try_consume(terminator) {
            return error(ErrorKind::BadGroupName, start);
        }
        Ok(name)
    }

    fn consume_lookaround_assertion(
        &mut self,
        params: LookaroundParams,
    ) -> Result<ir::Node, CompileError> {
        let start_group = self.group_count;
        let contents = self.consume_group_contents()?;
        let end_group = self.group_count;
        Ok(ir::Node::LookaroundAssertion {
            negate: params.negate,
            backwards: params.backwards,
            start_group,
            end_group,
            contents: Box::new(contents),
        })
    }

    /// Parse option letters after "(?", either "(?i)" or "(?i:...)".
    fn consume_options(&mut self) -> Result<Atom, CompileError> {
        let mut flags = self.flags;
        let mut negate = false;
        if self.try_consume('^') {
            flags.caseless = false;
            flags.multiline = false;
            flags.dotall = false;
            flags.extended = false;
            flags.no_auto_capture = false;
            flags.ungreedy = false;
        }
        loop {
            let at = self.pos;
            match self.next() {
                Some('i') => flags.caseless = !negate,
                Some('m') => flags.multiline = !negate,
                Some('s') => flags.dotall = !negate,
                Some('x') => flags.extended = !negate,
                Some('n') => flags.no_auto_capture = !negate,
                Some('J') => flags.dup_names = !negate,
                Some('U') => flags.ungreedy = !negate,
                Some('-') if !negate => negate = true,
                Some(')') => {
                    self.flags = flags;
                    return Ok(Atom::Nothing);
                }
                Some(':') => {
                    let saved = self.flags;
                    self.flags = flags;
                    let contents = self.consume_disjunction();
                    self.flags = saved;
                    let contents = contents?;
                    if !self.try_consume(')') {
                        return error(ErrorKind::MissingParenthesis, self.pattern.len());
                    }
                    return Ok(Atom::Item(contents));
                }
                None => return error(ErrorKind::MissingParenthesis, self.pattern.len()),
                Some(_) => return error(ErrorKind::BadGroupSyntax, at),
            }
        }
    }

    /// Parse a callout after "(?C".
    fn consume_callout(&mut self) -> Result<Atom, CompileError> {
        let at = self.pos;
        let mut number = 0u8;
        let mut string = None;
        let mut string_offset = None;
        match self.peek() {
            Some(')') => {}
            Some(d) if d.is_ascii_digit() => {
                let n = self.try_consume_decimal_integer_literal().unwrap_or(0);
                if n > u8::MAX as usize {
                    return error(ErrorKind::CalloutNumberTooBig, at);
                }
                number = n as u8;
            }
            Some(delim) if CALLOUT_DELIMITERS.contains(delim) => {
                let close = if delim == '{' { '}' } else { delim };
                self.consume(delim);
                string_offset = Some(self.pos);
                let mut text = String::new();
                loop {
                    match self.next() {
                        None => return error(ErrorKind::MissingCalloutDelimiter, at),
                        Some(c) if c == close => {
                            // A doubled delimiter stands for itself.
                            if !self.try_consume(close) {
                                break;
                            }
                            text.push(c);
                        }
                        Some(c) => text.push(c),
                    }
                }
                string = Some(text.into_boxed_str());
            }
            _ => return error(ErrorKind::BadCallout, at),
        }
        if !self.try_consume(')') {
            return error(ErrorKind::BadCallout, self.pos);
        }
        let idx = self.push_callout(CalloutSite {
            pattern_position: self.pos,
            next_item_length: 0,
            number,
            string,
            string_offset,
        })?;
        Ok(Atom::Callout(ir::Node::Callout(idx as u16), idx))
    }

    /// Parse a verb after "(*".
    fn consume_verb(&mut self, open: usize) -> Result<Atom, CompileError> {
        let rest = self.rest();
        let name_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_uppercase() || *b == b'_')
            .count();
        let name = &rest[..name_len];
        self.pos += name_len;
        let arg = if self.try_consume(':') {
            let rest = self.rest();
            let len = match rest.find(')') {
                Some(len) => len,
                None => return error(ErrorKind::UnknownVerb, open),
            };
            self.pos += len;
            Some(&rest[..len])
        } else {
            None
        };
        if !self.try_consume(')') {
            return error(ErrorKind::UnknownVerb, open);
        }
        let node = match (name, arg) {
            ("MARK" | "", Some(arg)) if !arg.is_empty() => ir::Node::Mark(self.add_mark(arg, open)?),
            ("FAIL" | "F", None) => ir::Node::make_always_fails(),
            ("COMMIT", None) => ir::Node::Commit,
            ("COMMIT", Some(arg)) if !arg.is_empty() => ir::Node::Cat(vec![
                ir::Node::Mark(self.add_mark(arg, open)?),
                ir::Node::Commit,
            ]),
            ("ACCEPT" | "PRUNE" | "SKIP" | "THEN", _) => {
                return error(ErrorKind::UnsupportedConstruct, open)
            }
            _ => return error(ErrorKind::UnknownVerb, open),
        };
        Ok(Atom::Fixed(node))
    }

    fn consume_bracket(&mut self) -> Result<ir::Node, CompileError> {
        self.consume('[');
        let mut result = BracketContents {
            invert: self.try_consume('^'),
            cps: CodePointSet::new(),
        };
        let mut first = true;
        let mut literal_mode = false;
        loop {
            let atom_start = self.pos;
            match self.peek() {
                None => return error(ErrorKind::MissingBracket, self.pattern.len()),
                Some(']') if !literal_mode && (!first || self.options.allow_empty_class) => {
                    self.consume(']');
                    break;
                }
                _ => {}
            }
            first = false;
            let atom = match self.consume_class_atom(&mut literal_mode)? {
                Some(atom) => atom,
                None => continue,
            };

            // A '-' followed by ']' is literal.
            let saved = self.pos;
            if !self.try_consume('-') || matches!(self.peek(), Some(']') | None) {
                self.pos = saved;
                add_class_atom(&mut result, atom);
                continue;
            }
            let second_start = self.pos;
            let second = self.consume_class_atom(&mut literal_mode)?;
            match (atom, second) {
                (ClassAtom::CodePoint(first), Some(ClassAtom::CodePoint(last))) => {
                    if first > last {
                        return error(ErrorKind::ClassRangeOutOfOrder, second_start);
                    }
                    result.cps.add(Interval::new(first, last));
                }
                (atom, None) => {
                    add_class_atom(&mut result, atom);
                    result.cps.add_one('-' as u32);
                }
                _ => return error(ErrorKind::InvalidClassRange, atom_start),
            }
        }
        if self.flags.caseless {
            result.cps = folds::fold_code_points(&result.cps, self.utf);
        }
        Ok(ir::Node::Bracket(result))
    }

    /// Parse one element of a bracket. \return None if it was nothing, like
    /// the \Q or \E which toggle literal mode.
    fn consume_class_atom(
        &mut self,
        literal_mode: &mut bool,
    ) -> Result<Option<ClassAtom>, CompileError> {
        let c = match self.peek() {
            Some(c) => c,
            None => return error(ErrorKind::MissingBracket, self.pattern.len()),
        };
        if *literal_mode {
            if self.try_consume_str("\\E") {
                *literal_mode = false;
                return Ok(None);
            }
            self.consume(c);
            return Ok(Some(self.class_literal(c)));
        }
        match c {
            '[' if self.looks_like_posix_class() => {
                let at = self.pos;
                let rest = self.rest();
                let term = rest.as_bytes()[1];
                if term != b':' {
                    return error(ErrorKind::UnsupportedConstruct, at);
                }
                let end = match rest.find(":]") {
                    Some(end) => end,
                    None => return error(ErrorKind::UnknownPosixClass, at),
                };
                let (negate, name) = match rest[2..end].strip_prefix('^') {
                    Some(name) => (true, name),
                    None => (false, &rest[2..end]),
                };
                let cps = match charclasses::posix_class(name) {
                    Some(cps) => cps,
                    None => return error(ErrorKind::UnknownPosixClass, at),
                };
                self.pos += end + 2;
                Ok(Some(ClassAtom::Set(if negate { cps.inverted() } else { cps })))
            }
            '\\' => {
                let backslash = self.pos;
                self.consume('\\');
                self.consume_class_escape(backslash, literal_mode)
            }
            c => {
                self.consume(c);
                Ok(Some(self.class_literal(c)))
            }
        }
    }

    /// A literal char in a bracket. In byte mode a non-ASCII char contributes
    /// each of its bytes.
    fn class_literal(&self, c: char) -> ClassAtom {
        if self.utf || c.is_ascii() {
            return ClassAtom::CodePoint(c as u32);
        }
        let mut buf = [0; 4];
        let mut cps = CodePointSet::new();
        for &b in c.encode_utf8(&mut buf).as_bytes() {
            cps.add_one(u32::from(b));
        }
        ClassAtom::Set(cps)
    }

    fn consume_class_escape(
        &mut self,
        backslash: usize,
        literal_mode: &mut bool,
    ) -> Result<Option<ClassAtom>, CompileError> {
        let c = match self.peek() {
            Some(c) => c,
            None => return error(ErrorKind::EndBackslash, backslash),
        };
        if let Some((class_type, positive)) = class_for_escape(c) {
            self.consume(c);
            let cps = charclasses::class_set(class_type);
            return Ok(Some(ClassAtom::Set(if positive { cps } else { cps.inverted() })));
        }
        match c {
            'b' => {
                self.consume('b');
                Ok(Some(ClassAtom::CodePoint(0x08)))
            }
            'Q' => {
                self.consume('Q');
                *literal_mode = true;
                Ok(None)
            }
            'E' => {
                self.consume('E');
                Ok(None)
            }
            'p' | 'P' => error(ErrorKind::UnsupportedConstruct, backslash),
            '1'..='7' => {
                let cp = self.consume_octal_digits(3);
                Ok(Some(ClassAtom::CodePoint(self.check_code_point(cp, backslash)?)))
            }
            '8' | '9' => {
                self.consume(c);
                Ok(Some(ClassAtom::CodePoint(c as u32)))
            }
            _ => Ok(Some(ClassAtom::CodePoint(
                self.consume_character_escape(backslash)?,
            ))),
        }
    }

    fn try_consume_quantifier(&mut self) -> Result<Option<(ir::Quantifier, bool)>, CompileError> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.consume('*');
                (0, None)
            }
            Some('+') => {
                self.consume('+');
                (1, None)
            }
            Some('?') => {
                self.consume('?');
                (0, Some(1))
            }
            Some('{') => match self.try_consume_braced_quantifier()? {
                Some(bounds) => bounds,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        let mut greedy = !self.flags.ungreedy;
        let mut possessive = false;
        if self.try_consume('?') {
            greedy = !greedy;
        } else if self.try_consume('+') {
            possessive = true;
            greedy = true;
        }
        Ok(Some((ir::Quantifier { min, max, greedy }, possessive)))
    }

    /// Parse {n}, {n,}, {n,m} or {,m}. Anything else is not a quantifier,
    /// and the position is left unchanged.
    fn try_consume_braced_quantifier(
        &mut self,
    ) -> Result<Option<(usize, Option<usize>)>, CompileError> {
        let start = self.pos;
        self.consume('{');
        self.skip_extended();
        let min = self.try_consume_decimal_integer_literal();
        self.skip_extended();
        let max = if self.try_consume(',') {
            self.skip_extended();
            let max = self.try_consume_decimal_integer_literal();
            self.skip_extended();
            if min.is_none() && max.is_none() {
                self.pos = start;
                return Ok(None);
            }
            max
        } else if min.is_some() {
            min
        } else {
            self.pos = start;
            return Ok(None);
        };
        if !self.try_consume('}') {
            self.pos = start;
            return Ok(None);
        }
        let min = min.unwrap_or(0);
        if min > MAX_QUANTIFIER || max.map_or(false, |m| m > MAX_QUANTIFIER) {
            return error(ErrorKind::QuantifierTooBig, start);
        }
        if max.map_or(false, |m| min > m) {
            return error(ErrorKind::QuantifierOutOfOrder, start);
        }
        Ok(Some((min, max)))
    }

    /// Consume a decimal integer, saturating on overflow.
    fn try_consume_decimal_integer_literal(&mut self) -> Option<usize> {
        let mut result: Option<usize> = None;
        while let Some(c) = self.peek() {
            let digit = match c.to_digit(10) {
                Some(d) => d as usize,
                None => break,
            };
            self.consume(c);
            result = Some(result.unwrap_or(0).saturating_mul(10).saturating_add(digit));
        }
        result
    }

    /// Consume up to \p max_digits octal digits.
    fn consume_octal_digits(&mut self, max_digits: usize) -> u32 {
        let mut result = 0u32;
        for _ in 0..max_digits {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) => {
                    self.next();
                    result = result * 8 + d;
                }
                None => break,
            }
        }
        result
    }

    /// Consume digits of the given radix, saturating. \return None if there
    /// were none.
    fn consume_digits(&mut self, radix: u32, max_digits: usize) -> Option<u32> {
        let mut result: Option<u32> = None;
        for _ in 0..max_digits {
            match self.peek().and_then(|c| c.to_digit(radix)) {
                Some(d) => {
                    self.next();
                    result = Some(result.unwrap_or(0).saturating_mul(radix).saturating_add(d));
                }
                None => break,
            }
        }
        result
    }

    /// Validate a code point from an escape.
    fn check_code_point(&self, cp: u32, at: usize) -> Result<u32, CompileError> {
        if self.utf {
            if cp > CODE_POINT_MAX {
                return error(ErrorKind::CodePointTooLarge, at);
            }
            if (0xD800..=0xDFFF).contains(&cp) {
                return error(ErrorKind::BadEscape, at);
            }
        } else if cp > 0xFF {
            return error(ErrorKind::CodePointTooLarge, at);
        }
        Ok(cp)
    }

    /// Consume an escape which denotes a single character, after the
    /// backslash at \p backslash.
    fn consume_character_escape(&mut self, backslash: usize) -> Result<u32, CompileError> {
        let c = match self.next() {
            Some(c) => c,
            None => return error(ErrorKind::EndBackslash, backslash),
        };
        let cp = match c {
            'a' => 0x07,
            'e' => 0x1B,
            'f' => 0x0C,
            'n' => 0x0A,
            'r' => {
                if self.options.extra.escaped_cr_is_lf {
                    0x0A
                } else {
                    0x0D
                }
            }
            't' => 0x09,
            '0' => self.consume_octal_digits(2),
            'o' => {
                if !self.try_consume('{') {
                    return error(ErrorKind::BadEscape, backslash);
                }
                let cp = self.consume_digits(8, usize::MAX);
                match cp {
                    Some(cp) if self.try_consume('}') => cp,
                    _ => return error(ErrorKind::BadEscape, backslash),
                }
            }
            'x' => {
                if self.try_consume('{') {
                    let cp = self.consume_digits(16, usize::MAX);
                    match cp {
                        Some(cp) if self.try_consume('}') => cp,
                        _ => return error(ErrorKind::BadEscape, backslash),
                    }
                } else {
                    self.consume_digits(16, 2).unwrap_or(0)
                }
            }
            'c' => match self.next() {
                Some(c) if c.is_ascii() && !c.is_ascii_control() => {
                    (c.to_ascii_uppercase() as u32) ^ 0x40
                }
                _ => return error(ErrorKind::BadEscape, backslash),
            },
            c if c.is_ascii_alphanumeric() => return error(ErrorKind::BadEscape, backslash),
            c => {
                if !self.utf && !c.is_ascii() {
                    // A non-ASCII char can only be escaped as itself in UTF mode.
                    return error(ErrorKind::CodePointTooLarge, backslash);
                }
                c as u32
            }
        };
        self.check_code_point(cp, backslash)
    }

    fn make_numbered_backref(&mut self, n: usize, at: usize) -> Result<Atom, CompileError> {
        if n == 0 || n > MAX_CAPTURE_GROUPS {
            return error(ErrorKind::BadSubpatternReference, at);
        }
        if self.max_backref.map_or(true, |(prev, _)| n > prev) {
            self.max_backref = Some((n, at));
        }
        self.has_backrefs = true;
        Ok(Atom::Item(ir::Node::BackRef {
            groups: smallvec![(n - 1) as CaptureGroupID],
            icase: self.flags.caseless,
        }))
    }

    fn consume_atom_escape(&mut self, backslash: usize) -> Result<Atom, CompileError> {
        let c = match self.peek() {
            Some(c) => c,
            None => return error(ErrorKind::EndBackslash, backslash),
        };
        if let Some((class_type, positive)) = class_for_escape(c) {
            self.consume(c);
            let node = make_bracket_class(class_type, positive);
            return Ok(Atom::Item(node));
        }
        let anchor = |a| Ok(Atom::Fixed(ir::Node::Anchor(a)));
        match c {
            'b' | 'B' => {
                self.consume(c);
                Ok(Atom::Fixed(ir::Node::WordBoundary { invert: c == 'B' }))
            }
            'A' => {
                self.consume(c);
                anchor(AnchorType::SubjectStart)
            }
            'z' => {
                self.consume(c);
                anchor(AnchorType::SubjectEnd)
            }
            'Z' => {
                self.consume(c);
                anchor(AnchorType::FinalNewlineEnd)
            }
            'G' => {
                self.consume(c);
                anchor(AnchorType::SearchStart)
            }
            'N' => {
                self.consume('N');
                if self.try_consume('{') {
                    if !self.utf || !self.try_consume_str("U+") {
                        return error(ErrorKind::BadEscape, backslash);
                    }
                    let cp = match self.consume_digits(16, usize::MAX) {
                        Some(cp) if self.try_consume('}') => cp,
                        _ => return error(ErrorKind::BadEscape, backslash),
                    };
                    let cp = self.check_code_point(cp, backslash)?;
                    return Ok(Atom::Item(self.make_literal(cp)));
                }
                Ok(Atom::Item(ir::Node::MatchAnyExceptNewline))
            }
            'R' => {
                self.consume('R');
                Ok(Atom::Item(ir::Node::LineBreak))
            }
            'Q' => {
                self.consume('Q');
                self.literal_mode = true;
                Ok(Atom::Nothing)
            }
            'E' => {
                self.consume('E');
                Ok(Atom::Nothing)
            }
            'K' | 'X' | 'C' | 'p' | 'P' => error(ErrorKind::UnsupportedConstruct, backslash),
            'g' => {
                self.consume('g');
                self.consume_g_backref(backslash)
            }
            'k' => {
                self.consume('k');
                let terminator = match self.next() {
                    Some('<') => '>',
                    Some('\'') => '\'',
                    Some('{') => '}',
                    _ => return error(ErrorKind::BadEscape, backslash),
                };
                let name = self.consume_group_name(terminator)?;
                self.has_backrefs = true;
                Ok(Atom::Item(ir::Node::NamedBackRef {
                    name,
                    icase: self.flags.caseless,
                    offset: backslash,
                }))
            }
            '1'..='9' => {
                let digits_start = self.pos;
                let n = self.try_consume_decimal_integer_literal().unwrap_or(0);
                if n < 10 || n <= self.group_count as usize {
                    return self.make_numbered_backref(n, backslash);
                }
                // Not a backreference: octal, or a literal 8 or 9.
                self.pos = digits_start;
                let cp = match self.peek() {
                    Some(d @ ('8' | '9')) => {
                        self.consume(d);
                        d as u32
                    }
                    _ => self.consume_octal_digits(3),
                };
                let cp = self.check_code_point(cp, backslash)?;
                Ok(Atom::Item(self.make_literal(cp)))
            }
            _ => {
                let cp = self.consume_character_escape(backslash)?;
                Ok(Atom::Item(self.make_literal(cp)))
            }
        }
    }

    /// Parse the forms after "\g": \g1, \g{1}, \g{-1}, \g{name}.
    fn consume_g_backref(&mut self, backslash: usize) -> Result<Atom, CompileError> {
        if matches!(self.peek(), Some('<' | '\'')) {
            return error(ErrorKind::RecursionNotSupported, backslash);
        }
        let braced = self.try_consume('{');
        if braced && self.peek().map_or(false, is_name_start) {
            let name = self.consume_group_name('}')?;
            self.has_backrefs = true;
            return Ok(Atom::Item(ir::Node::NamedBackRef {
                name,
                icase: self.flags.caseless,
                offset: backslash,
            }));
        }
        let negative = self.try_consume('-');
        if !negative && self.peek() == Some('+') {
            return error(ErrorKind::BadSubpatternReference, backslash);
        }
        let n = match self.try_consume_decimal_integer_literal() {
            Some(n) => n,
            None => return error(ErrorKind::BadEscape, backslash),
        };
        if braced && !self.try_consume('}') {
            return error(ErrorKind::BadEscape, backslash);
        }
        let number = if negative {
            // Relative to the groups opened so far.
            let seen = self.group_count as usize;
            if n == 0 || n > seen {
                return error(ErrorKind::BadSubpatternReference, backslash);
            }
            seen + 1 - n
        } else {
            n
        };
        self.make_numbered_backref(number, backslash)
    }

    fn finalize(mut self, body: ir::Node) -> Result<ir::Regex, CompileError> {
        debug_assert!(self.loop_count <= MAX_LOOPS as u32);
        debug_assert!(self.group_count as usize <= MAX_CAPTURE_GROUPS);
        let mut body = body;
        if self.options.extra.match_word {
            body = ir::Node::Cat(vec![
                ir::Node::WordBoundary { invert: false },
                body,
                ir::Node::WordBoundary { invert: false },
            ]);
        }
        if self.options.extra.match_line {
            let (start, end) = if self.options.multiline {
                (AnchorType::MultilineStart, AnchorType::MultilineEnd)
            } else if self.options.dollar_endonly {
                (AnchorType::LineStart, AnchorType::LineEndOnly)
            } else {
                (AnchorType::LineStart, AnchorType::LineEnd)
            };
            body = ir::Node::Cat(vec![ir::Node::Anchor(start), body, ir::Node::Anchor(end)]);
        }

        if let Some((n, offset)) = self.max_backref {
            if n > self.group_count as usize {
                return error(ErrorKind::BadSubpatternReference, offset);
            }
        }

        // Resolve names now that every group is known.
        let mut failure = None;
        let group_names = &self.group_names;
        ir::walk_mut(false, self.utf, &mut body, &mut |n, _walk| {
            if let ir::Node::NamedBackRef { name, icase, offset } = n {
                let groups: ir::BackRefGroups = group_names
                    .iter()
                    .filter(|(gname, _)| gname == name)
                    .map(|&(_, id)| id)
                    .collect();
                if groups.is_empty() {
                    failure.get_or_insert(CompileError::new(ErrorKind::UnknownGroupName, *offset));
                } else {
                    *n = ir::Node::BackRef {
                        groups,
                        icase: *icase,
                    };
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        if self.has_lookbehind {
            ir::walk_mut(false, self.utf, &mut body, &mut ir::Node::reverse_cats);
        }

        let mut nodes = vec![body];
        if self.options.auto_callout {
            let idx = self.push_callout(CalloutSite {
                pattern_position: self.pattern.len(),
                next_item_length: 0,
                number: AUTO_CALLOUT_NUMBER,
                string: None,
                string_offset: None,
            })?;
            nodes.push(ir::Node::Callout(idx as u16));
        }
        nodes.push(ir::Node::Goal);

        Ok(ir::Regex {
            node: ir::Node::Cat(nodes),
            utf: self.utf,
            group_count: self.group_count,
            group_names: self.group_names,
            callouts: self.callouts,
            marks: self.marks,
            newline: self.newline,
            bsr: self.bsr,
            has_backrefs: self.has_backrefs,
            dup_names: self.options.dup_names || self.dup_names,
            directives: self.directives,
            limits: self.limits,
        })
    }
}

fn add_class_atom(bc: &mut BracketContents, atom: ClassAtom) {
    match atom {
        ClassAtom::CodePoint(cp) => bc.cps.add_one(cp),
        ClassAtom::Set(cps) => bc.cps.add_set(&cps),
    }
}

/// Try parsing a given pattern.
/// Return the resulting IR regex, or an error.
pub fn try_parse(pattern: &str, options: &CompileOptions) -> Result<ir::Regex, CompileError> {
    let mut p = Parser {
        pattern,
        pos: 0,
        options,
        flags: Flags {
            caseless: options.caseless,
            multiline: options.multiline,
            dotall: options.dotall,
            extended: options.extended,
            ungreedy: options.ungreedy,
            no_auto_capture: options.no_auto_capture,
            dup_names: options.dup_names,
        },
        utf: options.utf,
        newline: options.newline,
        bsr: options.bsr,
        directives: options.directives.clone(),
        limits: PatternLimits::default(),
        loop_count: 0,
        group_count: 0,
        depth: 0,
        max_backref: None,
        has_lookbehind: false,
        has_backrefs: false,
        dup_names: false,
        group_names: Vec::new(),
        callouts: Vec::new(),
        pending_callouts: Vec::new(),
        marks: Vec::new(),
        literal_mode: false,
    };
    let body = p.try_parse()?;
    p.finalize(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pattern: &str) -> ir::Regex {
        match try_parse(pattern, &CompileOptions::default()) {
            Ok(re) => re,
            Err(err) => panic!("{} failed to parse: {:?}", pattern, err),
        }
    }

    fn parse_err(pattern: &str) -> CompileError {
        match try_parse(pattern, &CompileOptions::default()) {
            Ok(_) => panic!("{} should not parse", pattern),
            Err(err) => err,
        }
    }

    #[test]
    fn errors_carry_offsets() {
        let err = parse_err("ab(c");
        assert_eq!(err.kind, ErrorKind::MissingParenthesis);
        assert_eq!(err.offset, 4);
        let err = parse_err("a)");
        assert_eq!(err.kind, ErrorKind::UnmatchedParenthesis);
        assert_eq!(err.offset, 1);
        assert_eq!(parse_err("x{3,2}").kind, ErrorKind::QuantifierOutOfOrder);
        assert_eq!(parse_err("[z-a]").kind, ErrorKind::ClassRangeOutOfOrder);
        assert_eq!(parse_err("*a").kind, ErrorKind::NothingToRepeat);
        assert_eq!(parse_err("^*").kind, ErrorKind::NothingToRepeat);
        assert_eq!(parse_err("(?<n>a)(?<n>b)").kind, ErrorKind::DuplicateName);
        assert_eq!(parse_err("\\k<zz>").kind, ErrorKind::UnknownGroupName);
        assert_eq!(parse_err("(a)\\2").kind, ErrorKind::BadSubpatternReference);
        assert_eq!(parse_err("(?R)").kind, ErrorKind::RecursionNotSupported);
        assert_eq!(parse_err("[[:alpah:]]").kind, ErrorKind::UnknownPosixClass);
        assert_eq!(parse_err("(*BOGUS)").kind, ErrorKind::UnknownVerb);
    }

    #[test]
    fn braces_that_are_not_quantifiers() {
        parse("a{");
        parse("a{x}");
        parse("a{1");
        parse("{}");
        // {,2} is a quantifier with no minimum.
        assert_eq!(parse_err("{,2}").kind, ErrorKind::NothingToRepeat);
    }

    #[test]
    fn groups_and_names() {
        let re = parse("(a)(?<x>b)(?:c)(?'y'd)(?P<z>e)");
        assert_eq!(re.group_count, 4);
        let names: Vec<&str> = re.group_names.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
        assert_eq!(re.group_names[0].1, 1);
        let re = try_parse("(?J)(?<n>a)|(?<n>b)\\k<n>", &CompileOptions::default());
        assert!(re.is_ok());
    }

    #[test]
    fn leading_settings() {
        let re = parse("(*LIMIT_MATCH=10)(*CRLF)(*NO_START_OPT)abc");
        assert_eq!(re.limits.match_limit, Some(10));
        assert_eq!(re.newline, Newline::CrLf);
        assert_eq!(re.directives, vec![OptimizationDirective::NoStartOptimize]);
    }

    #[test]
    fn callout_sites() {
        let re = parse("a(?C1)bc(?C\"x\"\"y\")d+");
        assert_eq!(re.callouts.len(), 2);
        assert_eq!(re.callouts[0].number, 1);
        assert_eq!(re.callouts[0].pattern_position, 6);
        assert_eq!(re.callouts[0].next_item_length, 1);
        assert_eq!(re.callouts[1].string.as_deref(), Some("x\"y"));
        assert_eq!(re.callouts[1].string_offset, Some(12));
        assert_eq!(re.callouts[1].next_item_length, 2);

        let opts = CompileOptions::default().auto_callout(true);
        let re = match try_parse("ab+", &opts) {
            Ok(re) => re,
            Err(err) => panic!("{:?}", err),
        };
        let lengths: Vec<_> = re
            .callouts
            .iter()
            .map(|c| (c.number, c.pattern_position, c.next_item_length))
            .collect();
        assert_eq!(lengths, vec![(255, 0, 1), (255, 1, 2), (255, 3, 0)]);
    }

    #[test]
    fn quoting_and_extended() {
        let re = parse("\\Qa.b\\E+");
        let shown = re.to_string();
        assert!(shown.contains("Loop"));
        assert!(!shown.contains("MatchAny"));
        let opts = CompileOptions::from("x");
        assert!(try_parse("a b # comment\n c", &opts).is_ok());
    }
}
