//! Intermediate representation for a regex

use crate::callout::CalloutSite;
use crate::options::{Bsr, Newline, OptimizationDirective, PatternLimits};
use crate::types::{BracketContents, CaptureGroupID, CaptureGroupName};
use core::fmt;
use smallvec::SmallVec;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnchorType {
    /// \A: the very start of the subject.
    SubjectStart,
    /// ^ without multiline: the start of the subject, unless not_bol.
    LineStart,
    /// ^ with multiline: also after any newline which is not the last char.
    MultilineStart,
    /// $ without multiline: the end, or before a final newline, unless not_eol.
    LineEnd,
    /// $ with dollar_endonly: only the very end, unless not_eol.
    LineEndOnly,
    /// $ with multiline: before any newline, or at the end unless not_eol.
    MultilineEnd,
    /// \Z: the end, or before a final newline.
    FinalNewlineEnd,
    /// \z: the very end of the subject.
    SubjectEnd,
    /// \G: the position where the search started.
    SearchStart,
}

/// A Quantifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quantifier {
    /// Minimum number of iterations of the loop, inclusive.
    pub min: usize,

    /// Maximum number of iterations of the loop, inclusive, or None if unbounded.
    pub max: Option<usize>,

    /// Whether the loop is greedy.
    pub greedy: bool,
}

/// The groups referenced by a backreference.
/// Several groups only occur with duplicate names; the first which is set is
/// used.
pub type BackRefGroups = SmallVec<[CaptureGroupID; 1]>;

/// The node types of our IR.
#[derive(Debug)]
pub enum Node {
    /// Matches the empty string.
    Empty,

    /// Reaching this node terminates the match successfully.
    Goal,

    /// Match a literal character.
    /// If icase is true, then `c` MUST be already folded.
    Char { c: u32, icase: bool },

    /// Match a literal sequence of bytes.
    ByteSequence(Vec<u8>),

    /// Match any of a set of *bytes*.
    /// In UTF-8 mode these are all ASCII.
    ByteSet(Vec<u8>),

    /// Match any of a set of *chars*.
    CharSet(Vec<u32>),

    /// Match the catenation of multiple nodes.
    Cat(Vec<Node>),

    /// Match an alternation like a|b.
    Alt(Box<Node>, Box<Node>),

    /// Match anything including newlines.
    MatchAny,

    /// Match anything except a newline.
    MatchAnyExceptNewline,

    /// \R: a line ending, treating CR LF as one.
    LineBreak,

    /// Match an anchor like ^ or $
    Anchor(AnchorType),

    /// Word boundary (\b or \B).
    WordBoundary { invert: bool },

    /// A capturing group.
    CaptureGroup(Box<Node>, CaptureGroupID),

    /// A named capturing group.
    NamedCaptureGroup(Box<Node>, CaptureGroupID, CaptureGroupName),

    /// A backreference to one or more groups.
    BackRef { groups: BackRefGroups, icase: bool },

    /// A backreference by name, resolved once all groups are known.
    NamedBackRef {
        name: CaptureGroupName,
        icase: bool,
        offset: usize,
    },

    /// A bracket.
    Bracket(BracketContents),

    /// A lookaround assertions like (?:) or (?!).
    LookaroundAssertion {
        negate: bool,
        backwards: bool,
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        contents: Box<Node>,
    },

    /// An atomic group (?>..). Once it matches, it is never re-entered.
    Atomic {
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        contents: Box<Node>,
    },

    /// A loop like /.*/ or /x{3, 5}?/
    Loop {
        loopee: Box<Node>,
        quant: Quantifier,
        enclosed_groups: core::ops::Range<u16>,
    },

    /// A loop whose body matches exactly one character.
    /// Enclosed capture groups are forbidden here.
    Loop1CharBody {
        loopee: Box<Node>,
        quant: Quantifier,
        possessive: bool,
    },

    /// Invoke the callout at this index in the callout table.
    Callout(u16),

    /// (*MARK:name), with the index of the name in the mark table.
    Mark(u16),

    /// (*COMMIT)
    Commit,
}

pub type NodeList = Vec<Node>;

impl Node {
    /// Helper to return an "always fails" node.
    pub fn make_always_fails() -> Node {
        Node::CharSet(Vec::new())
    }

    /// Reverse the children of \p self if in a lookbehind.
    /// Used as a parameter to walk_mut.
    pub fn reverse_cats(&mut self, w: &mut Walk) {
        match self {
            Node::Cat(nodes) if w.in_lookbehind => nodes.reverse(),
            Node::ByteSequence(..) => panic!("Should not be reversing literal bytes"),
            _ => {}
        }
    }

    /// \return whether this is an Empty node.
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }

    /// \return whether this is a Cat node.
    pub fn is_cat(&self) -> bool {
        matches!(self, Node::Cat(..))
    }

    /// \return whether this node is known to match exactly one char.
    /// This is best-effort: a false return is always safe.
    pub fn matches_exactly_one_char(&self) -> bool {
        match self {
            Node::Char { .. } => true,
            Node::CharSet(contents) => !contents.is_empty(),
            Node::ByteSet(contents) => !contents.is_empty(),
            Node::Bracket(contents) => !contents.is_empty(),
            Node::MatchAny => true,
            Node::MatchAnyExceptNewline => true,
            _ => false,
        }
    }

    /// \return true if this node will always fail to match.
    /// Note this is different than matching the empty string.
    /// For example, an empty bracket /[]/ tries to match one char
    /// from an empty set.
    pub fn match_always_fails(&self) -> bool {
        match self {
            Node::ByteSet(bytes) => bytes.is_empty(),
            Node::CharSet(contents) => contents.is_empty(),
            Node::Bracket(contents) => contents.is_empty(),
            _ => false,
        }
    }

    /// \return whether this node or any child is a capture group.
    pub fn contains_capture_groups(&self) -> bool {
        let mut found = false;
        walk(false, true, self, &mut |n, w| {
            if matches!(n, Node::CaptureGroup(..) | Node::NamedCaptureGroup(..)) {
                found = true;
            }
            w.skip_children = found;
        });
        found
    }

    /// Duplicate a node, perhaps assigning new loop IDs. Note we must never
    /// copy a capture group.
    ///
    /// Returns None if the depth is too high, or if the node contains
    /// something which must not be copied.
    pub fn try_duplicate(&self, mut depth: usize) -> Option<Node> {
        if depth > 100 {
            return None;
        }
        depth += 1;
        Some(match self {
            Node::Empty => Node::Empty,
            Node::Goal => Node::Goal,
            &Node::Char { c, icase } => Node::Char { c, icase },
            Node::ByteSequence(bytes) => Node::ByteSequence(bytes.clone()),
            Node::ByteSet(bytes) => Node::ByteSet(bytes.clone()),
            Node::CharSet(chars) => Node::CharSet(chars.clone()),
            Node::Cat(nodes) => {
                let mut new_nodes = Vec::with_capacity(nodes.len());
                for n in nodes {
                    new_nodes.push(n.try_duplicate(depth)?);
                }
                Node::Cat(new_nodes)
            }
            Node::Alt(left, right) => Node::Alt(
                Box::new(left.try_duplicate(depth)?),
                Box::new(right.try_duplicate(depth)?),
            ),
            Node::MatchAny => Node::MatchAny,
            Node::MatchAnyExceptNewline => Node::MatchAnyExceptNewline,
            Node::LineBreak => Node::LineBreak,
            &Node::Anchor(anchor_type) => Node::Anchor(anchor_type),

            Node::Loop {
                loopee,
                quant,
                enclosed_groups,
            } => {
                if enclosed_groups.start < enclosed_groups.end {
                    return None;
                }
                Node::Loop {
                    loopee: Box::new(loopee.try_duplicate(depth)?),
                    quant: *quant,
                    enclosed_groups: enclosed_groups.clone(),
                }
            }

            Node::Loop1CharBody {
                loopee,
                quant,
                possessive,
            } => Node::Loop1CharBody {
                loopee: Box::new(loopee.try_duplicate(depth)?),
                quant: *quant,
                possessive: *possessive,
            },

            Node::CaptureGroup(..) | Node::NamedCaptureGroup(..) => return None,
            &Node::WordBoundary { invert } => Node::WordBoundary { invert },
            Node::BackRef { groups, icase } => Node::BackRef {
                groups: groups.clone(),
                icase: *icase,
            },
            Node::NamedBackRef { .. } => return None,
            Node::Bracket(bc) => Node::Bracket(bc.clone()),
            Node::LookaroundAssertion {
                negate,
                backwards,
                start_group,
                end_group,
                contents,
            } => {
                if start_group < end_group {
                    return None;
                }
                Node::LookaroundAssertion {
                    negate: *negate,
                    backwards: *backwards,
                    start_group: *start_group,
                    end_group: *end_group,
                    contents: Box::new(contents.try_duplicate(depth)?),
                }
            }
            Node::Atomic {
                start_group,
                end_group,
                contents,
            } => {
                if start_group < end_group {
                    return None;
                }
                Node::Atomic {
                    start_group: *start_group,
                    end_group: *end_group,
                    contents: Box::new(contents.try_duplicate(depth)?),
                }
            }
            &Node::Callout(idx) => Node::Callout(idx),
            &Node::Mark(idx) => Node::Mark(idx),
            Node::Commit => Node::Commit,
        })
    }
}

/// A helper type for walking.
#[derive(Debug, Clone)]
pub struct Walk {
    // It set to true, skip the children of this node.
    pub skip_children: bool,

    // The current depth of the walk.
    pub depth: usize,

    // If true, we are in a lookbehind (and so the cursor will move backwards).
    pub in_lookbehind: bool,

    // If the regex is in UTF-8 mode.
    pub utf: bool,
}

impl Walk {
    fn new(utf: bool) -> Self {
        Self {
            skip_children: false,
            depth: 0,
            in_lookbehind: false,
            utf,
        }
    }
}

#[derive(Debug)]
struct Walker<'a, F>
where
    F: FnMut(&Node, &mut Walk),
{
    func: &'a mut F,
    postorder: bool,
    walk: Walk,
}

impl<F> Walker<'_, F>
where
    F: FnMut(&Node, &mut Walk),
{
    fn process_children(&mut self, n: &Node) {
        match n {
            Node::Empty
            | Node::Goal
            | Node::Char { .. }
            | Node::ByteSequence(..)
            | Node::ByteSet(..)
            | Node::CharSet(..)
            | Node::WordBoundary { .. }
            | Node::BackRef { .. }
            | Node::NamedBackRef { .. }
            | Node::Bracket { .. }
            | Node::MatchAny
            | Node::MatchAnyExceptNewline
            | Node::LineBreak
            | Node::Anchor { .. }
            | Node::Callout(..)
            | Node::Mark(..)
            | Node::Commit => {}
            Node::Cat(nodes) => {
                for node in nodes {
                    self.process(node);
                }
            }
            Node::Alt(left, right) => {
                self.process(left.as_ref());
                self.process(right.as_ref());
            }

            Node::Loop { loopee, .. } | Node::Loop1CharBody { loopee, .. } => self.process(loopee),
            Node::CaptureGroup(contents, ..)
            | Node::NamedCaptureGroup(contents, ..)
            | Node::Atomic { contents, .. } => self.process(contents.as_ref()),

            Node::LookaroundAssertion {
                backwards,
                contents,
                ..
            } => {
                let saved = self.walk.in_lookbehind;
                self.walk.in_lookbehind = *backwards;
                self.process(contents.as_ref());
                self.walk.in_lookbehind = saved;
            }
        }
    }

    fn process(&mut self, n: &Node) {
        self.walk.skip_children = false;
        if !self.postorder {
            (self.func)(n, &mut self.walk);
        }
        if !self.walk.skip_children {
            self.walk.depth += 1;
            self.process_children(n);
            self.walk.depth -= 1;
        }
        if self.postorder {
            (self.func)(n, &mut self.walk)
        }
    }
}

#[derive(Debug)]
struct MutWalker<'a, F>
where
    F: FnMut(&mut Node, &mut Walk),
{
    func: &'a mut F,
    postorder: bool,
    walk: Walk,
}

impl<F> MutWalker<'_, F>
where
    F: FnMut(&mut Node, &mut Walk),
{
    fn process_children(&mut self, n: &mut Node) {
        match n {
            Node::Empty
            | Node::Goal
            | Node::Char { .. }
            | Node::ByteSequence(..)
            | Node::ByteSet(..)
            | Node::CharSet(..)
            | Node::MatchAny
            | Node::MatchAnyExceptNewline
            | Node::LineBreak
            | Node::Anchor { .. }
            | Node::WordBoundary { .. }
            | Node::BackRef { .. }
            | Node::NamedBackRef { .. }
            | Node::Bracket { .. }
            | Node::Callout(..)
            | Node::Mark(..)
            | Node::Commit => {}
            Node::Cat(nodes) => {
                nodes.iter_mut().for_each(|node| self.process(node));
            }
            Node::Alt(left, right) => {
                self.process(left.as_mut());
                self.process(right.as_mut());
            }

            Node::Loop { loopee, .. } | Node::Loop1CharBody { loopee, .. } => {
                self.process(loopee);
            }
            Node::CaptureGroup(contents, ..)
            | Node::NamedCaptureGroup(contents, ..)
            | Node::Atomic { contents, .. } => self.process(contents.as_mut()),

            Node::LookaroundAssertion {
                backwards,
                contents,
                ..
            } => {
                let saved = self.walk.in_lookbehind;
                self.walk.in_lookbehind = *backwards;
                self.process(contents.as_mut());
                self.walk.in_lookbehind = saved;
            }
        }
    }

    fn process(&mut self, n: &mut Node) {
        self.walk.skip_children = false;
        if !self.postorder {
            (self.func)(n, &mut self.walk);
        }
        if !self.walk.skip_children {
            self.walk.depth += 1;
            self.process_children(n);
            self.walk.depth -= 1;
        }
        if self.postorder {
            (self.func)(n, &mut self.walk);
        }
    }
}

/// Call a function on every Node.
/// If \p postorder is true, then process children before the node;
/// otherwise process children after the node.
pub fn walk<F>(postorder: bool, utf: bool, n: &Node, func: &mut F)
where
    F: FnMut(&Node, &mut Walk),
{
    let mut walker = Walker {
        func,
        postorder,
        walk: Walk::new(utf),
    };
    walker.process(n);
}

/// Call a function on every Node, which may mutate the node.
/// If \p postorder is true, then process children before the node;
/// otherwise process children after the node.
/// In preorder, the function may set skip_children to avoid descending.
pub fn walk_mut<F>(postorder: bool, utf: bool, n: &mut Node, func: &mut F)
where
    F: FnMut(&mut Node, &mut Walk),
{
    let mut walker = MutWalker {
        func,
        postorder,
        walk: Walk::new(utf),
    };
    walker.process(n);
}

/// A regex in IR form.
#[derive(Debug)]
pub struct Regex {
    pub node: Node,

    /// Whether code points are decoded from UTF-8.
    pub utf: bool,

    /// Number of capture groups, not counting the whole match.
    pub group_count: CaptureGroupID,

    /// Group names paired with their (0-based) group ids, ordered by id.
    pub group_names: Vec<(CaptureGroupName, CaptureGroupID)>,

    /// The callout sites, indexed by Node::Callout.
    pub callouts: Vec<CalloutSite>,

    /// The mark names, indexed by Node::Mark.
    pub marks: Vec<Box<str>>,

    pub newline: Newline,
    pub bsr: Bsr,

    /// Whether the pattern contains any backreferences.
    pub has_backrefs: bool,

    /// Whether group names may repeat.
    pub dup_names: bool,

    /// Optimization directives from the options, then from the pattern.
    pub directives: Vec<OptimizationDirective>,

    pub(crate) limits: PatternLimits,
}

impl Regex {
    /// \return the maximum number of characters any lookbehind inspects, or
    /// None if some lookbehind has no fixed bound.
    pub fn max_lookbehind(&self) -> Option<usize> {
        let mut result = Some(0);
        walk(false, self.utf, &self.node, &mut |n, w| {
            if let Node::LookaroundAssertion {
                backwards: true,
                contents,
                ..
            } = n
            {
                w.skip_children = true;
                result = match (result, max_width(contents)) {
                    (Some(x), Some(y)) => Some(x.max(y)),
                    _ => None,
                };
            }
        });
        result
    }
}

/// \return the minimum number of characters that \p n can match.
pub fn min_width(n: &Node) -> usize {
    match n {
        Node::Char { .. }
        | Node::ByteSet(..)
        | Node::CharSet(..)
        | Node::MatchAny
        | Node::MatchAnyExceptNewline
        | Node::LineBreak
        | Node::Bracket(..) => 1,
        // Counts bytes, not chars. Measure before literal bytes are formed.
        Node::ByteSequence(bytes) => bytes.len(),
        Node::Cat(nodes) => nodes
            .iter()
            .fold(0usize, |acc, n| acc.saturating_add(min_width(n))),
        Node::Alt(left, right) => min_width(left).min(min_width(right)),
        Node::CaptureGroup(contents, ..)
        | Node::NamedCaptureGroup(contents, ..)
        | Node::Atomic { contents, .. } => min_width(contents),
        Node::Loop { loopee, quant, .. } | Node::Loop1CharBody { loopee, quant, .. } => {
            min_width(loopee).saturating_mul(quant.min)
        }
        Node::Empty
        | Node::Goal
        | Node::Anchor(..)
        | Node::WordBoundary { .. }
        | Node::BackRef { .. }
        | Node::NamedBackRef { .. }
        | Node::LookaroundAssertion { .. }
        | Node::Callout(..)
        | Node::Mark(..)
        | Node::Commit => 0,
    }
}

/// \return the maximum number of characters that \p n can match, or None if
/// it is unbounded.
pub fn max_width(n: &Node) -> Option<usize> {
    match n {
        Node::Char { .. }
        | Node::ByteSet(..)
        | Node::CharSet(..)
        | Node::MatchAny
        | Node::MatchAnyExceptNewline
        | Node::Bracket(..) => Some(1),
        // CR LF counts as two.
        Node::LineBreak => Some(2),
        Node::ByteSequence(bytes) => Some(bytes.len()),
        Node::Cat(nodes) => nodes.iter().try_fold(0usize, |acc, n| {
            max_width(n).and_then(|w| acc.checked_add(w))
        }),
        Node::Alt(left, right) => Some(max_width(left)?.max(max_width(right)?)),
        Node::CaptureGroup(contents, ..)
        | Node::NamedCaptureGroup(contents, ..)
        | Node::Atomic { contents, .. } => max_width(contents),
        Node::Loop { loopee, quant, .. } | Node::Loop1CharBody { loopee, quant, .. } => {
            let w = max_width(loopee)?;
            if w == 0 {
                Some(0)
            } else {
                w.checked_mul(quant.max?)
            }
        }
        Node::BackRef { .. } | Node::NamedBackRef { .. } => None,
        Node::Empty
        | Node::Goal
        | Node::Anchor(..)
        | Node::WordBoundary { .. }
        | Node::LookaroundAssertion { .. }
        | Node::Callout(..)
        | Node::Mark(..)
        | Node::Commit => Some(0),
    }
}

fn display_node(node: &Node, depth: usize, f: &mut fmt::Formatter) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "..")?;
    }
    match node {
        Node::Empty => {
            writeln!(f, "Empty")?;
        }
        Node::Goal => {
            writeln!(f, "Goal")?;
        }
        Node::Char { c, icase } => {
            let c = char::from_u32(*c).unwrap_or(char::REPLACEMENT_CHARACTER);
            if *icase {
                writeln!(f, "'{}' (icase)", c)?;
            } else {
                writeln!(f, "'{}'", c)?;
            }
        }
        Node::ByteSequence(bytes) => {
            write!(f, "ByteSeq{} 0x", bytes.len())?;
            for &b in bytes {
                write!(f, "{:02x}", b)?;
            }
            writeln!(f)?;
        }
        Node::ByteSet(bytes) => {
            write!(f, "ByteSet{}", bytes.len())?;
            for &b in bytes {
                write!(f, " 0x{:x}", b)?;
            }
            writeln!(f)?;
        }
        Node::CharSet(chars) => {
            write!(f, "CharSet ")?;
            let mut first = true;
            for &c in chars {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "0x{:x}", c)?;
            }
            writeln!(f)?;
        }
        Node::Cat(..) => {
            writeln!(f, "Cat")?;
        }
        Node::Alt(..) => {
            writeln!(f, "Alt")?;
        }
        Node::MatchAny => {
            writeln!(f, "MatchAny")?;
        }
        Node::MatchAnyExceptNewline => {
            writeln!(f, "MatchAnyExceptNewline")?;
        }
        Node::LineBreak => {
            writeln!(f, "LineBreak")?;
        }
        Node::Anchor(anchor_type) => {
            writeln!(f, "Anchor {:?}", anchor_type)?;
        }
        Node::Loop {
            quant,
            enclosed_groups,
            ..
        } => {
            writeln!(f, "Loop (groups {:?}) {:?}", enclosed_groups, quant)?;
        }
        Node::Loop1CharBody {
            quant, possessive, ..
        } => {
            let kind = if *possessive { "possessive " } else { "" };
            writeln!(f, "Loop1Char {}{:?}", kind, quant)?;
        }
        Node::CaptureGroup(_node, idx) => {
            writeln!(f, "CaptureGroup {}", idx)?;
        }
        Node::NamedCaptureGroup(_node, idx, name) => {
            writeln!(f, "NamedCaptureGroup {} {:?}", idx, name)?;
        }
        &Node::WordBoundary { invert } => {
            let kind = if invert { "\\B" } else { "\\b" };
            writeln!(f, "WordBoundary {}", kind)?;
        }
        Node::BackRef { groups, icase } => {
            writeln!(f, "BackRef {:?}{}", groups, if *icase { " (icase)" } else { "" })?;
        }
        Node::NamedBackRef { name, .. } => {
            writeln!(f, "NamedBackRef {:?}", name)?;
        }
        Node::Bracket(contents) => {
            writeln!(f, "{:?}", contents)?;
        }
        &Node::LookaroundAssertion {
            negate,
            backwards,
            start_group,
            end_group,
            ..
        } => {
            let sense = if negate { "negative" } else { "positive" };
            let direction = if backwards { "backwards" } else { "forwards" };
            writeln!(
                f,
                "LookaroundAssertion {} {} {:?}",
                sense,
                direction,
                start_group..end_group
            )?;
        }
        &Node::Atomic {
            start_group,
            end_group,
            ..
        } => {
            writeln!(f, "Atomic {:?}", start_group..end_group)?;
        }
        Node::Callout(idx) => {
            writeln!(f, "Callout #{}", idx)?;
        }
        Node::Mark(idx) => {
            writeln!(f, "Mark #{}", idx)?;
        }
        Node::Commit => {
            writeln!(f, "Commit")?;
        }
    }
    Ok(())
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = Ok(());
        walk(false, self.utf, &self.node, &mut |node: &Node, walk: &mut Walk| {
            if result.is_ok() {
                result = display_node(node, walk.depth, f)
            }
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(c: char) -> Node {
        Node::Char {
            c: c as u32,
            icase: false,
        }
    }

    #[test]
    fn widths() {
        let n = Node::Cat(vec![
            ch('a'),
            Node::Alt(Box::new(ch('b')), Box::new(Node::Cat(vec![ch('c'), ch('d')]))),
        ]);
        assert_eq!(min_width(&n), 2);
        assert_eq!(max_width(&n), Some(3));
        let looped = Node::Loop {
            loopee: Box::new(ch('x')),
            quant: Quantifier {
                min: 2,
                max: None,
                greedy: true,
            },
            enclosed_groups: 0..0,
        };
        assert_eq!(min_width(&looped), 2);
        assert_eq!(max_width(&looped), None);
    }

    #[test]
    fn no_duplicating_groups() {
        let g = Node::CaptureGroup(Box::new(ch('a')), 0);
        assert!(g.try_duplicate(0).is_none());
        assert!(g.contains_capture_groups());
        assert!(ch('a').try_duplicate(0).is_some());
        assert!(!Node::Cat(vec![ch('a'), Node::Commit]).contains_capture_groups());
    }
}
