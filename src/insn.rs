//! Bytecode instructions for a compiled regex

use crate::bytesearch::{AsciiBitmap, ByteAlternatives, ByteBitmap, LiteralSearcher};
use crate::callout::CalloutSite;
use crate::options::{Bsr, Newline, PatternLimits};
use crate::types::{BracketContents, CaptureGroupID, LoopID};

pub type JumpTarget = u32;

/// The maximum size of a CharSet instruction.
/// Larger sets become brackets.
pub const MAX_CHAR_SET_LENGTH: usize = 4;

#[derive(Debug, Clone)]
pub struct LoopFields {
    pub loop_id: LoopID,
    pub min_iters: usize,
    pub max_iters: usize,
    pub greedy: bool,
    pub exit: JumpTarget,
}

#[derive(Debug, Clone)]
/// The list of bytecode instructions.
pub enum Insn {
    /// The match was successful.
    Goal,

    /// Match a single char.
    Char(u32),

    /// Match a single char, case-insensitive. The char is folded.
    CharICase(u32),

    /// \A
    SubjectStart,

    /// ^ without multiline.
    LineStart,

    /// ^ with multiline.
    MultilineStart,

    /// $ without multiline.
    LineEnd,

    /// $ with dollar_endonly.
    LineEndOnly,

    /// $ with multiline.
    MultilineEnd,

    /// \Z
    FinalNewlineEnd,

    /// \z
    SubjectEnd,

    /// \G
    SearchStart,

    /// Match any character; emitted by '.' when dotall is set.
    MatchAny,

    /// Match any character except a newline; emitted by '.'
    MatchAnyExceptNewline,

    /// \R
    LineBreak,

    /// Enter a loop from "outside".
    EnterLoop(LoopFields),

    /// Re-enter a loop.
    LoopAgain { begin: JumpTarget },

    /// The next instruction is a "1Char" instruction which always matches one
    /// character. Attempt to match it [min, max] times.
    /// A possessive loop never gives back what it matched.
    Loop1CharBody {
        min_iters: usize,
        max_iters: usize,
        greedy: bool,
        possessive: bool,
    },

    /// Set the IP to a new value.
    Jump { target: JumpTarget },

    /// The next instruction is the primary branch.
    /// If it fails to match, jump to secondary.
    Alt { secondary: JumpTarget },

    /// Enter a capture group.
    BeginCaptureGroup(CaptureGroupID),

    /// Exit a capture group.
    EndCaptureGroup(CaptureGroupID),

    /// Perform a backreference match against the first set group.
    BackRef {
        groups: Box<[CaptureGroupID]>,
        icase: bool,
    },

    /// Match the next character against the bracket contents, stored at the
    /// given index in the CompiledRegex.
    Bracket(usize),

    /// A simple bitmap bracket for ASCII.
    /// It contains a bitmap of the range [0, 127].
    AsciiBracket(AsciiBitmap),

    /// Perform a lookahead assertion.
    Lookahead {
        negate: bool,
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        continuation: JumpTarget,
    },

    /// Perform a lookbehind assertion.
    Lookbehind {
        negate: bool,
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        continuation: JumpTarget,
    },

    /// Match an atomic group: the body runs to its first success, and is
    /// never re-entered on backtracking.
    Atomic {
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        continuation: JumpTarget,
    },

    /// \b or \B word boundaries.
    WordBoundary { invert: bool },

    /// Match any of the contained chars.
    CharSet(Box<[u32]>),

    /// Match the next byte against a set of bytes.
    /// In UTF-8 mode all bytes are ASCII.
    ByteSet(ByteBitmap),

    /// Match a sequence of literal bytes.
    ByteSeq(Box<[u8]>),

    /// Invoke the callout at the given index.
    Callout(u16),

    /// Set the current mark to the name at the given index.
    Mark(u16),

    /// (*COMMIT)
    Commit,

    /// An instruction that always fails, which may be produced in weird cases
    /// like an inverted bracket which matches everything.
    JustFail,
}

/// The peeled prefix start predicate.
/// This is a fast way of locating the first potential match.
#[derive(Debug, Clone)]
pub enum StartPredicate {
    /// May match an arbitrary sequence.
    Arbitrary,

    /// Look for the first instance of any of the given bytes.
    Alternatives(ByteAlternatives),

    /// Look for a byte sequence.
    Literal(LiteralSearcher),

    /// Look for a byte which matches the bitmap.
    Bitmap(ByteBitmap),

    /// Only try matching at the search start.
    StartAnchored,

    /// Only try matching at the search start and after newlines.
    AfterNewline,
}

#[derive(Debug, Clone)]
pub struct CompiledRegex {
    // Sequence of instructions.
    pub insns: Vec<Insn>,

    // The bracket contents, indexed by the value of the `Bracket` instruction.
    pub brackets: Vec<BracketContents>,

    // Predicate to rapidly find the first potential match.
    pub start_pred: StartPredicate,

    // Number of loops, used to populate loop data.
    pub loops: u32,

    // Number of capture groups, used to populate capture group data.
    pub groups: u32,

    // Group names, indexed by group id. Unnamed groups have an empty name.
    // Empty if there were no named groups.
    pub group_names: Box<[Box<str>]>,

    pub callouts: Box<[CalloutSite]>,
    pub marks: Box<[Box<str>]>,

    pub newline: Newline,
    pub bsr: Bsr,
    pub utf: bool,

    // Every match must start at the start offset.
    pub anchored: bool,

    // Every match must end at the end of the subject.
    pub end_anchored: bool,

    pub match_unset_backref: bool,

    // Matches must start before the first newline at or after the start offset.
    pub firstline: bool,

    // How many characters lookbehinds may inspect before a start position,
    // or None if some lookbehind is unbounded.
    pub max_lookbehind: Option<usize>,

    // A lower bound on the length of any match, in characters.
    pub min_length: usize,

    // Limits set by the pattern itself, like (*LIMIT_MATCH=n).
    pub(crate) limits: PatternLimits,
}
