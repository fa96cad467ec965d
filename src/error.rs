//! Error types, stable error codes, and their human-readable messages.

use std::error::Error as StdError;
use std::fmt;

/// The reason a pattern failed to compile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A backslash at the very end of the pattern.
    EndBackslash,
    /// An escape sequence which is not recognized or is malformed.
    BadEscape,
    /// A code point in `\x{..}` or `\o{..}` which is too large.
    CodePointTooLarge,
    /// A character class without its closing `]`.
    MissingBracket,
    /// A range like `[z-a]`.
    ClassRangeOutOfOrder,
    /// A range whose endpoint is a class, like `[\d-z]`.
    InvalidClassRange,
    /// A quantifier like `{3,2}`.
    QuantifierOutOfOrder,
    /// A quantifier bound above 65535.
    QuantifierTooBig,
    /// A quantifier which does not follow a repeatable item.
    NothingToRepeat,
    /// A group without its closing `)`.
    MissingParenthesis,
    /// A `)` without a matching `(`.
    UnmatchedParenthesis,
    /// An unrecognized character after `(?`.
    BadGroupSyntax,
    /// A group name which is malformed or missing its terminator.
    BadGroupName,
    /// A reference to a name which no group declares.
    UnknownGroupName,
    /// A reference to a group number which does not exist.
    BadSubpatternReference,
    /// Two groups with the same name, without `dup_names`.
    DuplicateName,
    /// Group nesting deeper than `parens_nest_limit`.
    ParensNestTooDeep,
    /// More capture groups or loops than the engine supports.
    PatternTooLarge,
    /// The pattern is longer than `max_pattern_length`.
    PatternTooLong,
    /// The compiled program is longer than `max_pattern_compiled_length`.
    CompiledPatternTooLong,
    /// A malformed callout.
    BadCallout,
    /// A callout number above 255.
    CalloutNumberTooBig,
    /// A callout string without its closing delimiter.
    MissingCalloutDelimiter,
    /// A `(*VERB)` which is not recognized, or lacks a required name.
    UnknownVerb,
    /// An unknown POSIX class name like `[:foo:]`.
    UnknownPosixClass,
    /// A POSIX class like `[:alpha:]` outside of a character class.
    PosixClassOutsideClass,
    /// An unterminated `(?#` comment.
    MissingCommentEnd,
    /// Recursion or subroutine calls like `(?R)` or `(?1)`.
    RecursionNotSupported,
    /// A construct the engine does not implement, like `(?|..)`.
    UnsupportedConstruct,
    /// An internal invariant was violated. This is always a bug.
    Internal,
}

impl ErrorKind {
    /// \return the stable (positive) code for this compile error kind.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::EndBackslash => 101,
            ErrorKind::BadEscape => 103,
            ErrorKind::QuantifierOutOfOrder => 104,
            ErrorKind::QuantifierTooBig => 105,
            ErrorKind::MissingBracket => 106,
            ErrorKind::ClassRangeOutOfOrder => 108,
            ErrorKind::NothingToRepeat => 109,
            ErrorKind::BadGroupSyntax => 111,
            ErrorKind::PosixClassOutsideClass => 112,
            ErrorKind::MissingParenthesis => 114,
            ErrorKind::BadSubpatternReference => 115,
            ErrorKind::MissingCommentEnd => 118,
            ErrorKind::ParensNestTooDeep => 119,
            ErrorKind::PatternTooLarge => 120,
            ErrorKind::UnmatchedParenthesis => 122,
            ErrorKind::UnknownPosixClass => 130,
            ErrorKind::CodePointTooLarge => 134,
            ErrorKind::CalloutNumberTooBig => 138,
            ErrorKind::BadCallout => 139,
            ErrorKind::BadGroupName => 142,
            ErrorKind::DuplicateName => 143,
            ErrorKind::InvalidClassRange => 150,
            ErrorKind::UnknownGroupName => 165,
            ErrorKind::UnknownVerb => 160,
            ErrorKind::RecursionNotSupported => 167,
            ErrorKind::MissingCalloutDelimiter => 181,
            ErrorKind::PatternTooLong => 188,
            ErrorKind::CompiledPatternTooLong => 189,
            ErrorKind::UnsupportedConstruct => 190,
            ErrorKind::Internal => 199,
        }
    }

    fn from_code(code: i32) -> Option<ErrorKind> {
        ALL_KINDS.iter().copied().find(|k| k.code() == code)
    }

    /// \return a human-readable description of this error kind.
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::EndBackslash => "\\ at end of pattern",
            ErrorKind::BadEscape => "unrecognized or malformed escape sequence",
            ErrorKind::CodePointTooLarge => "character code point value is too large",
            ErrorKind::MissingBracket => "missing terminating ] for character class",
            ErrorKind::ClassRangeOutOfOrder => "range out of order in character class",
            ErrorKind::InvalidClassRange => "invalid range in character class",
            ErrorKind::QuantifierOutOfOrder => "numbers out of order in {} quantifier",
            ErrorKind::QuantifierTooBig => "number too big in {} quantifier",
            ErrorKind::NothingToRepeat => "quantifier does not follow a repeatable item",
            ErrorKind::MissingParenthesis => "missing closing parenthesis",
            ErrorKind::UnmatchedParenthesis => "unmatched closing parenthesis",
            ErrorKind::BadGroupSyntax => "unrecognized character after (? or (?-",
            ErrorKind::BadGroupName => "syntax error in subpattern name",
            ErrorKind::UnknownGroupName => "reference to non-existent subpattern name",
            ErrorKind::BadSubpatternReference => "reference to non-existent subpattern",
            ErrorKind::DuplicateName => "two named subpatterns have the same name",
            ErrorKind::ParensNestTooDeep => "parentheses are too deeply nested",
            ErrorKind::PatternTooLarge => "regular expression is too large",
            ErrorKind::PatternTooLong => "pattern string is longer than the configured limit",
            ErrorKind::CompiledPatternTooLong => {
                "compiled pattern is longer than the configured limit"
            }
            ErrorKind::BadCallout => "closing parenthesis for (?C expected",
            ErrorKind::CalloutNumberTooBig => "number after (?C is greater than 255",
            ErrorKind::MissingCalloutDelimiter => {
                "missing terminating delimiter for callout with string argument"
            }
            ErrorKind::UnknownVerb => "(*VERB) not recognized or malformed",
            ErrorKind::UnknownPosixClass => "unknown POSIX class name",
            ErrorKind::PosixClassOutsideClass => {
                "POSIX named classes are supported only within a class"
            }
            ErrorKind::MissingCommentEnd => "missing ) after (?# comment",
            ErrorKind::RecursionNotSupported => "recursion and subroutine calls are not supported",
            ErrorKind::UnsupportedConstruct => "this construct is not supported",
            ErrorKind::Internal => "internal error: invariant violated while compiling",
        }
    }
}

const ALL_KINDS: [ErrorKind; 30] = [
    ErrorKind::EndBackslash,
    ErrorKind::BadEscape,
    ErrorKind::CodePointTooLarge,
    ErrorKind::MissingBracket,
    ErrorKind::ClassRangeOutOfOrder,
    ErrorKind::InvalidClassRange,
    ErrorKind::QuantifierOutOfOrder,
    ErrorKind::QuantifierTooBig,
    ErrorKind::NothingToRepeat,
    ErrorKind::MissingParenthesis,
    ErrorKind::UnmatchedParenthesis,
    ErrorKind::BadGroupSyntax,
    ErrorKind::BadGroupName,
    ErrorKind::UnknownGroupName,
    ErrorKind::BadSubpatternReference,
    ErrorKind::DuplicateName,
    ErrorKind::ParensNestTooDeep,
    ErrorKind::PatternTooLarge,
    ErrorKind::PatternTooLong,
    ErrorKind::CompiledPatternTooLong,
    ErrorKind::BadCallout,
    ErrorKind::CalloutNumberTooBig,
    ErrorKind::MissingCalloutDelimiter,
    ErrorKind::UnknownVerb,
    ErrorKind::UnknownPosixClass,
    ErrorKind::PosixClassOutsideClass,
    ErrorKind::MissingCommentEnd,
    ErrorKind::RecursionNotSupported,
    ErrorKind::UnsupportedConstruct,
    ErrorKind::Internal,
];

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Represents an error encountered during regex compilation.
/// The offset is a byte offset into the pattern, suitable for caret-style
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub offset: usize,
}

impl CompileError {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        CompileError { kind, offset }
    }

    /// \return the stable code of this error.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)
    }
}

impl StdError for CompileError {}

/// The payload a callout may carry out of a match.
/// It wraps whatever error the callout produced.
pub struct CalloutError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
}

impl CalloutError {
    /// Wrap an arbitrary error.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        CalloutError { inner: err.into() }
    }

    /// Construct from a message.
    pub fn msg(text: impl Into<String>) -> Self {
        CalloutError {
            inner: text.into().into(),
        }
    }

    /// \return the wrapped error.
    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.inner
    }

    /// Attempt to downcast the wrapped error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }
}

impl fmt::Debug for CalloutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("CalloutError").field(&self.inner).finish()
    }
}

impl fmt::Display for CalloutError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for CalloutError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

/// Code reported for "no match". This is a normal result, not an error.
pub const NO_MATCH_CODE: i32 = -1;

/// Code reported for a partial match. This is a normal result, not an error.
pub const PARTIAL_CODE: i32 = -2;

/// An error produced while matching, scanning, or substituting.
/// No-match and partial results are not errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum MatchError {
    /// The start offset is beyond the subject, or not on a character boundary.
    BadOffset,
    /// The subject is not valid UTF-8; `offset` is the first bad byte.
    BadUtf { offset: usize },
    /// The step limit was exhausted.
    MatchLimit,
    /// The backtracking depth limit was exhausted.
    DepthLimit,
    /// The backtracking heap limit was exhausted.
    HeapLimit,
    /// A callout aborted the match, possibly with its own error.
    CalloutAborted(Option<CalloutError>),
    /// The pattern uses a construct all-matches scanning cannot express.
    DfaUnsupported(&'static str),
    /// The all-matches workspace ran out of cells.
    DfaWorkspaceTooSmall,
    /// A restart was requested but the workspace holds no saved scan.
    DfaBadRestart,
    /// The substitution output did not fit; `required` is the exact size.
    NoMemory { required: usize },
    /// The replacement template is malformed at `offset`.
    BadReplacement { offset: usize },
    /// The replacement names a group which does not exist.
    UnknownGroup,
    /// The replacement references a group which did not participate.
    UnsetGroup,
    /// An internal invariant was violated. This is always a bug.
    Internal(&'static str),
}

impl MatchError {
    /// \return the stable (negative) code of this error.
    pub fn code(&self) -> i32 {
        match self {
            MatchError::BadUtf { .. } => -3,
            MatchError::BadOffset => -33,
            MatchError::BadReplacement { .. } => -35,
            MatchError::CalloutAborted(..) => -37,
            MatchError::DfaBadRestart => -38,
            MatchError::DfaUnsupported(..) => -42,
            MatchError::DfaWorkspaceTooSmall => -43,
            MatchError::Internal(..) => -44,
            MatchError::MatchLimit => -47,
            MatchError::NoMemory { .. } => -48,
            MatchError::UnknownGroup => -49,
            MatchError::DepthLimit => -52,
            MatchError::UnsetGroup => -55,
            MatchError::HeapLimit => -63,
        }
    }

    /// \return the callout payload, if this error carries one.
    pub fn callout_error(&self) -> Option<&CalloutError> {
        match self {
            MatchError::CalloutAborted(payload) => payload.as_ref(),
            _ => None,
        }
    }
}

fn match_code_message(code: i32) -> Option<&'static str> {
    Some(match code {
        NO_MATCH_CODE => "no match",
        PARTIAL_CODE => "partial match",
        -3 => "UTF-8 error: invalid byte sequence in subject",
        -33 => "bad offset value",
        -35 => "invalid replacement string",
        -37 => "match aborted by callout",
        -38 => "invalid data in workspace for DFA restart",
        -42 => "pattern contains an item that is not supported for DFA matching",
        -43 => "workspace size exceeded in DFA matching",
        -44 => "internal error: invariant violated while matching",
        -47 => "match limit exceeded",
        -48 => "no more memory",
        -49 => "unknown substring",
        -52 => "depth limit exceeded",
        -55 => "requested value is not set",
        -63 => "heap limit exceeded",
        _ => return None,
    })
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match_code_message(self.code()).unwrap_or("unknown error");
        match self {
            MatchError::BadUtf { offset } => write!(f, "{} at offset {}", text, offset),
            MatchError::NoMemory { required } => {
                write!(f, "{}: {} bytes of output required", text, required)
            }
            MatchError::BadReplacement { offset } => write!(f, "{} at offset {}", text, offset),
            MatchError::DfaUnsupported(construct) => write!(f, "{}: {}", text, construct),
            MatchError::Internal(what) => write!(f, "{}: {}", text, what),
            MatchError::CalloutAborted(Some(payload)) => write!(f, "{}: {}", text, payload),
            _ => f.write_str(text),
        }
    }
}

impl StdError for MatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            MatchError::CalloutAborted(Some(payload)) => Some(payload),
            _ => None,
        }
    }
}

/// \return the message for an error code.
/// This is total: every i32 yields a message, with a generic fallback for
/// codes that are not assigned.
pub fn error_message(code: i32) -> String {
    if code == 0 {
        return "no error".to_string();
    }
    if code > 0 {
        if let Some(kind) = ErrorKind::from_code(code) {
            return kind.message().to_string();
        }
    } else if let Some(text) = match_code_message(code) {
        return text.to_string();
    }
    format!("unknown error code {}", code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_codes_are_distinct() {
        for (idx, a) in ALL_KINDS.iter().enumerate() {
            assert!(a.code() > 100);
            for b in &ALL_KINDS[idx + 1..] {
                assert_ne!(a.code(), b.code(), "{:?} and {:?} share a code", a, b);
            }
            assert_eq!(ErrorKind::from_code(a.code()), Some(*a));
        }
    }

    #[test]
    fn messages_are_total() {
        for code in [i32::MIN, -1000, -64, -2, -1, 0, 1, 100, 150, 199, i32::MAX] {
            assert!(!error_message(code).is_empty());
        }
        assert_eq!(error_message(-47), "match limit exceeded");
        assert_eq!(error_message(-12345), "unknown error code -12345");
        assert_eq!(error_message(114), "missing closing parenthesis");
    }

    #[test]
    fn callout_payload_is_source() {
        let err = MatchError::CalloutAborted(Some(CalloutError::msg("stop")));
        assert_eq!(err.code(), -37);
        assert_eq!(err.source().map(|s| s.to_string()), Some("stop".to_string()));
        assert_eq!(err.to_string(), "match aborted by callout: stop");
    }
}
