use crate::codepointset::CodePointSet;

/// A group index is u16.
/// CaptureGroupID 0 corresponds to the first capture group.
pub type CaptureGroupID = u16;

/// The name of a named capture group.
pub type CaptureGroupName = String;

/// The maximum number of capture groups supported.
pub const MAX_CAPTURE_GROUPS: usize = 65535;

/// The maximum number of loops supported.
pub const MAX_LOOPS: usize = 65535;
pub type LoopID = u16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CharacterClassType {
    Digits,
    Spaces,
    Words,
    HorizontalSpaces,
    VerticalSpaces,
}

/// The stuff in a bracket.
/// Caseless brackets are closed under case folding when built, so matching
/// never folds at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketContents {
    pub invert: bool,
    pub cps: CodePointSet,
}

impl BracketContents {
    /// \return whether the bracket matches the code point \p cp.
    /// Respects 'invert'.
    #[inline(always)]
    pub(crate) fn bracket(&self, cp: u32) -> bool {
        self.cps.contains(cp) != self.invert
    }

    /// \return true if the bracket matches nothing.
    pub fn is_empty(&self) -> bool {
        if self.invert {
            self.cps.contains_all_up_to(crate::codepointset::CODE_POINT_MAX)
        } else {
            self.cps.is_empty()
        }
    }

    /// \return the positive set of matched code points.
    pub fn positive_set(&self) -> CodePointSet {
        if self.invert {
            self.cps.inverted()
        } else {
            self.cps.clone()
        }
    }
}

/// An instruction pointer.
pub type IP = usize;

/// Representation of a loop.
#[derive(Debug, Copy, Clone)]
pub struct LoopData {
    pub iters: usize,
    pub entry: usize,
}

impl LoopData {
    pub fn new(entry: usize) -> LoopData {
        LoopData { iters: 0, entry }
    }
}

/// Representation of a capture group.
/// `start` and `end` are the committed extent; `open` is the start of an
/// iteration which has begun but not yet finished.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GroupData {
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub open: Option<usize>,
}

impl GroupData {
    pub fn new() -> GroupData {
        GroupData::default()
    }

    #[inline]
    pub fn as_range(&self) -> Option<core::ops::Range<usize>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(start..end),
            _ => None,
        }
    }
}
