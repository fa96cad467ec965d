//! Callouts: user functions invoked at marked points during matching.

use crate::error::CalloutError;

/// What a callout asks the matcher to do next.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CalloutResult {
    /// Continue matching.
    Pass,
    /// Fail at this point and backtrack.
    Fail,
    /// Abandon the whole match.
    Abort,
}

impl CalloutResult {
    /// \return the single-byte encoding used when decisions are recorded.
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            CalloutResult::Pass => 0,
            CalloutResult::Fail => 1,
            CalloutResult::Abort => 2,
        }
    }

    /// Decode a recorded decision. Unknown bytes abort.
    pub(crate) fn from_byte(b: u8) -> CalloutResult {
        match b {
            0 => CalloutResult::Pass,
            1 => CalloutResult::Fail,
            _ => CalloutResult::Abort,
        }
    }
}

/// A callout in a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutSite {
    /// Byte offset of the item following the callout.
    pub pattern_position: usize,

    /// Byte length of the item following the callout.
    pub next_item_length: usize,

    /// The callout number. String callouts and `(?C)` report 0; automatic
    /// callouts report 255.
    pub number: u8,

    /// The callout string of `(?C"text")`, with doubled delimiters undone.
    pub string: Option<Box<str>>,

    /// Byte offset of the callout string in the pattern.
    pub string_offset: Option<usize>,
}

/// The state of a match when a callout is invoked.
#[derive(Debug, Clone, Copy)]
pub struct CalloutEvent<'a> {
    pub number: u8,
    pub string: Option<&'a str>,

    /// Where the current match attempt started.
    pub start_match: usize,
    pub current_position: usize,

    /// One more than the highest group number that has been set so far.
    pub capture_top: usize,

    /// The number of the most recently closed group, or 0.
    pub capture_last: usize,

    pub pattern_position: usize,
    pub next_item_length: usize,

    /// The most recent mark on the current path.
    pub mark: Option<&'a str>,

    pub subject: &'a [u8],

    /// Capture offsets so far. Slot 0 is `(start_match, current_position)`.
    pub offsets: &'a [Option<(usize, usize)>],
}

impl<'a> CalloutEvent<'a> {
    /// \return the text of a group captured so far, if set.
    pub fn group(&self, idx: usize) -> Option<&'a [u8]> {
        let (start, end) = (*self.offsets.get(idx)?)?;
        self.subject.get(start..end)
    }
}

/// A match callout. Returning an error aborts the match and hands the error
/// back through `MatchError::CalloutAborted`.
pub type CalloutFn<'c> = dyn FnMut(&CalloutEvent<'_>) -> Result<CalloutResult, CalloutError> + 'c;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_bytes() {
        for r in [CalloutResult::Pass, CalloutResult::Fail, CalloutResult::Abort] {
            assert_eq!(CalloutResult::from_byte(r.to_byte()), r);
        }
        assert_eq!(CalloutResult::from_byte(7), CalloutResult::Abort);
    }
}
