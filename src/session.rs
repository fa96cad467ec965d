//! Reusable match state for repeated matching with one regex.

use crate::api::{MatchResult, Regex};
use crate::callout::CalloutFn;
use crate::classicalbacktrack::BacktrackStack;
use crate::error::MatchError;
use crate::options::{MatchOptions, MatchSettings};

/// Holds the backtracking storage and result of one regex across many match
/// calls. Each call overwrites the previous result.
#[derive(Debug)]
pub struct MatchSession<'r> {
    re: &'r Regex,
    settings: MatchSettings,
    stack: BacktrackStack,
    result: MatchResult,
}

impl<'r> MatchSession<'r> {
    pub(crate) fn new(re: &'r Regex, settings: MatchSettings) -> Self {
        MatchSession {
            re,
            settings,
            stack: BacktrackStack::new(),
            result: MatchResult::new(re.capture_count()),
        }
    }

    /// Match \p subject from \p start, reusing the session's storage.
    pub fn match_at(
        &mut self,
        subject: &[u8],
        start: usize,
        opts: &MatchOptions,
        callout: Option<&mut CalloutFn<'_>>,
    ) -> Result<&MatchResult, MatchError> {
        self.re.match_into(
            subject,
            start,
            opts,
            &self.settings,
            callout,
            &mut self.stack,
            &mut self.result,
        )?;
        Ok(&self.result)
    }

    /// \return the result of the last successful call.
    #[inline]
    pub fn last_result(&self) -> &MatchResult {
        &self.result
    }

    #[inline]
    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    #[inline]
    pub fn regex(&self) -> &'r Regex {
        self.re
    }

    /// Release the session's storage.
    pub fn release(self) {
        trace!(
            "Releasing match session with {} backtracking frames",
            self.stack.capacity()
        );
    }
}

impl Regex {
    /// Start a session for repeated matching with \p settings.
    pub fn session(&self, settings: &MatchSettings) -> MatchSession<'_> {
        MatchSession::new(self, *settings)
    }
}
