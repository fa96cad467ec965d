//! Substitution of matches in a subject.
//!
//! The core pass writes into a caller-provided buffer and, on overflow,
//! keeps going so the exact size needed can be reported. The growable entry
//! points build on it: without callouts they size the output in at most two
//! passes; with callouts every decision is recorded on the first pass that
//! makes it and replayed on later passes, so user callouts run once per
//! decision point.

use crate::api::{Match, MatchResult, Regex};
use crate::callout::{CalloutEvent, CalloutFn, CalloutResult};
use crate::classicalbacktrack::BacktrackStack;
use crate::error::{CalloutError, MatchError};
use crate::exec::{check_subject, GlobalCursor};
use crate::options::{MatchOptions, MatchSettings, SubstituteOptions};
use crate::replacement::{ExpandOptions, GroupSource, Sink, Template};
use core::fmt;

/// The state of a substitution when a substitute callout is invoked, just
/// after a replacement was written.
#[derive(Debug, Clone, Copy)]
pub struct SubstituteCalloutEvent<'a> {
    /// The number of this substitution, counting from 1. Rejected
    /// substitutions are counted.
    pub substitution: usize,
    pub subject: &'a [u8],

    /// The offsets of the match; slot 0 is the whole match.
    pub offsets: &'a [Option<(usize, usize)>],

    /// The output so far, if it fits in the output buffer.
    pub output: Option<&'a [u8]>,

    /// Where the replacement was written in the output.
    pub output_range: (usize, usize),
}

impl<'a> SubstituteCalloutEvent<'a> {
    /// \return the replacement just written, if the output fits.
    pub fn replacement(&self) -> Option<&'a [u8]> {
        let (start, end) = self.output_range;
        self.output?.get(start..end)
    }

    /// \return the matched text.
    pub fn matched(&self) -> Option<&'a [u8]> {
        let (start, end) = (*self.offsets.first()?)?;
        self.subject.get(start..end)
    }
}

/// A substitute callout. `Pass` keeps the replacement; `Fail` puts the
/// matched text back; `Abort` puts the matched text back and copies the rest
/// of the subject unchanged. Returning an error aborts the substitution.
pub type SubstituteCalloutFn<'c> =
    dyn FnMut(&SubstituteCalloutEvent<'_>) -> Result<CalloutResult, CalloutError> + 'c;

/// Callouts for one substitution pass.
#[derive(Default)]
pub struct SubstituteCallouts<'a, 'f> {
    pub on_match: Option<&'a mut CalloutFn<'f>>,
    pub on_substitute: Option<&'a mut SubstituteCalloutFn<'f>>,
}

impl fmt::Debug for SubstituteCallouts<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SubstituteCallouts")
            .field("on_match", &self.on_match.is_some())
            .field("on_substitute", &self.on_substitute.is_some())
            .finish()
    }
}

/// Recorded callout decisions, one byte each.
/// Decisions are appended on the first pass that reaches them and replayed
/// verbatim on later passes.
#[derive(Debug, Default)]
pub(crate) struct ReplayQueue {
    decisions: Vec<u8>,
    cursor: usize,
}

impl ReplayQueue {
    /// Start replaying from the first decision.
    pub(crate) fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// \return the next recorded decision, or make one with \p decide and
    /// record it.
    pub(crate) fn replay_or<E>(
        &mut self,
        decide: impl FnOnce() -> Result<CalloutResult, E>,
    ) -> Result<CalloutResult, E> {
        if let Some(&b) = self.decisions.get(self.cursor) {
            self.cursor += 1;
            return Ok(CalloutResult::from_byte(b));
        }
        let decision = decide()?;
        self.decisions.push(decision.to_byte());
        self.cursor += 1;
        Ok(decision)
    }

    pub(crate) fn len(&self) -> usize {
        self.decisions.len()
    }
}

/// An output window which counts what it cannot hold.
struct Output<'o> {
    buf: &'o mut [u8],
    len: usize,
    // Where the first write which did not fit began.
    overflow_at: Option<usize>,
}

impl<'o> Output<'o> {
    fn new(buf: &'o mut [u8]) -> Self {
        Output {
            buf,
            len: 0,
            overflow_at: None,
        }
    }

    fn truncate(&mut self, len: usize) {
        if self.overflow_at.map_or(false, |at| at >= len) {
            self.overflow_at = None;
        }
        self.len = len;
    }

    fn written(&self) -> Option<&[u8]> {
        match self.overflow_at {
            None => self.buf.get(..self.len),
            Some(_) => None,
        }
    }
}

impl Sink for Output<'_> {
    fn push(&mut self, bytes: &[u8]) {
        if self.overflow_at.is_none() {
            match self.buf.get_mut(self.len..self.len + bytes.len()) {
                Some(dst) => dst.copy_from_slice(bytes),
                None => self.overflow_at = Some(self.len),
            }
        }
        self.len += bytes.len();
    }
}

/// Group lookups against one match.
struct MatchView<'a> {
    re: &'a Regex,
    subject: &'a [u8],
    result: &'a MatchResult,
}

impl GroupSource for MatchView<'_> {
    fn capture_count(&self) -> usize {
        self.re.capture_count()
    }

    fn indexes_for(&self, name: &str) -> &[usize] {
        self.re.group_indexes(name).unwrap_or(&[])
    }

    fn group_text(&self, idx: usize) -> Option<&[u8]> {
        let (start, end) = self.result.get(idx)?;
        self.subject.get(start..end)
    }

    fn mark(&self) -> Option<&str> {
        self.result.mark()
    }
}

/// The outcome of one complete pass.
#[derive(Debug, Copy, Clone)]
struct PassOutcome {
    len: usize,
    count: usize,
}

#[allow(clippy::too_many_arguments)]
fn run_pass(
    re: &Regex,
    subject: &[u8],
    start: usize,
    template: &Template,
    opts: &SubstituteOptions,
    settings: &MatchSettings,
    output: &mut [u8],
    callouts: &mut SubstituteCallouts<'_, '_>,
) -> Result<PassOutcome, MatchError> {
    check_subject(re.compiled(), subject, start, &opts.flags)?;
    let expand_opts = ExpandOptions {
        unknown_unset: opts.unknown_unset,
        unset_empty: opts.unset_empty,
    };
    // The subject was validated above.
    let flags = MatchOptions {
        no_utf_check: true,
        ..opts.flags
    };
    let copy_unmatched = !opts.replacement_only;

    let mut out = Output::new(output);
    if copy_unmatched {
        out.push(&subject[..start]);
    }
    let mut copied_to = start;
    let mut cursor = GlobalCursor::new(start);
    let mut stack = BacktrackStack::new();
    let mut result = MatchResult::new(re.capture_count());
    let mut substitution = 0;
    let mut count = 0;
    let (utf, newline) = (re.compiled().utf, re.compiled().newline);

    loop {
        let on_match = &mut callouts.on_match;
        let found = cursor.advance(subject, utf, newline, &flags, &mut result, |pos, o, r| {
            re.match_into(subject, pos, o, settings, on_match.as_deref_mut(), &mut stack, r)
        })?;
        if !found {
            break;
        }
        let (match_start, match_end) = match result.get(0) {
            Some(range) => range,
            None => break,
        };
        if copy_unmatched {
            out.push(&subject[copied_to.min(match_start)..match_start]);
        }
        let repl_start = out.len;
        let view = MatchView {
            re,
            subject,
            result: &result,
        };
        template.expand(&view, expand_opts, &mut out)?;
        substitution += 1;

        let decision = match callouts.on_substitute.as_mut() {
            Some(cb) => {
                let event = SubstituteCalloutEvent {
                    substitution,
                    subject,
                    offsets: result.offsets(),
                    output: out.written(),
                    output_range: (repl_start, out.len),
                };
                (**cb)(&event).map_err(|err| MatchError::CalloutAborted(Some(err)))?
            }
            None => CalloutResult::Pass,
        };
        match decision {
            CalloutResult::Pass => count += 1,
            CalloutResult::Fail | CalloutResult::Abort => {
                out.truncate(repl_start);
                if copy_unmatched {
                    out.push(&subject[match_start..match_end]);
                }
            }
        }
        copied_to = match_end;
        if decision == CalloutResult::Abort || !opts.global {
            break;
        }
    }
    if copy_unmatched {
        out.push(&subject[copied_to..]);
    }
    if out.overflow_at.is_some() {
        return Err(MatchError::NoMemory { required: out.len });
    }
    Ok(PassOutcome {
        len: out.len,
        count,
    })
}

/// The result of a substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    output: Vec<u8>,
    count: usize,
    attempts: usize,
}

impl Substitution {
    /// \return the substituted text.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn into_output(self) -> Vec<u8> {
        self.output
    }

    /// \return the output as text, if it is UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.output).ok()
    }

    /// \return how many replacements were kept.
    pub fn count(&self) -> usize {
        self.count
    }

    /// \return how many passes over the subject were made.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

/// Configures and runs a substitution, growing the output as needed.
pub struct Substituter<'r, 'p, 'c> {
    re: &'r Regex,
    replacement: &'p [u8],
    options: SubstituteOptions,
    settings: MatchSettings,
    start: usize,
    buffer_size: Option<usize>,
    match_callout: Option<Box<CalloutFn<'c>>>,
    substitute_callout: Option<Box<SubstituteCalloutFn<'c>>>,
}

impl fmt::Debug for Substituter<'_, '_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Substituter")
            .field("replacement", &String::from_utf8_lossy(self.replacement))
            .field("options", &self.options)
            .field("settings", &self.settings)
            .field("start", &self.start)
            .field("buffer_size", &self.buffer_size)
            .field("match_callout", &self.match_callout.is_some())
            .field("substitute_callout", &self.substitute_callout.is_some())
            .finish()
    }
}

impl<'r, 'p, 'c> Substituter<'r, 'p, 'c> {
    pub(crate) fn new(re: &'r Regex, replacement: &'p [u8]) -> Self {
        Substituter {
            re,
            replacement,
            options: SubstituteOptions::default(),
            settings: MatchSettings::default(),
            start: 0,
            buffer_size: None,
            match_callout: None,
            substitute_callout: None,
        }
    }

    pub fn options(mut self, options: SubstituteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn settings(mut self, settings: MatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Start matching at byte offset \p start. The text before it is copied
    /// unchanged.
    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// The size of the first output buffer tried.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub fn match_callout(
        mut self,
        callout: impl FnMut(&CalloutEvent<'_>) -> Result<CalloutResult, CalloutError> + 'c,
    ) -> Self {
        self.match_callout = Some(Box::new(callout));
        self
    }

    pub fn substitute_callout(
        mut self,
        callout: impl FnMut(&SubstituteCalloutEvent<'_>) -> Result<CalloutResult, CalloutError> + 'c,
    ) -> Self {
        self.substitute_callout = Some(Box::new(callout));
        self
    }

    /// Run the substitution over \p subject.
    pub fn run<S: AsRef<[u8]> + ?Sized>(mut self, subject: &S) -> Result<Substitution, MatchError> {
        let subject = subject.as_ref();
        let template = Template::parse(
            self.replacement,
            self.options.extended,
            self.options.literal,
        )?;
        if self.match_callout.is_none() && self.substitute_callout.is_none() {
            self.run_two_phase(subject, &template)
        } else {
            self.run_with_replay(subject, &template)
        }
    }

    fn run_two_phase(&self, subject: &[u8], template: &Template) -> Result<Substitution, MatchError> {
        let mut buf = vec![0; self.buffer_size.unwrap_or(0)];
        let mut none = SubstituteCallouts::default();
        let first = run_pass(
            self.re,
            subject,
            self.start,
            template,
            &self.options,
            &self.settings,
            &mut buf,
            &mut none,
        );
        let (outcome, attempts) = match first {
            Ok(outcome) => (outcome, 1),
            Err(MatchError::NoMemory { required }) => {
                debug!("Substitution needs {} bytes of output, retrying", required);
                buf = vec![0; required];
                let exact = SubstituteOptions {
                    flags: self.options.flags.no_utf_check(true),
                    ..self.options
                };
                let second = run_pass(
                    self.re,
                    subject,
                    self.start,
                    template,
                    &exact,
                    &self.settings,
                    &mut buf,
                    &mut none,
                );
                match second {
                    Ok(outcome) => (outcome, 2),
                    Err(MatchError::NoMemory { .. }) => {
                        return Err(MatchError::Internal("substitution size changed between passes"))
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };
        buf.truncate(outcome.len);
        Ok(Substitution {
            output: buf,
            count: outcome.count,
            attempts,
        })
    }

    fn run_with_replay(
        &mut self,
        subject: &[u8],
        template: &Template,
    ) -> Result<Substitution, MatchError> {
        let mut match_queue = ReplayQueue::default();
        let mut substitute_queue = ReplayQueue::default();
        let mut size = self.buffer_size.unwrap_or(0);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match_queue.rewind();
            substitute_queue.rewind();
            let mut buf = vec![0; size];

            let has_match_callout = self.match_callout.is_some();
            let has_substitute_callout = self.substitute_callout.is_some();
            let mut user_match = self.match_callout.as_deref_mut();
            let mut user_substitute = self.substitute_callout.as_deref_mut();
            let mut replay_match = |ev: &CalloutEvent<'_>| -> Result<CalloutResult, CalloutError> {
                match_queue.replay_or(|| match user_match.as_mut() {
                    Some(cb) => (**cb)(ev),
                    None => Ok(CalloutResult::Pass),
                })
            };
            let mut replay_substitute =
                |ev: &SubstituteCalloutEvent<'_>| -> Result<CalloutResult, CalloutError> {
                    substitute_queue.replay_or(|| match user_substitute.as_mut() {
                        Some(cb) => (**cb)(ev),
                        None => Ok(CalloutResult::Pass),
                    })
                };
            let mut callouts = SubstituteCallouts {
                on_match: if has_match_callout {
                    Some(&mut replay_match as &mut CalloutFn<'_>)
                } else {
                    None
                },
                on_substitute: if has_substitute_callout {
                    Some(&mut replay_substitute as &mut SubstituteCalloutFn<'_>)
                } else {
                    None
                },
            };
            let pass = run_pass(
                self.re,
                subject,
                self.start,
                template,
                &self.options,
                &self.settings,
                &mut buf,
                &mut callouts,
            );
            match pass {
                Ok(outcome) => {
                    buf.truncate(outcome.len);
                    return Ok(Substitution {
                        output: buf,
                        count: outcome.count,
                        attempts,
                    });
                }
                Err(MatchError::NoMemory { required }) => {
                    let grown = required
                        .max(size.saturating_mul(2))
                        .max(subject.len().saturating_mul(2));
                    debug!(
                        "Substitution needs {} bytes of output; retrying with {} and {} recorded decisions",
                        required,
                        grown,
                        match_queue.len() + substitute_queue.len()
                    );
                    size = grown;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Convert output to text. Output is UTF-8 unless a byte-mode pattern split
/// a character.
fn into_string(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// \return the largest char boundary of \p text at or before \p pos.
fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

impl Regex {
    /// Prepare a substitution of \p replacement.
    pub fn substituter<'p, 'c, R: AsRef<[u8]> + ?Sized>(
        &self,
        replacement: &'p R,
    ) -> Substituter<'_, 'p, 'c> {
        Substituter::new(self, replacement.as_ref())
    }

    /// Substitute matches in \p subject, growing the output as needed.
    pub fn substitute<S, R>(
        &self,
        subject: &S,
        replacement: &R,
        opts: &SubstituteOptions,
    ) -> Result<Vec<u8>, MatchError>
    where
        S: AsRef<[u8]> + ?Sized,
        R: AsRef<[u8]> + ?Sized,
    {
        self.substituter(replacement)
            .options(*opts)
            .run(subject)
            .map(Substitution::into_output)
    }

    /// Substitute into a fixed \p output buffer, starting matching at
    /// \p start.
    /// \return the output length. If the output does not fit the pass still
    /// completes, and `MatchError::NoMemory` reports the exact size needed.
    #[allow(clippy::too_many_arguments)]
    pub fn substitute_into(
        &self,
        subject: &[u8],
        start: usize,
        replacement: &[u8],
        opts: &SubstituteOptions,
        settings: &MatchSettings,
        output: &mut [u8],
        mut callouts: SubstituteCallouts<'_, '_>,
    ) -> Result<usize, MatchError> {
        let template = Template::parse(replacement, opts.extended, opts.literal)?;
        run_pass(
            self,
            subject,
            start,
            &template,
            opts,
            settings,
            output,
            &mut callouts,
        )
        .map(|outcome| outcome.len)
    }

    /// Replace the first match in \p text with the `$`-template
    /// \p replacement.
    pub fn replace(&self, text: &str, replacement: &str) -> Result<String, MatchError> {
        self.substitute(text, replacement, &SubstituteOptions::default())
            .map(into_string)
    }

    /// Replace every match in \p text with the `$`-template \p replacement.
    pub fn replace_all(&self, text: &str, replacement: &str) -> Result<String, MatchError> {
        let opts = SubstituteOptions::default().global(true);
        self.substitute(text, replacement, &opts).map(into_string)
    }

    /// Replace every match in \p text with what \p f returns for it.
    pub fn replace_with<F>(&self, text: &str, f: F) -> Result<String, MatchError>
    where
        F: FnMut(&Match) -> String,
    {
        self.replacen_with(text, None, 0, f)
    }

    /// Replace at most \p count matches, searching \p text from byte
    /// index \p start, with what \p f returns for each. Text before
    /// \p start is kept. A count of zero returns \p text unchanged.
    pub fn replacen_with<F>(
        &self,
        text: &str,
        count: Option<usize>,
        start: usize,
        mut f: F,
    ) -> Result<String, MatchError>
    where
        F: FnMut(&Match) -> String,
    {
        if start > text.len() {
            return Err(MatchError::BadOffset);
        }
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        if count != Some(0) {
            let mut remaining = count;
            for m in self.try_find_from(text, start) {
                let m = m?;
                let start = floor_char_boundary(text, m.start()).max(last);
                output.push_str(&text[last..start]);
                output.push_str(&f(&m));
                last = floor_char_boundary(text, m.end()).max(start);
                if let Some(n) = remaining.as_mut() {
                    *n -= 1;
                    if *n == 0 {
                        break;
                    }
                }
            }
        }
        output.push_str(&text[last..]);
        Ok(output)
    }

    /// Split \p text at each match, returning at most \p limit pieces if
    /// given. The last piece holds the unsplit remainder.
    pub fn split<'t>(&self, text: &'t str, limit: Option<usize>) -> Result<Vec<&'t str>, MatchError> {
        self.split_pieces(text, limit, false)
    }

    /// Like [`Regex::split`], but the text of each participating capture
    /// group follows the piece before its match. Group values do not count
    /// towards \p limit.
    pub fn split_with_groups<'t>(
        &self,
        text: &'t str,
        limit: Option<usize>,
    ) -> Result<Vec<&'t str>, MatchError> {
        self.split_pieces(text, limit, true)
    }

    fn split_pieces<'t>(
        &self,
        text: &'t str,
        limit: Option<usize>,
        groups: bool,
    ) -> Result<Vec<&'t str>, MatchError> {
        let mut pieces = Vec::new();
        if limit == Some(0) {
            return Ok(pieces);
        }
        let mut splits = 1;
        let mut last = 0;
        for m in self.try_find_iter(text) {
            if limit.map_or(false, |limit| splits >= limit) {
                break;
            }
            let m = m?;
            let start = floor_char_boundary(text, m.start()).max(last);
            pieces.push(&text[last..start]);
            if groups {
                for r in m.captures.iter().flatten() {
                    let start = floor_char_boundary(text, r.start);
                    pieces.push(&text[start..floor_char_boundary(text, r.end).max(start)]);
                }
            }
            last = floor_char_boundary(text, m.end()).max(start);
            splits += 1;
        }
        pieces.push(&text[last..]);
        Ok(pieces)
    }
}
