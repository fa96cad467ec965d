//! Execution engine bits: the start-position loop around a match attempt,
//! and the global iteration used to find successive matches.

use crate::api::{MatchResult, MatchStatus};
use crate::callout::CalloutFn;
use crate::classicalbacktrack::{self, BacktrackStack, Halt, MatchAttempter, MatchContext};
use crate::error::MatchError;
use crate::indexing::{ByteInput, InputIndexer, Utf8Input};
use crate::insn::{CompiledRegex, StartPredicate};
use crate::matchers;
use crate::options::{MatchOptions, MatchSettings, Newline};
use crate::util::{is_utf8_boundary, validate_utf8};

/// Check the start offset and the subject encoding.
pub(crate) fn check_subject(
    re: &CompiledRegex,
    subject: &[u8],
    start: usize,
    opts: &MatchOptions,
) -> Result<(), MatchError> {
    if start > subject.len() {
        return Err(MatchError::BadOffset);
    }
    if re.utf {
        if !is_utf8_boundary(subject, start) {
            return Err(MatchError::BadOffset);
        }
        if !opts.no_utf_check {
            validate_utf8(&subject[start..])
                .map_err(|offset| MatchError::BadUtf { offset: start + offset })?;
        }
    }
    Ok(())
}

fn to_usize(v: u64) -> usize {
    usize::try_from(v).unwrap_or(usize::MAX)
}

/// Locates the positions at which a match attempt is worth making.
#[derive(Debug)]
pub(crate) struct Candidates<'r> {
    pred: &'r StartPredicate,
    anchored: bool,
    // Whether byte-search hints may skip positions.
    hints: bool,
    newline: Newline,
    search_start: usize,
    // The last position at which an attempt may start.
    last_start: usize,
}

impl<'r> Candidates<'r> {
    pub(crate) fn new<Input: InputIndexer>(
        re: &'r CompiledRegex,
        input: &Input,
        start: usize,
        opts: &MatchOptions,
        settings: &MatchSettings,
    ) -> Self {
        let len = input.bytelength();
        let mut last_start = len;
        if let Some(limit) = settings.offset_limit {
            last_start = last_start.min(limit);
        }
        if re.firstline {
            // Matches must start on the first line of the search.
            let mut pos = start;
            while pos < len && matchers::newline_len_at(input, re.newline, pos) == 0 {
                if input.next_right(&mut pos).is_none() {
                    break;
                }
            }
            last_start = last_start.min(pos);
        }
        Candidates {
            pred: &re.start_pred,
            anchored: opts.anchored || re.anchored,
            hints: !opts.partial(),
            newline: re.newline,
            search_start: start,
            last_start,
        }
    }

    /// \return the first candidate position at or after \p pos.
    pub(crate) fn find<Input: InputIndexer>(&self, input: &Input, mut pos: usize) -> Option<usize> {
        if self.anchored {
            return (pos == self.search_start && pos <= self.last_start).then_some(pos);
        }
        loop {
            if pos > self.last_start {
                return None;
            }
            let found = match self.pred {
                StartPredicate::StartAnchored => {
                    return (pos == self.search_start).then_some(pos);
                }
                StartPredicate::AfterNewline => {
                    pos == self.search_start
                        || matchers::newline_len_before(input, self.newline, pos) > 0
                }
                StartPredicate::Alternatives(alts) if self.hints => {
                    return input.find_bytes(pos, alts).filter(|&p| p <= self.last_start);
                }
                StartPredicate::Literal(lit) if self.hints => {
                    return input.find_bytes(pos, lit).filter(|&p| p <= self.last_start);
                }
                StartPredicate::Bitmap(bm) if self.hints => {
                    return input.find_bytes(pos, bm).filter(|&p| p <= self.last_start);
                }
                _ => true,
            };
            if found {
                return Some(pos);
            }
            input.next_right(&mut pos)?;
        }
    }

    /// \return the candidate after a failed attempt at \p pos.
    pub(crate) fn after<Input: InputIndexer>(&self, input: &Input, mut pos: usize) -> Option<usize> {
        if self.anchored {
            return None;
        }
        input.next_right(&mut pos)?;
        self.find(input, pos)
    }
}

/// \return the start of the characters a partial match at \p pos may have
/// inspected, looking back over \p lookbehind characters.
pub(crate) fn scan_start<Input: InputIndexer>(
    input: &Input,
    pos: usize,
    lookbehind: Option<usize>,
) -> usize {
    let count = match lookbehind {
        Some(count) => count,
        None => return 0,
    };
    let mut p = pos;
    for _ in 0..count {
        if input.next_left(&mut p).is_none() {
            break;
        }
    }
    p
}

/// Run a match over \p subject from \p start, writing into \p result.
#[allow(clippy::too_many_arguments)]
pub(crate) fn execute(
    re: &CompiledRegex,
    subject: &[u8],
    start: usize,
    opts: &MatchOptions,
    settings: &MatchSettings,
    callout: Option<&mut CalloutFn<'_>>,
    stack: &mut BacktrackStack,
    result: &mut MatchResult,
) -> Result<(), MatchError> {
    check_subject(re, subject, start, opts)?;
    if re.utf {
        search(re, &Utf8Input::new(subject), start, opts, settings, callout, stack, result)
    } else {
        search(re, &ByteInput::new(subject), start, opts, settings, callout, stack, result)
    }
}

#[allow(clippy::too_many_arguments)]
fn search<Input: InputIndexer>(
    re: &CompiledRegex,
    input: &Input,
    start: usize,
    opts: &MatchOptions,
    settings: &MatchSettings,
    callout: Option<&mut CalloutFn<'_>>,
    stack: &mut BacktrackStack,
    result: &mut MatchResult,
) -> Result<(), MatchError> {
    let settings = re.limits.apply(settings);
    let heap_bytes = settings.heap_limit.saturating_mul(1024);
    let ctx = MatchContext {
        search_start: start,
        not_bol: opts.not_bol,
        not_eol: opts.not_eol,
        not_empty: opts.not_empty,
        not_empty_at_start: opts.not_empty_at_start,
        end_anchored: opts.end_anchored || re.end_anchored,
        partial: opts.partial(),
        partial_hard: opts.partial_hard,
        match_limit: settings.match_limit,
        depth_limit: to_usize(settings.depth_limit),
        heap_frames: to_usize(heap_bytes / classicalbacktrack::frame_size() as u64),
    };
    let candidates = Candidates::new(re, input, start, opts, &settings);
    let len = input.bytelength();

    let mut attempter = MatchAttempter::new(re, ctx, callout, stack.take());
    let mut first_partial = None;
    let mut next = candidates.find(input, start);
    let outcome = loop {
        let pos = match next {
            Some(pos) => pos,
            None => break Ok(None),
        };
        // Too little subject left for any match.
        if !ctx.partial && len - pos < re.min_length {
            break Ok(None);
        }
        match attempter.attempt(input, pos) {
            Ok(Some(end)) => break Ok(Some((pos, end))),
            Ok(None) => {}
            Err(Halt::Partial) => {
                first_partial = Some(pos);
                break Ok(None);
            }
            Err(Halt::Error(err)) => break Err(err),
        }
        if attempter.hit_end() && first_partial.is_none() {
            first_partial = Some(pos);
        }
        if attempter.committed() {
            break Ok(None);
        }
        next = candidates.after(input, pos);
    };

    let filled = match outcome {
        Ok(Some((pos, end))) => {
            result.set_match(pos, end, attempter.groups(), attempter.mark());
            Ok(())
        }
        Ok(None) => {
            match first_partial {
                Some(pos) => result.set_partial(
                    pos,
                    len,
                    scan_start(input, pos, re.max_lookbehind),
                    attempter.last_mark(),
                ),
                None => result.set_no_match(re.groups as usize, attempter.last_mark()),
            }
            Ok(())
        }
        Err(err) => Err(err),
    };
    stack.give_back(attempter.into_bts());
    filled
}

/// \return the position one character past \p pos, treating CR LF as one
/// character when the newline convention does.
pub(crate) fn step_over(subject: &[u8], pos: usize, utf: bool, newline: Newline) -> usize {
    if pos >= subject.len() {
        return subject.len() + 1;
    }
    let crlf_unit = matches!(newline, Newline::CrLf | Newline::Any | Newline::AnyCrLf);
    if crlf_unit && subject[pos..].starts_with(b"\r\n") {
        return pos + 2;
    }
    let mut next = pos;
    let moved = if utf {
        Utf8Input::new(subject).next_right(&mut next)
    } else {
        ByteInput::new(subject).next_right(&mut next)
    };
    match moved {
        Some(_) => next,
        None => subject.len() + 1,
    }
}

/// Drives successive matches over one subject.
/// After an empty match the same position is retried for a non-empty
/// anchored match before moving one character on.
#[derive(Debug, Clone)]
pub(crate) struct GlobalCursor {
    start: usize,
    empty_at: Option<usize>,
    done: bool,
}

impl GlobalCursor {
    pub(crate) fn new(start: usize) -> Self {
        GlobalCursor {
            start,
            empty_at: None,
            done: false,
        }
    }

    /// Find the next match, using \p run to match from a start position.
    /// \return whether \p result holds a new match.
    pub(crate) fn advance<F>(
        &mut self,
        subject: &[u8],
        utf: bool,
        newline: Newline,
        opts: &MatchOptions,
        result: &mut MatchResult,
        mut run: F,
    ) -> Result<bool, MatchError>
    where
        F: FnMut(usize, &MatchOptions, &mut MatchResult) -> Result<(), MatchError>,
    {
        while !self.done {
            if let Some(pos) = self.empty_at.take() {
                let retry = MatchOptions {
                    not_empty_at_start: true,
                    anchored: true,
                    ..*opts
                };
                run(pos, &retry, result)?;
                if result.status() == MatchStatus::Match {
                    self.record(result);
                    return Ok(true);
                }
                self.start = step_over(subject, pos, utf, newline);
                if self.start > subject.len() {
                    self.done = true;
                }
                continue;
            }
            run(self.start, opts, result)?;
            if result.status() != MatchStatus::Match {
                self.done = true;
                return Ok(false);
            }
            self.record(result);
            return Ok(true);
        }
        Ok(false)
    }

    fn record(&mut self, result: &MatchResult) {
        if let Some((start, end)) = result.get(0) {
            if start == end {
                self.empty_at = Some(end);
            }
            self.start = end;
        } else {
            self.done = true;
        }
    }
}
