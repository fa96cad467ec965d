//! All-matches scanning.
//!
//! The IR is converted to a Thompson NFA whose states consume whole
//! characters. Scanning runs every thread in lockstep, so each match end
//! reachable from a start position is found in one pass.

use crate::api::MatchResult;
use crate::callout::{CalloutEvent, CalloutFn, CalloutResult};
use crate::cursor::Forward;
use crate::error::MatchError;
use crate::exec::{scan_start, Candidates};
use crate::indexing::{ByteInput, InputIndexer, Utf8Input};
use crate::insn::CompiledRegex;
use crate::ir::{self, AnchorType, Node};
use crate::matchers;
use crate::options::{Bsr, DfaMatchOptions, MatchSettings, Newline};
use crate::types::BracketContents;
use crate::util::decode_utf8_right;
use smallvec::{smallvec, SmallVec};

pub(crate) type StateHandle = u32;

/// Reaching this state completes a match.
const GOAL_STATE: StateHandle = 0;

/// Upper bound on NFA states; counted loops are unrolled.
const STATE_BUDGET: usize = 10_000;

/// A condition on an epsilon edge, checked at the current position.
#[derive(Debug, Clone)]
enum Guard {
    Anchor(AnchorType),
    WordBoundary { invert: bool },
    Callout(u16),
    /// The sub-automaton at `start` must (or, negated, must not) reach
    /// `accept` from the current position.
    Lookahead {
        negate: bool,
        start: StateHandle,
        accept: StateHandle,
    },
}

/// What a consuming state accepts.
#[derive(Debug, Clone)]
enum CharTest {
    Char(u32),
    CharICase(u32),
    Set(Box<[u32]>),
    Bracket(BracketContents),
    Any,
    AnyExceptNewline,
    /// A line break other than the CR of a CR LF pair.
    LineBreakSingle,
}

#[derive(Debug, Clone)]
struct Edge {
    guard: Option<Guard>,
    target: StateHandle,
}

#[derive(Debug, Default)]
struct State {
    // Epsilon transitions, possibly guarded.
    eps: Vec<Edge>,

    // At most one consuming transition.
    consume: Option<(CharTest, StateHandle)>,
}

impl State {
    fn add_eps(&mut self, target: StateHandle) {
        self.eps.push(Edge {
            guard: None,
            target,
        });
    }
}

/// A character-level NFA for a pattern.
#[derive(Debug)]
pub(crate) struct Nfa {
    start: StateHandle,
    states: Box<[State]>,
    newline: Newline,
    bsr: Bsr,
}

impl Nfa {
    /// Build from the unoptimized IR.
    /// \return the name of the first construct which cannot be scanned this
    /// way, on failure.
    pub(crate) fn try_from(re: &ir::Regex) -> Result<Nfa, &'static str> {
        let mut builder = Builder {
            states: vec![State::default()],
            utf: re.utf,
        };
        let frag = builder.build(&re.node)?;
        // The top-level node ends in Goal, so there are no loose ends.
        debug_assert!(frag.ends.is_empty(), "Top level should end in Goal");
        Ok(Nfa {
            start: frag.start,
            states: builder.states.into_boxed_slice(),
            newline: re.newline,
            bsr: re.bsr,
        })
    }

    /// \return the number of states.
    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }
}

/// A piece of an NFA, with loose ends which need epsilon transitions to
/// whatever follows.
struct Fragment {
    start: StateHandle,
    ends: SmallVec<[StateHandle; 2]>,
}

impl Fragment {
    fn new(start: StateHandle, ends: impl IntoIterator<Item = StateHandle>) -> Fragment {
        Fragment {
            start,
            ends: ends.into_iter().collect(),
        }
    }
}

struct Builder {
    states: Vec<State>,
    utf: bool,
}

type BuildResult<T> = Result<T, &'static str>;

impl Builder {
    fn make(&mut self) -> BuildResult<StateHandle> {
        if self.states.len() >= STATE_BUDGET {
            return Err("pattern too large");
        }
        self.states.push(State::default());
        Ok(self.states.len() as StateHandle - 1)
    }

    fn get(&mut self, idx: StateHandle) -> &mut State {
        &mut self.states[idx as usize]
    }

    /// A single consuming state.
    fn build_test(&mut self, test: CharTest) -> BuildResult<Fragment> {
        let start = self.make()?;
        let end = self.make()?;
        self.get(start).consume = Some((test, end));
        Ok(Fragment::new(start, [end]))
    }

    /// A single guarded epsilon edge.
    fn build_guard(&mut self, guard: Guard) -> BuildResult<Fragment> {
        let start = self.make()?;
        let end = self.make()?;
        self.get(start).eps.push(Edge {
            guard: Some(guard),
            target: end,
        });
        Ok(Fragment::new(start, [end]))
    }

    /// A fragment which never matches.
    fn build_fail(&mut self) -> BuildResult<Fragment> {
        Ok(Fragment::new(self.make()?, []))
    }

    fn build_chars(&mut self, chars: &[u32]) -> BuildResult<Fragment> {
        let start = self.make()?;
        let mut cursor = start;
        for &c in chars {
            let next = self.make()?;
            self.get(cursor).consume = Some((CharTest::Char(c), next));
            cursor = next;
        }
        Ok(Fragment::new(start, [cursor]))
    }

    fn build(&mut self, node: &Node) -> BuildResult<Fragment> {
        match node {
            Node::Empty => {
                let s = self.make()?;
                Ok(Fragment::new(s, [s]))
            }
            Node::Goal => Ok(Fragment::new(GOAL_STATE, [])),
            &Node::Char { c, icase } => self.build_test(if icase {
                CharTest::CharICase(c)
            } else {
                CharTest::Char(c)
            }),
            Node::ByteSequence(bytes) => {
                let mut chars = Vec::with_capacity(bytes.len());
                if self.utf {
                    let mut pos = 0;
                    while let Some((c, len)) = decode_utf8_right(bytes, pos) {
                        chars.push(c);
                        pos += len;
                    }
                } else {
                    chars.extend(bytes.iter().map(|&b| u32::from(b)));
                }
                self.build_chars(&chars)
            }
            Node::ByteSet(bytes) if bytes.is_empty() => self.build_fail(),
            Node::ByteSet(bytes) => {
                self.build_test(CharTest::Set(bytes.iter().map(|&b| u32::from(b)).collect()))
            }
            Node::CharSet(chars) if chars.is_empty() => self.build_fail(),
            Node::CharSet(chars) => self.build_test(CharTest::Set(chars.clone().into_boxed_slice())),
            Node::Cat(nodes) => self.build_cat(nodes),
            Node::Alt(left, right) => {
                let left = self.build(left)?;
                let right = self.build(right)?;
                self.build_alt(left, right)
            }
            Node::MatchAny => self.build_test(CharTest::Any),
            Node::MatchAnyExceptNewline => self.build_test(CharTest::AnyExceptNewline),
            Node::LineBreak => {
                let crlf = self.build_chars(&[0x0D, 0x0A])?;
                let single = self.build_test(CharTest::LineBreakSingle)?;
                self.build_alt(crlf, single)
            }
            &Node::Anchor(anchor) => self.build_guard(Guard::Anchor(anchor)),
            &Node::WordBoundary { invert } => self.build_guard(Guard::WordBoundary { invert }),
            Node::CaptureGroup(contents, ..) | Node::NamedCaptureGroup(contents, ..) => {
                self.build(contents)
            }
            Node::BackRef { .. } | Node::NamedBackRef { .. } => Err("backreference"),
            Node::Bracket(bc) => self.build_test(CharTest::Bracket(bc.clone())),
            Node::LookaroundAssertion {
                backwards: true, ..
            } => Err("lookbehind"),
            Node::LookaroundAssertion {
                negate, contents, ..
            } => {
                // The assertion is its own fragment, which accepts in a
                // dedicated state.
                let body = self.build(contents)?;
                let accept = self.make()?;
                for end in body.ends {
                    self.get(end).add_eps(accept);
                }
                self.build_guard(Guard::Lookahead {
                    negate: *negate,
                    start: body.start,
                    accept,
                })
            }
            Node::Atomic { contents, .. } => match **contents {
                Node::Loop { .. } => Err("possessive quantifier"),
                _ => Err("atomic group"),
            },
            Node::Loop { loopee, quant, .. } => self.build_loop(loopee, quant),
            Node::Loop1CharBody {
                possessive: true, ..
            } => Err("possessive quantifier"),
            Node::Loop1CharBody { loopee, quant, .. } => self.build_loop(loopee, quant),
            &Node::Callout(idx) => self.build_guard(Guard::Callout(idx)),
            Node::Mark(..) => Err("(*MARK)"),
            Node::Commit => Err("(*COMMIT)"),
        }
    }

    fn build_alt(&mut self, left: Fragment, right: Fragment) -> BuildResult<Fragment> {
        let start = self.make()?;
        self.get(start).add_eps(left.start);
        self.get(start).add_eps(right.start);
        let mut ends = left.ends;
        ends.extend(right.ends);
        Ok(Fragment { start, ends })
    }

    fn build_cat(&mut self, cat: &[Node]) -> BuildResult<Fragment> {
        let mut ends: SmallVec<[StateHandle; 2]> = smallvec![];
        let mut start = None;
        for node in cat {
            let next = self.build(node)?;
            if start.is_none() {
                start = Some(next.start);
            }
            for end in ends {
                self.get(end).add_eps(next.start);
            }
            ends = next.ends;
        }
        match start {
            Some(start) => Ok(Fragment { start, ends }),
            None => {
                let s = self.make()?;
                Ok(Fragment::new(s, [s]))
            }
        }
    }

    /// Funnel the loose ends of a fragment into a single state, so the
    /// next piece is built once regardless of how many ends there are.
    fn join(&mut self, ends: &[StateHandle]) -> BuildResult<StateHandle> {
        if let [only] = ends {
            return Ok(*only);
        }
        let joined = self.make()?;
        for &end in ends {
            self.get(end).add_eps(joined);
        }
        Ok(joined)
    }

    /// Loops are unrolled: the minimum is repeated, then the optional
    /// iterations either repeat up to the maximum or cycle.
    fn build_loop(&mut self, loopee: &Node, quant: &ir::Quantifier) -> BuildResult<Fragment> {
        let start = self.make()?;
        let mut current_ends: SmallVec<[StateHandle; 2]> = smallvec![start];

        for _ in 0..quant.min {
            let from = self.join(&current_ends)?;
            let body = self.build(loopee)?;
            self.get(from).add_eps(body.start);
            current_ends = body.ends;
        }

        match quant.max {
            None => {
                let body = self.build(loopee)?;
                let end = self.make()?;
                for current_end in current_ends {
                    self.get(current_end).add_eps(body.start);
                    self.get(current_end).add_eps(end);
                }
                for &body_end in &body.ends {
                    self.get(body_end).add_eps(body.start);
                    self.get(body_end).add_eps(end);
                }
                Ok(Fragment::new(start, [end]))
            }
            Some(max) if max > quant.min => {
                let end = self.make()?;
                for &current_end in &current_ends {
                    self.get(current_end).add_eps(end);
                }
                for _ in quant.min..max {
                    let from = self.join(&current_ends)?;
                    let body = self.build(loopee)?;
                    self.get(from).add_eps(body.start);
                    for &new_end in &body.ends {
                        self.get(new_end).add_eps(end);
                    }
                    current_ends = body.ends;
                }
                Ok(Fragment::new(start, [end]))
            }
            Some(_) => Ok(Fragment::new(start, current_ends)),
        }
    }
}

/// Saved state letting a scan continue into a further subject segment.
/// A workspace is filled by a partial result and consumed by a restart.
#[derive(Debug, Clone, Default)]
pub struct DfaWorkspace {
    saved: Option<Box<[StateHandle]>>,
}

impl DfaWorkspace {
    pub fn new() -> DfaWorkspace {
        DfaWorkspace::default()
    }

    /// \return whether a partial scan is saved for restarting.
    pub fn has_saved_scan(&self) -> bool {
        self.saved.is_some()
    }

    /// Forget any saved scan.
    pub fn clear(&mut self) {
        self.saved = None;
    }
}

/// A visited set, cleared in constant time.
struct Marks {
    stamps: Vec<u32>,
    generation: u32,
}

impl Marks {
    fn new(len: usize) -> Marks {
        Marks {
            stamps: vec![0; len],
            generation: 1,
        }
    }

    fn reset(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.generation = 1;
        }
    }

    /// Mark \p s. \return whether it was already marked.
    fn test_and_set(&mut self, s: StateHandle) -> bool {
        let stamp = &mut self.stamps[s as usize];
        let seen = *stamp == self.generation;
        *stamp = self.generation;
        seen
    }
}

/// The outcome of running threads from one start position.
struct Attempt {
    ends: Vec<usize>,
    // Threads still alive at the end of the subject, when a partial applies.
    partial: Option<Vec<StateHandle>>,
}

struct Scanner<'a, 'c, 'f, Input: InputIndexer> {
    re: &'a CompiledRegex,
    nfa: &'a Nfa,
    input: Input,
    opts: &'a DfaMatchOptions,
    callout: Option<&'c mut CalloutFn<'f>>,
    search_start: usize,
    attempt_start: usize,
    workspace: usize,
}

impl<'a, 'c, 'f, Input: InputIndexer> Scanner<'a, 'c, 'f, Input> {
    fn anchor_matches(&self, anchor: AnchorType, pos: usize) -> bool {
        let input = &self.input;
        let flags = &self.opts.flags;
        let nl = self.nfa.newline;
        let len = input.bytelength();
        match anchor {
            AnchorType::SubjectStart => pos == 0,
            AnchorType::LineStart => pos == 0 && !flags.not_bol,
            AnchorType::MultilineStart => {
                (pos == 0 && !flags.not_bol)
                    || (pos < len && matchers::newline_len_before(input, nl, pos) > 0)
            }
            AnchorType::LineEnd => {
                !flags.not_eol && matchers::at_end_or_final_newline(input, nl, pos)
            }
            AnchorType::LineEndOnly => !flags.not_eol && pos == len,
            AnchorType::MultilineEnd => {
                matchers::newline_len_at(input, nl, pos) > 0 || (pos == len && !flags.not_eol)
            }
            AnchorType::FinalNewlineEnd => matchers::at_end_or_final_newline(input, nl, pos),
            AnchorType::SubjectEnd => pos == len,
            AnchorType::SearchStart => pos == self.search_start,
        }
    }

    /// \return whether the char \p c starting at \p pos passes \p test.
    fn test_matches(&self, test: &CharTest, c: u32, pos: usize, next: usize) -> bool {
        match test {
            &CharTest::Char(x) => c == x,
            &CharTest::CharICase(x) => c == x || Input::fold(c) == x,
            CharTest::Set(chars) => chars.contains(&c),
            CharTest::Bracket(bc) => bc.bracket(c),
            CharTest::Any => true,
            CharTest::AnyExceptNewline => {
                matchers::newline_len_at(&self.input, self.nfa.newline, pos) == 0
            }
            CharTest::LineBreakSingle => {
                let mut end = pos;
                matchers::line_break(&self.input, Forward, self.nfa.bsr, &mut end) && end == next
            }
        }
    }

    fn run_callout(&mut self, idx: u16, pos: usize) -> Result<bool, MatchError> {
        let re = self.re;
        let site = &re.callouts[idx as usize];
        let cb = match self.callout.as_mut() {
            Some(cb) => cb,
            None => return Ok(true),
        };
        let offsets = [Some((self.attempt_start, pos))];
        let event = CalloutEvent {
            number: site.number,
            string: site.string.as_deref(),
            start_match: self.attempt_start,
            current_position: pos,
            capture_top: 1,
            capture_last: 0,
            pattern_position: site.pattern_position,
            next_item_length: site.next_item_length,
            mark: None,
            subject: self.input.contents(),
            offsets: &offsets,
        };
        match (*cb)(&event) {
            Ok(CalloutResult::Pass) => Ok(true),
            Ok(CalloutResult::Fail) => Ok(false),
            Ok(CalloutResult::Abort) => Err(MatchError::CalloutAborted(None)),
            Err(err) => Err(MatchError::CalloutAborted(Some(err))),
        }
    }

    fn guard_passes(&mut self, guard: &Guard, pos: usize) -> Result<bool, MatchError> {
        Ok(match *guard {
            Guard::Anchor(anchor) => self.anchor_matches(anchor, pos),
            Guard::WordBoundary { invert } => matchers::word_boundary(&self.input, pos) != invert,
            Guard::Callout(idx) => self.run_callout(idx, pos)?,
            Guard::Lookahead {
                negate,
                start,
                accept,
            } => self.assertion_holds(start, accept, pos)? != negate,
        })
    }

    /// Follow epsilon edges from \p seeds at \p pos, appending every
    /// consuming state reached to \p out.
    /// \return whether \p accept was reached.
    fn closure(
        &mut self,
        marks: &mut Marks,
        seeds: &[StateHandle],
        pos: usize,
        accept: StateHandle,
        out: &mut Vec<StateHandle>,
    ) -> Result<bool, MatchError> {
        let nfa = self.nfa;
        marks.reset();
        let mut reached = false;
        let mut stack: Vec<StateHandle> = seeds.iter().rev().copied().collect();
        while let Some(s) = stack.pop() {
            if marks.test_and_set(s) {
                continue;
            }
            if s == accept {
                reached = true;
                continue;
            }
            let state = &nfa.states[s as usize];
            if state.consume.is_some() {
                out.push(s);
            }
            // Push in reverse so edges are explored in priority order.
            for edge in state.eps.iter().rev() {
                let pass = match &edge.guard {
                    None => true,
                    Some(guard) => self.guard_passes(guard, pos)?,
                };
                if pass {
                    stack.push(edge.target);
                }
            }
        }
        Ok(reached)
    }

    /// Advance \p threads over the char at \p pos.
    /// \return the position after the char, or None at the end.
    fn step(
        &self,
        threads: &[StateHandle],
        pos: usize,
        next_threads: &mut Vec<StateHandle>,
    ) -> Option<usize> {
        let mut next = pos;
        let c = self.input.next_right(&mut next)?;
        for &s in threads {
            if let Some((test, target)) = &self.nfa.states[s as usize].consume {
                if self.test_matches(test, c, pos, next) {
                    next_threads.push(*target);
                }
            }
        }
        Some(next)
    }

    /// \return whether the sub-automaton at \p start reaches \p accept from
    /// \p pos.
    fn assertion_holds(
        &mut self,
        start: StateHandle,
        accept: StateHandle,
        mut pos: usize,
    ) -> Result<bool, MatchError> {
        let mut marks = Marks::new(self.nfa.len());
        let mut threads = Vec::new();
        if self.closure(&mut marks, &[start], pos, accept, &mut threads)? {
            return Ok(true);
        }
        let mut seeds = Vec::new();
        while !threads.is_empty() {
            seeds.clear();
            pos = match self.step(&threads, pos, &mut seeds) {
                Some(next) => next,
                None => return Ok(false),
            };
            threads.clear();
            if self.closure(&mut marks, &seeds, pos, accept, &mut threads)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn check_workspace(&self, threads: &[StateHandle]) -> Result<(), MatchError> {
        if threads.len() * 2 > self.workspace {
            return Err(MatchError::DfaWorkspaceTooSmall);
        }
        Ok(())
    }

    /// \return whether an end at \p end may be reported.
    fn admits(&self, end: usize, restarted: bool) -> bool {
        let flags = &self.opts.flags;
        if flags.end_anchored && end != self.input.bytelength() {
            return false;
        }
        if end == self.attempt_start && !restarted {
            if flags.not_empty {
                return false;
            }
            if flags.not_empty_at_start && end == self.search_start {
                return false;
            }
        }
        true
    }

    /// Run \p threads forward from \p pos, collecting match ends.
    fn run(
        &mut self,
        marks: &mut Marks,
        mut threads: Vec<StateHandle>,
        mut pos: usize,
        restarted: bool,
    ) -> Result<Attempt, MatchError> {
        let len = self.input.bytelength();
        let partial = self.opts.flags.partial();
        let mut ends = Vec::new();
        let mut seeds = Vec::new();
        loop {
            self.check_workspace(&threads)?;
            if threads.is_empty() || (self.opts.shortest && !ends.is_empty()) {
                return Ok(Attempt {
                    ends,
                    partial: None,
                });
            }
            if pos == len {
                let partial = if partial && (restarted || self.attempt_start < len) {
                    Some(threads)
                } else {
                    None
                };
                return Ok(Attempt { ends, partial });
            }
            seeds.clear();
            pos = match self.step(&threads, pos, &mut seeds) {
                Some(next) => next,
                None => {
                    return Ok(Attempt {
                        ends,
                        partial: None,
                    })
                }
            };
            threads.clear();
            if self.closure(marks, &seeds, pos, GOAL_STATE, &mut threads)? && self.admits(pos, restarted)
            {
                ends.push(pos);
            }
        }
    }

    /// Try a fresh start at \p start.
    fn attempt_at(&mut self, marks: &mut Marks, start: usize) -> Result<Attempt, MatchError> {
        self.attempt_start = start;
        let mut threads = Vec::new();
        let reached = self.closure(marks, &[self.nfa.start], start, GOAL_STATE, &mut threads)?;
        let mut attempt = self.run(marks, threads, start, false)?;
        if reached && self.admits(start, false) {
            attempt.ends.insert(0, start);
        }
        Ok(attempt)
    }
}

fn fill_matches(result: &mut MatchResult, start: usize, mut ends: Vec<usize>, opts: &DfaMatchOptions) {
    ends.reverse();
    let max = opts.max_results.max(1);
    let truncated = ends.len() > max;
    ends.truncate(max);
    result.set_dfa_matches(start, &ends, truncated);
}

/// Scan \p subject from \p start for all matches at the first matching
/// start position.
pub(crate) fn scan(
    re: &CompiledRegex,
    nfa: &Nfa,
    subject: &[u8],
    start: usize,
    opts: &DfaMatchOptions,
    callout: Option<&mut CalloutFn<'_>>,
    workspace: &mut DfaWorkspace,
    result: &mut MatchResult,
) -> Result<(), MatchError> {
    crate::exec::check_subject(re, subject, start, &opts.flags)?;
    if re.utf {
        scan_input(re, nfa, Utf8Input::new(subject), start, opts, callout, workspace, result)
    } else {
        scan_input(re, nfa, ByteInput::new(subject), start, opts, callout, workspace, result)
    }
}

#[allow(clippy::too_many_arguments)]
fn scan_input<Input: InputIndexer>(
    re: &CompiledRegex,
    nfa: &Nfa,
    input: Input,
    start: usize,
    opts: &DfaMatchOptions,
    callout: Option<&mut CalloutFn<'_>>,
    workspace: &mut DfaWorkspace,
    result: &mut MatchResult,
) -> Result<(), MatchError> {
    let mut scanner = Scanner {
        re,
        nfa,
        input,
        opts,
        callout,
        search_start: start,
        attempt_start: start,
        workspace: opts.effective_workspace(),
    };
    let mut marks = Marks::new(nfa.len());
    let len = input.bytelength();

    if opts.restart {
        let saved = workspace.saved.take().ok_or(MatchError::DfaBadRestart)?;
        if saved.iter().any(|&s| s as usize >= nfa.len()) {
            return Err(MatchError::DfaBadRestart);
        }
        let attempt = scanner.run(&mut marks, saved.into_vec(), start, true)?;
        return finish_restart(result, workspace, attempt, start, len, opts);
    }

    workspace.clear();
    let candidates = Candidates::new(re, &input, start, &opts.flags, &MatchSettings::default());
    let mut first_partial: Option<(usize, Vec<StateHandle>)> = None;
    let mut next = candidates.find(&input, start);
    while let Some(pos) = next {
        let attempt = scanner.attempt_at(&mut marks, pos)?;
        if let Some(threads) = attempt.partial {
            if opts.flags.partial_hard || attempt.ends.is_empty() {
                if opts.flags.partial_hard {
                    first_partial = Some((pos, threads));
                    break;
                }
                if first_partial.is_none() {
                    first_partial = Some((pos, threads));
                }
            }
        }
        if !attempt.ends.is_empty() {
            fill_matches(result, pos, attempt.ends, opts);
            return Ok(());
        }
        next = candidates.after(&input, pos);
    }

    match first_partial {
        Some((pos, threads)) => {
            workspace.saved = Some(threads.into_boxed_slice());
            result.set_partial(pos, len, scan_start(&input, pos, re.max_lookbehind), None);
        }
        None => result.set_no_match(0, None),
    }
    Ok(())
}

fn finish_restart(
    result: &mut MatchResult,
    workspace: &mut DfaWorkspace,
    attempt: Attempt,
    start: usize,
    len: usize,
    opts: &DfaMatchOptions,
) -> Result<(), MatchError> {
    match attempt.partial {
        Some(threads) if opts.flags.partial_hard || attempt.ends.is_empty() => {
            workspace.saved = Some(threads.into_boxed_slice());
            result.set_partial(start, len, start, None);
        }
        _ if !attempt.ends.is_empty() => fill_matches(result, start, attempt.ends, opts),
        _ => result.set_no_match(0, None),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use crate::parse::try_parse;

    fn nfa(pattern: &str) -> Result<Nfa, &'static str> {
        let re = match try_parse(pattern, &CompileOptions::default()) {
            Ok(re) => re,
            Err(err) => panic!("{:?}", err),
        };
        Nfa::try_from(&re)
    }

    #[test]
    fn unsupported_constructs_are_named() {
        assert_eq!(nfa("(a)\\1").err(), Some("backreference"));
        assert_eq!(nfa("(?<=a)b").err(), Some("lookbehind"));
        assert_eq!(nfa("a*+").err(), Some("possessive quantifier"));
        assert_eq!(nfa("(?>ab)").err(), Some("atomic group"));
        assert_eq!(nfa("(*MARK:m)a").err(), Some("(*MARK)"));
        assert_eq!(nfa("a(*COMMIT)b").err(), Some("(*COMMIT)"));
        assert!(nfa("(?=a)a|b{2,3}").is_ok());
    }

    #[test]
    fn huge_counted_loops_exceed_the_budget() {
        assert_eq!(nfa("(?:abc){5000}").err(), Some("pattern too large"));
    }

    #[test]
    fn counted_loops_grow_linearly() {
        let small = nfa("(?:a|b){10}").map(|n| n.len()).unwrap();
        let large = nfa("(?:a|b){20}").map(|n| n.len()).unwrap();
        assert!(large < 3 * small, "{} vs {}", small, large);
        assert!(nfa("(?:a|b|c){2,200}").is_ok());
    }

    #[test]
    fn marks_reset_between_closures() {
        let mut marks = Marks::new(3);
        assert!(!marks.test_and_set(1));
        assert!(marks.test_and_set(1));
        marks.reset();
        assert!(!marks.test_and_set(1));
    }
}
