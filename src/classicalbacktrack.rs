//! Classical backtracking execution engine

use crate::callout::{CalloutEvent, CalloutFn, CalloutResult};
use crate::cursor;
use crate::cursor::{Backward, Direction, Forward};
use crate::error::MatchError;
use crate::indexing::InputIndexer;
use crate::insn::{CompiledRegex, Insn, LoopFields};
use crate::matchers;
use crate::scm;
use crate::scm::SingleCharMatcher;
use crate::types::{CaptureGroupID, GroupData, LoopData, LoopID, IP};
use crate::util::DebugCheckIndex;

#[derive(Clone, Debug)]
pub(crate) enum BacktrackInsn {
    /// Nothing more to backtrack.
    /// This "backstops" our stack.
    Exhausted,

    /// Restore the IP and position.
    SetPosition { ip: IP, pos: usize },

    SetLoopData {
        id: LoopID,
        data: LoopData,
    },

    /// Restore a capture group, and the most recently closed group.
    SetCaptureGroup {
        id: CaptureGroupID,
        data: GroupData,
        last: u16,
    },

    SetMark {
        mark: Option<u16>,
    },

    EnterNonGreedyLoop {
        // The IP of the loop.
        // This is guaranteed to point to an EnterLoopInsn.
        ip: IP,
        data: LoopData,
    },

    GreedyLoop1Char {
        continuation: IP,
        min: usize,
        max: usize,
    },

    NonGreedyLoop1Char {
        continuation: IP,
        min: usize,
        max: usize,
        // Whether the loop stopped at the end of the subject.
        at_end: bool,
    },

    /// Backtracking past a (*COMMIT) fails the whole match.
    Commit,
}

/// Storage for backtracking state which may be reused across match calls.
/// A stack is checked out by one call at a time.
#[derive(Debug, Default)]
pub struct BacktrackStack {
    bts: Vec<BacktrackInsn>,
}

impl BacktrackStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stack with room for \p frames backtracking frames.
    pub fn with_capacity(frames: usize) -> Self {
        BacktrackStack {
            bts: Vec::with_capacity(frames),
        }
    }

    /// \return the number of frames the stack can hold without growing.
    pub fn capacity(&self) -> usize {
        self.bts.capacity()
    }

    pub(crate) fn take(&mut self) -> Vec<BacktrackInsn> {
        let mut bts = core::mem::take(&mut self.bts);
        bts.clear();
        bts.push(BacktrackInsn::Exhausted);
        bts
    }

    pub(crate) fn give_back(&mut self, bts: Vec<BacktrackInsn>) {
        self.bts = bts;
    }
}

/// \return the size of one backtracking frame, in bytes.
pub(crate) const fn frame_size() -> usize {
    core::mem::size_of::<BacktrackInsn>()
}

/// Why a match attempt stopped without an answer.
#[derive(Debug)]
pub(crate) enum Halt {
    Error(MatchError),
    /// A hard partial match was found.
    Partial,
}

impl From<MatchError> for Halt {
    fn from(err: MatchError) -> Self {
        Halt::Error(err)
    }
}

/// Flags and limits which hold for a whole match call.
#[derive(Debug, Copy, Clone)]
pub(crate) struct MatchContext {
    pub search_start: usize,
    pub not_bol: bool,
    pub not_eol: bool,
    pub not_empty: bool,
    pub not_empty_at_start: bool,
    pub end_anchored: bool,
    pub partial: bool,
    pub partial_hard: bool,
    pub match_limit: u64,
    pub depth_limit: usize,
    pub heap_frames: usize,
}

#[derive(Debug, Default)]
struct State {
    loops: Vec<LoopData>,
    groups: Vec<GroupData>,
    mark: Option<u16>,
    // 1-based number of the most recently closed group, or 0.
    capture_last: u16,
}

pub(crate) struct MatchAttempter<'a, 'c, 'f> {
    re: &'a CompiledRegex,
    ctx: MatchContext,
    bts: Vec<BacktrackInsn>,
    s: State,
    callout: Option<&'c mut CalloutFn<'f>>,
    // Scratch space for the offsets handed to callouts.
    offsets: Vec<Option<(usize, usize)>>,
    attempt_start: usize,
    steps: u64,
    // Frames held by enclosing runs while a sub-program executes.
    depth_base: usize,
    nesting: u32,
    committed: bool,
    hit_end: bool,
    last_mark: Option<u16>,
}

impl core::fmt::Debug for MatchAttempter<'_, '_, '_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MatchAttempter")
            .field("bts", &self.bts.len())
            .field("steps", &self.steps)
            .field("committed", &self.committed)
            .finish()
    }
}

impl<'a, 'c, 'f> MatchAttempter<'a, 'c, 'f> {
    pub(crate) fn new(
        re: &'a CompiledRegex,
        ctx: MatchContext,
        callout: Option<&'c mut CalloutFn<'f>>,
        bts: Vec<BacktrackInsn>,
    ) -> Self {
        debug_assert!(matches!(bts.as_slice(), [BacktrackInsn::Exhausted]));
        Self {
            re,
            ctx,
            bts,
            s: State {
                loops: vec![LoopData::new(0); re.loops as usize],
                groups: vec![GroupData::new(); re.groups as usize],
                mark: None,
                capture_last: 0,
            },
            callout,
            offsets: Vec::new(),
            attempt_start: 0,
            steps: 0,
            depth_base: 0,
            nesting: 0,
            committed: false,
            hit_end: false,
            last_mark: None,
        }
    }

    /// Hand back the backtrack storage.
    pub(crate) fn into_bts(self) -> Vec<BacktrackInsn> {
        self.bts
    }

    /// \return the capture groups of the last successful attempt.
    pub(crate) fn groups(&self) -> &[GroupData] {
        &self.s.groups
    }

    /// \return the mark on the successful path.
    pub(crate) fn mark(&self) -> Option<&'a str> {
        let re = self.re;
        self.s.mark.map(|idx| &*re.marks[idx as usize])
    }

    /// \return the last mark crossed on any path.
    pub(crate) fn last_mark(&self) -> Option<&'a str> {
        let re = self.re;
        self.last_mark.map(|idx| &*re.marks[idx as usize])
    }

    /// \return whether backtracking crossed a (*COMMIT).
    pub(crate) fn committed(&self) -> bool {
        self.committed
    }

    /// \return whether the last attempt ran into the end of the subject.
    pub(crate) fn hit_end(&self) -> bool {
        self.hit_end
    }

    /// Count one step against the match limit.
    #[inline]
    fn count_step(&mut self) -> Result<(), Halt> {
        self.steps += 1;
        if self.steps > self.ctx.match_limit {
            Err(Halt::Error(MatchError::MatchLimit))
        } else {
            Ok(())
        }
    }

    /// Run one attempt from \p pos.
    /// \return the end of the match, or None.
    pub(crate) fn attempt<Input: InputIndexer>(
        &mut self,
        input: &Input,
        pos: usize,
    ) -> Result<Option<usize>, Halt> {
        self.count_step()?;
        for gd in self.s.groups.iter_mut() {
            *gd = GroupData::new();
        }
        self.s.mark = None;
        self.s.capture_last = 0;
        self.attempt_start = pos;
        self.hit_end = false;
        self.try_at_pos(input, 0, pos, Forward::new())
    }

    #[inline(always)]
    fn push_backtrack(&mut self, bt: BacktrackInsn) {
        self.bts.push(bt)
    }

    #[inline(always)]
    fn pop_backtrack(&mut self) {
        // Note we never pop the last instruction so this will never be empty.
        debug_assert!(!self.bts.is_empty());
        self.bts.pop();
    }

    /// \return the error for a backtrack stack which has grown past our limits.
    #[cold]
    fn frame_error(&self) -> Halt {
        let frames = self.depth_base + self.bts.len();
        if frames > self.ctx.depth_limit {
            Halt::Error(MatchError::DepthLimit)
        } else {
            Halt::Error(MatchError::HeapLimit)
        }
    }

    /// Record that the match ran into the end of the subject.
    /// In hard partial mode this ends the match.
    fn note_end(&mut self, len: usize) -> Result<(), Halt> {
        if !self.ctx.partial || self.attempt_start >= len {
            return Ok(());
        }
        self.hit_end = true;
        if self.ctx.partial_hard {
            Err(Halt::Partial)
        } else {
            Ok(())
        }
    }

    fn prepare_to_enter_loop(
        bts: &mut Vec<BacktrackInsn>,
        pos: usize,
        loop_fields: &LoopFields,
        loop_data: &mut LoopData,
    ) {
        bts.push(BacktrackInsn::SetLoopData {
            id: loop_fields.loop_id,
            data: *loop_data,
        });
        loop_data.iters += 1;
        loop_data.entry = pos;
    }

    fn run_loop(&mut self, loop_fields: &'a LoopFields, pos: usize, ip: IP) -> Option<IP> {
        let loop_data = &mut self.s.loops[loop_fields.loop_id as usize];
        let iteration = loop_data.iters;

        let do_taken = iteration < loop_fields.max_iters;
        let do_not_taken = iteration >= loop_fields.min_iters;

        let loop_taken_ip = ip + 1;
        let loop_not_taken_ip = loop_fields.exit as IP;

        // An iteration past the minimum which matched the empty string ends
        // the loop.
        if loop_data.entry == pos && iteration > loop_fields.min_iters {
            return Some(loop_not_taken_ip);
        }

        match (do_taken, do_not_taken) {
            (false, false) => {
                // No arms viable.
                None
            }
            (false, true) => {
                // Only skipping is viable.
                Some(loop_not_taken_ip)
            }
            (true, false) => {
                // Only entering is viable.
                MatchAttempter::prepare_to_enter_loop(&mut self.bts, pos, loop_fields, loop_data);
                Some(loop_taken_ip)
            }
            (true, true) if !loop_fields.greedy => {
                // Both arms are viable; backtrack into the loop.
                loop_data.entry = pos;
                self.bts.push(BacktrackInsn::EnterNonGreedyLoop {
                    ip,
                    data: *loop_data,
                });
                Some(loop_not_taken_ip)
            }
            (true, true) => {
                debug_assert!(loop_fields.greedy, "Should be greedy");
                // Both arms are viable; backtrack out of the loop.
                self.bts.push(BacktrackInsn::SetPosition {
                    ip: loop_not_taken_ip,
                    pos,
                });
                MatchAttempter::prepare_to_enter_loop(&mut self.bts, pos, loop_fields, loop_data);
                Some(loop_taken_ip)
            }
        }
    }

    // Drive the loop up to \p max times.
    // \return the position (min, max), or None on failure, along with whether
    // the loop stopped at the end of the subject.
    #[inline(always)]
    fn run_scm_loop_impl<Input: InputIndexer, Dir: Direction, Scm: SingleCharMatcher<Input, Dir>>(
        input: &Input,
        mut pos: usize,
        min: usize,
        max: usize,
        dir: Dir,
        matcher: Scm,
    ) -> (Option<(usize, usize)>, bool) {
        debug_assert!(min <= max, "min should be <= max");
        let len = input.bytelength();
        // Drive the iteration min times.
        // That tells us the min position.
        for _ in 0..min {
            let here = pos;
            if !matcher.matches(input, dir, &mut pos) {
                return (None, Dir::FORWARD && here == len);
            }
        }
        let min_pos = pos;

        // Drive it up to the max.
        let mut at_end = false;
        let mut count = min;
        while count < max {
            let saved = pos;
            if !matcher.matches(input, dir, &mut pos) {
                pos = saved;
                at_end = Dir::FORWARD && saved == len;
                break;
            }
            count += 1;
        }
        (Some((min_pos, pos)), at_end)
    }

    // Given that ip points at a loop whose body matches exactly one character, run
    // a "single character loop". The big idea here is that we don't need to save
    // our position every iteration: we know that our loop body matches a single
    // character so we can backtrack by matching a character backwards.
    // \return the next IP, or None if the loop failed.
    #[allow(clippy::too_many_arguments)]
    fn run_scm_loop<Input: InputIndexer, Dir: Direction>(
        &mut self,
        input: &Input,
        dir: Dir,
        pos: &mut usize,
        min: usize,
        max: usize,
        ip: IP,
        greedy: bool,
        possessive: bool,
    ) -> Result<Option<IP>, Halt> {
        let re = self.re;
        let p = *pos;
        // Iterate as far as we can go.
        let (loop_res, at_end) = match re.insns.iat(ip + 1) {
            &Insn::Char(c) => Self::run_scm_loop_impl(input, p, min, max, dir, scm::Char { c }),
            &Insn::CharICase(c) => {
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::CharICase { c })
            }
            &Insn::Bracket(idx) => {
                let bc = &re.brackets[idx];
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::Bracket { bc })
            }
            Insn::AsciiBracket(bits) => {
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::AsciiBracket { bits })
            }
            Insn::ByteSet(bytes) => {
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::MatchByteSet { bytes })
            }
            Insn::ByteSeq(bytes) => {
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::MatchByteSeq { bytes })
            }
            Insn::MatchAny => {
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::MatchAny::new())
            }
            Insn::MatchAnyExceptNewline => Self::run_scm_loop_impl(
                input,
                p,
                min,
                max,
                dir,
                scm::MatchAnyExceptNewline {
                    newline: re.newline,
                },
            ),
            Insn::CharSet(chars) => {
                Self::run_scm_loop_impl(input, p, min, max, dir, scm::CharSet { chars })
            }
            _ => {
                // There should be no other SCMs.
                debug_assert!(false, "Missing SCM: {:?}", re.insns.iat(ip + 1));
                return Err(Halt::Error(MatchError::Internal("bad single-char loop body")));
            }
        };

        let len = input.bytelength();
        let (min_pos, max_pos) = match loop_res {
            Some(res) => res,
            None => {
                // We failed to match at least the minimum.
                if at_end {
                    self.note_end(len)?;
                }
                return Ok(None);
            }
        };
        debug_assert!(
            if Dir::FORWARD {
                min_pos <= max_pos
            } else {
                min_pos >= max_pos
            },
            "min should be <= (>=) max if cursor is tracking forwards (backwards)"
        );
        if at_end && (greedy || possessive) {
            self.note_end(len)?;
        }

        // The continuation is one past the loop body, which is one past the loop.
        let continuation = ip + 2;
        if possessive {
            *pos = max_pos;
            return Ok(Some(continuation));
        }
        if min_pos != max_pos {
            // Backtracking is possible.
            let bti = if greedy {
                BacktrackInsn::GreedyLoop1Char {
                    continuation,
                    min: min_pos,
                    max: max_pos,
                }
            } else {
                BacktrackInsn::NonGreedyLoop1Char {
                    continuation,
                    min: min_pos,
                    max: max_pos,
                    at_end,
                }
            };
            self.push_backtrack(bti);
        } else if at_end && !greedy {
            self.note_end(len)?;
        }

        // Start at the max (min) if greedy (nongreedy).
        *pos = if greedy { max_pos } else { min_pos };
        Ok(Some(continuation))
    }

    /// Run a sub-program (lookaround or atomic body) to its Goal, on a fresh
    /// backtrack stack.
    fn run_nested<Input: InputIndexer, Dir: Direction>(
        &mut self,
        input: &Input,
        ip: IP,
        pos: usize,
        dir: Dir,
    ) -> Result<Option<usize>, Halt> {
        let mut saved_bts = vec![BacktrackInsn::Exhausted];
        core::mem::swap(&mut self.bts, &mut saved_bts);
        self.depth_base += saved_bts.len();
        self.nesting += 1;

        let res = self.try_at_pos(input, ip, pos, dir);

        self.nesting -= 1;
        self.depth_base -= saved_bts.len();
        core::mem::swap(&mut self.bts, &mut saved_bts);
        res
    }

    /// Save the groups in [start_group, end_group), so that a sub-program's
    /// effects can be undone.
    fn save_groups(&self, start_group: CaptureGroupID, end_group: CaptureGroupID) -> Vec<GroupData> {
        let range = (start_group as usize)..(end_group as usize);
        self.s.groups.iat(range).to_vec()
    }

    /// Arrange for backtracking to restore state saved before a successful
    /// sub-program.
    fn push_restores(
        &mut self,
        start_group: CaptureGroupID,
        saved_groups: &[GroupData],
        mark: Option<u16>,
        last: u16,
    ) {
        for (idx, cg) in saved_groups.iter().enumerate() {
            self.push_backtrack(BacktrackInsn::SetCaptureGroup {
                id: (idx as CaptureGroupID) + start_group,
                data: *cg,
                last,
            });
        }
        if saved_groups.is_empty() {
            // Still need to restore capture_last if an inner group closed.
            if self.s.capture_last != last {
                self.push_backtrack(BacktrackInsn::SetCaptureGroup {
                    id: CaptureGroupID::MAX,
                    data: GroupData::new(),
                    last,
                });
            }
        }
        if self.s.mark != mark {
            self.push_backtrack(BacktrackInsn::SetMark { mark });
        }
    }

    // Run a lookaround instruction, which is either forwards or backwards
    // (according to Direction). The half-open range
    // start_group..end_group is the range of contained capture groups.
    // \return whether we matched and negate was false, or did not match but negate
    // is true.
    fn run_lookaround<Input: InputIndexer, Dir: Direction>(
        &mut self,
        input: &Input,
        ip: IP,
        pos: usize,
        start_group: CaptureGroupID,
        end_group: CaptureGroupID,
        negate: bool,
    ) -> Result<bool, Halt> {
        // Copy capture groups, because if the match fails (or if we are inverted)
        // we need to restore these.
        let saved_groups = self.save_groups(start_group, end_group);
        let saved_mark = self.s.mark;
        let saved_last = self.s.capture_last;
        // A (*COMMIT) inside an assertion only fails the assertion.
        let saved_committed = self.committed;

        let matched = self.run_nested(input, ip, pos, Dir::new())?.is_some();
        self.committed = saved_committed;

        // If we are a positive lookahead that successfully matched, retain the
        // capture groups (but we need to set up backtracking). Otherwise restore
        // them.
        if matched && !negate {
            self.push_restores(start_group, &saved_groups, saved_mark, saved_last);
        } else {
            let range = (start_group as usize)..(end_group as usize);
            self.s.groups.splice(range, saved_groups);
            self.s.mark = saved_mark;
            self.s.capture_last = saved_last;
        }
        Ok(matched != negate)
    }

    /// Invoke the callout at \p idx.
    /// \return whether matching should continue on this path.
    fn run_callout<Input: InputIndexer>(
        &mut self,
        input: &Input,
        idx: u16,
        pos: usize,
    ) -> Result<bool, Halt> {
        if self.callout.is_none() {
            return Ok(true);
        }
        let re = self.re;
        let site = &re.callouts[idx as usize];

        self.offsets.clear();
        self.offsets.push(Some((self.attempt_start, pos)));
        let mut capture_top = 1;
        for (i, gd) in self.s.groups.iter().enumerate() {
            let range = gd.as_range().map(|r| (r.start, r.end));
            if range.is_some() {
                capture_top = i + 2;
            }
            self.offsets.push(range);
        }

        let event = CalloutEvent {
            number: site.number,
            string: site.string.as_deref(),
            start_match: self.attempt_start,
            current_position: pos,
            capture_top,
            capture_last: self.s.capture_last as usize,
            pattern_position: site.pattern_position,
            next_item_length: site.next_item_length,
            mark: self.s.mark.map(|m| &*re.marks[m as usize]),
            subject: input.contents(),
            offsets: &self.offsets,
        };
        let cb = match self.callout.as_mut() {
            Some(cb) => cb,
            None => return Ok(true),
        };
        match (*cb)(&event) {
            Ok(CalloutResult::Pass) => Ok(true),
            Ok(CalloutResult::Fail) => Ok(false),
            Ok(CalloutResult::Abort) => Err(Halt::Error(MatchError::CalloutAborted(None))),
            Err(err) => Err(Halt::Error(MatchError::CalloutAborted(Some(err)))),
        }
    }

    /// Attempt to backtrack.
    /// \return true if we backtracked, false if we exhaust the backtrack stack.
    fn try_backtrack<Input: InputIndexer, Dir: Direction>(
        &mut self,
        input: &Input,
        ip: &mut IP,
        pos: &mut usize,
        _dir: Dir,
    ) -> Result<bool, Halt> {
        if self.committed {
            self.bts.truncate(1);
            return Ok(false);
        }
        loop {
            // We always have a single Exhausted instruction backstopping our stack,
            // so we do not need to check for empty bts.
            debug_assert!(!self.bts.is_empty(), "Backtrack stack should not be empty");
            let bt = match self.bts.last_mut() {
                Some(bt) => bt,
                None => rs_unreachable!("BT stack should never be empty"),
            };
            match bt {
                BacktrackInsn::Exhausted => return Ok(false),

                BacktrackInsn::SetPosition {
                    ip: saved_ip,
                    pos: saved_pos,
                } => {
                    *ip = *saved_ip;
                    *pos = *saved_pos;
                    self.pop_backtrack();
                    self.count_step()?;
                    return Ok(true);
                }
                BacktrackInsn::SetLoopData { id, data } => {
                    *self.s.loops.mat(*id as usize) = *data;
                    self.pop_backtrack();
                }
                &mut BacktrackInsn::SetCaptureGroup { id, data, last } => {
                    if let Some(cg) = self.s.groups.get_mut(id as usize) {
                        *cg = data;
                    }
                    self.s.capture_last = last;
                    self.pop_backtrack();
                }
                &mut BacktrackInsn::SetMark { mark } => {
                    self.s.mark = mark;
                    self.pop_backtrack();
                }
                BacktrackInsn::Commit => {
                    self.committed = true;
                    self.bts.truncate(1);
                    return Ok(false);
                }

                &mut BacktrackInsn::EnterNonGreedyLoop { ip: loop_ip, data } => {
                    // Must pop before we enter the loop.
                    self.pop_backtrack();
                    *ip = loop_ip + 1;
                    *pos = data.entry;
                    let loop_fields = match &self.re.insns.iat(loop_ip) {
                        Insn::EnterLoop(loop_fields) => loop_fields,
                        _ => rs_unreachable!("EnterNonGreedyLoop must point at a loop instruction"),
                    };
                    let loop_data = self.s.loops.mat(loop_fields.loop_id as usize);
                    *loop_data = data;
                    MatchAttempter::prepare_to_enter_loop(
                        &mut self.bts,
                        *pos,
                        loop_fields,
                        loop_data,
                    );
                    self.count_step()?;
                    return Ok(true);
                }

                BacktrackInsn::GreedyLoop1Char {
                    continuation,
                    min,
                    max,
                } => {
                    // The match failed at the max location.
                    debug_assert!(
                        if Dir::FORWARD { max >= min } else { max <= min },
                        "max should be >= min (or <= if tracking backwards)"
                    );
                    // If min is equal to max, there is no more backtracking to be done;
                    // otherwise move opposite the direction of the cursor.
                    if *max == *min {
                        // We have backtracked this loop as far as possible.
                        self.pop_backtrack();
                        continue;
                    }
                    let mut newmax = *max;
                    let moved = if Dir::FORWARD {
                        input.next_left(&mut newmax)
                    } else {
                        input.next_right(&mut newmax)
                    };
                    if moved.is_none() {
                        rs_unreachable!("Should always be able to advance since min != max")
                    }
                    newmax = if Dir::FORWARD {
                        newmax.max(*min)
                    } else {
                        newmax.min(*min)
                    };
                    *pos = newmax;
                    *max = newmax;
                    *ip = *continuation;
                    self.count_step()?;
                    return Ok(true);
                }

                BacktrackInsn::NonGreedyLoop1Char {
                    continuation,
                    min,
                    max,
                    at_end,
                } => {
                    // The match failed at the min location.
                    debug_assert!(
                        if Dir::FORWARD { max >= min } else { max <= min },
                        "max should be >= min (or <= if tracking backwards)"
                    );
                    if *max == *min {
                        // We have backtracked this loop as far as possible.
                        let at_end = *at_end;
                        self.pop_backtrack();
                        if at_end {
                            self.note_end(input.bytelength())?;
                        }
                        continue;
                    }
                    // Move in the direction of the cursor.
                    let mut newmin = *min;
                    let moved = if Dir::FORWARD {
                        input.next_right(&mut newmin)
                    } else {
                        input.next_left(&mut newmin)
                    };
                    if moved.is_none() {
                        rs_unreachable!("Should always be able to advance since min != max")
                    }
                    newmin = if Dir::FORWARD {
                        newmin.min(*max)
                    } else {
                        newmin.max(*max)
                    };
                    *pos = newmin;
                    *min = newmin;
                    *ip = *continuation;
                    self.count_step()?;
                    return Ok(true);
                }
            }
        }
    }

    /// Attempt to match at a given IP and position.
    fn try_at_pos<Input: InputIndexer, Dir: Direction>(
        &mut self,
        input: &Input,
        mut ip: IP,
        mut pos: usize,
        dir: Dir,
    ) -> Result<Option<usize>, Halt> {
        debug_assert!(
            self.bts.len() == 1,
            "Should be only initial exhausted backtrack insn"
        );
        let re = self.re;
        let len = input.bytelength();
        let frame_cap = self.ctx.depth_limit.min(self.ctx.heap_frames);
        // These are not really loops, they are just labels that we effectively 'goto'
        // to.
        #[allow(clippy::never_loop)]
        'nextinsn: loop {
            'backtrack: loop {
                if self.depth_base + self.bts.len() > frame_cap {
                    return Err(self.frame_error());
                }

                // Helper macro to either increment ip and go to the next insn, or backtrack.
                macro_rules! next_or_bt {
                    ($e:expr) => {
                        if $e {
                            ip += 1;
                            continue 'nextinsn;
                        } else {
                            break 'backtrack;
                        }
                    };
                }

                // Like next_or_bt, for items which consume a character. A
                // failure with nothing left to consume is recorded for partial
                // matching.
                macro_rules! consume_or_bt {
                    ($e:expr) => {{
                        let here = pos;
                        let m = $e;
                        if !m && Dir::FORWARD && here == len {
                            self.note_end(len)?;
                        }
                        next_or_bt!(m)
                    }};
                }

                match re.insns.iat(ip) {
                    &Insn::Char(c) => {
                        consume_or_bt!(scm::Char { c }.matches(input, dir, &mut pos))
                    }

                    &Insn::CharICase(c) => {
                        consume_or_bt!(scm::CharICase { c }.matches(input, dir, &mut pos))
                    }

                    Insn::CharSet(chars) => {
                        consume_or_bt!(scm::CharSet { chars }.matches(input, dir, &mut pos))
                    }

                    Insn::ByteSet(bytes) => {
                        consume_or_bt!(scm::MatchByteSet { bytes }.matches(input, dir, &mut pos))
                    }

                    Insn::ByteSeq(bytes) => {
                        let here = pos;
                        if cursor::try_match_lit(input, dir, &mut pos, bytes) {
                            next_or_bt!(true)
                        }
                        if cursor::lit_hits_end(input, dir, here, bytes) {
                            self.note_end(len)?;
                        }
                        break 'backtrack;
                    }

                    Insn::AsciiBracket(bits) => {
                        consume_or_bt!(scm::AsciiBracket { bits }.matches(input, dir, &mut pos))
                    }

                    &Insn::Bracket(idx) => {
                        consume_or_bt!(scm::Bracket {
                            bc: &re.brackets[idx]
                        }
                        .matches(input, dir, &mut pos))
                    }

                    Insn::MatchAny => {
                        consume_or_bt!(scm::MatchAny::new().matches(input, dir, &mut pos))
                    }

                    Insn::MatchAnyExceptNewline => {
                        consume_or_bt!(scm::MatchAnyExceptNewline {
                            newline: re.newline
                        }
                        .matches(input, dir, &mut pos))
                    }

                    Insn::LineBreak => {
                        consume_or_bt!(matchers::line_break(input, dir, re.bsr, &mut pos))
                    }

                    &Insn::WordBoundary { invert } => {
                        next_or_bt!(matchers::word_boundary(input, pos) != invert)
                    }

                    Insn::SubjectStart => next_or_bt!(pos == 0),
                    Insn::LineStart => next_or_bt!(pos == 0 && !self.ctx.not_bol),
                    Insn::MultilineStart => {
                        let matches = (pos == 0 && !self.ctx.not_bol)
                            || (pos < len && matchers::newline_len_before(input, re.newline, pos) > 0);
                        next_or_bt!(matches)
                    }
                    Insn::LineEnd => next_or_bt!(
                        !self.ctx.not_eol && matchers::at_end_or_final_newline(input, re.newline, pos)
                    ),
                    Insn::LineEndOnly => next_or_bt!(!self.ctx.not_eol && pos == len),
                    Insn::MultilineEnd => {
                        let matches = matchers::newline_len_at(input, re.newline, pos) > 0
                            || (pos == len && !self.ctx.not_eol);
                        next_or_bt!(matches)
                    }
                    Insn::FinalNewlineEnd => {
                        next_or_bt!(matchers::at_end_or_final_newline(input, re.newline, pos))
                    }
                    Insn::SubjectEnd => next_or_bt!(pos == len),
                    Insn::SearchStart => next_or_bt!(pos == self.ctx.search_start),

                    &Insn::Jump { target } => {
                        ip = target as usize;
                        continue 'nextinsn;
                    }

                    &Insn::BeginCaptureGroup(cg_idx) => {
                        let last = self.s.capture_last;
                        let cg = self.s.groups.mat(cg_idx as usize);
                        self.bts.push(BacktrackInsn::SetCaptureGroup {
                            id: cg_idx,
                            data: *cg,
                            last,
                        });
                        cg.open = Some(pos);
                        next_or_bt!(true)
                    }

                    &Insn::EndCaptureGroup(cg_idx) => {
                        let last = self.s.capture_last;
                        let cg = self.s.groups.mat(cg_idx as usize);
                        self.bts.push(BacktrackInsn::SetCaptureGroup {
                            id: cg_idx,
                            data: *cg,
                            last,
                        });
                        debug_assert!(cg.open.is_some(), "Capture group should have been entered");
                        let open = cg.open.unwrap_or(pos);
                        // Walking backwards, the group was entered at its end.
                        if Dir::FORWARD {
                            cg.start = Some(open);
                            cg.end = Some(pos);
                        } else {
                            cg.start = Some(pos);
                            cg.end = Some(open);
                        }
                        self.s.capture_last = cg_idx + 1;
                        next_or_bt!(true)
                    }

                    Insn::BackRef { groups, icase } => {
                        // The first group of the list which is set is used.
                        let range = groups
                            .iter()
                            .find_map(|&g| self.s.groups.iat(g as usize).as_range());
                        let matched = match range {
                            Some(range) => {
                                let here = pos;
                                let matched = if *icase {
                                    matchers::backref_icase(input, dir, range.clone(), &mut pos)
                                } else {
                                    matchers::backref(input, dir, range.clone(), &mut pos)
                                };
                                if !matched
                                    && cursor::lit_hits_end(
                                        input,
                                        dir,
                                        here,
                                        &input.contents()[range],
                                    )
                                {
                                    self.note_end(len)?;
                                }
                                matched
                            }
                            // An unset group never matches, unless asked to
                            // match the empty string.
                            None => re.match_unset_backref,
                        };
                        next_or_bt!(matched)
                    }

                    &Insn::Lookahead {
                        negate,
                        start_group,
                        end_group,
                        continuation,
                    } => {
                        if self.run_lookaround::<Input, Forward>(
                            input,
                            ip + 1,
                            pos,
                            start_group,
                            end_group,
                            negate,
                        )? {
                            ip = continuation as IP;
                            continue 'nextinsn;
                        } else {
                            break 'backtrack;
                        }
                    }

                    &Insn::Lookbehind {
                        negate,
                        start_group,
                        end_group,
                        continuation,
                    } => {
                        if self.run_lookaround::<Input, Backward>(
                            input,
                            ip + 1,
                            pos,
                            start_group,
                            end_group,
                            negate,
                        )? {
                            ip = continuation as IP;
                            continue 'nextinsn;
                        } else {
                            break 'backtrack;
                        }
                    }

                    &Insn::Atomic {
                        start_group,
                        end_group,
                        continuation,
                    } => {
                        let saved_groups = self.save_groups(start_group, end_group);
                        let saved_mark = self.s.mark;
                        let saved_last = self.s.capture_last;
                        match self.run_nested(input, ip + 1, pos, dir)? {
                            Some(end) => {
                                self.push_restores(start_group, &saved_groups, saved_mark, saved_last);
                                pos = end;
                                ip = continuation as IP;
                                continue 'nextinsn;
                            }
                            None => break 'backtrack,
                        }
                    }

                    &Insn::Alt { secondary } => {
                        self.push_backtrack(BacktrackInsn::SetPosition {
                            ip: secondary as IP,
                            pos,
                        });
                        next_or_bt!(true);
                    }

                    Insn::EnterLoop(fields) => {
                        // Entering a loop, not re-entering it.
                        self.s.loops.mat(fields.loop_id as usize).iters = 0;
                        match self.run_loop(fields, pos, ip) {
                            Some(next_ip) => {
                                ip = next_ip;
                                continue 'nextinsn;
                            }
                            None => {
                                break 'backtrack;
                            }
                        }
                    }

                    &Insn::LoopAgain { begin } => {
                        let act = match re.insns.iat(begin as IP) {
                            Insn::EnterLoop(fields) => self.run_loop(fields, pos, begin as IP),
                            _ => rs_unreachable!("EnterLoop should always refer to loop field"),
                        };
                        match act {
                            Some(next_ip) => {
                                ip = next_ip;
                                continue 'nextinsn;
                            }
                            None => break 'backtrack,
                        }
                    }

                    &Insn::Loop1CharBody {
                        min_iters,
                        max_iters,
                        greedy,
                        possessive,
                    } => {
                        if let Some(next_ip) = self.run_scm_loop(
                            input, dir, &mut pos, min_iters, max_iters, ip, greedy, possessive,
                        )? {
                            ip = next_ip;
                            continue 'nextinsn;
                        } else {
                            break 'backtrack;
                        }
                    }

                    &Insn::Callout(idx) => {
                        let proceed = self.run_callout(input, idx, pos)?;
                        next_or_bt!(proceed)
                    }

                    &Insn::Mark(idx) => {
                        self.push_backtrack(BacktrackInsn::SetMark { mark: self.s.mark });
                        self.s.mark = Some(idx);
                        self.last_mark = Some(idx);
                        next_or_bt!(true)
                    }

                    Insn::Commit => {
                        self.push_backtrack(BacktrackInsn::Commit);
                        next_or_bt!(true)
                    }

                    Insn::Goal => {
                        if self.nesting == 0 {
                            // Whole-match conditions apply only to the
                            // outermost program.
                            if self.ctx.end_anchored && pos != len {
                                break 'backtrack;
                            }
                            let empty = pos == self.attempt_start;
                            if empty
                                && (self.ctx.not_empty
                                    || (self.ctx.not_empty_at_start
                                        && pos == self.ctx.search_start))
                            {
                                break 'backtrack;
                            }
                        }
                        // Keep all but the initial give-up bts.
                        self.bts.truncate(1);
                        return Ok(Some(pos));
                    }

                    Insn::JustFail => {
                        break 'backtrack;
                    }
                }
            }

            // This after the backtrack loop.
            // A break 'backtrack will jump here.
            if self.try_backtrack(input, &mut ip, &mut pos, dir)? {
                continue 'nextinsn;
            } else {
                // We have exhausted the backtracking stack.
                debug_assert!(self.bts.len() == 1, "Should have exhausted backtrack stack");
                return Ok(None);
            }
        }

        // This is outside the nextinsn loop.
        // It is an error to get here.
        // Every instruction should either continue 'nextinsn, or break 'backtrack.
        {
            #![allow(unreachable_code)]
            rs_unreachable!("Should not fall to end of nextinsn loop")
        }
    }
}
