use crate::callout::{CalloutFn, CalloutSite};
use crate::classicalbacktrack::BacktrackStack;
use crate::dfa::{self, DfaWorkspace, Nfa};
use crate::emit;
use crate::error::{CompileError, ErrorKind, MatchError};
use crate::exec::{self, GlobalCursor};
use crate::insn::CompiledRegex;
use crate::ir;
use crate::optimizer;
use crate::options::{Bsr, CompileOptions, DfaMatchOptions, MatchOptions, MatchSettings, Newline};
use crate::parse;
use crate::types::GroupData;

use core::str::FromStr;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Range is used to express the extent of a match, as byte indexes into the
/// subject.
pub type Range = core::ops::Range<usize>;

/// The outcome of a match call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MatchStatus {
    Match,
    NoMatch,
    Partial,
}

/// The offsets produced by one match call.
///
/// After a backtracking match, slot 0 is the whole match and slot `i` is
/// capture group `i`. After a partial match only slot 0 is set, spanning
/// from the partial match start to the end of the subject. After an
/// all-matches scan, slot `i` holds the `i`-th longest match, all sharing
/// one start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    status: MatchStatus,
    offsets: Vec<Option<(usize, usize)>>,
    count: usize,
    mark: Option<Box<str>>,
    scan_start: Option<usize>,
    truncated: bool,
}

impl MatchResult {
    /// Construct an empty result with room for \p capture_count groups.
    pub fn new(capture_count: usize) -> Self {
        MatchResult {
            status: MatchStatus::NoMatch,
            offsets: vec![None; capture_count + 1],
            count: 0,
            mark: None,
            scan_start: None,
            truncated: false,
        }
    }

    pub(crate) fn set_match(
        &mut self,
        start: usize,
        end: usize,
        groups: &[GroupData],
        mark: Option<&str>,
    ) {
        self.offsets.clear();
        self.offsets.push(Some((start, end)));
        self.offsets.extend(groups.iter().map(|g| match (g.start, g.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }));
        // One past the highest set slot.
        self.count = self
            .offsets
            .iter()
            .rposition(Option::is_some)
            .map_or(1, |idx| idx + 1);
        self.status = MatchStatus::Match;
        self.mark = mark.map(Into::into);
        self.scan_start = None;
        self.truncated = false;
    }

    pub(crate) fn set_partial(
        &mut self,
        start: usize,
        end: usize,
        scan_start: usize,
        mark: Option<&str>,
    ) {
        for slot in self.offsets.iter_mut() {
            *slot = None;
        }
        match self.offsets.first_mut() {
            Some(slot) => *slot = Some((start, end)),
            None => self.offsets.push(Some((start, end))),
        }
        self.count = 1;
        self.status = MatchStatus::Partial;
        self.mark = mark.map(Into::into);
        self.scan_start = Some(scan_start);
        self.truncated = false;
    }

    pub(crate) fn set_no_match(&mut self, groups: usize, mark: Option<&str>) {
        self.offsets.clear();
        self.offsets.resize(groups + 1, None);
        self.count = 0;
        self.status = MatchStatus::NoMatch;
        self.mark = mark.map(Into::into);
        self.scan_start = None;
        self.truncated = false;
    }

    pub(crate) fn set_dfa_matches(&mut self, start: usize, ends: &[usize], truncated: bool) {
        self.offsets.clear();
        self.offsets.extend(ends.iter().map(|&end| Some((start, end))));
        self.count = ends.len();
        self.status = MatchStatus::Match;
        self.mark = None;
        self.scan_start = None;
        self.truncated = truncated;
    }

    #[inline]
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        self.status == MatchStatus::Match
    }

    #[inline]
    pub fn is_partial(&self) -> bool {
        self.status == MatchStatus::Partial
    }

    /// \return the offsets in slot \p idx, if set.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<(usize, usize)> {
        self.offsets.get(idx).copied().flatten()
    }

    /// \return slot \p idx as a range, if set.
    #[inline]
    pub fn range(&self, idx: usize) -> Option<Range> {
        self.get(idx).map(|(start, end)| start..end)
    }

    /// \return one past the highest set slot, or 0 if nothing matched.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// \return every slot.
    #[inline]
    pub fn offsets(&self) -> &[Option<(usize, usize)>] {
        &self.offsets
    }

    /// \return the slots as signed pairs, with unset slots as `(-1, -1)`.
    pub fn raw_offsets(&self) -> Vec<(isize, isize)> {
        self.offsets
            .iter()
            .map(|slot| match *slot {
                Some((start, end)) => (start as isize, end as isize),
                None => (-1, -1),
            })
            .collect()
    }

    /// \return the last `(*MARK)` name passed on the path that produced this
    /// result.
    #[inline]
    pub fn mark(&self) -> Option<&str> {
        self.mark.as_deref()
    }

    /// \return for a partial match, the earliest subject position that was
    /// inspected, including lookbehind.
    #[inline]
    pub fn scan_start(&self) -> Option<usize> {
        self.scan_start
    }

    /// \return whether an all-matches scan found more matches than it could
    /// report.
    #[inline]
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// \return the text of slot \p idx within \p subject.
    pub fn group<'s>(&self, subject: &'s [u8], idx: usize) -> Option<&'s [u8]> {
        let (start, end) = self.get(idx)?;
        subject.get(start..end)
    }

    pub(crate) fn to_match(&self, group_names: &[Box<str>]) -> Option<Match> {
        if self.status != MatchStatus::Match {
            return None;
        }
        let range = self.range(0)?;
        let captures = self
            .offsets
            .iter()
            .skip(1)
            .map(|slot| slot.map(|(start, end)| start..end))
            .collect();
        Some(Match {
            range,
            captures,
            mark: self.mark.clone(),
            group_names: group_names.into(),
        })
    }
}

/// A Match represents a portion of a string which was found to match a Regex.
#[derive(Debug, Clone)]
pub struct Match {
    /// The total range of the match. Note this may be empty, if the regex
    /// matched an empty string.
    pub range: Range,

    /// The list of captures. This has length equal to the number of capturing
    /// groups in the regex. For each capture, if the value is None, that group
    /// did not match (for example, it was in a not-taken branch of an
    /// alternation). If the value is Some, the group did match with the
    /// enclosed range.
    pub captures: Vec<Option<Range>>,

    mark: Option<Box<str>>,

    // A list of capture group names. This is either:
    //   - Empty, if there were no named capture groups.
    //   - A list of names with length `captures.len()`, corresponding to the
    //     capture group names in order. Groups without names have an empty string.
    pub(crate) group_names: Box<[Box<str>]>,
}

impl Match {
    /// Access a group by index, using the convention of Python's group()
    /// function. Index 0 is the total match, index 1 is the first capture
    /// group.
    #[inline]
    pub fn group(&self, idx: usize) -> Option<Range> {
        if idx == 0 {
            Some(self.range.clone())
        } else {
            self.captures.get(idx - 1).cloned().flatten()
        }
    }

    /// Access a named group by name. When several groups share the name, the
    /// first one that participated is returned.
    #[inline]
    pub fn named_group(&self, name: &str) -> Option<Range> {
        // Empty strings are used as sentinels to indicate unnamed group.
        if name.is_empty() {
            return None;
        }
        self.group_names
            .iter()
            .zip(self.captures.iter())
            .filter(|(group_name, _)| group_name.as_ref() == name)
            .find_map(|(_, range)| range.clone())
    }

    /// Return an iterator over the named groups of a Match.
    #[inline]
    pub fn named_groups(&self) -> NamedGroups<'_> {
        NamedGroups::new(self)
    }

    /// Returns the range over the starting and ending byte offsets of the match in the haystack.
    ///
    /// This is a convenience function to work around
    /// the fact that Range does not support Copy.
    #[inline]
    pub fn range(&self) -> Range {
        self.range.clone()
    }

    /// Returns the starting byte offset of the match in the haystack.
    #[inline]
    pub fn start(&self) -> usize {
        self.range.start
    }

    /// Returns the ending byte offset of the match in the haystack.
    #[inline]
    pub fn end(&self) -> usize {
        self.range.end
    }

    /// Returns the last `(*MARK)` name passed by the match.
    #[inline]
    pub fn mark(&self) -> Option<&str> {
        self.mark.as_deref()
    }

    /// Return an iterator over a Match. The first returned value is the total
    /// match, and subsequent values represent the capture groups.
    #[inline]
    pub fn groups(&self) -> Groups<'_> {
        Groups::new(self)
    }
}

/// An iterator over the capture groups of a [`Match`]
///
/// This struct is created by the [`groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`groups`]: ../struct.Match.html#method.groups
#[derive(Clone)]
pub struct Groups<'m> {
    mat: &'m Match,
    i: usize,
    max: usize,
}

impl<'m> Groups<'m> {
    #[inline]
    fn new(mat: &'m Match) -> Self {
        Self {
            mat,
            i: 0,
            max: mat.captures.len() + 1,
        }
    }
}

impl Iterator for Groups<'_> {
    type Item = Option<Range>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let i = self.i;
        if i < self.max {
            self.i += 1;
            Some(self.mat.group(i))
        } else {
            None
        }
    }
}

/// An iterator over the named capture groups of a [`Match`]
///
/// This struct is created by the [`named_groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`named_groups`]: ../struct.Match.html#method.named_groups
#[derive(Clone)]
pub struct NamedGroups<'m> {
    mat: &'m Match,
    next_group_name_idx: usize,
}

impl<'m> NamedGroups<'m> {
    #[inline]
    fn new(mat: &'m Match) -> Self {
        Self {
            mat,
            next_group_name_idx: 0,
        }
    }
}

impl<'m> Iterator for NamedGroups<'m> {
    type Item = (&'m str, Option<Range>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // Increment next_group_name_idx until we find a non-empty name.
        debug_assert!(self.next_group_name_idx <= self.mat.group_names.len());
        let end = self.mat.group_names.len();
        let mut idx = self.next_group_name_idx;
        while idx < end && self.mat.group_names[idx].is_empty() {
            idx += 1;
        }
        if idx == end {
            return None;
        }
        let name = self.mat.group_names[idx].as_ref();
        let range = self.mat.captures[idx].clone();
        self.next_group_name_idx = idx + 1;
        Some((name, range))
    }
}

/// An iterator over successive non-overlapping matches in a string,
/// yielding the error which stopped iteration, if any, as its last item.
#[derive(Debug)]
pub struct TryMatches<'r, 't> {
    re: &'r Regex,
    text: &'t str,
    cursor: GlobalCursor,
    opts: MatchOptions,
    settings: MatchSettings,
    stack: BacktrackStack,
    result: MatchResult,
    done: bool,
}

impl<'r, 't> TryMatches<'r, 't> {
    fn new(re: &'r Regex, text: &'t str, start: usize) -> Self {
        TryMatches {
            re,
            text,
            cursor: GlobalCursor::new(start),
            // A &str is always valid UTF-8.
            opts: MatchOptions::default().no_utf_check(true),
            settings: MatchSettings::default(),
            stack: BacktrackStack::new(),
            result: MatchResult::new(re.capture_count()),
            done: false,
        }
    }
}

impl Iterator for TryMatches<'_, '_> {
    type Item = Result<Match, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let TryMatches {
            re,
            text,
            cursor,
            opts,
            settings,
            stack,
            result,
            done,
        } = self;
        if *done {
            return None;
        }
        let subject = text.as_bytes();
        let found = cursor.advance(subject, re.cr.utf, re.cr.newline, opts, result, |pos, o, r| {
            re.match_into(subject, pos, o, settings, None, stack, r)
        });
        match found {
            Ok(true) => result.to_match(&re.cr.group_names).map(Ok),
            Ok(false) => {
                *done = true;
                None
            }
            Err(err) => {
                debug!("Match iteration stopped: {}", err);
                *done = true;
                Some(Err(err))
            }
        }
    }
}

impl std::iter::FusedIterator for TryMatches<'_, '_> {}

/// An iterator over successive non-overlapping matches in a string.
/// Iteration stops at the first match error, which is then available from
/// [`Matches::error`].
#[derive(Debug)]
pub struct Matches<'r, 't> {
    inner: TryMatches<'r, 't>,
    error: Option<MatchError>,
}

impl Matches<'_, '_> {
    /// \return the error which ended iteration early, if any.
    #[inline]
    pub fn error(&self) -> Option<&MatchError> {
        self.error.as_ref()
    }

    /// \return the error which ended iteration early, if any.
    #[inline]
    pub fn into_error(self) -> Option<MatchError> {
        self.error
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        match self.inner.next()? {
            Ok(m) => Some(m),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }
}

impl std::iter::FusedIterator for Matches<'_, '_> {}

type NameTable = Box<[(Box<str>, Box<[usize]>)]>;

/// Group numbers for each name, sorted by name.
fn name_table(ire: &ir::Regex) -> Result<NameTable, CompileError> {
    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (name, id) in &ire.group_names {
        let numbers = by_name.entry(name.as_str()).or_default();
        // The parser rejects duplicates it was not told to allow.
        if !numbers.is_empty() && !ire.dup_names {
            return Err(CompileError::new(ErrorKind::Internal, 0));
        }
        numbers.push(usize::from(*id) + 1);
    }
    Ok(by_name
        .into_iter()
        .map(|(name, numbers)| (name.into(), numbers.into_boxed_slice()))
        .collect())
}

/// A Regex is the compiled version of a pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    cr: CompiledRegex,
    // The all-matches program, or what prevented building it.
    dfa: Result<Arc<Nfa>, &'static str>,
    options: CompileOptions,
    names: NameTable,
    has_backrefs: bool,
}

impl Regex {
    /// Construct a regex by parsing `pattern` using the default options.
    /// An Error may be returned if the syntax is invalid.
    /// Note that this is rather expensive; prefer to cache a Regex which is
    /// intended to be used more than once.
    #[inline]
    pub fn new(pattern: &str) -> Result<Regex, CompileError> {
        Self::with_options(pattern, CompileOptions::default())
    }

    /// Construct a regex by parsing `pattern` with `options`. Flag strings
    /// like `"im"` convert into options.
    pub fn with_options<O>(pattern: &str, options: O) -> Result<Regex, CompileError>
    where
        O: Into<CompileOptions>,
    {
        let options = options.into();
        if let Some(_jit) = options.jit {
            debug!("Specialized programs requested ({:?}); using the interpreter", _jit);
        }
        let mut ire = parse::try_parse(pattern, &options)?;
        let measured = emit::Measurements::of(&ire);
        // The all-matches program is built from the unoptimized IR.
        let dfa = Nfa::try_from(&ire).map(Arc::new);
        if !options.no_optimize {
            optimizer::optimize(&mut ire);
        }
        let cr = emit::emit(&ire, &options, measured)?;
        debug!(
            "Compiled {:?}: {} instructions, {} groups, all-matches {}",
            pattern,
            cr.insns.len(),
            cr.groups,
            match &dfa {
                Ok(nfa) => format!("{} states", nfa.len()),
                Err(reason) => format!("unsupported ({})", reason),
            }
        );

        let names = name_table(&ire)?;
        Ok(Regex {
            cr,
            dfa,
            options,
            names,
            has_backrefs: ire.has_backrefs,
        })
    }

    /// Match against \p subject starting at byte offset \p start.
    /// No match and partial matches are reported through the result status.
    pub fn match_at(
        &self,
        subject: &[u8],
        start: usize,
        opts: &MatchOptions,
        settings: &MatchSettings,
        callout: Option<&mut CalloutFn<'_>>,
    ) -> Result<MatchResult, MatchError> {
        let mut stack = BacktrackStack::new();
        self.match_with_stack(subject, start, opts, settings, callout, &mut stack)
    }

    /// Like [`Regex::match_at`], reusing the backtracking storage in
    /// \p stack.
    pub fn match_with_stack(
        &self,
        subject: &[u8],
        start: usize,
        opts: &MatchOptions,
        settings: &MatchSettings,
        callout: Option<&mut CalloutFn<'_>>,
        stack: &mut BacktrackStack,
    ) -> Result<MatchResult, MatchError> {
        let mut result = MatchResult::new(self.capture_count());
        self.match_into(subject, start, opts, settings, callout, stack, &mut result)?;
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn match_into(
        &self,
        subject: &[u8],
        start: usize,
        opts: &MatchOptions,
        settings: &MatchSettings,
        callout: Option<&mut CalloutFn<'_>>,
        stack: &mut BacktrackStack,
        result: &mut MatchResult,
    ) -> Result<(), MatchError> {
        exec::execute(&self.cr, subject, start, opts, settings, callout, stack, result)
    }

    /// Find every match starting at the first position where any match
    /// starts, longest first.
    pub fn dfa_match(
        &self,
        subject: &[u8],
        start: usize,
        opts: &DfaMatchOptions,
        callout: Option<&mut CalloutFn<'_>>,
    ) -> Result<MatchResult, MatchError> {
        let mut workspace = DfaWorkspace::new();
        self.dfa_match_with_workspace(subject, start, opts, callout, &mut workspace)
    }

    /// Like [`Regex::dfa_match`], keeping scan state in \p workspace so a
    /// partial result can be continued with `restart`.
    pub fn dfa_match_with_workspace(
        &self,
        subject: &[u8],
        start: usize,
        opts: &DfaMatchOptions,
        callout: Option<&mut CalloutFn<'_>>,
        workspace: &mut DfaWorkspace,
    ) -> Result<MatchResult, MatchError> {
        let nfa = self
            .dfa
            .as_ref()
            .map_err(|reason| MatchError::DfaUnsupported(*reason))?;
        let mut result = MatchResult::new(0);
        dfa::scan(&self.cr, nfa, subject, start, opts, callout, workspace, &mut result)?;
        Ok(result)
    }

    /// Searches `text` to find the first match.
    #[inline]
    pub fn find(&self, text: &str) -> Option<Match> {
        self.find_iter(text).next()
    }

    /// Searches `text` from byte index `start` to find the first match.
    /// Lookbehinds may inspect text before `start`.
    #[inline]
    pub fn find_at(&self, text: &str, start: usize) -> Option<Match> {
        self.find_from(text, start).next()
    }

    /// Searches `text`, returning an iterator over non-overlapping matches.
    /// Note that the resulting Iterator borrows both the regex `'r` and the
    /// input string as `'t`.
    #[inline]
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        self.find_from(text, 0)
    }

    /// Returns an iterator for matches found in 'text' starting at byte index
    /// `start`. Note this may be different from passing a sliced `text` in
    /// the case of lookbehind assertions.
    /// Example:
    ///
    ///  ```rust
    ///   use rematch::Regex;
    ///   let text = "xyxy";
    ///   let re = Regex::new(r"(?<=x)y").unwrap();
    ///   let t1 = re.find(&text[1..]).unwrap().range();
    ///   assert!(t1 == (2..3));
    ///   let t2 = re.find_from(text, 1).next().unwrap().range();
    ///   assert!(t2 == (1..2));
    ///   ```
    #[inline]
    pub fn find_from<'r, 't>(&'r self, text: &'t str, start: usize) -> Matches<'r, 't> {
        Matches {
            inner: self.try_find_from(text, start),
            error: None,
        }
    }

    /// Like [`Regex::find_iter`], but a match error such as an exceeded
    /// limit is yielded rather than ending iteration silently.
    #[inline]
    pub fn try_find_iter<'r, 't>(&'r self, text: &'t str) -> TryMatches<'r, 't> {
        self.try_find_from(text, 0)
    }

    /// Like [`Regex::find_from`], yielding match errors.
    #[inline]
    pub fn try_find_from<'r, 't>(&'r self, text: &'t str, start: usize) -> TryMatches<'r, 't> {
        TryMatches::new(self, text, start)
    }

    /// Searches `text` to find the first match, reporting match errors.
    #[inline]
    pub fn try_find(&self, text: &str) -> Result<Option<Match>, MatchError> {
        self.try_find_iter(text).next().transpose()
    }

    /// \return whether `text` contains a match. A match error counts as no
    /// match; use [`Regex::try_is_match`] to see it.
    #[inline]
    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// \return whether `text` contains a match, reporting match errors.
    #[inline]
    pub fn try_is_match(&self, text: &str) -> Result<bool, MatchError> {
        self.try_find(text).map(|m| m.is_some())
    }

    /// Searches `text` for the first match, with its capture groups.
    #[inline]
    pub fn captures(&self, text: &str) -> Option<Match> {
        self.find(text)
    }

    /// \return the number of capture groups, not counting the whole match.
    #[inline]
    pub fn capture_count(&self) -> usize {
        self.cr.groups as usize
    }

    /// \return the named groups and their numbers, in group order.
    pub fn group_names(&self) -> Vec<(&str, usize)> {
        self.cr
            .group_names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(id, name)| (name.as_ref(), id + 1))
            .collect()
    }

    /// \return the numbers of the groups called \p name, in order.
    pub fn group_indexes(&self, name: &str) -> Option<&[usize]> {
        let idx = self
            .names
            .binary_search_by(|(candidate, _)| candidate.as_ref().cmp(name))
            .ok()?;
        Some(&self.names[idx].1)
    }

    /// \return the callouts of the pattern, in pattern order.
    #[inline]
    pub fn callouts(&self) -> &[CalloutSite] {
        &self.cr.callouts
    }

    /// \return the options this regex was compiled with.
    #[inline]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// \return how many characters lookbehinds may inspect before a match
    /// start, or None if unbounded.
    #[inline]
    pub fn max_lookbehind(&self) -> Option<usize> {
        self.cr.max_lookbehind
    }

    /// \return a lower bound on the length of any match, in characters.
    #[inline]
    pub fn min_length(&self) -> usize {
        self.cr.min_length
    }

    #[inline]
    pub fn has_backrefs(&self) -> bool {
        self.has_backrefs
    }

    #[inline]
    pub fn newline(&self) -> Newline {
        self.cr.newline
    }

    #[inline]
    pub fn bsr(&self) -> Bsr {
        self.cr.bsr
    }

    /// \return whether [`Regex::dfa_match`] can run this pattern.
    #[inline]
    pub fn supports_dfa(&self) -> bool {
        self.dfa.is_ok()
    }

    /// \return the construct which prevents all-matches scanning, if any.
    #[inline]
    pub fn dfa_unsupported_reason(&self) -> Option<&'static str> {
        self.dfa.as_ref().err().copied()
    }

    #[inline]
    pub(crate) fn compiled(&self) -> &CompiledRegex {
        &self.cr
    }
}

impl FromStr for Regex {
    type Err = CompileError;

    /// Attempts to parse a string into a regular expression
    #[inline]
    fn from_str(s: &str) -> Result<Self, CompileError> {
        Self::new(s)
    }
}

// The individual compilation phases, for tools which inspect them.
#[doc(hidden)]
pub mod backends {
    pub use crate::emit::{emit, Measurements};
    pub use crate::optimizer::optimize;
    pub use crate::parse::try_parse;
}
