//! Compile-time and match-time options.

use crate::util::to_char_sat;
use core::fmt;

/// Which character sequences count as a newline for `^`, `$` and `.`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Newline {
    /// Carriage return only.
    Cr,
    /// Linefeed only.
    #[default]
    Lf,
    /// The two-character sequence CR LF only.
    CrLf,
    /// Any Unicode line ending.
    Any,
    /// CR, LF, or CR LF.
    AnyCrLf,
    /// The NUL character.
    Nul,
}

/// What `\R` matches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Bsr {
    /// Any Unicode line ending.
    #[default]
    Unicode,
    /// CR, LF, or CR LF.
    AnyCrLf,
}

/// Enables or disables one compile-time optimization.
/// Directives are applied in order; the last one for a given optimization
/// wins.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OptimizationDirective {
    AutoPossess,
    NoAutoPossess,
    DotStarAnchor,
    NoDotStarAnchor,
    StartOptimize,
    NoStartOptimize,
}

/// Which specialized programs to request.
/// This engine always executes the portable program; a request is accepted
/// and noted in the log.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct JitOptions {
    pub complete: bool,
    pub partial_soft: bool,
    pub partial_hard: bool,
}

/// Extra compile-time behaviors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ExtraOptions {
    /// The pattern must match a whole line, as if wrapped in `^(?:..)$`.
    pub match_line: bool,
    /// The pattern must match a whole word, as if wrapped in `\b(?:..)\b`.
    pub match_word: bool,
    /// `\r` in the pattern is treated as `\n`.
    pub escaped_cr_is_lf: bool,
}

/// The default nesting limit for parentheses.
pub const DEFAULT_PARENS_NEST_LIMIT: u32 = 250;

macro_rules! bool_setters {
    ($ty:ident, $($(#[$doc:meta])* $name:ident),* $(,)?) => {
        impl $ty {
            $(
                $(#[$doc])*
                #[inline]
                pub fn $name(mut self, yes: bool) -> Self {
                    self.$name = yes;
                    self
                }
            )*
        }
    };
}

/// Options used to control pattern compilation.
/// The default is case-sensitive, UTF-8, LF newlines and optimizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Letters match both cases. Equivalent to `(?i)`.
    pub caseless: bool,
    /// `^` and `$` also match at internal newlines. Equivalent to `(?m)`.
    pub multiline: bool,
    /// `.` matches newlines too. Equivalent to `(?s)`.
    pub dotall: bool,
    /// Whitespace and `#` comments in the pattern are ignored. Equivalent to
    /// `(?x)`.
    pub extended: bool,
    /// Matches may only start at the start offset.
    pub anchored: bool,
    /// Matches must end at the end of the subject.
    pub end_anchored: bool,
    /// Quantifiers are lazy by default and `?` makes them greedy.
    pub ungreedy: bool,
    /// `$` matches only at the very end, never before a final newline.
    pub dollar_endonly: bool,
    /// Several groups may share a name. Equivalent to `(?J)`.
    pub dup_names: bool,
    /// Plain parentheses do not capture. Equivalent to `(?n)`.
    pub no_auto_capture: bool,
    /// Insert callout 255 before every item.
    pub auto_callout: bool,
    /// `[]` is an empty class which never matches, and `[^]` matches anything.
    pub allow_empty_class: bool,
    /// A back-reference to an unset group matches the empty string.
    pub match_unset_backref: bool,
    /// Treat the pattern and subjects as UTF-8. Otherwise every byte is a
    /// character.
    pub utf: bool,
    /// Skip UTF-8 validation of the pattern. Patterns are `&str` so this has
    /// no effect beyond being reported back.
    pub no_utf_check: bool,
    /// A match must start before or at the first newline.
    pub firstline: bool,
    /// If set, skip the IR optimization passes.
    pub no_optimize: bool,

    /// The newline convention.
    pub newline: Newline,
    /// What `\R` matches.
    pub bsr: Bsr,
    /// How deeply parentheses may nest.
    pub parens_nest_limit: u32,
    /// Maximum pattern length in bytes.
    pub max_pattern_length: Option<usize>,
    /// Maximum compiled program length in instructions.
    pub max_pattern_compiled_length: Option<usize>,
    /// Extra behaviors.
    pub extra: ExtraOptions,
    /// Optimization directives, applied in order.
    pub directives: Vec<OptimizationDirective>,
    /// Request specialized programs.
    pub jit: Option<JitOptions>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            caseless: false,
            multiline: false,
            dotall: false,
            extended: false,
            anchored: false,
            end_anchored: false,
            ungreedy: false,
            dollar_endonly: false,
            dup_names: false,
            no_auto_capture: false,
            auto_callout: false,
            allow_empty_class: false,
            match_unset_backref: false,
            utf: true,
            no_utf_check: false,
            firstline: false,
            no_optimize: false,
            newline: Newline::default(),
            bsr: Bsr::default(),
            parens_nest_limit: DEFAULT_PARENS_NEST_LIMIT,
            max_pattern_length: None,
            max_pattern_compiled_length: None,
            extra: ExtraOptions::default(),
            directives: Vec::new(),
            jit: None,
        }
    }
}

bool_setters!(
    CompileOptions,
    caseless,
    multiline,
    dotall,
    extended,
    anchored,
    end_anchored,
    ungreedy,
    dollar_endonly,
    dup_names,
    no_auto_capture,
    auto_callout,
    allow_empty_class,
    match_unset_backref,
    utf,
    no_utf_check,
    firstline,
    no_optimize,
);

impl CompileOptions {
    pub fn newline(mut self, newline: Newline) -> Self {
        self.newline = newline;
        self
    }

    pub fn bsr(mut self, bsr: Bsr) -> Self {
        self.bsr = bsr;
        self
    }

    pub fn parens_nest_limit(mut self, limit: u32) -> Self {
        self.parens_nest_limit = limit;
        self
    }

    pub fn max_pattern_length(mut self, limit: usize) -> Self {
        self.max_pattern_length = Some(limit);
        self
    }

    pub fn max_pattern_compiled_length(mut self, limit: usize) -> Self {
        self.max_pattern_compiled_length = Some(limit);
        self
    }

    pub fn extra(mut self, extra: ExtraOptions) -> Self {
        self.extra = extra;
        self
    }

    /// Append an optimization directive.
    pub fn directive(mut self, directive: OptimizationDirective) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn jit(mut self, jit: JitOptions) -> Self {
        self.jit = Some(jit);
        self
    }

    /// Construct from a sequence of flag letters.
    /// 'i' caseless, 'm' multiline, 's' dotall, 'x' extended, 'n' no
    /// auto-capture, 'J' duplicate names, 'U' ungreedy, 'A' anchored, 'D'
    /// dollar-endonly, 'b' byte (non-UTF) mode.
    /// Other letters are ignored.
    pub fn new<T: Iterator<Item = u32>>(chars: T) -> Self {
        let mut result = Self::default();
        for c in chars {
            match to_char_sat(c) {
                'i' => result.caseless = true,
                'm' => result.multiline = true,
                's' => result.dotall = true,
                'x' => result.extended = true,
                'n' => result.no_auto_capture = true,
                'J' => result.dup_names = true,
                'U' => result.ungreedy = true,
                'A' => result.anchored = true,
                'D' => result.dollar_endonly = true,
                'b' => result.utf = false,
                _ => {
                    // Silently skip unsupported flags.
                }
            }
        }
        result
    }
}

/// \return whether \p on is enabled by a list of directives; the last
/// directive naming the optimization wins. \p on may be either sense.
pub(crate) fn directive_enabled(
    directives: &[OptimizationDirective],
    on: OptimizationDirective,
) -> bool {
    use OptimizationDirective::*;
    let (positive, negative) = match on {
        AutoPossess | NoAutoPossess => (AutoPossess, NoAutoPossess),
        DotStarAnchor | NoDotStarAnchor => (DotStarAnchor, NoDotStarAnchor),
        StartOptimize | NoStartOptimize => (StartOptimize, NoStartOptimize),
    };
    let mut enabled = true;
    for &d in directives {
        if d == positive {
            enabled = true;
        } else if d == negative {
            enabled = false;
        }
    }
    enabled == (on == positive)
}

impl From<&str> for CompileOptions {
    /// Construct from a string of flag letters.
    ///
    /// See also: [`CompileOptions::new`].
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s.chars().map(u32::from))
    }
}

impl From<&CompileOptions> for CompileOptions {
    #[inline]
    fn from(options: &CompileOptions) -> Self {
        options.clone()
    }
}

impl fmt::Display for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let letters = [
            (self.caseless, 'i'),
            (self.multiline, 'm'),
            (self.dotall, 's'),
            (self.extended, 'x'),
            (self.no_auto_capture, 'n'),
            (self.dup_names, 'J'),
            (self.ungreedy, 'U'),
            (self.anchored, 'A'),
            (self.dollar_endonly, 'D'),
            (!self.utf, 'b'),
        ];
        for (set, letter) in letters {
            if set {
                write!(f, "{}", letter)?;
            }
        }
        Ok(())
    }
}

/// Per-call matching flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct MatchOptions {
    /// The match may only start at the start offset.
    pub anchored: bool,
    /// The match must end at the end of the subject.
    pub end_anchored: bool,
    /// The start of the subject is not the beginning of a line.
    pub not_bol: bool,
    /// The end of the subject is not the end of a line.
    pub not_eol: bool,
    /// An empty string is not a valid match.
    pub not_empty: bool,
    /// An empty string at the start offset is not a valid match.
    pub not_empty_at_start: bool,
    /// Report a partial match only if there is no complete match.
    pub partial_soft: bool,
    /// Report a partial match as soon as one is found.
    pub partial_hard: bool,
    /// The subject is known to be valid UTF-8.
    pub no_utf_check: bool,
}

bool_setters!(
    MatchOptions,
    anchored,
    end_anchored,
    not_bol,
    not_eol,
    not_empty,
    not_empty_at_start,
    partial_soft,
    partial_hard,
    no_utf_check,
);

impl MatchOptions {
    /// \return whether any partial matching was requested.
    #[inline]
    pub fn partial(&self) -> bool {
        self.partial_soft || self.partial_hard
    }
}

/// The default step limit.
pub const DEFAULT_MATCH_LIMIT: u64 = 10_000_000;

/// The default backtracking depth limit.
pub const DEFAULT_DEPTH_LIMIT: u64 = 10_000_000;

/// The default heap limit, in KiB.
pub const DEFAULT_HEAP_LIMIT: u64 = 20_000_000;

/// Resource limits for one match call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MatchSettings {
    /// Maximum number of steps (start attempts plus backtracks).
    pub match_limit: u64,
    /// Maximum number of backtracking frames.
    pub depth_limit: u64,
    /// Maximum backtracking storage, in KiB.
    pub heap_limit: u64,
    /// Largest start position that is tried.
    pub offset_limit: Option<usize>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        MatchSettings {
            match_limit: DEFAULT_MATCH_LIMIT,
            depth_limit: DEFAULT_DEPTH_LIMIT,
            heap_limit: DEFAULT_HEAP_LIMIT,
            offset_limit: None,
        }
    }
}

impl MatchSettings {
    pub fn match_limit(mut self, limit: u64) -> Self {
        self.match_limit = limit;
        self
    }

    pub fn depth_limit(mut self, limit: u64) -> Self {
        self.depth_limit = limit;
        self
    }

    pub fn heap_limit(mut self, kib: u64) -> Self {
        self.heap_limit = kib;
        self
    }

    pub fn offset_limit(mut self, limit: usize) -> Self {
        self.offset_limit = Some(limit);
        self
    }
}

/// Limits set inside a pattern with (*LIMIT_MATCH=n) and friends.
/// They can only lower the limits of the settings used to match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub(crate) struct PatternLimits {
    pub match_limit: Option<u64>,
    pub depth_limit: Option<u64>,
    pub heap_limit: Option<u64>,
}

impl PatternLimits {
    /// \return \p settings lowered to our limits.
    pub fn apply(&self, settings: &MatchSettings) -> MatchSettings {
        let lower = |current: u64, cap: Option<u64>| cap.map_or(current, |cap| current.min(cap));
        MatchSettings {
            match_limit: lower(settings.match_limit, self.match_limit),
            depth_limit: lower(settings.depth_limit, self.depth_limit),
            heap_limit: lower(settings.heap_limit, self.heap_limit),
            offset_limit: settings.offset_limit,
        }
    }
}

/// Options for substitution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SubstituteOptions {
    /// Flags for the underlying matches.
    pub flags: MatchOptions,
    /// Replace every match, not just the first.
    pub global: bool,
    /// Enable backslash escapes, case forcing and conditional groups in the
    /// replacement.
    pub extended: bool,
    /// Treat the replacement as literal text.
    pub literal: bool,
    /// Output only the replacements, not the unmatched text.
    pub replacement_only: bool,
    /// References to unknown groups expand as unset groups.
    pub unknown_unset: bool,
    /// Unset groups expand to the empty string.
    pub unset_empty: bool,
}

bool_setters!(
    SubstituteOptions,
    global,
    extended,
    literal,
    replacement_only,
    unknown_unset,
    unset_empty,
);

impl SubstituteOptions {
    pub fn flags(mut self, flags: MatchOptions) -> Self {
        self.flags = flags;
        self
    }
}

/// The smallest all-matches workspace, in cells.
pub const DFA_MIN_WORKSPACE: usize = 20;

/// The default all-matches workspace, in cells.
pub const DFA_DEFAULT_WORKSPACE: usize = 1000;

/// Options for all-matches scanning.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DfaMatchOptions {
    /// Flags for the scan.
    pub flags: MatchOptions,
    /// Stop at the first (shortest) match.
    pub shortest: bool,
    /// Continue the scan saved in the workspace by a previous partial result.
    pub restart: bool,
    /// Maximum number of match ends to report.
    pub max_results: usize,
    /// Requested workspace size in cells. Values below the minimum are raised
    /// to the minimum.
    pub workspace_size: usize,
}

impl Default for DfaMatchOptions {
    fn default() -> Self {
        DfaMatchOptions {
            flags: MatchOptions::default(),
            shortest: false,
            restart: false,
            max_results: 10,
            workspace_size: DFA_DEFAULT_WORKSPACE,
        }
    }
}

bool_setters!(DfaMatchOptions, shortest, restart);

impl DfaMatchOptions {
    pub fn flags(mut self, flags: MatchOptions) -> Self {
        self.flags = flags;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    pub fn workspace_size(mut self, cells: usize) -> Self {
        self.workspace_size = cells;
        self
    }

    /// \return the workspace size clamped up to the minimum.
    pub fn effective_workspace(&self) -> usize {
        self.workspace_size.max(DFA_MIN_WORKSPACE)
    }
}
