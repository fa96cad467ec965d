#![allow(clippy::uninlined_format_args)]
#![allow(dead_code)]

use rematch::{CompileOptions, MatchOptions, MatchResult, MatchSettings, Regex};

/// Test that \p pattern fails to parse with default options.
pub fn test_parse_fails(pattern: &str) {
    let res = Regex::new(pattern);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Test that \p pattern fails to parse with flags.
pub fn test_parse_fails_flags(pattern: &str, flags: &str) {
    let res = Regex::with_options(pattern, flags);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Format a Match by inserting commas between all capture groups.
fn format_match(r: &rematch::Match, input: &str) -> String {
    let mut result = input[r.range()].to_string();
    for cg in r.captures.iter() {
        result.push(',');
        if let Some(cg) = cg {
            result.push_str(&input[cg.clone()])
        }
    }
    result
}

/// Match \p subject from \p start with default settings.
#[track_caller]
pub fn match_bytes(re: &Regex, subject: &[u8], start: usize, opts: MatchOptions) -> MatchResult {
    match re.match_at(subject, start, &opts, &MatchSettings::default(), None) {
        Ok(result) => result,
        Err(err) => panic!("Match failed with error: {}", err),
    }
}

pub trait StringTestHelpers {
    /// "Fluent" style helper for testing that a String is equal to a str.
    fn test_eq(&self, s: &str);
}

impl StringTestHelpers for String {
    fn test_eq(&self, rhs: &str) {
        assert_eq!(self.as_str(), rhs)
    }
}

pub trait VecTestHelpers {
    /// "Fluent" style helper for testing that a Vec<&str> is equal to a
    /// Vec<&str>.
    fn test_eq(&self, rhs: Vec<&str>);
}

impl VecTestHelpers for Vec<&str> {
    fn test_eq(&self, rhs: Vec<&str>) {
        assert_eq!(*self, rhs)
    }
}

/// A compiled regex which remembers a TestConfig.
#[derive(Debug, Clone)]
pub struct TestCompiledRegex {
    re: Regex,
    // The same pattern compiled in byte mode, if it compiles there.
    bytes_re: Option<Regex>,
    tc: TestConfig,
}

impl TestCompiledRegex {
    /// \return the regex used for \p input under this config.
    fn regex_for(&self, input: &str) -> &Regex {
        match &self.bytes_re {
            Some(re) if self.tc.use_bytes(input) => re,
            _ => &self.re,
        }
    }

    /// Search for self in \p input, returning a list of all matches.
    #[track_caller]
    pub fn matches(&'_ self, input: &'_ str, start: usize) -> Vec<rematch::Match> {
        let re = self.regex_for(input);
        match self.tc.driver {
            Driver::Iterator => re.find_from(input, start).collect(),
            Driver::Session => {
                // Only the first match; sessions have no global iteration.
                let mut session = re.session(&MatchSettings::default());
                let result = session
                    .match_at(input.as_bytes(), start, &MatchOptions::default(), None)
                    .expect("Session match failed");
                let found = result
                    .range(0)
                    .filter(|_| result.is_match())
                    .map(|_| re.find_at(input, start).expect("Session and iterator disagree"));
                session.release();
                found.into_iter().collect()
            }
        }
    }

    /// Search for self in \p input, returning the first Match, or None if
    /// none.
    pub fn find(&self, input: &str) -> Option<rematch::Match> {
        self.matches(input, 0).into_iter().next()
    }

    /// Match against a string, returning the first formatted match.
    #[track_caller]
    pub fn match1f(&self, input: &str) -> String {
        match self.find(input) {
            Some(m) => format_match(&m, input),
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the string of the named capture group given.
    pub fn match1_named_group(&self, input: &str, group: &str) -> String {
        match self.find(input) {
            Some(m) => match m.named_group(group) {
                Some(r) => match input.get(r.clone()) {
                    Some(str) => str.to_string(),
                    None => panic!("Cannot get range from string input {:?}", r),
                },
                None => panic!("Named capture group does not exist {}", group),
            },
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the match as a Vec containing None
    /// for unmatched groups, or the matched strings.
    pub fn match1_vec<'b>(&self, input: &'b str) -> Vec<Option<&'b str>> {
        let mut result = Vec::new();
        let m: rematch::Match = self.find(input).expect("Failed to match");
        result.push(Some(&input[m.range()]));
        for cr in m.captures {
            result.push(cr.map(|r| &input[r]));
        }
        result
    }

    /// Test that matching against \p input fails.
    #[track_caller]
    pub fn test_fails(&self, input: &str) {
        assert!(self.find(input).is_none(), "Should not have matched")
    }

    /// Test that matching against \p input succeeds.
    #[track_caller]
    pub fn test_succeeds(&self, input: &str) {
        assert!(self.find(input).is_some(), "Should have matched")
    }

    /// Return a list of all non-overlapping total match ranges from a given
    /// start.
    pub fn match_all_from(&'_ self, input: &'_ str, start: usize) -> Vec<rematch::Range> {
        self.matches(input, start)
            .into_iter()
            .map(move |m| m.range())
            .collect()
    }

    /// Return a list of all non-overlapping matches.
    pub fn match_all<'b>(&self, input: &'b str) -> Vec<&'b str> {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| &input[m.range()])
            .collect()
    }

    /// Collect all matches into a String, separated by commas.
    pub fn run_global_match(&self, input: &str) -> String {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| format_match(&m, input))
            .collect::<Vec<String>>()
            .join(",")
    }
}

/// How matches are driven.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Driver {
    // Regex::find_from, which finds every match.
    Iterator,
    // A MatchSession, which finds the first match only.
    Session,
}

/// Description of how to test a regex.
#[derive(Debug, Copy, Clone)]
pub struct TestConfig {
    // Whether to prefer byte mode if the input is ASCII.
    bytes: bool,

    // Whether to optimize.
    optimize: bool,

    driver: Driver,
}

impl TestConfig {
    /// Whether to use byte mode for this input.
    pub fn use_bytes(&self, s: &str) -> bool {
        self.bytes && s.is_ascii()
    }

    /// Whether only the first match is found.
    pub fn first_match_only(&self) -> bool {
        self.driver == Driver::Session
    }

    /// Compile a pattern to a regex, with default flags.
    pub fn compile(&self, pattern: &str) -> TestCompiledRegex {
        self.compilef(pattern, "")
    }

    /// \return compile options for \p flags_str under this config.
    pub fn options(&self, flags_str: &str) -> CompileOptions {
        CompileOptions::from(flags_str).no_optimize(!self.optimize)
    }

    /// Compile a pattern to a regex, with given flags.
    #[track_caller]
    pub fn compilef(&self, pattern: &str, flags_str: &str) -> TestCompiledRegex {
        let options = self.options(flags_str);
        let re = Regex::with_options(pattern, options.clone());
        assert!(
            re.is_ok(),
            "Failed to parse! flags: {} pattern: {}, error: {}",
            flags_str,
            pattern,
            re.unwrap_err()
        );
        let bytes_re = if self.bytes && options.utf {
            Regex::with_options(pattern, options.utf(false)).ok()
        } else {
            None
        };
        TestCompiledRegex {
            re: re.unwrap(),
            bytes_re,
            tc: *self,
        }
    }

    /// Test that \p pattern and \p flags successfully parses, and matches
    /// \p input.
    #[track_caller]
    pub fn test_match_succeeds(&self, pattern: &str, flags_str: &str, input: &str) {
        let cr = self.compilef(pattern, flags_str);
        cr.test_succeeds(input)
    }

    /// Test that \p pattern and \p flags successfully parses, and does not
    /// match \p input.
    #[track_caller]
    pub fn test_match_fails(&self, pattern: &str, flags_str: &str, input: &str) {
        let cr = self.compilef(pattern, flags_str);
        cr.test_fails(input)
    }
}

/// Invoke \p F with each test config, in turn.
pub fn test_with_configs<F>(func: F)
where
    F: Fn(TestConfig),
{
    // Note we wish to be able to determine the TestConfig from the line number.
    func(TestConfig {
        bytes: false,
        optimize: false,
        driver: Driver::Iterator,
    });
    func(TestConfig {
        bytes: true,
        optimize: false,
        driver: Driver::Iterator,
    });
    func(TestConfig {
        bytes: false,
        optimize: true,
        driver: Driver::Iterator,
    });
    func(TestConfig {
        bytes: true,
        optimize: true,
        driver: Driver::Iterator,
    });
}

/// Invoke `F` with each test config, including the session driver which only
/// reports first matches.
pub fn test_with_configs_first_match<F>(func: F)
where
    F: Fn(TestConfig),
{
    test_with_configs(&func);
    func(TestConfig {
        bytes: false,
        optimize: true,
        driver: Driver::Session,
    });
}

/// Invoke `F` with each test config.
/// Exclude byte mode tests.
pub fn test_with_configs_no_bytes<F>(func: F)
where
    F: Fn(TestConfig),
{
    func(TestConfig {
        bytes: false,
        optimize: false,
        driver: Driver::Iterator,
    });
    func(TestConfig {
        bytes: false,
        optimize: true,
        driver: Driver::Iterator,
    });
}
