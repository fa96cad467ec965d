/*!

# rematch - a backtracking regex engine with PCRE-style syntax

This crate provides a regular expression engine which targets Perl-compatible (PCRE2) regular expression syntax, over UTF-8 or byte subjects.

# Example: test if a string contains a match

```rust
use rematch::Regex;
let re = Regex::new(r"\d{4}").unwrap();
let matched = re.find("2020-20-05").is_some();
assert!(matched);
```

# Example: iterating over matches

Here we use a backreference to find doubled characters:

```rust
use rematch::Regex;
let re = Regex::new(r"(\w)\1").unwrap();
let text = "Frankly, Miss Piggy, I don't give a hoot!";
for m in re.find_iter(text) {
    println!("{}", &text[m.range()])
}
// Output: ss
// Output: gg
// Output: oo

```

# Example: using capture groups

Capture groups are available in the `Match` object produced by a successful match.
A capture group is a range of byte indexes into the original string.

```rust
use rematch::Regex;
let re = Regex::new(r"(?<year>\d{4})").unwrap();
let text = "Today is 2020-20-05";
let m = re.find(text).unwrap();
let group = m.named_group("year").unwrap();
println!("Year: {}", &text[group]);
// Output: Year: 2020
```

# Example: substitution

Replacements use `$n`, `${name}` and, with extended replacement, `\U`, `\L` and `${n:+set:unset}`.

```rust
use rematch::{Regex, SubstituteOptions};
let re = Regex::new(r"(\w+)@(\w+)").unwrap();
let out = re
    .substitute("mail root@host now", "$2!$1", &SubstituteOptions::default())
    .unwrap();
assert_eq!(out, b"mail host!root now");
```

# Matching with full control

[`Regex::match_at`] matches a byte subject from a start offset with per-call [`MatchOptions`] (anchoring, partial matching, empty-match rules) and resource limits in [`MatchSettings`]. Callouts written `(?C1)` or `(?C"text")` invoke a user function which may pass, fail the current path, or abort the match. A failed match reports the last `(*MARK)` name passed.

```rust
use rematch::{MatchOptions, MatchSettings, Regex};
let re = Regex::new(r"(\d+)-(\d+)").unwrap();
let result = re
    .match_at(b"12-34", 0, &MatchOptions::default(), &MatchSettings::default(), None)
    .unwrap();
assert_eq!(result.get(2), Some((3, 5)));
```

# All-matches scanning

[`Regex::dfa_match`] runs a breadth-first scan which reports every match that starts at the first matching position, longest first. It does not support backreferences, lookbehinds, atomic groups or possessive quantifiers; [`Regex::supports_dfa`] tells whether a pattern can be scanned.

# Architecture

rematch has a parser, intermediate representation, optimizer which acts on the IR, bytecode emitter, and a bytecode interpreter using "classical backtracking" with an explicit backtracking stack. The all-matches scanner is a separate NFA built from the unoptimized IR and simulated breadth-first.

# Crate features

- **logging** (default). Emits compile and substitution diagnostics through the `log` facade.
- **prohibit-unsafe**. Prohibits all uses of unsafe code.

*/

#![warn(clippy::all)]
#![allow(clippy::upper_case_acronyms, clippy::match_like_matches_macro)]
// Clippy's manual_range_contains suggestion produces worse codegen.
#![allow(clippy::manual_range_contains)]

pub use crate::api::*;
pub use crate::callout::{CalloutEvent, CalloutFn, CalloutResult, CalloutSite};
pub use crate::classicalbacktrack::BacktrackStack;
pub use crate::config::{config, ConfigKey, ConfigValue};
pub use crate::dfa::DfaWorkspace;
pub use crate::error::{
    error_message, CalloutError, CompileError, ErrorKind, MatchError, NO_MATCH_CODE, PARTIAL_CODE,
};
pub use crate::options::*;
pub use crate::session::MatchSession;
pub use crate::substitute::{
    SubstituteCalloutEvent, SubstituteCalloutFn, SubstituteCallouts, Substituter, Substitution,
};

#[macro_use]
mod util;

mod api;
mod bytesearch;
mod callout;
mod charclasses;
mod classicalbacktrack;
mod codepointset;
mod config;
mod cursor;
mod dfa;
mod emit;
mod error;
mod exec;
mod folds;
mod indexing;
mod insn;
mod ir;
mod matchers;
mod optimizer;
mod options;
mod parse;
mod replacement;
mod scm;
mod session;
mod startpredicate;
mod substitute;
mod types;
