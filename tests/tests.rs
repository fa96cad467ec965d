// Work around dead code warnings: rust-lang issue #46379
pub mod common;

// Work around dead code warnings: rust-lang issue #46379
use common::*;

use rematch::{
    config, CompileOptions, ConfigKey, ConfigValue, MatchError, MatchOptions, MatchSettings,
    MatchStatus, Newline, Regex,
};

fn test_zero_length_matches_tc(tc: TestConfig) {
    // After an empty match the same position is retried for a non-empty one.
    tc.compile(".*?").match_all("a").test_eq(vec!["", "a", ""]);
    tc.compile(".*?")
        .match_all("\u{0251}")
        .test_eq(vec!["", "\u{0251}", ""]);
    tc.compile("x*").match_all("axxb").test_eq(vec!["", "xx", "", ""]);
}

#[test]
fn test_zero_length_matches() {
    test_with_configs(test_zero_length_matches_tc)
}

fn non_matching_captures_tc(tc: TestConfig) {
    assert_eq!(
        tc.compile("aa(b)?aa").match1_vec("aaaa"),
        &[Some("aaaa"), None]
    );
    assert_eq!(
        tc.compile(r"(a)|(b)").match1_vec("b"),
        &[Some("b"), None, Some("b")]
    );
}

#[test]
fn non_matching_captures() {
    test_with_configs_first_match(non_matching_captures_tc)
}

fn test_multiline_tc(tc: TestConfig) {
    tc.compilef(r"^abc", "").match1f("abc").test_eq("abc");
    tc.compile(r"^def").test_fails("abc\ndef");
    tc.compilef(r"^def", "m").match1f("abc\ndef").test_eq("def");

    // With LF newlines a lone CR does not separate lines.
    tc.compilef(r"^def", "m").test_fails("abc\rdef");

    tc.compilef(r"^\d", "m")
        .match_all("aaa\n789\r\nccc\r\n345")
        .test_eq(vec!["7", "3"]);
    tc.compilef(r"\d$", "m")
        .match_all("aaa789\n789\r\nccc10\n345")
        .test_eq(vec!["9", "0", "5"]);
}

#[test]
fn test_multiline() {
    test_with_configs(test_multiline_tc)
}

fn test_dollar_tc(tc: TestConfig) {
    // $ matches before a final newline.
    tc.compile(r"a$").match1f("a\n").test_eq("a");
    tc.compilef(r"a$", "D").test_fails("a\n");
    tc.compile(r"a$").test_fails("a\nb");
    tc.compile(r"a\Z").match1f("a\n").test_eq("a");
    tc.compile(r"a\z").test_fails("a\n");
    tc.compile(r"\Aa").test_fails("ba");
}

#[test]
fn test_dollar() {
    test_with_configs_first_match(test_dollar_tc)
}

fn test_dotall_tc(tc: TestConfig) {
    tc.compile(r".").test_fails("\n");
    tc.compilef(r".", "s").match1f("\n").test_eq("\n");

    // Only LF is a newline by default.
    tc.compile(r".").match1f("\r").test_eq("\r");

    tc.compile("abc.def").test_fails("abc\ndef");
    tc.compilef("abc.def", "s")
        .match1f("abc\ndef")
        .test_eq("abc\ndef");

    tc.compile(".*").match1f("abc\ndef").test_eq("abc");
    tc.compilef(".*", "s")
        .match1f("abc\ndef")
        .test_eq("abc\ndef");
    tc.compile(r"\N+").match1f("ab\ncd").test_eq("ab");
}

#[test]
fn test_dotall() {
    test_with_configs_first_match(test_dotall_tc)
}

fn test_lookbehinds_tc(tc: TestConfig) {
    tc.compilef(r"(?<=efg)..", "")
        .match1f("abcdefghijk123456")
        .test_eq("hi");
    tc.compilef(r"(?<=\d{3}).*", "")
        .match1f("abcdefghijk123456")
        .test_eq("456");
    tc.test_match_succeeds(r"(?<=\d{3}.*)", "", "abcdefghijk123456");
    tc.compilef(r"(?<![a-z])..", "")
        .match1f("abcdefghijk123456")
        .test_eq("ab");
    tc.compilef(r"(?<![a-z])\d{2}", "")
        .match1f("abcdefghijk123456")
        .test_eq("23");
    tc.compilef(r"(?<=x{3,4})\d", "")
        .match1f("1yxx2xxx3xxxx4xxxxx5xxxxxx6xxxxxxx7xxxxxxxx8")
        .test_eq("3");
    tc.compilef(r"(?<=(?:xx){3})\d", "")
        .match1f("1yxx2xxx3xxxx4xxxxx5xxxxxx6xxxxxxx7xxxxxxxx8")
        .test_eq("6");
    tc.compilef(r"(?<!^ab)\d", "")
        .match1f("ab1ab2")
        .test_eq("2");

    tc.compilef(r"(?<=x)y", "")
        .match_all_from("xyxy", 1)
        .into_iter()
        .map(|r| format!("{}..{}", r.start, r.end))
        .collect::<Vec<_>>()
        .join(",")
        .test_eq("1..2,3..4");
}

#[test]
fn test_lookbehinds() {
    test_with_configs(test_lookbehinds_tc)
}

fn test_lookaheads_tc(tc: TestConfig) {
    tc.compile(r"\w+(?=,)").match1f("abc,def").test_eq("abc");
    tc.compile(r"\b\d+\b(?!px)").match1f("12px 34 em").test_eq("34");
    tc.compile(r"(?=(\w+))\w").match1f("hello").test_eq("h,hello");
    tc.compile(r"(?!a)\w").match1f("aab").test_eq("b");
}

#[test]
fn test_lookaheads() {
    test_with_configs_first_match(test_lookaheads_tc)
}

fn test_quantifiers_tc(tc: TestConfig) {
    tc.compile(r"a+?").match1f("aaa").test_eq("a");
    tc.compile(r"a{2,3}").match1f("aaaa").test_eq("aaa");
    tc.compile(r"a{2,3}?").match1f("aaaa").test_eq("aa");
    tc.compile(r"a{2}").test_fails("a");
    tc.compile(r"a{,2}b").match1f("aaab").test_eq("aab");
    tc.compile(r"x{}").match1f("x{}").test_eq("x{}");
    tc.compilef(r"a+", "U").match1f("aaa").test_eq("a");
    tc.compilef(r"a+?", "U").match1f("aaa").test_eq("aaa");
    tc.compile(r"(ab)*c").match1f("ababc").test_eq("ababc,ab");
    tc.compile(r"(a|bc)+d").match1f("abcad").test_eq("abcad,a");
}

#[test]
fn test_quantifiers() {
    test_with_configs_first_match(test_quantifiers_tc)
}

fn test_atomic_and_possessive_tc(tc: TestConfig) {
    tc.compile(r"a+a").match1f("aaa").test_eq("aaa");
    tc.compile(r"(?>a+)a").test_fails("aaa");
    tc.compile(r"a++a").test_fails("aaa");
    tc.compile(r"a*+b").match1f("aaab").test_eq("aaab");
    tc.compile(r"(?>ab|a)c").match1f("abc").test_eq("abc");
    tc.compile(r"(?>a|ab)c").test_fails("abc");
    tc.compile(r"(?>a|ab)c").match1f("ac").test_eq("ac");
    tc.compile(r"(?>(\d+))\d").test_fails("123");
}

#[test]
fn test_atomic_and_possessive() {
    test_with_configs_first_match(test_atomic_and_possessive_tc)
}

fn test_backrefs_tc(tc: TestConfig) {
    tc.compile(r"(\w+)\s+\1").match1f("hello hello world").test_eq("hello hello,hello");
    tc.compilef(r"(a)\1", "i").match1f("aA").test_eq("aA,a");
    tc.compile(r"(a)\1").test_fails("aA");
    tc.compile(r"(.)\g{-1}").match1f("xyyz").test_eq("yy,y");
    tc.compile(r"(?<q>['])\w+\k<q>").match1f("say 'hi'").test_eq("'hi','");
    tc.compile(r"(?P<q>.)(?P=q)").match1f("abccd").test_eq("cc,c");
    tc.compile(r"(?<x>a)\k{x}\g{x}").match1f("aaa").test_eq("aaa,a");
    // A reference to an unset group fails.
    tc.compile(r"(a)?\1b").test_fails("b");
}

#[test]
fn test_backrefs() {
    test_with_configs_first_match(test_backrefs_tc)
}

#[test]
fn test_unset_backref_option() {
    let opts = CompileOptions::default().match_unset_backref(true);
    let re = Regex::with_options(r"(a)?\1b", opts).unwrap();
    assert_eq!(re.find("b").map(|m| m.range()), Some(0..1));
    assert!(re.has_backrefs());
}

fn test_classes_tc(tc: TestConfig) {
    tc.compile(r"\d+").match1f("abc123def").test_eq("123");
    tc.compile(r"\D+").match1f("123abc").test_eq("abc");
    tc.compile(r"\s+").match1f("a \t\nb").test_eq(" \t\n");
    tc.compile(r"\h+").match1f("a \t\nb").test_eq(" \t");
    tc.compile(r"\v+").match1f("a \n\x0b\rb").test_eq("\n\x0b\r");
    tc.compile(r"[[:alpha:]]+").match1f("12abc3").test_eq("abc");
    tc.compile(r"[[:^digit:]]+").match1f("12ab3").test_eq("ab");
    tc.compile(r"[a-c\d]+").match1f("xx1b2dd").test_eq("1b2");
    tc.compile(r"[^a-c]+").match1f("abcxyzabc").test_eq("xyz");
    tc.compile(r"[]a]+").match1f("x]a]y").test_eq("]a]");
    tc.compile(r"[\]\\]+").match1f("a]\\b").test_eq("]\\");
    tc.compilef(r"[a-c]+", "i").match1f("xxABCxx").test_eq("ABC");
    tc.compile(r"\w+").match1f("  foo_bar9 ").test_eq("foo_bar9");
}

#[test]
fn test_classes() {
    test_with_configs_first_match(test_classes_tc)
}

fn test_line_breaks_tc(tc: TestConfig) {
    tc.compile(r"a\Rb").match1f("a\r\nb").test_eq("a\r\nb");
    tc.compile(r"a\Rb").match1f("a\rb").test_eq("a\rb");
    tc.compile(r"a\R{2}b").match1f("a\n\nb").test_eq("a\n\nb");
    // CR LF is one unit which backtracking does not split.
    tc.compile(r"a\R\nb").test_fails("a\r\nb");
}

#[test]
fn test_line_breaks() {
    test_with_configs_first_match(test_line_breaks_tc)
}

fn test_escapes_tc(tc: TestConfig) {
    tc.compile(r"\x41\x{42}\103").match1f("ABC").test_eq("ABC");
    tc.compile(r"\o{101}").match1f("A").test_eq("A");
    tc.compile(r"\cA").match1f("\x01").test_eq("\x01");
    tc.compile(r"a\tb").match1f("a\tb").test_eq("a\tb");
    tc.compile(r"\Qa.b\E+").match1f("a.bbb").test_eq("a.bbb");
    tc.compile(r"\Qa.b").test_fails("axb");
    tc.compile(r"\$\(").match1f("$(").test_eq("$(");
}

#[test]
fn test_escapes() {
    test_with_configs_first_match(test_escapes_tc)
}

fn test_inline_options_tc(tc: TestConfig) {
    tc.compile(r"a(?i:b)c").match1f("aBc").test_eq("aBc");
    tc.compile(r"a(?i:b)c").test_fails("aBC");
    tc.compile(r"(?i)abc").match1f("ABC").test_eq("ABC");
    tc.compile(r"a(?i)b|c").match1f("C").test_eq("C");
    tc.compilef(r"a(?-i)b", "i").match1f("Ab").test_eq("Ab");
    tc.compilef(r"a(?-i)b", "i").test_fails("AB");
    tc.compile(r"(?x) a b c # comment").match1f("abc").test_eq("abc");
    tc.compile(r"(?s).").match1f("\n").test_eq("\n");
    tc.compile(r"(?m)^b").match1f("a\nb").test_eq("b");
    tc.compile(r"(?n)(a)(?<x>b)").match1f("ab").test_eq("ab,b");
    tc.compile(r"a(?#comment)b").match1f("ab").test_eq("ab");
}

#[test]
fn test_inline_options() {
    test_with_configs_first_match(test_inline_options_tc)
}

fn test_word_boundaries_tc(tc: TestConfig) {
    tc.compile(r"\bfoo\b").match_all("foo food foo").test_eq(vec!["foo", "foo"]);
    tc.compile(r"\Boo\B").match1f("foods").test_eq("oo");
    tc.compile(r"\b").match_all("ab cd").test_eq(vec!["", "", "", ""]);
}

#[test]
fn test_word_boundaries() {
    test_with_configs(test_word_boundaries_tc)
}

fn test_search_start_anchor_tc(tc: TestConfig) {
    tc.compile(r"\Gab").match_all("ababxab").test_eq(vec!["ab", "ab"]);
}

#[test]
fn test_search_start_anchor() {
    test_with_configs(test_search_start_anchor_tc)
}

fn test_named_groups_tc(tc: TestConfig) {
    let re = tc.compile(r"(?<first>\w+)\s+(?<second>\w+)");
    re.match1_named_group("hello world", "first").test_eq("hello");
    re.match1_named_group("hello world", "second").test_eq("world");
    let m = re.find("hello world").unwrap();
    let names: Vec<(&str, Option<rematch::Range>)> = m.named_groups().collect();
    assert_eq!(names, vec![("first", Some(0..5)), ("second", Some(6..11))]);
    assert_eq!(m.named_group(""), None);
    assert_eq!(m.named_group("third"), None);
}

#[test]
fn test_named_groups() {
    test_with_configs_first_match(test_named_groups_tc)
}

#[test]
fn test_duplicate_names() {
    let re = Regex::new(r"(?J)(?<n>a)|(?<n>b)").unwrap();
    assert_eq!(re.group_indexes("n"), Some(&[1, 2][..]));
    assert_eq!(re.group_names(), vec![("n", 1), ("n", 2)]);
    let m = re.find("b").unwrap();
    assert_eq!(m.named_group("n"), Some(0..1));

    let opts = CompileOptions::default().dup_names(true);
    let re = Regex::with_options(r"(?<n>a)(?<m>b)(?<n>c)", opts).unwrap();
    assert_eq!(re.group_indexes("n"), Some(&[1, 3][..]));
    assert_eq!(re.group_indexes("m"), Some(&[2][..]));
    assert_eq!(re.group_indexes("z"), None);
}

#[test]
fn test_captures_with_offsets() {
    let re = Regex::new(r"(\d+)-(\d+)").unwrap();
    let result = match_bytes(&re, b"12-34", 0, MatchOptions::default());
    assert_eq!(result.status(), MatchStatus::Match);
    assert_eq!(
        result.offsets(),
        &[Some((0, 5)), Some((0, 2)), Some((3, 5))]
    );
    assert_eq!(result.count(), 3);
    assert_eq!(result.group(b"12-34", 2), Some(&b"34"[..]));

    let re = Regex::new(r"(a)|(b)(c)?").unwrap();
    let result = match_bytes(&re, b"b", 0, MatchOptions::default());
    assert_eq!(result.raw_offsets(), vec![(0, 1), (-1, -1), (0, 1), (-1, -1)]);
    // One past the highest set slot.
    assert_eq!(result.count(), 3);
}

#[test]
fn test_no_match() {
    let re = Regex::new(r"a+").unwrap();
    let result = match_bytes(&re, b"bbb", 0, MatchOptions::default());
    assert_eq!(result.status(), MatchStatus::NoMatch);
    assert!(!result.is_match());
    assert_eq!(result.get(0), None);
    assert_eq!(result.count(), 0);
    assert!(!re.is_match("bbb"));
    assert!(re.is_match("bab"));
}

#[test]
fn test_match_options() {
    let opts = MatchOptions::default;

    let re = Regex::new(r"a*").unwrap();
    let result = match_bytes(&re, b"bbb", 0, opts().not_empty(true));
    assert_eq!(result.status(), MatchStatus::NoMatch);
    let result = match_bytes(&re, b"baa", 0, opts().not_empty_at_start(true));
    assert_eq!(result.get(0), Some((1, 3)));
    let result = match_bytes(&re, b"bbb", 0, opts());
    assert_eq!(result.get(0), Some((0, 0)));

    let re = Regex::new(r"b").unwrap();
    assert!(!match_bytes(&re, b"ab", 0, opts().anchored(true)).is_match());
    assert_eq!(match_bytes(&re, b"ab", 1, opts().anchored(true)).get(0), Some((1, 2)));

    let re = Regex::new(r"a+").unwrap();
    assert!(!match_bytes(&re, b"aab", 0, opts().end_anchored(true)).is_match());
    assert_eq!(match_bytes(&re, b"baa", 0, opts().end_anchored(true)).get(0), Some((1, 3)));

    let re = Regex::new(r"^a").unwrap();
    assert!(!match_bytes(&re, b"a", 0, opts().not_bol(true)).is_match());
    let re = Regex::new(r"a$").unwrap();
    assert!(!match_bytes(&re, b"a", 0, opts().not_eol(true)).is_match());
}

#[test]
fn test_start_offsets() {
    let re = Regex::new(r"\d").unwrap();
    assert_eq!(match_bytes(&re, b"1a2", 1, MatchOptions::default()).get(0), Some((2, 3)));
    assert_eq!(re.find_at("1a2", 1).map(|m| m.range()), Some(2..3));

    let err = re
        .match_at(b"abc", 4, &MatchOptions::default(), &MatchSettings::default(), None)
        .unwrap_err();
    assert!(matches!(err, MatchError::BadOffset));

    // Not on a character boundary.
    let err = re
        .match_at("é1".as_bytes(), 1, &MatchOptions::default(), &MatchSettings::default(), None)
        .unwrap_err();
    assert!(matches!(err, MatchError::BadOffset));

    // The end of the subject is a valid start.
    let re = Regex::new(r"$").unwrap();
    assert_eq!(match_bytes(&re, b"abc", 3, MatchOptions::default()).get(0), Some((3, 3)));
}

#[test]
fn test_invalid_utf() {
    let re = Regex::new(r"c").unwrap();
    let err = re
        .match_at(b"ab\xffcd", 0, &MatchOptions::default(), &MatchSettings::default(), None)
        .unwrap_err();
    assert!(matches!(err, MatchError::BadUtf { offset: 2 }));
    assert_eq!(err.code(), -3);

    // Validation starts at the start offset.
    let result = match_bytes(&re, b"\xffabcd", 1, MatchOptions::default());
    assert_eq!(result.get(0), Some((3, 4)));

    // Byte mode never validates.
    let re = Regex::with_options(r"c", "b").unwrap();
    assert_eq!(match_bytes(&re, b"ab\xffcd", 0, MatchOptions::default()).get(0), Some((3, 4)));
}

#[test]
fn test_byte_mode() {
    let utf = Regex::new(r"^.$").unwrap();
    let bytes = Regex::with_options(r"^.$", "b").unwrap();
    assert!(utf.is_match("é"));
    assert!(!bytes.is_match("é"));
    let bytes2 = Regex::with_options(r"^..$", "b").unwrap();
    assert!(bytes2.is_match("é"));
    let bytes = Regex::with_options(r"\xe9", "b").unwrap();
    assert_eq!(match_bytes(&bytes, b"a\xe9", 0, MatchOptions::default()).get(0), Some((1, 2)));
}

#[test]
fn test_partial_matching() {
    let soft = MatchOptions::default().partial_soft(true);
    let hard = MatchOptions::default().partial_hard(true);

    let re = Regex::new(r"abc").unwrap();
    let result = match_bytes(&re, b"xab", 0, soft);
    assert_eq!(result.status(), MatchStatus::Partial);
    assert_eq!(result.get(0), Some((1, 3)));
    assert!(result.is_partial());
    assert!(!match_bytes(&re, b"xyz", 0, soft).is_partial());

    // Soft partial matching prefers a complete match; hard does not.
    let re = Regex::new(r"dog(sbody)?").unwrap();
    let result = match_bytes(&re, b"dogsb", 0, soft);
    assert_eq!(result.status(), MatchStatus::Match);
    assert_eq!(result.get(0), Some((0, 3)));
    let result = match_bytes(&re, b"dogsb", 0, hard);
    assert_eq!(result.status(), MatchStatus::Partial);
    assert_eq!(result.get(0), Some((0, 5)));

    // The scan start accounts for lookbehind.
    let re = Regex::new(r"(?<=ab)cd").unwrap();
    let result = match_bytes(&re, b"xabc", 0, soft);
    assert_eq!(result.status(), MatchStatus::Partial);
    assert_eq!(result.get(0), Some((3, 4)));
    assert_eq!(result.scan_start(), Some(1));
}

#[test]
fn test_limits() {
    let re = Regex::new(r"(a+)+b").unwrap();
    let subject = "a".repeat(24);
    let settings = MatchSettings::default().match_limit(1000);
    let err = re
        .match_at(subject.as_bytes(), 0, &MatchOptions::default(), &settings, None)
        .unwrap_err();
    assert!(matches!(err, MatchError::MatchLimit));
    assert_eq!(err.code(), -47);

    // A limit in the pattern lowers the caller's limit.
    let re = Regex::new(r"(*LIMIT_MATCH=1000)(a+)+b").unwrap();
    let err = re
        .match_at(subject.as_bytes(), 0, &MatchOptions::default(), &MatchSettings::default(), None)
        .unwrap_err();
    assert!(matches!(err, MatchError::MatchLimit));

    let re = Regex::new(r"(a|b)*c").unwrap();
    let settings = MatchSettings::default().depth_limit(5);
    let err = re
        .match_at(b"ababababababxc", 0, &MatchOptions::default(), &settings, None)
        .unwrap_err();
    assert!(matches!(err, MatchError::DepthLimit));

    let settings = MatchSettings::default().heap_limit(0);
    let err = re
        .match_at(b"abc", 0, &MatchOptions::default(), &settings, None)
        .unwrap_err();
    assert!(matches!(err, MatchError::HeapLimit));
}

#[test]
fn test_offset_limit_and_firstline() {
    let re = Regex::new(r"b").unwrap();
    let settings = MatchSettings::default().offset_limit(2);
    let result = re
        .match_at(b"aaab", 0, &MatchOptions::default(), &settings, None)
        .unwrap();
    assert!(!result.is_match());
    let settings = MatchSettings::default().offset_limit(3);
    let result = re
        .match_at(b"aaab", 0, &MatchOptions::default(), &settings, None)
        .unwrap();
    assert_eq!(result.get(0), Some((3, 4)));

    let re = Regex::with_options(r"b", CompileOptions::default().firstline(true)).unwrap();
    assert!(!re.is_match("a\nb"));
    assert!(re.is_match("ab\n"));
}

#[test]
fn test_marks_and_commit() {
    let re = Regex::new(r"(*MARK:A)x|(*MARK:B)y").unwrap();
    let result = match_bytes(&re, b"y", 0, MatchOptions::default());
    assert_eq!(result.mark(), Some("B"));
    assert_eq!(re.find("zy").and_then(|m| m.mark().map(str::to_string)), Some("B".to_string()));

    // A failed match still reports the last mark passed.
    let re = Regex::new(r"(*:first)ab").unwrap();
    let result = match_bytes(&re, b"ac", 0, MatchOptions::default());
    assert!(!result.is_match());
    assert_eq!(result.mark(), Some("first"));

    // Backtracking past (*COMMIT) fails the whole match.
    let re = Regex::new(r"a+(*COMMIT)b").unwrap();
    assert!(!match_bytes(&re, b"aaac aab", 0, MatchOptions::default()).is_match());
    let re = Regex::new(r"a+b").unwrap();
    assert!(match_bytes(&re, b"aaac aab", 0, MatchOptions::default()).is_match());
}

#[test]
fn test_newline_conventions() {
    let crlf = CompileOptions::default().newline(Newline::CrLf).multiline(true);
    let re = Regex::with_options(r"^b", crlf.clone()).unwrap();
    assert!(re.is_match("a\r\nb"));
    assert!(!re.is_match("a\nb"));
    let re = Regex::with_options(r"a$", crlf).unwrap();
    assert!(re.is_match("a\r\nb"));

    let any = CompileOptions::default().newline(Newline::AnyCrLf);
    let re = Regex::with_options(r".+", any).unwrap();
    assert_eq!(re.find("ab\rcd").map(|m| m.range()), Some(0..2));

    let re = Regex::new(r"(*CR)a.b").unwrap();
    assert_eq!(re.newline(), Newline::Cr);
    assert!(!re.is_match("a\rb"));
    assert!(re.is_match("a\nb"));

    // Empty matches step over CR LF as one character.
    let re = Regex::with_options(r"", CompileOptions::default().newline(Newline::CrLf)).unwrap();
    let starts: Vec<usize> = re.find_iter("\r\n").map(|m| m.start()).collect();
    assert_eq!(starts, vec![0, 2]);
}

#[test]
fn test_extra_options() {
    let mut opts = CompileOptions::default();
    opts.extra.match_word = true;
    let re = Regex::with_options(r"cat", opts).unwrap();
    assert!(!re.is_match("concatenate"));
    assert!(re.is_match("a cat!"));

    let mut opts = CompileOptions::default();
    opts.extra.match_line = true;
    let re = Regex::with_options(r"b|c", opts).unwrap();
    assert!(!re.is_match("abc"));
    assert!(re.is_match("c"));
}

#[test]
fn test_pattern_info() {
    let re = Regex::new(r"(?<=abc)(x)(?<n>y)?z{2}").unwrap();
    assert_eq!(re.capture_count(), 2);
    assert_eq!(re.max_lookbehind(), Some(3));
    assert_eq!(re.min_length(), 3);
    assert!(!re.has_backrefs());
    assert!(!re.supports_dfa());
    assert_eq!(re.dfa_unsupported_reason(), Some("lookbehind"));
    assert_eq!(re.group_names(), vec![("n", 2)]);
    assert!(re.callouts().is_empty());
    assert!(!re.options().caseless);

    let re = Regex::with_options(r"a|b", "i").unwrap();
    assert!(re.options().caseless);
    assert!(re.supports_dfa());
    assert_eq!(re.max_lookbehind(), Some(0));
    assert_eq!(re.min_length(), 1);

    let re: Regex = r"(a)\1".parse().unwrap();
    assert!(re.has_backrefs());
    assert_eq!(re.dfa_unsupported_reason(), Some("backreference"));
}

#[test]
fn test_config() {
    assert_eq!(config(ConfigKey::Unicode), ConfigValue::Bool(true));
    assert_eq!(config(ConfigKey::Version), ConfigValue::Text(env!("CARGO_PKG_VERSION")));
    assert_eq!(config(ConfigKey::MatchLimit), ConfigValue::Number(10_000_000));
    assert_eq!(config(ConfigKey::ParensLimit), ConfigValue::Number(250));
    assert_eq!(config(ConfigKey::Newline), ConfigValue::Newline(Newline::Lf));
    assert_eq!(config(ConfigKey::Jit), ConfigValue::Bool(false));
}

#[test]
fn test_repeated_matches_are_deterministic() {
    let patterns = [r"(\w+)@(\w+)", r"(a|ab)(c|bcd)(d*)", r"((a)|b)+", r"(?i)(x+)(y)?"];
    let subjects = ["me@host you@there", "abcd", "abab", "XXyxx"];
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        for subject in subjects {
            let first = match_bytes(&re, subject.as_bytes(), 0, MatchOptions::default());
            let second = match_bytes(&re, subject.as_bytes(), 0, MatchOptions::default());
            assert_eq!(first, second, "{} on {}", pattern, subject);
            for (start, end) in first.offsets().iter().flatten() {
                assert!(start <= end && *end <= subject.len());
            }
        }
    }
}

#[test]
fn test_case_insensitive_unicode() {
    let re = Regex::with_options("\u{00E9}t\u{00E9}", "i").unwrap();
    assert!(re.is_match("\u{00C9}T\u{00C9}"));
    let re = Regex::with_options("[\u{0430}-\u{044F}]+", "i").unwrap();
    assert_eq!(re.find("xx\u{0416}\u{0436}xx").map(|m| m.range()), Some(2..6));
}

#[test]
fn test_match_with_stack_reuse() {
    let re = Regex::new(r"(\d+)").unwrap();
    let mut stack = rematch::BacktrackStack::with_capacity(16);
    for (subject, expected) in [("a1", Some((1, 2))), ("bb", None), ("333", Some((0, 3)))] {
        let result = re
            .match_with_stack(
                subject.as_bytes(),
                0,
                &MatchOptions::default(),
                &MatchSettings::default(),
                None,
                &mut stack,
            )
            .unwrap();
        assert_eq!(result.get(0), expected);
    }
}
