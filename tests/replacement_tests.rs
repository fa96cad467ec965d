use rematch::{MatchError, Regex};

#[test]
fn test_replace_basic() {
    let re = Regex::new(r"world").unwrap();
    let result = re.replace("hello world", "universe").unwrap();
    assert_eq!(result, "hello universe");
}

#[test]
fn test_replace_no_match() {
    let re = Regex::new(r"xyz").unwrap();
    let result = re.replace("hello world", "universe").unwrap();
    assert_eq!(result, "hello world");
}

#[test]
fn test_replace_with_capture_groups() {
    let re = Regex::new(r"(\w+)\s+(\w+)").unwrap();
    let result = re.replace("hello world", "$2 $1").unwrap();
    assert_eq!(result, "world hello");
}

#[test]
fn test_replace_with_group_zero() {
    let re = Regex::new(r"\d+").unwrap();
    let result = re.replace("Price: $123", "[$0]").unwrap();
    assert_eq!(result, "Price: $[123]");
}

#[test]
fn test_replace_with_literal_dollar() {
    let re = Regex::new(r"\d+").unwrap();
    let result = re.replace("Price: 123", "$$0").unwrap();
    assert_eq!(result, "Price: $0");
}

#[test]
fn test_replace_date_format() {
    let re = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();
    let result = re.replace("2023-12-25", "$2/$3/$1").unwrap();
    assert_eq!(result, "12/25/2023");
}

#[test]
fn test_replace_all_basic() {
    let re = Regex::new(r"\d+").unwrap();
    let result = re.replace_all("a1b2c3", "X").unwrap();
    assert_eq!(result, "aXbXcX");
}

#[test]
fn test_replace_all_with_groups() {
    let re = Regex::new(r"(\w+)\s+(\w+)").unwrap();
    let result = re.replace_all("hello world foo bar", "$2-$1").unwrap();
    assert_eq!(result, "world-hello bar-foo");
}

#[test]
fn test_replace_all_word_boundaries() {
    let re = Regex::new(r"\b(\w)(\w+)").unwrap();
    let result = re.replace_all("hello world", "$1.$2").unwrap();
    assert_eq!(result, "h.ello w.orld");
}

#[test]
fn test_replace_with_closure() {
    let re = Regex::new(r"\d+").unwrap();
    let text = "Price: $123, $7";
    let result = re.replace_with(text, |m| {
        let num: i32 = text[m.range()].parse().unwrap();
        format!("{}", num * 2)
    })
    .unwrap();
    assert_eq!(result, "Price: $246, $14");
}

#[test]
fn test_replace_named_groups() {
    let re = Regex::new(r"(?<first>\w+)\s+(?<second>\w+)").unwrap();
    let result = re.replace("hello world", "${second} ${first}").unwrap();
    assert_eq!(result, "world hello");
}

#[test]
fn test_replace_named_groups_malformed() {
    let re = Regex::new(r"(?<first>\w+)").unwrap();
    let err = re.replace("hello", "${first").unwrap_err();
    assert!(matches!(err, MatchError::BadReplacement { offset: 7 }));
}

#[test]
fn test_replace_nonexistent_group() {
    let re = Regex::new(r"(\w+)").unwrap();
    let err = re.replace("hello", "$1 $2").unwrap_err();
    assert!(matches!(err, MatchError::UnknownGroup));
    let err = re.replace("hello", "$999").unwrap_err();
    assert!(matches!(err, MatchError::UnknownGroup));
}

#[test]
fn test_replace_unset_group() {
    let re = Regex::new(r"(a)|(b)").unwrap();
    let err = re.replace("b", "[$1]").unwrap_err();
    assert!(matches!(err, MatchError::UnsetGroup));
    assert_eq!(re.replace("b", "[$2]").unwrap(), "[b]");
}

#[test]
fn test_replace_high_group_numbers() {
    let re = Regex::new(r"(\w)(\w)(\w)").unwrap();
    let result = re.replace("abc", "$3$2$1$0").unwrap();
    assert_eq!(result, "cbaabc");
}

#[test]
fn test_replace_dollar_at_end() {
    let re = Regex::new(r"\w+").unwrap();
    let err = re.replace("hello", "test$").unwrap_err();
    assert!(matches!(err, MatchError::BadReplacement { offset: 4 }));
}

#[test]
fn test_replace_email() {
    let re = Regex::new(r"(\w+)@(\w+)\.(\w+)").unwrap();
    let result = re
        .replace("Contact: user@example.com", "$1 at $2 dot $3")
        .unwrap();
    assert_eq!(result, "Contact: user at example dot com");
}

#[test]
fn test_replace_backreferences() {
    let re = Regex::new(r"(\w+)\s+\1").unwrap();
    let result = re.replace("hello hello world", "[$1]").unwrap();
    assert_eq!(result, "[hello] world");
}

#[test]
fn test_replace_case_insensitive() {
    let re = Regex::with_options(r"(h\w+)", "i").unwrap();
    let result = re.replace("Hello WORLD", "[$1]").unwrap();
    assert_eq!(result, "[Hello] WORLD");
}

#[test]
fn test_replace_empty_match() {
    let re = Regex::new(r"(?=\d)").unwrap();
    assert_eq!(re.replace("a1b2c", "X").unwrap(), "aX1b2c");
    assert_eq!(re.replace_all("a1b2c", "X").unwrap(), "aX1bX2c");
}

#[test]
fn test_complex_replacement() {
    let re = Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap();
    let result = re
        .replace_all("Born on 12/25/1990 and graduated on 5/15/2012", "$3-$1-$2")
        .unwrap();
    assert_eq!(result, "Born on 1990-12-25 and graduated on 2012-5-15");
}

#[test]
fn test_replace_mark() {
    let re = Regex::new(r"(*:up)a|(*:down)b").unwrap();
    assert_eq!(re.replace_all("ab", "<${*MARK}>").unwrap(), "<up><down>");
}

#[test]
fn test_split() {
    let re = Regex::new(r",\s*").unwrap();
    let split = |text, limit| re.split(text, limit).unwrap();
    assert_eq!(split("a, b,c", None), vec!["a", "b", "c"]);
    assert_eq!(split("a, b,c", Some(2)), vec!["a", "b,c"]);
    assert_eq!(split("a, b,c", Some(0)), Vec::<&str>::new());
    assert_eq!(split("abc", None), vec!["abc"]);
    assert_eq!(split("a,", None), vec!["a", ""]);
}

#[test]
fn test_split_with_groups() {
    let re = Regex::new(r"(-)|(\+)").unwrap();
    assert_eq!(
        re.split_with_groups("1-2+3", None).unwrap(),
        vec!["1", "-", "2", "+", "3"]
    );
    // Group values do not count towards the limit.
    assert_eq!(re.split_with_groups("1-2+3", Some(2)).unwrap(), vec!["1", "-", "2+3"]);
    let re = Regex::new(r",").unwrap();
    assert_eq!(re.split_with_groups("a,b", None).unwrap(), vec!["a", "b"]);
}

#[test]
fn test_replacen_with() {
    let re = Regex::new(r"\d").unwrap();
    let text = "1 2 3 4";
    let bracket = |m: &rematch::Match| format!("[{}]", &text[m.range()]);
    assert_eq!(re.replacen_with(text, Some(2), 0, bracket).unwrap(), "[1] [2] 3 4");
    assert_eq!(re.replacen_with(text, Some(2), 3, bracket).unwrap(), "1 [2] [3] 4");
    assert_eq!(re.replacen_with(text, None, 4, bracket).unwrap(), "1 2 [3] [4]");
    assert_eq!(re.replacen_with(text, Some(0), 0, bracket).unwrap(), text);
    assert!(matches!(
        re.replacen_with(text, None, 99, bracket),
        Err(MatchError::BadOffset)
    ));
}

#[test]
fn test_conveniences_report_match_errors() {
    let re = Regex::new(r"(a+)+b").unwrap();
    let text = format!("{}c", "a".repeat(30));
    assert!(matches!(re.try_is_match(&text), Err(MatchError::MatchLimit)));
    assert!(matches!(re.try_find(&text), Err(MatchError::MatchLimit)));
    assert!(matches!(re.split(&text, None), Err(MatchError::MatchLimit)));
    assert!(matches!(
        re.replace_with(&text, |_| String::new()),
        Err(MatchError::MatchLimit)
    ));

    let mut results = re.try_find_iter(&text);
    assert!(matches!(results.next(), Some(Err(MatchError::MatchLimit))));
    assert!(results.next().is_none());

    // The infallible iterator stops, keeping the error.
    let mut matches = re.find_iter(&text);
    assert!(matches.next().is_none());
    assert!(matches!(matches.error(), Some(MatchError::MatchLimit)));
    assert!(!re.is_match(&text));

    // Matches found before the error are still yielded.
    let text = format!("ab ab {}c", "a".repeat(30));
    let found: Vec<_> = re.try_find_iter(&text).collect();
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].as_ref().map(|m| m.range()).ok(), Some(0..2));
    assert!(matches!(found[2], Err(MatchError::MatchLimit)));
}
