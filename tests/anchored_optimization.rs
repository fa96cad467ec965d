use rematch::{MatchOptions, MatchSettings, Regex};

#[test]
fn test_anchored_optimization() {
    let re = Regex::new(r"^abc").unwrap();
    assert!(re.find("abc").is_some());
    assert!(re.find("abcdef").is_some());
    assert!(re.find("xabc").is_none());

    let re = Regex::new(r"^hello\s+world").unwrap();
    assert!(re.find("hello world").is_some());
    assert!(re.find("hello   world").is_some());
    assert!(re.find("  hello world").is_none());

    let re = Regex::new(r"^(\w+)=(\d+)").unwrap();
    let text = "key=123 other=456";
    let m = re.find(text).unwrap();
    assert_eq!(m.group(1).map(|r| &text[r]), Some("key"));
    assert_eq!(m.group(2).map(|r| &text[r]), Some("123"));
    assert!(re.find(" key=123").is_none());
}

#[test]
fn test_anchored_from_offset() {
    // \A and ^ only match at the subject start, whatever the start offset.
    let re = Regex::new(r"\Aabc").unwrap();
    assert!(re.find_at("xxabc", 2).is_none());
    let re = Regex::new(r"^abc").unwrap();
    assert!(re.find_at("xxabc", 2).is_none());

    // The anchored option pins the match to the start offset instead.
    let re = Regex::new(r"abc").unwrap();
    let opts = MatchOptions::default().anchored(true);
    let result = re
        .match_at(b"xxabc", 2, &opts, &MatchSettings::default(), None)
        .unwrap();
    assert_eq!(result.get(0), Some((2, 5)));
    let result = re
        .match_at(b"xxabc", 1, &opts, &MatchSettings::default(), None)
        .unwrap();
    assert!(!result.is_match());
}

#[test]
fn test_multiline_anchor_is_not_pinned() {
    let re = Regex::with_options(r"^abc", "m").unwrap();
    assert_eq!(re.find("x\nabc").map(|m| m.range()), Some(2..5));
    let re = Regex::with_options(r"(?m)^abc|^def", "").unwrap();
    assert_eq!(re.find("x\ndef").map(|m| m.range()), Some(2..5));
}
