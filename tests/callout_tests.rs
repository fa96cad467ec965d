use rematch::{
    CalloutError, CalloutEvent, CalloutFn, CalloutResult, CompileOptions, DfaMatchOptions,
    MatchError, MatchOptions, MatchResult, MatchSettings, Regex,
};
use std::fmt;

fn run(re: &Regex, subject: &[u8], callout: &mut CalloutFn<'_>) -> Result<MatchResult, MatchError> {
    re.match_at(
        subject,
        0,
        &MatchOptions::default(),
        &MatchSettings::default(),
        Some(callout),
    )
}

/// What a callout saw, copied out of the event.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Seen {
    number: u8,
    string: Option<String>,
    start_match: usize,
    current_position: usize,
    capture_top: usize,
    capture_last: usize,
    pattern_position: usize,
    next_item_length: usize,
    mark: Option<String>,
    group1: Option<Vec<u8>>,
}

impl Seen {
    fn of(e: &CalloutEvent<'_>) -> Seen {
        Seen {
            number: e.number,
            string: e.string.map(str::to_string),
            start_match: e.start_match,
            current_position: e.current_position,
            capture_top: e.capture_top,
            capture_last: e.capture_last,
            pattern_position: e.pattern_position,
            next_item_length: e.next_item_length,
            mark: e.mark.map(str::to_string),
            group1: e.group(1).map(<[u8]>::to_vec),
        }
    }
}

#[test]
fn test_event_fields() {
    let re = Regex::new(r"(a)(?C7)b").unwrap();
    let mut seen = Vec::new();
    let result = run(&re, b"zab", &mut |e: &CalloutEvent<'_>| {
        seen.push(Seen::of(e));
        Ok(CalloutResult::Pass)
    })
    .unwrap();
    assert_eq!(result.get(0), Some((1, 3)));
    assert_eq!(
        seen.last(),
        Some(&Seen {
            number: 7,
            string: None,
            start_match: 1,
            current_position: 2,
            capture_top: 2,
            capture_last: 1,
            pattern_position: 8,
            next_item_length: 1,
            mark: None,
            group1: Some(b"a".to_vec()),
        })
    );
}

#[test]
fn test_string_callouts_and_marks() {
    let re = Regex::new(r#"(*:here)a(?C"it's ""quoted""")b"#).unwrap();
    let sites = re.callouts();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].number, 0);
    assert_eq!(sites[0].string.as_deref(), Some(r#"it's "quoted""#));

    let mut seen = Vec::new();
    run(&re, b"ab", &mut |e: &CalloutEvent<'_>| {
        seen.push(Seen::of(e));
        Ok(CalloutResult::Pass)
    })
    .unwrap();
    let last = seen.last().unwrap();
    assert_eq!(last.string.as_deref(), Some(r#"it's "quoted""#));
    assert_eq!(last.mark.as_deref(), Some("here"));
    assert_eq!(last.current_position, 1);
}

#[test]
fn test_fail_forces_backtracking() {
    let re = Regex::new(r"(?C1)\w").unwrap();
    let result = run(&re, b"abc", &mut |e: &CalloutEvent<'_>| {
        Ok(if e.current_position == 2 {
            CalloutResult::Pass
        } else {
            CalloutResult::Fail
        })
    })
    .unwrap();
    assert_eq!(result.get(0), Some((2, 3)));

    // Failing every time is no match rather than an error.
    let result = run(&re, b"abc", &mut |_: &CalloutEvent<'_>| Ok(CalloutResult::Fail)).unwrap();
    assert!(!result.is_match());

    // A failure inside a loop gives back one iteration.
    let re = Regex::new(r"a+(?C1)").unwrap();
    let result = run(&re, b"aaaa", &mut |e: &CalloutEvent<'_>| {
        Ok(if e.current_position > 2 {
            CalloutResult::Fail
        } else {
            CalloutResult::Pass
        })
    })
    .unwrap();
    assert_eq!(result.get(0), Some((0, 2)));
}

#[test]
fn test_abort() {
    let re = Regex::new(r"a(?C1)b").unwrap();
    let err = run(&re, b"ab", &mut |_: &CalloutEvent<'_>| Ok(CalloutResult::Abort)).unwrap_err();
    assert!(matches!(err, MatchError::CalloutAborted(None)));
    assert_eq!(err.code(), -37);
    assert!(err.callout_error().is_none());
}

#[derive(Debug)]
struct Budget(usize);

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "budget of {} exhausted", self.0)
    }
}

impl std::error::Error for Budget {}

#[test]
fn test_error_payload() {
    let re = Regex::new(r"(?C1)x").unwrap();
    let mut calls = 0;
    let err = run(&re, b"aaxaa", &mut |_: &CalloutEvent<'_>| {
        calls += 1;
        Err(CalloutError::new(Budget(calls)))
    })
    .unwrap_err();
    let payload = err.callout_error().expect("payload");
    assert_eq!(payload.downcast_ref::<Budget>().map(|b| b.0), Some(1));
    assert_eq!(payload.to_string(), "budget of 1 exhausted");

    let err = run(&re, b"x", &mut |_: &CalloutEvent<'_>| Err(CalloutError::msg("stop"))).unwrap_err();
    assert_eq!(err.callout_error().map(|e| e.to_string()), Some("stop".to_string()));
}

#[test]
fn test_no_callback_passes() {
    let re = Regex::new(r"a(?C1)b(?C2)").unwrap();
    assert_eq!(re.find("xab").map(|m| m.range()), Some(1..3));
    let numbers: Vec<u8> = re.callouts().iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[test]
fn test_auto_callouts() {
    let opts = CompileOptions::default().auto_callout(true);
    let re = Regex::with_options(r"ab+", opts).unwrap();
    assert!(re.callouts().iter().all(|c| c.number == 255));

    let mut positions = Vec::new();
    run(&re, b"abb", &mut |e: &CalloutEvent<'_>| {
        positions.push((e.pattern_position, e.current_position));
        Ok(CalloutResult::Pass)
    })
    .unwrap();
    assert_eq!(positions, vec![(0, 0), (1, 1), (3, 3)]);
}

#[test]
fn test_dfa_callouts() {
    let re = Regex::new(r"a(?C1)b").unwrap();
    let opts = DfaMatchOptions::default();
    let result = re
        .dfa_match(b"ab", 0, &opts, Some(&mut |_: &CalloutEvent<'_>| Ok(CalloutResult::Pass)))
        .unwrap();
    assert_eq!(result.get(0), Some((0, 2)));

    let result = re
        .dfa_match(b"ab", 0, &opts, Some(&mut |_: &CalloutEvent<'_>| Ok(CalloutResult::Fail)))
        .unwrap();
    assert!(!result.is_match());

    let err = re
        .dfa_match(b"ab", 0, &opts, Some(&mut |_: &CalloutEvent<'_>| Ok(CalloutResult::Abort)))
        .unwrap_err();
    assert!(matches!(err, MatchError::CalloutAborted(None)));
}
