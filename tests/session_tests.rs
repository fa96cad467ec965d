use rematch::{CalloutEvent, CalloutResult, MatchError, MatchOptions, MatchSettings, MatchStatus, Regex};

#[test]
fn test_session_reuse() {
    let re = Regex::new(r"(\d+)-(\d+)").unwrap();
    let mut session = re.session(&MatchSettings::default());
    let opts = MatchOptions::default();

    let result = session.match_at(b"tel 12-34", 0, &opts, None).unwrap();
    assert_eq!(result.get(0), Some((4, 9)));
    assert_eq!(result.get(2), Some((7, 9)));

    // Each call overwrites the previous result.
    let result = session.match_at(b"none", 0, &opts, None).unwrap();
    assert_eq!(result.status(), MatchStatus::NoMatch);
    assert_eq!(result.get(1), None);

    let result = session.match_at(b"5-6", 0, &opts, None).unwrap().clone();
    assert_eq!(session.last_result(), &result);
    assert_eq!(result.offsets(), &[Some((0, 3)), Some((0, 1)), Some((2, 3))]);
    assert!(std::ptr::eq(session.regex(), &re));
    session.release();
}

#[test]
fn test_session_agrees_with_one_shot_matching() {
    let re = Regex::with_options(r"(?<word>[a-z]+)(\d)?", "i").unwrap();
    let mut session = re.session(&MatchSettings::default());
    for subject in ["abc1", "ABC", "12x9", "--", "\u{e9}t\u{e9}2"] {
        let expected = re
            .match_at(subject.as_bytes(), 0, &MatchOptions::default(), &MatchSettings::default(), None)
            .unwrap();
        let got = session
            .match_at(subject.as_bytes(), 0, &MatchOptions::default(), None)
            .unwrap();
        assert_eq!(got, &expected, "{}", subject);
    }
}

#[test]
fn test_session_keeps_settings() {
    let re = Regex::new(r"(a+)+b").unwrap();
    let settings = MatchSettings::default().match_limit(500);
    let mut session = re.session(&settings);
    assert_eq!(session.settings().match_limit, 500);

    let subject = "a".repeat(20);
    let err = session
        .match_at(subject.as_bytes(), 0, &MatchOptions::default(), None)
        .unwrap_err();
    assert!(matches!(err, MatchError::MatchLimit));

    // The session is still usable after an error.
    let result = session.match_at(b"aab", 0, &MatchOptions::default(), None).unwrap();
    assert_eq!(result.get(0), Some((0, 3)));
}

#[test]
fn test_session_with_callout() {
    let re = Regex::new(r"\d(?C1)").unwrap();
    let mut session = re.session(&MatchSettings::default());
    let mut calls = 0;
    let result = session
        .match_at(
            b"123",
            0,
            &MatchOptions::default(),
            Some(&mut |_: &CalloutEvent<'_>| {
                calls += 1;
                Ok(if calls < 3 {
                    CalloutResult::Fail
                } else {
                    CalloutResult::Pass
                })
            }),
        )
        .unwrap();
    assert_eq!(result.get(0), Some((2, 3)));
    assert_eq!(calls, 3);
}

#[test]
fn test_session_partial_results() {
    let re = Regex::new(r"abc").unwrap();
    let mut session = re.session(&MatchSettings::default());
    let opts = MatchOptions::default().partial_hard(true);
    let result = session.match_at(b"zab", 0, &opts, None).unwrap();
    assert!(result.is_partial());
    assert_eq!(result.get(0), Some((1, 3)));
    let result = session.match_at(b"zabc", 0, &opts, None).unwrap();
    assert_eq!(result.status(), MatchStatus::Match);
}
