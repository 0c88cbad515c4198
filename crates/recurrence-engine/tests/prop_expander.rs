//! Property-based tests for occurrence generation and calendar views.
//!
//! These check invariants that must hold for *any* rule in the supported grammar,
//! not just the worked examples in `expander_tests.rs`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use recurrence_engine::{
    generate, next_occurrence, CalendarAggregator, InMemoryTemplates, OwnerId, RecurrenceRule,
    Template, TemplateId,
};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_freq() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("DAILY"), Just("WEEKLY"), Just("MONTHLY"), Just("YEARLY")]
}

fn arb_byday() -> impl Strategy<Value = Option<&'static str>> {
    prop_oneof![
        Just(None),
        Just(Some("MO")),
        Just(Some("TU,TH")),
        Just(Some("MO,TU,WE,TH,FR")),
        Just(Some("SA,SU")),
    ]
}

fn arb_termination() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (1u32..=40).prop_map(|n| Some(format!("COUNT={}", n))),
        (2024i32..=2026, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| Some(format!("UNTIL={:04}{:02}{:02}", y, m, d))),
    ]
}

/// A rule string drawn from the supported grammar.
fn arb_rule() -> impl Strategy<Value = String> {
    (arb_freq(), 1u32..=4, arb_byday(), arb_termination()).prop_map(
        |(freq, interval, byday, termination)| {
            let mut rule = format!("FREQ={};INTERVAL={}", freq, interval);
            if let Some(days) = byday {
                rule.push_str(&format!(";BYDAY={}", days));
            }
            if let Some(t) = termination {
                rule.push(';');
                rule.push_str(&t);
            }
            rule
        },
    )
}

/// Anchor in 2024-2025; day capped at 28 so every month has it.
fn arb_anchor() -> impl Strategy<Value = NaiveDateTime> {
    (2024i32..=2025, 1u32..=12, 1u32..=28, 0u32..=23, 0u32..=3).prop_map(|(y, m, d, h, q)| {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, q * 15, 0)
            .unwrap()
    })
}

/// Window given as (offset from anchor in hours, length in hours).
fn arb_window() -> impl Strategy<Value = (i64, i64)> {
    (-24 * 120i64..=24 * 400, 0i64..=24 * 120)
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    }
}

fn window_for(anchor: NaiveDateTime, (offset, len): (i64, i64)) -> (NaiveDateTime, NaiveDateTime) {
    let start = anchor + Duration::hours(offset);
    (start, start + Duration::hours(len))
}

// ---------------------------------------------------------------------------
// Property 1: every occurrence lies inside the window and not before the anchor
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn occurrences_stay_inside_window(
        rule in arb_rule(),
        anchor in arb_anchor(),
        window in arb_window(),
        max in 1usize..=150,
    ) {
        let (start, end) = window_for(anchor, window);
        for t in generate(&rule, anchor, start, end, max) {
            prop_assert!(start <= t && t <= end, "{} outside [{}, {}]", t, start, end);
            prop_assert!(t >= anchor, "{} precedes anchor {}", t, anchor);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: strictly increasing, hence no duplicates
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn occurrences_strictly_increase(
        rule in arb_rule(),
        anchor in arb_anchor(),
        window in arb_window(),
        max in 1usize..=150,
    ) {
        let (start, end) = window_for(anchor, window);
        let result = generate(&rule, anchor, start, end, max);
        for pair in result.windows(2) {
            prop_assert!(pair[0] < pair[1], "not increasing: {} then {}", pair[0], pair[1]);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: never more than the cap
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn cap_is_respected(
        rule in arb_rule(),
        anchor in arb_anchor(),
        window in arb_window(),
        max in 0usize..=20,
    ) {
        let (start, end) = window_for(anchor, window);
        prop_assert!(generate(&rule, anchor, start, end, max).len() <= max);
    }
}

// ---------------------------------------------------------------------------
// Property 4: an anchor inside the window comes first
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn anchor_in_window_comes_first(
        rule in arb_rule(),
        anchor in arb_anchor(),
        before in 0i64..=24 * 40,
        after in 0i64..=24 * 40,
        max in 1usize..=50,
    ) {
        let start = anchor - Duration::hours(before);
        let end = anchor + Duration::hours(after);
        let result = generate(&rule, anchor, start, end, max);
        prop_assert_eq!(result.first(), Some(&anchor));
    }
}

// ---------------------------------------------------------------------------
// Property 5: UNTIL is never exceeded (beyond the anchor itself)
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn until_is_respected(
        rule in arb_rule(),
        anchor in arb_anchor(),
        window in arb_window(),
    ) {
        let parsed: RecurrenceRule = rule.parse().expect("strategy yields valid rules");
        if let Some(until) = parsed.until() {
            let (start, end) = window_for(anchor, window);
            for t in generate(&rule, anchor, start, end, 500) {
                prop_assert!(t == anchor || t <= until, "{} after UNTIL {}", t, until);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property 6: unsupported frequencies never produce anything
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn unsupported_frequency_is_empty(
        freq in "[A-Z]{3,12}",
        anchor in arb_anchor(),
        window in arb_window(),
    ) {
        prop_assume!(!["DAILY", "WEEKLY", "MONTHLY", "YEARLY"].contains(&freq.as_str()));
        let (start, end) = window_for(anchor, window);
        let rule = format!("FREQ={}", freq);
        prop_assert!(generate(&rule, anchor, start, end, 100).is_empty());
    }
}

// ---------------------------------------------------------------------------
// Property 7: canonical form parses back to the same rule
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn canonical_form_is_stable(rule in arb_rule()) {
        let parsed: RecurrenceRule = rule.parse().expect("strategy yields valid rules");
        let reparsed: RecurrenceRule = parsed.to_string().parse().expect("canonical form parses");
        prop_assert_eq!(parsed, reparsed);
    }
}

// ---------------------------------------------------------------------------
// Property 8: next_occurrence is strictly after its starting point
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn next_occurrence_is_in_the_future(
        rule in arb_rule(),
        anchor in arb_anchor(),
        offset in -24 * 60i64..=24 * 300,
    ) {
        let from = anchor + Duration::hours(offset);
        if let Some(next) = next_occurrence(&rule, anchor, from) {
            prop_assert!(next > from);
            prop_assert!(next >= anchor);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 9: month views preserve durations and are repeatable
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn month_view_preserves_duration_and_is_repeatable(
        rule in arb_rule(),
        anchor in arb_anchor(),
        minutes in 0i64..=600,
        month in 1u32..=12,
    ) {
        let mut source = InMemoryTemplates::new();
        source.insert(Template {
            id: TemplateId(1),
            owner_id: OwnerId(1),
            title: "series".to_string(),
            description: None,
            color: None,
            all_day: false,
            start: anchor,
            end: Some(anchor + Duration::minutes(minutes)),
            is_recurring: true,
            recurrence_rule: Some(rule),
            recur_until: None,
            category_id: None,
            alarms: Vec::new(),
            deleted: false,
        });

        let aggregator = CalendarAggregator::new(&source);
        let first = aggregator.monthly_view(OwnerId(1), 2025, month).expect("valid month");
        let second = aggregator.monthly_view(OwnerId(1), 2025, month).expect("valid month");
        prop_assert_eq!(&first, &second);

        for item in &first.items {
            prop_assert_eq!(item.end, Some(item.start + Duration::minutes(minutes)));
            prop_assert!(first.window.contains(item.start));
        }
    }
}
