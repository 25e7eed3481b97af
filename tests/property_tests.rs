//! Property-based tests for formatting, heat mapping, aggregation and
//! persistence

use lineprof::heat;
use lineprof::persistence::{self, Encoding};
use lineprof::report::{self, ReportOptions};
use lineprof::source::MemorySource;
use lineprof::stats::{total_time, FunctionKey, LineRecord, StatsSnapshot, StatsTracker};
use lineprof::time_format::{format_g, format_time};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_fixed_width_time_is_at_least_five_chars(ticks in 0u64..10_000_000) {
        let cell = format_time(ticks as f64, 1e-6, false);
        prop_assert!(cell.chars().count() >= 5);
        prop_assert!(cell.ends_with(".0"));
        prop_assert_eq!(cell.trim().parse::<f64>().unwrap(), ticks as f64);
    }

    #[test]
    fn prop_human_readable_value_below_thousand(ticks in 0u64..1_000_000_000_000) {
        let cell = format_time(ticks as f64, 1e-9, true);
        let (value, label) = cell.split_once(' ').unwrap();
        let value: f64 = value.parse().unwrap();
        prop_assert!(["s", "ms", "µs", "ns"].contains(&label.trim()));
        if label.trim() != "s" {
            prop_assert!(value < 1000.0 + 1e-9);
        }
    }

    #[test]
    fn prop_heat_bucket_in_range(percent in -1_000.0f64..1_000.0) {
        prop_assert!(heat::bucket(percent) <= 10);
    }

    #[test]
    fn prop_heat_bucket_monotonic(a in 0.0f64..100.0, b in 0.0f64..100.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(heat::bucket(low) <= heat::bucket(high));
    }

    #[test]
    fn prop_format_g_close_to_value(value in 1e-9f64..1e9) {
        let rendered = format_g(value);
        let parsed: f64 = rendered.parse().unwrap();
        prop_assert!(((parsed - value) / value).abs() < 1e-5);
    }

    #[test]
    fn prop_tracker_totals_match_events(
        events in prop::collection::vec((1u32..20, 0u64..1_000), 0..200)
    ) {
        let key = FunctionKey::new("p.src", 1, "f");
        let mut tracker = StatsTracker::new(1e-6);
        tracker.register(&key);
        for &(line, elapsed) in &events {
            tracker.record(&key, line, elapsed);
        }

        let snapshot = tracker.snapshot();
        let lines = &snapshot.timings[&key];
        let expected: u64 = events.iter().map(|&(_, t)| t).sum();
        prop_assert_eq!(total_time(lines), expected);
        prop_assert_eq!(lines.iter().map(|l| l.hits).sum::<u64>(), events.len() as u64);
        prop_assert!(lines.windows(2).all(|w| w[0].line < w[1].line));
    }

    #[test]
    fn prop_percentages_sum_to_hundred(
        times in prop::collection::vec(1u64..10_000, 1..10)
    ) {
        let key = FunctionKey::new("p.src", 1, "f");
        let lines: Vec<LineRecord> = times
            .iter()
            .enumerate()
            .map(|(i, &time)| LineRecord { line: i as u32 + 1, hits: 1, time })
            .collect();
        let source: String = (0..times.len()).map(|i| format!("step{}();\n", i)).collect();
        let mut sources = MemorySource::new();
        sources.insert("p.src", &source);

        let table = report::function_report(
            &key, &lines, None, 1e-6, &mut sources, &ReportOptions::default(),
        );
        prop_assert_eq!(table.rows.len(), times.len());
        let sum: f64 = table.rows.iter().map(|r| r.percent.trim().parse::<f64>().unwrap()).sum();
        // each cell is rounded to one decimal
        prop_assert!((sum - 100.0).abs() <= 0.05 * times.len() as f64 + 1e-9);
    }

    #[test]
    fn prop_snapshot_survives_persistence(
        functions in prop::collection::btree_map(
            (1u32..500, "[a-z]{1,8}"),
            prop::collection::btree_map(1u32..1000, (1u64..100, 0u64..1_000_000), 0..8),
            0..6,
        ),
        msgpack in any::<bool>(),
    ) {
        let mut snapshot = StatsSnapshot::new(1e-6);
        for ((start_line, name), lines) in functions {
            let lines: Vec<LineRecord> = lines
                .into_iter()
                .map(|(line, (hits, time))| LineRecord { line, hits, time })
                .collect();
            snapshot.timings.insert(FunctionKey::new("p.src", start_line, name), lines);
        }

        let encoding = if msgpack { Encoding::MessagePack } else { Encoding::Json };
        let mut buffer = Vec::new();
        persistence::write_snapshot(&snapshot, &mut buffer, encoding).unwrap();
        let loaded = persistence::read_snapshot(buffer.as_slice(), encoding).unwrap();
        prop_assert_eq!(loaded, snapshot);
    }
}

#[test]
fn test_palette_has_rule_per_bucket() {
    let css = heat::palette_css();
    assert_eq!(css.lines().count(), heat::PALETTE.len());
    for bucket in 0..=10u8 {
        assert!(css.contains(&format!("span.p{}", bucket)));
    }
}
