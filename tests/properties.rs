use chrono::{Days, NaiveDate};
use fiscal_ledger::utils::{year_end_from_start, year_start_from_end};
use fiscal_ledger::*;
use proptest::prelude::*;

fn anchor_date() -> impl Strategy<Value = NaiveDate> {
    // Every day from 1990-01-01 over roughly fifty years, leap days included.
    (0u64..18_000).prop_map(|n| {
        NaiveDate::from_ymd_opt(1990, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(n))
            .unwrap()
    })
}

fn interval() -> impl Strategy<Value = NamedInterval> {
    (
        -50.0f64..50.0,
        0.0f64..40.0,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(lower, width, lower_closed, upper_closed, unbounded)| {
            let upper = if unbounded { f64::INFINITY } else { lower + width };
            let (lower_closed, upper_closed) = if upper == lower {
                (true, true)
            } else {
                (lower_closed, upper_closed && !unbounded)
            };
            NamedInterval::new("p", lower, upper, lower_closed, upper_closed).unwrap()
        })
}

proptest! {
    #[test]
    fn fiscal_years_are_contiguous(anchor in anchor_date(), use_start in any::<bool>(), prior in 0i32..6, post in 0i32..6) {
        let calendar = if use_start {
            FiscalCalendar::new(Some(anchor), None, prior, post).unwrap()
        } else {
            FiscalCalendar::new(None, Some(anchor), prior, post).unwrap()
        };

        let years = calendar.fiscal_years().unwrap();
        prop_assert_eq!(years.len() as i32, prior + post + 1);
        for pair in years.windows(2) {
            prop_assert_eq!(
                pair[1].start_date,
                pair[0].end_date.checked_add_days(Days::new(1)).unwrap()
            );
            prop_assert_eq!(pair[1].label, pair[0].label + 1);
        }
        for fy in &years {
            prop_assert_eq!(fy.day_count, (fy.end_date - fy.start_date).num_days() + 1);
            prop_assert!((364..=367).contains(&fy.day_count));
        }
    }

    #[test]
    fn every_date_in_window_has_a_fiscal_year(anchor in anchor_date(), use_start in any::<bool>(), prior in 0i32..4, post in 0i32..4, step in 0u64..4_000) {
        let calendar = if use_start {
            FiscalCalendar::new(Some(anchor), None, prior, post).unwrap()
        } else {
            FiscalCalendar::new(None, Some(anchor), prior, post).unwrap()
        };
        let (first, last) = calendar.window().unwrap();
        let span = (last - first).num_days() as u64;
        let probe = first.checked_add_days(Days::new(step % (span + 1))).unwrap();

        let label = calendar.date_to_fiscal_year(probe).unwrap();
        let offset = calendar.offset_for_fiscal_year_label(label).unwrap();
        prop_assert!(calendar.fiscal_year_for_offset(offset).unwrap().contains(probe));
    }

    #[test]
    fn accepted_anchor_pairs_match_single_anchors(anchor in anchor_date(), from_start in any::<bool>(), prior in 0i32..4, post in 0i32..4) {
        let (start, end) = if from_start {
            (anchor, year_end_from_start(anchor).unwrap())
        } else {
            (year_start_from_end(anchor).unwrap(), anchor)
        };

        if let Ok(both) = FiscalCalendar::new(Some(start), Some(end), prior, post) {
            let by_start = FiscalCalendar::new(Some(start), None, prior, post).unwrap();
            let years = both.fiscal_years().unwrap();
            prop_assert_eq!(&years, &by_start.fiscal_years().unwrap());

            // An end date alone cannot tell that the year began on Feb 29.
            let by_end = FiscalCalendar::new(None, Some(end), prior, post).unwrap();
            if by_end.fiscal_year_for_offset(0).unwrap().start_date == start {
                prop_assert_eq!(&years, &by_end.fiscal_years().unwrap());
            }
        }
    }

    #[test]
    fn overlap_is_symmetric(a in interval(), b in interval()) {
        prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
    }

    #[test]
    fn overlap_agrees_with_shared_point(a in interval(), b in interval(), x in -100.0f64..200.0) {
        if a.contains(x) && b.contains(x) {
            prop_assert!(overlaps(&a, &b));
        }
    }

    #[test]
    fn persisted_round_trip_preserves_membership(a in interval(), x in -100.0f64..1_000_000.0) {
        let json = serde_json::to_string(&a).unwrap();
        let restored: NamedInterval = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(restored.contains(x), a.contains(x));
        prop_assert_eq!(restored.contains(500_000.0), a.contains(500_000.0));
    }
}
