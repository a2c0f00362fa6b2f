use std::io::Write;

use chrono::{Datelike, NaiveDate, Weekday};
use tempfile::NamedTempFile;
use voyz_calendar_core::config::Config;
use voyz_calendar_core::datetime::YearMonth;
use voyz_calendar_core::grid::{build_month_grid, build_week_grid};
use voyz_calendar_core::label::{format_label, parse_label, parse_period};
use voyz_calendar_core::period::{
    PeriodRejection, PeriodSelection, validate_month, validate_week, validate_year,
};
use voyz_calendar_core::resolver::{DateRange, OrderPolicy, resolve};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn month_grids_are_padded_and_contiguous() {
    for year in [1999, 2015, 2024, 2025, 2026] {
        for month in 1..=12 {
            let ym = YearMonth::new(year, month).expect("valid month");
            let grid = build_month_grid(ym);
            let days = grid.days();

            assert!(days.len() == 35 || days.len() == 42, "{ym}: {}", days.len());
            assert_eq!(grid.week_count() * 7, days.len());
            assert_eq!(days[0].date.weekday(), Weekday::Sun);
            for pair in days.windows(2) {
                assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date), "{ym}");
            }

            let primary = days
                .iter()
                .filter(|day| day.is_in_primary_period)
                .map(|day| day.date)
                .collect::<Vec<_>>();
            let expected = ym
                .first_day()
                .iter_days()
                .take_while(|d| *d <= ym.last_day())
                .collect::<Vec<_>>();
            assert_eq!(primary, expected, "{ym}");
        }
    }
}

#[test]
fn week_grid_starts_on_sunday() {
    let grid = build_week_grid(date(2025, 1, 1));
    assert_eq!(grid.days().len(), 7);
    assert_eq!(grid.start(), date(2024, 12, 29));
    assert_eq!(grid.start().weekday(), Weekday::Sun);
    assert!(grid.days().iter().all(|day| day.is_in_primary_period));
}

#[test]
fn year_and_month_ranges_cover_whole_periods() {
    assert_eq!(
        resolve(&PeriodSelection::Year {
            start_year: 2023,
            end_year: 2025,
        })
        .expect("resolve years"),
        DateRange::new(date(2023, 1, 1), date(2025, 12, 31))
    );
    assert_eq!(
        resolve(&PeriodSelection::Month {
            start_year: 2025,
            start_month: 3,
            end_year: 2025,
            end_month: 8,
        })
        .expect("resolve months"),
        DateRange::new(date(2025, 3, 1), date(2025, 8, 31))
    );
}

#[test]
fn validators_cap_spans() {
    assert!(!validate_year(2025, 2021));
    assert!(validate_year(2021, 2025));
    assert!(!validate_year(2020, 2025));
    assert!(validate_month(2025, 3, 2025, 8));
    assert!(!validate_month(2025, 1, 2025, 8));
    assert!(validate_week(2025, 12, 5, 2020, 1, 1));
}

#[test]
fn week_ranges_are_iso_weeks_or_whole_months() {
    for year in [2020, 2021, 2022, 2026, 2027] {
        for (start_month, end_month) in [(1, 1), (1, 2), (11, 12), (12, 12)] {
            let whole = DateRange::new(
                YearMonth::new(year, start_month).expect("valid month").first_day(),
                YearMonth::new(year, end_month).expect("valid month").last_day(),
            );
            for start_week in 1..=5 {
                for end_week in 1..=5 {
                    let selection = PeriodSelection::Week {
                        start_year: year,
                        start_month,
                        start_week,
                        end_year: year,
                        end_month,
                        end_week,
                    };
                    let range = resolve(&selection).expect("week ranges always resolve");
                    let iso_bounds = range.start.weekday() == Weekday::Mon
                        && range.end.weekday() == Weekday::Sun;
                    assert!(iso_bounds || range == whole, "{selection:?} -> {range}");
                }
            }
        }
    }

    let january = parse_period("2022-01w1..2022-01w5").expect("parse weeks");
    assert_eq!(
        resolve(&january).expect("resolve"),
        DateRange::new(date(2022, 1, 1), date(2022, 1, 31))
    );
}

#[test]
fn labels_round_trip_through_resolution() {
    let selection = PeriodSelection::Month {
        start_year: 2024,
        start_month: 11,
        end_year: 2025,
        end_month: 2,
    };
    let label = format_label(&selection);
    assert_eq!(label, "월: 2024 11월 ~ 2025 2월");

    let parsed = parse_label(&label).expect("parse label");
    assert_eq!(parsed, selection);

    let range = resolve(&parsed).expect("resolve");
    assert_eq!(
        range.to_query_params(),
        ("2024-11-01".to_string(), "2025-02-28".to_string())
    );
}

#[test]
fn config_file_drives_validation_and_ordering() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[policies]\nmax_month_span = 12\nmax_week_span = 2\norder = \"reject\""
    )
    .expect("write config");

    let cfg = Config::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.resolver().order(), OrderPolicy::Reject);

    let validator = cfg.validator();
    let year_of_months = parse_period("2025-01..2025-12").expect("parse months");
    assert!(validator.is_valid(&year_of_months));

    let long_weeks = parse_period("2025-08w1..2025-08w4").expect("parse weeks");
    assert!(matches!(
        validator.commit(long_weeks),
        Err(PeriodRejection::WeekSpanTooLong { .. })
    ));

    let inverted = parse_period("2025-08w3..2025-08w2").expect("parse weeks");
    assert!(matches!(
        cfg.resolver().resolve(&inverted),
        Err(PeriodRejection::InvertedRange { .. })
    ));
}
