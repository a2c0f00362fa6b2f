use std::collections::HashMap;

use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::Serialize;
use tracing::trace;

use crate::datetime::{
  YearMonth,
  add_days,
  end_of_week,
  start_of_week
};

/// Grids are laid out Sunday first. Period
/// resolution uses ISO weeks instead; the two
/// are intentionally not unified.
pub const GRID_WEEK_START: Weekday =
  Weekday::Sun;

const MIN_MONTH_CELLS: i64 = 35;
const MAX_MONTH_CELLS: i64 = 42;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize
)]
pub struct CalendarDay {
  pub date:                 NaiveDate,
  pub is_in_primary_period: bool
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MonthGrid {
  year_month: YearMonth,
  days:       Vec<CalendarDay>,
  week_count: usize
}

impl MonthGrid {
  pub fn year_month(&self) -> YearMonth {
    self.year_month
  }

  pub fn days(&self) -> &[CalendarDay] {
    &self.days
  }

  pub fn week_count(&self) -> usize {
    self.week_count
  }

  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[CalendarDay]>
  {
    self.days.chunks(7)
  }

  pub fn first_date(&self) -> NaiveDate {
    self
      .days
      .first()
      .map(|day| day.date)
      .unwrap_or_else(|| {
        self.year_month.first_day()
      })
  }

  pub fn last_date(&self) -> NaiveDate {
    self
      .days
      .last()
      .map(|day| day.date)
      .unwrap_or_else(|| {
        self.year_month.last_day()
      })
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct WeekGrid {
  days: [CalendarDay; 7]
}

impl WeekGrid {
  pub fn days(&self) -> &[CalendarDay] {
    &self.days
  }

  pub fn start(&self) -> NaiveDate {
    self.days[0].date
  }

  pub fn end(&self) -> NaiveDate {
    self.days[6].date
  }
}

#[tracing::instrument(level = "trace")]
pub fn build_month_grid(
  year_month: YearMonth
) -> MonthGrid {
  let first = year_month.first_day();
  let last = year_month.last_day();
  let window_start =
    start_of_week(first, GRID_WEEK_START);
  let window_end =
    end_of_week(last, GRID_WEEK_START);

  let natural = window_end
    .signed_duration_since(window_start)
    .num_days()
    + 1;
  let cells = natural
    .max(MIN_MONTH_CELLS)
    .min(MAX_MONTH_CELLS);

  let days = (0..cells)
    .map(|offset| {
      let date =
        add_days(window_start, offset);
      CalendarDay {
        date,
        is_in_primary_period: date
          .month()
          == year_month.month()
      }
    })
    .collect::<Vec<_>>();

  trace!(
    month = %year_month,
    natural_days = natural,
    grid_days = days.len(),
    "built month grid"
  );

  let week_count = days.len() / 7;
  MonthGrid {
    year_month,
    days,
    week_count
  }
}

#[tracing::instrument(level = "trace")]
pub fn build_week_grid(
  reference: NaiveDate
) -> WeekGrid {
  // keep the whole week representable
  let reference = reference.clamp(
    add_days(NaiveDate::MIN, 6),
    add_days(NaiveDate::MAX, -6)
  );
  let start = start_of_week(
    reference,
    GRID_WEEK_START
  );
  let days =
    std::array::from_fn(|offset| {
      CalendarDay {
        date: add_days(
          start,
          offset as i64
        ),
        is_in_primary_period: true
      }
    });
  WeekGrid { days }
}

#[must_use]
pub fn next_month(
  current: YearMonth
) -> YearMonth {
  current.next()
}

#[must_use]
pub fn previous_month(
  current: YearMonth
) -> YearMonth {
  current.previous()
}

#[must_use]
pub fn next_week(
  reference: NaiveDate
) -> NaiveDate {
  add_days(reference, 7)
}

#[must_use]
pub fn previous_week(
  reference: NaiveDate
) -> NaiveDate {
  add_days(reference, -7)
}

#[must_use]
pub fn shift_weeks(
  reference: NaiveDate,
  weeks: i64
) -> NaiveDate {
  add_days(
    reference,
    weeks.saturating_mul(7)
  )
}

/// Owned memo of month grids. Grids are pure
/// functions of the month, so entries never go
/// stale.
#[derive(Debug, Default)]
pub struct MonthGridCache {
  grids: HashMap<YearMonth, MonthGrid>
}

impl MonthGridCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get_or_build(
    &mut self,
    year_month: YearMonth
  ) -> &MonthGrid {
    self
      .grids
      .entry(year_month)
      .or_insert_with(|| {
        trace!(month = %year_month, "month grid cache miss");
        build_month_grid(year_month)
      })
  }

  pub fn len(&self) -> usize {
    self.grids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.grids.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    NaiveDate,
    Weekday
  };

  use super::*;

  fn ym(
    year: i32,
    month: u32
  ) -> YearMonth {
    YearMonth::new(year, month)
      .expect("valid month")
  }

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn every_month_grid_is_padded_and_contiguous(
  ) {
    for year in 1899..=2101 {
      for month in 1..=12 {
        let grid =
          build_month_grid(ym(year, month));
        let days = grid.days();

        assert!(
          days.len() == 35
            || days.len() == 42,
          "{year}-{month}: {} days",
          days.len()
        );
        assert_eq!(
          grid.week_count() * 7,
          days.len()
        );
        assert_eq!(
          days[0].date.weekday(),
          Weekday::Sun
        );
        for pair in days.windows(2) {
          assert_eq!(
            pair[0].date.succ_opt(),
            Some(pair[1].date)
          );
        }
      }
    }
  }

  #[test]
  fn primary_days_are_exactly_the_month() {
    for year in [2015, 2020, 2024, 2025, 2026] {
      for month in 1..=12 {
        let target = ym(year, month);
        let grid = build_month_grid(target);
        let primary = grid
          .days()
          .iter()
          .filter(|day| {
            day.is_in_primary_period
          })
          .map(|day| day.date)
          .collect::<Vec<_>>();
        let expected = target
          .first_day()
          .iter_days()
          .take(target.day_count() as usize)
          .collect::<Vec<_>>();
        assert_eq!(primary, expected);
      }
    }
  }

  #[test]
  fn four_week_february_is_padded_to_35() {
    // February 2015 starts on a Sunday and
    // fills exactly four rows.
    let grid =
      build_month_grid(ym(2015, 2));
    assert_eq!(grid.days().len(), 35);
    assert_eq!(
      grid.first_date(),
      date(2015, 2, 1)
    );
    assert_eq!(
      grid.last_date(),
      date(2015, 3, 7)
    );
    assert!(
      grid.days()[28..]
        .iter()
        .all(|day| !day.is_in_primary_period)
    );
  }

  #[test]
  fn six_week_month_keeps_42_days() {
    // August 2025 starts on a Friday.
    let grid =
      build_month_grid(ym(2025, 8));
    assert_eq!(grid.week_count(), 6);
    assert_eq!(
      grid.first_date(),
      date(2025, 7, 27)
    );
    assert_eq!(
      grid.last_date(),
      date(2025, 9, 6)
    );
  }

  #[test]
  fn week_grid_starts_on_sunday() {
    let thursday = date(2025, 8, 14);
    let grid = build_week_grid(thursday);
    assert_eq!(grid.days().len(), 7);
    assert_eq!(
      grid.start(),
      date(2025, 8, 10)
    );
    assert_eq!(
      grid.end(),
      date(2025, 8, 16)
    );
    assert!(
      grid
        .days()
        .iter()
        .all(|day| day.is_in_primary_period)
    );

    let sunday = date(2025, 8, 10);
    assert_eq!(
      build_week_grid(sunday).start(),
      sunday
    );
  }

  #[test]
  fn week_grid_crosses_year_boundary() {
    let grid =
      build_week_grid(date(2026, 1, 1));
    assert_eq!(
      grid.start(),
      date(2025, 12, 28)
    );
    assert_eq!(
      grid.end(),
      date(2026, 1, 3)
    );
  }

  #[test]
  fn navigation_helpers_step_by_month_and_week(
  ) {
    assert_eq!(
      next_month(ym(2025, 12)),
      ym(2026, 1)
    );
    assert_eq!(
      previous_month(ym(2025, 1)),
      ym(2024, 12)
    );
    assert_eq!(
      next_week(date(2025, 12, 29)),
      date(2026, 1, 5)
    );
    assert_eq!(
      previous_week(date(2025, 3, 3)),
      date(2025, 2, 24)
    );
    assert_eq!(
      shift_weeks(date(2025, 3, 3), -2),
      date(2025, 2, 17)
    );
  }

  #[test]
  fn cache_builds_each_month_once() {
    let mut cache = MonthGridCache::new();
    let first = cache
      .get_or_build(ym(2025, 8))
      .clone();
    let again =
      cache.get_or_build(ym(2025, 8));
    assert_eq!(&first, again);
    cache.get_or_build(ym(2025, 9));
    assert_eq!(cache.len(), 2);
  }

  #[test]
  fn grids_hold_shape_at_calendar_limits(
  ) {
    for reference in
      [NaiveDate::MIN, NaiveDate::MAX]
    {
      let week = build_week_grid(reference);
      assert_eq!(
        week.start().weekday(),
        Weekday::Sun
      );
      for pair in week.days().windows(2) {
        assert_eq!(
          pair[0].date.succ_opt(),
          Some(pair[1].date)
        );
      }

      let month = build_month_grid(
        YearMonth::from_date(reference)
      );
      let days = month.days();
      assert!(
        days.len() == 35 || days.len() == 42,
        "{reference}: {}",
        days.len()
      );
      assert_eq!(
        days[0].date.weekday(),
        Weekday::Sun
      );
      for pair in days.windows(2) {
        assert_eq!(
          pair[0].date.succ_opt(),
          Some(pair[1].date)
        );
      }
    }
  }
}
