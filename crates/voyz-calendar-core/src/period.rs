use chrono::{
  Datelike,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};
use thiserror::Error;
use tracing::debug;

use crate::datetime::YearMonth;
use crate::resolver::{
  DateRange,
  PeriodRangeResolver
};

pub const DEFAULT_MAX_YEAR_SPAN: u32 = 5;
pub const DEFAULT_MAX_MONTH_SPAN: u32 = 6;
pub const WEEKS_PER_MONTH: u32 = 5;
pub const YEAR_OPTION_COUNT: i32 = 5;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
  Year,
  Month,
  Week
}

impl PeriodKind {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Year => "year",
      | Self::Month => "month",
      | Self::Week => "week"
    }
  }

  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "year" | "years" | "y" => {
        Some(Self::Year)
      }
      | "month" | "months" | "m" => {
        Some(Self::Month)
      }
      | "week" | "weeks" | "w" => {
        Some(Self::Week)
      }
      | _ => None
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize
)]
#[serde(
  tag = "kind",
  rename_all = "lowercase"
)]
pub enum PeriodSelection {
  Year {
    start_year: i32,
    end_year:   i32
  },
  Month {
    start_year:  i32,
    start_month: u32,
    end_year:    i32,
    end_month:   u32
  },
  Week {
    start_year:  i32,
    start_month: u32,
    start_week:  u32,
    end_year:    i32,
    end_month:   u32,
    end_week:    u32
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Error,
)]
pub enum PeriodRejection {
  #[error(
    "year {year} is outside the \
     supported calendar"
  )]
  YearOutOfRange { year: i32 },
  #[error(
    "month {month} is outside 1..=12"
  )]
  MonthOutOfRange { month: u32 },
  #[error(
    "week {week} is outside 1..=5"
  )]
  WeekOutOfRange { week: u32 },
  #[error(
    "start year {start} is after end \
     year {end}"
  )]
  InvertedYears { start: i32, end: i32 },
  #[error(
    "{span} years selected; at most \
     {max} allowed"
  )]
  YearSpanTooLong { span: i64, max: u32 },
  #[error(
    "start month {start} is after end \
     month {end}"
  )]
  InvertedMonths {
    start: YearMonth,
    end:   YearMonth
  },
  #[error(
    "{span} months selected; at most \
     {max} allowed"
  )]
  MonthSpanTooLong { span: i64, max: u32 },
  #[error(
    "{span} weeks selected; at most \
     {max} allowed"
  )]
  WeekSpanTooLong { span: i64, max: u32 },
  #[error(
    "resolved range starts {start} \
     after it ends {end}"
  )]
  InvertedRange {
    start: NaiveDate,
    end:   NaiveDate
  }
}

impl PeriodSelection {
  pub fn kind(&self) -> PeriodKind {
    match self {
      | Self::Year { .. } => {
        PeriodKind::Year
      }
      | Self::Month { .. } => {
        PeriodKind::Month
      }
      | Self::Week { .. } => {
        PeriodKind::Week
      }
    }
  }

  /// Rejects field values no calendar
  /// date can be built from. Span and order
  /// rules live in [`PeriodValidator`].
  pub fn check_structure(
    &self
  ) -> Result<(), PeriodRejection> {
    match *self {
      | Self::Year {
        start_year,
        end_year
      } => {
        check_year(start_year)?;
        check_year(end_year)
      }
      | Self::Month {
        start_year,
        start_month,
        end_year,
        end_month
      } => {
        year_month(
          start_year,
          start_month
        )?;
        year_month(end_year, end_month)?;
        Ok(())
      }
      | Self::Week {
        start_year,
        start_month,
        start_week,
        end_year,
        end_month,
        end_week
      } => {
        year_month(
          start_year,
          start_month
        )?;
        check_week(start_week)?;
        year_month(end_year, end_month)?;
        check_week(end_week)
      }
    }
  }
}

fn check_year(
  year: i32
) -> Result<(), PeriodRejection> {
  if YearMonth::new(year, 1).is_some()
    && YearMonth::new(year, 12).is_some()
  {
    Ok(())
  } else {
    Err(PeriodRejection::YearOutOfRange {
      year
    })
  }
}

pub(crate) fn year_month(
  year: i32,
  month: u32
) -> Result<YearMonth, PeriodRejection> {
  if !(1..=12).contains(&month) {
    return Err(
      PeriodRejection::MonthOutOfRange {
        month
      }
    );
  }
  YearMonth::new(year, month).ok_or(
    PeriodRejection::YearOutOfRange {
      year
    }
  )
}

fn check_week(
  week: u32
) -> Result<(), PeriodRejection> {
  if (1..=WEEKS_PER_MONTH).contains(&week)
  {
    Ok(())
  } else {
    Err(PeriodRejection::WeekOutOfRange {
      week
    })
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub struct PeriodLimits {
  pub max_year_span:  u32,
  pub max_month_span: u32,
  pub max_week_span:  Option<u32>
}

impl Default for PeriodLimits {
  fn default() -> Self {
    Self {
      max_year_span:  DEFAULT_MAX_YEAR_SPAN,
      max_month_span:
        DEFAULT_MAX_MONTH_SPAN,
      max_week_span:  None
    }
  }
}

/// Uses the default five year cap.
pub fn validate_year(
  start_year: i32,
  end_year: i32
) -> bool {
  PeriodValidator::default()
    .check_years(start_year, end_year)
    .is_ok()
}

pub fn validate_month(
  start_year: i32,
  start_month: u32,
  end_year: i32,
  end_month: u32
) -> bool {
  PeriodValidator::default()
    .check_months(
      start_year,
      start_month,
      end_year,
      end_month
    )
    .is_ok()
}

/// Week selections carry no order or span
/// rule; only field ranges are checked.
pub fn validate_week(
  start_year: i32,
  start_month: u32,
  start_week: u32,
  end_year: i32,
  end_month: u32,
  end_week: u32
) -> bool {
  PeriodSelection::Week {
    start_year,
    start_month,
    start_week,
    end_year,
    end_month,
    end_week
  }
  .check_structure()
  .is_ok()
}

#[derive(Debug, Clone, Default)]
pub struct PeriodValidator {
  limits:   PeriodLimits,
  resolver: PeriodRangeResolver
}

impl PeriodValidator {
  pub fn new(
    limits: PeriodLimits
  ) -> Self {
    Self {
      limits,
      resolver: PeriodRangeResolver::default()
    }
  }

  pub fn limits(&self) -> PeriodLimits {
    self.limits
  }

  pub fn is_valid(
    &self,
    selection: &PeriodSelection
  ) -> bool {
    self.validate(selection).is_ok()
  }

  #[tracing::instrument(skip(self))]
  pub fn validate(
    &self,
    selection: &PeriodSelection
  ) -> Result<(), PeriodRejection> {
    selection.check_structure()?;

    match *selection {
      | PeriodSelection::Year {
        start_year,
        end_year
      } => {
        self.check_years(
          start_year, end_year
        )
      }
      | PeriodSelection::Month {
        start_year,
        start_month,
        end_year,
        end_month
      } => {
        self.check_months(
          start_year,
          start_month,
          end_year,
          end_month
        )
      }
      | PeriodSelection::Week {
        ..
      } => self.check_weeks(selection)
    }
  }

  /// Hands the selection downstream only
  /// when it passes validation; nothing
  /// partial escapes on refusal.
  pub fn commit(
    &self,
    selection: PeriodSelection
  ) -> Result<PeriodSelection, PeriodRejection>
  {
    match self.validate(&selection) {
      | Ok(()) => Ok(selection),
      | Err(rejection) => {
        debug!(
          ?selection,
          reason = %rejection,
          "period selection not committed"
        );
        Err(rejection)
      }
    }
  }

  fn check_years(
    &self,
    start_year: i32,
    end_year: i32
  ) -> Result<(), PeriodRejection> {
    if start_year > end_year {
      return Err(
        PeriodRejection::InvertedYears {
          start: start_year,
          end:   end_year
        }
      );
    }

    let span = i64::from(end_year)
      - i64::from(start_year)
      + 1;
    if span
      > i64::from(self.limits.max_year_span)
    {
      return Err(
        PeriodRejection::YearSpanTooLong {
          span,
          max: self.limits.max_year_span
        }
      );
    }

    Ok(())
  }

  fn check_months(
    &self,
    start_year: i32,
    start_month: u32,
    end_year: i32,
    end_month: u32
  ) -> Result<(), PeriodRejection> {
    let start =
      year_month(start_year, start_month)?;
    let end =
      year_month(end_year, end_month)?;

    if start > end {
      return Err(
        PeriodRejection::InvertedMonths {
          start,
          end
        }
      );
    }

    let span =
      start.months_until(end) + 1;
    if span
      > i64::from(
        self.limits.max_month_span
      )
    {
      return Err(
        PeriodRejection::MonthSpanTooLong {
          span,
          max: self.limits.max_month_span
        }
      );
    }

    Ok(())
  }

  fn check_weeks(
    &self,
    selection: &PeriodSelection
  ) -> Result<(), PeriodRejection> {
    let Some(max) =
      self.limits.max_week_span
    else {
      return Ok(());
    };

    let range =
      self.resolver.resolve(selection)?;
    if !range.is_ordered() {
      return Err(
        PeriodRejection::InvertedRange {
          start: range.start,
          end:   range.end
        }
      );
    }

    let span = week_span(&range);
    if span > i64::from(max) {
      return Err(
        PeriodRejection::WeekSpanTooLong {
          span,
          max
        }
      );
    }

    Ok(())
  }
}

fn week_span(range: &DateRange) -> i64 {
  (range.day_count() + 6) / 7
}

/// The month tab's initial state: previous
/// month through the current month.
#[must_use]
pub fn default_selection(
  today: NaiveDate
) -> PeriodSelection {
  let current =
    YearMonth::from_date(today);
  let previous = current.previous();
  PeriodSelection::Month {
    start_year:  previous.year(),
    start_month: previous.month(),
    end_year:    current.year(),
    end_month:   current.month()
  }
}

/// First day of the previous month through
/// `today`.
#[must_use]
pub fn default_range(
  today: NaiveDate
) -> DateRange {
  DateRange {
    start: YearMonth::from_date(today)
      .previous()
      .first_day(),
    end:   today
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct PeriodOptions {
  pub years:  Vec<i32>,
  pub months: Vec<u32>,
  pub weeks:  Vec<u32>
}

impl PeriodOptions {
  /// Years run newest first, so the first
  /// entry of each list is the selector's
  /// initial value.
  pub fn for_today(
    today: NaiveDate
  ) -> Self {
    let newest = today.year();
    Self {
      years:  (0..YEAR_OPTION_COUNT)
        .map(|back| {
          newest.saturating_sub(back)
        })
        .collect(),
      months: (1..=12).collect(),
      weeks:  (1..=WEEKS_PER_MONTH)
        .collect()
    }
  }

  pub fn initial_selection(
    &self,
    kind: PeriodKind
  ) -> Option<PeriodSelection> {
    let newest =
      *self.years.first()?;
    let oldest = *self.years.last()?;
    let month = *self.months.first()?;
    let week = *self.weeks.first()?;

    Some(match kind {
      | PeriodKind::Year => {
        PeriodSelection::Year {
          start_year: newest,
          end_year:   oldest
        }
      }
      | PeriodKind::Month => {
        PeriodSelection::Month {
          start_year:  newest,
          start_month: month,
          end_year:    oldest,
          end_month:   month
        }
      }
      | PeriodKind::Week => {
        PeriodSelection::Week {
          start_year:  newest,
          start_month: month,
          start_week:  week,
          end_year:    newest,
          end_month:   month,
          end_week:    week
        }
      }
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn year_validation_caps_span_at_five() {
    assert!(!validate_year(2025, 2021));
    assert!(validate_year(2021, 2025));
    assert!(!validate_year(2020, 2025));
    assert!(validate_year(2025, 2025));
  }

  #[test]
  fn month_validation_caps_span_at_six() {
    assert!(validate_month(2025, 3, 2025, 8));
    assert!(!validate_month(2025, 1, 2025, 8));
    assert!(!validate_month(2025, 8, 2025, 3));
    assert!(validate_month(2024, 10, 2025, 3));
    assert!(!validate_month(2024, 9, 2025, 3));
  }

  #[test]
  fn week_validation_accepts_any_order() {
    assert!(validate_week(2025, 8, 5, 2021, 1, 1));
    assert!(validate_week(2021, 1, 1, 2025, 12, 5));
    assert!(!validate_week(2025, 13, 1, 2025, 1, 1));
    assert!(!validate_week(2025, 1, 0, 2025, 1, 1));
    assert!(!validate_week(2025, 1, 1, 2025, 1, 6));
  }

  #[test]
  fn commit_reports_the_reason() {
    let validator =
      PeriodValidator::default();
    let rejected = validator.commit(
      PeriodSelection::Year {
        start_year: 2020,
        end_year:   2025
      }
    );
    assert_eq!(
      rejected,
      Err(PeriodRejection::YearSpanTooLong {
        span: 6,
        max:  5
      })
    );

    let accepted =
      PeriodSelection::Month {
        start_year:  2025,
        start_month: 3,
        end_year:    2025,
        end_month:   8
      };
    assert_eq!(
      validator.commit(accepted),
      Ok(accepted)
    );
  }

  #[test]
  fn configured_week_cap_applies_to_resolved_range(
  ) {
    let validator =
      PeriodValidator::new(PeriodLimits {
        max_week_span: Some(2),
        ..PeriodLimits::default()
      });

    // 2025-08: day 1 is in ISO week 31.
    let two_weeks =
      PeriodSelection::Week {
        start_year:  2025,
        start_month: 8,
        start_week:  2,
        end_year:    2025,
        end_month:   8,
        end_week:    3
      };
    assert!(validator.is_valid(&two_weeks));

    let three_weeks =
      PeriodSelection::Week {
        start_year:  2025,
        start_month: 8,
        start_week:  2,
        end_year:    2025,
        end_month:   8,
        end_week:    4
      };
    assert_eq!(
      validator.validate(&three_weeks),
      Err(PeriodRejection::WeekSpanTooLong {
        span: 3,
        max:  2
      })
    );

    let inverted =
      PeriodSelection::Week {
        start_year:  2025,
        start_month: 8,
        start_week:  4,
        end_year:    2025,
        end_month:   8,
        end_week:    2
      };
    assert!(matches!(
      validator.validate(&inverted),
      Err(PeriodRejection::InvertedRange { .. })
    ));
  }

  #[test]
  fn defaults_cover_previous_and_current_month(
  ) {
    let today = date(2026, 1, 16);
    assert_eq!(
      default_selection(today),
      PeriodSelection::Month {
        start_year:  2025,
        start_month: 12,
        end_year:    2026,
        end_month:   1
      }
    );
    let range = default_range(today);
    assert_eq!(range.start, date(2025, 12, 1));
    assert_eq!(range.end, today);
  }

  #[test]
  fn options_follow_today() {
    let options =
      PeriodOptions::for_today(date(
        2026, 10, 16
      ));
    assert_eq!(
      options.years,
      vec![2026, 2025, 2024, 2023, 2022]
    );
    assert_eq!(options.months.len(), 12);
    assert_eq!(
      options.weeks,
      vec![1, 2, 3, 4, 5]
    );
    assert_eq!(
      options
        .initial_selection(PeriodKind::Year),
      Some(PeriodSelection::Year {
        start_year: 2026,
        end_year:   2022
      })
    );
  }

  #[test]
  fn kind_keys_parse() {
    assert_eq!(
      PeriodKind::from_key("Weeks"),
      Some(PeriodKind::Week)
    );
    assert_eq!(PeriodKind::Month.as_key(), "month");
    assert_eq!(PeriodKind::from_key("day"), None);
  }
}
