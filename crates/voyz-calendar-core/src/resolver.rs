use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::debug;

use crate::datetime::{
  YearMonth,
  format_iso_date
};
use crate::period::{
  PeriodRejection,
  PeriodSelection,
  year_month
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize
)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate
}

impl DateRange {
  pub fn new(
    start: NaiveDate,
    end: NaiveDate
  ) -> Self {
    Self { start, end }
  }

  pub fn is_ordered(&self) -> bool {
    self.start <= self.end
  }

  pub fn contains(
    &self,
    date: NaiveDate
  ) -> bool {
    self.start <= date
      && date <= self.end
  }

  /// Inclusive day count; zero or negative
  /// when the range is inverted.
  pub fn day_count(&self) -> i64 {
    self
      .end
      .signed_duration_since(self.start)
      .num_days()
      + 1
  }

  /// ISO-8601 `(start, end)` pair for
  /// analytics queries.
  pub fn to_query_params(
    &self
  ) -> (String, String) {
    (
      format_iso_date(self.start),
      format_iso_date(self.end)
    )
  }

  #[must_use]
  pub fn swapped(self) -> Self {
    Self {
      start: self.end,
      end:   self.start
    }
  }
}

impl fmt::Display for DateRange {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{} ~ {}",
      format_iso_date(self.start),
      format_iso_date(self.end)
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
  #[default]
  Passthrough,
  Swap,
  Reject
}

impl OrderPolicy {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Passthrough => {
        "passthrough"
      }
      | Self::Swap => "swap",
      | Self::Reject => "reject"
    }
  }
}

impl FromStr for OrderPolicy {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "passthrough" | "pass" => {
        Ok(Self::Passthrough)
      }
      | "swap" => Ok(Self::Swap),
      | "reject" => Ok(Self::Reject),
      | other => {
        Err(anyhow!(
          "invalid order policy: \
           {other} (expected \
           passthrough, swap or reject)"
        ))
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct PeriodRangeResolver {
  order: OrderPolicy
}

impl PeriodRangeResolver {
  pub fn new(
    order: OrderPolicy
  ) -> Self {
    Self { order }
  }

  pub fn order(&self) -> OrderPolicy {
    self.order
  }

  /// Fails only for selections whose fields
  /// cannot name a calendar date. Week
  /// endpoints that do not exist in their
  /// ISO year degrade to whole months.
  #[tracing::instrument(skip(self))]
  pub fn resolve(
    &self,
    selection: &PeriodSelection
  ) -> Result<DateRange, PeriodRejection> {
    let range = match *selection {
      | PeriodSelection::Year {
        start_year,
        end_year
      } => {
        DateRange {
          start: year_month(start_year, 1)?
            .first_day(),
          end:   year_month(end_year, 12)?
            .last_day()
        }
      }
      | PeriodSelection::Month {
        start_year,
        start_month,
        end_year,
        end_month
      } => {
        DateRange {
          start: year_month(
            start_year,
            start_month
          )?
          .first_day(),
          end:   year_month(
            end_year, end_month
          )?
          .last_day()
        }
      }
      | PeriodSelection::Week {
        start_year,
        start_month,
        start_week,
        end_year,
        end_month,
        end_week
      } => {
        selection.check_structure()?;
        resolve_weeks(
          (start_year, start_month, start_week),
          (end_year, end_month, end_week)
        )?
      }
    };

    self.apply_order(range)
  }

  fn apply_order(
    &self,
    range: DateRange
  ) -> Result<DateRange, PeriodRejection> {
    if range.is_ordered() {
      return Ok(range);
    }

    match self.order {
      | OrderPolicy::Passthrough => {
        debug!(%range, "passing inverted range through");
        Ok(range)
      }
      | OrderPolicy::Swap => {
        debug!(%range, "swapping inverted range");
        Ok(range.swapped())
      }
      | OrderPolicy::Reject => {
        Err(
          PeriodRejection::InvertedRange {
            start: range.start,
            end:   range.end
          }
        )
      }
    }
  }
}

/// Resolves with the default passthrough
/// ordering.
pub fn resolve(
  selection: &PeriodSelection
) -> Result<DateRange, PeriodRejection> {
  PeriodRangeResolver::default()
    .resolve(selection)
}

/// ISO week of day 1 of the month, advanced
/// by `week_in_month - 1`. Not a calendar
/// standard: January can start from week 52
/// or 53 of the previous ISO year.
pub fn absolute_week(
  year: i32,
  month: u32,
  week_in_month: u32
) -> Option<u32> {
  let first =
    YearMonth::new(year, month)?
      .first_day();
  first
    .iso_week()
    .week()
    .checked_add(
      week_in_month.checked_sub(1)?
    )
}

fn resolve_weeks(
  (start_year, start_month, start_week): (
    i32,
    u32,
    u32
  ),
  (end_year, end_month, end_week): (
    i32,
    u32,
    u32
  )
) -> Result<DateRange, PeriodRejection> {
  let start_month_bounds =
    year_month(start_year, start_month)?;
  let end_month_bounds =
    year_month(end_year, end_month)?;

  let start = week_day(
    start_year,
    start_month,
    start_week,
    Weekday::Mon
  );
  let end = week_day(
    end_year,
    end_month,
    end_week,
    Weekday::Sun
  );

  match (start, end) {
    | (Some(start), Some(end)) => {
      Ok(DateRange { start, end })
    }
    | _ => {
      let fallback = DateRange {
        start: start_month_bounds
          .first_day(),
        end:   end_month_bounds.last_day()
      };
      debug!(
        start_found = start.is_some(),
        end_found = end.is_some(),
        %fallback,
        "week outside ISO year; using \
         whole months"
      );
      Ok(fallback)
    }
  }
}

fn week_day(
  year: i32,
  month: u32,
  week_in_month: u32,
  weekday: Weekday
) -> Option<NaiveDate> {
  let week = absolute_week(
    year,
    month,
    week_in_month
  )?;
  NaiveDate::from_isoywd_opt(
    year, week, weekday
  )
}
