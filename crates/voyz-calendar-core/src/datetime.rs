use std::fmt;
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  Days,
  Duration,
  Months,
  NaiveDate,
  Weekday
};
use regex::Regex;
use serde::{
  Deserialize,
  Serialize
};

pub const ISO_DATE_FORMAT: &str =
  "%Y-%m-%d";

/// A calendar month, stored as its first
/// day. Only months whose padded six-week
/// grid fits inside chrono's calendar are
/// constructible.
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
#[serde(
  into = "String",
  try_from = "String"
)]
pub struct YearMonth(NaiveDate);

/// Days a grid may reach before day 1 and
/// after the last day of its month.
const GRID_LEAD_DAYS: u64 = 7;
const GRID_TRAIL_DAYS: u64 = 14;

impl YearMonth {
  pub fn new(
    year: i32,
    month: u32
  ) -> Option<Self> {
    let first = NaiveDate::from_ymd_opt(
      year, month, 1
    )?;
    let last = NaiveDate::from_ymd_opt(
      year,
      month,
      days_in_month(year, month)
    )?;
    first.checked_sub_days(Days::new(
      GRID_LEAD_DAYS
    ))?;
    last.checked_add_days(Days::new(
      GRID_TRAIL_DAYS
    ))?;
    Some(Self(first))
  }

  /// Clamps to the earliest or latest
  /// supported month at the calendar
  /// limits.
  #[must_use]
  pub fn from_date(
    date: NaiveDate
  ) -> Self {
    Self::new(date.year(), date.month())
      .unwrap_or_else(|| {
        if date.year() < 0 {
          Self::earliest()
        } else {
          Self::latest()
        }
      })
  }

  #[must_use]
  pub fn earliest() -> Self {
    Self(
      NaiveDate::MIN
        .with_day(1)
        .and_then(|first| {
          first.checked_add_months(
            Months::new(1)
          )
        })
        .unwrap_or(NaiveDate::MIN)
    )
  }

  #[must_use]
  pub fn latest() -> Self {
    Self(
      NaiveDate::MAX
        .with_day(1)
        .and_then(|first| {
          first.checked_sub_months(
            Months::new(1)
          )
        })
        .unwrap_or(NaiveDate::MAX)
    )
  }

  #[must_use]
  pub fn year(self) -> i32 {
    self.0.year()
  }

  #[must_use]
  pub fn month(self) -> u32 {
    self.0.month()
  }

  #[must_use]
  pub fn first_day(self) -> NaiveDate {
    self.0
  }

  #[must_use]
  pub fn last_day(self) -> NaiveDate {
    self
      .0
      .with_day(days_in_month(
        self.year(),
        self.month()
      ))
      .unwrap_or(self.0)
  }

  #[must_use]
  pub fn day_count(self) -> u32 {
    days_in_month(
      self.year(),
      self.month()
    )
  }

  #[must_use]
  pub fn next(self) -> Self {
    self.shift(1)
  }

  #[must_use]
  pub fn previous(self) -> Self {
    self.shift(-1)
  }

  /// Saturates at the ends of the
  /// representable calendar.
  #[must_use]
  pub fn shift(
    self,
    months: i32
  ) -> Self {
    let step =
      Months::new(months.unsigned_abs());
    let shifted = if months >= 0 {
      self.0.checked_add_months(step)
    } else {
      self.0.checked_sub_months(step)
    };
    shifted
      .and_then(|first| {
        Self::new(
          first.year(),
          first.month()
        )
      })
      .unwrap_or(self)
  }

  /// Signed number of month boundaries
  /// crossed going from `self` to
  /// `other`.
  #[must_use]
  pub fn months_until(
    self,
    other: Self
  ) -> i64 {
    (i64::from(other.year())
      - i64::from(self.year()))
      * 12
      + i64::from(other.month())
      - i64::from(self.month())
  }
}

impl fmt::Display for YearMonth {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:04}-{:02}",
      self.year(),
      self.month()
    )
  }
}

impl FromStr for YearMonth {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let month_re = Regex::new(
      r"^(?P<year>-?\d{1,6})-(?P<month>\d{1,2})$"
    )
    .map_err(|e| {
      anyhow!(
        "internal regex compile \
         failure: {e}"
      )
    })?;
    let caps = month_re
      .captures(s.trim())
      .ok_or_else(|| {
        anyhow!(
          "expected YYYY-MM, got: {s}"
        )
      })?;
    let year: i32 = caps["year"]
      .parse()
      .context("invalid year")?;
    let month: u32 = caps["month"]
      .parse()
      .context("invalid month")?;
    Self::new(year, month).ok_or_else(
      || {
        anyhow!(
          "month does not exist: {s}"
        )
      }
    )
  }
}

impl From<YearMonth> for String {
  fn from(value: YearMonth) -> Self {
    value.to_string()
  }
}

impl TryFrom<String> for YearMonth {
  type Error = anyhow::Error;

  fn try_from(
    value: String
  ) -> Result<Self, Self::Error> {
    value.parse()
  }
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  match month {
    | 4 | 6 | 9 | 11 => 30,
    | 2 => {
      if NaiveDate::from_ymd_opt(
        year, 2, 29
      )
      .is_some()
      {
        29
      } else {
        28
      }
    }
    | _ => 31
  }
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

#[must_use]
pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = i64::from(
    day.weekday().num_days_from_monday()
  );
  let start_idx = i64::from(
    week_start.num_days_from_monday()
  );
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

#[must_use]
pub fn end_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  add_days(
    start_of_week(day, week_start),
    6
  )
}

#[must_use]
pub fn format_iso_date(
  date: NaiveDate
) -> String {
  date
    .format(ISO_DATE_FORMAT)
    .to_string()
}

/// Resolves a user supplied date
/// against an explicit `today`.
#[tracing::instrument(skip(today))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today);
    }
    | "tomorrow" => {
      return Ok(add_days(today, 1));
    }
    | "yesterday" => {
      return Ok(add_days(today, -1));
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dwm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps["num"]
      .parse()
      .context(
        "invalid relative number"
      )?;
    let signed = if &caps["sign"] == "-"
    {
      -num
    } else {
      num
    };

    return match &caps["unit"] {
      | "d" => {
        shift_days_checked(
          today, signed
        )
      }
      | "w" => {
        shift_days_checked(
          today,
          signed.saturating_mul(7)
        )
      }
      | "m" => {
        let months = i32::try_from(
          signed
        )
        .context(
          "relative month offset too \
           large"
        )?;
        shift_months_checked(
          today, months
        )
      }
      | unit => {
        Err(anyhow!(
          "unknown relative unit: \
           {unit}"
        ))
      }
    };
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      ISO_DATE_FORMAT
    )
  {
    return Ok(date);
  }

  Err(anyhow!(
    "unrecognized date expression: \
     {input}"
  ))
  .with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     +Nd/-Nd, +Nw/-Nw, +Nm/-Nm, \
     YYYY-MM-DD"
  })
}

fn shift_days_checked(
  date: NaiveDate,
  days: i64
) -> anyhow::Result<NaiveDate> {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .ok_or_else(|| {
      anyhow!(
        "date offset of {days} days \
         leaves the supported calendar"
      )
    })
}

fn shift_months_checked(
  date: NaiveDate,
  months: i32
) -> anyhow::Result<NaiveDate> {
  let step =
    Months::new(months.unsigned_abs());
  let shifted = if months >= 0 {
    date.checked_add_months(step)
  } else {
    date.checked_sub_months(step)
  };
  shifted.ok_or_else(|| {
    anyhow!(
      "date offset of {months} months \
       leaves the supported calendar"
    )
  })
}
