use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  NaiveDate
};
use regex::{
  Captures,
  Regex
};
use tracing::trace;

use crate::period::PeriodSelection;

const YEAR_PREFIX: &str = "연도:";
const MONTH_PREFIX: &str = "월:";
const WEEK_PREFIX: &str = "주:";

/// Selector label, e.g.
/// `주: 2025 8월 2주차 ~ 2025 8월 3주차`.
#[must_use]
pub fn format_label(
  selection: &PeriodSelection
) -> String {
  match *selection {
    | PeriodSelection::Year {
      start_year,
      end_year
    } => {
      format!(
        "{YEAR_PREFIX} {start_year} ~ \
         {end_year}"
      )
    }
    | PeriodSelection::Month {
      start_year,
      start_month,
      end_year,
      end_month
    } => {
      format!(
        "{MONTH_PREFIX} {start_year} \
         {start_month}월 ~ {end_year} \
         {end_month}월"
      )
    }
    | PeriodSelection::Week {
      start_year,
      start_month,
      start_week,
      end_year,
      end_month,
      end_week
    } => {
      format!(
        "{WEEK_PREFIX} {start_year} \
         {start_month}월 {start_week}주차 \
         ~ {end_year} {end_month}월 \
         {end_week}주차"
      )
    }
  }
}

#[tracing::instrument]
pub fn parse_label(
  raw: &str
) -> anyhow::Result<PeriodSelection> {
  let label = raw.trim();

  let year_re = Regex::new(
    r"^연도:\s*(?P<sy>-?\d+)\s*~\s*(?P<ey>-?\d+)$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  if let Some(caps) =
    year_re.captures(label)
  {
    return Ok(PeriodSelection::Year {
      start_year: capture(&caps, "sy")?,
      end_year:   capture(&caps, "ey")?
    });
  }

  let month_re = Regex::new(
    r"^월:\s*(?P<sy>-?\d+)\s+(?P<sm>\d{1,2})월\s*~\s*(?P<ey>-?\d+)\s+(?P<em>\d{1,2})월$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  if let Some(caps) =
    month_re.captures(label)
  {
    return Ok(PeriodSelection::Month {
      start_year:  capture(&caps, "sy")?,
      start_month: capture(&caps, "sm")?,
      end_year:    capture(&caps, "ey")?,
      end_month:   capture(&caps, "em")?
    });
  }

  let week_re = Regex::new(
    r"^주:\s*(?P<sy>-?\d+)\s+(?P<sm>\d{1,2})월\s+(?P<sw>\d{1,2})주차\s*~\s*(?P<ey>-?\d+)\s+(?P<em>\d{1,2})월\s+(?P<ew>\d{1,2})주차$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  if let Some(caps) =
    week_re.captures(label)
  {
    return Ok(PeriodSelection::Week {
      start_year:  capture(&caps, "sy")?,
      start_month: capture(&caps, "sm")?,
      start_week:  capture(&caps, "sw")?,
      end_year:    capture(&caps, "ey")?,
      end_month:   capture(&caps, "em")?,
      end_week:    capture(&caps, "ew")?
    });
  }

  Err(anyhow!(
    "unrecognized period label: {raw}"
  ))
}

/// Short form used on the command line:
/// `2023..2025`, `2025-03..2025-08`,
/// `2025-08w2..2025-08w3`.
#[must_use]
pub fn format_compact(
  selection: &PeriodSelection
) -> String {
  match *selection {
    | PeriodSelection::Year {
      start_year,
      end_year
    } => format!("{start_year}..{end_year}"),
    | PeriodSelection::Month {
      start_year,
      start_month,
      end_year,
      end_month
    } => {
      format!(
        "{start_year}-{start_month:02}..\
         {end_year}-{end_month:02}"
      )
    }
    | PeriodSelection::Week {
      start_year,
      start_month,
      start_week,
      end_year,
      end_month,
      end_week
    } => {
      format!(
        "{start_year}-{start_month:02}w\
         {start_week}..{end_year}-\
         {end_month:02}w{end_week}"
      )
    }
  }
}

pub fn parse_compact(
  raw: &str
) -> anyhow::Result<PeriodSelection> {
  let token = raw.trim();
  let compact_re = Regex::new(
    r"^(?P<sy>-?\d+)(?:-(?P<sm>\d{1,2})(?:w(?P<sw>\d{1,2}))?)?\.\.(?P<ey>-?\d+)(?:-(?P<em>\d{1,2})(?:w(?P<ew>\d{1,2}))?)?$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  let caps = compact_re
    .captures(token)
    .ok_or_else(|| {
      anyhow!(
        "expected Y..Y, Y-M..Y-M or \
         Y-MwN..Y-MwN, got: {raw}"
      )
    })?;

  let start_year = capture(&caps, "sy")?;
  let end_year = capture(&caps, "ey")?;
  let start_month = optional(&caps, "sm")?;
  let end_month = optional(&caps, "em")?;
  let start_week = optional(&caps, "sw")?;
  let end_week = optional(&caps, "ew")?;

  match (
    start_month,
    start_week,
    end_month,
    end_week
  ) {
    | (None, None, None, None) => {
      Ok(PeriodSelection::Year {
        start_year,
        end_year
      })
    }
    | (Some(start_month), None, Some(end_month), None) => {
      Ok(PeriodSelection::Month {
        start_year,
        start_month,
        end_year,
        end_month
      })
    }
    | (
      Some(start_month),
      Some(start_week),
      Some(end_month),
      Some(end_week)
    ) => {
      Ok(PeriodSelection::Week {
        start_year,
        start_month,
        start_week,
        end_year,
        end_month,
        end_week
      })
    }
    | _ => {
      Err(anyhow!(
        "both ends of a period must use \
         the same granularity: {raw}"
      ))
    }
  }
}

/// Accepts either the compact form or a
/// selector label.
pub fn parse_period(
  raw: &str
) -> anyhow::Result<PeriodSelection> {
  let trimmed = raw.trim();
  if trimmed.contains(':') {
    return parse_label(trimmed);
  }
  trace!(input = %trimmed, "parsing compact period");
  parse_compact(trimmed)
}

impl FromStr for PeriodSelection {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    parse_period(s)
  }
}

/// Heading shown above a chart for the
/// committed selection.
#[must_use]
pub fn display_title(
  selection: &PeriodSelection
) -> String {
  match *selection {
    | PeriodSelection::Year {
      start_year,
      end_year
    } => {
      format!(
        "{start_year}년 ~ {end_year}년"
      )
    }
    | PeriodSelection::Month {
      start_year,
      start_month,
      end_year,
      end_month
    } => {
      format!(
        "{start_year} {start_month}월 ~ \
         {end_year} {end_month}월"
      )
    }
    | PeriodSelection::Week {
      start_year,
      start_month,
      start_week,
      end_year,
      end_month,
      end_week
    } => {
      format!(
        "{start_year}년 {start_month}월 \
         {start_week}주차 ~ {end_year}년 \
         {end_month}월 {end_week}주차"
      )
    }
  }
}

/// `8월 2주차` style label; weeks are
/// seven-day buckets counted from day 1.
#[must_use]
pub fn month_week_label(
  date: NaiveDate
) -> String {
  let week = (date.day() - 1) / 7 + 1;
  format!("{}월 {week}주차", date.month())
}

fn capture<T>(
  caps: &Captures<'_>,
  name: &str
) -> anyhow::Result<T>
where
  T: FromStr,
  T::Err: std::error::Error
    + Send
    + Sync
    + 'static
{
  let raw = caps
    .name(name)
    .map(|m| m.as_str())
    .ok_or_else(|| {
      anyhow!("missing {name} field")
    })?;
  raw.parse::<T>().with_context(|| {
    format!("invalid {name} value: {raw}")
  })
}

fn optional<T>(
  caps: &Captures<'_>,
  name: &str
) -> anyhow::Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error
    + Send
    + Sync
    + 'static
{
  if caps.name(name).is_none() {
    return Ok(None);
  }
  capture(caps, name).map(Some)
}
