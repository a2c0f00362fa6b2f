use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info
};

use crate::grid::{
  CalendarDay,
  MonthGrid,
  WeekGrid
};

pub const DEFAULT_MARKER_LIMIT: usize = 3;

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub struct CalendarEvent {
  pub date:    NaiveDate,
  pub title:   String,
  #[serde(default)]
  pub checked: bool
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct DayAnnotation {
  pub day:      CalendarDay,
  pub shown:    Vec<CalendarEvent>,
  pub overflow: usize
}

impl DayAnnotation {
  pub fn total(&self) -> usize {
    self.shown.len() + self.overflow
  }
}

pub type EventIndex =
  BTreeMap<NaiveDate, Vec<CalendarEvent>>;

/// Groups events by date. Within a day the
/// unchecked items come first; each group
/// keeps its input order.
#[must_use]
pub fn index_events(
  events: Vec<CalendarEvent>
) -> EventIndex {
  let mut index = EventIndex::new();
  for event in events {
    index
      .entry(event.date)
      .or_default()
      .push(event);
  }
  for entries in index.values_mut() {
    entries
      .sort_by_key(|event| event.checked);
  }
  index
}

#[must_use]
pub fn annotate_days(
  days: &[CalendarDay],
  events: &EventIndex,
  limit: usize
) -> Vec<DayAnnotation> {
  days
    .iter()
    .map(|day| {
      let entries = events
        .get(&day.date)
        .map(Vec::as_slice)
        .unwrap_or_default();
      let shown = entries
        .iter()
        .take(limit)
        .cloned()
        .collect::<Vec<_>>();
      DayAnnotation {
        day: *day,
        overflow: entries.len()
          - shown.len(),
        shown
      }
    })
    .collect()
}

pub fn annotate_month(
  grid: &MonthGrid,
  events: &EventIndex,
  limit: usize
) -> Vec<DayAnnotation> {
  annotate_days(grid.days(), events, limit)
}

pub fn annotate_week(
  grid: &WeekGrid,
  events: &EventIndex,
  limit: usize
) -> Vec<DayAnnotation> {
  annotate_days(grid.days(), events, limit)
}

#[tracing::instrument]
pub fn load_events(
  path: &Path
) -> anyhow::Result<Vec<CalendarEvent>> {
  let raw = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read events file {}",
        path.display()
      )
    })?;
  let events = serde_json::from_str::<
    Vec<CalendarEvent>
  >(&raw)
  .with_context(|| {
    format!(
      "failed to parse events file {}",
      path.display()
    )
  })?;

  info!(
    file = %path.display(),
    count = events.len(),
    "loaded calendar events"
  );
  debug!(?events, "calendar events");
  Ok(events)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use chrono::NaiveDate;

  use super::*;
  use crate::datetime::YearMonth;
  use crate::grid::{
    build_month_grid,
    build_week_grid
  };

  fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, d)
      .expect("valid date")
  }

  fn event(
    day: u32,
    title: &str,
    checked: bool
  ) -> CalendarEvent {
    CalendarEvent {
      date: date(day),
      title: title.to_string(),
      checked
    }
  }

  #[test]
  fn caps_markers_and_sorts_checked_last() {
    let index = index_events(vec![
      event(15, "inventory", true),
      event(15, "staff meeting", false),
      event(15, "liberation day menu", false),
      event(15, "deep clean", true),
      event(15, "supplier call", false),
      event(20, "tasting", false)
    ]);

    let grid = build_month_grid(
      YearMonth::new(2025, 8)
        .expect("valid month")
    );
    let annotated = annotate_month(
      &grid,
      &index,
      DEFAULT_MARKER_LIMIT
    );
    assert_eq!(
      annotated.len(),
      grid.days().len()
    );

    let busy = annotated
      .iter()
      .find(|a| a.day.date == date(15))
      .expect("day 15 in grid");
    let titles = busy
      .shown
      .iter()
      .map(|e| e.title.as_str())
      .collect::<Vec<_>>();
    assert_eq!(
      titles,
      vec![
        "staff meeting",
        "liberation day menu",
        "supplier call"
      ]
    );
    assert_eq!(busy.overflow, 2);
    assert_eq!(busy.total(), 5);

    let quiet = annotated
      .iter()
      .find(|a| a.day.date == date(3))
      .expect("day 3 in grid");
    assert!(quiet.shown.is_empty());
    assert_eq!(quiet.overflow, 0);
  }

  #[test]
  fn week_annotations_follow_grid_order() {
    let index = index_events(vec![
      event(12, "delivery", false)
    ]);
    let grid = build_week_grid(date(13));
    let annotated =
      annotate_week(&grid, &index, 1);
    assert_eq!(annotated.len(), 7);
    assert_eq!(annotated[0].day.date, date(10));
    assert_eq!(annotated[2].shown.len(), 1);
    assert_eq!(annotated[2].overflow, 0);
  }

  #[test]
  fn loads_events_from_json() {
    let mut file =
      tempfile::NamedTempFile::new()
        .expect("temp file");
    write!(
      file,
      r#"[{{"date":"2025-08-15","title":"광복절 특선"}},{{"date":"2025-08-16","title":"정산","checked":true}}]"#
    )
    .expect("write events");

    let events = load_events(file.path())
      .expect("load events");
    assert_eq!(events.len(), 2);
    assert!(!events[0].checked);
    assert!(events[1].checked);
  }
}
