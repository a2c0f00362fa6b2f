use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate, Weekday};
use unicode_width::UnicodeWidthStr;

use crate::annotate::DayAnnotation;
use crate::config::Config;
use crate::datetime::format_iso_date;
use crate::grid::{GRID_WEEK_START, MonthGrid, WeekGrid};
use crate::label::{display_title, format_compact, format_label, month_week_label};
use crate::period::{PeriodOptions, PeriodRejection, PeriodSelection};
use crate::resolver::DateRange;

fn weekday_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Su",
        Weekday::Mon => "Mo",
        Weekday::Tue => "Tu",
        Weekday::Wed => "We",
        Weekday::Thu => "Th",
        Weekday::Fri => "Fr",
        Weekday::Sat => "Sa",
    }
}

/// Column names in grid order, starting from the grid's first weekday.
fn weekday_header() -> [&'static str; 7] {
    let mut day = GRID_WEEK_START;
    std::array::from_fn(|_| {
        let name = weekday_abbrev(day);
        day = day.succ();
        name
    })
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.display.color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, grid, annotations))]
    pub fn write_month<W: Write>(
        &self,
        out: &mut W,
        grid: &MonthGrid,
        annotations: &[DayAnnotation],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&grid.year_month().to_string(), "1"))?;
        writeln!(out, "{}", weekday_header().join(" "))?;

        for week in grid.weeks() {
            let cells = week
                .iter()
                .map(|day| {
                    let has_events = annotations
                        .iter()
                        .any(|a| a.day.date == day.date && a.total() > 0);
                    let text = format!("{:>2}", day.date.day());
                    let text = if day.date == today {
                        self.paint(&text, "7")
                    } else if !day.is_in_primary_period {
                        self.paint(&text, "2")
                    } else if has_events {
                        self.paint(&text, "33")
                    } else {
                        text
                    };
                    if has_events {
                        format!("{text}*")
                    } else {
                        format!("{text} ")
                    }
                })
                .collect::<Vec<_>>();
            writeln!(out, "{}", cells.join("").trim_end())?;
        }

        self.write_annotations(out, annotations)
    }

    #[tracing::instrument(skip(self, out, grid, annotations))]
    pub fn write_week<W: Write>(
        &self,
        out: &mut W,
        grid: &WeekGrid,
        annotations: &[DayAnnotation],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}",
            self.paint(
                &format!(
                    "{} ~ {}",
                    format_iso_date(grid.start()),
                    format_iso_date(grid.end())
                ),
                "1"
            )
        )?;

        let rows = grid
            .days()
            .iter()
            .zip(weekday_header())
            .map(|(day, name)| {
                let date = format_iso_date(day.date);
                let date = if day.date == today {
                    self.paint(&date, "7")
                } else {
                    date
                };
                let events = annotations
                    .iter()
                    .find(|a| a.day.date == day.date)
                    .map(summarize_events)
                    .unwrap_or_default();
                vec![
                    date,
                    name.to_string(),
                    month_week_label(day.date),
                    events,
                ]
            })
            .collect::<Vec<_>>();

        write_table(out, &["Date", "Day", "Week", "Events"], rows)
    }

    fn write_annotations<W: Write>(
        &self,
        out: &mut W,
        annotations: &[DayAnnotation],
    ) -> anyhow::Result<()> {
        let rows = annotations
            .iter()
            .filter(|a| a.total() > 0)
            .map(|a| {
                vec![
                    format_iso_date(a.day.date),
                    month_week_label(a.day.date),
                    summarize_events(a),
                ]
            })
            .collect::<Vec<_>>();
        if rows.is_empty() {
            return Ok(());
        }

        writeln!(out)?;
        write_table(out, &["Date", "Week", "Events"], rows)
    }

    pub fn write_range<W: Write>(
        &self,
        out: &mut W,
        selection: &PeriodSelection,
        range: &DateRange,
    ) -> anyhow::Result<()> {
        let (start, end) = range.to_query_params();
        let span = if range.is_ordered() {
            format!("{} days", range.day_count())
        } else {
            self.paint("inverted", "31")
        };

        writeln!(out, "period  {}", format_compact(selection))?;
        writeln!(out, "title   {}", display_title(selection))?;
        writeln!(out, "range   {range}")?;
        writeln!(out, "span    {span}")?;
        writeln!(out, "query   start={start} end={end}")?;
        Ok(())
    }

    pub fn write_validation<W: Write>(
        &self,
        out: &mut W,
        selection: &PeriodSelection,
        outcome: Result<(), &PeriodRejection>,
    ) -> anyhow::Result<()> {
        match outcome {
            Ok(()) => writeln!(
                out,
                "{}  {}",
                self.paint("valid", "32"),
                format_label(selection)
            )?,
            Err(reason) => writeln!(
                out,
                "{}  {}: {reason}",
                self.paint("rejected", "31"),
                format_label(selection)
            )?,
        }
        Ok(())
    }

    pub fn write_label<W: Write>(
        &self,
        out: &mut W,
        selection: &PeriodSelection,
    ) -> anyhow::Result<()> {
        writeln!(out, "label    {}", format_label(selection))?;
        writeln!(out, "compact  {}", format_compact(selection))?;
        writeln!(out, "title    {}", display_title(selection))?;
        Ok(())
    }

    pub fn write_defaults<W: Write>(
        &self,
        out: &mut W,
        selection: &PeriodSelection,
        range: &DateRange,
        options: &PeriodOptions,
    ) -> anyhow::Result<()> {
        let join = |values: Vec<String>| values.join(" ");

        writeln!(out, "selection  {}", format_label(selection))?;
        writeln!(out, "range      {range}")?;
        writeln!(
            out,
            "years      {}",
            join(options.years.iter().map(ToString::to_string).collect())
        )?;
        writeln!(
            out,
            "months     {}",
            join(options.months.iter().map(ToString::to_string).collect())
        )?;
        writeln!(
            out,
            "weeks      {}",
            join(options.weeks.iter().map(ToString::to_string).collect())
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn summarize_events(annotation: &DayAnnotation) -> String {
    let mut text = annotation
        .shown
        .iter()
        .map(|event| {
            if event.checked {
                format!("[x] {}", event.title)
            } else {
                event.title.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    if annotation.overflow > 0 {
        text.push_str(&format!(" +{}", annotation.overflow));
    }
    text
}

/// Writes aligned columns. Cell widths ignore the color codes added by
/// `Renderer::paint`.
fn write_table<W: Write>(
    mut writer: W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let widths = (0..headers.len())
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| visible_width(cell))
                .fold(visible_width(headers[col]), usize::max)
        })
        .collect::<Vec<_>>();

    writeln!(writer, "{}", table_line(headers.iter().copied(), &widths))?;
    let rule = widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>();
    writeln!(writer, "{}", rule.join(" "))?;
    for row in &rows {
        writeln!(writer, "{}", table_line(row.iter().map(String::as_str), &widths))?;
    }
    Ok(())
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| {
            let fill = width.saturating_sub(visible_width(cell));
            format!("{cell}{}", " ".repeat(fill))
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end()
        .to_string()
}

/// Display width of a cell, skipping `ESC [ <code> m` sequences.
fn visible_width(cell: &str) -> usize {
    let mut segments = cell.split('\x1b');
    let lead = segments.next().unwrap_or_default();
    let painted = segments.map(|seg| seg.split_once('m').map_or(seg, |(_, text)| text));
    std::iter::once(lead)
        .chain(painted)
        .map(UnicodeWidthStr::width)
        .sum()
}
