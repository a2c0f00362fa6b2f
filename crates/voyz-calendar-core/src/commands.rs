use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::annotate::{DayAnnotation, EventIndex, annotate_month, annotate_week, index_events, load_events};
use crate::cli::{Command, join_period};
use crate::config::Config;
use crate::datetime::{YearMonth, parse_date_expr};
use crate::grid::{build_month_grid, build_week_grid, shift_weeks};
use crate::label::{display_title, format_compact, format_label, parse_period};
use crate::period::{PeriodOptions, PeriodSelection, default_range, default_selection};
use crate::render::Renderer;
use crate::resolver::DateRange;

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub cfg: &'a Config,
    pub renderer: &'a Renderer,
    pub today: NaiveDate,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct MonthView {
    month: YearMonth,
    week_count: usize,
    days: Vec<DayAnnotation>,
}

#[derive(Debug, Serialize)]
struct WeekView {
    start: NaiveDate,
    end: NaiveDate,
    days: Vec<DayAnnotation>,
}

#[derive(Debug, Serialize)]
struct ResolvedView {
    selection: PeriodSelection,
    label: String,
    title: String,
    range: DateRange,
    days: i64,
}

#[derive(Debug, Serialize)]
struct ValidationView {
    selection: PeriodSelection,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct LabelView {
    selection: PeriodSelection,
    label: String,
    compact: String,
    title: String,
}

#[derive(Debug, Serialize)]
struct DefaultsView {
    today: NaiveDate,
    selection: PeriodSelection,
    range: DateRange,
    options: PeriodOptions,
}

#[instrument(skip(ctx, command))]
pub fn dispatch(ctx: &CommandContext<'_>, command: Option<Command>) -> anyhow::Result<()> {
    let command = command.unwrap_or(Command::Month {
        month: None,
        shift: 0,
        events: None,
    });
    debug!(?command, today = %ctx.today, json = ctx.json, "dispatching command");

    let mut out = io::stdout().lock();
    match command {
        Command::Month { month, shift, events } => {
            cmd_month(ctx, &mut out, month.as_deref(), shift, events.as_deref())
        }
        Command::Week { date, shift, events } => {
            cmd_week(ctx, &mut out, date.as_deref(), shift, events.as_deref())
        }
        Command::Resolve { period } => cmd_resolve(ctx, &mut out, &join_period(&period)),
        Command::Validate { period } => cmd_validate(ctx, &mut out, &join_period(&period)),
        Command::Label { period } => cmd_label(ctx, &mut out, &join_period(&period)),
        Command::Defaults => cmd_defaults(ctx, &mut out),
    }
}

pub fn cmd_month<W: Write>(
    ctx: &CommandContext<'_>,
    out: &mut W,
    month: Option<&str>,
    shift: i32,
    events: Option<&Path>,
) -> anyhow::Result<()> {
    info!("command month");

    let base = match month {
        Some(raw) => raw.parse::<YearMonth>()?,
        None => YearMonth::from_date(ctx.today),
    };
    let year_month = base.shift(shift);
    let grid = build_month_grid(year_month);
    let index = event_index(events)?;
    let annotations = annotate_month(&grid, &index, ctx.cfg.policies.marker_limit);

    if ctx.json {
        return write_json(
            out,
            &MonthView {
                month: year_month,
                week_count: grid.week_count(),
                days: annotations,
            },
        );
    }
    ctx.renderer.write_month(out, &grid, &annotations, ctx.today)
}

pub fn cmd_week<W: Write>(
    ctx: &CommandContext<'_>,
    out: &mut W,
    date: Option<&str>,
    shift: i64,
    events: Option<&Path>,
) -> anyhow::Result<()> {
    info!("command week");

    let reference = match date {
        Some(raw) => parse_date_expr(raw, ctx.today)?,
        None => ctx.today,
    };
    let grid = build_week_grid(shift_weeks(reference, shift));
    let index = event_index(events)?;
    let annotations = annotate_week(&grid, &index, ctx.cfg.policies.marker_limit);

    if ctx.json {
        return write_json(
            out,
            &WeekView {
                start: grid.start(),
                end: grid.end(),
                days: annotations,
            },
        );
    }
    ctx.renderer.write_week(out, &grid, &annotations, ctx.today)
}

/// Commits the selection against the configured limits, then resolves it.
/// A refused selection produces no range.
pub fn cmd_resolve<W: Write>(ctx: &CommandContext<'_>, out: &mut W, raw: &str) -> anyhow::Result<()> {
    info!("command resolve");

    let selection = parse_period(raw)?;
    let committed = ctx
        .cfg
        .validator()
        .commit(selection)
        .with_context(|| format!("period not accepted: {}", format_label(&selection)))?;
    let range = ctx.cfg.resolver().resolve(&committed)?;
    if !range.is_ordered() {
        warn!(%range, "resolved range is inverted");
    }

    if ctx.json {
        return write_json(
            out,
            &ResolvedView {
                selection: committed,
                label: format_label(&committed),
                title: display_title(&committed),
                range,
                days: range.day_count(),
            },
        );
    }
    ctx.renderer.write_range(out, &committed, &range)
}

pub fn cmd_validate<W: Write>(ctx: &CommandContext<'_>, out: &mut W, raw: &str) -> anyhow::Result<()> {
    info!("command validate");

    let selection = parse_period(raw)?;
    let outcome = ctx.cfg.validator().validate(&selection);

    if ctx.json {
        write_json(
            out,
            &ValidationView {
                selection,
                valid: outcome.is_ok(),
                reason: outcome.as_ref().err().map(ToString::to_string),
            },
        )?;
    } else {
        ctx.renderer
            .write_validation(out, &selection, outcome.as_ref().map(|_| ()))?;
    }

    outcome.map_err(anyhow::Error::from)
}

pub fn cmd_label<W: Write>(ctx: &CommandContext<'_>, out: &mut W, raw: &str) -> anyhow::Result<()> {
    info!("command label");

    let selection = parse_period(raw)?;
    selection.check_structure()?;

    if ctx.json {
        return write_json(
            out,
            &LabelView {
                selection,
                label: format_label(&selection),
                compact: format_compact(&selection),
                title: display_title(&selection),
            },
        );
    }
    ctx.renderer.write_label(out, &selection)
}

pub fn cmd_defaults<W: Write>(ctx: &CommandContext<'_>, out: &mut W) -> anyhow::Result<()> {
    info!("command defaults");

    let selection = default_selection(ctx.today);
    let range = default_range(ctx.today);
    let options = PeriodOptions::for_today(ctx.today);

    if ctx.json {
        return write_json(
            out,
            &DefaultsView {
                today: ctx.today,
                selection,
                range,
                options,
            },
        );
    }
    ctx.renderer.write_defaults(out, &selection, &range, &options)
}

fn event_index(path: Option<&Path>) -> anyhow::Result<EventIndex> {
    match path {
        Some(path) => Ok(index_events(load_events(path)?)),
        None => Ok(EventIndex::new()),
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    writeln!(out, "{text}")?;
    Ok(())
}
