use std::io::{self, Read, Write};
use std::thread;

use anyhow::{Context, anyhow};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::countdown::{Countdown, CountdownConfig};
use crate::day::{CalendarDay, Clock, add_days, decode_key};
use crate::render::Renderer;
use crate::store::{CountdownStateStore, KeyValueStore};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "show", "list", "notes", "edit", "clear", "export", "watch", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Resolves a day argument: `today`, `tomorrow`, `yesterday`, `+Nd`/`-Nd`
/// relative to today, or a `YYYY-MM-DD` key.
pub fn parse_day_arg(token: &str, today: CalendarDay) -> anyhow::Result<CalendarDay> {
    let lower = token.trim().to_ascii_lowercase();
    match lower.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(add_days(today, 1)),
        "yesterday" => return Ok(add_days(today, -1)),
        _ => {}
    }

    if let Some(offset) = parse_relative_days(&lower) {
        return Ok(add_days(today, offset));
    }

    decode_key(&lower).with_context(|| {
        format!("unrecognized day: {token} (expected today/tomorrow/yesterday, +Nd/-Nd or YYYY-MM-DD)")
    })
}

fn parse_relative_days(token: &str) -> Option<i64> {
    let (sign, rest) = match token.chars().next()? {
        '+' => (1, &token[1..]),
        '-' => (-1, &token[1..]),
        _ => return None,
    };
    let digits = rest.strip_suffix('d')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok().map(|n| sign * n)
}

#[instrument(skip(state, cfg, renderer, inv, clock, out), fields(command = %inv.command))]
pub fn dispatch<S, W>(
    state: &mut CountdownStateStore<S>,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
    clock: &dyn Clock,
    out: &mut W,
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    W: Write,
{
    match inv.command.as_str() {
        "help" => return cmd_help(out),
        "version" => {
            writeln!(out, "countdown {}", env!("CARGO_PKG_VERSION"))?;
            return Ok(());
        }
        _ => {}
    }

    let today = clock.today();
    let deadline = cfg.deadline()?;
    let config = CountdownConfig::bootstrap(state, today, deadline);
    let countdown = Countdown::new(config);

    debug!(
        today = %today,
        start = %config.start,
        deadline = %config.deadline,
        args = ?inv.command_args,
        "dispatching command"
    );

    match inv.command.as_str() {
        "show" => cmd_show(state, renderer, &countdown, today, out),
        "list" => cmd_list(state, renderer, &countdown, today, out),
        "notes" => cmd_notes(state, renderer, &countdown, today, &inv.command_args, out),
        "edit" => cmd_edit(state, renderer, &countdown, today, &inv.command_args, out),
        "clear" => cmd_clear(state, &countdown, today, &inv.command_args, out),
        "export" => cmd_export(state, out),
        "watch" => cmd_watch(state, cfg, renderer, &countdown, clock, &inv.command_args, out),
        other => Err(anyhow!("unsupported command: {other}")),
    }
}

fn cmd_show<S: KeyValueStore, W: Write>(
    state: &CountdownStateStore<S>,
    renderer: &Renderer,
    countdown: &Countdown,
    today: CalendarDay,
    out: &mut W,
) -> anyhow::Result<()> {
    renderer.write_headline(out, countdown, today)?;
    writeln!(out)?;
    renderer.write_grid(out, countdown, today, state.notes())
}

fn cmd_list<S: KeyValueStore, W: Write>(
    state: &CountdownStateStore<S>,
    renderer: &Renderer,
    countdown: &Countdown,
    today: CalendarDay,
    out: &mut W,
) -> anyhow::Result<()> {
    let views = countdown.day_views(today, state.notes());
    renderer.write_day_table(out, &views)
}

fn single_day_arg(args: &[String], today: CalendarDay, usage: &str) -> anyhow::Result<CalendarDay> {
    let token = args
        .first()
        .ok_or_else(|| anyhow!("missing day argument; usage: {usage}"))?;
    parse_day_arg(token, today)
}

fn cmd_notes<S: KeyValueStore, W: Write>(
    state: &CountdownStateStore<S>,
    renderer: &Renderer,
    countdown: &Countdown,
    today: CalendarDay,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let day = match args.first() {
        Some(token) => parse_day_arg(token, today)?,
        None => today,
    };
    renderer.write_notes(out, countdown, state.notes(), day)
}

#[instrument(skip(state, renderer, countdown, args, out))]
fn cmd_edit<S: KeyValueStore, W: Write>(
    state: &mut CountdownStateStore<S>,
    renderer: &Renderer,
    countdown: &Countdown,
    today: CalendarDay,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let day = single_day_arg(args, today, "edit <day> [line...]")?;

    let raw = if args.len() > 1 {
        args[1..].join("\n")
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read notes from stdin")?;
        buf
    };

    let count = countdown.edit_notes(state, day, &raw)?;
    info!(day = %day, count, "saved notes");
    renderer.write_notes(out, countdown, state.notes(), day)
}

#[instrument(skip(state, countdown, args, out))]
fn cmd_clear<S: KeyValueStore, W: Write>(
    state: &mut CountdownStateStore<S>,
    countdown: &Countdown,
    today: CalendarDay,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let day = single_day_arg(args, today, "clear <day>")?;
    if countdown.clear_notes(state, day)? {
        writeln!(out, "Cleared notes for {day}.")?;
    } else {
        writeln!(out, "No notes for {day}.")?;
    }
    Ok(())
}

fn cmd_export<S: KeyValueStore, W: Write>(
    state: &CountdownStateStore<S>,
    out: &mut W,
) -> anyhow::Result<()> {
    let payload =
        serde_json::to_string_pretty(state.notes()).context("failed to serialize notes")?;
    writeln!(out, "{payload}")?;
    Ok(())
}

fn parse_ticks(args: &[String]) -> anyhow::Result<Option<u64>> {
    let mut iter = args.iter();
    let mut ticks = None;
    while let Some(arg) = iter.next() {
        let value = if let Some(value) = arg.strip_prefix("--ticks=") {
            value.to_string()
        } else if arg == "--ticks" {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("--ticks requires a value"))?
        } else {
            return Err(anyhow!("unexpected watch argument: {arg}"));
        };
        ticks = Some(
            value
                .parse::<u64>()
                .with_context(|| format!("invalid --ticks value: {value}"))?,
        );
    }
    Ok(ticks)
}

/// Re-renders on every tick with the current day and the latest persisted
/// notes. The grid itself is built once.
#[instrument(skip(state, cfg, renderer, countdown, clock, args, out))]
fn cmd_watch<S: KeyValueStore, W: Write>(
    state: &CountdownStateStore<S>,
    cfg: &Config,
    renderer: &Renderer,
    countdown: &Countdown,
    clock: &dyn Clock,
    args: &[String],
    out: &mut W,
) -> anyhow::Result<()> {
    let ticks = parse_ticks(args)?;
    let interval = cfg.refresh_interval()?;
    info!(interval_secs = interval.as_secs(), ?ticks, "starting refresh loop");

    let mut tick: u64 = 0;
    loop {
        let today = clock.today();
        let notes = state.load_notes();
        if tick > 0 {
            writeln!(out)?;
        }
        renderer.write_headline(out, countdown, today)?;
        writeln!(out)?;
        renderer.write_grid(out, countdown, today, &notes)?;
        out.flush()?;

        tick += 1;
        debug!(tick, today = %today, "refreshed");
        if ticks.is_some_and(|limit| tick >= limit) {
            return Ok(());
        }
        thread::sleep(interval);
    }
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "usage: countdown [options] [command] [args]")?;
    writeln!(out)?;
    writeln!(out, "commands (unique prefixes accepted):")?;
    writeln!(out, "  show                  headline and calendar grid (default)")?;
    writeln!(out, "  list                  every day with its state and note count")?;
    writeln!(out, "  notes [day]           notes for a day")?;
    writeln!(out, "  edit <day> [line...]  replace a day's notes (stdin when no lines)")?;
    writeln!(out, "  clear <day>           delete a day's notes")?;
    writeln!(out, "  export                print all notes as JSON")?;
    writeln!(out, "  watch [--ticks N]     redraw every refresh.interval seconds")?;
    writeln!(out, "  help | version")?;
    writeln!(out)?;
    writeln!(out, "days: today, tomorrow, yesterday, +Nd, -Nd or YYYY-MM-DD")?;
    Ok(())
}
