use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::classify::{DayState, DayStatus, DayView};
use crate::config::Config;
use crate::countdown::Countdown;
use crate::day::CalendarDay;
use crate::grid::GridCell;
use crate::store::NotesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFlavor {
    Long,
    MonthShort,
    Weekday,
    WeekdayShort,
}

/// Locale-specific date text.
pub trait DateFormatter {
    fn format(&self, day: CalendarDay, flavor: DateFlavor) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishDates;

impl DateFormatter for EnglishDates {
    fn format(&self, day: CalendarDay, flavor: DateFlavor) -> String {
        let pattern = match flavor {
            DateFlavor::Long => "%-d %B %Y",
            DateFlavor::MonthShort => "%b",
            DateFlavor::Weekday => "%A",
            DateFlavor::WeekdayShort => "%a",
        };
        day.date().format(pattern).to_string()
    }
}

pub struct Renderer {
    color: bool,
    label: String,
    dates: Box<dyn DateFormatter>,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
            label: cfg.label(),
            dates: Box::new(EnglishDates),
        })
    }

    pub fn plain(label: &str, dates: Box<dyn DateFormatter>) -> Self {
        Self {
            color: false,
            label: label.to_string(),
            dates,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn write_headline<W: Write>(
        &self,
        out: &mut W,
        countdown: &Countdown,
        today: CalendarDay,
    ) -> anyhow::Result<()> {
        let remaining = countdown.remaining_days(today);
        let title = if countdown.has_arrived(today) {
            format!("The {} day has arrived!", self.label)
        } else {
            let unit = if remaining == 1 { "day" } else { "days" };
            format!("{remaining} {unit} left until {}", self.label)
        };

        writeln!(out, "{}", self.paint(&title, "1"))?;
        writeln!(
            out,
            "Target date: {}",
            self.dates.format(countdown.config().deadline, DateFlavor::Long)
        )?;
        writeln!(out, "Today: {}", self.dates.format(today, DateFlavor::Long))?;
        writeln!(
            out,
            "Total boxes: {} ({} behind)",
            countdown.box_count(),
            countdown.elapsed_days(today)
        )?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_grid<W: Write>(
        &self,
        out: &mut W,
        countdown: &Countdown,
        today: CalendarDay,
        notes: &NotesStore,
    ) -> anyhow::Result<()> {
        let grid = countdown.grid();
        let Some(first_week) = grid.weeks().first() else {
            writeln!(out, "(no days left to count)")?;
            return Ok(());
        };

        let header: Vec<String> = first_week
            .cells()
            .iter()
            .map(|cell| {
                let name = self.dates.format(cell.date, DateFlavor::WeekdayShort);
                format!("{:^3}", truncate_width(&name, 3))
            })
            .collect();
        writeln!(out, "{:5}{}", "", header.join(" "))?;

        let views = countdown.day_views(today, notes);
        let labels = grid.month_labels();
        for (week, label) in grid.weeks().iter().zip(labels) {
            let label = label
                .map(|day| self.dates.format(day, DateFlavor::MonthShort))
                .unwrap_or_default();
            let label = truncate_width(&label, 4);
            let padding = 5usize.saturating_sub(UnicodeWidthStr::width(label.as_str()));
            write!(out, "{label}{}", " ".repeat(padding))?;

            let cells: Vec<String> = week
                .cells()
                .iter()
                .map(|cell| self.cell_glyph(cell_state(cell, &views)))
                .collect();
            writeln!(out, "{}", cells.join(" "))?;
        }

        writeln!(
            out,
            "{:5}x past  . ahead  1-4 notes  [ ] today",
            ""
        )?;
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    pub fn write_day_table<W: Write>(&self, out: &mut W, views: &[DayView]) -> anyhow::Result<()> {
        let headers = vec![
            "Date".to_string(),
            "Weekday".to_string(),
            "State".to_string(),
            "Notes".to_string(),
        ];

        let rows = views
            .iter()
            .map(|view| {
                let state = view.state.classes().join(" ");
                vec![
                    view.key.to_string(),
                    self.dates.format(view.day, DateFlavor::Weekday),
                    self.paint(&state, status_color(view.state.status)),
                    view.note_count.to_string(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip_all)]
    pub fn write_notes<W: Write>(
        &self,
        out: &mut W,
        countdown: &Countdown,
        notes: &NotesStore,
        day: CalendarDay,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.dates.format(day, DateFlavor::Long))?;
        match countdown.note_lines(notes, day) {
            Some(lines) => writeln!(out, "{lines}")?,
            None => writeln!(out, "No notes yet.")?,
        }
        Ok(())
    }

    fn cell_glyph(&self, state: Option<DayState>) -> String {
        let Some(state) = state else {
            return "   ".to_string();
        };

        let mark = match state.status.level() {
            Some(level) => level.to_string(),
            None if state.status == DayStatus::Dead => "x".to_string(),
            None => ".".to_string(),
        };
        let glyph = if state.today {
            format!("[{mark}]")
        } else {
            format!(" {mark} ")
        };

        let code = if state.today {
            "1;4"
        } else {
            status_color(state.status)
        };
        self.paint(&glyph, code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || code.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn cell_state(cell: &GridCell, views: &[DayView]) -> Option<DayState> {
    if !cell.active {
        return None;
    }
    views
        .binary_search_by(|view| view.day.cmp(&cell.date))
        .ok()
        .map(|idx| views[idx].state)
}

fn status_color(status: DayStatus) -> &'static str {
    match status {
        DayStatus::Dead => "90",
        DayStatus::Future => "",
        DayStatus::Level1 => "32",
        DayStatus::Level2 => "36",
        DayStatus::Level3 => "33",
        DayStatus::Level4 => "35",
    }
}

fn truncate_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if UnicodeWidthStr::width(out.as_str()) > max {
            out.pop();
            break;
        }
    }
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::CountdownConfig;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).expect("valid date")
    }

    fn sample() -> Countdown {
        Countdown::new(CountdownConfig {
            start: day(2025, 1, 10),
            deadline: day(2025, 1, 22),
        })
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&Renderer, &mut Vec<u8>) -> anyhow::Result<()>,
    {
        let renderer = Renderer::plain("graduation", Box::new(EnglishDates));
        let mut out = Vec::new();
        f(&renderer, &mut out).expect("render");
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn english_formats() {
        let d = day(2027, 6, 1);
        assert_eq!(EnglishDates.format(d, DateFlavor::Long), "1 June 2027");
        assert_eq!(EnglishDates.format(d, DateFlavor::MonthShort), "Jun");
        assert_eq!(EnglishDates.format(d, DateFlavor::Weekday), "Tuesday");
        assert_eq!(EnglishDates.format(d, DateFlavor::WeekdayShort), "Tue");
    }

    #[test]
    fn headline_counts_down_and_arrives() {
        let countdown = sample();
        let text = render(|r, out| r.write_headline(out, &countdown, day(2025, 1, 21)));
        assert!(text.starts_with("1 day left until graduation\n"), "{text}");
        assert!(text.contains("Total boxes: 12 (11 behind)"), "{text}");

        let text = render(|r, out| r.write_headline(out, &countdown, day(2025, 1, 22)));
        assert!(text.starts_with("The graduation day has arrived!"), "{text}");
    }

    #[test]
    fn grid_marks_placeholders_notes_and_today() {
        let countdown = sample();
        let mut notes = NotesStore::default();
        notes.set_notes(day(2025, 1, 11).key(), "a\nb\nc");

        let text = render(|r, out| r.write_grid(out, &countdown, day(2025, 1, 13), &notes));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "     Mon Tue Wed Thu Fri Sat Sun");
        assert_eq!(lines[1], "Jan                   x   3   x ");
        assert_eq!(lines[2], "     [.]  .   .   .   .   .   . ");
        assert_eq!(lines[3], "      .   .                     ");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn notes_view_uses_bullets() {
        let countdown = sample();
        let mut notes = NotesStore::default();
        notes.set_notes(day(2025, 1, 12).key(), "* gown");

        let text = render(|r, out| r.write_notes(out, &countdown, &notes, day(2025, 1, 12)));
        assert_eq!(text, "12 January 2025\n• gown\n");

        let text = render(|r, out| r.write_notes(out, &countdown, &notes, day(2025, 1, 13)));
        assert_eq!(text, "13 January 2025\nNo notes yet.\n");
    }

    #[test]
    fn day_table_lists_states() {
        let countdown = sample();
        let views = countdown.day_views(day(2025, 1, 10), &NotesStore::default());
        let text = render(|r, out| r.write_day_table(out, &views[..2]));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2025-01-10 Friday   future today 0"), "{text}");
        assert!(lines[3].starts_with("2025-01-11 Saturday future"), "{text}");
    }
}
