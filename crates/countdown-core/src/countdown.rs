//! One countdown session: the resolved range plus everything derived from
//! it at startup.

use tracing::info;

use crate::classify::{DayView, refresh};
use crate::day::{CalendarDay, days_between};
use crate::error::CountdownError;
use crate::grid::{CalendarGrid, build_grid};
use crate::range::DateRange;
use crate::store::{CountdownStateStore, KeyValueStore, NotesStore, render_bullets};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownConfig {
    pub deadline: CalendarDay,
    pub start: CalendarDay,
}

impl CountdownConfig {
    /// Resolves the start through `store`, persisting it on first run.
    pub fn bootstrap<S: KeyValueStore>(
        store: &mut CountdownStateStore<S>,
        today: CalendarDay,
        deadline: CalendarDay,
    ) -> Self {
        let start = store.resolve_start(today, deadline);
        Self { deadline, start }
    }

    pub fn active_range(&self) -> DateRange {
        DateRange::new(self.start, self.deadline)
    }
}

#[derive(Debug, Clone)]
pub struct Countdown {
    config: CountdownConfig,
    timeline: Vec<CalendarDay>,
    grid: CalendarGrid,
}

impl Countdown {
    #[tracing::instrument(level = "debug")]
    pub fn new(config: CountdownConfig) -> Self {
        let range = config.active_range();
        let timeline = range.days();
        let grid = build_grid(range.start(), range.end_exclusive());
        info!(
            start = %config.start,
            deadline = %config.deadline,
            boxes = timeline.len(),
            weeks = grid.weeks().len(),
            "built countdown"
        );

        Self {
            config,
            timeline,
            grid,
        }
    }

    pub fn config(&self) -> &CountdownConfig {
        &self.config
    }

    pub fn timeline(&self) -> &[CalendarDay] {
        &self.timeline
    }

    pub fn grid(&self) -> &CalendarGrid {
        &self.grid
    }

    pub fn box_count(&self) -> usize {
        self.timeline.len()
    }

    /// Whole days left until the deadline, never negative.
    pub fn remaining_days(&self, today: CalendarDay) -> i64 {
        days_between(today, self.config.deadline).max(0)
    }

    pub fn has_arrived(&self, today: CalendarDay) -> bool {
        self.remaining_days(today) == 0
    }

    /// Active days already behind `today`.
    pub fn elapsed_days(&self, today: CalendarDay) -> usize {
        let elapsed = days_between(self.config.start, today).max(0);
        usize::try_from(elapsed)
            .unwrap_or(usize::MAX)
            .min(self.box_count())
    }

    pub fn ensure_active(&self, day: CalendarDay) -> Result<(), CountdownError> {
        if self.config.active_range().contains(day) {
            Ok(())
        } else {
            Err(CountdownError::OutOfRange {
                day,
                start: self.config.start,
                deadline: self.config.deadline,
            })
        }
    }

    pub fn day_views(&self, today: CalendarDay, notes: &NotesStore) -> Vec<DayView> {
        refresh(today, self.timeline.iter().copied(), notes)
    }

    /// Bullet list of the day's notes, `None` when there are none.
    pub fn note_lines(&self, notes: &NotesStore, day: CalendarDay) -> Option<String> {
        let items = notes.get(&day.key());
        if items.is_empty() {
            None
        } else {
            Some(render_bullets(items))
        }
    }

    /// Text an editor is pre-filled with: one note per line.
    pub fn editor_text(&self, notes: &NotesStore, day: CalendarDay) -> String {
        notes.get(&day.key()).join("\n")
    }

    /// Replaces the notes of an active day. Returns how many notes remain.
    pub fn edit_notes<S: KeyValueStore>(
        &self,
        store: &mut CountdownStateStore<S>,
        day: CalendarDay,
        raw: &str,
    ) -> anyhow::Result<usize> {
        self.ensure_active(day)?;
        let key = day.key();
        let notes = store.set_notes(key.clone(), raw)?;
        Ok(notes.count(&key))
    }

    pub fn clear_notes<S: KeyValueStore>(
        &self,
        store: &mut CountdownStateStore<S>,
        day: CalendarDay,
    ) -> anyhow::Result<bool> {
        self.ensure_active(day)?;
        store.clear_notes(&day.key())
    }
}
