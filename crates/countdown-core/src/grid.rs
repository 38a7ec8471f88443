//! Week-aligned calendar grid over an active day range.

use tracing::debug;

use crate::day::{CalendarDay, add_days, end_of_week_sunday, start_of_week_monday};
use crate::range::{DateRange, build_range};

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub date: CalendarDay,
    pub active: bool,
}

/// Seven cells, Monday through Sunday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarWeek {
    cells: [GridCell; DAYS_PER_WEEK],
}

impl CalendarWeek {
    pub fn cells(&self) -> &[GridCell; DAYS_PER_WEEK] {
        &self.cells
    }

    pub fn monday(&self) -> CalendarDay {
        self.cells[0].date
    }

    pub fn sunday(&self) -> CalendarDay {
        self.cells[DAYS_PER_WEEK - 1].date
    }

    pub fn active_cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter().filter(|cell| cell.active)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarGrid {
    weeks: Vec<CalendarWeek>,
}

impl CalendarGrid {
    pub fn weeks(&self) -> &[CalendarWeek] {
        &self.weeks
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn first_day(&self) -> Option<CalendarDay> {
        self.weeks.first().map(CalendarWeek::monday)
    }

    pub fn last_day(&self) -> Option<CalendarDay> {
        self.weeks.last().map(CalendarWeek::sunday)
    }

    pub fn active_days(&self) -> impl Iterator<Item = CalendarDay> + '_ {
        self.weeks
            .iter()
            .flat_map(|week| week.active_cells().map(|cell| cell.date))
    }

    /// One optional label anchor per week.
    ///
    /// The first week is anchored on its first active day. Later weeks are
    /// anchored only when one of their active days is the 1st of a month, so
    /// a month whose 1st lies outside the active range gets no label.
    pub fn month_labels(&self) -> Vec<Option<CalendarDay>> {
        self.weeks
            .iter()
            .enumerate()
            .map(|(idx, week)| {
                let mut active = week.active_cells().map(|cell| cell.date);
                if idx == 0 {
                    active.next()
                } else {
                    active.find(|date| date.is_first_of_month())
                }
            })
            .collect()
    }
}

#[tracing::instrument(level = "debug")]
pub fn build_grid(active_start: CalendarDay, active_end_exclusive: CalendarDay) -> CalendarGrid {
    if active_end_exclusive <= active_start {
        return CalendarGrid::default();
    }

    let active = DateRange::new(active_start, active_end_exclusive);
    let grid_start = start_of_week_monday(active_start);
    let last_active_day = add_days(active_end_exclusive, -1);
    let grid_end_exclusive = add_days(end_of_week_sunday(last_active_day), 1);

    let days = build_range(grid_start, grid_end_exclusive);
    debug_assert_eq!(days.len() % DAYS_PER_WEEK, 0);

    let weeks: Vec<CalendarWeek> = days
        .chunks_exact(DAYS_PER_WEEK)
        .map(|chunk| CalendarWeek {
            cells: std::array::from_fn(|idx| GridCell {
                date: chunk[idx],
                active: active.contains(chunk[idx]),
            }),
        })
        .collect();

    debug!(
        grid_start = %grid_start,
        grid_end_exclusive = %grid_end_exclusive,
        weeks = weeks.len(),
        "built calendar grid"
    );

    CalendarGrid { weeks }
}
