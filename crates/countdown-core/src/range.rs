use crate::day::{CalendarDay, add_days, days_between};

/// Half-open interval `[start, end_exclusive)` of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: CalendarDay,
    end_exclusive: CalendarDay,
}

impl DateRange {
    /// An inverted pair collapses to an empty range at `start`.
    pub fn new(start: CalendarDay, end_exclusive: CalendarDay) -> Self {
        Self {
            start,
            end_exclusive: end_exclusive.max(start),
        }
    }

    pub fn start(&self) -> CalendarDay {
        self.start
    }

    pub fn end_exclusive(&self) -> CalendarDay {
        self.end_exclusive
    }

    pub fn len(&self) -> usize {
        usize::try_from(days_between(self.start, self.end_exclusive)).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end_exclusive
    }

    pub fn contains(&self, day: CalendarDay) -> bool {
        day >= self.start && day < self.end_exclusive
    }

    pub fn days(&self) -> Vec<CalendarDay> {
        build_range(self.start, self.end_exclusive)
    }
}

/// Consecutive days from `start` up to, never including, `end_exclusive`.
pub fn build_range(start: CalendarDay, end_exclusive: CalendarDay) -> Vec<CalendarDay> {
    let size = days_between(start, end_exclusive).max(0);
    (0..size).map(|offset| add_days(start, offset)).collect()
}
