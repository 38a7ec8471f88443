use crate::day::{CalendarDay, DayKey, is_same_day};
use crate::store::NotesStore;

/// Display bucket of a single day. Note tiers win over past/future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayStatus {
    Dead,
    Future,
    Level1,
    Level2,
    Level3,
    Level4,
}

impl DayStatus {
    pub fn as_class(self) -> &'static str {
        match self {
            DayStatus::Dead => "dead",
            DayStatus::Future => "future",
            DayStatus::Level1 => "level-1",
            DayStatus::Level2 => "level-2",
            DayStatus::Level3 => "level-3",
            DayStatus::Level4 => "level-4",
        }
    }

    /// Note tier from 1 to 4, if any.
    pub fn level(self) -> Option<u8> {
        match self {
            DayStatus::Level1 => Some(1),
            DayStatus::Level2 => Some(2),
            DayStatus::Level3 => Some(3),
            DayStatus::Level4 => Some(4),
            DayStatus::Dead | DayStatus::Future => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayState {
    pub status: DayStatus,
    pub today: bool,
}

impl DayState {
    pub fn classes(&self) -> Vec<&'static str> {
        let mut classes = vec![self.status.as_class()];
        if self.today {
            classes.push("today");
        }
        classes
    }
}

/// What the rendering side needs for one visible day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayView {
    pub day: CalendarDay,
    pub key: DayKey,
    pub state: DayState,
    pub note_count: usize,
}

pub fn classify(today: CalendarDay, day: CalendarDay, note_count: usize) -> DayState {
    let status = match note_count {
        0 if day < today => DayStatus::Dead,
        0 => DayStatus::Future,
        1 => DayStatus::Level1,
        2 => DayStatus::Level2,
        3 => DayStatus::Level3,
        _ => DayStatus::Level4,
    };

    DayState {
        status,
        today: is_same_day(day, today),
    }
}

/// Recomputes the state of every day in `days`. Safe to call on any tick.
pub fn refresh<I>(today: CalendarDay, days: I, notes: &NotesStore) -> Vec<DayView>
where
    I: IntoIterator<Item = CalendarDay>,
{
    days.into_iter()
        .map(|day| {
            let key = day.key();
            let note_count = notes.count(&key);
            DayView {
                day,
                key,
                state: classify(today, day, note_count),
                note_count,
            }
        })
        .collect()
}
