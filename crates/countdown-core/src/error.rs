use thiserror::Error;

use crate::day::CalendarDay;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountdownError {
    #[error("invalid day key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("{day} is outside the countdown range {start}..{deadline}")]
    OutOfRange {
        day: CalendarDay,
        start: CalendarDay,
        deadline: CalendarDay,
    },
}

impl CountdownError {
    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
