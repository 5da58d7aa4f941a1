use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::DecodeError;

// Home Assistant publishes local time as e.g. `2024.3.9 17:05:40`
static CURRENT_TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year].[month padding:none].[day padding:none] [hour padding:none]:[minute padding:none]:[second padding:none]"
);

// Seconds between availability announcements
const ANNOUNCE_PERIOD: u8 = 10;

pub fn parse_current_time(payload: &[u8]) -> Result<PrimitiveDateTime, DecodeError> {
    let text = core::str::from_utf8(payload).map_err(|_| DecodeError::InvalidTime)?;
    PrimitiveDateTime::parse(text.trim(), CURRENT_TIME_FORMAT).map_err(|_| DecodeError::InvalidTime)
}

/// Whether this clock tick should republish the `online` availability.
pub fn should_announce(now: &PrimitiveDateTime) -> bool {
    now.second() % ANNOUNCE_PERIOD == 0
}
