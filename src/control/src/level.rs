use core::fmt;

use crate::DecodeError;

// One of the 16 throttle settings, 0 is full output and 15 is the most curtailed
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash)]
pub struct Level(u8);

impl Level {
    pub const COUNT: usize = 16;
    pub const MAX_OUTPUT: Level = Level(0);
    pub const MAX_CURTAILMENT: Level = Level(15);

    /// Returns `None` for anything outside `0..=15`. Out-of-range levels are
    /// never clamped.
    pub const fn new(value: u8) -> Option<Self> {
        if value as usize >= Self::COUNT {
            return None;
        }
        Some(Self(value))
    }

    pub fn all() -> impl Iterator<Item = Level> {
        (0..Self::COUNT as u8).map(Level)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The four output lines, bit 0 drives relay 0.
    pub const fn bits(self) -> [bool; 4] {
        [
            self.0 & 0x01 != 0,
            self.0 & 0x02 != 0,
            self.0 & 0x04 != 0,
            self.0 & 0x08 != 0,
        ]
    }

    /// Parses the decimal text sent on the level command channel.
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = core::str::from_utf8(payload).map_err(|_| DecodeError::InvalidLevel)?;
        let value: u8 = text.trim().parse().map_err(|_| DecodeError::InvalidLevel)?;
        Self::new(value).ok_or(DecodeError::InvalidLevel)
    }
}

impl TryFrom<u8> for Level {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(DecodeError::InvalidLevel)
    }
}

impl From<Level> for u8 {
    fn from(value: Level) -> u8 {
        value.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
