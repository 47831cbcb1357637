//! Locations on the board.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::RuleError;

/// Highest seat number, and therefore highest city number.
pub const MAX_SEATS: u8 = 9;

/// A location: the central hub or the city owned by one seat.
///
/// On the wire a place is a bare integer: `0` for the hub, `n` for the
/// city of seat `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Place {
    /// The hub, adjacent to every city.
    Country,
    /// The home city of the given seat (1-based).
    City(u8),
}

impl Place {
    /// The home city of `seat`, if the seat number is in range.
    pub fn city(seat: u8) -> Option<Self> {
        (1..=MAX_SEATS).contains(&seat).then_some(Self::City(seat))
    }

    /// Returns `true` for the hub.
    pub fn is_hub(self) -> bool {
        matches!(self, Self::Country)
    }

    /// The hub touches every city; cities never touch each other, and no
    /// place is adjacent to itself.
    pub fn is_adjacent(self, other: Place) -> bool {
        matches!(
            (self, other),
            (Self::Country, Self::City(_)) | (Self::City(_), Self::Country)
        )
    }

    /// Every place that exists in a room with `seats` seats, hub first.
    pub fn all(seats: u8) -> impl Iterator<Item = Place> {
        std::iter::once(Self::Country).chain((1..=seats.min(MAX_SEATS)).map(Self::City))
    }
}

impl TryFrom<u8> for Place {
    type Error = RuleError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Country),
            n => Self::city(n).ok_or(RuleError::InvalidPlace(n)),
        }
    }
}

impl From<Place> for u8 {
    fn from(place: Place) -> Self {
        match place {
            Place::Country => 0,
            Place::City(n) => n,
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Country => write!(f, "Country"),
            Self::City(n) => write!(f, "City-{n}"),
        }
    }
}
