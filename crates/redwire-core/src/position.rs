use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Immutable block coordinate. Identity of a chain node and key of the network index.
///
/// Ordering is lexicographic on (x, y, z); the lower end of a connection is the
/// one that reports it to read-only consumers so each cable is seen once.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean distance, saturating at `u64::MAX` for coordinates at the i32 extremes.
    pub fn distance_squared(self, other: Position) -> u64 {
        let dx = i128::from(self.x) - i128::from(other.x);
        let dy = i128::from(self.y) - i128::from(other.y);
        let dz = i128::from(self.z) - i128::from(other.z);
        u64::try_from(dx * dx + dy * dy + dz * dz).unwrap_or(u64::MAX)
    }

    /// True if `other` lies within `max` blocks (inclusive).
    pub fn is_within(self, other: Position, max: u32) -> bool {
        let max = u64::from(max);
        self.distance_squared(other) <= max * max
    }

    /// Saturates at the i32 bounds.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// The six face-adjacent positions: down, up, north, south, west, east.
    pub fn neighbors(self) -> [Position; 6] {
        [
            self.offset(0, -1, 0),
            self.offset(0, 1, 0),
            self.offset(0, 0, -1),
            self.offset(0, 0, 1),
            self.offset(-1, 0, 0),
            self.offset(1, 0, 0),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePositionError(String);

impl fmt::Display for ParsePositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid position '{}': expected x,y,z", self.0)
    }
}

impl std::error::Error for ParsePositionError {}

impl FromStr for Position {
    type Err = ParsePositionError;

    /// Parses `x,y,z` (whitespace around components is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePositionError(s.to_string());
        let mut parts = s.split(',').map(|p| p.trim().parse::<i32>());
        let x = parts.next().ok_or_else(err)?.map_err(|_| err())?;
        let y = parts.next().ok_or_else(err)?.map_err(|_| err())?;
        let z = parts.next().ok_or_else(err)?.map_err(|_| err())?;
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self::new(x, y, z))
    }
}
