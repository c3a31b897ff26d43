use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Integer cell coordinate inside the yard volume.
///
/// Coordinates are signed so that a malformed service payload with negative
/// values decodes and is then rejected by the bounds check instead of failing
/// as an opaque decode error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Position {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

pub const DEFAULT_X_MAX: u32 = 10;
pub const DEFAULT_Y_MAX: u32 = 10;
pub const DEFAULT_Z_MAX: u32 = 5;

/// Exclusive upper bounds of the yard along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YardDimensions {
    pub x_max: u32,
    pub y_max: u32,
    pub z_max: u32,
}

impl Default for YardDimensions {
    fn default() -> Self {
        Self {
            x_max: DEFAULT_X_MAX,
            y_max: DEFAULT_Y_MAX,
            z_max: DEFAULT_Z_MAX,
        }
    }
}

impl YardDimensions {
    pub const fn new(x_max: u32, y_max: u32, z_max: u32) -> Self {
        Self {
            x_max,
            y_max,
            z_max,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..i64::from(self.x_max)).contains(&position.x)
            && (0..i64::from(self.y_max)).contains(&position.y)
            && (0..i64::from(self.z_max)).contains(&position.z)
    }

    pub fn capacity(&self) -> u64 {
        u64::from(self.x_max) * u64::from(self.y_max) * u64::from(self.z_max)
    }
}

impl fmt::Display for YardDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x_max, self.y_max, self.z_max)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid yard dimensions '{0}': expected XxYxZ with positive integers")]
pub struct ParseDimensionsError(pub String);

impl FromStr for YardDimensions {
    type Err = ParseDimensionsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDimensionsError(raw.to_string());
        let parts = raw
            .trim()
            .split(['x', 'X'])
            .map(|part| part.trim().parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [x_max, y_max, z_max] if *x_max > 0 && *y_max > 0 && *z_max > 0 => {
                Ok(Self::new(*x_max, *y_max, *z_max))
            }
            _ => Err(invalid()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub position: Position,
}

impl Container {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: ContainerId::new(id),
            position,
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
