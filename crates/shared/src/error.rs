use std::fmt;

use serde::{Deserialize, Serialize};

/// Classified failure reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    OutOfBounds,
    PositionOccupied,
    DuplicateId,
    NotFound,
    InvariantViolation,
    NetworkFailure,
    DecodeFailure,
    ServerRejected,
}

impl ErrorKind {
    /// Local errors are decided against the in-memory grid and never reach the network.
    pub fn is_local(self) -> bool {
        matches!(
            self,
            Self::OutOfBounds | Self::PositionOccupied | Self::DuplicateId | Self::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::OutOfBounds => "out_of_bounds",
            Self::PositionOccupied => "position_occupied",
            Self::DuplicateId => "duplicate_id",
            Self::NotFound => "not_found",
            Self::InvariantViolation => "invariant_violation",
            Self::NetworkFailure => "network_failure",
            Self::DecodeFailure => "decode_failure",
            Self::ServerRejected => "server_rejected",
        };
        f.write_str(label)
    }
}

/// Error body returned by the yard service alongside non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceErrorBody {
    pub error: String,
}

impl ServiceErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
