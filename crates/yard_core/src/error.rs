use shared::{
    domain::{ContainerId, Position, YardDimensions},
    error::ErrorKind,
};
use thiserror::Error;

/// Rejections decided locally against the spatial grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("position {position} is outside the yard bounds {dimensions}")]
    OutOfBounds {
        position: Position,
        dimensions: YardDimensions,
    },
    #[error("position {position} is already occupied by container {occupant}")]
    PositionOccupied {
        position: Position,
        occupant: ContainerId,
    },
    #[error("container {id} already exists at {existing}")]
    DuplicateId { id: ContainerId, existing: Position },
    #[error("container {0} not found")]
    NotFound(ContainerId),
    #[error("container set rejected: {0}")]
    InvariantViolation(String),
}

pub type PlacementError = GridError;

impl GridError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::PositionOccupied { .. } => ErrorKind::PositionOccupied,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
        }
    }
}

#[derive(Debug, Error)]
pub enum YardError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("yard service unreachable: {0}")]
    Network(String),
    #[error("malformed yard service response: {0}")]
    Decode(String),
    #[error("yard service rejected request with status {status}: {message}")]
    ServerRejected { status: u16, message: String },
}

impl YardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Grid(err) => err.kind(),
            Self::Network(_) => ErrorKind::NetworkFailure,
            Self::Decode(_) => ErrorKind::DecodeFailure,
            Self::ServerRejected { .. } => ErrorKind::ServerRejected,
        }
    }
}

impl From<reqwest::Error> for YardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::ServerRejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
