pub mod config;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod poller;
pub mod service;
pub mod validator;

pub use config::CoordinatorConfig;
pub use coordinator::{SnapshotSubscription, YardState, YardStateCoordinator, YardSync};
pub use error::{GridError, PlacementError, YardError};
pub use grid::SpatialGrid;
pub use metrics::MetricsAggregator;
pub use poller::{ChannelPoller, PollerStopped, Schedule};
pub use service::{CsvUpload, HttpYardService, YardService};
pub use validator::PlacementValidator;
