use std::time::Duration;

use shared::domain::YardDimensions;

use crate::poller::Schedule;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LOG_STREAM: &str = "app";

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    pub service_url: String,
    pub api_key: Option<String>,
    pub dimensions: YardDimensions,
    /// `None` keeps the containers+metrics channel on-demand.
    pub containers_interval: Option<Duration>,
    pub logs_interval: Duration,
    pub training_interval: Duration,
    pub request_timeout: Duration,
    pub log_stream: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            api_key: None,
            dimensions: YardDimensions::default(),
            containers_interval: None,
            logs_interval: DEFAULT_POLL_INTERVAL,
            training_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            log_stream: DEFAULT_LOG_STREAM.into(),
        }
    }
}

impl CoordinatorConfig {
    pub fn containers_schedule(&self) -> Schedule {
        match self.containers_interval {
            Some(period) if !period.is_zero() => Schedule::Every(period),
            _ => Schedule::OnDemand,
        }
    }

    pub fn logs_schedule(&self) -> Schedule {
        periodic(self.logs_interval)
    }

    pub fn training_schedule(&self) -> Schedule {
        periodic(self.training_interval)
    }
}

fn periodic(period: Duration) -> Schedule {
    if period.is_zero() {
        Schedule::Every(DEFAULT_POLL_INTERVAL)
    } else {
        Schedule::Every(period)
    }
}
