use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(alias = "totalContainers")]
    pub total_containers: f64,
    #[serde(alias = "totalMoves")]
    pub total_moves: f64,
    #[serde(alias = "optimizedMoves")]
    pub optimized_moves: f64,
    #[serde(alias = "moneySaved")]
    pub money_saved: f64,
    #[serde(alias = "efficiencyIncrease")]
    pub efficiency_increase: f64,
    #[serde(alias = "carbonReduction")]
    pub carbon_reduction: f64,
}

impl MetricsSnapshot {
    /// Returns the first field that is negative or not finite.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("total_containers", self.total_containers),
            ("total_moves", self.total_moves),
            ("optimized_moves", self.optimized_moves),
            ("money_saved", self.money_saved),
            ("efficiency_increase", self.efficiency_increase),
            ("carbon_reduction", self.carbon_reduction),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingProgressSnapshot {
    pub episodes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl TrainingProgressSnapshot {
    /// Returns the first present float that is not finite.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("epsilon", self.epsilon),
            ("loss", self.loss),
            ("accuracy", self.accuracy),
        ]
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        .map(|(name, _)| name)
    }
}

/// Log lines as last reported by the service. Replaced wholesale on each fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogBuffer(Vec<String>);

impl LogBuffer {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            lines
                .into_iter()
                .map(|line| {
                    let mut line = line.into();
                    let trimmed = line.trim_end_matches(['\r', '\n']).len();
                    line.truncate(trimmed);
                    line
                })
                .collect(),
        )
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    ContainersMetrics,
    Logs,
    TrainingProgress,
}

impl Channel {
    pub const ALL: [Channel; 3] = [
        Channel::ContainersMetrics,
        Channel::Logs,
        Channel::TrainingProgress,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ContainersMetrics => "containers_metrics",
            Self::Logs => "logs",
            Self::TrainingProgress => "training_progress",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelPhase {
    #[default]
    Idle,
    Fetching,
    Stopped,
}

/// Per-channel bookkeeping exposed in snapshots, without the channel's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub phase: ChannelPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
