//! Top-level owner of yard state and the snapshots published from it.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use futures::FutureExt;
use shared::{
    domain::{Container, ContainerId, Position},
    error::ErrorKind,
    protocol::{
        Channel, ChannelStatus, HealthResponse, LogBuffer, MetricsSnapshot,
        TrainingProgressSnapshot,
    },
};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
    config::CoordinatorConfig,
    error::{GridError, YardError},
    grid::SpatialGrid,
    metrics::MetricsAggregator,
    poller::{shared_state, ChannelPoller, ChannelSink, FetchFn, SharedChannelState},
    service::{CsvUpload, YardService},
    validator::PlacementValidator,
};

/// One containers+metrics fetch. Both halves are applied together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct YardSync {
    pub containers: Vec<Container>,
    pub metrics: MetricsSnapshot,
}

/// Immutable composite handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct YardState {
    pub version: u64,
    pub grid: SpatialGrid,
    pub metrics: MetricsSnapshot,
    pub logs: LogBuffer,
    pub training_progress: Option<TrainingProgressSnapshot>,
    pub channels: BTreeMap<Channel, ChannelStatus>,
}

impl YardState {
    fn empty(grid: SpatialGrid) -> Self {
        Self {
            version: 0,
            grid,
            metrics: MetricsSnapshot::default(),
            logs: LogBuffer::default(),
            training_progress: None,
            channels: Channel::ALL
                .into_iter()
                .map(|channel| (channel, ChannelStatus::default()))
                .collect(),
        }
    }

    pub fn status(&self, channel: Channel) -> ChannelStatus {
        self.channels.get(&channel).copied().unwrap_or_default()
    }

    pub fn containers_error(&self) -> Option<ErrorKind> {
        self.status(Channel::ContainersMetrics).last_error
    }

    pub fn logs_error(&self) -> Option<ErrorKind> {
        self.status(Channel::Logs).last_error
    }

    pub fn training_progress_error(&self) -> Option<ErrorKind> {
        self.status(Channel::TrainingProgress).last_error
    }

    /// Containers ordered by id.
    pub fn containers(&self) -> Vec<Container> {
        self.grid.sorted_containers()
    }
}

/// Receives a new [`YardState`] each time one is published.
pub struct SnapshotSubscription {
    rx: watch::Receiver<Arc<YardState>>,
}

impl SnapshotSubscription {
    /// Waits for the next published state. Returns `None` once the
    /// coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<YardState>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }

    pub fn latest(&self) -> Arc<YardState> {
        Arc::clone(&self.rx.borrow())
    }

    pub fn unsubscribe(self) {
        drop(self.rx);
    }
}

struct YardModel {
    grid: SpatialGrid,
    metrics: MetricsAggregator,
}

/// Model, per-channel state and the snapshot publisher. Pollers commit into
/// it; nothing else writes the model.
struct YardStore {
    model: RwLock<YardModel>,
    containers: SharedChannelState<YardSync>,
    logs: SharedChannelState<LogBuffer>,
    training: SharedChannelState<TrainingProgressSnapshot>,
    version: Mutex<u64>,
    snapshots: watch::Sender<Arc<YardState>>,
}

impl YardStore {
    fn new(grid: SpatialGrid) -> Self {
        let (snapshots, _) = watch::channel(Arc::new(YardState::empty(grid.clone())));
        Self {
            model: RwLock::new(YardModel {
                grid,
                metrics: MetricsAggregator::default(),
            }),
            containers: shared_state(),
            logs: shared_state(),
            training: shared_state(),
            version: Mutex::new(0),
            snapshots,
        }
    }

    /// Composes and sends a new state. Publishes are serialized so versions
    /// reach subscribers in order.
    async fn publish(&self) {
        let mut version = self.version.lock().await;
        *version += 1;

        let (grid, metrics, training_progress) = {
            let model = self.model.read().await;
            (
                model.grid.clone(),
                model.metrics.current(),
                model.metrics.training(),
            )
        };
        let logs = self.logs.read().await.last_value.clone().unwrap_or_default();
        let channels = BTreeMap::from([
            (
                Channel::ContainersMetrics,
                self.containers.read().await.status,
            ),
            (Channel::Logs, self.logs.read().await.status),
            (Channel::TrainingProgress, self.training.read().await.status),
        ]);

        let state = YardState {
            version: *version,
            grid,
            metrics,
            logs,
            training_progress,
            channels,
        };
        self.snapshots.send_replace(Arc::new(state));
        debug!(version = *version, "yard state published");
    }
}

#[async_trait]
impl ChannelSink<YardSync> for YardStore {
    async fn commit(&self, _channel: Channel, value: &YardSync) -> Result<(), YardError> {
        if let Some(field) = value.metrics.invalid_field() {
            return Err(YardError::Decode(format!(
                "metrics field '{field}' must be a finite non-negative number"
            )));
        }
        let mut model = self.model.write().await;
        model.grid.replace_all(value.containers.iter().cloned())?;
        model.metrics.update(value.metrics);
        Ok(())
    }

    async fn cycle_completed(&self, _channel: Channel) {
        self.publish().await;
    }
}

#[async_trait]
impl ChannelSink<LogBuffer> for YardStore {
    async fn cycle_completed(&self, _channel: Channel) {
        self.publish().await;
    }
}

#[async_trait]
impl ChannelSink<TrainingProgressSnapshot> for YardStore {
    async fn commit(
        &self,
        _channel: Channel,
        value: &TrainingProgressSnapshot,
    ) -> Result<(), YardError> {
        if let Some(field) = value.invalid_field() {
            return Err(YardError::Decode(format!(
                "training field '{field}' must be a finite number"
            )));
        }
        self.model.write().await.metrics.update_training(*value);
        Ok(())
    }

    async fn cycle_completed(&self, _channel: Channel) {
        self.publish().await;
    }
}

struct Pollers {
    containers: Arc<ChannelPoller>,
    logs: Arc<ChannelPoller>,
    training: Arc<ChannelPoller>,
}

pub struct YardStateCoordinator {
    config: CoordinatorConfig,
    service: Arc<dyn YardService>,
    store: Arc<YardStore>,
    pollers: Mutex<Option<Pollers>>,
}

impl YardStateCoordinator {
    pub fn new(config: CoordinatorConfig, service: Arc<dyn YardService>) -> Self {
        let store = Arc::new(YardStore::new(SpatialGrid::new(config.dimensions)));
        Self {
            config,
            service,
            store,
            pollers: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        self.pollers.lock().await.is_some()
    }

    /// Starts the three channel pollers. Each fetches immediately. Calling
    /// it while running has no effect; calling it after `stop` starts fresh
    /// pollers.
    pub async fn start(&self) {
        let mut pollers = self.pollers.lock().await;
        if pollers.is_some() {
            debug!("yard coordinator already running");
            return;
        }

        let service = Arc::clone(&self.service);
        let fetch_sync: FetchFn<YardSync> = Arc::new(move || {
            let service = Arc::clone(&service);
            async move {
                let (containers, metrics) =
                    tokio::try_join!(service.fetch_containers(), service.fetch_metrics())?;
                Ok::<_, YardError>(YardSync {
                    containers,
                    metrics,
                })
            }
            .boxed()
        });
        let service = Arc::clone(&self.service);
        let fetch_logs: FetchFn<LogBuffer> = Arc::new(move || {
            let service = Arc::clone(&service);
            async move { service.fetch_logs().await }.boxed()
        });
        let service = Arc::clone(&self.service);
        let fetch_training: FetchFn<TrainingProgressSnapshot> = Arc::new(move || {
            let service = Arc::clone(&service);
            async move { service.fetch_training_progress().await }.boxed()
        });

        *pollers = Some(Pollers {
            containers: Arc::new(ChannelPoller::spawn(
                Channel::ContainersMetrics,
                self.config.containers_schedule(),
                Arc::clone(&self.store.containers),
                fetch_sync,
                Arc::clone(&self.store) as Arc<dyn ChannelSink<YardSync>>,
            )),
            logs: Arc::new(ChannelPoller::spawn(
                Channel::Logs,
                self.config.logs_schedule(),
                Arc::clone(&self.store.logs),
                fetch_logs,
                Arc::clone(&self.store) as Arc<dyn ChannelSink<LogBuffer>>,
            )),
            training: Arc::new(ChannelPoller::spawn(
                Channel::TrainingProgress,
                self.config.training_schedule(),
                Arc::clone(&self.store.training),
                fetch_training,
                Arc::clone(&self.store) as Arc<dyn ChannelSink<TrainingProgressSnapshot>>,
            )),
        });
        info!(dimensions = %self.config.dimensions, "yard coordinator started");
    }

    /// Stops every poller and waits for their tasks to exit. In-flight
    /// results are discarded. Safe to call in any state and more than once.
    pub async fn stop(&self) {
        let Some(pollers) = self.pollers.lock().await.take() else {
            return;
        };
        tokio::join!(
            pollers.containers.stop(),
            pollers.logs.stop(),
            pollers.training.stop(),
        );
        self.store.publish().await;
        info!("yard coordinator stopped");
    }

    pub fn snapshot(&self) -> Arc<YardState> {
        Arc::clone(&self.store.snapshots.borrow())
    }

    pub fn subscribe(&self) -> SnapshotSubscription {
        SnapshotSubscription {
            rx: self.store.snapshots.subscribe(),
        }
    }

    /// Forces a containers+metrics cycle and waits for it to complete.
    pub async fn refresh(&self) {
        let poller = self
            .pollers
            .lock()
            .await
            .as_ref()
            .map(|pollers| Arc::clone(&pollers.containers));
        match poller {
            Some(poller) => {
                if let Err(err) = poller.refresh().await {
                    warn!(error = %err, "containers refresh skipped");
                }
            }
            None => warn!("yard coordinator not started; skipping containers refresh"),
        }
    }

    pub async fn remove_container(&self, id: &ContainerId) -> Result<(), YardError> {
        {
            let model = self.store.model.read().await;
            PlacementValidator::validate_removal(&model.grid, id)
                .map_err(|err| rejected_locally(err, "removal"))?;
        }
        self.service
            .remove_container(id)
            .await
            .map_err(|err| rejected_remotely(err, "removal"))?;
        info!(container_id = %id, "container removal accepted");
        self.refresh().await;
        Ok(())
    }

    pub async fn manual_place(&self, id: &ContainerId, position: Position) -> Result<(), YardError> {
        {
            let model = self.store.model.read().await;
            PlacementValidator::validate(&model.grid, id, position)
                .map_err(|err| rejected_locally(err, "placement"))?;
        }
        self.service
            .manual_place_container(id, position)
            .await
            .map_err(|err| rejected_remotely(err, "placement"))?;
        info!(container_id = %id, %position, "manual placement accepted");
        self.refresh().await;
        Ok(())
    }

    /// Hands the CSV bytes to the service untouched.
    pub async fn import_csv(&self, upload: CsvUpload) -> Result<(), YardError> {
        let file_name = upload.file_name.clone();
        let size = upload.bytes.len();
        self.service
            .upload_csv(upload)
            .await
            .map_err(|err| rejected_remotely(err, "csv import"))?;
        info!(file_name, size, "csv import accepted");
        self.refresh().await;
        Ok(())
    }

    pub async fn request_reoptimize(&self) -> Result<(), YardError> {
        self.service
            .reoptimize()
            .await
            .map_err(|err| rejected_remotely(err, "reoptimize"))?;
        info!("re-optimization accepted");
        self.refresh().await;
        Ok(())
    }

    pub async fn check_health(&self) -> Result<HealthResponse, YardError> {
        self.service.health().await
    }
}

fn rejected_locally(err: GridError, intent: &'static str) -> YardError {
    info!(intent, error = %err, "intent rejected locally");
    err.into()
}

fn rejected_remotely(err: YardError, intent: &'static str) -> YardError {
    warn!(intent, kind = %err.kind(), error = %err, "intent failed");
    err
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
