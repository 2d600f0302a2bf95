use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::sync::ShardedLock;
use tokio::{sync::watch, time};
use tracing::{event, Level};

use crate::evaluator::models::{ConfigData, ConfigSpec};
use crate::http::StatsigHttpClient;

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// One consistent view of every spec from a single sync. An evaluation holds
/// one snapshot for its whole run, nested gates included.
#[derive(Debug, Default)]
pub struct SpecSnapshot {
    pub feature_gates: HashMap<String, ConfigSpec>,
    pub dynamic_configs: HashMap<String, ConfigSpec>,
}

/// In-memory spec state, replaced wholesale on each successful sync. Readers
/// never see a half-applied update; they clone the current `Arc` and keep it.
pub struct SpecStore {
    snapshot: ShardedLock<Arc<SpecSnapshot>>,
    last_sync_time: AtomicU64,
}

impl SpecStore {
    pub fn new() -> Self {
        Self {
            snapshot: ShardedLock::new(Arc::new(SpecSnapshot::default())),
            last_sync_time: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<SpecSnapshot> {
        self.snapshot
            .read()
            .expect("spec store lock should not be poisoned")
            .clone()
    }

    pub fn last_sync_time(&self) -> u64 {
        self.last_sync_time.load(Ordering::Relaxed)
    }

    /// Builds the name-keyed maps from one sync response and swaps them in.
    pub fn apply(&self, data: ConfigData) {
        let feature_gates = data
            .feature_gates
            .unwrap_or_default()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let dynamic_configs = data
            .dynamic_configs
            .unwrap_or_default()
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let fresh = Arc::new(SpecSnapshot {
            feature_gates,
            dynamic_configs,
        });
        *self
            .snapshot
            .write()
            .expect("spec store lock should not be poisoned") = fresh;
        if let Some(time) = data.time {
            self.last_sync_time.store(time, Ordering::Relaxed);
        }
    }

    /// Keeps the snapshot fresh until the shutdown signal fires. Fetch
    /// failures leave the current snapshot in place and the next tick retries.
    pub async fn sync_forever(
        self: Arc<Self>,
        http_client: StatsigHttpClient,
        sync_interval: Option<Duration>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = time::interval(sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL));
        // the first tick fires immediately and init has already fetched
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.changed() => return,
            }
            event!(Level::DEBUG, "Refreshing statsig configs");
            let data = match http_client.fetch_config_specs(self.last_sync_time()).await {
                Ok(data) => data,
                Err(e) => {
                    event!(Level::ERROR, "Failed to fetch config specs: {}", e);
                    continue;
                }
            };
            if data.has_updates {
                event!(Level::DEBUG, "Statsig specs have changed");
                self.apply(data);
            }
        }
    }
}

impl Default for SpecStore {
    fn default() -> Self {
        Self::new()
    }
}
