use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use tokio::{sync::watch, time};
use tracing::{event, Level};

use crate::http::StatsigHttpClient;
use crate::models::{StatsigEvent, StatsigMetadata, StatsigPost, StatsigUser};

const GATE_EXPOSURE_EVENT: &str = "statsig::gate_exposure";
const CONFIG_EXPOSURE_EVENT: &str = "statsig::config_exposure";

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 500;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Bounded in-memory buffer of exposure events. The buffer drains to the API
/// when it fills up, on the periodic flush tick, and at shutdown. Users are
/// scrubbed of private attributes before the event is built, so nothing past
/// this point ever sees them.
pub struct EventLogger {
    http_client: StatsigHttpClient,
    events: Mutex<Vec<StatsigEvent>>,
    max_queue_size: usize,
}

impl EventLogger {
    pub fn new(http_client: StatsigHttpClient, max_queue_size: Option<usize>) -> Self {
        Self {
            http_client,
            events: Mutex::new(vec![]),
            max_queue_size: max_queue_size.unwrap_or(DEFAULT_MAX_QUEUE_SIZE),
        }
    }

    pub async fn log_gate_exposure(
        &self,
        gate: String,
        user: &StatsigUser,
        pass: bool,
        rule_id: String,
        secondary_exposures: Vec<HashMap<String, String>>,
    ) {
        let event = StatsigEvent {
            event_name: GATE_EXPOSURE_EVENT.to_string(),
            value: pass.to_string(),
            time: now_millis(),
            user: user.scrubbed(),
            metadata: HashMap::from([
                ("gate".to_string(), gate),
                ("gateValue".to_string(), pass.to_string()),
                ("ruleID".to_string(), rule_id),
            ]),
            secondary_exposures,
        };
        self.log_event(event).await;
    }

    pub async fn log_config_exposure(
        &self,
        config: String,
        user: &StatsigUser,
        pass: bool,
        rule_id: String,
        secondary_exposures: Vec<HashMap<String, String>>,
    ) {
        let event = StatsigEvent {
            event_name: CONFIG_EXPOSURE_EVENT.to_string(),
            value: pass.to_string(),
            time: now_millis(),
            user: user.scrubbed(),
            metadata: HashMap::from([
                ("config".to_string(), config),
                ("ruleID".to_string(), rule_id),
            ]),
            secondary_exposures,
        };
        self.log_event(event).await;
    }

    /// Appends one event; when the buffer reaches the cap the whole batch is
    /// drained and shipped before returning.
    pub async fn log_event(&self, event: StatsigEvent) {
        let batch = {
            let mut events = self
                .events
                .lock()
                .expect("should always be able to acquire lock");
            events.push(event);
            if events.len() >= self.max_queue_size {
                Some(std::mem::take(&mut *events))
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            self.post_events(batch).await;
        }
    }

    pub async fn flush(&self) {
        let batch = {
            let mut events = self
                .events
                .lock()
                .expect("should always be able to acquire lock");
            std::mem::take(&mut *events)
        };
        if !batch.is_empty() {
            self.post_events(batch).await;
        }
    }

    async fn post_events(&self, events: Vec<StatsigEvent>) {
        let post = StatsigPost {
            events,
            statsig_metadata: StatsigMetadata::new(),
        };
        if let Err(e) = self.http_client.log_events(&post).await {
            event!(Level::ERROR, "Failed to log events: {}", e);
        }
    }

    /// Drains sparse traffic on a timer until the shutdown signal fires; the
    /// final flush is the shutdown path's job.
    pub async fn flush_forever(
        self: Arc<Self>,
        flush_interval: Option<Duration>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut interval = time::interval(flush_interval.unwrap_or(DEFAULT_FLUSH_INTERVAL));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown_rx.changed() => return,
            }
            event!(Level::DEBUG, "Flushing exposure events");
            self.flush().await;
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}
