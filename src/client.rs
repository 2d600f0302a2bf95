use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::watch;
use tracing::{event, Level};

use crate::{
    evaluator::Evaluator,
    http::StatsigHttpClient,
    logger::EventLogger,
    models::{DynamicConfig, StatsigOptions, StatsigUser},
    providers::Providers,
    store::SpecStore,
};

/// Statsig client that evaluates gates and configs locally against specs
/// synced from the API in the background.
///
/// Check and get operations never fail: when the local rule set cannot
/// decide, the client asks the API directly; when that also fails, the
/// outcome degrades to off/empty.
pub struct Client {
    http_client: StatsigHttpClient,
    evaluator: Evaluator,
    logger: Arc<EventLogger>,
    environment: Option<HashMap<String, String>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Client {
    /// Blocks on the first spec fetch, then keeps syncing and flushing in
    /// the background until `shutdown`.
    pub async fn new(api_key: String, options: StatsigOptions) -> Result<Arc<Self>> {
        if !api_key.starts_with("secret") {
            bail!("statsig: server SDK keys start with 'secret'");
        }

        let http_client = StatsigHttpClient::new(api_key, options.api_url);

        let store = Arc::new(SpecStore::new());
        let initial_data = http_client.fetch_config_specs(0).await?;
        store.apply(initial_data);

        let providers = Providers {
            country_lookup: options.country_lookup,
            user_agent_parser: options.user_agent_parser,
        };
        let evaluator = Evaluator::new(store.clone(), providers);
        let logger = Arc::new(EventLogger::new(
            http_client.clone(),
            options.max_event_queue_size,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(store.clone().sync_forever(
            http_client.clone(),
            options.config_sync_interval,
            shutdown_rx.clone(),
        ));
        tokio::spawn(
            logger
                .clone()
                .flush_forever(options.event_flush_interval, shutdown_rx),
        );

        Ok(Arc::new(Self {
            http_client,
            evaluator,
            logger,
            environment: options.environment.map(|e| e.to_map()),
            shutdown_tx,
        }))
    }

    /// Whether the named gate is on for this user. Unknown gates are off.
    pub async fn check_gate(&self, gate: String, user: StatsigUser) -> bool {
        if user.user_id.is_empty() {
            event!(Level::WARN, "Missing user id, gate {} is off", gate);
            return false;
        }
        let user = self.normalize_user(user);

        let res = match self.evaluator.check_gate_internal(&user, &gate) {
            Some(res) => res,
            None => return false,
        };

        if res.fetch_from_server {
            let remote = match self.http_client.check_gate(&gate, &user).await {
                Ok(remote) => remote,
                Err(e) => {
                    event!(Level::ERROR, "Failed to check gate {} remotely: {}", gate, e);
                    return false;
                }
            };
            self.logger
                .log_gate_exposure(gate, &user, remote.value, remote.rule_id, vec![])
                .await;
            return remote.value;
        }

        let pass = res.pass;
        self.logger
            .log_gate_exposure(gate, &user, pass, res.rule_id, res.secondary_exposures)
            .await;
        pass
    }

    /// The dynamic config selected for this user. Unknown configs and remote
    /// fallback failures yield an empty config under the requested name.
    pub async fn get_config(&self, config: String, user: StatsigUser) -> DynamicConfig {
        if user.user_id.is_empty() {
            event!(Level::WARN, "Missing user id, config {} is empty", config);
            return DynamicConfig::empty(config);
        }
        let user = self.normalize_user(user);

        let res = match self.evaluator.get_config_internal(&user, &config) {
            Some(res) => res,
            None => return DynamicConfig::empty(config),
        };

        if res.fetch_from_server {
            let remote = match self.http_client.get_config(&config, &user).await {
                Ok(remote) => remote,
                Err(e) => {
                    event!(Level::ERROR, "Failed to get config {} remotely: {}", config, e);
                    return DynamicConfig::empty(config);
                }
            };
            let value =
                DynamicConfig::from_value(config.clone(), Some(remote.value), remote.rule_id);
            self.logger
                .log_config_exposure(config, &user, true, value.rule_id.clone(), vec![])
                .await;
            return value;
        }

        let value = DynamicConfig::from_value(config.clone(), res.config_value, res.rule_id);
        self.logger
            .log_config_exposure(
                config,
                &user,
                res.pass,
                value.rule_id.clone(),
                res.secondary_exposures,
            )
            .await;
        value
    }

    /// Experiments are dynamic configs whose rules are the experiment groups.
    pub async fn get_experiment(&self, experiment: String, user: StatsigUser) -> DynamicConfig {
        self.get_config(experiment, user).await
    }

    /// Stops the background loops and flushes buffered exposure events.
    /// Operations invoked after shutdown still evaluate but are only flushed
    /// by an explicit call.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        self.logger.flush().await;
    }

    fn normalize_user(&self, mut user: StatsigUser) -> StatsigUser {
        if let Some(environment) = &self.environment {
            user.statsig_environment = environment.clone();
        }
        user
    }
}
