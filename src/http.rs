use anyhow::{anyhow, Result};
use reqwest::{
    header,
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, ClientBuilder, StatusCode,
};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

use crate::{
    evaluator::models::ConfigData,
    models::{StatsigMetadata, StatsigPost, StatsigUser},
};

const API_URL: &str = "https://api.statsig.com/v1";

/// The environment variable to change the default timeout for statsig requests.
const STATSIG_TIMEOUT_MS: &str = "STATSIG_TIMEOUT_MS";

fn create_http_connection_client(key: &str) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        HeaderName::from_static("statsig-api-key"),
        HeaderValue::from_str(key).expect("should be able to cast api key"),
    );
    let timeout = std::env::var(STATSIG_TIMEOUT_MS)
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u64>()
        .unwrap_or(3000);
    ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(60)))
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .timeout(Duration::from_millis(timeout))
        .default_headers(headers)
        .build()
        .expect("should be able to build the http client")
}

/// Outcome of a server-side gate check, used when local evaluation abstains.
#[derive(Debug, Deserialize)]
pub struct RemoteGateResult {
    #[allow(dead_code)]
    pub name: String,
    pub value: bool,
    #[serde(default)]
    pub rule_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoteConfigResult {
    #[allow(dead_code)]
    pub name: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub rule_id: String,
}

#[derive(Clone)]
pub struct StatsigHttpClient {
    base_url: String,
    http_client: Client,
}

impl StatsigHttpClient {
    pub fn new(api_key: String, api_url: Option<String>) -> Self {
        let base_url = api_url.unwrap_or_else(|| API_URL.to_string());
        let http_client = create_http_connection_client(&api_key);
        Self {
            base_url,
            http_client,
        }
    }

    pub async fn check_gate(&self, gate: &str, user: &StatsigUser) -> Result<RemoteGateResult> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CheckGateBody<'a> {
            user: &'a StatsigUser,
            gate_name: &'a str,
            statsig_metadata: StatsigMetadata,
        }

        let url = format!("{}/check_gate", self.base_url);
        let body = CheckGateBody {
            user,
            gate_name: gate,
            statsig_metadata: StatsigMetadata::new(),
        };

        let response = self.http_client.post(url).json(&body).send().await;
        let res = match response {
            Ok(result) => match result.status() {
                StatusCode::OK => Ok(result),
                err => Err(anyhow!("statsig error: {}", err)),
            },
            Err(err) => Err(anyhow!("failed to send request: {}", err)),
        }?;

        res.json::<RemoteGateResult>()
            .await
            .map_err(|e| anyhow!("error parsing statsig gate response: {}", e))
    }

    pub async fn get_config(&self, config: &str, user: &StatsigUser) -> Result<RemoteConfigResult> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct GetConfigBody<'a> {
            user: &'a StatsigUser,
            config_name: &'a str,
            statsig_metadata: StatsigMetadata,
        }

        let url = format!("{}/get_config", self.base_url);
        let body = GetConfigBody {
            user,
            config_name: config,
            statsig_metadata: StatsigMetadata::new(),
        };

        let response = self.http_client.post(url).json(&body).send().await;
        let res = match response {
            Ok(result) => match result.status() {
                StatusCode::OK => Ok(result),
                err => Err(anyhow!("statsig error: {}", err)),
            },
            Err(err) => Err(anyhow!("failed to send request: {}", err)),
        }?;

        res.json::<RemoteConfigResult>()
            .await
            .map_err(|e| anyhow!("error parsing statsig config response: {}", e))
    }

    /// Ships one batch of exposure events, retrying transient failures with
    /// backoff before giving up.
    pub async fn log_events(&self, statsig_post: &StatsigPost) -> Result<()> {
        let url = format!("{}/log_event", self.base_url);
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(2);

        Retry::spawn(strategy, || async {
            let response = self.http_client.post(&url).json(statsig_post).send().await;
            match response {
                Ok(result) => match result.status() {
                    StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(()),
                    err => Err(anyhow!("statsig error logging events: {}", err)),
                },
                Err(err) => Err(anyhow!("failed to send request: {}", err)),
            }
        })
        .await
    }

    pub async fn fetch_config_specs(&self, since_time: u64) -> Result<ConfigData> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct FetchSpecsBody {
            since_time: u64,
            statsig_metadata: StatsigMetadata,
        }

        let url = format!("{}/download_config_specs", self.base_url);
        let body = FetchSpecsBody {
            since_time,
            statsig_metadata: StatsigMetadata::new(),
        };

        let response = self
            .http_client
            .post(url)
            .timeout(Duration::from_secs(10))
            .json(&body)
            .send()
            .await;
        let res = match response {
            Ok(result) => match result.status() {
                StatusCode::OK => Ok(result),
                status => Err(anyhow!("statsig error fetching specs: {}", status)),
            },
            Err(err) => Err(anyhow!("failed to send request to fetch specs: {}", err)),
        }?;

        res.json::<ConfigData>()
            .await
            .map_err(|e| anyhow!("error parsing specs response: {}", e))
    }
}
