use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;

use crate::providers::{CountryLookup, UserAgentParser};

/// The user a gate or config is evaluated against. Only `user_id` is
/// required; everything else widens what conditions can match on.
///
/// `private_attributes` take part in evaluation like `custom` does, but they
/// are stripped before any event leaves the process.
#[skip_serializing_none]
#[derive(Debug, PartialEq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigUser {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub country: Option<String>,
    pub locale: Option<String>,
    pub app_version: Option<String>,
    pub custom: Option<HashMap<String, serde_json::Value>>,
    pub private_attributes: Option<HashMap<String, serde_json::Value>>,
    pub statsig_environment: HashMap<String, String>,
}

impl StatsigUser {
    pub fn new(user_id: String, tier: String) -> Self {
        StatsigUser {
            user_id,
            email: None,
            ip: None,
            user_agent: None,
            country: None,
            locale: None,
            app_version: None,
            custom: None,
            private_attributes: None,
            statsig_environment: HashMap::from([("tier".to_string(), tier)]),
        }
    }

    /// Resolves a condition field against the user record. Recognized aliases
    /// map to the fixed attributes; anything else goes through the custom
    /// attributes and then the private ones, trying the exact key before the
    /// lowercased key.
    pub fn get_from_user(&self, field: &str) -> Option<serde_json::Value> {
        let from_attr = |v: &Option<String>| v.as_ref().map(|s| serde_json::Value::String(s.clone()));
        match field.to_ascii_lowercase().as_str() {
            "userid" | "user_id" => Some(serde_json::Value::String(self.user_id.clone())),
            "email" => from_attr(&self.email),
            "ip" | "ipaddress" | "ip_address" => from_attr(&self.ip),
            "useragent" | "user_agent" => from_attr(&self.user_agent),
            "country" => from_attr(&self.country),
            "locale" => from_attr(&self.locale),
            "appversion" | "app_version" | "clientversion" | "client_version" => {
                from_attr(&self.app_version)
            }
            _ => Self::lookup(self.custom.as_ref(), field)
                .or_else(|| Self::lookup(self.private_attributes.as_ref(), field)),
        }
    }

    pub fn get_from_environment(&self, field: &str) -> Option<serde_json::Value> {
        self.statsig_environment
            .get(field)
            .or_else(|| self.statsig_environment.get(&field.to_ascii_lowercase()))
            .map(|v| serde_json::Value::String(v.clone()))
    }

    fn lookup(
        attributes: Option<&HashMap<String, serde_json::Value>>,
        field: &str,
    ) -> Option<serde_json::Value> {
        let attributes = attributes?;
        attributes
            .get(field)
            .or_else(|| attributes.get(&field.to_ascii_lowercase()))
            .cloned()
    }

    /// Copy of the user safe to ship in events.
    pub(crate) fn scrubbed(&self) -> StatsigUser {
        StatsigUser {
            private_attributes: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigPost {
    pub events: Vec<StatsigEvent>,
    pub statsig_metadata: StatsigMetadata,
}

#[derive(Debug, PartialEq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigEvent {
    pub event_name: String,
    pub value: String,
    /// Unix timestamp in milliseconds.
    pub time: u64,
    pub user: StatsigUser,
    pub metadata: HashMap<String, String>,
    pub secondary_exposures: Vec<HashMap<String, String>>,
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsigMetadata {
    pub sdk_type: String,
    pub sdk_version: String,
}

impl StatsigMetadata {
    pub fn new() -> Self {
        Self {
            sdk_type: "rust-server".to_string(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for StatsigMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment the embedding program runs in, merged into every user before
/// evaluation and logging.
#[derive(Debug, Clone, Default)]
pub struct StatsigEnvironment {
    pub tier: Option<String>,
    pub params: HashMap<String, String>,
}

impl StatsigEnvironment {
    pub(crate) fn to_map(&self) -> HashMap<String, String> {
        let mut map = self.params.clone();
        if let Some(tier) = &self.tier {
            map.insert("tier".to_string(), tier.clone());
        }
        map
    }
}

/// Options to use when creating the client, they will override default values,
/// if they exist.
///
/// The default value for api_url is https://api.statsig.com/v1
/// The default value for config_sync_interval is 10s
#[derive(Clone, Default)]
pub struct StatsigOptions {
    pub api_url: Option<String>,
    pub environment: Option<StatsigEnvironment>,
    pub config_sync_interval: Option<Duration>,
    pub event_flush_interval: Option<Duration>,
    pub max_event_queue_size: Option<usize>,
    pub country_lookup: Option<Arc<dyn CountryLookup>>,
    pub user_agent_parser: Option<Arc<dyn UserAgentParser>>,
}

/// A named structured value selected by rule for a user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamicConfig {
    pub name: String,
    pub value: serde_json::Map<String, serde_json::Value>,
    pub rule_id: String,
}

impl DynamicConfig {
    pub fn empty(name: String) -> Self {
        Self {
            name,
            value: serde_json::Map::new(),
            rule_id: "".to_string(),
        }
    }

    pub(crate) fn from_value(name: String, value: Option<serde_json::Value>, rule_id: String) -> Self {
        let value = match value {
            Some(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        };
        Self { name, value, rule_id }
    }

    /// Fetch a single typed parameter, falling back when the key is missing
    /// or has an incompatible shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.value.get(key) {
            Some(v) => serde_json::from_value(v.clone()).unwrap_or(fallback),
            None => fallback,
        }
    }
}
