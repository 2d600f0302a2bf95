use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Outcome of evaluating a condition, rule or spec.
///
/// `fetch_from_server` is a third state next to pass/fail: the local rule set
/// cannot decide (unknown condition kind or operator) and the caller should
/// consult the API instead.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalResult {
    pub pass: bool,
    pub fetch_from_server: bool,
    pub rule_id: String,
    pub config_value: Option<serde_json::Value>,
    pub secondary_exposures: Vec<HashMap<String, String>>,
}

impl Default for EvalResult {
    fn default() -> Self {
        Self {
            pass: false,
            fetch_from_server: false,
            rule_id: "default".to_string(),
            config_value: None,
            secondary_exposures: vec![],
        }
    }
}

impl EvalResult {
    pub fn pass() -> Self {
        Self {
            pass: true,
            ..Default::default()
        }
    }

    pub fn fail() -> Self {
        Self::default()
    }

    pub fn fetch_from_server() -> Self {
        Self {
            fetch_from_server: true,
            ..Default::default()
        }
    }

    /// Result for a name that is not in the store at all.
    pub fn unrecognized() -> Self {
        Self {
            rule_id: "".to_string(),
            ..Default::default()
        }
    }
}

/// One `download_config_specs` response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigData {
    pub has_updates: bool,
    pub time: Option<u64>,
    pub feature_gates: Option<Vec<ConfigSpec>>,
    pub dynamic_configs: Option<Vec<ConfigSpec>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    pub name: String,
    pub r#type: ConfigSpecType,
    pub salt: String,
    pub enabled: bool,
    pub rules: Option<Vec<ConfigRule>>,
    pub default_value: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSpecType {
    FeatureGate,
    DynamicConfig,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRule {
    pub name: String,
    pub id: String,
    pub pass_percentage: f64,
    pub conditions: Vec<ConfigCondition>,
    pub return_value: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCondition {
    pub r#type: ConditionType,
    pub operator: Option<OperatorType>,
    pub field: Option<String>,
    pub target_value: Option<serde_json::Value>,
    pub additional_values: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Public,
    FailGate,
    PassGate,
    IpBased,
    UaBased,
    UserField,
    EnvironmentField,
    CurrentTime,
    UserBucket,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorType {
    Gt,
    Gte,
    Lt,
    Lte,
    VersionGt,
    VersionGte,
    VersionLt,
    VersionLte,
    VersionEq,
    VersionNeq,
    Any,
    None,
    AnyCaseSensitive,
    NoneCaseSensitive,
    StrStartsWithAny,
    StrEndsWithAny,
    StrContainsAny,
    StrContainsNone,
    StrMatches,
    Eq,
    Neq,
    Before,
    After,
    On,
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{ConditionType, ConfigSpec, ConfigSpecType, OperatorType};

    #[test]
    fn test_unknown_variants_deserialize() {
        let condition: ConditionType = serde_json::from_value(json!("segment_list")).unwrap();
        assert_eq!(condition, ConditionType::Unknown);
        let operator: OperatorType = serde_json::from_value(json!("in_segment_list")).unwrap();
        assert_eq!(operator, OperatorType::Unknown);
    }

    #[test]
    fn test_spec_deserialize() {
        let spec: ConfigSpec = serde_json::from_value(json!({
            "name": "test_gate",
            "type": "feature_gate",
            "salt": "salt",
            "enabled": true,
            "defaultValue": false,
            "rules": [{
                "name": "rollout",
                "id": "rollout_id",
                "passPercentage": 50.5,
                "returnValue": true,
                "conditions": [{
                    "type": "user_field",
                    "operator": "any",
                    "field": "country",
                    "targetValue": ["US"],
                    "additionalValues": {},
                }],
            }],
        }))
        .unwrap();
        assert_eq!(spec.r#type, ConfigSpecType::FeatureGate);
        let rules = spec.rules.unwrap();
        assert_eq!(rules[0].pass_percentage, 50.5);
        assert_eq!(rules[0].conditions[0].r#type, ConditionType::UserField);
    }
}
