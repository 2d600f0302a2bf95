use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{event, Level};

use crate::{
    models::StatsigUser,
    providers::Providers,
    store::{SpecSnapshot, SpecStore},
};

use self::getters::{get_hash, get_string};
use self::models::{
    ConditionType, ConfigCondition, ConfigRule, ConfigSpec, ConfigSpecType, EvalResult,
    OperatorType,
};

pub mod getters;
pub mod models;
pub mod operators;

/// Bound on pass_gate/fail_gate nesting. The API is expected to reject
/// cyclic gate references, but a chain deeper than this falls back to the
/// server instead of recursing further.
const MAX_NESTED_GATE_DEPTH: usize = 16;

/// The local decision procedure. Stateless apart from the store reference and
/// the collaborator handles, so it is shared freely across tasks.
pub struct Evaluator {
    store: Arc<SpecStore>,
    providers: Providers,
}

impl Evaluator {
    pub fn new(store: Arc<SpecStore>, providers: Providers) -> Self {
        Self { store, providers }
    }

    /// None when the gate is not in the store at all.
    pub fn check_gate_internal(&self, user: &StatsigUser, gate_name: &str) -> Option<EvalResult> {
        let snapshot = self.store.snapshot();
        snapshot
            .feature_gates
            .get(gate_name)
            .map(|gate| self.eval_spec(user, gate, &snapshot, 0))
    }

    pub fn get_config_internal(&self, user: &StatsigUser, config_name: &str) -> Option<EvalResult> {
        let snapshot = self.store.snapshot();
        snapshot
            .dynamic_configs
            .get(config_name)
            .map(|config| self.eval_spec(user, config, &snapshot, 0))
    }

    fn eval_spec(
        &self,
        user: &StatsigUser,
        spec: &ConfigSpec,
        snapshot: &SpecSnapshot,
        depth: usize,
    ) -> EvalResult {
        if !spec.enabled {
            return EvalResult {
                config_value: Some(spec.default_value.clone()),
                ..Default::default()
            };
        }

        let mut exposures: Vec<HashMap<String, String>> = vec![];
        if let Some(rules) = &spec.rules {
            for rule in rules.iter() {
                let mut res = self.eval_rule(user, rule, snapshot, depth);
                exposures.append(&mut res.secondary_exposures);
                if res.fetch_from_server {
                    res.secondary_exposures = exposures;
                    return res;
                }

                if res.pass {
                    // the percentage decides the outcome but the rule still
                    // owns the attribution either way
                    let pass = self.eval_pass_percent(user, rule, spec);
                    let config_value = if pass && spec.r#type == ConfigSpecType::DynamicConfig {
                        rule.return_value.clone()
                    } else {
                        spec.default_value.clone()
                    };
                    return EvalResult {
                        pass,
                        rule_id: rule.id.clone(),
                        config_value: Some(config_value),
                        secondary_exposures: exposures,
                        ..Default::default()
                    };
                }
            }
        }

        EvalResult {
            config_value: Some(spec.default_value.clone()),
            secondary_exposures: exposures,
            ..Default::default()
        }
    }

    fn eval_pass_percent(&self, user: &StatsigUser, rule: &ConfigRule, spec: &ConfigSpec) -> bool {
        let hash = get_hash(&format!("{}.{}.{}", spec.salt, rule.id, user.user_id));
        (hash % 10000) < (rule.pass_percentage * 100.0) as u64
    }

    fn eval_rule(
        &self,
        user: &StatsigUser,
        rule: &ConfigRule,
        snapshot: &SpecSnapshot,
        depth: usize,
    ) -> EvalResult {
        let mut exposures: Vec<HashMap<String, String>> = vec![];
        for condition in rule.conditions.iter() {
            let mut res = self.eval_condition(user, condition, snapshot, depth);
            exposures.append(&mut res.secondary_exposures);
            if res.fetch_from_server {
                return EvalResult {
                    fetch_from_server: true,
                    secondary_exposures: exposures,
                    ..Default::default()
                };
            }
            if !res.pass {
                return EvalResult {
                    secondary_exposures: exposures,
                    ..Default::default()
                };
            }
        }
        EvalResult {
            pass: true,
            secondary_exposures: exposures,
            ..Default::default()
        }
    }

    fn eval_condition(
        &self,
        user: &StatsigUser,
        condition: &ConfigCondition,
        snapshot: &SpecSnapshot,
        depth: usize,
    ) -> EvalResult {
        let field = condition.field.as_deref().unwrap_or("");
        let value = match condition.r#type {
            ConditionType::Public => return EvalResult::pass(),
            ConditionType::PassGate | ConditionType::FailGate => {
                return self.eval_nested_gate(user, condition, snapshot, depth);
            }
            // an explicit user attribute always wins over derivation
            ConditionType::IpBased => user
                .get_from_user(field)
                .or_else(|| self.get_from_ip(user, field)),
            ConditionType::UaBased => user
                .get_from_user(field)
                .or_else(|| self.get_from_user_agent(user, field)),
            ConditionType::UserField => user.get_from_user(field),
            ConditionType::EnvironmentField => user.get_from_environment(field),
            ConditionType::CurrentTime => Some(json!(Utc::now().timestamp())),
            ConditionType::UserBucket => self.get_user_bucket(user, condition),
            ConditionType::Unknown => return EvalResult::fetch_from_server(),
        };

        let value = match value {
            Some(v) if !v.is_null() => v,
            _ => return EvalResult::fail(),
        };

        let target = condition.target_value.as_ref();
        let pass = match condition
            .operator
            .as_ref()
            .unwrap_or(&OperatorType::Unknown)
        {
            OperatorType::Gt => operators::numeric_compare(&value, target, |a, b| a > b),
            OperatorType::Gte => operators::numeric_compare(&value, target, |a, b| a >= b),
            OperatorType::Lt => operators::numeric_compare(&value, target, |a, b| a < b),
            OperatorType::Lte => operators::numeric_compare(&value, target, |a, b| a <= b),
            OperatorType::VersionGt => operators::version_compare(&value, target, |ord| ord.is_gt()),
            OperatorType::VersionGte => {
                operators::version_compare(&value, target, |ord| ord.is_ge())
            }
            OperatorType::VersionLt => operators::version_compare(&value, target, |ord| ord.is_lt()),
            OperatorType::VersionLte => {
                operators::version_compare(&value, target, |ord| ord.is_le())
            }
            OperatorType::VersionEq => operators::version_compare(&value, target, |ord| ord.is_eq()),
            OperatorType::VersionNeq => {
                operators::version_compare(&value, target, |ord| ord.is_ne())
            }
            OperatorType::Any => operators::value_in_array(&value, target, false),
            OperatorType::None => !operators::value_in_array(&value, target, false),
            OperatorType::AnyCaseSensitive => operators::value_in_array(&value, target, true),
            OperatorType::NoneCaseSensitive => !operators::value_in_array(&value, target, true),
            OperatorType::StrStartsWithAny => {
                operators::string_compare_any(&value, target, |v, t| v.starts_with(t))
            }
            OperatorType::StrEndsWithAny => {
                operators::string_compare_any(&value, target, |v, t| v.ends_with(t))
            }
            OperatorType::StrContainsAny => {
                operators::string_compare_any(&value, target, |v, t| v.contains(t))
            }
            OperatorType::StrContainsNone => {
                !operators::string_compare_any(&value, target, |v, t| v.contains(t))
            }
            OperatorType::StrMatches => operators::string_matches(&value, target),
            OperatorType::Eq => &value == target.unwrap_or(&serde_json::Value::Null),
            OperatorType::Neq => &value != target.unwrap_or(&serde_json::Value::Null),
            OperatorType::Before => operators::time_compare(&value, target, |a, b| a < b),
            OperatorType::After => operators::time_compare(&value, target, |a, b| a > b),
            OperatorType::On => operators::same_calendar_day(&value, target),
            OperatorType::Unknown => return EvalResult::fetch_from_server(),
        };

        if pass {
            EvalResult::pass()
        } else {
            EvalResult::fail()
        }
    }

    /// Evaluates the dependent gate named by the target value against the
    /// same snapshot, recording a secondary exposure for it.
    fn eval_nested_gate(
        &self,
        user: &StatsigUser,
        condition: &ConfigCondition,
        snapshot: &SpecSnapshot,
        depth: usize,
    ) -> EvalResult {
        if depth >= MAX_NESTED_GATE_DEPTH {
            event!(Level::WARN, "Gate nesting too deep, deferring to the API");
            return EvalResult::fetch_from_server();
        }
        let gate_name = match condition.target_value.as_ref().and_then(get_string) {
            Some(name) => name,
            None => return EvalResult::fail(),
        };
        let mut res = match snapshot.feature_gates.get(&gate_name) {
            Some(gate) => self.eval_spec(user, gate, snapshot, depth + 1),
            None => EvalResult::unrecognized(),
        };
        if res.fetch_from_server {
            return res;
        }
        let mut exposures = std::mem::take(&mut res.secondary_exposures);
        exposures.push(HashMap::from([
            ("gate".to_string(), gate_name),
            ("gateValue".to_string(), res.pass.to_string()),
            ("ruleID".to_string(), res.rule_id.clone()),
        ]));
        let pass = if condition.r#type == ConditionType::FailGate {
            !res.pass
        } else {
            res.pass
        };
        EvalResult {
            pass,
            secondary_exposures: exposures,
            ..Default::default()
        }
    }

    fn get_from_ip(&self, user: &StatsigUser, field: &str) -> Option<serde_json::Value> {
        if field.to_ascii_lowercase() != "country" {
            return None;
        }
        let lookup = self.providers.country_lookup.as_ref()?;
        let ip = user.ip.as_ref()?;
        Some(json!(lookup.country(ip).unwrap_or_default()))
    }

    fn get_from_user_agent(&self, user: &StatsigUser, field: &str) -> Option<serde_json::Value> {
        let parser = self.providers.user_agent_parser.as_ref()?;
        let user_agent = user.user_agent.as_ref()?;
        let parsed = parser.parse(user_agent)?;
        match field.to_ascii_lowercase().as_str() {
            "os_name" | "osname" => Some(json!(parsed.os_name)),
            "os_version" | "osversion" => Some(json!(parsed.os_version.dotted())),
            "browser_name" | "browsername" => Some(json!(parsed.browser_name)),
            "browser_version" | "browserversion" => Some(json!(parsed.browser_version.dotted())),
            _ => None,
        }
    }

    fn get_user_bucket(
        &self,
        user: &StatsigUser,
        condition: &ConfigCondition,
    ) -> Option<serde_json::Value> {
        let salt = condition
            .additional_values
            .as_ref()?
            .get("salt")
            .and_then(get_string)?;
        let bucket = get_hash(&format!("{}.{}", salt, user.user_id)) % 1000;
        Some(json!(bucket))
    }
}
