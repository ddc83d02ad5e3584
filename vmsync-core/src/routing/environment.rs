//! Environment classification.
//!
//! Decides which environment (`DV`, `PR`, `DR`, ...) a server belongs to.

use std::collections::HashMap;

use crate::extraction::tags::{first_present, ENVIRONMENT_KEYS};
use crate::logging::structured::LogContext;
use crate::record::UNKNOWN_ENVIRONMENT;

/// Which rule produced the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSource {
    Tag,
    Subscription,
    InstanceName,
    Fallback,
}

impl EnvironmentSource {
    pub fn as_str(&self) -> &str {
        match self {
            EnvironmentSource::Tag => "tag",
            EnvironmentSource::Subscription => "subscription",
            EnvironmentSource::InstanceName => "instance_name",
            EnvironmentSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentDecision {
    pub value: String,
    pub source: EnvironmentSource,
}

impl EnvironmentDecision {
    fn new(value: &str, source: EnvironmentSource) -> Self {
        Self {
            value: value.to_string(),
            source,
        }
    }
}

/// (needles, environment) checked against the subscription id, case-sensitive.
const SUBSCRIPTION_RULES: &[Rule] = &[
    (&["DV", "Dev"], "DV"),
    (&["PR", "Prod"], "PR"),
    (&["DR"], "DR"),
];

/// (needles, environment) checked against the lowercased instance name.
const NAME_RULES: &[Rule] = &[
    (&["-dv-", "dev"], "DV"),
    (&["-pr-", "prod"], "PR"),
    (&["-dr-", "disaster"], "DR"),
];

/// Uppercase an environment value; empty or any casing of `unknown`
/// becomes the literal `Unknown`.
pub fn normalize_environment(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN_ENVIRONMENT) {
        UNKNOWN_ENVIRONMENT.to_string()
    } else {
        trimmed.to_uppercase()
    }
}

type Rule = (&'static [&'static str], &'static str);

fn first_rule(haystack: &str, rules: &'static [Rule]) -> Option<&'static str> {
    rules
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| haystack.contains(n)))
        .map(|(_, env)| *env)
}

/// Classify a server's environment.
///
/// # Decision Chain (first match wins)
/// 1. Tag `Environment`, else `Env` -> uppercased value
/// 2. Subscription id contains `DV`/`Dev` -> DV, `PR`/`Prod` -> PR, `DR` -> DR
/// 3. Lowercased name contains `-dv-`/`dev` -> DV, `-pr-`/`prod` -> PR,
///    `-dr-`/`disaster` -> DR
/// 4. Otherwise -> Unknown
pub fn classify_environment(
    tags: &HashMap<String, String>,
    subscription_id: &str,
    instance_name: &str,
    ctx: &LogContext,
) -> EnvironmentDecision {
    let decision = if let Some(tagged) = first_present(tags, ENVIRONMENT_KEYS) {
        EnvironmentDecision::new(&normalize_environment(tagged), EnvironmentSource::Tag)
    } else if let Some(env) = first_rule(subscription_id, SUBSCRIPTION_RULES) {
        EnvironmentDecision::new(env, EnvironmentSource::Subscription)
    } else if let Some(env) = first_rule(&instance_name.to_lowercase(), NAME_RULES) {
        EnvironmentDecision::new(env, EnvironmentSource::InstanceName)
    } else {
        EnvironmentDecision::new(UNKNOWN_ENVIRONMENT, EnvironmentSource::Fallback)
    };

    log::debug!(
        "{} ENVIRONMENT_DECISION instance={} environment={} source={}",
        ctx,
        instance_name,
        decision.value,
        decision.source.as_str()
    );

    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LogContext {
        LogContext::new("test-run")
    }

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tag_beats_subscription() {
        let decision = classify_environment(
            &tags(&[("Environment", "prod")]),
            "DDD-DV",
            "web01",
            &ctx(),
        );
        assert_eq!(decision.value, "PROD");
        assert_eq!(decision.source, EnvironmentSource::Tag);
    }

    #[test]
    fn test_env_alias_tag() {
        let decision = classify_environment(&tags(&[("Env", "qa")]), "x", "y", &ctx());
        assert_eq!(decision.value, "QA");
    }

    #[test]
    fn test_subscription_rules_in_order() {
        let empty = HashMap::new();
        assert_eq!(classify_environment(&empty, "CAS-CALAB-DV", "a", &ctx()).value, "DV");
        assert_eq!(classify_environment(&empty, "DSP-Infra-PR", "a", &ctx()).value, "PR");
        assert_eq!(classify_environment(&empty, "Contoso-Prod", "a", &ctx()).value, "PR");
        assert_eq!(classify_environment(&empty, "site-DR", "a", &ctx()).value, "DR");
        // "DV" is checked before "PR"
        assert_eq!(classify_environment(&empty, "PR-DV", "a", &ctx()).value, "DV");
        // subscription match is case-sensitive
        assert_eq!(
            classify_environment(&empty, "ops-dr", "a", &ctx()).source,
            EnvironmentSource::Fallback
        );
    }

    #[test]
    fn test_instance_name_rules() {
        let empty = HashMap::new();
        let sub = "00000000-aaaa";
        assert_eq!(classify_environment(&empty, sub, "APP-DV-01", &ctx()).value, "DV");
        assert_eq!(classify_environment(&empty, sub, "webdev3", &ctx()).value, "DV");
        assert_eq!(classify_environment(&empty, sub, "sql-pr-02", &ctx()).value, "PR");
        assert_eq!(classify_environment(&empty, sub, "ProdBox", &ctx()).value, "PR");
        assert_eq!(classify_environment(&empty, sub, "disaster-site", &ctx()).value, "DR");
        let decision = classify_environment(&empty, sub, "web01", &ctx());
        assert_eq!(decision.value, "Unknown");
        assert_eq!(decision.source, EnvironmentSource::Fallback);
    }

    #[test]
    fn test_normalize_environment() {
        assert_eq!(normalize_environment(" pr "), "PR");
        assert_eq!(normalize_environment(""), "Unknown");
        assert_eq!(normalize_environment("UNKNOWN"), "Unknown");
    }
}
