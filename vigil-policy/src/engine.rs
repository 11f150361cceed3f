//! Rule loading and evaluation.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vigil_types::{Decision, RunContext, Verdict};

use crate::parse::{Condition, ParseError, parse};

/// Policy loading errors. Fatal at load time; a running engine never
/// produces one.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Reading the policy source failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The YAML document was malformed, or named an unknown decision.
    #[error("policy parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A rule's condition was outside the grammar.
    #[error("invalid condition in rule `{rule}`: {source}")]
    InvalidCondition {
        /// The offending rule.
        rule: String,
        /// What the parser rejected.
        source: ParseError,
    },

    /// Two rules in one ruleset share a name.
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),
}

/// One rule as written in a policy source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Rule name, unique within the ruleset.
    pub name: String,
    /// Condition expression.
    pub when: String,
    /// Decision to return when the condition holds.
    pub action: Decision,
    /// Human-readable reason attached to the verdict.
    pub reason: String,
    /// Higher priority wins; ties resolve by definition order.
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Deserialize)]
struct PolicyDoc {
    rules: Vec<RuleSpec>,
}

/// A loaded, parsed rule. Immutable after load.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    /// Rule name.
    pub name: String,
    /// Parsed condition.
    pub condition: Condition,
    /// The condition's source text, kept for diagnostics.
    pub condition_text: String,
    /// Decision on match.
    pub action: Decision,
    /// Reason attached to the verdict.
    pub reason: String,
    /// Priority; higher wins.
    pub priority: i32,
}

/// Where a ruleset comes from.
#[derive(Debug, Clone)]
pub enum PolicySource {
    /// A YAML file on disk.
    YamlFile(PathBuf),
    /// An in-memory YAML document.
    Yaml(String),
    /// Rules built in code.
    Inline(Vec<RuleSpec>),
}

/// Evaluates a prioritized ruleset against a feature namespace.
///
/// Stateless between evaluations; rules are sorted by descending priority
/// at load and never change afterwards.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
}

impl PolicyEngine {
    /// Load a ruleset from any source.
    pub fn load(source: PolicySource) -> Result<Self, PolicyError> {
        match source {
            PolicySource::YamlFile(path) => Self::from_yaml_str(&std::fs::read_to_string(path)?),
            PolicySource::Yaml(doc) => Self::from_yaml_str(&doc),
            PolicySource::Inline(specs) => Self::from_specs(specs),
        }
    }

    /// Load from a YAML document with a top-level `rules:` list.
    pub fn from_yaml_str(doc: &str) -> Result<Self, PolicyError> {
        let doc: PolicyDoc = serde_yaml::from_str(doc)?;
        Self::from_specs(doc.rules)
    }

    /// Build from in-memory specs.
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, PolicyError> {
        let mut rules = Vec::with_capacity(specs.len());
        let mut seen = std::collections::HashSet::new();
        for spec in specs {
            if !seen.insert(spec.name.clone()) {
                return Err(PolicyError::DuplicateRule(spec.name));
            }
            let condition = parse(&spec.when).map_err(|source| PolicyError::InvalidCondition {
                rule: spec.name.clone(),
                source,
            })?;
            rules.push(PolicyRule {
                name: spec.name,
                condition,
                condition_text: spec.when,
                action: spec.action,
                reason: spec.reason,
                priority: spec.priority,
            });
        }
        // Stable sort keeps definition order within equal priorities.
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority));
        Ok(Self { rules })
    }

    /// The loaded rules in evaluation order (highest priority first).
    #[must_use]
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Evaluate the ruleset against context plus hook-provided features.
    ///
    /// The namespace seeds `drift_score`, `violation_count`, and `step`
    /// from the context; supplied features overwrite those on collision.
    /// The first rule (in priority order) whose condition holds wins. No
    /// match yields `PROCEED`.
    #[must_use]
    pub fn evaluate(
        &self,
        ctx: &RunContext,
        features: &BTreeMap<String, serde_json::Value>,
    ) -> Verdict {
        let mut namespace: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        namespace.insert("drift_score".into(), serde_json::json!(ctx.cumulative_drift));
        namespace.insert(
            "violation_count".into(),
            serde_json::json!(ctx.violation_count),
        );
        namespace.insert("step".into(), serde_json::json!(ctx.step));
        for (key, value) in features {
            namespace.insert(key.clone(), value.clone());
        }

        for rule in &self.rules {
            if rule.condition.matches(&namespace) {
                let mut verdict = Verdict::new(rule.action, 0.9, rule.reason.clone());
                verdict
                    .features
                    .insert("matched_rule".into(), serde_json::json!(rule.name));
                verdict.features.extend(namespace);
                return verdict;
            }
        }

        let mut verdict = Verdict::proceed("no policy rule triggered");
        verdict.features = namespace;
        verdict
    }
}

/// The ruleset that ships with the runtime, as loadable specs.
#[must_use]
pub fn default_policy_specs() -> Vec<RuleSpec> {
    vec![
        RuleSpec {
            name: "violation_block".into(),
            when: "violation_count > 0".into(),
            action: Decision::HardStop,
            reason: "Policy violation detected".into(),
            priority: 15,
        },
        RuleSpec {
            name: "high_drift_block".into(),
            when: "drift_score > 0.5".into(),
            action: Decision::HardStop,
            reason: "Trajectory drift beyond safety threshold".into(),
            priority: 10,
        },
        RuleSpec {
            name: "high_risk_tool".into(),
            when: "tool_risk == 'high'".into(),
            action: Decision::SoftStop,
            reason: "High-risk tool usage requires confirmation".into(),
            priority: 8,
        },
        RuleSpec {
            name: "moderate_drift_warn".into(),
            when: "drift_score > 0.3".into(),
            action: Decision::SoftStop,
            reason: "Trajectory drift approaching threshold - requesting clarification".into(),
            priority: 5,
        },
    ]
}

/// The ruleset that ships with the runtime.
#[must_use]
pub fn default_policy() -> PolicyEngine {
    PolicyEngine::from_specs(default_policy_specs()).expect("default policy is valid")
}
