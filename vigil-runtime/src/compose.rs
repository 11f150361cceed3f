//! Layered defense strategies.
//!
//! A [`Strategy`] names which lifecycle points are active; a [`Composer`]
//! drives a [`SafeguardRuntime`](crate::SafeguardRuntime) pass at each
//! active point for one step and combines the per-layer verdicts under a
//! configurable [`AggregationRule`]. Strategy-level ablation (comparing
//! `pre_only` against `full_stack`, say) is the intended use.

use std::time::Instant;

use vigil_types::{Decision, HookPoint, RunContext, StepEvent, Verdict};

use crate::runtime::SafeguardRuntime;

/// How cross-layer verdicts combine into one final decision.
///
/// The orchestrator's per-pass aggregation is always most-restrictive;
/// this rule applies on top, across the layers of a composed strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationRule {
    /// The highest-priority decision wins.
    #[default]
    MostRestrictive,
    /// The most frequent decision wins; ties go to the more restrictive.
    MajorityVote,
    /// Confidence totals per decision; the largest wins, ties go to the
    /// more restrictive.
    ConfidenceWeighted,
}

impl AggregationRule {
    /// Combine verdicts into one decision. Empty input is `PROCEED`.
    #[must_use]
    pub fn aggregate(self, verdicts: &[Verdict]) -> Decision {
        let Some(first) = verdicts.first() else {
            return Decision::Proceed;
        };
        match self {
            Self::MostRestrictive => verdicts
                .iter()
                .map(|verdict| verdict.decision)
                .max()
                .unwrap_or(first.decision),
            Self::MajorityVote => {
                pick_by_score(verdicts, |count, _| count as f64)
            }
            Self::ConfidenceWeighted => {
                pick_by_score(verdicts, |_, confidence_sum| confidence_sum)
            }
        }
    }
}

/// Tally verdicts per decision and pick the best-scoring one; ties break
/// toward the more restrictive decision.
fn pick_by_score(verdicts: &[Verdict], score: impl Fn(usize, f64) -> f64) -> Decision {
    // Indexed by decision priority.
    let mut counts = [0usize; 5];
    let mut confidence_sums = [0.0f64; 5];
    for verdict in verdicts {
        let index = verdict.decision.priority() as usize;
        counts[index] += 1;
        confidence_sums[index] += verdict.confidence;
    }

    let mut best = Decision::Proceed;
    let mut best_score = f64::NEG_INFINITY;
    for decision in [
        Decision::Proceed,
        Decision::LogOnly,
        Decision::SoftStop,
        Decision::HumanReview,
        Decision::HardStop,
    ] {
        let index = decision.priority() as usize;
        if counts[index] == 0 {
            continue;
        }
        let value = score(counts[index], confidence_sums[index]);
        // `>=` so equal scores fall to the later, more restrictive entry.
        if value >= best_score {
            best = decision;
            best_score = value;
        }
    }
    best
}

/// A named set of active lifecycle points.
#[derive(Debug, Clone)]
pub struct Strategy {
    name: &'static str,
    points: &'static [HookPoint],
}

impl Strategy {
    /// No safeguards (baseline).
    #[must_use]
    pub const fn none() -> Self {
        Self {
            name: "none",
            points: &[],
        }
    }

    /// Pre-action checks only.
    #[must_use]
    pub const fn pre_only() -> Self {
        Self {
            name: "pre_only",
            points: &[HookPoint::PreAction],
        }
    }

    /// Mid-step monitoring only.
    #[must_use]
    pub const fn mid_only() -> Self {
        Self {
            name: "mid_only",
            points: &[HookPoint::MidStep],
        }
    }

    /// Post-action audit only.
    #[must_use]
    pub const fn post_only() -> Self {
        Self {
            name: "post_only",
            points: &[HookPoint::PostAction],
        }
    }

    /// Pre-action plus mid-step.
    #[must_use]
    pub const fn pre_mid() -> Self {
        Self {
            name: "pre_mid",
            points: &[HookPoint::PreAction, HookPoint::MidStep],
        }
    }

    /// All three layers (recommended).
    #[must_use]
    pub const fn full_stack() -> Self {
        Self {
            name: "full_stack",
            points: &[
                HookPoint::PreAction,
                HookPoint::MidStep,
                HookPoint::PostAction,
            ],
        }
    }

    /// The strategy's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The active points, in lifecycle order.
    #[must_use]
    pub const fn points(&self) -> &'static [HookPoint] {
        self.points
    }
}

/// The outcome of executing a composed strategy for one step.
#[derive(Debug, Clone)]
pub struct ComposedOutcome {
    /// The combined decision across layers.
    pub final_decision: Decision,
    /// The per-layer aggregated verdicts, in lifecycle order.
    pub layer_verdicts: Vec<Verdict>,
    /// Which strategy ran.
    pub strategy: &'static str,
    /// Total wall time across layers in milliseconds.
    pub elapsed_ms: f64,
}

/// Executes a [`Strategy`] against a runtime.
#[derive(Debug, Clone)]
pub struct Composer {
    strategy: Strategy,
    rule: AggregationRule,
}

impl Composer {
    /// Compose a strategy with an aggregation rule. Callers that want the
    /// configured rule pass `runtime.config().aggregation_rule`.
    #[must_use]
    pub fn new(strategy: Strategy, rule: AggregationRule) -> Self {
        Self { strategy, rule }
    }

    /// Run every active layer for one step event and combine the results.
    pub async fn execute(
        &self,
        runtime: &SafeguardRuntime,
        ctx: &RunContext,
        event: &StepEvent,
    ) -> ComposedOutcome {
        let start = Instant::now();
        let mut layer_verdicts = Vec::with_capacity(self.strategy.points().len());
        for point in self.strategy.points() {
            layer_verdicts.push(runtime.step(*point, ctx, event).await);
        }
        ComposedOutcome {
            final_decision: self.rule.aggregate(&layer_verdicts),
            layer_verdicts,
            strategy: self.strategy.name(),
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }
}
