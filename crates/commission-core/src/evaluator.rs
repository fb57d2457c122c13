use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::rules::{CommissionRule, RuleType};
use crate::types::*;
use crate::CommissionResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Result of evaluating one rule against a basis amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluation {
    /// Raw commission before caps
    pub calculated_amount: Money,
    /// Commission after min/max caps
    pub applied_amount: Money,
    pub capped_by_min: bool,
    pub capped_by_max: bool,
    /// Per-tier contributions; empty for non-tiered rules
    pub tier_breakdown: Vec<TierContribution>,
}

/// One tier's contribution to a tiered evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierContribution {
    pub threshold: Money,
    pub rate: Percent,
    /// Slice of the basis amount falling in this tier
    pub amount: Money,
    pub commission: Money,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate a single rule against a basis amount.
///
/// The basis may be any amount including zero and negatives (returns reduce
/// owed commission). Caps apply to the computed commission, never to the
/// basis, and min/max are mutually exclusive outcomes per evaluation. All
/// monetary outputs are rounded to cents at the point of computation.
pub fn evaluate_rule(basis_amount: Money, rule: &CommissionRule) -> RuleEvaluation {
    let (calculated_amount, tier_breakdown) = match rule.rule_type {
        RuleType::Percentage => (
            round_cents(basis_amount * rule.value / Decimal::ONE_HUNDRED),
            Vec::new(),
        ),
        RuleType::FlatAmount => (round_cents(rule.value), Vec::new()),
        RuleType::Tiered => evaluate_tiers(basis_amount, rule),
    };

    let (applied_amount, capped_by_min, capped_by_max) = apply_caps(
        calculated_amount,
        rule.min_amount.map(round_cents),
        rule.max_amount.map(round_cents),
    );

    RuleEvaluation {
        calculated_amount,
        applied_amount,
        capped_by_min,
        capped_by_max,
        tier_breakdown,
    }
}

/// Walk the tier schedule and accumulate each tier's slice of the basis.
///
/// Empty tiers are a defined degenerate case yielding zero, not an error.
/// Basis below the first threshold contributes nothing.
fn evaluate_tiers(basis_amount: Money, rule: &CommissionRule) -> (Money, Vec<TierContribution>) {
    if rule.tiers.is_empty() {
        return (Decimal::ZERO, Vec::new());
    }

    let mut tiers = rule.tiers.clone();
    tiers.sort_by(|a, b| a.threshold.cmp(&b.threshold));

    let mut total = Decimal::ZERO;
    let mut breakdown = Vec::new();

    for (i, tier) in tiers.iter().enumerate() {
        let upper = tiers.get(i + 1).map(|next| next.threshold);
        let capped_basis = match upper {
            Some(u) => basis_amount.min(u),
            None => basis_amount,
        };
        let slice = (capped_basis - tier.threshold).max(Decimal::ZERO);
        if slice.is_zero() {
            continue;
        }
        let commission = round_cents(slice * tier.rate / Decimal::ONE_HUNDRED);
        total += commission;
        breakdown.push(TierContribution {
            threshold: tier.threshold,
            rate: tier.rate,
            amount: slice,
            commission,
        });
    }

    (total, breakdown)
}

/// Apply min/max caps to a computed commission. Idempotent: capping an
/// already-capped amount leaves it unchanged.
fn apply_caps(
    calculated: Money,
    min_amount: Option<Money>,
    max_amount: Option<Money>,
) -> (Money, bool, bool) {
    if let Some(min) = min_amount {
        if calculated < min {
            return (min, true, false);
        }
    }
    if let Some(max) = max_amount {
        if calculated > max {
            return (max, false, true);
        }
    }
    (calculated, false, false)
}

// ---------------------------------------------------------------------------
// Envelope wrapper
// ---------------------------------------------------------------------------

/// Input for a standalone single-rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleRuleInput {
    pub basis_amount: Money,
    pub rule: CommissionRule,
}

/// Evaluate one rule and wrap the result in the standard output envelope.
pub fn evaluate_single(
    input: &SingleRuleInput,
) -> CommissionResult<ComputationOutput<RuleEvaluation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rule.rule_type == RuleType::Tiered && input.rule.tiers.is_empty() {
        warnings.push(format!(
            "Rule '{}': TIERED with no tiers; contributes zero.",
            input.rule.id
        ));
    }

    let evaluation = evaluate_rule(input.basis_amount, &input.rule);

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "rule_id": input.rule.id,
        "rule_type": input.rule.rule_type,
        "basis_amount": input.basis_amount,
    });

    Ok(with_metadata(
        "Single Rule Evaluation",
        &assumptions,
        warnings,
        elapsed,
        evaluation,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
