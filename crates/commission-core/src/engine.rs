use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::basis::{resolve_basis, CalculationContext, CommissionBasis};
use crate::evaluator::{evaluate_rule, RuleEvaluation};
use crate::rules::{CommissionRule, RuleScope, RuleType};
use crate::types::*;
use crate::CommissionResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// How equal-priority ties are resolved during precedence selection.
///
/// Observed production behavior stacks all rules tied at the highest
/// priority, which allows deliberate rule combination; `LowestRuleId` picks a
/// single deterministic winner instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TiePolicy {
    #[default]
    StackAll,
    LowestRuleId,
}

/// Input for precedence-based calculation over a candidate rule pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedenceInput {
    pub basis_amount: Money,
    pub rules: Vec<CommissionRule>,
    pub context: CalculationContext,
    #[serde(default)]
    pub tie_policy: TiePolicy,
}

/// Input for pure stacking: every rule fires, no precedence filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingInput {
    pub basis_amount: Money,
    pub rules: Vec<CommissionRule>,
    #[serde(default)]
    pub context: CalculationContext,
}

/// Full-pipeline request: basis resolution followed by precedence selection.
/// This is the shape the transaction-processing side submits per sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRequest {
    pub context: CalculationContext,
    pub rules: Vec<CommissionRule>,
    #[serde(default)]
    pub tie_policy: TiePolicy,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One rule's contribution to the total, with its full evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleApplication {
    pub rule_id: String,
    pub rule_type: RuleType,
    pub scope: RuleScope,
    pub priority: i32,
    pub evaluation: RuleEvaluation,
}

/// Complete calculation result with audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationOutput {
    pub basis: CommissionBasis,
    pub basis_amount: Money,
    /// Sum of applied (post-cap) amounts over the applied rules
    pub total_commission: Money,
    /// All candidate rules that matched the context
    pub matched_rule_ids: Vec<String>,
    /// Rules that actually contributed to the total
    pub applied_rules: Vec<RuleApplication>,
    /// Populated when exactly one rule was applied
    pub selected_rule_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Select and apply rules by precedence.
///
/// Matching rules are ranked by priority; the highest-priority subset is
/// applied per the tie policy and each selected rule is evaluated against the
/// same basis amount. Zero matches is a valid zero-commission outcome, never
/// an error, and a misconfigured rule degrades to zero contribution with a
/// warning rather than aborting the calculation.
pub fn calculate_with_precedence(
    input: &PrecedenceInput,
) -> CommissionResult<ComputationOutput<CalculationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let matched: Vec<&CommissionRule> = input
        .rules
        .iter()
        .filter(|rule| rule.matches_context(&input.context))
        .collect();

    for rule in &input.rules {
        warn_if_degenerate(rule, &mut warnings);
    }

    let matched_rule_ids: Vec<String> = matched.iter().map(|r| r.id.clone()).collect();

    let selected: Vec<&CommissionRule> = match matched.iter().map(|r| r.priority).max() {
        Some(top) => {
            let tied: Vec<&CommissionRule> = matched
                .iter()
                .copied()
                .filter(|r| r.priority == top)
                .collect();
            match input.tie_policy {
                TiePolicy::StackAll => tied,
                TiePolicy::LowestRuleId => tied
                    .into_iter()
                    .min_by(|a, b| a.id.cmp(&b.id))
                    .into_iter()
                    .collect(),
            }
        }
        None => Vec::new(),
    };

    let output = apply_rules(
        input.basis_amount,
        input.context.commission_basis,
        matched_rule_ids,
        &selected,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "candidate_count": input.rules.len(),
        "tie_policy": input.tie_policy,
    });

    Ok(with_metadata(
        "Precedence Rule Selection",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Apply every given rule and sum the results (pure stacking).
///
/// Used when the caller has already pre-filtered to exactly the rules that
/// should all fire together, e.g. one plan's rule set. Combining a percentage
/// rule with a flat bonus this way is deliberate.
pub fn calculate_with_context(
    input: &StackingInput,
) -> CommissionResult<ComputationOutput<CalculationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    for rule in &input.rules {
        warn_if_degenerate(rule, &mut warnings);
    }

    let all: Vec<&CommissionRule> = input.rules.iter().collect();
    let matched_rule_ids = all.iter().map(|r| r.id.clone()).collect();
    let output = apply_rules(
        input.basis_amount,
        input.context.commission_basis,
        matched_rule_ids,
        &all,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "rule_count": input.rules.len(),
        "stacking": true,
    });

    Ok(with_metadata(
        "Rule Stacking",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Full pipeline: resolve the basis from the context, then run precedence
/// selection against it. The only entry point that can fail, when the
/// context requests NET_SALES without a net amount.
pub fn calculate_commission(
    request: &CommissionRequest,
) -> CommissionResult<ComputationOutput<CalculationOutput>> {
    let resolved = resolve_basis(&request.context)?;
    calculate_with_precedence(&PrecedenceInput {
        basis_amount: resolved.basis_amount,
        rules: request.rules.clone(),
        context: request.context.clone(),
        tie_policy: request.tie_policy,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn apply_rules(
    basis_amount: Money,
    basis: CommissionBasis,
    matched_rule_ids: Vec<String>,
    selected: &[&CommissionRule],
) -> CalculationOutput {
    let mut total = Decimal::ZERO;
    let mut applied_rules: Vec<RuleApplication> = Vec::with_capacity(selected.len());

    for rule in selected {
        let evaluation = evaluate_rule(basis_amount, rule);
        total += evaluation.applied_amount;
        applied_rules.push(RuleApplication {
            rule_id: rule.id.clone(),
            rule_type: rule.rule_type,
            scope: rule.scope,
            priority: rule.priority,
            evaluation,
        });
    }

    let selected_rule_id = match applied_rules.as_slice() {
        [only] => Some(only.rule_id.clone()),
        _ => None,
    };

    CalculationOutput {
        basis,
        basis_amount,
        total_commission: round_cents(total),
        matched_rule_ids,
        applied_rules,
        selected_rule_id,
    }
}

fn warn_if_degenerate(rule: &CommissionRule, warnings: &mut Vec<String>) {
    if rule.rule_type == RuleType::Tiered && rule.tiers.is_empty() {
        warnings.push(format!(
            "Rule '{}': TIERED with no tiers; contributes zero.",
            rule.id
        ));
    }
    let missing = match rule.scope {
        RuleScope::Global => false,
        RuleScope::CustomerTier => rule.customer_tier.is_none(),
        RuleScope::ProductCategory => rule.product_category_id.is_none(),
        RuleScope::Territory => rule.territory_id.is_none(),
        RuleScope::CustomerSpecific => rule.client_id.is_none(),
    };
    if missing {
        warnings.push(format!(
            "Rule '{}': scope {:?} with no discriminator; never matches.",
            rule.id, rule.scope
        ));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_priority;
    use rust_decimal_macros::dec;

    fn rule(id: &str, scope: RuleScope, value: Money) -> CommissionRule {
        CommissionRule {
            id: id.into(),
            rule_type: RuleType::Percentage,
            value,
            tiers: vec![],
            min_amount: None,
            max_amount: None,
            min_sale_amount: None,
            max_sale_amount: None,
            scope,
            priority: default_priority(scope),
            customer_tier: None,
            product_category_id: None,
            territory_id: None,
            client_id: None,
        }
    }

    #[test]
    fn test_precedence_higher_priority_wins() {
        let global = rule("global-5", RuleScope::Global, dec!(5));
        let vip = CommissionRule {
            customer_tier: Some("VIP".into()),
            ..rule("vip-8", RuleScope::CustomerTier, dec!(8))
        };
        let input = PrecedenceInput {
            basis_amount: dec!(10_000),
            rules: vec![global, vip],
            context: CalculationContext {
                customer_tier: Some("VIP".into()),
                ..Default::default()
            },
            tie_policy: TiePolicy::default(),
        };
        let output = calculate_with_precedence(&input).unwrap().result;
        assert_eq!(output.total_commission, dec!(800));
        assert_eq!(output.matched_rule_ids.len(), 2);
        assert_eq!(output.applied_rules.len(), 1);
        assert_eq!(output.selected_rule_id.as_deref(), Some("vip-8"));
    }

    #[test]
    fn test_precedence_no_match_yields_zero() {
        let specific = CommissionRule {
            client_id: Some("acme".into()),
            ..rule("acme-12", RuleScope::CustomerSpecific, dec!(12))
        };
        let input = PrecedenceInput {
            basis_amount: dec!(10_000),
            rules: vec![specific],
            context: CalculationContext {
                client_id: Some("other-client".into()),
                ..Default::default()
            },
            tie_policy: TiePolicy::default(),
        };
        let output = calculate_with_precedence(&input).unwrap().result;
        assert_eq!(output.total_commission, Decimal::ZERO);
        assert!(output.matched_rule_ids.is_empty());
        assert!(output.applied_rules.is_empty());
        assert!(output.selected_rule_id.is_none());
    }

    #[test]
    fn test_precedence_equal_priority_stacks_by_default() {
        let mut a = rule("bonus-a", RuleScope::Global, dec!(5));
        a.priority = 70;
        let mut b = rule("bonus-b", RuleScope::Global, dec!(3));
        b.priority = 70;
        let input = PrecedenceInput {
            basis_amount: dec!(10_000),
            rules: vec![a, b],
            context: CalculationContext::default(),
            tie_policy: TiePolicy::StackAll,
        };
        let output = calculate_with_precedence(&input).unwrap().result;
        assert_eq!(output.applied_rules.len(), 2);
        assert_eq!(output.total_commission, dec!(800));
        assert!(output.selected_rule_id.is_none());
    }

    #[test]
    fn test_precedence_lowest_rule_id_tie_policy() {
        let mut a = rule("bonus-a", RuleScope::Global, dec!(5));
        a.priority = 70;
        let mut b = rule("bonus-b", RuleScope::Global, dec!(3));
        b.priority = 70;
        let input = PrecedenceInput {
            basis_amount: dec!(10_000),
            rules: vec![b, a],
            context: CalculationContext::default(),
            tie_policy: TiePolicy::LowestRuleId,
        };
        let output = calculate_with_precedence(&input).unwrap().result;
        assert_eq!(output.applied_rules.len(), 1);
        assert_eq!(output.selected_rule_id.as_deref(), Some("bonus-a"));
        assert_eq!(output.total_commission, dec!(500));
    }

    #[test]
    fn test_precedence_lower_priority_excluded_from_audit_applied() {
        let global = rule("global-5", RuleScope::Global, dec!(5));
        let specific = CommissionRule {
            client_id: Some("acme".into()),
            ..rule("acme-12", RuleScope::CustomerSpecific, dec!(12))
        };
        let input = PrecedenceInput {
            basis_amount: dec!(10_000),
            rules: vec![global, specific],
            context: CalculationContext {
                client_id: Some("acme".into()),
                ..Default::default()
            },
            tie_policy: TiePolicy::default(),
        };
        let output = calculate_with_precedence(&input).unwrap().result;
        // Both matched, only the customer-specific rule contributed.
        assert_eq!(output.matched_rule_ids, vec!["global-5", "acme-12"]);
        assert_eq!(output.applied_rules.len(), 1);
        assert_eq!(output.total_commission, dec!(1_200));
    }

    #[test]
    fn test_stacking_sums_all_rules() {
        let pct = rule("pct-10", RuleScope::Global, dec!(10));
        let flat = CommissionRule {
            rule_type: RuleType::FlatAmount,
            value: dec!(500),
            ..rule("flat-500", RuleScope::Global, dec!(500))
        };
        let input = StackingInput {
            basis_amount: dec!(10_000),
            rules: vec![pct, flat],
            context: CalculationContext::default(),
        };
        let output = calculate_with_context(&input).unwrap().result;
        assert_eq!(output.total_commission, dec!(1_500));
        assert_eq!(output.applied_rules.len(), 2);
    }

    #[test]
    fn test_stacking_empty_rule_set() {
        let input = StackingInput {
            basis_amount: dec!(10_000),
            rules: vec![],
            context: CalculationContext::default(),
        };
        let output = calculate_with_context(&input).unwrap().result;
        assert_eq!(output.total_commission, Decimal::ZERO);
        assert!(output.applied_rules.is_empty());
    }

    #[test]
    fn test_degenerate_tiered_rule_warns_not_errors() {
        let broken = CommissionRule {
            rule_type: RuleType::Tiered,
            ..rule("broken", RuleScope::Global, Decimal::ZERO)
        };
        let good = rule("pct-10", RuleScope::Global, dec!(10));
        let input = StackingInput {
            basis_amount: dec!(10_000),
            rules: vec![broken, good],
            context: CalculationContext::default(),
        };
        let output = calculate_with_context(&input).unwrap();
        assert_eq!(output.result.total_commission, dec!(1_000));
        assert!(output.warnings.iter().any(|w| w.contains("broken")));
    }

    #[test]
    fn test_scoped_rule_missing_discriminator_warns() {
        let orphan = rule("orphan", RuleScope::CustomerTier, dec!(8));
        let input = PrecedenceInput {
            basis_amount: dec!(10_000),
            rules: vec![orphan],
            context: CalculationContext {
                customer_tier: Some("VIP".into()),
                ..Default::default()
            },
            tie_policy: TiePolicy::default(),
        };
        let output = calculate_with_precedence(&input).unwrap();
        assert_eq!(output.result.total_commission, Decimal::ZERO);
        assert!(output.warnings.iter().any(|w| w.contains("orphan")));
    }

    #[test]
    fn test_full_pipeline_gross_basis() {
        let request = CommissionRequest {
            context: CalculationContext {
                gross_amount: dec!(10_000),
                ..Default::default()
            },
            rules: vec![rule("pct-10", RuleScope::Global, dec!(10))],
            tie_policy: TiePolicy::default(),
        };
        let output = calculate_commission(&request).unwrap().result;
        assert_eq!(output.basis, CommissionBasis::GrossRevenue);
        assert_eq!(output.basis_amount, dec!(10_000));
        assert_eq!(output.total_commission, dec!(1_000));
    }

    #[test]
    fn test_full_pipeline_net_basis() {
        let request = CommissionRequest {
            context: CalculationContext {
                gross_amount: dec!(10_000),
                net_amount: Some(dec!(9_000)),
                commission_basis: CommissionBasis::NetSales,
                ..Default::default()
            },
            rules: vec![rule("pct-10", RuleScope::Global, dec!(10))],
            tie_policy: TiePolicy::default(),
        };
        let output = calculate_commission(&request).unwrap().result;
        assert_eq!(output.basis, CommissionBasis::NetSales);
        assert_eq!(output.basis_amount, dec!(9_000));
        assert_eq!(output.total_commission, dec!(900));
    }

    #[test]
    fn test_full_pipeline_missing_net_amount_fails() {
        let request = CommissionRequest {
            context: CalculationContext {
                gross_amount: dec!(10_000),
                commission_basis: CommissionBasis::NetSales,
                ..Default::default()
            },
            rules: vec![rule("pct-10", RuleScope::Global, dec!(10))],
            tie_policy: TiePolicy::default(),
        };
        assert!(calculate_commission(&request).is_err());
    }
}
