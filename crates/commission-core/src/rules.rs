use serde::{Deserialize, Serialize};

use crate::basis::CalculationContext;
use crate::error::CommissionError;
use crate::types::*;
use crate::CommissionResult;

// ---------------------------------------------------------------------------
// Rule model
// ---------------------------------------------------------------------------

/// How a rule turns a basis amount into a commission amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    Percentage,
    FlatAmount,
    Tiered,
}

/// Which contextual fields a rule must match to become a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleScope {
    Global,
    CustomerTier,
    ProductCategory,
    Territory,
    CustomerSpecific,
}

/// One step of a tiered rate schedule. `threshold` is the cumulative basis
/// amount at which `rate` begins applying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTier {
    pub threshold: Money,
    pub rate: Percent,
}

/// A persisted commission rule configuration.
///
/// `value` is a percentage figure for Percentage rules, a dollar amount for
/// FlatAmount rules, and unused for Tiered rules. `min_amount`/`max_amount`
/// cap the computed commission, never the sale amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommissionRule {
    pub id: String,
    pub rule_type: RuleType,
    #[serde(default)]
    pub value: Money,
    #[serde(default)]
    pub tiers: Vec<RateTier>,
    #[serde(default)]
    pub min_amount: Option<Money>,
    #[serde(default)]
    pub max_amount: Option<Money>,
    /// Applicability filter: the rule only applies to transactions whose sale
    /// amount falls in this range. Enforced by the caller stage, not by the
    /// engine entry points.
    #[serde(default)]
    pub min_sale_amount: Option<Money>,
    #[serde(default)]
    pub max_sale_amount: Option<Money>,
    pub scope: RuleScope,
    pub priority: i32,
    #[serde(default)]
    pub customer_tier: Option<String>,
    #[serde(default)]
    pub product_category_id: Option<String>,
    #[serde(default)]
    pub territory_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Conventional priority ladder for each scope. Administrators may override
/// per rule; these are the defaults new rules are seeded with.
pub fn default_priority(scope: RuleScope) -> i32 {
    match scope {
        RuleScope::Global => 50,
        RuleScope::CustomerTier => 60,
        RuleScope::ProductCategory => 70,
        RuleScope::Territory => 80,
        RuleScope::CustomerSpecific => 90,
    }
}

// ---------------------------------------------------------------------------
// Matching and filtering
// ---------------------------------------------------------------------------

impl CommissionRule {
    /// Whether this rule is a candidate for the given context.
    ///
    /// A scoped rule with a missing discriminator never matches, and a scoped
    /// rule never matches a context missing the corresponding key.
    pub fn matches_context(&self, context: &CalculationContext) -> bool {
        match self.scope {
            RuleScope::Global => true,
            RuleScope::CustomerTier => {
                discriminator_matches(&self.customer_tier, &context.customer_tier)
            }
            RuleScope::ProductCategory => {
                discriminator_matches(&self.product_category_id, &context.product_category_id)
            }
            RuleScope::Territory => {
                discriminator_matches(&self.territory_id, &context.territory_id)
            }
            RuleScope::CustomerSpecific => {
                discriminator_matches(&self.client_id, &context.client_id)
            }
        }
    }

    /// Validate a rule configuration before persisting it. The engine itself
    /// tolerates degenerate rules (they contribute zero); this is the stricter
    /// check the plan-management side runs at edit time.
    pub fn validate(&self) -> CommissionResult<()> {
        if self.rule_type == RuleType::Tiered {
            if self.tiers.is_empty() {
                return Err(self.invalid("TIERED rule requires at least one tier"));
            }
            for pair in self.tiers.windows(2) {
                if pair[1].threshold <= pair[0].threshold {
                    return Err(self.invalid("tier thresholds must be strictly ascending"));
                }
            }
        }

        let discriminator = match self.scope {
            RuleScope::Global => None,
            RuleScope::CustomerTier => Some(("customer_tier", self.customer_tier.is_some())),
            RuleScope::ProductCategory => {
                Some(("product_category_id", self.product_category_id.is_some()))
            }
            RuleScope::Territory => Some(("territory_id", self.territory_id.is_some())),
            RuleScope::CustomerSpecific => Some(("client_id", self.client_id.is_some())),
        };
        if let Some((field, present)) = discriminator {
            if !present {
                return Err(self.invalid(&format!("scope requires {field} to be set")));
            }
        }

        if let (Some(min), Some(max)) = (self.min_amount, self.max_amount) {
            if min > max {
                return Err(self.invalid("min_amount exceeds max_amount"));
            }
        }
        if let (Some(min), Some(max)) = (self.min_sale_amount, self.max_sale_amount) {
            if min > max {
                return Err(self.invalid("min_sale_amount exceeds max_sale_amount"));
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> CommissionError {
        CommissionError::InvalidRule {
            rule_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

fn discriminator_matches(rule_key: &Option<String>, context_key: &Option<String>) -> bool {
    match (rule_key, context_key) {
        (Some(r), Some(c)) => r == c,
        _ => false,
    }
}

/// Caller-stage applicability filter: drop rules whose sale-amount range
/// excludes this transaction. Bounds are inclusive. The engine entry points
/// assume this has already run and do not re-check.
pub fn filter_by_sale_amount(rules: Vec<CommissionRule>, sale_amount: Money) -> Vec<CommissionRule> {
    rules
        .into_iter()
        .filter(|rule| {
            if let Some(min) = rule.min_sale_amount {
                if sale_amount < min {
                    return false;
                }
            }
            if let Some(max) = rule.max_sale_amount {
                if sale_amount > max {
                    return false;
                }
            }
            true
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
