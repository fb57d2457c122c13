use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use commission_core::engine::{self, CommissionRequest, StackingInput, TiePolicy};
use commission_core::evaluator::{self, SingleRuleInput};
use commission_core::rules::{self, default_priority, CommissionRule, RuleScope, RuleType};

use crate::input;

/// Arguments for the full calculation pipeline
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to a JSON CommissionRequest (context + rules)
    #[arg(long)]
    pub input: Option<String>,

    /// Tie policy when multiple rules share the highest priority
    #[arg(long, value_enum)]
    pub tie_policy: Option<TiePolicyArg>,
}

/// Arguments for pure rule stacking
#[derive(Args)]
pub struct StackArgs {
    /// Path to a JSON StackingInput (basis amount + rules)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for single-rule evaluation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct EvaluateArgs {
    /// Path to a JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Basis amount to evaluate against
    #[arg(long)]
    pub basis_amount: Option<Decimal>,

    /// Rule type
    #[arg(long, value_enum)]
    pub rule_type: Option<RuleTypeArg>,

    /// Percentage figure (10 = 10%) or flat dollar amount
    #[arg(long)]
    pub value: Option<Decimal>,

    /// Minimum commission amount
    #[arg(long)]
    pub min_amount: Option<Decimal>,

    /// Maximum commission amount
    #[arg(long)]
    pub max_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum TiePolicyArg {
    StackAll,
    LowestRuleId,
}

impl From<TiePolicyArg> for TiePolicy {
    fn from(arg: TiePolicyArg) -> Self {
        match arg {
            TiePolicyArg::StackAll => TiePolicy::StackAll,
            TiePolicyArg::LowestRuleId => TiePolicy::LowestRuleId,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RuleTypeArg {
    Percentage,
    FlatAmount,
}

pub fn run_calculate(args: CalculateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: CommissionRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file or piped JSON is required for calculate".into());
    };

    if let Some(policy) = args.tie_policy {
        request.tie_policy = policy.into();
    }

    // Sale-amount applicability is a caller-stage concern; apply it against
    // the gross amount before the rules reach the engine.
    request.rules = rules::filter_by_sale_amount(request.rules, request.context.gross_amount);

    let result = engine::calculate_commission(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stack(args: StackArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let stacking_input: StackingInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file or piped JSON is required for stack".into());
    };

    let result = engine::calculate_with_context(&stacking_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let single_input: SingleRuleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let rule_type = match args
            .rule_type
            .ok_or("--rule-type is required (or provide --input)")?
        {
            RuleTypeArg::Percentage => RuleType::Percentage,
            RuleTypeArg::FlatAmount => RuleType::FlatAmount,
        };
        SingleRuleInput {
            basis_amount: args
                .basis_amount
                .ok_or("--basis-amount is required (or provide --input)")?,
            rule: CommissionRule {
                id: "cli".into(),
                rule_type,
                value: args.value.ok_or("--value is required (or provide --input)")?,
                tiers: vec![],
                min_amount: args.min_amount,
                max_amount: args.max_amount,
                min_sale_amount: None,
                max_sale_amount: None,
                scope: RuleScope::Global,
                priority: default_priority(RuleScope::Global),
                customer_tier: None,
                product_category_id: None,
                territory_id: None,
                client_id: None,
            },
        }
    };

    let result = evaluator::evaluate_single(&single_input)?;
    Ok(serde_json::to_value(result)?)
}
