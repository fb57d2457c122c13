use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CommissionError;
use crate::types::*;
use crate::CommissionResult;

/// Which transaction amount commission is computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionBasis {
    #[default]
    GrossRevenue,
    NetSales,
}

/// Per-transaction calculation context, built fresh by the caller for each
/// calculation. Never persisted by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculationContext {
    /// Transaction's raw amount
    pub gross_amount: Money,
    /// Gross minus returns/credits for the same logical sale. Supplied by the
    /// caller's net-sales calculator; required only under NetSales basis.
    pub net_amount: Option<Money>,
    pub commission_basis: CommissionBasis,
    pub customer_id: Option<String>,
    pub customer_tier: Option<String>,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub product_category_id: Option<String>,
    pub territory_id: Option<String>,
    /// Informational only; no time-windowed rule matching.
    pub transaction_date: Option<NaiveDate>,
}

/// Basis selection result: which basis was used and its dollar value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolvedBasis {
    pub basis: CommissionBasis,
    pub basis_amount: Money,
}

/// Resolve the basis amount for a calculation.
///
/// Resolution happens once per calculation; the resulting amount is fed
/// identically into every selected rule's evaluation. A NetSales context
/// without a net amount is a caller contract violation and fails fast.
pub fn resolve_basis(context: &CalculationContext) -> CommissionResult<ResolvedBasis> {
    match context.commission_basis {
        CommissionBasis::NetSales => {
            let net = context
                .net_amount
                .ok_or_else(|| CommissionError::InvalidInput {
                    field: "net_amount".into(),
                    reason: "NET_SALES basis requires a net amount from the net-sales calculator"
                        .into(),
                })?;
            Ok(ResolvedBasis {
                basis: CommissionBasis::NetSales,
                basis_amount: net,
            })
        }
        CommissionBasis::GrossRevenue => Ok(ResolvedBasis {
            basis: CommissionBasis::GrossRevenue,
            basis_amount: context.gross_amount,
        }),
    }
}
