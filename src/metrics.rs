use crate::schema::MonthProjection;
use crate::utils::ratio_or_zero;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics of a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KeyMetrics {
    pub total_projected_income: f64,
    pub total_projected_expenses: f64,
    pub net_projected_cash_flow: f64,
    pub average_monthly_flow: f64,
    /// Change from the first to the last month's net flow, in percent of the
    /// first month. Zero when the first month nets exactly zero.
    pub trend_percentage: f64,
    /// 1-based index of the first month whose cumulative balance is
    /// non-negative. `None` if the projection never gets there.
    pub break_even_month: Option<u32>,
    pub final_balance: f64,
}

impl KeyMetrics {
    /// Flat `name -> value` view; `break_even_month` maps to `None` when the
    /// projection never breaks even.
    pub fn to_map(&self) -> BTreeMap<&'static str, Option<f64>> {
        BTreeMap::from([
            ("total_projected_income", Some(self.total_projected_income)),
            (
                "total_projected_expenses",
                Some(self.total_projected_expenses),
            ),
            ("net_projected_cash_flow", Some(self.net_projected_cash_flow)),
            ("average_monthly_flow", Some(self.average_monthly_flow)),
            ("trend_percentage", Some(self.trend_percentage)),
            (
                "break_even_month",
                self.break_even_month.map(|month| month as f64),
            ),
            ("final_balance", Some(self.final_balance)),
        ])
    }
}

/// Returns `None` for an empty projection.
pub fn extract_key_metrics(projection: &[MonthProjection]) -> Option<KeyMetrics> {
    let (first, last) = (projection.first()?, projection.last()?);

    let total_projected_income: f64 = projection.iter().map(|m| m.income).sum();
    let total_projected_expenses: f64 = projection.iter().map(|m| m.expenses).sum();
    let net_projected_cash_flow: f64 = projection.iter().map(|m| m.net_cash_flow).sum();

    let trend_percentage =
        ratio_or_zero(last.net_cash_flow - first.net_cash_flow, first.net_cash_flow) * 100.0;

    Some(KeyMetrics {
        total_projected_income,
        total_projected_expenses,
        net_projected_cash_flow,
        average_monthly_flow: net_projected_cash_flow / projection.len() as f64,
        trend_percentage,
        break_even_month: break_even_month(projection),
        final_balance: last.cumulative_balance,
    })
}

pub fn break_even_month(projection: &[MonthProjection]) -> Option<u32> {
    projection
        .iter()
        .position(|m| m.cumulative_balance >= 0.0)
        .map(|idx| idx as u32 + 1)
}
