use crate::error::{Result, SimulationError};
use crate::schema::{BaselineFinancials, Transaction, TransactionCategory, TransactionType};
use crate::utils::{format_money, month_key, parse_month_key, percentage_of};
use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Transactions needed before a recent trend is reported as anything but stable.
const MIN_TRANSACTIONS_FOR_TREND: usize = 6;
const MIN_RECENT_TRANSACTIONS_FOR_TREND: usize = 3;
const RECENT_WINDOW_DAYS: u64 = 90;
const TOP_CATEGORY_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowTrend {
    Positive,
    Negative,
    Stable,
}

impl std::fmt::Display for CashFlowTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Stable => "stable",
        };
        f.write_str(label)
    }
}

pub type CategoryBreakdown = BTreeMap<TransactionCategory, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub profit_margin: f64,
    pub operating_margin: f64,
    pub cash_flow_trend: CashFlowTrend,
    pub expense_breakdown: CategoryBreakdown,
    pub revenue_breakdown: CategoryBreakdown,
}

impl FinancialMetrics {
    /// Reduces a transaction set to period totals. Investments are not
    /// counted as operating expenses here. Returns `None` for an empty set.
    pub fn from_transactions(transactions: &[Transaction], as_of: NaiveDate) -> Option<Self> {
        if transactions.is_empty() {
            return None;
        }

        let total_revenue = total_of(transactions, TransactionType::Income);
        let total_expenses = total_of(transactions, TransactionType::Expense);
        let net_profit = total_revenue - total_expenses;

        Some(Self {
            total_revenue,
            total_expenses,
            net_profit,
            profit_margin: percentage_of(net_profit, total_revenue),
            operating_margin: percentage_of(total_revenue - total_expenses, total_revenue),
            cash_flow_trend: cash_flow_trend(transactions, as_of),
            expense_breakdown: breakdown_of(transactions, TransactionType::Expense),
            revenue_breakdown: breakdown_of(transactions, TransactionType::Income),
        })
    }

    /// Monthly baseline assuming the totals cover twelve months.
    pub fn baseline(&self) -> BaselineFinancials {
        BaselineFinancials::from_annual_totals(self.total_revenue, self.total_expenses)
    }
}

fn total_of(transactions: &[Transaction], kind: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|t| t.transaction_type == kind)
        .map(|t| t.amount)
        .sum()
}

fn breakdown_of(transactions: &[Transaction], kind: TransactionType) -> CategoryBreakdown {
    let mut breakdown = BTreeMap::new();
    for t in transactions.iter().filter(|t| t.transaction_type == kind) {
        *breakdown.entry(t.category).or_insert(0.0) += t.amount;
    }
    breakdown
}

pub fn baseline_from_transactions(transactions: &[Transaction]) -> BaselineFinancials {
    BaselineFinancials::from_annual_totals(
        total_of(transactions, TransactionType::Income),
        total_of(transactions, TransactionType::Expense),
    )
}

/// Direction of the most recent monthly net flows ending at `as_of`.
pub fn cash_flow_trend(transactions: &[Transaction], as_of: NaiveDate) -> CashFlowTrend {
    if transactions.len() < MIN_TRANSACTIONS_FOR_TREND {
        return CashFlowTrend::Stable;
    }

    let window_start = as_of
        .checked_sub_days(Days::new(RECENT_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);
    let recent: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| t.date >= window_start)
        .collect();

    if recent.len() < MIN_RECENT_TRANSACTIONS_FOR_TREND {
        return CashFlowTrend::Stable;
    }

    let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
    for t in recent {
        *monthly.entry(month_key(t.date)).or_insert(0.0) += t.signed_amount();
    }
    let flows: Vec<f64> = monthly.into_values().collect();

    match flows.as_slice() {
        [.., a, b, c] if c > b && b > a => CashFlowTrend::Positive,
        [.., a, b, c] if c < b && b < a => CashFlowTrend::Negative,
        [_, _, _, ..] => CashFlowTrend::Stable,
        [a, b] if b > a => CashFlowTrend::Positive,
        [a, b] if b < a => CashFlowTrend::Negative,
        _ => CashFlowTrend::Stable,
    }
}

/// Actual (historical) totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPeriod {
    /// Calendar month, "YYYY-MM".
    pub period: String,
    pub income: f64,
    pub expenses: f64,
    pub net_cash_flow: f64,
    pub cumulative_balance: f64,
}

impl CashFlowPeriod {
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        parse_month_key(&self.period)
    }
}

/// Groups transactions by calendar month in chronological order. Anything
/// that is not income counts against the month.
pub fn cash_flow_history(transactions: &[Transaction]) -> Vec<CashFlowPeriod> {
    let mut monthly: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for t in transactions {
        let (income, expenses) = monthly.entry(month_key(t.date)).or_insert((0.0, 0.0));
        match t.transaction_type {
            TransactionType::Income => *income += t.amount,
            TransactionType::Expense | TransactionType::Investment => *expenses += t.amount,
        }
    }

    let mut cumulative_balance = 0.0;
    monthly
        .into_iter()
        .map(|(period, (income, expenses))| {
            let net_cash_flow = income - expenses;
            cumulative_balance += net_cash_flow;
            CashFlowPeriod {
                period,
                income,
                expenses,
                net_cash_flow,
                cumulative_balance,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPeriod {
    Last3Months,
    Last6Months,
    Last12Months,
}

impl AnalysisPeriod {
    pub fn months(&self) -> usize {
        match self {
            Self::Last3Months => 3,
            Self::Last6Months => 6,
            Self::Last12Months => 12,
        }
    }
}

impl FromStr for AnalysisPeriod {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "last_3_months" => Ok(Self::Last3Months),
            "last_6_months" => Ok(Self::Last6Months),
            "last_12_months" => Ok(Self::Last12Months),
            other => Err(SimulationError::DateError(format!(
                "Unknown analysis period '{}'. Expected last_3_months, last_6_months or last_12_months",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowReport {
    pub period: AnalysisPeriod,
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_cash_flow: f64,
    pub average_monthly_flow: f64,
    pub trend: CashFlowTrend,
    pub monthly_data: Vec<CashFlowPeriod>,
    pub insights: Vec<String>,
}

/// Summarizes the trailing window of a monthly history. `None` when there is
/// no history at all.
pub fn analyze_cash_flow(history: &[CashFlowPeriod], period: AnalysisPeriod) -> Option<CashFlowReport> {
    if history.is_empty() {
        return None;
    }

    let window = &history[history.len().saturating_sub(period.months())..];
    let total_income: f64 = window.iter().map(|p| p.income).sum();
    let total_expenses: f64 = window.iter().map(|p| p.expenses).sum();
    let average_monthly_flow =
        window.iter().map(|p| p.net_cash_flow).sum::<f64>() / window.len() as f64;

    let trend = match window {
        [.., previous, last] if last.net_cash_flow > previous.net_cash_flow => {
            CashFlowTrend::Positive
        }
        [.., _, _] => CashFlowTrend::Negative,
        _ => CashFlowTrend::Stable,
    };

    let insights = vec![
        format!(
            "Average monthly cash flow: {}",
            format_money(average_monthly_flow)
        ),
        format!("Recent trend: {}", trend),
        format!("Total income in the period: {}", format_money(total_income)),
        format!(
            "Total expenses in the period: {}",
            format_money(total_expenses)
        ),
    ];

    Some(CashFlowReport {
        period,
        total_income,
        total_expenses,
        net_cash_flow: total_income - total_expenses,
        average_monthly_flow,
        trend,
        monthly_data: window.to_vec(),
        insights,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: TransactionCategory,
    pub amount: f64,
    pub percentage: f64,
}

fn top_categories(breakdown: &CategoryBreakdown, total: f64) -> Vec<CategoryShare> {
    let mut shares: Vec<CategoryShare> = breakdown
        .iter()
        .map(|(&category, &amount)| CategoryShare {
            category,
            amount,
            percentage: percentage_of(amount, total),
        })
        .collect();
    shares.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    shares.truncate(TOP_CATEGORY_COUNT);
    shares
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseReport {
    pub total_expenses: f64,
    pub category_breakdown: CategoryBreakdown,
    pub category_percentages: CategoryBreakdown,
    pub top_categories: Vec<CategoryShare>,
    pub insights: Vec<String>,
}

pub fn analyze_expenses(transactions: &[Transaction]) -> Option<ExpenseReport> {
    if transactions.is_empty() {
        return None;
    }

    let category_breakdown = breakdown_of(transactions, TransactionType::Expense);
    let total_expenses: f64 = category_breakdown.values().sum();
    let category_percentages = category_breakdown
        .iter()
        .map(|(&category, &amount)| (category, percentage_of(amount, total_expenses)))
        .collect();
    let top_categories = top_categories(&category_breakdown, total_expenses);

    let mut insights = vec![format!(
        "Total spending in the period: {}",
        format_money(total_expenses)
    )];
    insights.push(match top_categories.first() {
        Some(top) => format!(
            "Largest expense category: {} ({})",
            top.category,
            format_money(top.amount)
        ),
        None => "No expense data".to_string(),
    });
    insights.push(format!(
        "Number of expense categories: {}",
        category_breakdown.len()
    ));

    Some(ExpenseReport {
        total_expenses,
        category_breakdown,
        category_percentages,
        top_categories,
        insights,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueReport {
    pub total_revenue: f64,
    pub average_monthly_revenue: f64,
    pub category_breakdown: CategoryBreakdown,
    pub top_categories: Vec<CategoryShare>,
    pub insights: Vec<String>,
}

/// Revenue by category. The monthly average assumes a twelve-month window.
pub fn analyze_revenue(transactions: &[Transaction]) -> Option<RevenueReport> {
    if transactions.is_empty() {
        return None;
    }

    let category_breakdown = breakdown_of(transactions, TransactionType::Income);
    let total_revenue: f64 = category_breakdown.values().sum();
    let average_monthly_revenue = total_revenue / 12.0;
    let top_categories = top_categories(&category_breakdown, total_revenue);

    let mut insights = vec![
        format!(
            "Total revenue in the period: {}",
            format_money(total_revenue)
        ),
        format!(
            "Average monthly revenue: {}",
            format_money(average_monthly_revenue)
        ),
    ];
    insights.push(match top_categories.first() {
        Some(top) => format!(
            "Main revenue category: {} ({})",
            top.category,
            format_money(top.amount)
        ),
        None => "No revenue data".to_string(),
    });

    Some(RevenueReport {
        total_revenue,
        average_monthly_revenue,
        category_breakdown,
        top_categories,
        insights,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitabilityReport {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_profit: f64,
    pub profit_margin: f64,
    pub operating_margin: f64,
    pub expense_efficiency: f64,
    pub cash_flow_trend: CashFlowTrend,
    pub insights: Vec<String>,
}

pub fn analyze_profitability(metrics: &FinancialMetrics) -> ProfitabilityReport {
    let expense_efficiency =
        percentage_of(metrics.total_revenue - metrics.total_expenses, metrics.total_revenue);

    let insights = vec![
        format!("Profit margin: {:.1}%", metrics.profit_margin),
        format!("Operating margin: {:.1}%", metrics.operating_margin),
        format!("Expense efficiency: {:.1}%", expense_efficiency),
        format!("Cash flow trend: {}", metrics.cash_flow_trend),
    ];

    ProfitabilityReport {
        total_revenue: metrics.total_revenue,
        total_expenses: metrics.total_expenses,
        net_profit: metrics.net_profit,
        profit_margin: metrics.profit_margin,
        operating_margin: metrics.operating_margin,
        expense_efficiency,
        cash_flow_trend: metrics.cash_flow_trend,
        insights,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(
        date: (i32, u32, u32),
        amount: f64,
        category: TransactionCategory,
        kind: TransactionType,
    ) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            format!("{} {}", category, amount),
            category,
            kind,
        )
        .unwrap()
    }

    fn sample_ledger() -> Vec<Transaction> {
        use TransactionCategory::*;
        use TransactionType::*;
        vec![
            tx((2024, 1, 15), 50_000.0, Sales, Income),
            tx((2024, 2, 15), 48_000.0, Sales, Income),
            tx((2024, 3, 15), 52_000.0, Sales, Income),
            tx((2024, 3, 20), 15_000.0, Personnel, Expense),
            tx((2024, 3, 25), 5_000.0, OperatingExpenses, Expense),
            tx((2024, 3, 28), 2_000.0, Utilities, Expense),
            tx((2024, 3, 30), 10_000.0, Equipment, Investment),
        ]
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn test_metrics_totals_and_margins() {
        let metrics = FinancialMetrics::from_transactions(&sample_ledger(), as_of()).unwrap();

        assert_eq!(metrics.total_revenue, 150_000.0);
        assert_eq!(metrics.total_expenses, 22_000.0);
        assert_eq!(metrics.net_profit, 128_000.0);
        assert!((metrics.profit_margin - 128_000.0 / 150_000.0 * 100.0).abs() < 1e-9);
        assert_eq!(metrics.expense_breakdown[&TransactionCategory::Personnel], 15_000.0);
        assert!(!metrics
            .expense_breakdown
            .contains_key(&TransactionCategory::Equipment));
        assert_eq!(metrics.revenue_breakdown.len(), 1);
    }

    #[test]
    fn test_metrics_empty_set() {
        assert!(FinancialMetrics::from_transactions(&[], as_of()).is_none());
    }

    #[test]
    fn test_zero_revenue_margins() {
        let ledger = vec![tx(
            (2024, 1, 10),
            900.0,
            TransactionCategory::Utilities,
            TransactionType::Expense,
        )];
        let metrics = FinancialMetrics::from_transactions(&ledger, as_of()).unwrap();
        assert_eq!(metrics.profit_margin, 0.0);
        assert_eq!(metrics.operating_margin, 0.0);
    }

    #[test]
    fn test_baseline_is_annual_over_twelve() {
        let baseline = baseline_from_transactions(&sample_ledger());
        assert!((baseline.monthly_revenue() - 12_500.0).abs() < 1e-9);
        assert!((baseline.monthly_expenses() - 22_000.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_is_chronological_with_running_balance() {
        let mut ledger = sample_ledger();
        ledger.reverse();

        let history = cash_flow_history(&ledger);
        let periods: Vec<&str> = history.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03"]);

        assert_eq!(history[2].expenses, 32_000.0);
        assert_eq!(history[2].net_cash_flow, 20_000.0);
        assert_eq!(history[2].cumulative_balance, 118_000.0);

        let (start, end) = history[1].date_range().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_trend_needs_enough_data() {
        let ledger = &sample_ledger()[..4];
        assert_eq!(cash_flow_trend(ledger, as_of()), CashFlowTrend::Stable);
    }

    #[test]
    fn test_trend_positive_over_three_months() {
        use TransactionCategory::*;
        use TransactionType::*;
        let ledger = vec![
            tx((2024, 1, 10), 1_000.0, Sales, Income),
            tx((2024, 1, 20), 200.0, Utilities, Expense),
            tx((2024, 2, 10), 2_000.0, Sales, Income),
            tx((2024, 2, 20), 200.0, Utilities, Expense),
            tx((2024, 3, 10), 3_000.0, Sales, Income),
            tx((2024, 3, 20), 200.0, Utilities, Expense),
        ];
        assert_eq!(cash_flow_trend(&ledger, as_of()), CashFlowTrend::Positive);
    }

    #[test]
    fn test_trend_ignores_old_transactions() {
        use TransactionCategory::*;
        use TransactionType::*;
        let ledger = vec![
            tx((2023, 1, 10), 1_000.0, Sales, Income),
            tx((2023, 2, 10), 2_000.0, Sales, Income),
            tx((2023, 3, 10), 3_000.0, Sales, Income),
            tx((2023, 4, 10), 4_000.0, Sales, Income),
            tx((2024, 3, 10), 3_000.0, Sales, Income),
            tx((2024, 3, 20), 200.0, Utilities, Expense),
        ];
        assert_eq!(cash_flow_trend(&ledger, as_of()), CashFlowTrend::Stable);
    }

    #[test]
    fn test_analysis_period_parsing() {
        assert_eq!(
            "last_6_months".parse::<AnalysisPeriod>().unwrap(),
            AnalysisPeriod::Last6Months
        );
        assert!("last_decade".parse::<AnalysisPeriod>().is_err());
    }

    #[test]
    fn test_cash_flow_report_window() {
        let history = cash_flow_history(&sample_ledger());
        let report = analyze_cash_flow(&history, AnalysisPeriod::Last3Months).unwrap();

        assert_eq!(report.monthly_data.len(), 3);
        assert_eq!(report.total_income, 150_000.0);
        assert_eq!(report.trend, CashFlowTrend::Negative);
        assert_eq!(report.insights[2], "Total income in the period: $150,000.00");

        assert!(analyze_cash_flow(&[], AnalysisPeriod::Last3Months).is_none());
    }

    #[test]
    fn test_expense_report() {
        let report = analyze_expenses(&sample_ledger()).unwrap();

        assert_eq!(report.total_expenses, 22_000.0);
        assert_eq!(report.top_categories.len(), 3);
        assert_eq!(report.top_categories[0].category, TransactionCategory::Personnel);
        let personnel_share = report.category_percentages[&TransactionCategory::Personnel];
        assert!((personnel_share - 15_000.0 / 22_000.0 * 100.0).abs() < 1e-9);
        assert_eq!(
            report.insights[1],
            "Largest expense category: personnel ($15,000.00)"
        );
    }

    #[test]
    fn test_revenue_report() {
        let report = analyze_revenue(&sample_ledger()).unwrap();
        assert_eq!(report.total_revenue, 150_000.0);
        assert_eq!(report.average_monthly_revenue, 12_500.0);
        assert_eq!(report.top_categories[0].category, TransactionCategory::Sales);
        assert!(analyze_revenue(&[]).is_none());
    }

    #[test]
    fn test_profitability_report() {
        let metrics = FinancialMetrics::from_transactions(&sample_ledger(), as_of()).unwrap();
        let report = analyze_profitability(&metrics);
        assert!((report.expense_efficiency - metrics.operating_margin).abs() < 1e-9);
        assert_eq!(report.insights.len(), 4);
    }
}
