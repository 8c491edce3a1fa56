//! # Financial Scenario Simulator
//!
//! What-if cash flow projections for small and medium businesses. A baseline
//! (average monthly revenue and expenses) is pushed forward under a scenario's
//! parameters, and the resulting month-by-month projection is summarized into
//! key metrics, a risk level and a short list of recommendations.
//!
//! ## Core Concepts
//!
//! - **Baseline**: monthly revenue and expenses, supplied directly or derived from a ledger
//! - **Scenario**: named knobs (revenue shift, linear growth, expense shift, new fixed expense) and a horizon
//! - **Projection**: one [`MonthProjection`] per month with a running cumulative balance
//! - **Outcome**: projection plus key metrics, recommendations and risk, see [`SimulationOutcome`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_scenario_simulator::*;
//!
//! let baseline = BaselineFinancials::new(10_000.0, 8_000.0);
//! let scenario = Scenario::new(
//!     "Price increase",
//!     ScenarioParameters {
//!         revenue_change_percent: 10.0,
//!         ..Default::default()
//!     },
//! )
//! .with_duration(3);
//!
//! let outcome = run_simulation(&scenario, &baseline).unwrap();
//! assert_eq!(outcome.key_metrics.unwrap().break_even_month, Some(1));
//! ```

pub mod advisor;
pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod recommendations;
pub mod risk;
pub mod schema;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

pub use advisor::{
    build_question_prompt, build_simulation_prompt, fallback_response,
    fallback_simulation_analysis, AdvisorResponse, FinancialContext,
};
pub use aggregator::{
    analyze_cash_flow, analyze_expenses, analyze_profitability, analyze_revenue,
    baseline_from_transactions, cash_flow_history, cash_flow_trend, AnalysisPeriod,
    CashFlowPeriod, CashFlowReport, CashFlowTrend, CategoryBreakdown, CategoryShare,
    ExpenseReport, FinancialMetrics, ProfitabilityReport, RevenueReport,
};
pub use config::SimulatorConfig;
pub use engine::{simulate, Simulator};
pub use error::{Result, SimulationError};
pub use metrics::{break_even_month, extract_key_metrics, KeyMetrics};
pub use orchestrator::{BaselineStore, ScenarioSimulator};
pub use recommendations::{generate_recommendations, RecommendationGenerator};
pub use risk::{assess_risk, RiskAssessment, RiskAssessor, RiskLevel, RiskThresholds};
pub use schema::*;

use chrono::NaiveDate;
use log::info;

/// Runs a scenario with the default configuration.
pub fn run_simulation(scenario: &Scenario, baseline: &BaselineFinancials) -> Result<SimulationOutcome> {
    ScenarioSimulator::default().run(scenario, baseline)
}

/// Derives the baseline from a ledger and runs the scenario on it. The ledger
/// is treated as a twelve-month window.
pub fn simulate_from_transactions(
    scenario: &Scenario,
    transactions: &[Transaction],
) -> Result<SimulationOutcome> {
    for transaction in transactions {
        transaction.validate()?;
    }

    let baseline = baseline_from_transactions(transactions);
    info!(
        "Baseline from {} transactions: revenue {:.2}/month, expenses {:.2}/month",
        transactions.len(),
        baseline.monthly_revenue(),
        baseline.monthly_expenses()
    );

    run_simulation(scenario, &baseline)
}

/// Ledger summary as of `as_of`, or `None` for an empty ledger.
pub fn summarize_transactions(
    transactions: &[Transaction],
    as_of: NaiveDate,
) -> Option<FinancialMetrics> {
    FinancialMetrics::from_transactions(transactions, as_of)
}
