//! Offline half of the advisory chat: prompt construction, response
//! post-processing and the canned answers served when no model is reachable.

use crate::aggregator::{cash_flow_history, CashFlowPeriod, CategoryBreakdown, FinancialMetrics};
use crate::schema::{BaselineFinancials, Scenario, Transaction};
use crate::utils::format_money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const RECENT_PERIODS: usize = 3;
const MAX_EXTRACTED_RECOMMENDATIONS: usize = 5;

const BASE_CONFIDENCE: f64 = 0.8;
const CONCRETE_BONUS: f64 = 0.1;
const HEDGE_PENALTY: f64 = 0.2;

const BULLET_PREFIXES: &[&str] = &["•", "-", "*", "1.", "2.", "3."];
const RECOMMENDATION_MARKERS: &[&str] = &[
    "recommend",
    "suggest",
    "should",
    "recomiendo",
    "sugiero",
    "deberías",
];
const CONCRETE_MARKERS: &[&str] = &["$", "%", "months", "years", "meses", "años"];
const HEDGE_MARKERS: &[&str] = &[
    "not sure",
    "possibly",
    "maybe",
    "might be",
    "no estoy seguro",
    "posiblemente",
    "tal vez",
    "podría ser",
];

const VISUALIZATION_RULES: &[(&str, &[&str])] = &[
    ("cash_flow_chart", &["cash", "flow", "money", "liquidity", "flujo", "dinero", "liquidez"]),
    ("expense_breakdown", &["expense", "cost", "spending", "gastos", "costos"]),
    ("revenue_trend", &["revenue", "sales", "income", "ingresos", "ventas"]),
    ("projection_chart", &["projection", "forecast", "future", "simulation", "proyección", "futuro", "simulación"]),
];

pub const ADVISOR_PERSONA: &str = r#"
You are a senior financial advisor with more than fifteen years of experience
working with small and medium businesses. Your goal is to help the business
grow in a sustainable and profitable way.

## APPROACH
- Professional but approachable, like a trusted consultant
- Proactive about risks and growth opportunities
- Technical language that a business owner can still follow

## INSTRUCTIONS
1. Answer the specific question with concrete figures from the context
2. Give actionable recommendations grounded in the current situation
3. Suggest key metrics to monitor progress
4. If the question is not financial, steer back to topics that affect growth
5. Finish with a follow-up question that invites a deeper look

## RESPONSE FORMAT
- Assessment of the current situation
- Direct answer with numbers and percentages
- Concrete recommendations as a bulleted list
- Suggested next steps
- One follow-up question
"#;

/// Snapshot of a ledger rendered into the prompt before the client's question.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialContext {
    pub metrics: Option<FinancialMetrics>,
    pub recent_cash_flow: Vec<CashFlowPeriod>,
    pub expense_breakdown: CategoryBreakdown,
    pub revenue_breakdown: CategoryBreakdown,
    pub total_transactions: usize,
}

impl FinancialContext {
    pub fn from_transactions(transactions: &[Transaction], as_of: NaiveDate) -> Self {
        let metrics = FinancialMetrics::from_transactions(transactions, as_of);
        let history = cash_flow_history(transactions);
        let recent_cash_flow = history[history.len().saturating_sub(RECENT_PERIODS)..].to_vec();

        let (expense_breakdown, revenue_breakdown) = metrics
            .as_ref()
            .map(|m| (m.expense_breakdown.clone(), m.revenue_breakdown.clone()))
            .unwrap_or_default();

        Self {
            metrics,
            recent_cash_flow,
            expense_breakdown,
            revenue_breakdown,
            total_transactions: transactions.len(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::from("CURRENT FINANCIAL CONTEXT:\n\n");

        if let Some(m) = &self.metrics {
            let _ = writeln!(out, "• Total revenue: {}", format_money(m.total_revenue));
            let _ = writeln!(out, "• Total expenses: {}", format_money(m.total_expenses));
            let _ = writeln!(out, "• Net profit: {}", format_money(m.net_profit));
            let _ = writeln!(out, "• Profit margin: {:.1}%", m.profit_margin);
            let _ = writeln!(out, "• Cash flow trend: {}\n", m.cash_flow_trend);
        }

        if !self.recent_cash_flow.is_empty() {
            out.push_str("CASH FLOW HISTORY (last 3 months):\n");
            for p in &self.recent_cash_flow {
                let _ = writeln!(
                    out,
                    "• {}: Income {}, Expenses {}, Net {}",
                    p.period,
                    format_money(p.income),
                    format_money(p.expenses),
                    format_money(p.net_cash_flow)
                );
            }
            out.push('\n');
        }

        if !self.expense_breakdown.is_empty() {
            out.push_str("EXPENSE BREAKDOWN:\n");
            for (category, amount) in &self.expense_breakdown {
                let _ = writeln!(out, "• {}: {}", category, format_money(*amount));
            }
            out.push('\n');
        }

        out
    }
}

pub fn build_question_prompt(question: &str, context: &FinancialContext) -> String {
    format!(
        "{}\n{}\nCLIENT QUESTION: {}\n",
        ADVISOR_PERSONA.trim(),
        context.render(),
        question.trim()
    )
}

pub fn build_simulation_prompt(scenario: &Scenario, baseline: &BaselineFinancials) -> String {
    let parameters = serde_json::to_string_pretty(&scenario.parameters.to_map())
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"Analyze the following financial scenario for a small business:

SCENARIO: {}
DESCRIPTION: {}
PARAMETERS: {}

BASELINE:
- Average monthly revenue: {}
- Average monthly expenses: {}
- Net cash flow: {}

Provide:
1. Impact analysis of the scenario
2. Specific recommendations
3. Risk assessment
4. Suggested next steps

Answer clearly and practically.
"#,
        scenario.name,
        scenario.description,
        parameters,
        format_money(baseline.monthly_revenue()),
        format_money(baseline.monthly_expenses()),
        format_money(baseline.net_cash_flow()),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorResponse {
    pub response: String,
    pub recommendations: Vec<String>,
    pub visualizations: Vec<String>,
    pub confidence: f64,
}

impl AdvisorResponse {
    /// Structures free model text: pulls out recommendation lines, scores
    /// confidence and picks charts from the question's wording.
    pub fn from_model_text(text: &str, question: &str) -> Self {
        Self {
            response: text.to_string(),
            recommendations: extract_recommendations(text),
            visualizations: suggest_visualizations(question),
            confidence: score_confidence(text),
        }
    }
}

pub fn extract_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            BULLET_PREFIXES.iter().any(|p| line.starts_with(p))
                || RECOMMENDATION_MARKERS.iter().any(|m| lower.contains(m))
        })
        .take(MAX_EXTRACTED_RECOMMENDATIONS)
        .map(str::to_string)
        .collect()
}

pub fn score_confidence(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut confidence = BASE_CONFIDENCE;

    if CONCRETE_MARKERS.iter().any(|m| lower.contains(m)) {
        confidence += CONCRETE_BONUS;
    }
    if HEDGE_MARKERS.iter().any(|m| lower.contains(m)) {
        confidence -= HEDGE_PENALTY;
    }

    confidence.clamp(0.1, 1.0)
}

pub fn suggest_visualizations(question: &str) -> Vec<String> {
    let lower = question.to_lowercase();
    VISUALIZATION_RULES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(chart, _)| chart.to_string())
        .collect()
}

pub fn fallback_simulation_analysis(scenario: &Scenario) -> String {
    format!(
        r#"**Scenario analysis: {}**

Based on the current financial data, this scenario would have the following impact:

**Financial impact:**
- Change in cash flow: depends on the parameters
- Liquidity impact: needs a detailed review
- Financial risk: moderate to high depending on the size of the change

**Recommendations:**
1. Run a sensitivity analysis
2. Consider phasing in the financing
3. Keep an emergency reserve
4. Track key metrics every month

**Next steps:**
- Validate the scenario assumptions
- Prepare a contingency plan
- Define follow-up metrics
"#,
        scenario.name
    )
}

const HIRING_QUESTION_MARKERS: &[&str] = &["hire", "hiring", "employee", "contratar", "empleado"];
const INVESTMENT_QUESTION_MARKERS: &[&str] = &["invest", "purchase", "buy", "invertir", "compra"];

/// Canned answer used when the model is unavailable.
pub fn fallback_response(question: &str) -> AdvisorResponse {
    let lower = question.to_lowercase();

    if HIRING_QUESTION_MARKERS.iter().any(|m| lower.contains(m)) {
        AdvisorResponse {
            response: r#"Based on your current financial situation I can help you evaluate whether a new hire is viable.

**Viability analysis:**
- Current cash flow and projections
- Total cost of the employee (salary, benefits and taxes)
- Impact on profit margins
- Ability to generate additional revenue

**Recommendations:**
1. Estimate the full cost of the employee (roughly 1.3x base salary)
2. Keep at least 3 months of operating expenses in reserve
3. Consider a part-time or project-based hire first
4. Check whether the hire can bring in additional revenue

Would you like me to run a specific scenario with concrete numbers?"#
                .to_string(),
            recommendations: strings(&[
                "Calculate the total cost of the employee",
                "Keep a reserve of 3 months of operating expenses",
                "Consider a gradual or project-based hire",
                "Evaluate the return on the new hire",
            ]),
            visualizations: strings(&["cash_flow_chart", "projection_chart"]),
            confidence: 0.8,
        }
    } else if INVESTMENT_QUESTION_MARKERS.iter().any(|m| lower.contains(m)) {
        AdvisorResponse {
            response: r#"To evaluate an investment I need to look at several aspects of your finances.

**Factors to consider:**
- Immediate impact on cash flow
- Expected return
- Payback period
- Financing alternatives

**Recommendations:**
1. Calculate the payback period
2. Compare financing options
3. Consider the effect on operating liquidity
4. Model optimistic and pessimistic cases

Could you share more details about the investment you are considering?"#
                .to_string(),
            recommendations: strings(&[
                "Calculate the payback period",
                "Evaluate financing options",
                "Analyze the impact on liquidity",
                "Consider multiple scenarios",
            ]),
            visualizations: strings(&["projection_chart", "cash_flow_chart"]),
            confidence: 0.7,
        }
    } else {
        AdvisorResponse {
            response: r#"Hi! I am your financial advisor. I can help with:

• Viability of new hires
• Evaluating investments and purchases
• Expense optimization
• Financial projections
• Cash flow analysis

Which part of your finances would you like to look at?"#
                .to_string(),
            recommendations: strings(&[
                "Ask specific questions about your financial situation",
                "Share context about your goals",
                "Mention concrete numbers when possible",
            ]),
            visualizations: Vec::new(),
            confidence: 0.9,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
