use crate::schema::{MonthProjection, Scenario};

pub const MAX_RECOMMENDATIONS: usize = 5;

pub const INSUFFICIENT_DATA_RECOMMENDATION: &str = "insufficient data for recommendations";

const HIRING_KEYWORDS: &[&str] = &[
    "hire",
    "hiring",
    "employee",
    "personnel",
    "staff",
    "contratación",
    "contratacion",
    "empleado",
];

const INVESTMENT_KEYWORDS: &[&str] = &[
    "investment",
    "invest",
    "purchase",
    "inversión",
    "inversion",
    "compra",
];

const HIRING_RECOMMENDATIONS: &[&str] = &[
    "Consider a probation period before making the hire permanent",
    "Evaluate the impact of the new hire on productivity and revenue",
    "Prepare a contingency plan in case headcount has to be reduced",
];

const INVESTMENT_RECOMMENDATIONS: &[&str] = &[
    "Evaluate financing options for the investment",
    "Consider leasing as an alternative to buying outright",
    "Calculate the payback period of the investment",
];

/// Rule cascade producing at most `limit` recommendations. Rules run in
/// priority order, so earlier rules survive truncation.
pub struct RecommendationGenerator {
    limit: usize,
}

impl Default for RecommendationGenerator {
    fn default() -> Self {
        Self::new(MAX_RECOMMENDATIONS)
    }
}

impl RecommendationGenerator {
    /// `limit` is capped at [`MAX_RECOMMENDATIONS`].
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.min(MAX_RECOMMENDATIONS),
        }
    }

    pub fn generate(&self, projection: &[MonthProjection], scenario: &Scenario) -> Vec<String> {
        let (Some(first), Some(last)) = (projection.first(), projection.last()) else {
            return vec![INSUFFICIENT_DATA_RECOMMENDATION.to_string()];
        };

        let mut recommendations = Vec::new();

        let negative_months = projection.iter().filter(|m| m.net_cash_flow < 0.0).count();
        if negative_months > 0 {
            recommendations.push(format!(
                "Prepare financing to cover {} month{} with negative cash flow",
                negative_months,
                if negative_months == 1 { "" } else { "s" }
            ));
        }

        if last.cumulative_balance < 0.0 {
            recommendations.push(
                "Consider adjusting the scenario parameters to avoid a negative balance"
                    .to_string(),
            );
        } else if last.cumulative_balance > 0.0 {
            recommendations.push("The scenario is financially viable".to_string());
        }

        if last.net_cash_flow > first.net_cash_flow {
            recommendations.push("The scenario shows a positive trend".to_string());
        } else if last.net_cash_flow < first.net_cash_flow {
            recommendations.push("Monitor the negative trend closely".to_string());
        }

        let name = scenario.name.to_lowercase();
        let domain_specific: &[&str] = if matches_any(&name, HIRING_KEYWORDS) {
            HIRING_RECOMMENDATIONS
        } else if matches_any(&name, INVESTMENT_KEYWORDS) {
            INVESTMENT_RECOMMENDATIONS
        } else {
            &[]
        };
        recommendations.extend(domain_specific.iter().map(|r| r.to_string()));

        recommendations.truncate(self.limit);
        recommendations
    }
}

fn matches_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

pub fn generate_recommendations(projection: &[MonthProjection], scenario: &Scenario) -> Vec<String> {
    RecommendationGenerator::default().generate(projection, scenario)
}
