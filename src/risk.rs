use crate::error::{Result, SimulationError};
use crate::schema::MonthProjection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub qualifier: String,
}

impl RiskAssessment {
    fn new(level: RiskLevel, qualifier: &str) -> Self {
        Self {
            level,
            qualifier: qualifier.to_string(),
        }
    }
}

impl std::fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.level, self.qualifier)
    }
}

pub const INSUFFICIENT_DATA: &str = "insufficient data";

/// Cut-offs used to classify a projection. Ratios are the share of months
/// with negative net cash flow; balances are in the projection's currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RiskThresholds {
    #[schemars(description = "High risk when the share of negative months is strictly above this")]
    pub high_negative_ratio: f64,

    #[schemars(description = "Medium risk when the share of negative months is strictly above this")]
    pub medium_negative_ratio: f64,

    #[schemars(description = "High risk when the final balance is strictly below this")]
    pub high_loss_balance: f64,

    #[schemars(description = "Medium risk when the final balance is strictly below this")]
    pub medium_loss_balance: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_negative_ratio: 0.5,
            medium_negative_ratio: 0.25,
            high_loss_balance: -10_000.0,
            medium_loss_balance: 0.0,
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [
            ("high_negative_ratio", self.high_negative_ratio),
            ("medium_negative_ratio", self.medium_negative_ratio),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(SimulationError::InvalidThreshold(format!(
                    "{} must be between 0.0 and 1.0, got {}",
                    name, ratio
                )));
            }
        }

        if self.medium_negative_ratio > self.high_negative_ratio {
            return Err(SimulationError::InvalidThreshold(format!(
                "medium_negative_ratio ({}) exceeds high_negative_ratio ({})",
                self.medium_negative_ratio, self.high_negative_ratio
            )));
        }

        if !self.high_loss_balance.is_finite() || !self.medium_loss_balance.is_finite() {
            return Err(SimulationError::InvalidThreshold(
                "loss balances must be finite".to_string(),
            ));
        }

        if self.high_loss_balance > self.medium_loss_balance {
            return Err(SimulationError::InvalidThreshold(format!(
                "high_loss_balance ({}) is above medium_loss_balance ({})",
                self.high_loss_balance, self.medium_loss_balance
            )));
        }

        Ok(())
    }
}

pub struct RiskAssessor {
    thresholds: RiskThresholds,
}

impl RiskAssessor {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn assess(&self, projection: &[MonthProjection]) -> RiskAssessment {
        let Some(last) = projection.last() else {
            return RiskAssessment::new(RiskLevel::High, INSUFFICIENT_DATA);
        };

        let negative_months = projection.iter().filter(|m| m.net_cash_flow < 0.0).count();
        let negative_ratio = negative_months as f64 / projection.len() as f64;
        let final_balance = last.cumulative_balance;
        let t = &self.thresholds;

        if negative_ratio > t.high_negative_ratio || final_balance < t.high_loss_balance {
            RiskAssessment::new(
                RiskLevel::High,
                "multiple months with negative cash flow or a deeply negative balance",
            )
        } else if negative_ratio > t.medium_negative_ratio || final_balance < t.medium_loss_balance
        {
            RiskAssessment::new(
                RiskLevel::Medium,
                "some problematic months or a negative balance",
            )
        } else {
            RiskAssessment::new(RiskLevel::Low, "stable cash flow and positive balance")
        }
    }
}

pub fn assess_risk(projection: &[MonthProjection]) -> RiskAssessment {
    RiskAssessor::new(RiskThresholds::default()).assess(projection)
}
