use crate::error::{Result, SimulationError};
use crate::recommendations::MAX_RECOMMENDATIONS;
use crate::risk::RiskThresholds;
use crate::schema::{validate_duration, DEFAULT_DURATION_MONTHS, MAX_DURATION_MONTHS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIDENCE_SCORE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SimulatorConfig {
    #[schemars(description = "Cut-offs used to classify scenario risk")]
    pub risk_thresholds: RiskThresholds,

    #[schemars(description = "Confidence attached to every simulation outcome, between 0.0 and 1.0")]
    pub confidence_score: f64,

    #[schemars(
        description = "Horizon given to scenarios built with ScenarioSimulator::new_scenario. Scenarios deserialized without duration_months use 12."
    )]
    /// Only applied by `ScenarioSimulator::new_scenario`. A scenario parsed
    /// from JSON without `duration_months` already carries the fixed default
    /// of 12 and is run as-is.
    pub default_duration_months: i64,

    #[schemars(description = "Maximum number of recommendations returned per simulation, at most 5")]
    pub max_recommendations: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            risk_thresholds: RiskThresholds::default(),
            confidence_score: DEFAULT_CONFIDENCE_SCORE,
            default_duration_months: DEFAULT_DURATION_MONTHS,
            max_recommendations: MAX_RECOMMENDATIONS,
        }
    }
}

impl SimulatorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.risk_thresholds.validate()?;

        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(SimulationError::InvalidConfig(format!(
                "confidence_score {} must be between 0.0 and 1.0",
                self.confidence_score
            )));
        }

        if self.max_recommendations > MAX_RECOMMENDATIONS {
            return Err(SimulationError::InvalidConfig(format!(
                "max_recommendations {} exceeds the limit of {}",
                self.max_recommendations, MAX_RECOMMENDATIONS
            )));
        }

        validate_duration(self.default_duration_months).map_err(|_| {
            SimulationError::InvalidConfig(format!(
                "default_duration_months {} must be between 1 and {}",
                self.default_duration_months, MAX_DURATION_MONTHS
            ))
        })?;

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SimulatorConfig)
    }
}
