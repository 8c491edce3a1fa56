use crate::config::SimulatorConfig;
use crate::engine::Simulator;
use crate::error::{Result, SimulationError};
use crate::metrics::extract_key_metrics;
use crate::recommendations::RecommendationGenerator;
use crate::risk::RiskAssessor;
use crate::schema::{
    BaselineFinancials, Scenario, ScenarioParameters, SimulationOutcome, SimulationRequest,
};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Runs a scenario end to end: projection, key metrics, recommendations and
/// risk, packaged as a [`SimulationOutcome`].
pub struct ScenarioSimulator {
    config: SimulatorConfig,
    recommender: RecommendationGenerator,
    assessor: RiskAssessor,
}

impl Default for ScenarioSimulator {
    fn default() -> Self {
        Self::from_valid_config(SimulatorConfig::default())
    }
}

impl ScenarioSimulator {
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: SimulatorConfig) -> Self {
        Self {
            recommender: RecommendationGenerator::new(config.max_recommendations),
            assessor: RiskAssessor::new(config.risk_thresholds),
            config,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Scenario using the configured default horizon.
    pub fn new_scenario(&self, name: impl Into<String>, parameters: ScenarioParameters) -> Scenario {
        Scenario::new(name, parameters).with_duration(self.config.default_duration_months)
    }

    pub fn run(&self, scenario: &Scenario, baseline: &BaselineFinancials) -> Result<SimulationOutcome> {
        self.simulate_outcome(scenario, baseline, true)
    }

    pub fn run_request(
        &self,
        request: &SimulationRequest,
        baseline: &BaselineFinancials,
    ) -> Result<SimulationOutcome> {
        debug!(
            "Simulation request for '{}' against baseline period {}",
            request.scenario.name, request.base_data_period
        );
        self.simulate_outcome(&request.scenario, baseline, request.include_recommendations)
    }

    fn simulate_outcome(
        &self,
        scenario: &Scenario,
        baseline: &BaselineFinancials,
        include_recommendations: bool,
    ) -> Result<SimulationOutcome> {
        scenario.validate()?;

        info!(
            "Running scenario '{}' over {} months",
            scenario.name, scenario.duration_months
        );

        let projection = Simulator::new(*baseline).simulate(scenario, scenario.duration_months)?;
        let key_metrics = extract_key_metrics(&projection);
        let recommendations = if include_recommendations {
            self.recommender.generate(&projection, scenario)
        } else {
            Vec::new()
        };
        let risk = self.assessor.assess(&projection);

        info!(
            "Scenario '{}' assessed as {} risk with {} recommendations",
            scenario.name,
            risk.level,
            recommendations.len()
        );

        Ok(SimulationOutcome {
            scenario_name: scenario.name.clone(),
            projected_cash_flow: projection,
            key_metrics,
            recommendations,
            risk_level: risk.level,
            risk_assessment: risk.to_string(),
            confidence_score: self.config.confidence_score,
        })
    }
}

/// Per-tenant baselines shared across request handlers.
///
/// Computing a missing entry happens while the write lock is held, so a
/// concurrent reader sees either no entry or the finished one.
#[derive(Debug, Default)]
pub struct BaselineStore {
    entries: RwLock<HashMap<String, BaselineFinancials>>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, BaselineFinancials>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, BaselineFinancials>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, tenant: &str) -> Result<BaselineFinancials> {
        self.read()
            .get(tenant)
            .copied()
            .ok_or_else(|| SimulationError::UnknownTenant(tenant.to_string()))
    }

    pub fn insert(&self, tenant: impl Into<String>, baseline: BaselineFinancials) {
        self.write().insert(tenant.into(), baseline);
    }

    /// Returns the cached baseline or stores the one `loader` produces.
    /// `loader` runs while the write lock is held and must not access this store.
    pub fn get_or_compute<F>(&self, tenant: &str, loader: F) -> Result<BaselineFinancials>
    where
        F: FnOnce() -> Result<BaselineFinancials>,
    {
        if let Some(baseline) = self.read().get(tenant) {
            return Ok(*baseline);
        }

        let mut entries = self.write();
        if let Some(baseline) = entries.get(tenant) {
            return Ok(*baseline);
        }

        debug!("Computing baseline for tenant {}", tenant);
        let baseline = loader()?;
        entries.insert(tenant.to_string(), baseline);
        Ok(baseline)
    }

    /// Drops the cached baseline. Returns whether one was present.
    pub fn invalidate(&self, tenant: &str) -> bool {
        let removed = self.write().remove(tenant).is_some();
        if removed {
            debug!("Invalidated baseline for tenant {}", tenant);
        }
        removed
    }

    /// Recomputes the baseline unconditionally. On loader failure the
    /// previous entry is kept. `loader` runs under the write lock and must
    /// not access this store.
    pub fn refresh<F>(&self, tenant: &str, loader: F) -> Result<BaselineFinancials>
    where
        F: FnOnce() -> Result<BaselineFinancials>,
    {
        let mut entries = self.write();
        let baseline = loader()?;
        entries.insert(tenant.to_string(), baseline);
        Ok(baseline)
    }

    pub fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self.read().keys().cloned().collect();
        tenants.sort();
        tenants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{RiskLevel, RiskThresholds};
    use std::cell::Cell;

    fn price_increase() -> Scenario {
        Scenario::new(
            "Price increase",
            ScenarioParameters {
                revenue_change_percent: 10.0,
                ..Default::default()
            },
        )
        .with_duration(3)
    }

    #[test]
    fn test_run_packages_outcome() {
        let simulator = ScenarioSimulator::default();
        let outcome = simulator
            .run(&price_increase(), &BaselineFinancials::new(10_000.0, 8_000.0))
            .unwrap();

        assert_eq!(outcome.scenario_name, "Price increase");
        assert_eq!(outcome.projected_cash_flow.len(), 3);
        let metrics = outcome.key_metrics.unwrap();
        assert_eq!(metrics.break_even_month, Some(1));
        assert!((metrics.final_balance - 9_000.0).abs() < 1e-9);
        assert_eq!(outcome.risk_level, RiskLevel::Low);
        assert!(outcome.risk_assessment.starts_with("Low"));
        assert_eq!(outcome.confidence_score, 0.8);
        assert!(!outcome.recommendations.is_empty());
    }

    #[test]
    fn test_request_without_recommendations() {
        let mut request = SimulationRequest::new(price_increase());
        request.include_recommendations = false;

        let outcome = ScenarioSimulator::default()
            .run_request(&request, &BaselineFinancials::new(10_000.0, 8_000.0))
            .unwrap();
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let scenario = price_increase().with_duration(0);
        let err = ScenarioSimulator::default()
            .run(&scenario, &BaselineFinancials::new(1.0, 1.0))
            .unwrap_err();
        assert!(err.is_invalid_scenario());
    }

    #[test]
    fn test_non_finite_parameters_are_rejected() {
        let scenario = Scenario::new(
            "Broken",
            ScenarioParameters {
                revenue_change_percent: f64::NAN,
                ..Default::default()
            },
        );
        let err = ScenarioSimulator::default()
            .run(&scenario, &BaselineFinancials::new(10_000.0, 8_000.0))
            .unwrap_err();
        assert!(err.is_invalid_scenario());
    }

    #[test]
    fn test_config_drives_components() {
        let config = SimulatorConfig {
            confidence_score: 0.6,
            max_recommendations: 1,
            risk_thresholds: RiskThresholds {
                high_loss_balance: -1_000_000.0,
                medium_loss_balance: -500_000.0,
                high_negative_ratio: 1.0,
                medium_negative_ratio: 1.0,
            },
            default_duration_months: 6,
        };
        let simulator = ScenarioSimulator::new(config).unwrap();

        let scenario = simulator.new_scenario("Slow months", ScenarioParameters::default());
        assert_eq!(scenario.duration_months, 6);

        let outcome = simulator
            .run(&scenario, &BaselineFinancials::new(0.0, 5_000.0))
            .unwrap();
        assert_eq!(outcome.recommendations.len(), 1);
        assert_eq!(outcome.risk_level, RiskLevel::Low);
        assert_eq!(outcome.confidence_score, 0.6);
    }

    #[test]
    fn test_configured_horizon_only_applies_to_new_scenario() {
        let config = SimulatorConfig {
            default_duration_months: 6,
            ..Default::default()
        };
        let simulator = ScenarioSimulator::new(config).unwrap();
        let baseline = BaselineFinancials::new(10_000.0, 8_000.0);

        let built = simulator.new_scenario("Built", ScenarioParameters::default());
        assert_eq!(simulator.run(&built, &baseline).unwrap().projected_cash_flow.len(), 6);

        let parsed = Scenario::from_json(r#"{ "name": "Parsed" }"#).unwrap();
        let outcome = simulator.run(&parsed, &baseline).unwrap();
        assert_eq!(outcome.projected_cash_flow.len(), 12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SimulatorConfig {
            confidence_score: -0.1,
            ..Default::default()
        };
        assert!(ScenarioSimulator::new(config).is_err());
    }

    #[test]
    fn test_store_get_or_compute_runs_loader_once() {
        let store = BaselineStore::new();
        let calls = Cell::new(0);
        let loader = || {
            calls.set(calls.get() + 1);
            Ok::<_, SimulationError>(BaselineFinancials::new(12_000.0, 9_000.0))
        };

        let first = store.get_or_compute("acme", loader).unwrap();
        let second = store.get_or_compute("acme", loader).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(store.tenants(), vec!["acme"]);
    }

    #[test]
    fn test_store_loader_error_leaves_no_entry() {
        let store = BaselineStore::new();
        let result = store.get_or_compute("acme", || {
            Err(SimulationError::InvalidTransaction("bad ledger".to_string()))
        });
        assert!(result.is_err());
        assert!(matches!(
            store.get("acme"),
            Err(SimulationError::UnknownTenant(_))
        ));
    }

    #[test]
    fn test_store_invalidate_and_refresh() {
        let store = BaselineStore::new();
        store.insert("acme", BaselineFinancials::new(1.0, 1.0));

        let refreshed = store
            .refresh("acme", || Ok(BaselineFinancials::new(2.0, 1.0)))
            .unwrap();
        assert_eq!(store.get("acme").unwrap(), refreshed);

        assert!(store
            .refresh("acme", || Err(SimulationError::DateError("x".to_string())))
            .is_err());
        assert_eq!(store.get("acme").unwrap(), refreshed);

        assert!(store.invalidate("acme"));
        assert!(!store.invalidate("acme"));
        assert!(store.tenants().is_empty());
    }
}
