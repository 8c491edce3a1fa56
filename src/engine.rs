use crate::error::Result;
use crate::schema::{validate_duration, BaselineFinancials, MonthProjection, Scenario};
use crate::utils::projection_label;
use log::debug;

/// Projects monthly cash flow for a scenario on top of a baseline.
///
/// Revenue growth is linear: month `m` (zero-based) receives
/// `revenue_growth_rate * m` percentage points on top of the one-time
/// `revenue_change_percent`. Expenses are shifted once and then carry the
/// fixed `new_monthly_expense`.
pub struct Simulator {
    baseline: BaselineFinancials,
}

impl Simulator {
    pub fn new(baseline: BaselineFinancials) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> &BaselineFinancials {
        &self.baseline
    }

    /// Runs the projection for `duration_months` months. The explicit
    /// duration wins over `scenario.duration_months`.
    pub fn simulate(
        &self,
        scenario: &Scenario,
        duration_months: i64,
    ) -> Result<Vec<MonthProjection>> {
        validate_duration(duration_months)?;
        scenario.parameters.validate()?;

        let params = &scenario.parameters;
        let revenue_shift = params.revenue_change_percent / 100.0;
        let growth_per_month = params.revenue_growth_rate / 100.0;
        let expense_shift = params.expense_change_percent / 100.0;

        debug!(
            "Simulating '{}' for {} months (identity parameters: {})",
            scenario.name,
            duration_months,
            params.is_identity()
        );

        let months = duration_months as usize;
        let mut projection = Vec::with_capacity(months);
        let mut cumulative_balance = 0.0;

        for month in 0..months {
            let income = self.baseline.monthly_revenue()
                * (1.0 + revenue_shift + growth_per_month * month as f64);
            let expenses =
                self.baseline.monthly_expenses() * (1.0 + expense_shift) + params.new_monthly_expense;
            let net_cash_flow = income - expenses;
            cumulative_balance += net_cash_flow;

            projection.push(MonthProjection {
                period: projection_label(month),
                income,
                expenses,
                net_cash_flow,
                cumulative_balance,
            });
        }

        Ok(projection)
    }
}

pub fn simulate(
    scenario: &Scenario,
    baseline: &BaselineFinancials,
    duration_months: i64,
) -> Result<Vec<MonthProjection>> {
    Simulator::new(*baseline).simulate(scenario, duration_months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;
    use crate::schema::ScenarioParameters;

    fn price_increase() -> Scenario {
        Scenario::new(
            "Price increase",
            ScenarioParameters {
                revenue_change_percent: 10.0,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_revenue_change_projection() {
        let baseline = BaselineFinancials::new(10_000.0, 8_000.0);
        let projection = simulate(&price_increase(), &baseline, 3).unwrap();

        assert_eq!(projection.len(), 3);
        let expected_cumulative = [3000.0, 6000.0, 9000.0];
        for (month, expected) in projection.iter().zip(expected_cumulative) {
            assert!((month.income - 11_000.0).abs() < 1e-9);
            assert!((month.expenses - 8_000.0).abs() < 1e-9);
            assert!((month.net_cash_flow - 3_000.0).abs() < 1e-9);
            assert!((month.cumulative_balance - expected).abs() < 1e-9);
        }
        assert_eq!(projection[0].period, "Month 1");
        assert_eq!(projection[2].period, "Month 3");
    }

    #[test]
    fn test_growth_is_linear() {
        let baseline = BaselineFinancials::new(10_000.0, 0.0);
        let scenario = Scenario::new(
            "Growth",
            ScenarioParameters {
                revenue_growth_rate: 5.0,
                ..Default::default()
            },
        );

        let projection = simulate(&scenario, &baseline, 4).unwrap();
        let incomes: Vec<f64> = projection.iter().map(|m| m.income).collect();
        let expected = [10_000.0, 10_500.0, 11_000.0, 11_500.0];
        for (actual, expected) in incomes.iter().zip(expected) {
            assert!(
                (actual - expected).abs() < 1e-9,
                "expected {}, got {}",
                expected,
                actual
            );
        }
    }

    #[test]
    fn test_expense_adjustments() {
        let baseline = BaselineFinancials::new(20_000.0, 10_000.0);
        let scenario = Scenario::new(
            "New hire",
            ScenarioParameters {
                expense_change_percent: 20.0,
                new_monthly_expense: 1_500.0,
                ..Default::default()
            },
        );

        let projection = simulate(&scenario, &baseline, 2).unwrap();
        for month in &projection {
            assert!((month.expenses - 13_500.0).abs() < 1e-9);
            assert!((month.net_cash_flow - 6_500.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_explicit_duration_wins() {
        let baseline = BaselineFinancials::new(1_000.0, 500.0);
        let scenario = price_increase().with_duration(24);

        let projection = simulate(&scenario, &baseline, 6).unwrap();
        assert_eq!(projection.len(), 6);
    }

    #[test]
    fn test_non_positive_duration_fails() {
        let baseline = BaselineFinancials::new(1_000.0, 500.0);
        for duration in [0, -1, -12] {
            let result = simulate(&price_increase(), &baseline, duration);
            assert!(matches!(
                result,
                Err(SimulationError::InvalidDuration(d)) if d == duration
            ));
        }
    }

    #[test]
    fn test_oversized_duration_fails_without_allocating() {
        let baseline = BaselineFinancials::new(1_000.0, 500.0);
        let result = simulate(&price_increase(), &baseline, i64::MAX);
        assert!(matches!(result, Err(SimulationError::InvalidDuration(i64::MAX))));
    }

    #[test]
    fn test_non_finite_parameters_fail_fast() {
        let baseline = BaselineFinancials::new(10_000.0, 8_000.0);
        for params in [
            ScenarioParameters {
                revenue_change_percent: f64::NAN,
                ..Default::default()
            },
            ScenarioParameters {
                new_monthly_expense: f64::INFINITY,
                ..Default::default()
            },
        ] {
            let scenario = Scenario::new("Broken knob", params);
            let err = simulate(&scenario, &baseline, 3).unwrap_err();
            assert!(err.is_invalid_scenario());
        }
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let baseline = BaselineFinancials::new(12_345.67, 9_876.54);
        let scenario = Scenario::new(
            "Mixed",
            ScenarioParameters {
                revenue_change_percent: -3.5,
                revenue_growth_rate: 1.25,
                expense_change_percent: 7.0,
                new_monthly_expense: 321.0,
            },
        );

        let first = simulate(&scenario, &baseline, 18).unwrap();
        let second = simulate(&scenario, &baseline, 18).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_new_business_with_zero_revenue() {
        let baseline = BaselineFinancials::new(0.0, 5_000.0);
        let scenario = Scenario::new(
            "Launch",
            ScenarioParameters {
                revenue_change_percent: 50.0,
                revenue_growth_rate: 10.0,
                ..Default::default()
            },
        );

        let projection = simulate(&scenario, &baseline, 3).unwrap();
        assert!(projection.iter().all(|m| m.income == 0.0));
        assert!((projection[2].cumulative_balance + 15_000.0).abs() < 1e-9);
    }
}
