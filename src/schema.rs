use crate::error::{Result, SimulationError};
use crate::metrics::KeyMetrics;
use crate::risk::RiskLevel;
use chrono::NaiveDate;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

pub const DEFAULT_DURATION_MONTHS: i64 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    #[schemars(description = "Money received by the business (sales, services, interest)")]
    Income,

    #[schemars(description = "Money spent on running the business")]
    Expense,

    #[schemars(description = "Capital outlay such as machinery or equipment purchases")]
    Investment,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TransactionCategory {
    Sales,
    OperatingExpenses,
    Personnel,
    Marketing,
    Equipment,
    Utilities,
    Other,
}

impl TransactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::OperatingExpenses => "operating_expenses",
            Self::Personnel => "personnel",
            Self::Marketing => "marketing",
            Self::Equipment => "equipment",
            Self::Utilities => "utilities",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for TransactionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dated movement of money. The amount is always non-negative; the
/// direction is carried by `transaction_type`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "Date the transaction was booked, YYYY-MM-DD")]
    pub date: NaiveDate,

    #[schemars(description = "Non-negative monetary amount")]
    pub amount: f64,

    pub description: String,

    pub category: TransactionCategory,

    pub transaction_type: TransactionType,

    #[serde(default)]
    pub account: Option<String>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        amount: f64,
        description: impl Into<String>,
        category: TransactionCategory,
        transaction_type: TransactionType,
    ) -> Result<Self> {
        let transaction = Self {
            date,
            amount,
            description: description.into(),
            category,
            transaction_type,
            account: None,
        };
        transaction.validate()?;
        Ok(transaction)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(SimulationError::InvalidTransaction(format!(
                "amount {} for '{}' must be a non-negative number",
                self.amount, self.description
            )));
        }
        Ok(())
    }

    /// Amount with the direction applied: income is positive, everything else
    /// leaves the business.
    pub fn signed_amount(&self) -> f64 {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense | TransactionType::Investment => -self.amount,
        }
    }
}

/// Pre-scenario monthly financial state. The net cash flow is always derived
/// from revenue and expenses and cannot be set independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "BaselineRecord", into = "BaselineRecord")]
pub struct BaselineFinancials {
    monthly_revenue: f64,
    monthly_expenses: f64,
}

#[derive(Serialize, Deserialize)]
struct BaselineRecord {
    monthly_revenue: f64,
    monthly_expenses: f64,
    #[serde(default, skip_deserializing)]
    net_cash_flow: f64,
}

impl From<BaselineRecord> for BaselineFinancials {
    fn from(record: BaselineRecord) -> Self {
        Self::new(record.monthly_revenue, record.monthly_expenses)
    }
}

impl From<BaselineFinancials> for BaselineRecord {
    fn from(baseline: BaselineFinancials) -> Self {
        Self {
            monthly_revenue: baseline.monthly_revenue,
            monthly_expenses: baseline.monthly_expenses,
            net_cash_flow: baseline.net_cash_flow(),
        }
    }
}

impl BaselineFinancials {
    /// Revenue and expenses are expected to be non-negative; the simulator
    /// does not re-check this.
    pub fn new(monthly_revenue: f64, monthly_expenses: f64) -> Self {
        Self {
            monthly_revenue,
            monthly_expenses,
        }
    }

    pub fn from_annual_totals(total_revenue: f64, total_expenses: f64) -> Self {
        Self::new(total_revenue / 12.0, total_expenses / 12.0)
    }

    pub fn monthly_revenue(&self) -> f64 {
        self.monthly_revenue
    }

    pub fn monthly_expenses(&self) -> f64 {
        self.monthly_expenses
    }

    pub fn net_cash_flow(&self) -> f64 {
        self.monthly_revenue - self.monthly_expenses
    }
}

/// The knobs a scenario can turn. Every field defaults to zero, which leaves
/// the baseline untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, serde_json::Value>")]
pub struct ScenarioParameters {
    /// One-time percentage shift applied to revenue in every projected month.
    pub revenue_change_percent: f64,
    /// Percentage points added per elapsed month (linear, not compounded).
    pub revenue_growth_rate: f64,
    /// One-time percentage shift applied to expenses.
    pub expense_change_percent: f64,
    /// Fixed additional expense per month.
    pub new_monthly_expense: f64,
}

impl ScenarioParameters {
    pub const REVENUE_CHANGE_PERCENT: &'static str = "revenue_change_percent";
    pub const REVENUE_GROWTH_RATE: &'static str = "revenue_growth_rate";
    pub const EXPENSE_CHANGE_PERCENT: &'static str = "expense_change_percent";
    pub const NEW_MONTHLY_EXPENSE: &'static str = "new_monthly_expense";

    /// Builds the parameters from the open `name -> value` mapping that
    /// callers send. Recognized names must hold finite numbers; anything else
    /// is logged and ignored.
    pub fn from_map(map: &BTreeMap<String, serde_json::Value>) -> Result<Self> {
        let mut params = Self::default();

        for (name, value) in map {
            let slot = match name.as_str() {
                Self::REVENUE_CHANGE_PERCENT => &mut params.revenue_change_percent,
                Self::REVENUE_GROWTH_RATE => &mut params.revenue_growth_rate,
                Self::EXPENSE_CHANGE_PERCENT => &mut params.expense_change_percent,
                Self::NEW_MONTHLY_EXPENSE => &mut params.new_monthly_expense,
                _ => {
                    warn!("Ignoring unrecognized scenario parameter '{}'", name);
                    continue;
                }
            };
            *slot = numeric_parameter(name, value)?;
        }

        Ok(params)
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            (
                Self::REVENUE_CHANGE_PERCENT.to_string(),
                self.revenue_change_percent,
            ),
            (Self::REVENUE_GROWTH_RATE.to_string(), self.revenue_growth_rate),
            (
                Self::EXPENSE_CHANGE_PERCENT.to_string(),
                self.expense_change_percent,
            ),
            (Self::NEW_MONTHLY_EXPENSE.to_string(), self.new_monthly_expense),
        ])
    }

    /// Rejects non-finite knobs, which can only arrive through struct
    /// literals since `from_map` already checks them.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.to_map() {
            finite_parameter(&name, value)?;
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.revenue_change_percent == 0.0
            && self.revenue_growth_rate == 0.0
            && self.expense_change_percent == 0.0
            && self.new_monthly_expense == 0.0
    }
}

fn numeric_parameter(name: &str, value: &serde_json::Value) -> Result<f64> {
    let number = value
        .as_f64()
        .ok_or_else(|| SimulationError::InvalidParameter {
            name: name.to_string(),
            details: format!("expected a number, got {}", value),
        })?;

    finite_parameter(name, number)
}

fn finite_parameter(name: &str, number: f64) -> Result<f64> {
    if !number.is_finite() {
        return Err(SimulationError::InvalidParameter {
            name: name.to_string(),
            details: format!("value must be finite, got {}", number),
        });
    }
    Ok(number)
}

impl TryFrom<BTreeMap<String, serde_json::Value>> for ScenarioParameters {
    type Error = SimulationError;

    fn try_from(map: BTreeMap<String, serde_json::Value>) -> Result<Self> {
        Self::from_map(&map)
    }
}

fn default_duration_months() -> i64 {
    DEFAULT_DURATION_MONTHS
}

/// A named, parametrized what-if change to project forward.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scenario {
    #[schemars(
        description = "Short scenario name. Names mentioning hiring or an investment/purchase unlock extra recommendations."
    )]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    #[schemars(
        with = "BTreeMap<String, f64>",
        description = "Numeric knobs: revenue_change_percent, revenue_growth_rate, expense_change_percent, new_monthly_expense. Missing knobs default to 0."
    )]
    pub parameters: ScenarioParameters,

    #[serde(default = "default_duration_months")]
    #[schemars(description = "Projection horizon in months, between 1 and 1200. Defaults to 12.")]
    pub duration_months: i64,
}

impl Scenario {
    pub fn new(name: impl Into<String>, parameters: ScenarioParameters) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            parameters,
            duration_months: DEFAULT_DURATION_MONTHS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_duration(mut self, duration_months: i64) -> Self {
        self.duration_months = duration_months;
        self
    }

    /// Parses a scenario sent by a caller. Any shape problem is reported as
    /// an invalid scenario rather than a serialization failure.
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidScenario(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SimulationError::InvalidScenario(
                "scenario name must not be empty".to_string(),
            ));
        }
        self.parameters.validate()?;
        validate_duration(self.duration_months)
    }
}

/// Longest horizon accepted, one hundred years.
pub const MAX_DURATION_MONTHS: i64 = 1200;

pub fn validate_duration(duration_months: i64) -> Result<()> {
    if !(1..=MAX_DURATION_MONTHS).contains(&duration_months) {
        return Err(SimulationError::InvalidDuration(duration_months));
    }
    Ok(())
}

fn default_base_data_period() -> String {
    "last_12_months".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SimulationRequest {
    pub scenario: Scenario,

    #[serde(default = "default_base_data_period")]
    #[schemars(description = "Window the baseline was computed from, e.g. last_12_months")]
    pub base_data_period: String,

    #[serde(default = "default_true")]
    pub include_recommendations: bool,
}

impl SimulationRequest {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            base_data_period: default_base_data_period(),
            include_recommendations: true,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(SimulationRequest)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// One simulated month. `cumulative_balance` is the running sum of
/// `net_cash_flow` from the first month up to and including this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthProjection {
    pub period: String,
    pub income: f64,
    pub expenses: f64,
    pub net_cash_flow: f64,
    pub cumulative_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub scenario_name: String,
    pub projected_cash_flow: Vec<MonthProjection>,
    #[serde(
        serialize_with = "serialize_key_metrics",
        deserialize_with = "deserialize_key_metrics",
        default
    )]
    pub key_metrics: Option<KeyMetrics>,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub risk_assessment: String,
    pub confidence_score: f64,
}

fn serialize_key_metrics<S>(
    metrics: &Option<KeyMetrics>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match metrics {
        Some(metrics) => metrics.serialize(serializer),
        None => serializer.collect_map(std::iter::empty::<(String, f64)>()),
    }
}

fn deserialize_key_metrics<'de, D>(deserializer: D) -> std::result::Result<Option<KeyMetrics>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match &value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(map) if map.is_empty() => Ok(None),
        _ => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parameters_from_map() {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_value(json!({
            "revenue_change_percent": 10,
            "new_monthly_expense": 2500.5,
            "marketing_budget": "ignored"
        }))
        .unwrap();

        let params = ScenarioParameters::from_map(&map).unwrap();
        assert_eq!(params.revenue_change_percent, 10.0);
        assert_eq!(params.new_monthly_expense, 2500.5);
        assert_eq!(params.revenue_growth_rate, 0.0);
        assert_eq!(params.expense_change_percent, 0.0);
    }

    #[test]
    fn test_parameters_reject_non_numeric() {
        let map: BTreeMap<String, serde_json::Value> =
            serde_json::from_value(json!({ "revenue_growth_rate": "5%" })).unwrap();

        let err = ScenarioParameters::from_map(&map).unwrap_err();
        assert!(err.is_invalid_scenario());
        assert!(err.to_string().contains("revenue_growth_rate"));
    }

    #[test]
    fn test_scenario_defaults() {
        let scenario = Scenario::from_json(r#"{ "name": "Steady state" }"#).unwrap();
        assert_eq!(scenario.duration_months, 12);
        assert!(scenario.parameters.is_identity());
        assert!(scenario.description.is_empty());
    }

    #[test]
    fn test_scenario_from_json_rejects_bad_parameters() {
        let result = Scenario::from_json(
            r#"{ "name": "Broken", "parameters": { "expense_change_percent": true } }"#,
        );
        assert!(matches!(result, Err(SimulationError::InvalidScenario(_))));
    }

    #[test]
    fn test_scenario_from_json_rejects_zero_duration() {
        let result = Scenario::from_json(r#"{ "name": "Nothing", "duration_months": 0 }"#);
        assert!(matches!(result, Err(SimulationError::InvalidDuration(0))));
    }

    #[test]
    fn test_baseline_net_is_derived() {
        let baseline: BaselineFinancials = serde_json::from_value(json!({
            "monthly_revenue": 10000.0,
            "monthly_expenses": 8000.0,
            "net_cash_flow": 999999.0
        }))
        .unwrap();
        assert_eq!(baseline.net_cash_flow(), 2000.0);

        let value = serde_json::to_value(baseline).unwrap();
        assert_eq!(value["net_cash_flow"], json!(2000.0));
    }

    #[test]
    fn test_baseline_from_annual_totals() {
        let baseline = BaselineFinancials::from_annual_totals(120_000.0, 96_000.0);
        assert_eq!(baseline.monthly_revenue(), 10_000.0);
        assert_eq!(baseline.monthly_expenses(), 8_000.0);
    }

    #[test]
    fn test_transaction_rejects_negative_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let result = Transaction::new(
            date,
            -50.0,
            "Refund",
            TransactionCategory::Sales,
            TransactionType::Income,
        );
        assert!(matches!(result, Err(SimulationError::InvalidTransaction(_))));
    }

    #[test]
    fn test_signed_amount() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let machine = Transaction::new(
            date,
            4000.0,
            "New lathe",
            TransactionCategory::Equipment,
            TransactionType::Investment,
        )
        .unwrap();
        assert_eq!(machine.signed_amount(), -4000.0);
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = SimulationRequest::schema_as_json().unwrap();
        assert!(schema_json.contains("scenario"));
        assert!(schema_json.contains("duration_months"));
        assert!(schema_json.contains("include_recommendations"));
    }

    #[test]
    fn test_scenario_requires_name() {
        let err = Scenario::from_json(r#"{ "name": "   " }"#).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidScenario(_)));
        assert!(err.is_invalid_scenario());
    }

    #[test]
    fn test_non_finite_struct_parameters_rejected() {
        let nan = Scenario::new(
            "Broken knob",
            ScenarioParameters {
                revenue_change_percent: f64::NAN,
                ..Default::default()
            },
        );
        let err = nan.validate().unwrap_err();
        assert!(matches!(
            &err,
            SimulationError::InvalidParameter { name, .. } if name == "revenue_change_percent"
        ));
        assert!(err.is_invalid_scenario());

        let infinite = ScenarioParameters {
            new_monthly_expense: f64::INFINITY,
            ..Default::default()
        };
        assert!(infinite.validate().is_err());
        assert!(ScenarioParameters::default().validate().is_ok());
    }

    #[test]
    fn test_duration_upper_bound() {
        assert!(validate_duration(MAX_DURATION_MONTHS).is_ok());
        assert!(matches!(
            validate_duration(MAX_DURATION_MONTHS + 1),
            Err(SimulationError::InvalidDuration(_))
        ));

        let err = Scenario::from_json(r#"{"name":"Forever","duration_months":9223372036854775807}"#)
            .unwrap_err();
        assert!(matches!(err, SimulationError::InvalidDuration(i64::MAX)));
    }
}
