use anyhow::Result;
use chrono::NaiveDate;
use financial_scenario_simulator::*;

fn sample_ledger() -> Result<Vec<Transaction>> {
    let mut transactions = Vec::new();
    for month in 1..=12u32 {
        let date = NaiveDate::from_ymd_opt(2024, month, 15)
            .ok_or_else(|| anyhow::anyhow!("invalid date 2024-{}-15", month))?;
        transactions.push(Transaction::new(
            date,
            42_000.0 + 750.0 * month as f64,
            "Product sales",
            TransactionCategory::Sales,
            TransactionType::Income,
        )?);
        transactions.push(Transaction::new(
            date,
            21_000.0,
            "Salaries",
            TransactionCategory::Personnel,
            TransactionType::Expense,
        )?);
        transactions.push(Transaction::new(
            date,
            8_500.0,
            "Rent, utilities and supplies",
            TransactionCategory::OperatingExpenses,
            TransactionType::Expense,
        )?);
    }
    Ok(transactions)
}

fn print_outcome(outcome: &SimulationOutcome) {
    println!("\n=== {} ===", outcome.scenario_name);
    println!("{:<10} {:>14} {:>14} {:>14} {:>16}", "Period", "Income", "Expenses", "Net", "Balance");
    for month in &outcome.projected_cash_flow {
        println!(
            "{:<10} {:>14.2} {:>14.2} {:>14.2} {:>16.2}",
            month.period, month.income, month.expenses, month.net_cash_flow, month.cumulative_balance
        );
    }

    match &outcome.key_metrics {
        Some(metrics) => {
            println!("Final balance:    {:.2}", metrics.final_balance);
            println!("Trend:            {:.1}%", metrics.trend_percentage);
            match metrics.break_even_month {
                Some(month) => println!("Break-even month: {}", month),
                None => println!("Break-even month: never"),
            }
        }
        None => println!("No metrics available"),
    }

    println!("Risk: {}", outcome.risk_assessment);
    for recommendation in &outcome.recommendations {
        println!("  - {}", recommendation);
    }
}

fn main() -> Result<()> {
    let ledger = sample_ledger()?;
    let as_of = NaiveDate::from_ymd_opt(2024, 12, 31)
        .ok_or_else(|| anyhow::anyhow!("invalid as-of date"))?;

    if let Some(metrics) = summarize_transactions(&ledger, as_of) {
        println!("Revenue: {:.2}", metrics.total_revenue);
        println!("Expenses: {:.2}", metrics.total_expenses);
        println!("Profit margin: {:.1}%", metrics.profit_margin);
        println!("Cash flow trend: {}", metrics.cash_flow_trend);
    }

    let store = BaselineStore::new();
    let baseline = store.get_or_compute("demo-shop", || Ok(baseline_from_transactions(&ledger)))?;
    let simulator = ScenarioSimulator::new(SimulatorConfig::default())?;

    let scenarios = vec![
        simulator.new_scenario(
            "Hire two sales employees",
            ScenarioParameters {
                revenue_growth_rate: 2.0,
                new_monthly_expense: 9_000.0,
                ..Default::default()
            },
        ),
        simulator.new_scenario(
            "New equipment purchase",
            ScenarioParameters {
                expense_change_percent: 5.0,
                new_monthly_expense: 15_000.0,
                ..Default::default()
            },
        ),
        simulator
            .new_scenario(
                "Price increase",
                ScenarioParameters {
                    revenue_change_percent: 8.0,
                    ..Default::default()
                },
            )
            .with_duration(6),
    ];

    for scenario in &scenarios {
        let outcome = simulator.run(scenario, &baseline)?;
        print_outcome(&outcome);
    }

    println!("\nRequest schema:\n{}", SimulationRequest::schema_as_json()?);
    Ok(())
}
