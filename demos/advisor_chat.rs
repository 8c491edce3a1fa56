use chrono::Local;
use dotenv::dotenv;
use financial_scenario_simulator::llm::{FinancialAdvisor, GeminiClient};
use financial_scenario_simulator::*;
use std::error::Error;
use std::io::{self, Write};

fn sample_ledger() -> std::result::Result<Vec<Transaction>, Box<dyn Error>> {
    let today = Local::now().date_naive();
    let mut transactions = Vec::new();
    for months_back in (0..6u64).rev() {
        let date = today
            .checked_sub_days(chrono::Days::new(months_back * 30))
            .ok_or("date out of range")?;
        transactions.push(Transaction::new(
            date,
            30_000.0 + 1_000.0 * (6 - months_back) as f64,
            "Sales",
            TransactionCategory::Sales,
            TransactionType::Income,
        )?);
        transactions.push(Transaction::new(
            date,
            18_000.0,
            "Payroll",
            TransactionCategory::Personnel,
            TransactionType::Expense,
        )?);
        transactions.push(Transaction::new(
            date,
            4_000.0,
            "Online ads",
            TransactionCategory::Marketing,
            TransactionType::Expense,
        )?);
    }
    Ok(transactions)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    dotenv().ok();

    let advisor = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => FinancialAdvisor::new(GeminiClient::new(key)),
        _ => {
            println!("GEMINI_API_KEY not set, answering offline");
            FinancialAdvisor::offline()
        }
    };
    let ledger = sample_ledger()?;
    let context = FinancialContext::from_transactions(&ledger, Local::now().date_naive());
    let baseline = baseline_from_transactions(&ledger);

    println!("💬 Financial advisor (online: {})", advisor.is_online());

    let scenarios = vec![
        Scenario::new(
            "Hire a customer support employee",
            ScenarioParameters {
                new_monthly_expense: 3_500.0,
                ..Default::default()
            },
        ),
        Scenario::new(
            "Cut marketing spend",
            ScenarioParameters {
                expense_change_percent: -8.0,
                revenue_change_percent: -3.0,
                ..Default::default()
            },
        ),
    ];
    for (scenario, analysis) in scenarios
        .iter()
        .zip(advisor.analyze_scenarios(&scenarios, &baseline).await)
    {
        println!("\n--- {} ---\n{}", scenario.name, analysis);
    }

    println!("\nAsk a question (empty line to quit):");
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut question = String::new();
        io::stdin().read_line(&mut question)?;
        let question = question.trim();
        if question.is_empty() {
            break;
        }

        let response = advisor.analyze_question(question, &context).await;
        println!("\n{}\n", response.response);
        println!("Confidence: {:.0}%", response.confidence * 100.0);
        if !response.visualizations.is_empty() {
            println!("Suggested charts: {}", response.visualizations.join(", "));
        }
    }

    Ok(())
}
