use futures::future::join_all;
use log::{info, warn};

use crate::advisor::{
    build_question_prompt, build_simulation_prompt, fallback_response,
    fallback_simulation_analysis, AdvisorResponse, FinancialContext,
};
use crate::llm::client::GeminiClient;
use crate::schema::{BaselineFinancials, Scenario};

/// Chat-style financial advisor backed by Gemini. Model failures never
/// surface to the caller; the offline answers are served instead.
pub struct FinancialAdvisor {
    client: Option<GeminiClient>,
}

impl FinancialAdvisor {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Advisor that always answers from the offline fallbacks.
    pub fn offline() -> Self {
        Self { client: None }
    }

    pub fn is_online(&self) -> bool {
        self.client.is_some()
    }

    pub async fn analyze_question(
        &self,
        question: &str,
        context: &FinancialContext,
    ) -> AdvisorResponse {
        let Some(client) = &self.client else {
            return fallback_response(question);
        };

        let prompt = build_question_prompt(question, context);
        match client.generate_text(&prompt).await {
            Ok(text) => {
                info!("Advisor answered question ({} chars)", text.len());
                AdvisorResponse::from_model_text(&text, question)
            }
            Err(e) => {
                warn!("Advisor question failed, using offline answer: {}", e);
                fallback_response(question)
            }
        }
    }

    pub async fn analyze_simulation(
        &self,
        scenario: &Scenario,
        baseline: &BaselineFinancials,
    ) -> String {
        let Some(client) = &self.client else {
            return fallback_simulation_analysis(scenario);
        };

        let prompt = build_simulation_prompt(scenario, baseline);
        match client.generate_text(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Simulation analysis for '{}' failed, using offline analysis: {}",
                    scenario.name, e
                );
                fallback_simulation_analysis(scenario)
            }
        }
    }

    /// Analyzes several scenarios against the same baseline concurrently.
    /// Results keep the order of `scenarios`.
    pub async fn analyze_scenarios(
        &self,
        scenarios: &[Scenario],
        baseline: &BaselineFinancials,
    ) -> Vec<String> {
        info!("Analyzing {} scenarios", scenarios.len());
        join_all(
            scenarios
                .iter()
                .map(|scenario| self.analyze_simulation(scenario, baseline)),
        )
        .await
    }
}
