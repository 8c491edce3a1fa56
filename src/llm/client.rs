use crate::error::{Result, SimulationError};
use crate::llm::types::*;
use log::debug;
use reqwest::Client;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a single-turn prompt and returns the first text part of the
    /// first candidate.
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.generate_content(None, vec![Content::user_text(prompt)])
            .await
    }

    /// Like [`Self::generate_text`] with a system instruction sent alongside.
    pub async fn generate_with_system(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        self.generate_content(Some(system_prompt), vec![Content::user_text(prompt)])
            .await
    }

    async fn generate_content(
        &self,
        system_prompt: Option<&str>,
        messages: Vec<Content>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: messages,
            system_instruction: system_prompt.map(Content::user_text),
            generation_config: GenerationConfig {
                temperature: Some(0.4),
                max_output_tokens: None,
            },
        };

        debug!("Calling Gemini model {}", self.model);
        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(SimulationError::AnalysisFailed(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        first_text(body)
    }
}

fn first_text(body: GenerateContentResponse) -> Result<String> {
    let candidate = body
        .candidates
        .ok_or_else(|| SimulationError::AnalysisFailed("No candidates returned".to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| SimulationError::AnalysisFailed("Empty candidates list".to_string()))?;

    let content = candidate.content.ok_or_else(|| {
        SimulationError::AnalysisFailed(format!(
            "Candidate has no content (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    match content.parts.into_iter().next() {
        Some(Part::Text { text }) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(SimulationError::AnalysisFailed(
            "Model returned empty text".to_string(),
        )),
        None => Err(SimulationError::AnalysisFailed(
            "No parts in content".to_string(),
        )),
    }
}
