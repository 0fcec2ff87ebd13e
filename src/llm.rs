use failsafe::futures::CircuitBreaker;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::circuit_breaker::{create_llm_circuit_breaker, LlmCircuitBreaker};
use crate::config::LlmConfig;
use crate::errors::{AppError, ResultExt};
use crate::models::Lead;

const SYSTEM_PROMPT: &str = r#"You are an AI Study Abroad Assistant.

STRICT RULES:
- Use ONLY the data provided.
- Do NOT add new details.
- Do NOT assume anything.
- Only structure given info.

FORMAT STRICTLY:

📋 Student Profile Summary

<rewrite USER_SUMMARY clearly>

🤖 AI Profile Analysis
• Eligibility Score: <score>%
• Recommended Country: <country>
• Lead Category: <status>

📌 Next Step:
Our counsellor will review this profile and contact the student shortly."#;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Builds the full prompt: fixed instructions, computed analysis, then the
/// student's own words.
pub fn build_prompt(lead: &Lead, user_summary: &str) -> String {
    format!(
        "{system}\n\nAI PROFILE ANALYSIS:\nScore: {score}\nRecommended Country: {country} {flag}\nLead Status: {quality} {glyph}\n\nUSER_SUMMARY:\n{summary}\n",
        system = SYSTEM_PROMPT,
        score = lead.lead_score,
        country = lead.recommended_country,
        flag = lead.recommended_country.flag(),
        quality = lead.lead_quality,
        glyph = lead.lead_quality.glyph(),
        summary = user_summary.trim(),
    )
}

/// Summary used when the model is unavailable. Built from stored fields only.
pub fn fallback_summary(lead: &Lead) -> String {
    let mut text = String::from("📋 Student Profile Summary\n\n");
    text.push_str(&format!("Name: {}\n", lead.name));
    if !lead.course_interest.is_empty() {
        text.push_str(&format!("Course Interest: {}\n", lead.course_interest));
    }
    if !lead.country_interest.is_empty() {
        text.push_str(&format!("Country Interest: {}\n", lead.country_interest));
    }
    text.push_str(&format!("Qualification: {}\n", lead.qualification));
    if let Some(ielts) = lead.ielts_score {
        text.push_str(&format!("IELTS: {}\n", ielts));
    }
    if let Some(budget) = lead.budget {
        text.push_str(&format!("Budget: {} lakhs\n", budget));
    }
    text.push_str(&format!("Intake: {}\n", lead.intake));

    text.push_str("\n🤖 AI Profile Analysis\n");
    text.push_str(&format!("• Eligibility Score: {}%\n", lead.lead_score));
    text.push_str(&format!(
        "• Recommended Country: {} {}\n",
        lead.recommended_country,
        lead.recommended_country.flag()
    ));
    text.push_str(&format!(
        "• Lead Category: {} {}\n",
        lead.lead_quality,
        lead.lead_quality.glyph()
    ));
    text.push_str(
        "\n📌 Next Step:\nOur counsellor will review this profile and contact the student shortly.",
    );
    text
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    breaker: LlmCircuitBreaker,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create LLM client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            breaker: create_llm_circuit_breaker(),
        })
    }

    async fn request(&self, prompt: &str) -> Result<String, AppError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(AppError::from)
            .context("LLM request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "LLM returned {}: {}",
                status, error_text
            )));
        }

        let data: GenerateResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse LLM response: {}", e))
        })?;

        let text = data.response.trim().to_string();
        if text.is_empty() {
            return Err(AppError::ExternalApiError(
                "LLM returned an empty response".to_string(),
            ));
        }
        Ok(text)
    }

    /// Sends one prompt through the circuit breaker.
    pub async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        match self.breaker.call(self.request(prompt)).await {
            Ok(text) => Ok(text),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "LLM circuit open, skipping call".to_string(),
            )),
        }
    }

    /// Profile summary for a freshly stored lead. Never fails.
    pub async fn summarize(&self, lead: &Lead, user_summary: &str) -> String {
        let prompt = build_prompt(lead, user_summary);
        match self.generate(&prompt).await {
            Ok(text) => {
                tracing::info!("✓ LLM summary generated for lead {}", lead.id);
                text
            }
            Err(e) => {
                tracing::warn!("⚠️  LLM summary failed for lead {}: {}", lead.id, e);
                fallback_summary(lead)
            }
        }
    }
}
