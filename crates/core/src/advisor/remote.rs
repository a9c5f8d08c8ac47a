//! Remote Advisor Gateway
//!
//! Sends a tutoring prompt to a generative-language service, trying an
//! ordered list of candidate models until one produces text. Candidate
//! failures are recovered locally and only surface, aggregated, when every
//! candidate has failed.

use super::gemini::{Content, GenerateContentRequest, GenerationConfig, extract_text};
use crate::error::{CandidateFailure, GatewayError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Models tried, in order, after the operator's preferred model.
pub const FALLBACK_MODELS: [&str; 3] = [
    "gemini-2.0-flash",
    "gemini-2.0-flash-001",
    "gemini-2.0-flash-lite",
];

/// Value shipped in the sample `.env`; treated the same as no key.
pub const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

/// Generation budget agreed with the service for every request.
pub const MAX_OUTPUT_TOKENS: u32 = 350;

pub const SYSTEM_INSTRUCTION: &str = "You are an educational AI Doctor tutor for a diabetes medication simulator. \
Explain reasoning clearly and concisely for students. Use only the provided case context when possible. \
If unsure, say what is uncertain. Do not provide definitive diagnosis or treatment directives for real patients. \
Always include a short safety reminder that this is educational and requires clinician verification.";

/// Transport to a text-generation service. One call is one request to one model.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<Value, TransportError>;
}

/// The preferred model (if any) followed by [`FALLBACK_MODELS`], without duplicates.
pub fn candidate_models(preferred: Option<&str>) -> Vec<String> {
    let preferred = preferred.map(str::trim).filter(|m| !m.is_empty());
    let mut models: Vec<String> = preferred.into_iter().map(str::to_string).collect();
    for model in FALLBACK_MODELS {
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }
    models
}

/// Runs `attempt` for each candidate in order and returns the first success.
///
/// Later candidates are not tried once one succeeds. If all fail, every
/// failure is returned in the order it happened.
pub async fn first_success<'a, T, F, Fut>(
    candidates: &'a [String],
    mut attempt: F,
) -> Result<T, Vec<CandidateFailure>>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut failures = Vec::new();
    for model in candidates {
        debug!(%model, "Trying candidate model");
        match attempt(model).await {
            Ok(value) => return Ok(value),
            Err(reason) => {
                warn!(%model, %reason, "Candidate model failed");
                failures.push(CandidateFailure {
                    model: model.clone(),
                    reason,
                });
            }
        }
    }
    Err(failures)
}

/// Rejects blank questions and returns the trimmed text.
pub fn validate_question(question: &str) -> Result<&str, GatewayError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(GatewayError::InvalidRequest("Question is required.".to_string()));
    }
    Ok(question)
}

/// Builds the request body for `question` with a snapshot of `context`.
pub fn build_request(question: &str, context: &Value) -> GenerateContentRequest {
    let context_text =
        serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
    let user_prompt = format!(
        "Student question:\n{question}\n\nSimulator context:\n{context_text}\n\n\
         Answer in plain language with: 1) direct answer, 2) why, 3) what to monitor."
    );
    GenerateContentRequest {
        system_instruction: Content::text(None, SYSTEM_INSTRUCTION),
        contents: vec![Content::text(Some("user"), user_prompt)],
        generation_config: GenerationConfig {
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Asks a remote model about the case, falling back across candidate models.
pub struct RemoteAdvisor {
    client: Arc<dyn GenerativeClient>,
    api_key: Option<String>,
    models: Vec<String>,
}

impl RemoteAdvisor {
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        api_key: Option<String>,
        preferred_model: Option<&str>,
    ) -> Self {
        Self {
            client,
            api_key,
            models: candidate_models(preferred_model),
        }
    }

    /// Candidate models in the order they are tried.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_configured(&self) -> bool {
        self.credential().is_ok()
    }

    fn credential(&self) -> Result<&str, GatewayError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != PLACEHOLDER_API_KEY => Ok(key),
            _ => Err(GatewayError::Configuration),
        }
    }

    /// Answers `question`, embedding `context` in the prompt.
    ///
    /// A missing credential fails before any request is made.
    pub async fn ask(&self, question: &str, context: &Value) -> Result<String, GatewayError> {
        let api_key = self.credential()?;
        let question = validate_question(question)?;
        let request = build_request(question, context);

        match first_success(&self.models, |model| self.attempt(api_key, model, &request)).await {
            Ok((model, answer)) => {
                info!(%model, chars = answer.len(), "Remote advisor answered");
                Ok(answer)
            }
            Err(failures) => {
                let err = GatewayError::ModelUnavailable { failures };
                warn!(detail = ?err.detail(), "All candidate models failed");
                Err(err)
            }
        }
    }

    async fn attempt<'a>(
        &self,
        api_key: &str,
        model: &'a str,
        request: &GenerateContentRequest,
    ) -> Result<(&'a str, String), TransportError> {
        let body = self.client.generate_content(api_key, model, request).await?;
        let answer = extract_text(&body).ok_or(TransportError::EmptyAnswer)?;
        Ok((model, answer))
    }
}
