use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::{
    config::Config,
    error::HttpError,
    models::ticketmodel::{Ticket, TicketMessage},
};

#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI provider error: {0}")]
    Provider(String),

    #[error("AI response could not be parsed: {0}")]
    Parse(String),
}

impl From<AiError> for HttpError {
    fn from(error: AiError) -> Self {
        HttpError::new(error.to_string(), StatusCode::BAD_GATEWAY)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketAnalysis {
    pub priority: Option<String>,
    pub category: Option<String>,
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeflectionSuggestion {
    pub matched: bool,
    pub answer: Option<String>,
}

/// Thin wrapper around an opaque text-completion provider. All results are
/// best-effort and JSON-parsed; a provider failure surfaces as an explicit
/// error and never touches ticket state.
#[derive(Debug, Clone)]
pub struct AiService {
    config: Config,
    client: reqwest::Client,
}

impl AiService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn analyze_ticket(
        &self,
        subject: &str,
        description: &str,
    ) -> Result<TicketAnalysis, AiError> {
        let system = "You are a university helpdesk triage assistant. Respond with a JSON \
                      object: {\"priority\": \"low|medium|high|urgent\", \"category\": \
                      \"portal|fees|academic|other\", \"summary\": \"one sentence\"}.";
        let prompt = format!("Subject: {}\n\nDescription: {}", subject, description);

        let content = self.complete(system, &prompt).await?;
        parse_json_response(&content)
    }

    pub async fn suggest_deflection(
        &self,
        subject: &str,
        description: &str,
    ) -> Result<DeflectionSuggestion, AiError> {
        let system = "You match draft support tickets against the university FAQ. Respond with \
                      a JSON object: {\"matched\": true|false, \"answer\": \"FAQ answer or null\"}. \
                      Only set matched when an existing FAQ genuinely answers the question.";
        let prompt = format!("Subject: {}\n\nDescription: {}", subject, description);

        let content = self.complete(system, &prompt).await?;
        parse_json_response(&content)
    }

    pub async fn smart_reply(
        &self,
        ticket: &Ticket,
        messages: &[TicketMessage],
    ) -> Result<String, AiError> {
        let system = "You draft a courteous, concise reply from a university helpdesk agent. \
                      Respond with the reply text only.";

        let mut thread = format!(
            "Ticket subject: {}\nDescription: {}\n\nConversation:\n",
            ticket.subject, ticket.description
        );
        for message in messages {
            thread.push_str(&format!(
                "[{}] {}\n",
                message.sender_role.to_str(),
                message.body
            ));
        }

        self.complete(system, &thread).await
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
        if self.config.ai_api_key.is_empty() {
            return Err(AiError::Provider("AI_API_KEY not configured".to_string()));
        }

        let response = self
            .client
            .post(&self.config.ai_api_url)
            .header("Authorization", format!("Bearer {}", self.config.ai_api_key))
            .json(&json!({
                "model": self.config.ai_model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
                "temperature": 0.2,
            }))
            .send()
            .await
            .map_err(|e| AiError::Provider(format!("network error: {}", e)))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AiError::Provider(format!("invalid response body: {}", e)))?;

        if !status.is_success() {
            return Err(AiError::Provider(format!(
                "provider returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        body.pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .map(str::to_owned)
            .ok_or_else(|| AiError::Parse("no completion content in response".to_string()))
    }
}

/// Providers sometimes wrap JSON in markdown fences; strip them before parsing.
fn parse_json_response<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, AiError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(trimmed).map_err(|e| AiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let analysis: TicketAnalysis = parse_json_response(
            r#"{"priority": "high", "category": "portal", "summary": "Login is failing."}"#,
        )
        .unwrap();
        assert_eq!(analysis.priority.as_deref(), Some("high"));
        assert_eq!(analysis.summary, "Login is failing.");
    }

    #[test]
    fn parses_fenced_json() {
        let suggestion: DeflectionSuggestion = parse_json_response(
            "```json\n{\"matched\": true, \"answer\": \"Reset your password via the portal.\"}\n```",
        )
        .unwrap();
        assert!(suggestion.matched);
    }

    #[test]
    fn surfaces_parse_failures() {
        let result: Result<TicketAnalysis, _> = parse_json_response("sorry, I can't do that");
        assert!(matches!(result, Err(AiError::Parse(_))));
    }
}
