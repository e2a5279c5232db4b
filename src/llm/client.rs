use crate::error::{InsightError, Result};
use crate::llm::prompts::build_insight_prompt;
use crate::report::{InsightCandidate, InsightContext, InsightProvider};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin Gemini client that turns a frozen numeric context into an insight
/// candidate. The candidate still has to pass the validator before anyone
/// downstream sees it.
#[derive(Clone)]
pub struct GeminiInsightClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl GeminiInsightClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API endpoint, e.g. to point at a local stub in tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn generate_candidate(&self, context: &InsightContext) -> Result<InsightCandidate> {
        let prompt = build_insight_prompt(context)?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "response_mime_type": "application/json" },
        });

        let request = self.client.post(&url).json(&payload).send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| {
                InsightError::Provider(format!(
                    "generateContent timed out after {:?}",
                    self.timeout
                ))
            })?
            .map_err(|e| InsightError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .map_err(|e| InsightError::Provider(e.to_string()))?;
            return Err(InsightError::Provider(format!(
                "generateContent failed (status {status}): {error_text}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightError::Provider(e.to_string()))?;

        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                InsightError::Provider("response contains no candidate text".to_string())
            })?;

        let candidate: InsightCandidate = serde_json::from_str(strip_code_fences(text))
            .map_err(|e| InsightError::Provider(format!("candidate payload is not valid JSON: {e}")))?;
        Ok(candidate)
    }
}

/// Models still occasionally wrap JSON output in markdown fences despite the
/// JSON response mime type.
fn strip_code_fences(text: &str) -> &str {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest;
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    trimmed.trim()
}

/// Adapter that lets the synchronous pipeline drive the async client: owns a
/// small runtime and blocks on one call at a time.
pub struct BlockingGeminiProvider {
    client: GeminiInsightClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingGeminiProvider {
    pub fn new(client: GeminiInsightClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| InsightError::Provider(format!("failed to start runtime: {e}")))?;
        Ok(Self { client, runtime })
    }
}

impl InsightProvider for BlockingGeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn produce_insights(&self, context: &InsightContext) -> Result<InsightCandidate> {
        self.runtime.block_on(self.client.generate_candidate(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}
