//! Gemini-backed [`Classifier`] speaking the generateContent REST protocol.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::classifier::{Classifier, ClassifyError};
use crate::types::ImageRecord;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_HEADER: &str = "x-goog-api-key";
/// Longest slice of a non-JSON error body carried into an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Connection settings for [`GeminiClassifier::new`].
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// Keep the key out of debug output and logs.
impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Error, Debug)]
#[error("invalid classifier configuration: {0}")]
pub struct InvalidConfig(String);

/// HTTP client for one Gemini model.
#[derive(Debug, Clone)]
pub struct GeminiClassifier {
    http: reqwest::Client,
    model: String,
    base_url: String,
}

impl GeminiClassifier {
    pub fn new(config: &GeminiConfig) -> Result<Self, InvalidConfig> {
        if config.api_key.trim().is_empty() {
            return Err(InvalidConfig("api key is empty".into()));
        }
        let mut key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            InvalidConfig("api key contains characters not valid in a request header".into())
        })?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|error| InvalidConfig(error.to_string()))?;

        Ok(Self {
            http,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn model_url(&self) -> String {
        format!("{}/v1beta/models/{}", self.base_url, self.model)
    }
}

impl Classifier for GeminiClassifier {
    async fn classify(
        &self,
        reference: &ImageRecord,
        candidate: &ImageRecord,
        instruction: &str,
    ) -> Result<String, ClassifyError> {
        tracing::debug!(
            candidate = %candidate.path().display(),
            model = %self.model,
            "sending match query"
        );
        let response = self
            .http
            .post(self.generate_url())
            .json(&request_body(reference, candidate, instruction))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|error| ClassifyError::MalformedResponse(error.to_string()))?;
        answer_text(parsed).ok_or_else(|| {
            ClassifyError::MalformedResponse("response carried no answer text".into())
        })
    }

    async fn preflight(&self) -> Result<(), ClassifyError> {
        let response = self.http.get(self.model_url()).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

/// generateContent body: reference image first, candidate second, then the
/// instruction, all in one user turn.
fn request_body(
    reference: &ImageRecord,
    candidate: &ImageRecord,
    instruction: &str,
) -> serde_json::Value {
    json!({
        "contents": [{
            "parts": [
                {
                    "inline_data": {
                        "mime_type": reference.mime(),
                        "data": reference.base64(),
                    }
                },
                {
                    "inline_data": {
                        "mime_type": candidate.mime(),
                        "data": candidate.base64(),
                    }
                },
                { "text": instruction },
            ]
        }]
    })
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClassifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClassifyError::Service {
        status: status.as_u16(),
        message: service_message(&body),
    })
}

/// Pull the message out of a structured Gemini error body, or fall back to
/// the raw body clipped to a readable length.
fn service_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Concatenated text of the first candidate, or `None` when the response
/// holds no text at all.
fn answer_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let mut answer = String::new();
    for part in content.parts {
        if let Some(text) = part.text {
            answer.push_str(&text);
        }
    }
    if answer.is_empty() {
        None
    } else {
        Some(answer)
    }
}
