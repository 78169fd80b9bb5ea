use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::types::{LlmClient, ModelPrompt};
use super::StructuringError;

/// Google Generative Language API client (`models/{model}:generateContent`).
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StructuringError> {
        if api_key.trim().is_empty() {
            return Err(StructuringError::MissingApiKey);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StructuringError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

fn build_request(prompt: &ModelPrompt<'_>) -> GeminiRequest {
    let parts = match prompt {
        ModelPrompt::Text(text) => vec![GeminiPart::Text {
            text: text.to_string(),
        }],
        ModelPrompt::Document {
            mime_type,
            data,
            instruction,
        } => vec![
            GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: mime_type.to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(data),
                },
            },
            GeminiPart::Text {
                text: instruction.to_string(),
            },
        ],
    };
    GeminiRequest {
        contents: vec![GeminiContent { parts }],
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(response: GeminiResponse) -> Result<String, StructuringError> {
    if let Some(error) = response.error {
        return Err(StructuringError::ModelError {
            status: 200,
            body: error.message,
        });
    }

    let content = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .ok_or_else(|| StructuringError::ResponseParsing("No candidates in response".into()))?;

    Ok(content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}

impl LlmClient for GeminiClient {
    fn generate(&self, model: &str, prompt: &ModelPrompt<'_>) -> Result<String, StructuringError> {
        let body = build_request(prompt);

        let response = self
            .client
            .post(self.endpoint(model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    StructuringError::ModelConnection(self.base_url.clone())
                } else if e.is_timeout() {
                    StructuringError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    // The URL carries the API key
                    StructuringError::HttpClient(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().unwrap_or_default();
            let body = serde_json::from_str::<GeminiResponse>(&raw)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(raw);
            return Err(StructuringError::ModelError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response
            .json()
            .map_err(|e| StructuringError::ResponseParsing(e.without_url().to_string()))?;

        response_text(parsed)
    }
}

/// Mock LLM client for testing: returns a configurable response and keeps
/// every text prompt it was sent.
pub struct MockLlmClient {
    response: String,
    failure: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            failure: None,
            prompts: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails as if the endpoint were unreachable.
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new("")
        }
    }

    /// Text prompts received, oldest first (document instructions included).
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Models named by each call, oldest first.
    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, model: &str, prompt: &ModelPrompt<'_>) -> Result<String, StructuringError> {
        let text = match prompt {
            ModelPrompt::Text(text) => text.to_string(),
            ModelPrompt::Document { instruction, .. } => instruction.to_string(),
        };
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(text);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(model.to_string());
        }

        match &self.failure {
            Some(reason) => Err(StructuringError::ModelConnection(reason.clone())),
            None => Ok(self.response.clone()),
        }
    }
}
