// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Language model providers
//!
//! Two HTTP APIs are supported:
//!
//! - Groq, OpenAI-compatible: `POST {base}/chat/completions` with a bearer token
//! - Google Gemini: `POST {base}/models/{model}:generateContent?key={key}`

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::error::AnalyzerError;
use crate::config::{AnalyzerConfig, ProviderChoice};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Groq => "groq",
            Provider::Gemini => "gemini",
        }
    }

    /// Pick the provider and key to use, if any
    ///
    /// `auto` prefers Groq, then Gemini, depending on which keys are set.
    pub fn select(config: &AnalyzerConfig) -> Option<(Provider, String)> {
        let groq = config.resolved_groq_key();
        let gemini = config.resolved_gemini_key();
        match config.provider {
            ProviderChoice::None => None,
            ProviderChoice::Auto => groq
                .map(|key| (Provider::Groq, key))
                .or_else(|| gemini.map(|key| (Provider::Gemini, key))),
            ProviderChoice::Groq => {
                if groq.is_none() {
                    warn!("Groq selected but no API key is available");
                }
                groq.map(|key| (Provider::Groq, key))
            }
            ProviderChoice::Gemini => {
                if gemini.is_none() {
                    warn!("Gemini selected but no API key is available");
                }
                gemini.map(|key| (Provider::Gemini, key))
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that turns a prompt into generated text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn provider(&self) -> Provider;

    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiReply>,
}

#[derive(Deserialize)]
struct GeminiReply {
    #[serde(default)]
    parts: Vec<GeminiReplyPart>,
}

#[derive(Deserialize)]
struct GeminiReplyPart {
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client of one provider
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: Provider,
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    /// Build the client selected by `config`, or `None` when no provider is usable
    pub fn from_config(config: &AnalyzerConfig) -> Result<Option<Self>, AnalyzerError> {
        let Some((provider, api_key)) = Provider::select(config) else {
            info!("No language model configured, analyses use the local heuristic");
            return Ok(None);
        };
        let (model, base_url) = match provider {
            Provider::Groq => (&config.groq_model, &config.groq_base_url),
            Provider::Gemini => (&config.gemini_model, &config.gemini_base_url),
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        info!("Language model configured: {} ({})", provider, model);
        Ok(Some(Self {
            provider,
            http,
            api_key,
            model: model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }))
    }

    async fn complete_groq(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = checked(response).await?.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AnalyzerError::EmptyResponse("groq"))
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let request = GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: prompt }],
            }],
        };
        let response = self
            .http
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;
        let body: GeminiResponse = checked(response).await?.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyResponse("gemini"));
        }
        Ok(text)
    }
}

/// Turn a non-success status into an error carrying the response body
async fn checked(response: reqwest::Response) -> Result<reqwest::Response, AnalyzerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(AnalyzerError::Request(format!("HTTP {} - {}", status, error_text)))
}

#[async_trait]
impl CompletionService for LlmClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError> {
        debug!("Sending {} byte prompt to {}", prompt.len(), self.provider);
        match self.provider {
            Provider::Groq => self.complete_groq(prompt).await,
            Provider::Gemini => self.complete_gemini(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: ProviderChoice, groq: Option<&str>, gemini: Option<&str>) -> AnalyzerConfig {
        AnalyzerConfig {
            provider,
            // Blank keys count as absent, which keeps the environment out of the way
            groq_api_key: Some(groq.unwrap_or(" ").to_string()),
            gemini_api_key: Some(gemini.unwrap_or(" ").to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_prefers_groq() {
        let selected = Provider::select(&config(ProviderChoice::Auto, Some("g"), Some("m")));
        assert_eq!(selected, Some((Provider::Groq, "g".to_string())));
        let selected = Provider::select(&config(ProviderChoice::Auto, None, Some("m")));
        assert_eq!(selected, Some((Provider::Gemini, "m".to_string())));
        assert_eq!(Provider::select(&config(ProviderChoice::Auto, None, None)), None);
    }

    #[test]
    fn test_explicit_choice() {
        let selected = Provider::select(&config(ProviderChoice::Gemini, Some("g"), Some("m")));
        assert_eq!(selected, Some((Provider::Gemini, "m".to_string())));
        assert_eq!(Provider::select(&config(ProviderChoice::Groq, None, Some("m"))), None);
        assert_eq!(Provider::select(&config(ProviderChoice::None, Some("g"), None)), None);
    }
}
