// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature analyzer configuration
//!
//! API keys may be left out of the file. They are then read from the
//! `GROQ_API_KEY` and `GEMINI_API_KEY` environment variables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Environment variable holding the Groq API key
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Which language model service to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderChoice {
    /// Groq when a Groq key is available, else Gemini when a Gemini key is, else none
    #[default]
    Auto,
    Groq,
    Gemini,
    /// Always use the local heuristic summary
    None,
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderChoice::Auto => "auto",
            ProviderChoice::Groq => "groq",
            ProviderChoice::Gemini => "gemini",
            ProviderChoice::None => "none",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ProviderChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ProviderChoice::Auto),
            "groq" => Ok(ProviderChoice::Groq),
            "gemini" => Ok(ProviderChoice::Gemini),
            "none" => Ok(ProviderChoice::None),
            other => Err(format!(
                "unknown provider '{}', expected auto, groq, gemini or none",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub provider: ProviderChoice,

    #[serde(default)]
    pub groq_api_key: Option<String>,

    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_groq_model")]
    pub groq_model: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Base URL of the OpenAI-compatible Groq API
    #[serde(default = "default_groq_base_url")]
    pub groq_base_url: String,

    /// Base URL of the Generative Language API
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Attempts per analysis before falling back to the heuristic summary
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout of one request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sampling temperature sent to the model
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum length of the generated answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_groq_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_groq_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: ProviderChoice::default(),
            groq_api_key: None,
            gemini_api_key: None,
            groq_model: default_groq_model(),
            gemini_model: default_gemini_model(),
            groq_base_url: default_groq_base_url(),
            gemini_base_url: default_gemini_base_url(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AnalyzerConfig {
    /// Groq key from the file, else from the environment
    pub fn resolved_groq_key(&self) -> Option<String> {
        resolve_key(self.groq_api_key.as_deref(), GROQ_API_KEY_ENV)
    }

    /// Gemini key from the file, else from the environment
    pub fn resolved_gemini_key(&self) -> Option<String> {
        resolve_key(self.gemini_api_key.as_deref(), GEMINI_API_KEY_ENV)
    }
}

fn resolve_key(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .filter(|key| !key.trim().is_empty())
}
