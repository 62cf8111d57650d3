// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Temperature analysis with a language model and a local fallback
//!
//! [`TemperatureAnalyzer::analyze`] never fails: when no provider is
//! configured, when there is nothing to analyze, or when every attempt against
//! the provider fails, it answers with the heuristic summary from
//! [`heuristics`](super::heuristics) instead.

use std::time::Duration;

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::Serialize;

use super::error::AnalyzerError;
use super::heuristics;
use super::provider::{CompletionService, LlmClient};
use crate::config::AnalyzerConfig;
use crate::monitoring::{Reading, Statistics};
use crate::utility::timestamp;

/// Result of an analysis request
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Analysis {
    /// Whether a language model produced the text
    pub ai_powered: bool,
    /// Provider that produced the text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub analysis: String,
    #[serde(with = "timestamp::local_seconds")]
    #[schemars(with = "String")]
    pub timestamp: NaiveDateTime,
    /// Number of readings analyzed
    pub data_points: usize,
    /// Trend of the heuristic summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
    /// Anomaly count of the heuristic summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<usize>,
}

impl Analysis {
    /// Heuristic analysis of `readings`
    pub fn fallback(readings: &[Reading], statistics: Option<&Statistics>) -> Self {
        let (analysis, trend, anomalies) = match heuristics::summarize(readings, statistics) {
            Some(summary) => (
                summary.text,
                Some(summary.trend.to_string()),
                Some(summary.anomalies),
            ),
            None => ("No data available for analysis".to_string(), None, None),
        };
        Self {
            ai_powered: false,
            provider: None,
            analysis,
            timestamp: timestamp::now(),
            data_points: readings.len(),
            trend,
            anomalies,
        }
    }
}

/// Analyzer backed by an optional completion service
pub struct TemperatureAnalyzer {
    service: Option<Box<dyn CompletionService>>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl TemperatureAnalyzer {
    /// Build the analyzer described by `config`
    ///
    /// A provider whose HTTP client cannot be built is logged and ignored.
    pub fn new(config: &AnalyzerConfig) -> Self {
        let service = match LlmClient::from_config(config) {
            Ok(client) => client.map(|client| Box::new(client) as Box<dyn CompletionService>),
            Err(err) => {
                warn!("Language model unavailable: {}", err);
                None
            }
        };
        Self {
            service,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Analyzer around an explicit service
    pub fn with_service(
        service: Option<Box<dyn CompletionService>>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            service,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.service.is_some()
    }

    /// Name of the configured provider
    pub fn provider_name(&self) -> Option<&'static str> {
        self.service.as_ref().map(|service| service.provider().as_str())
    }

    /// Send `prompt`, retrying with a fixed delay until the attempts run out
    pub async fn request_analysis(&self, prompt: &str) -> Result<String, AnalyzerError> {
        let service = self.service.as_ref().ok_or(AnalyzerError::NotConfigured)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match service.complete(prompt).await {
                Ok(text) => {
                    debug!("{} answered on attempt {}", service.provider(), attempt);
                    return Ok(text);
                }
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "Attempt {}/{} to reach {} failed: {}",
                        attempt,
                        self.max_attempts,
                        service.provider(),
                        err
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => {
                    return Err(AnalyzerError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    /// Analyze `readings`, falling back to the heuristic summary on any failure
    pub async fn analyze(&self, readings: &[Reading], statistics: Option<&Statistics>) -> Analysis {
        let Some(provider) = self.provider_name() else {
            return Analysis::fallback(readings, statistics);
        };
        if readings.is_empty() {
            return Analysis::fallback(readings, statistics);
        }

        let prompt = heuristics::build_prompt(readings, statistics);
        match self.request_analysis(&prompt).await {
            Ok(text) => {
                info!("Analysis of {} readings from {}", readings.len(), provider);
                Analysis {
                    ai_powered: true,
                    provider: Some(provider.to_string()),
                    analysis: text,
                    timestamp: timestamp::now(),
                    data_points: readings.len(),
                    trend: None,
                    anomalies: None,
                }
            }
            Err(err) => {
                warn!("Falling back to the local heuristic: {}", err);
                Analysis::fallback(readings, statistics)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::provider::{MockCompletionService, Provider};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn readings(count: usize) -> Vec<Reading> {
        let start = timestamp::parse("2025-06-01 08:00:00").unwrap();
        (0..count)
            .map(|i| Reading {
                timestamp: start + chrono::Duration::seconds(5 * i as i64),
                temperature: 25.0,
                anomaly: false,
                rate_of_change: 0.0,
            })
            .collect()
    }

    fn analyzer(service: MockCompletionService, attempts: u32) -> TemperatureAnalyzer {
        TemperatureAnalyzer::with_service(Some(Box::new(service)), attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut service = MockCompletionService::new();
        service.expect_provider().return_const(Provider::Groq);
        service.expect_complete().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AnalyzerError::Request("HTTP 503".into()))
            } else {
                Ok("All good".to_string())
            }
        });

        let analysis = analyzer(service, 3).analyze(&readings(12), None).await;
        assert!(analysis.ai_powered);
        assert_eq!(analysis.provider.as_deref(), Some("groq"));
        assert_eq!(analysis.analysis, "All good");
        assert_eq!(analysis.data_points, 12);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let mut service = MockCompletionService::new();
        service.expect_provider().return_const(Provider::Gemini);
        service
            .expect_complete()
            .times(3)
            .returning(|_| Err(AnalyzerError::Request("HTTP 500".into())));

        let err = analyzer(service, 3).request_analysis("prompt").await.unwrap_err();
        match err {
            AnalyzerError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failure_falls_back() {
        let mut service = MockCompletionService::new();
        service.expect_provider().return_const(Provider::Groq);
        service
            .expect_complete()
            .times(1)
            .returning(|_| Err(AnalyzerError::EmptyResponse("groq")));

        let analysis = analyzer(service, 1).analyze(&readings(12), None).await;
        assert!(!analysis.ai_powered);
        assert_eq!(analysis.provider, None);
        assert_eq!(analysis.trend.as_deref(), Some("Stable"));
        assert_eq!(analysis.anomalies, Some(0));
    }

    #[tokio::test]
    async fn test_unconfigured_and_empty() {
        let analyzer = TemperatureAnalyzer::with_service(None, 3, Duration::ZERO);
        assert!(!analyzer.is_configured());
        assert!(matches!(
            analyzer.request_analysis("prompt").await,
            Err(AnalyzerError::NotConfigured)
        ));

        let analysis = analyzer.analyze(&[], None).await;
        assert!(!analysis.ai_powered);
        assert_eq!(analysis.data_points, 0);
        assert_eq!(analysis.analysis, "No data available for analysis");
    }

    #[tokio::test]
    async fn test_empty_readings_skip_the_service() {
        let mut service = MockCompletionService::new();
        service.expect_provider().return_const(Provider::Groq);
        service.expect_complete().never();
        let analysis = analyzer(service, 3).analyze(&[], None).await;
        assert!(!analysis.ai_powered);
    }

    #[test]
    fn test_fallback_serialization() {
        let analysis = Analysis::fallback(&readings(3), None);
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["ai_powered"], false);
        assert_eq!(json["trend"], "Insufficient data");
        assert!(json.get("provider").is_none());
    }
}
