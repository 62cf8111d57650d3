// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Analyzer errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// No provider selected or no API key available
    #[error("no language model provider is configured")]
    NotConfigured,

    /// Transport failure or non-success HTTP status
    #[error("request failed: {0}")]
    Request(String),

    /// The provider answered without any text
    #[error("empty response from {0}")]
    EmptyResponse(&'static str),

    /// Every attempt failed
    #[error("giving up after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<AnalyzerError>,
    },
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(err: reqwest::Error) -> Self {
        AnalyzerError::Request(err.to_string())
    }
}
