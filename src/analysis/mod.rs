// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Analysis of the reading log
//!
//! A language model (Groq or Gemini) is asked to comment on recent readings.
//! Calls are retried a bounded number of times; when they keep failing, or
//! when no provider is configured, a local heuristic summary is used instead.

pub mod analyzer;
pub mod error;
pub mod heuristics;
pub mod provider;
pub mod report;

pub use analyzer::{Analysis, TemperatureAnalyzer};
pub use error::AnalyzerError;
pub use heuristics::{build_prompt, summarize, Trend};
pub use provider::{CompletionService, LlmClient, Provider};
pub use report::generate_report;
