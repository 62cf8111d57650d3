// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Prompt construction and local heuristic summary

use std::fmt;

use crate::monitoring::{Reading, Statistics};
use crate::utility::timestamp;

/// Readings averaged at each end of the window to estimate the trend
pub const TREND_WINDOW: usize = 10;

/// Difference of the two averages above which the trend is not stable, in °C
pub const TREND_BAND: f64 = 1.0;

/// Readings quoted verbatim in the prompt
pub const PROMPT_READINGS: usize = 20;

/// Direction of the temperature over a set of readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trend {
    Rising(f64),
    Falling(f64),
    Stable,
    InsufficientData,
}

impl Trend {
    /// Compare the mean of the last readings with the mean of the first ones
    pub fn of(readings: &[Reading]) -> Self {
        if readings.len() < TREND_WINDOW {
            return Trend::InsufficientData;
        }
        let mean = |slice: &[Reading]| {
            slice.iter().map(|r| f64::from(r.temperature)).sum::<f64>() / slice.len() as f64
        };
        let older = mean(&readings[..TREND_WINDOW]);
        let recent = mean(&readings[readings.len() - TREND_WINDOW..]);
        let diff = recent - older;
        if diff > TREND_BAND {
            Trend::Rising(diff)
        } else if diff < -TREND_BAND {
            Trend::Falling(diff)
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Rising(diff) => write!(f, "Rising (+{:.1}°C)", diff),
            Trend::Falling(diff) => write!(f, "Falling ({:.1}°C)", diff),
            Trend::Stable => f.write_str("Stable"),
            Trend::InsufficientData => f.write_str("Insufficient data"),
        }
    }
}

fn range(readings: &[Reading]) -> (f32, f32, f64) {
    let min = readings
        .iter()
        .map(|r| r.temperature)
        .fold(f32::INFINITY, f32::min);
    let max = readings
        .iter()
        .map(|r| r.temperature)
        .fold(f32::NEG_INFINITY, f32::max);
    let mean =
        readings.iter().map(|r| f64::from(r.temperature)).sum::<f64>() / readings.len() as f64;
    (min, max, mean)
}

/// Prompt text for a non-empty set of readings
struct Prompt<'a> {
    readings: &'a [Reading],
    statistics: Option<&'a Statistics>,
}

impl fmt::Display for Prompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readings = self.readings;
        f.write_str(
            "You are an expert in industrial process analysis. \
             Analyze the following temperature data from an industrial system:\n\n",
        )?;

        if let (Some(first), Some(last)) = (readings.first(), readings.last()) {
            let (min, max, mean) = range(readings);
            writeln!(f, "**Collected data:**")?;
            writeln!(f, "- Total readings: {}", readings.len())?;
            writeln!(
                f,
                "- Period: {} to {}",
                timestamp::format(&first.timestamp),
                timestamp::format(&last.timestamp)
            )?;
            writeln!(f, "- Minimum temperature: {:.2}°C", min)?;
            writeln!(f, "- Maximum temperature: {:.2}°C", max)?;
            writeln!(f, "- Mean temperature: {:.2}°C", mean)?;
        }

        if let Some(stats) = self.statistics {
            writeln!(f, "\n**Statistics:**")?;
            writeln!(f, "- Standard deviation: {:.2}°C", stats.stdev)?;
            writeln!(f, "- Anomalies detected: {}", stats.anomaly_count)?;
        }

        writeln!(f, "\n**Last {} readings:**", PROMPT_READINGS)?;
        let start = readings.len().saturating_sub(PROMPT_READINGS);
        for reading in &readings[start..] {
            let marker = if reading.anomaly { "[!]" } else { "   " };
            writeln!(
                f,
                "{} {}: {:.2}°C",
                marker,
                timestamp::format(&reading.timestamp),
                reading.temperature
            )?;
        }

        f.write_str(
            "\n**Task:**\n\
             Analyze this data and provide:\n\n\
             1. **Trend**: Is the temperature stable, rising or falling?\n\
             2. **Patterns**: Are there cycles or periodic variations?\n\
             3. **Anomalies**: Do the sudden changes point to a problem?\n\
             4. **Recommendations**: Suggestions for optimization, or alerts\n\n\
             Be concise and objective. Focus on practical insights for the operator.\n",
        )
    }
}

/// Build the prompt sent to the language model. `readings` must not be empty.
pub fn build_prompt(readings: &[Reading], statistics: Option<&Statistics>) -> String {
    Prompt {
        readings,
        statistics,
    }
    .to_string()
}

/// Outcome of the local heuristic
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicSummary {
    pub text: String,
    pub trend: Trend,
    pub anomalies: usize,
}

/// Figures rendered by the heuristic summary
struct SummaryText {
    min: f32,
    max: f32,
    mean: f64,
    trend: Trend,
    anomalies: usize,
    anomaly_note: &'static str,
    recommendation: &'static str,
    stdev: Option<f64>,
}

impl fmt::Display for SummaryText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "**Automatic analysis** (no AI)\n")?;
        writeln!(f, "**Temperature range**")?;
        writeln!(
            f,
            "   Min: {:.1}°C | Max: {:.1}°C | Mean: {:.1}°C\n",
            self.min, self.max, self.mean
        )?;
        writeln!(f, "**Recent trend**")?;
        writeln!(f, "   {}\n", self.trend)?;
        writeln!(f, "**Anomalies**")?;
        writeln!(f, "   {} sudden changes detected", self.anomalies)?;
        writeln!(f, "   {}\n", self.anomaly_note)?;
        writeln!(f, "**Recommendation**")?;
        write!(f, "   {}", self.recommendation)?;
        match self.stdev {
            Some(stdev) if stdev > 5.0 => write!(f, "\n   High variability (σ={:.1}°C)", stdev),
            _ => Ok(()),
        }
    }
}

/// Summarize readings without a language model. `None` when there are none.
pub fn summarize(readings: &[Reading], statistics: Option<&Statistics>) -> Option<HeuristicSummary> {
    if readings.is_empty() {
        return None;
    }
    let (min, max, mean) = range(readings);
    let trend = Trend::of(readings);
    let anomalies = readings.iter().filter(|r| r.anomaly).count();

    let anomaly_note = if anomalies as f64 > readings.len() as f64 * 0.1 {
        "WARNING: many sudden changes!"
    } else {
        "Normal behavior"
    };
    let recommendation = if anomalies > 5 {
        "Investigate the cause of the sudden changes"
    } else {
        "System operating within expected parameters"
    };

    let text = SummaryText {
        min,
        max,
        mean,
        trend,
        anomalies,
        anomaly_note,
        recommendation,
        stdev: statistics.map(|stats| stats.stdev),
    }
    .to_string();

    Some(HeuristicSummary {
        text,
        trend,
        anomalies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(temps: &[f32], anomalies: &[usize]) -> Vec<Reading> {
        let start = timestamp::parse("2025-06-01 08:00:00").unwrap();
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| Reading {
                timestamp: start + Duration::seconds(5 * i as i64),
                temperature: t,
                anomaly: anomalies.contains(&i),
                rate_of_change: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_trend_bands() {
        let flat = series(&[20.0; 20], &[]);
        assert_eq!(Trend::of(&flat), Trend::Stable);

        let mut rising = vec![20.0; 10];
        rising.extend([22.0; 10]);
        assert_eq!(Trend::of(&series(&rising, &[])), Trend::Rising(2.0));

        let mut falling = vec![22.0; 10];
        falling.extend([20.5; 10]);
        assert_eq!(Trend::of(&series(&falling, &[])), Trend::Falling(-1.5));

        assert_eq!(Trend::of(&series(&[20.0; 9], &[])), Trend::InsufficientData);
    }

    #[test]
    fn test_trend_band_is_exclusive() {
        let mut edge = vec![20.0; 10];
        edge.extend([21.0; 10]);
        assert_eq!(Trend::of(&series(&edge, &[])), Trend::Stable);
    }

    #[test]
    fn test_summary_warns_on_many_anomalies() {
        let readings = series(&[20.0; 20], &[1, 3, 5, 7, 9, 11]);
        let summary = summarize(&readings, None).unwrap();
        assert_eq!(summary.anomalies, 6);
        assert!(summary.text.contains("WARNING: many sudden changes!"));
        assert!(summary.text.contains("Investigate the cause"));
    }

    #[test]
    fn test_summary_normal() {
        let readings = series(&[20.0; 20], &[4]);
        let summary = summarize(&readings, None).unwrap();
        assert!(summary.text.contains("Normal behavior"));
        assert!(summary.text.contains("within expected parameters"));
        assert!(!summary.text.contains("High variability"));
    }

    #[test]
    fn test_summary_high_variability() {
        let readings = series(&[10.0, 30.0], &[]);
        let stats = Statistics::from_readings(&readings).unwrap();
        let summary = summarize(&readings, Some(&stats)).unwrap();
        assert!(summary.text.contains("High variability"));
        assert_eq!(summary.trend, Trend::InsufficientData);
    }

    #[test]
    fn test_summary_layout() {
        let readings = series(&[20.0; 20], &[]);
        let summary = summarize(&readings, None).unwrap();
        assert_eq!(
            summary.text,
            "**Automatic analysis** (no AI)\n\n\
             **Temperature range**\n   Min: 20.0°C | Max: 20.0°C | Mean: 20.0°C\n\n\
             **Recent trend**\n   Stable\n\n\
             **Anomalies**\n   0 sudden changes detected\n   Normal behavior\n\n\
             **Recommendation**\n   System operating within expected parameters"
        );
    }

    #[test]
    fn test_summary_empty() {
        assert!(summarize(&[], None).is_none());
    }

    #[test]
    fn test_prompt_quotes_last_twenty() {
        let temps: Vec<f32> = (0..30).map(|i| 20.0 + i as f32).collect();
        let readings = series(&temps, &[29]);
        let stats = Statistics::from_readings(&readings).unwrap();
        let prompt = build_prompt(&readings, Some(&stats));

        assert!(prompt.starts_with("You are an expert in industrial process analysis. Analyze"));
        assert!(prompt.contains("system:\n\n**Collected data:**\n- Total readings: 30\n"));
        assert!(prompt.contains("- Anomalies detected: 1"));
        assert!(!prompt.contains(": 29.00°C"));
        assert!(prompt.contains(": 30.00°C"));
        assert!(prompt.contains("[!] 2025-06-01 08:02:25: 49.00°C"));
        assert!(prompt.contains("4. **Recommendations**"));
    }
}
