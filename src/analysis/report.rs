// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Plain-text temperature report

use std::fmt;

use chrono::NaiveDateTime;

use super::analyzer::Analysis;
use crate::monitoring::Statistics;
use crate::utility::timestamp;

const WIDTH: usize = 62;

fn rule(f: &mut fmt::Formatter<'_>, left: char, right: char) -> fmt::Result {
    writeln!(f, "{}{}{}", left, "═".repeat(WIDTH), right)
}

fn centered(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    writeln!(f, "║{:^width$}║", text, width = WIDTH)
}

struct Report<'a> {
    generated_at: NaiveDateTime,
    statistics: Option<&'a Statistics>,
    period_hours: u32,
    analysis: &'a Analysis,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        rule(f, '╔', '╗')?;
        centered(f, "TEMPERATURE ANALYSIS REPORT")?;
        centered(f, "Industrial Monitoring System")?;
        rule(f, '╚', '╝')?;

        writeln!(f, "\nDate: {}", self.generated_at.format("%d/%m/%Y %H:%M:%S"))?;
        writeln!(f, "Period: last {} hours\n", self.period_hours)?;

        writeln!(f, "STATISTICS")?;
        writeln!(f, "{}", "─".repeat(WIDTH))?;
        match self.statistics {
            Some(stats) => {
                writeln!(f, "  Total readings:     {}", stats.count)?;
                writeln!(f, "  Minimum:            {:.2}°C", stats.min)?;
                writeln!(f, "  Maximum:            {:.2}°C", stats.max)?;
                writeln!(f, "  Mean:               {:.2}°C", stats.mean)?;
                writeln!(f, "  Standard deviation: {:.2}°C", stats.stdev)?;
                writeln!(f, "  Anomalies:          {}", stats.anomaly_count)?;
            }
            None => writeln!(f, "  No readings in this period")?,
        }

        let analysis = self.analysis;
        match analysis.provider.as_deref() {
            Some(provider) if analysis.ai_powered => writeln!(f, "\nAI ANALYSIS ({})", provider)?,
            _ => writeln!(f, "\nAUTOMATIC ANALYSIS")?,
        }
        writeln!(f, "{}", "─".repeat(WIDTH))?;
        writeln!(f, "{}\n", analysis.analysis)?;
        writeln!(f, "{}", "═".repeat(WIDTH + 2))
    }
}

/// Render statistics and an analysis as a boxed text report
pub fn generate_report(statistics: Option<&Statistics>, period_hours: u32, analysis: &Analysis) -> String {
    Report {
        generated_at: timestamp::now(),
        statistics,
        period_hours,
        analysis,
    }
    .to_string()
}
