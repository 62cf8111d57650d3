// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-plc-monitor project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sampling session state and anomaly classification

use std::time::Duration;

/// Default anomaly threshold in °C/s (2 °C over 5 s)
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.4;

/// Classification of one successful sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub temperature: f32,
    /// Rate of change since the previous sample in °C/s, 0 for the first one
    pub rate_of_change: f64,
    pub anomaly: bool,
}

/// Working memory of one run of the sampling loop
///
/// Holds the last successfully observed temperature. A failed cycle does not
/// touch it, so the next rate is computed against the last good value.
#[derive(Debug, Clone)]
pub struct SamplingSession {
    last: Option<f32>,
    interval: Duration,
    threshold: f64,
}

impl SamplingSession {
    /// `threshold` is an absolute rate in °C/s, applied whatever the interval
    pub fn new(interval: Duration, threshold: f64) -> Self {
        Self {
            last: None,
            interval,
            threshold,
        }
    }

    pub fn last(&self) -> Option<f32> {
        self.last
    }

    /// Record a new sample and classify it
    pub fn observe(&mut self, temperature: f32) -> Observation {
        let observation = match self.last {
            Some(previous) => {
                let rate = (f64::from(temperature) - f64::from(previous))
                    / self.interval.as_secs_f64();
                Observation {
                    temperature,
                    rate_of_change: rate,
                    anomaly: rate.abs() > self.threshold,
                }
            }
            None => Observation {
                temperature,
                rate_of_change: 0.0,
                anomaly: false,
            },
        };
        self.last = Some(temperature);
        observation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SamplingSession {
        SamplingSession::new(Duration::from_secs(5), DEFAULT_ANOMALY_THRESHOLD)
    }

    #[test]
    fn test_fast_rise_is_anomaly() {
        let mut s = session();
        s.observe(25.0);
        let obs = s.observe(27.1);
        assert!((obs.rate_of_change - 0.42).abs() < 1e-5);
        assert!(obs.anomaly);
    }

    #[test]
    fn test_slow_rise_is_normal() {
        let mut s = session();
        s.observe(25.0);
        let obs = s.observe(26.9);
        assert!((obs.rate_of_change - 0.38).abs() < 1e-5);
        assert!(!obs.anomaly);
    }

    #[test]
    fn test_fast_drop_is_anomaly() {
        let mut s = session();
        s.observe(30.0);
        let obs = s.observe(20.0);
        assert!((obs.rate_of_change + 2.0).abs() < 1e-9);
        assert!(obs.anomaly);
    }

    #[test]
    fn test_first_sample_is_never_anomaly() {
        let mut s = session();
        let obs = s.observe(1000.0);
        assert!(!obs.anomaly);
        assert_eq!(obs.rate_of_change, 0.0);
        assert_eq!(s.last(), Some(1000.0));
    }

    #[test]
    fn test_threshold_is_a_rate() {
        // 3 °C over 10 s is 0.3 °C/s
        let mut s = SamplingSession::new(Duration::from_secs(10), DEFAULT_ANOMALY_THRESHOLD);
        s.observe(20.0);
        assert!(!s.observe(23.0).anomaly);
    }
}
