//! Deterministic transport fault injection.
//!
//! Simulates the failure modes seen from hosted models in a reproducible way:
//! - Refused or dropped connections
//! - Gateway and rate-limit statuses
//! - 200 replies with empty content
//! - 200 replies that are not JSON

use crate::random::SimRng;

/// Statuses drawn for injected HTTP failures.
const FAULT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Configuration for fault injection.
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Probability of a connection failure (0.0 to 1.0)
    pub connect_probability: f64,
    /// Probability of an error status reply
    pub status_probability: f64,
    /// Probability of a 200 reply with empty content
    pub empty_probability: f64,
    /// Probability of a 200 reply with a non-JSON body
    pub malformed_probability: f64,
    /// Whether fault injection is enabled
    pub enabled: bool,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            connect_probability: 0.05,
            status_probability: 0.05,
            empty_probability: 0.02,
            malformed_probability: 0.01,
            enabled: true,
        }
    }
}

impl FaultConfig {
    /// No faults - useful for baseline testing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            connect_probability: 0.0,
            status_probability: 0.0,
            empty_probability: 0.0,
            malformed_probability: 0.0,
            enabled: false,
        }
    }

    /// Aggressive faults for stress testing.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            connect_probability: 0.3,
            status_probability: 0.3,
            empty_probability: 0.15,
            malformed_probability: 0.1,
            enabled: true,
        }
    }

    /// Every request fails at the connection level.
    #[must_use]
    pub fn total_outage() -> Self {
        Self {
            connect_probability: 1.0,
            ..Self::none()
        }
        .enabled()
    }

    fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }
}

/// A fault chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    Connect,
    Status(u16),
    EmptyContent,
    Malformed,
}

/// Deterministic fault injector.
///
/// Uses a seeded RNG to pick faults in a reproducible way.
/// The same seed produces the same fault sequence.
pub struct FaultInjector {
    rng: SimRng,
    config: FaultConfig,
    stats: FaultStats,
}

impl FaultInjector {
    pub fn new(rng: SimRng, config: FaultConfig) -> Self {
        for p in [
            config.connect_probability,
            config.status_probability,
            config.empty_probability,
            config.malformed_probability,
        ] {
            debug_assert!((0.0..=1.0).contains(&p), "Probability must be in [0.0, 1.0]");
        }

        Self {
            rng,
            config,
            stats: FaultStats::default(),
        }
    }

    /// Create with default config.
    pub fn with_default_config(rng: SimRng) -> Self {
        Self::new(rng, FaultConfig::default())
    }

    /// Decide the fault for the next request, if any.
    ///
    /// Fault kinds are checked in a fixed order so a given seed always
    /// yields the same sequence.
    pub fn next_fault(&mut self) -> Option<TransportFault> {
        self.stats.requests_count += 1;
        if !self.config.enabled {
            return None;
        }

        let fault = if self.rng.chance(self.config.connect_probability) {
            Some(TransportFault::Connect)
        } else if self.rng.chance(self.config.status_probability) {
            let status = self.rng.pick(&FAULT_STATUSES).copied().unwrap_or(503);
            Some(TransportFault::Status(status))
        } else if self.rng.chance(self.config.empty_probability) {
            Some(TransportFault::EmptyContent)
        } else if self.rng.chance(self.config.malformed_probability) {
            Some(TransportFault::Malformed)
        } else {
            None
        };

        if fault.is_some() {
            self.stats.faults_count += 1;
        }
        fault
    }

    #[must_use]
    pub fn stats(&self) -> FaultStats {
        self.stats
    }

    #[must_use]
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Enable or disable fault injection.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }
}

/// Statistics about injected faults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Requests seen
    pub requests_count: u64,
    /// Requests that received a fault
    pub faults_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_faults_when_disabled() {
        let mut injector = FaultInjector::new(SimRng::new(12345), FaultConfig::none());
        for _ in 0..1000 {
            assert!(injector.next_fault().is_none());
        }
        assert_eq!(injector.stats().requests_count, 1000);
        assert_eq!(injector.stats().faults_count, 0);
    }

    #[test]
    fn test_deterministic_faults() {
        let mut inj1 = FaultInjector::new(SimRng::new(42), FaultConfig::aggressive());
        let mut inj2 = FaultInjector::new(SimRng::new(42), FaultConfig::aggressive());
        for _ in 0..200 {
            assert_eq!(inj1.next_fault(), inj2.next_fault());
        }
    }

    #[test]
    fn test_total_outage_always_refuses() {
        let mut injector =
            FaultInjector::new(SimRng::new(9), FaultConfig::total_outage());
        for _ in 0..50 {
            assert_eq!(injector.next_fault(), Some(TransportFault::Connect));
        }
        assert_eq!(injector.stats().faults_count, 50);
    }

    #[test]
    fn test_status_faults_use_retryable_codes() {
        let config = FaultConfig {
            status_probability: 1.0,
            ..FaultConfig::none()
        };
        let mut injector = FaultInjector::new(SimRng::new(3), config);
        injector.set_enabled(true);
        for _ in 0..50 {
            match injector.next_fault() {
                Some(TransportFault::Status(code)) => assert!(FAULT_STATUSES.contains(&code)),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_fault_rate_is_roughly_configured() {
        let config = FaultConfig {
            connect_probability: 0.5,
            ..FaultConfig::none()
        };
        let mut injector = FaultInjector::new(SimRng::new(12345), config);
        injector.set_enabled(true);

        let trials = 10_000;
        let faults = (0..trials).filter(|_| injector.next_fault().is_some()).count();
        let ratio = faults as f64 / trials as f64;
        assert!(
            (0.45..=0.55).contains(&ratio),
            "Expected ~50% faults, got {}%",
            ratio * 100.0
        );
    }
}
