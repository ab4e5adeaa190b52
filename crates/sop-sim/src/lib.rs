//! # sop-sim
//!
//! Deterministic simulation of the generation transport.
//!
//! Remote models fail in a handful of ways: refused connections, gateway
//! errors, 200 replies with nothing in them. This crate reproduces those
//! failures deterministically so the tier walk and the orchestrator's
//! fallback can be tested without a network. All behavior is reproducible
//! via a seed.
//!
//! ## Usage
//!
//! ```rust
//! use sop_sim::{chat_reply, FaultConfig, FaultyBackend, ScriptedBackend};
//!
//! // Replay exact replies in order
//! let scripted = ScriptedBackend::new(vec![Ok(chat_reply("1. Scope"))]);
//!
//! // Or inject seeded faults in front of any backend
//! let faulty = FaultyBackend::new(scripted, 12345, FaultConfig::aggressive());
//! ```
//!
//! ## Reproducibility
//!
//! To reproduce a failing simulation:
//! ```bash
//! SOP_SIM_SEED=12345 cargo test
//! ```

pub mod backend;
pub mod fault;
pub mod random;

pub use backend::{chat_reply, empty_reply, legacy_reply, status_reply, FaultyBackend, ScriptedBackend, SentRequest};
pub use fault::{FaultConfig, FaultInjector, FaultStats, TransportFault};
pub use random::SimRng;

/// Get simulation seed from environment or generate random one.
///
/// Logs the seed for reproduction. Use `SOP_SIM_SEED=<seed>` to reproduce.
#[must_use]
pub fn get_or_generate_seed() -> u64 {
    match std::env::var("SOP_SIM_SEED").ok().and_then(|s| s.parse().ok()) {
        Some(seed) => {
            tracing::info!(seed, "SOP_SIM_SEED from environment");
            seed
        }
        None => {
            let seed = rand::random::<u64>() | 1;
            tracing::info!(seed, "SOP_SIM_SEED randomly generated");
            seed
        }
    }
}
