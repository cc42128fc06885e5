//! Gacha Sim - offline gacha pity simulation
//!
//! Reproduces randomized-reward banner mechanics: soft-pity probability
//! ramps, hard-pity guarantees and the persistent 50/50 rule between a
//! featured and a standard roster.

pub mod assets;
pub mod core;
pub mod engine;
pub mod pity;
pub mod pool;
pub mod service;
pub mod store;
