//! Draw engine: single-draw resolution and sequential batches

pub mod batch;
pub mod draw;
pub mod random;

pub use batch::{BatchResult, BatchRunner, BatchStats, DrawSteps, TierStats};
pub use draw::{effective_probability, DrawEngine, DrawOutcome};
pub use random::{seeded, ConstantSource, ScriptedSource, UniformSource};
