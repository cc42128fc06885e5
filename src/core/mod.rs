pub mod config;
pub mod error;
pub mod types;

pub use config::{EngineConfig, PersistPolicy};
pub use error::{GachaError, Result};
pub use types::{BannerType, ItemId, RequestId, TierIndex, UserId};
