use thiserror::Error;

use crate::assets::ResolvedDraw;
use crate::pity::PityState;

#[derive(Error, Debug)]
pub enum GachaError {
    #[error("Invalid pool definition: {0}")]
    InvalidPoolDefinition(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State store unavailable: {0}")]
    StateStoreUnavailable(String),

    #[error("Lock contention on {key} after {waited_ms}ms")]
    LockContention { key: String, waited_ms: u64 },

    /// Per-draw persistence failed part way through a batch. The first
    /// `committed` draws are durable and returned in `draws`, in draw
    /// order; `final_state` is the state persisted after the last of them.
    /// Nothing after them was applied.
    #[error("Batch stopped after {committed}/{requested} committed draws: {source}")]
    PartialCommit {
        committed: usize,
        requested: usize,
        draws: Vec<ResolvedDraw>,
        final_state: PityState,
        #[source]
        source: Box<GachaError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

impl GachaError {
    pub fn invalid_pool(msg: impl Into<String>) -> Self {
        GachaError::InvalidPoolDefinition(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GachaError::InvalidConfig(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        GachaError::StateStoreUnavailable(msg.into())
    }

    /// Whether the caller may retry the request (with backoff).
    ///
    /// Configuration and parse errors point at a deployment bug and are
    /// never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GachaError::StateStoreUnavailable(_)
                | GachaError::LockContention { .. }
                | GachaError::PartialCommit { .. }
                | GachaError::Io(_)
        )
    }

    /// One line suitable for showing to the person who issued the command.
    pub fn user_message(&self) -> String {
        match self {
            GachaError::LockContention { .. } => {
                "A draw for this banner is already in progress, please try again shortly.".into()
            }
            GachaError::PartialCommit {
                committed,
                requested,
                ..
            } => format!(
                "Only {} of {} draws were saved before storage failed; those results and your pity progress are kept.",
                committed, requested
            ),
            GachaError::StateStoreUnavailable(_) | GachaError::Io(_) => {
                "Pity storage is unavailable right now, please try again later.".into()
            }
            GachaError::InvalidPoolDefinition(_)
            | GachaError::InvalidConfig(_)
            | GachaError::Serde(_)
            | GachaError::Toml(_)
            | GachaError::Yaml(_) => "This banner is misconfigured, please contact an administrator.".into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GachaError>;
