//! Error taxonomy for the simulation core

use thiserror::Error;

use crate::components::RoomId;
use crate::lineage::LineageId;

#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected at world-build time, before any tick runs.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The registry was handed an id it never issued.
    #[error("unknown lineage id {0}")]
    InvalidLineage(LineageId),

    #[error("unknown {0}")]
    UnknownRoom(RoomId),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
