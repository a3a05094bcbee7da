use thiserror::Error;

/// Errors surfaced by the bridging pipeline.
///
/// None of these ever reach the caller of [`crate::VisionBridge::route`]; the
/// orchestrator catches them at its boundary and degrades to pass-through.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid bridge configuration: {0}")]
    Config(#[from] validator::ValidationErrors),

    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
