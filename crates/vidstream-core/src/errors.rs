use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VidstreamError {
    #[error("channel name must not be empty")]
    EmptyChannelName,
    #[error("invalid navigation payload: {0}")]
    InvalidPayload(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("engine creation failed: {0}")]
    EngineCreate(String),
    #[error("join failed: {0}")]
    Join(String),
    #[error("not joined to a channel")]
    NotJoined,
    #[error("unknown participant: {0}")]
    UnknownParticipant(u32),
    #[error("session terminated")]
    Terminated,
    #[error("settings error: {0}")]
    Settings(String),
}
