#[derive(Debug, thiserror::Error)]
pub enum EventsError {
    #[error("Import validator is no longer running")]
    ValidatorClosed,

    #[error("Import validator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
