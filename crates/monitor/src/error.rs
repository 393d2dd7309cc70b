use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Reading or writing the call-cycle record or cooldown ledger failed.
    #[error("monitor persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl MonitorError {
    pub(crate) fn persistence<E>(e: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MonitorError::Persistence(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
