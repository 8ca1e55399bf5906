use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntradaError {
    #[error("ledger corrupt: {0}")]
    LedgerCorrupt(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("recognition service error: {0}")]
    Recognition(String),

    #[error("enrollment returned no identity for external id '{0}'")]
    EnrollmentIncomplete(String),

    #[error("storage backend error: {0}")]
    Storage(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, EntradaError>;
