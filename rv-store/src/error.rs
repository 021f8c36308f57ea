use std::io;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt ledger record: {0}")]
    CorruptRecord(String),

    #[error("blob {0} not found")]
    BlobNotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
