use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    Chunker(#[from] librarian_chunker::ChunkerError),

    #[error("Cache error: {0}")]
    Cache(#[from] librarian_cache::CacheError),

    #[error("Embedding error: {0}")]
    Embed(#[from] librarian_embedder::EmbedError),

    #[error("Store error: {0}")]
    Store(#[from] librarian_store::StoreError),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}
