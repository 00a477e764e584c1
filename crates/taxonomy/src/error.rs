use thiserror::Error;

pub type Result<T> = std::result::Result<T, TaxonomyError>;

#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("Version store error: {0}")]
    StoreError(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("{0}")]
    Other(String),
}
