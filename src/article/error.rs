use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArticleError {
    #[error("Error decoding article fixtures")]
    Fixture(#[from] serde_json::Error),

    #[error("Article has no cover image")]
    MissingCover,

    #[error("Article source unavailable: {0}")]
    Source(String),
}
