use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported link: {0}")]
    Unsupported(String),

    #[error("catalog request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to decode catalog response")]
    Decode(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
