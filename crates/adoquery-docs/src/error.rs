use adoquery_fetch::FetchError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocsError>;

#[derive(Debug, Error)]
pub enum DocsError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Could not read query node from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown document type: {0}")]
    UnknownDocType(String),
}
