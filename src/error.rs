use thiserror::Error;

#[derive(Debug, Error)]
pub enum PamphletError {
    #[error("error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("error loading layout {0}")]
    LayoutLoad(String),

    #[error("{0} could not be located")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{0}")]
    Template(#[from] minijinja::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
