use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] faves_core::Error),
    #[error(transparent)]
    Api(#[from] faves_core::ApiError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Profile '{0}' has no API base URL. Run `faves config init --api-base-url <URL>` or set FAVES_API_BASE_URL."
    )]
    ApiNotConfigured(String),
}
