use std::path::PathBuf;
use thiserror::Error;

/// Main error type for storage-tour operations
#[derive(Debug, Error)]
pub enum StorageTourError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid connection string: {0}")]
    ConnectionStringError(String),

    #[error("Azure API error: {0}")]
    AzureApiError(String),

    #[error("Storage service returned HTTP {status} ({code}): {message}")]
    ServiceError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Local file error for '{}': {source}", path.display())]
    LocalFileError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl StorageTourError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn connection_string<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionStringError(msg.into())
    }

    pub fn azure_api<S: Into<String>>(msg: S) -> Self {
        Self::AzureApiError(msg.into())
    }

    pub fn service<C: Into<String>, M: Into<String>>(status: u16, code: C, message: M) -> Self {
        Self::ServiceError {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn local_file<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::LocalFileError {
            path: path.into(),
            source,
        }
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type alias for storage-tour operations
pub type Result<T> = std::result::Result<T, StorageTourError>;

/// Convert Azure Core errors to StorageTourError
impl From<azure_core::Error> for StorageTourError {
    fn from(error: azure_core::Error) -> Self {
        Self::AzureApiError(error.to_string())
    }
}

/// True for a 409 whose error code says the resource already exists.
///
/// Other conflicts such as `ContainerBeingDeleted` or `ShareBeingDeleted`
/// are real failures. A 409 without any error code is taken as "exists".
pub fn is_already_exists_code(status: u16, error_code: Option<&str>) -> bool {
    status == 409 && error_code.map_or(true, |code| code.ends_with("AlreadyExists"))
}

/// True when the service rejected a create because the resource already exists.
pub fn is_already_exists(error: &azure_core::Error) -> bool {
    match error.kind() {
        azure_core::error::ErrorKind::HttpResponse { status, error_code }
            if *status == azure_core::StatusCode::Conflict =>
        {
            is_already_exists_code(409, error_code.as_deref())
        }
        _ => false,
    }
}
