use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasourceError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("no {kind} found for scheme {scheme} (not registered?)")]
    UnregisteredScheme { kind: &'static str, scheme: String },

    #[error("too many args for building {scheme:?} URL: found {count}")]
    TooManyArgs { scheme: String, count: usize },

    #[error("missing key - must provide key argument for boltdb datasources")]
    MissingKey,

    #[error("bad sub-path {arg:?}: {reason}")]
    Argument { arg: String, reason: String },

    #[error("failed to parse Media Type {media_type:?}: {reason}")]
    MediaType { media_type: String, reason: String },

    #[error("data with content type {0} not yet supported")]
    UnsupportedContentType(String),

    #[error("Merge error: {0}")]
    Merge(String),

    #[error("Parse error ({format}): {reason}")]
    Parse { format: &'static str, reason: String },

    #[error("failed to {op} {target}: {reason}")]
    Backend {
        op: &'static str,
        target: String,
        reason: String,
    },

    #[error("HTTP request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("failed to request {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<DatasourceError>,
    },

    #[error("response body already consumed")]
    BodyConsumed,

    #[error("request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl DatasourceError {
    /// Wrap an upstream failure with the operation and the path/key it was acting on
    pub fn backend(op: &'static str, target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            op,
            target: target.into(),
            reason: err.to_string(),
        }
    }

    pub fn argument(arg: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Argument {
            arg: arg.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            format,
            reason: err.to_string(),
        }
    }

    /// Configuration and shape errors are never worth retrying; everything else
    /// came from a backend.
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::UnregisteredScheme { .. }
            | Self::TooManyArgs { .. }
            | Self::MissingKey
            | Self::Argument { .. }
            | Self::MediaType { .. }
            | Self::UnsupportedContentType(_)
            | Self::Merge(_)
            | Self::Parse { .. }
            | Self::Url(_) => true,
            Self::Request { source, .. } => source.is_config_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasourceError>;
