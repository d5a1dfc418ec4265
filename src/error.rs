use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Broker contract errors.
///
/// The broker is consumed through the [`Broker`](crate::port::broker::Broker)
/// port; adapters map their transport failures into these variants.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("unknown stream '{0}'")]
    UnknownStream(String),

    #[error("malformed entry id '{0}'")]
    MalformedEntryId(String),

    #[error("broker call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Model routing errors.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("no models configured for tier '{tier}'")]
    EmptyTier { tier: &'static str },

    #[error("model '{model}' failed: {reason}")]
    ModelFailed { model: String, reason: String },

    #[error("model '{model}' and fallback '{fallback}' both failed: {reason}")]
    FallbackFailed {
        model: String,
        fallback: String,
        reason: String,
    },

    #[error("model returned an unusable response: {0}")]
    BadResponse(String),
}

/// Per-entry handler outcome for the stream consumer framework.
///
/// `Malformed` is non-retryable (the entry is logged and skipped);
/// `Transient` is retried up to the consumer's budget, then dead-lettered.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("channel send failed: {0}")]
    ChannelSend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
