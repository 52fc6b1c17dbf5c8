use std::path::PathBuf;

/// Failures raised while configuring or running the remote debugger.
#[derive(Debug, thiserror::Error)]
pub enum DebuggerError {
    /// The local credential file is missing or carries no webhook id.
    #[error("webhook identifier not found in {path}")]
    WebhookIdNotFound { path: PathBuf },

    #[error("language model directory not found: {0}")]
    ModelDirectoryNotFound(PathBuf),

    #[error("failed to parse language model {path}: {source}")]
    ModelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid debugger config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The debugger was installed on something other than an app pipeline.
    #[error("debugger can only be installed on an app host, got {0}")]
    InvalidHost(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("socket connection failed: {0}")]
    ConnectFailed(String),

    /// Emission attempted before the channel was ever connected.
    #[error("transport not initialized")]
    NotInitialized,

    /// The channel was connected once but the socket has gone away.
    #[error("socket disconnected")]
    Disconnected,

    #[error("invalid socket url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no surface accepts this request")]
    NoSurface,

    #[error("pipeline has no request handler")]
    MissingHandler,

    /// A context hook ran for a request that was never assigned an id.
    #[error("request has no correlation id")]
    Untagged,

    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
