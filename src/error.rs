use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeedError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("Server error: {0}")]
    Server(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("All {attempted} download attempt(s) failed")]
    ProbeFailed { attempted: usize },
}

impl SpeedError {
    /// Returns a user-friendly suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            SpeedError::InvalidRequest(_) => {
                Some("Width, height and target size must be positive integers.")
            }
            SpeedError::Bind { .. } => {
                Some("The port may already be in use. Try a different one with --port.")
            }
            SpeedError::Config(_) => {
                Some("Check the config file syntax, or pass --config to point at another file.")
            }
            SpeedError::Client(_) => Some("Check the TLS setup and the --timeout value."),
            SpeedError::ProbeFailed { .. } => {
                Some("Check the URL and your network connection, or raise --timeout.")
            }
            _ => None,
        }
    }

    /// Whether this error was caused by the caller rather than the server.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, SpeedError::InvalidRequest(_))
    }
}

impl From<image::ImageError> for SpeedError {
    fn from(err: image::ImageError) -> Self {
        SpeedError::Encoding(err.to_string())
    }
}

impl From<toml::de::Error> for SpeedError {
    fn from(err: toml::de::Error) -> Self {
        SpeedError::Config(format!("TOML parse error: {}", err))
    }
}
