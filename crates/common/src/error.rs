use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("event source error: {0}")]
    Source(Box<Error>),

    #[error("run cancelled")]
    Cancelled,

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an upstream failure as a source error.
    pub fn wrap_source(err: Error) -> Self {
        Error::Source(Box::new(err))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_carries_context() {
        let err = Error::wrap_source(Error::WebSocket("connection reset".into()));
        assert_eq!(
            err.to_string(),
            "event source error: WebSocket error: connection reset"
        );
        assert!(!err.is_cancelled());
        assert!(Error::Cancelled.is_cancelled());
    }
}
