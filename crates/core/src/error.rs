/// Result alias that carries the custom [`VisualiserError`] type.
pub type Result<T> = std::result::Result<T, VisualiserError>;

/// Common error type for the core crate.
///
/// Nothing in the per-frame signal path returns an error; the taxonomy below
/// only surfaces at the parsing and application boundaries. Sparse analysis
/// data is handled with documented defaults rather than errors.
#[derive(Debug, thiserror::Error)]
pub enum VisualiserError {
    /// Free-form error raised by the application layer.
    #[error("{0}")]
    Message(String),
    /// A caller handed the core something it cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// The analysis provider payload could not be decoded.
    #[error("malformed analysis payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl VisualiserError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for VisualiserError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for VisualiserError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
