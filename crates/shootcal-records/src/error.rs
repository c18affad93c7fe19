use thiserror::Error;

/// Errors returned while fetching or normalizing availability records.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The records API answered with a non-2xx HTTP status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The records API returned a non-zero `code` in the response envelope.
    #[error("records API error {code}: {message}")]
    Application { code: i64, message: String },

    /// A 2xx body without an envelope `code`, e.g. a proxy or gateway reply.
    #[error("records API reply without a status code: {message}")]
    MissingCode { message: String },

    /// One record in a batch could not be normalized; the whole batch is rejected.
    #[error("malformed record at index {index}: {field} {reason}")]
    MalformedRecord {
        index: usize,
        field: &'static str,
        reason: String,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid records endpoint '{0}'")]
    InvalidEndpoint(String),
}

/// Coarse error taxonomy used in structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Application,
    MalformedRecord,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network"),
            ErrorKind::Application => write!(f, "application"),
            ErrorKind::MalformedRecord => write!(f, "malformed_record"),
        }
    }
}

impl RecordsError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordsError::Http(_)
            | RecordsError::Status { .. }
            | RecordsError::Deserialize { .. }
            | RecordsError::InvalidEndpoint(_) => ErrorKind::Network,
            RecordsError::Application { .. } | RecordsError::MissingCode { .. } => {
                ErrorKind::Application
            }
            RecordsError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
        }
    }
}
