use thiserror::Error;

/// Input validation errors with structured variants.
///
/// These cover everything checked before a payload is serialized: pool
/// masks, gateways, DNS servers, and address ranges. Nothing panics across
/// this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid CIDR mask '{mask}': expected '/' followed by one or two digits")]
    InvalidMask { mask: String },

    #[error("invalid IPv4 address '{address}'")]
    InvalidAddress { address: String },

    #[error("invalid DNS server address '{address}'")]
    InvalidDnsServer { address: String },

    #[error("invalid IP range '{range}': expected 'start-end' with both ends IPv4 and end >= start")]
    InvalidRange { range: String },

    #[error("pool '{pool}' holds {available} addresses but needs at least {required}")]
    InsufficientAddresses {
        pool: String,
        available: u64,
        required: u64,
    },

    #[error("missing required value for {field}")]
    MissingValue { field: &'static str },
}

/// Inventory lookup errors against the management plane.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
}

impl LookupError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        LookupError::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Errors surfaced by the two remote APIs.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} returned an empty response body")]
    EmptyResponse { operation: &'static str },

    #[error("malformed response for {operation}: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("SOAP fault: {0}")]
    SoapFault(String),

    #[error("{operation} failed: {detail}")]
    JobFailed { operation: String, detail: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("timed out after {waited_secs}s waiting for {operation}")]
    Timeout { operation: String, waited_secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection error: {0}")]
    Connection(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The HTTP status carried by an [`ApiError::UnexpectedStatus`], if any.
    ///
    /// The bring-up pipeline uses this to distinguish "the manager answered
    /// with a status we did not expect" (often an already-configured
    /// resource) from connection-level failures, which are always fatal.
    pub fn unexpected_status(&self) -> Option<u16> {
        match self {
            Error::Api(ApiError::UnexpectedStatus { status, .. }) => Some(*status),
            _ => None,
        }
    }
}
