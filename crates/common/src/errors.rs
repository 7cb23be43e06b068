use thiserror::Error;

// -----------------------------------------------------------------------------
// Configuration Errors
// -----------------------------------------------------------------------------
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({why})")]
    InvalidValue {
        key: String,
        value: String,
        why: String,
    },

    #[error("invalid url for {key}: '{value}'")]
    InvalidUrl {
        key: String,
        value: String,
        #[source]
        source: url::ParseError,
    },
}

// -----------------------------------------------------------------------------
// Carrier decode errors
//
// These never leave the codec: a malformed header is logged and treated as
// "no context".
// -----------------------------------------------------------------------------
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TraceparentError {
    #[error("invalid traceparent: expected 4 fields, found {0}")]
    FieldCount(usize),

    #[error("unsupported traceparent version '{0}'")]
    UnsupportedVersion(String),

    #[error("invalid trace id '{0}'")]
    InvalidTraceId(String),

    #[error("invalid span id '{0}'")]
    InvalidSpanId(String),

    #[error("invalid trace flags '{0}'")]
    InvalidFlags(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TraceStateError {
    #[error("'{0}' is not a valid tracestate key")]
    Key(String),

    #[error("'{0}' is not a valid tracestate value")]
    Value(String),

    #[error("'{0}' is not a valid tracestate list member")]
    List(String),

    #[error("tracestate has {0} members, at most 32 are allowed")]
    TooManyMembers(usize),
}

// -----------------------------------------------------------------------------
// Telemetry export errors
// -----------------------------------------------------------------------------
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to send spans to trace collector: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("trace collector returned non-success status: {0}")]
    Rejected(u16),

    #[error("failed to serialize export payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("background flusher has not been started")]
    NotStarted,

    #[error("trace collector is shut down")]
    ShutDown,
}
