/// OpenTelemetry semantic convention constants for tracing
///
/// These constants ensure consistency across the codebase and prevent typos
/// Resource attribute keys following OTEL semantic conventions
pub mod resource {
    /// Logical name of the service
    pub const SERVICE_NAME: &str = "service.name";

    /// Language of the telemetry SDK
    pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";
}

/// Instrumentation scope defaults
pub mod scope {
    /// Default scope name for tracing instrumentation
    pub const DEFAULT_NAME: &str = "pingrelay.tracing";

    /// Default scope version
    pub const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Span attribute keys
pub mod attributes {
    /// Implementation language/runtime tag of the service handling the request
    pub const LANGUAGE: &str = "language";

    pub mod http {
        /// HTTP request method
        pub const METHOD: &str = "http.method";

        /// Full HTTP request URL
        pub const URL: &str = "http.url";

        /// HTTP response status code
        pub const STATUS_CODE: &str = "http.status_code";
    }

    pub mod exception {
        /// Name of the span event recording an exception
        pub const EVENT_NAME: &str = "exception";

        pub const TYPE: &str = "exception.type";

        pub const MESSAGE: &str = "exception.message";
    }
}

/// W3C Trace Context header names
pub mod headers {
    pub const TRACEPARENT: &str = "traceparent";

    pub const TRACESTATE: &str = "tracestate";
}
