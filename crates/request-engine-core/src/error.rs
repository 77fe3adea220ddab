//! Unified error taxonomy and classification from transport-level failures.
//!
//! [`EngineError`] is the single error type surfaced to callers of the
//! request engine. It is produced either directly (e.g. queue timeouts,
//! cache corruption) or via [`classify`], which maps a raw [`TransportFailure`]
//! reported by the transport adapter into the taxonomy below.

use std::fmt;
use std::sync::Arc;

/// Top-level error category. Retryability and display semantics are keyed
/// off the category, not the more granular [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Server,
    Client,
    Auth,
    Data,
    Operation,
    Unknown,
}

impl ErrorCategory {
    /// `true` for categories the queue is allowed to retry by default.
    ///
    /// A per-request retry policy may still override this (see the
    /// idempotency filter applied by the queue).
    pub fn is_retryable_by_default(self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Client => "client",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Data => "data",
            ErrorCategory::Operation => "operation",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Fine-grained error code within a category. See §7 of the design for the
/// full taxonomy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Network
    ConnectTimeout,
    SendTimeout,
    ReceiveTimeout,
    ConnectionError,
    NetworkUnavailable,
    RequestTimeout,
    OperationTimeout,
    // Auth
    Unauthorized,
    Forbidden,
    TokenExpired,
    TokenInvalid,
    // Client
    BadRequest,
    NotFound,
    MethodNotAllowed,
    TooManyRequests,
    ClientError,
    // Server
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    ServerError,
    // Data
    ParseError,
    ValidationError,
    DataCorrupted,
    // Operation
    RequestCancelled,
    OperationFailed,
    ResourceBusy,
    // Unknown
    UnknownError,
}

impl ErrorCode {
    /// The category this code belongs to. Kept in sync with §7 by hand since
    /// the mapping is small and stable.
    pub fn category(self) -> ErrorCategory {
        use ErrorCategory::*;
        use ErrorCode::*;
        match self {
            ConnectTimeout | SendTimeout | ReceiveTimeout | ConnectionError
            | NetworkUnavailable | RequestTimeout | OperationTimeout => Network,
            Unauthorized | Forbidden | TokenExpired | TokenInvalid => Auth,
            BadRequest | NotFound | MethodNotAllowed | TooManyRequests | ClientError => Client,
            InternalServerError | BadGateway | ServiceUnavailable | GatewayTimeout
            | ServerError => Server,
            ParseError | ValidationError | DataCorrupted => Data,
            RequestCancelled | OperationFailed | ResourceBusy => Operation,
            UnknownError => Unknown,
        }
    }

    fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            ConnectTimeout => "connectTimeout",
            SendTimeout => "sendTimeout",
            ReceiveTimeout => "receiveTimeout",
            ConnectionError => "connectionError",
            NetworkUnavailable => "networkUnavailable",
            RequestTimeout => "requestTimeout",
            OperationTimeout => "operationTimeout",
            Unauthorized => "unauthorized",
            Forbidden => "forbidden",
            TokenExpired => "tokenExpired",
            TokenInvalid => "tokenInvalid",
            BadRequest => "badRequest",
            NotFound => "notFound",
            MethodNotAllowed => "methodNotAllowed",
            TooManyRequests => "tooManyRequests",
            ClientError => "clientError",
            InternalServerError => "internalServerError",
            BadGateway => "badGateway",
            ServiceUnavailable => "serviceUnavailable",
            GatewayTimeout => "gatewayTimeout",
            ServerError => "serverError",
            ParseError => "parseError",
            ValidationError => "validationError",
            DataCorrupted => "dataCorrupted",
            RequestCancelled => "requestCancelled",
            OperationFailed => "operationFailed",
            ResourceBusy => "resourceBusy",
            UnknownError => "unknownError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type surfaced to callers of the request engine.
///
/// Carries enough context (`status_code`, `original_cause`, `metadata`) for
/// callers to make routing decisions without depending on transport-specific
/// error types.
#[derive(Debug, Clone)]
pub struct EngineError {
    pub category: ErrorCategory,
    pub code: ErrorCode,
    pub message: String,
    pub status_code: Option<u16>,
    pub original_cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    pub context: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl EngineError {
    /// Builds an error from a code and message, deriving the category.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            category: code.category(),
            code,
            message: message.into(),
            status_code: None,
            original_cause: None,
            context: None,
            metadata: Vec::new(),
        }
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.original_cause = Some(Arc::new(cause));
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// `true` exactly when `category` is `Network` or `Server` (§4.1). A
    /// per-request retry policy may still override this decision.
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable_by_default()
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownError, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::RequestCancelled, "request was cancelled")
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.category, self.code, self.message)?;
        if let Some(status) = self.status_code {
            write!(f, " (status {status})")?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.original_cause
            .as_ref()
            .map(|c| c.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// HTTP method associated with a failed request, used only to decide
/// between `Network/requestTimeout` phrasing and for caller diagnostics.
/// The actual idempotency filtering for retries lives in the queue crate.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub url: String,
}

/// Raw failure reported by the transport adapter, prior to classification.
///
/// This is intentionally narrower than a real transport error type: the
/// transport is an external collaborator (§4.8) and only needs to report
/// which bucket a failure falls into plus an optional status code/message.
#[derive(Debug, Clone)]
pub enum TransportFailure {
    ConnectTimeout,
    SendTimeout,
    ReceiveTimeout,
    ConnectionFailed { detail: String },
    DnsFailure { detail: String },
    SocketError { detail: String },
    HttpStatus { status: u16, message: String },
    Cancelled,
    ParseFailure { detail: String },
    Other { detail: String },
}

/// Maps a [`TransportFailure`] (plus request context) into an [`EngineError`].
///
/// Mirrors the table in §4.1:
/// - connect/send/receive timeout → Network
/// - connect failure / DNS failure / socket error → Network
/// - HTTP 4xx → Client, except 401/403 → Auth
/// - HTTP 5xx → Server
/// - cancellation → Operation/requestCancelled
/// - parse/format errors → Data/parseError
/// - anything else → Unknown/unknownError
pub fn classify(failure: TransportFailure, ctx: &RequestContext) -> EngineError {
    match failure {
        TransportFailure::ConnectTimeout => EngineError::new(
            ErrorCode::ConnectTimeout,
            format!("connect timed out for {} {}", ctx.method, ctx.url),
        ),
        TransportFailure::SendTimeout => EngineError::new(
            ErrorCode::SendTimeout,
            format!("send timed out for {} {}", ctx.method, ctx.url),
        ),
        TransportFailure::ReceiveTimeout => EngineError::new(
            ErrorCode::ReceiveTimeout,
            format!("receive timed out for {} {}", ctx.method, ctx.url),
        ),
        TransportFailure::ConnectionFailed { detail } => {
            EngineError::new(ErrorCode::ConnectionError, detail)
        }
        TransportFailure::DnsFailure { detail } => {
            EngineError::new(ErrorCode::NetworkUnavailable, detail)
        }
        TransportFailure::SocketError { detail } => {
            EngineError::new(ErrorCode::ConnectionError, detail)
        }
        TransportFailure::HttpStatus { status, message } => classify_http_status(status, message),
        TransportFailure::Cancelled => EngineError::cancelled(),
        TransportFailure::ParseFailure { detail } => EngineError::new(ErrorCode::ParseError, detail),
        TransportFailure::Other { detail } => EngineError::new(ErrorCode::UnknownError, detail),
    }
    .with_context(format!("{} {}", ctx.method, ctx.url))
}

fn classify_http_status(status: u16, message: String) -> EngineError {
    let code = match status {
        401 => ErrorCode::Unauthorized,
        403 => ErrorCode::Forbidden,
        400 => ErrorCode::BadRequest,
        404 => ErrorCode::NotFound,
        405 => ErrorCode::MethodNotAllowed,
        408 => ErrorCode::RequestTimeout,
        429 => ErrorCode::TooManyRequests,
        500 => ErrorCode::InternalServerError,
        502 => ErrorCode::BadGateway,
        503 => ErrorCode::ServiceUnavailable,
        504 => ErrorCode::GatewayTimeout,
        400..=499 => ErrorCode::ClientError,
        500..=599 => ErrorCode::ServerError,
        _ => ErrorCode::UnknownError,
    };
    EngineError::new(code, message).with_status_code(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext {
            method: "GET".to_string(),
            url: "https://api.example.com/u/1".to_string(),
        }
    }

    #[test]
    fn timeouts_classify_as_network_and_retryable() {
        let err = classify(TransportFailure::ConnectTimeout, &ctx());
        assert_eq!(err.category, ErrorCategory::Network);
        assert_eq!(err.code, ErrorCode::ConnectTimeout);
        assert!(err.is_retryable());
    }

    #[test]
    fn unauthorized_is_auth_not_client() {
        let err = classify(
            TransportFailure::HttpStatus {
                status: 401,
                message: "no token".into(),
            },
            &ctx(),
        );
        assert_eq!(err.category, ErrorCategory::Auth);
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert!(!err.is_retryable());
    }

    #[test]
    fn forbidden_is_auth_not_client() {
        let err = classify(
            TransportFailure::HttpStatus {
                status: 403,
                message: "no access".into(),
            },
            &ctx(),
        );
        assert_eq!(err.category, ErrorCategory::Auth);
    }

    #[test]
    fn server_5xx_is_retryable() {
        let err = classify(
            TransportFailure::HttpStatus {
                status: 503,
                message: "overloaded".into(),
            },
            &ctx(),
        );
        assert_eq!(err.category, ErrorCategory::Server);
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn generic_4xx_maps_to_client_error() {
        let err = classify(
            TransportFailure::HttpStatus {
                status: 418,
                message: "teapot".into(),
            },
            &ctx(),
        );
        assert_eq!(err.category, ErrorCategory::Client);
        assert_eq!(err.code, ErrorCode::ClientError);
        assert!(!err.is_retryable());
    }

    #[test]
    fn cancellation_maps_to_operation_cancelled() {
        let err = classify(TransportFailure::Cancelled, &ctx());
        assert_eq!(err.category, ErrorCategory::Operation);
        assert_eq!(err.code, ErrorCode::RequestCancelled);
        assert!(!err.is_retryable());
    }

    #[test]
    fn parse_failure_maps_to_data_parse_error() {
        let err = classify(
            TransportFailure::ParseFailure {
                detail: "invalid json".into(),
            },
            &ctx(),
        );
        assert_eq!(err.category, ErrorCategory::Data);
        assert_eq!(err.code, ErrorCode::ParseError);
    }

    #[test]
    fn other_failure_maps_to_unknown() {
        let err = classify(
            TransportFailure::Other {
                detail: "???".into(),
            },
            &ctx(),
        );
        assert_eq!(err.category, ErrorCategory::Unknown);
    }

    #[test]
    fn display_includes_category_code_and_status() {
        let err = classify(
            TransportFailure::HttpStatus {
                status: 500,
                message: "boom".into(),
            },
            &ctx(),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("server"));
        assert!(rendered.contains("internalServerError"));
        assert!(rendered.contains("500"));
    }
}
