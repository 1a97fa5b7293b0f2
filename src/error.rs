use std::{any::Any, error, fmt, sync::Arc};

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::schema::{MergeError, ValidationErrors};

/// The fixed set of error codes an engine response can carry.
///
/// Every code maps to exactly one HTTP-style status number. The mapping belongs to the engine and can't be changed per error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    MethodNotSupported,
    Timeout,
    Conflict,
    PreconditionFailed,
    PayloadTooLarge,
    UnsupportedMediaType,
    UnprocessableContent,
    TooManyRequests,
    ClientClosedRequest,
    InternalServerError,
    NotImplemented,
    /// The route exists but was requested as the wrong kind (query vs mutation).
    BadRouteType,
}

impl ErrorCode {
    pub const fn to_status_code(self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::PaymentRequired => 402,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotSupported => 405,
            ErrorCode::Timeout => 408,
            ErrorCode::Conflict => 409,
            ErrorCode::PreconditionFailed => 412,
            ErrorCode::PayloadTooLarge => 413,
            ErrorCode::UnsupportedMediaType => 415,
            ErrorCode::UnprocessableContent => 422,
            ErrorCode::TooManyRequests => 429,
            ErrorCode::ClientClosedRequest => 499,
            ErrorCode::InternalServerError => 500,
            ErrorCode::NotImplemented => 501,
            ErrorCode::BadRouteType => 400,
        }
    }

    /// `400` always maps back to [`ErrorCode::BadRequest`].
    pub const fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            400 => Some(ErrorCode::BadRequest),
            401 => Some(ErrorCode::Unauthorized),
            402 => Some(ErrorCode::PaymentRequired),
            403 => Some(ErrorCode::Forbidden),
            404 => Some(ErrorCode::NotFound),
            405 => Some(ErrorCode::MethodNotSupported),
            408 => Some(ErrorCode::Timeout),
            409 => Some(ErrorCode::Conflict),
            412 => Some(ErrorCode::PreconditionFailed),
            413 => Some(ErrorCode::PayloadTooLarge),
            415 => Some(ErrorCode::UnsupportedMediaType),
            422 => Some(ErrorCode::UnprocessableContent),
            429 => Some(ErrorCode::TooManyRequests),
            499 => Some(ErrorCode::ClientClosedRequest),
            500 => Some(ErrorCode::InternalServerError),
            501 => Some(ErrorCode::NotImplemented),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::PaymentRequired => "PAYMENT_REQUIRED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorCode::UnprocessableContent => "UNPROCESSABLE_CONTENT",
            ErrorCode::TooManyRequests => "TOO_MANY_REQUESTS",
            ErrorCode::ClientClosedRequest => "CLIENT_CLOSED_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
            ErrorCode::BadRouteType => "BAD_ROUTE_TYPE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed error produced by the engine, a middleware or a resolver.
///
/// The `cause` is kept for logging and is never serialized.
#[derive(Clone)]
pub struct PtsqError {
    code: ErrorCode,
    message: Option<String>,
    info: Option<Value>,
    // We are using `Arc` instead of `Box` so the error stays `Clone`.
    cause: Option<Arc<dyn error::Error + Send + Sync>>,
}

impl PtsqError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: None,
            info: None,
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_info(mut self, info: Value) -> Self {
        self.info = Some(info);
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest).with_message(message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized).with_message(message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden).with_message(message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound).with_message(message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError).with_message(message)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> u16 {
        self.code.to_status_code()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    pub fn cause(&self) -> Option<&(dyn error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Drop the message and info, keeping the code and cause.
    pub(crate) fn redacted(self) -> Self {
        Self {
            code: self.code,
            message: Some("internal server error".into()),
            info: None,
            cause: self.cause,
        }
    }

    pub(crate) fn validation(issues: ValidationErrors) -> Self {
        Self::bad_request("invalid arguments").with_info(serde_json::json!({ "issues": issues }))
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".into());

        Self::internal("an unexpected error occurred").with_cause(Panicked(message))
    }

    /// The body sent over the wire when a call fails.
    pub fn to_wire(&self) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("name".into(), "PtsqError".into());
        if let Some(message) = &self.message {
            body.insert("message".into(), message.clone().into());
        }
        if let Some(info) = &self.info {
            body.insert("info".into(), info.clone());
        }
        Value::Object(body)
    }
}

impl PartialEq for PtsqError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message && self.info == other.info
    }
}

impl fmt::Debug for PtsqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PtsqError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("info", &self.info)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for PtsqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.code, message),
            None => write!(f, "{}", self.code),
        }
    }
}

impl error::Error for PtsqError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn error::Error + 'static))
    }
}

impl Serialize for PtsqError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = 1 + usize::from(self.message.is_some()) + usize::from(self.info.is_some());
        let mut state = serializer.serialize_struct("PtsqError", len)?;
        state.serialize_field("code", &self.code)?;
        if let Some(message) = &self.message {
            state.serialize_field("message", message)?;
        }
        if let Some(info) = &self.info {
            state.serialize_field("info", info)?;
        }
        state.end()
    }
}

impl From<serde_json::Error> for PtsqError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal("error serializing value").with_cause(err)
    }
}

impl From<Box<dyn error::Error + Send + Sync>> for PtsqError {
    fn from(err: Box<dyn error::Error + Send + Sync>) -> Self {
        Self {
            code: ErrorCode::InternalServerError,
            message: Some("an unexpected error occurred".into()),
            info: None,
            cause: Some(Arc::from(err)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("panicked: {0}")]
struct Panicked(String);

/// A problem with how a router or procedure was declared.
///
/// These are collected while declaring and returned together from [`Router::build`](crate::Router::build).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("a route name '{name}' at '{path}' is invalid. Names must be non-empty and only contain ASCII letters")]
    InvalidName { path: String, name: String },
    #[error("duplicate route '{path}'")]
    DuplicateRoute { path: String },
    #[error("incompatible argument schemas for '{path}': {source}")]
    IncompatibleArgs { path: String, source: MergeError },
    #[error("invalid pattern '{pattern}' in a schema of '{path}': {message}")]
    InvalidPattern {
        path: String,
        pattern: String,
        message: String,
    },
    #[error("cannot merge routers: the overriding router doesn't require the context {missing:?} required by the base router")]
    ContextRequirements { missing: Vec<&'static str> },
}

impl BuildError {
    pub(crate) fn prefixed(self, prefix: &str) -> Self {
        let join = |path: String| {
            if path.is_empty() {
                prefix.to_string()
            } else {
                format!("{prefix}.{path}")
            }
        };

        match self {
            Self::InvalidName { path, name } => Self::InvalidName {
                path: join(path),
                name,
            },
            Self::DuplicateRoute { path } => Self::DuplicateRoute { path: join(path) },
            Self::IncompatibleArgs { path, source } => Self::IncompatibleArgs {
                path: join(path),
                source,
            },
            Self::InvalidPattern {
                path,
                pattern,
                message,
            } => Self::InvalidPattern {
                path: join(path),
                pattern,
                message,
            },
            err @ Self::ContextRequirements { .. } => err,
        }
    }
}

/// Every [`BuildError`] found while building a router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildErrors(pub(crate) Vec<BuildError>);

impl BuildErrors {
    pub fn errors(&self) -> &[BuildError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} error(s) building router:", self.0.len())?;
        for err in &self.0 {
            writeln!(f, "  - {err}")?;
        }
        Ok(())
    }
}

impl error::Error for BuildErrors {}

impl IntoIterator for BuildErrors {
    type Item = BuildError;
    type IntoIter = std::vec::IntoIter<BuildError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ErrorCode::BadRequest.to_status_code(), 400);
        assert_eq!(ErrorCode::NotFound.to_status_code(), 404);
        assert_eq!(ErrorCode::MethodNotSupported.to_status_code(), 405);
        assert_eq!(ErrorCode::Conflict.to_status_code(), 409);
        assert_eq!(ErrorCode::UnprocessableContent.to_status_code(), 422);
        assert_eq!(ErrorCode::TooManyRequests.to_status_code(), 429);
        assert_eq!(ErrorCode::InternalServerError.to_status_code(), 500);
        assert_eq!(ErrorCode::BadRouteType.to_status_code(), 400);

        assert_eq!(ErrorCode::from_status_code(400), Some(ErrorCode::BadRequest));
        assert_eq!(ErrorCode::from_status_code(418), None);
    }

    #[test]
    fn code_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(ErrorCode::BadRouteType).unwrap(),
            serde_json::json!("BAD_ROUTE_TYPE")
        );
        assert_eq!(ErrorCode::MethodNotSupported.to_string(), "METHOD_NOT_SUPPORTED");
    }

    #[test]
    fn wire_body_omits_missing_fields() {
        let err = PtsqError::new(ErrorCode::Conflict);
        assert_eq!(err.to_wire(), serde_json::json!({ "name": "PtsqError" }));

        let err = PtsqError::not_found("nope").with_info(serde_json::json!({ "id": 1 }));
        assert_eq!(
            err.to_wire(),
            serde_json::json!({ "name": "PtsqError", "message": "nope", "info": { "id": 1 } })
        );
    }

    #[test]
    fn cause_is_kept_but_not_serialized() {
        let err: PtsqError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::InternalServerError);
        assert!(err.cause().is_some());
        assert!(error::Error::source(&err).is_some());

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "code": "INTERNAL_SERVER_ERROR", "message": "error serializing value" })
        );
    }

    #[test]
    fn redaction_keeps_code_and_cause() {
        let err = PtsqError::internal("db password is hunter2")
            .with_info(serde_json::json!("secret"))
            .with_cause(Panicked("boom".into()));
        let redacted = err.redacted();
        assert_eq!(redacted.code(), ErrorCode::InternalServerError);
        assert_eq!(redacted.message(), Some("internal server error"));
        assert_eq!(redacted.info(), None);
        assert!(redacted.cause().is_some());
    }
}
