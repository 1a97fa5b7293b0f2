use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::{ProcedureKind, PtsqError};

/// The result of calling a procedure.
///
/// Serializes as `{ "ok": true, "data": .. }` or `{ "ok": false, "error": .. }`.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok(Value),
    Err(PtsqError),
}

impl Response {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::Ok(data) => Some(data),
            Self::Err(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PtsqError> {
        match self {
            Self::Ok(_) => None,
            Self::Err(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Value, PtsqError> {
        self.into()
    }

    /// Rewrite the error, leaving a success untouched.
    pub fn map_err(self, func: impl FnOnce(PtsqError) -> PtsqError) -> Self {
        match self {
            Self::Err(err) => Self::Err(func(err)),
            ok => ok,
        }
    }
}

impl From<Result<Value, PtsqError>> for Response {
    fn from(result: Result<Value, PtsqError>) -> Self {
        match result {
            Ok(data) => Self::Ok(data),
            Err(err) => Self::Err(err),
        }
    }
}

impl From<Response> for Result<Value, PtsqError> {
    fn from(response: Response) -> Self {
        match response {
            Response::Ok(data) => Ok(data),
            Response::Err(err) => Err(err),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Response", 2)?;
        match self {
            Self::Ok(data) => {
                s.serialize_field("ok", &true)?;
                s.serialize_field("data", data)?;
            }
            Self::Err(err) => {
                s.serialize_field("ok", &false)?;
                s.serialize_field("error", err)?;
            }
        }
        s.end()
    }
}

/// A call as it arrives over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Dot separated route segments, like `user.byId`.
    pub route: String,
    #[serde(rename = "type")]
    pub kind: ProcedureKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl CallRequest {
    pub fn new(route: impl Into<String>, kind: ProcedureKind, input: Value) -> Self {
        Self {
            route: route.into(),
            kind,
            input: Some(input),
        }
    }

    pub fn query(route: impl Into<String>, input: Value) -> Self {
        Self::new(route, ProcedureKind::Query, input)
    }

    pub fn mutation(route: impl Into<String>, input: Value) -> Self {
        Self::new(route, ProcedureKind::Mutation, input)
    }
}

/// What a transport sends back: a status code and a JSON body.
///
/// On success the body is the encoded output itself, otherwise it's [`PtsqError::to_wire`].
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub body: Value,
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        match response {
            Response::Ok(data) => Self {
                status: 200,
                body: data,
            },
            Response::Err(err) => Self {
                status: err.status(),
                body: err.to_wire(),
            },
        }
    }
}
