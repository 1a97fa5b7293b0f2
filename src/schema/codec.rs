use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Converts a value between its wire form and the form resolvers work with.
///
/// `decode` runs on arguments after the wire shape has been validated, `encode` runs on outputs before the wire shape is validated.
pub trait Codec: Send + Sync + 'static {
    /// Part of the schema fingerprint, so two codecs with the same name must behave the same.
    fn name(&self) -> &str;

    fn decode(&self, wire: Value) -> Result<Value, CodecError>;

    fn encode(&self, internal: Value) -> Result<Value, CodecError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CodecError(String);

impl CodecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// RFC 3339 timestamps. Any offset is accepted on decode and normalised to UTC so resolvers can deserialize into `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl DateCodec {
    fn parse(value: &Value) -> Result<DateTime<Utc>, CodecError> {
        let s = value
            .as_str()
            .ok_or_else(|| CodecError::new("expected an RFC 3339 date string"))?;
        DateTime::parse_from_rfc3339(s)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|err| CodecError::new(format!("invalid date '{s}': {err}")))
    }
}

impl Codec for DateCodec {
    fn name(&self) -> &str {
        "date"
    }

    fn decode(&self, wire: Value) -> Result<Value, CodecError> {
        Self::parse(&wire).map(|date| date.to_rfc3339_opts(SecondsFormat::AutoSi, true).into())
    }

    fn encode(&self, internal: Value) -> Result<Value, CodecError> {
        Self::parse(&internal).map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true).into())
    }
}

/// A [`Codec`] built from a pair of closures.
pub struct FnCodec<D, E> {
    name: String,
    decode: D,
    encode: E,
}

impl<D, E> FnCodec<D, E>
where
    D: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
    E: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, decode: D, encode: E) -> Self {
        Self {
            name: name.into(),
            decode,
            encode,
        }
    }
}

impl<D, E> fmt::Debug for FnCodec<D, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec").field("name", &self.name).finish()
    }
}

impl<D, E> Codec for FnCodec<D, E>
where
    D: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
    E: Fn(Value) -> Result<Value, CodecError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, wire: Value) -> Result<Value, CodecError> {
        (self.decode)(wire)
    }

    fn encode(&self, internal: Value) -> Result<Value, CodecError> {
        (self.encode)(internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn date_normalises_to_utc() {
        assert_eq!(
            DateCodec.decode(json!("2024-03-01T10:00:00+02:00")),
            Ok(json!("2024-03-01T08:00:00Z"))
        );
        assert!(DateCodec.decode(json!("yesterday")).is_err());
        assert!(DateCodec.decode(json!(1234)).is_err());
    }

    #[test]
    fn date_encodes_with_millis() {
        assert_eq!(
            DateCodec.encode(json!("2024-03-01T08:00:00Z")),
            Ok(json!("2024-03-01T08:00:00.000Z"))
        );
    }

    #[test]
    fn fn_codec() {
        let codec = FnCodec::new(
            "cents",
            |wire: Value| {
                wire.as_f64()
                    .map(|v| json!((v * 100.0).round() as i64))
                    .ok_or_else(|| CodecError::new("expected a number"))
            },
            |internal: Value| {
                internal
                    .as_i64()
                    .map(|v| json!(v as f64 / 100.0))
                    .ok_or_else(|| CodecError::new("expected an integer"))
            },
        );

        assert_eq!(codec.name(), "cents");
        assert_eq!(codec.decode(json!(1.25)), Ok(json!(125)));
        assert_eq!(codec.encode(json!(125)), Ok(json!(1.25)));
        assert_eq!(
            codec.encode(json!("x")),
            Err(CodecError::new("expected an integer"))
        );
    }
}
