use serde_json::{Map, Value};

use crate::error::{ParseError, StoreError};

/// Reserved field carrying the schema version next to the payload body.
pub const VERSION_FIELD: &str = "--version";

/// Typed payload of a versioned store, one variant per schema version.
pub trait SchemaPayload: Sized + Send + 'static {
    /// Schema version this value belongs to.
    fn version(&self) -> u32;

    /// Read a body that was persisted at `version`.
    fn decode(version: u32, body: Value) -> Result<Self, serde_json::Error>;

    /// Body fields to persist, without the version tag.
    fn encode(&self) -> Result<Value, serde_json::Error>;
}

/// Persisted blob split into its version tag and opaque body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub version: u32,
    pub body: Value,
}

impl RawPayload {
    pub fn new(version: u32, body: Value) -> Self {
        Self { version, body }
    }

    pub fn encode<P: SchemaPayload>(
        payload: &P,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(payload.version(), payload.encode()?))
    }

    /// Parse stored bytes. Objects without a tag predate versioning and are
    /// read as version 0.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(ParseError::Json)?;
        let Value::Object(mut fields) = value else {
            return Err(ParseError::NotAnObject);
        };

        let version = match fields.remove(VERSION_FIELD) {
            None => 0,
            Some(tag) => tag
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .ok_or_else(|| ParseError::InvalidVersionTag(tag.to_string()))?,
        };

        Ok(Self::new(version, Value::Object(fields)))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let Value::Object(fields) = &self.body else {
            return Err(StoreError::NotAnObject {
                version: self.version,
            });
        };

        let mut tagged = Map::with_capacity(fields.len() + 1);
        tagged.insert(VERSION_FIELD.to_string(), Value::from(self.version));
        for (name, value) in fields {
            if name != VERSION_FIELD {
                tagged.insert(name.clone(), value.clone());
            }
        }

        Ok(serde_json::to_vec(&Value::Object(tagged))?)
    }

    pub fn decode<P: SchemaPayload>(self) -> Result<P, ParseError> {
        let version = self.version;
        P::decode(version, self.body)
            .map_err(|source| ParseError::Body { version, source })
    }
}
