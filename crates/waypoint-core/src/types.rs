use crate::FlowError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Represents a payload travelling with a flow event
///
/// This is a wrapper around a JSON value. The shape of the value is a
/// convention between the view emitting an event and the reducer consuming
/// it; the engine never inspects it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DataPacket {
    /// The inner JSON value
    pub value: serde_json::Value,
}

impl DataPacket {
    /// Create a new data packet from a JSON value
    #[inline]
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Create a null data packet
    #[inline]
    pub fn null() -> Self {
        Self {
            value: serde_json::Value::Null,
        }
    }

    /// Get the inner JSON value
    #[inline]
    pub fn as_value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Take ownership of the inner JSON value
    #[inline]
    pub fn into_value(self) -> serde_json::Value {
        self.value
    }

    /// Check if the data packet is null
    #[inline]
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Look up a top-level field of an object payload
    #[inline]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.value.get(key)
    }

    /// Read a top-level boolean field, `None` when absent or not a boolean
    #[inline]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(serde_json::Value::as_bool)
    }

    /// Read a top-level string field
    #[inline]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }

    /// Try to convert the data packet to a specific type
    pub fn to<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        T::deserialize(&self.value)
    }

    /// Create a data packet from a serializable value
    pub fn from<T>(value: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    /// Create an object data packet with a single key-value pair
    #[inline]
    pub fn singleton(key: &str, value: serde_json::Value) -> Self {
        let mut map = serde_json::Map::new();
        map.insert(key.to_string(), value);
        Self::new(serde_json::Value::Object(map))
    }
}

impl From<serde_json::Value> for DataPacket {
    fn from(value: serde_json::Value) -> Self {
        Self::new(value)
    }
}

/// An event raised by a view (or by a completed sub-flow) and fed to `dispatch`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlowEvent {
    /// Event name matched against transition rules
    pub name: String,

    /// Optional payload, null when the event carries none
    #[serde(default)]
    pub payload: DataPacket,
}

impl FlowEvent {
    /// Create an event without payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: DataPacket::null(),
        }
    }

    /// Create an event carrying a payload
    pub fn with_payload(name: impl Into<String>, payload: impl Into<DataPacket>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Create an event whose payload is the serialized form of `value`
    pub fn from_serializable<T: Serialize>(
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, FlowError> {
        Ok(Self {
            name: name.into(),
            payload: DataPacket::from(value)?,
        })
    }

    /// Deserialize the payload into the shape a reducer expects
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, FlowError> {
        self.payload.to().map_err(|e| {
            FlowError::Payload(format!(
                "event '{}' carries an unexpected payload: {}",
                self.name, e
            ))
        })
    }

    /// Whether this event has the given name
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}
