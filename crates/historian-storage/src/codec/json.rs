//! The JSON codec: any checkpoint state or `Report` that derives
//! `Serialize`/`Deserialize` round-trips through it unchanged. Indent is
//! configurable; the default matches the two-space convention the rest
//! of the engine's JSON output uses.

use std::io::{Read, Write};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::Codec;
use crate::error::PersistError;

const DEFAULT_INDENT: &str = "  ";

pub struct JsonCodec<T> {
    indent: String,
    _marker: PhantomData<T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            indent: DEFAULT_INDENT.to_string(),
            _marker: PhantomData,
        }
    }

    pub fn with_indent(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec<T> for JsonCodec<T> {
    fn encode(&self, value: &T, writer: &mut dyn Write) -> Result<(), PersistError> {
        let formatter = PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut ser = Serializer::with_formatter(writer, formatter);
        value
            .serialize(&mut ser)
            .map_err(|e| PersistError::encode("json", e))
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<T, PersistError> {
        serde_json::from_reader(reader).map_err(|e| PersistError::decode("json", e))
    }

    fn extension(&self) -> &'static str {
        ".json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Fixture {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips_through_writer_and_reader() {
        let codec = JsonCodec::<Fixture>::new();
        let value = Fixture {
            name: "anomaly".to_string(),
            count: 3,
        };
        let mut buf = Vec::new();
        codec.encode(&value, &mut buf).unwrap();
        let decoded = codec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn default_indent_is_two_spaces() {
        let codec = JsonCodec::<Fixture>::new();
        let value = Fixture {
            name: "x".to_string(),
            count: 1,
        };
        let mut buf = Vec::new();
        codec.encode(&value, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\n  \"name\""));
    }
}
