//! The YAML codec, a `serde_yaml`-backed sibling of [`super::json::JsonCodec`]
//! for the `SerializeFormat::Yaml` analyzer output path (§6). Same generic
//! shape, no configurable indent — `serde_yaml` doesn't expose one.

use std::io::{Read, Write};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Codec;
use crate::error::PersistError;

pub struct YamlCodec<T> {
    _marker: PhantomData<T>,
}

impl<T> YamlCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for YamlCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec<T> for YamlCodec<T> {
    fn encode(&self, value: &T, writer: &mut dyn Write) -> Result<(), PersistError> {
        serde_yaml::to_writer(writer, value).map_err(|e| PersistError::encode("yaml", e))
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<T, PersistError> {
        serde_yaml::from_reader(reader).map_err(|e| PersistError::decode("yaml", e))
    }

    fn extension(&self) -> &'static str {
        ".yaml"
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
        let codec = YamlCodec::<Fixture>::new();
        let value = Fixture {
            name: "anomaly".to_string(),
            count: 3,
        };
        let mut buf = Vec::new();
        codec.encode(&value, &mut buf).unwrap();
        let decoded = codec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(value, decoded);
    }
}
