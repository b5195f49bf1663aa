//! `Codec` abstracts encode/decode over a writer/reader pair and reports
//! the file extension it writes (§4.8, §6).

pub mod binary;
pub mod json;
pub mod yaml;

pub use binary::BinaryReportCodec;
pub use json::JsonCodec;
pub use yaml::YamlCodec;

use std::io::{Read, Write};

use crate::error::PersistError;

pub trait Codec<T> {
    fn encode(&self, value: &T, writer: &mut dyn Write) -> Result<(), PersistError>;
    fn decode(&self, reader: &mut dyn Read) -> Result<T, PersistError>;
    /// Including the leading dot, e.g. `.json`.
    fn extension(&self) -> &'static str;
}
