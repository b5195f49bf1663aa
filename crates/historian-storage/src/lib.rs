//! # historian-storage
//!
//! The checkpoint/persistence substrate (§4.8): a [`codec::Codec`]
//! abstraction over JSON and the binary CFB1 report format, a
//! [`Persister`] that binds a basename to a codec for atomic
//! create-or-truncate writes, the [`metadata::Metadata`] /
//! [`metadata::StreamingState`] envelope persisted alongside individual
//! analyzer checkpoints, a YAML codec sibling for the `SerializeFormat::Yaml`
//! output path, and a delta-encode + LZ4 codec for large `uint32` sequences
//! (e.g. `commitsByTick` runs).

pub mod codec;
pub mod error;
pub mod metadata;
pub mod persister;
pub mod report_io;
pub mod sequence;

pub use codec::{BinaryReportCodec, Codec, JsonCodec, YamlCodec};
pub use error::PersistError;
pub use metadata::{Metadata, StreamingState, METADATA_VERSION};
pub use persister::Persister;
pub use report_io::write_report;
pub use sequence::{decode_sequence, delta_decode, delta_encode, encode_sequence};
