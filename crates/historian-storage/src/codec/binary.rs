//! The binary report format (CFB1, §6): `magic 'C','F','B','1'` + `u32
//! version` + a length-prefixed, self-describing tagged payload + a
//! trailing `u32` IEEE crc32 of the payload. Grounded in the
//! magic-bytes-plus-version-plus-checksum framing idiom the corpus uses
//! for other on-disk container formats (see `CHECKPOINT_MAGIC` /
//! `CheckpointWithIntegrity` in the checkpointing crate this workspace
//! draws its persistence idiom from).
//!
//! Unlike [`super::json::JsonCodec`], this codec is not generic: the
//! eight-variant tagged tree below mirrors `ReportValue` exactly (bool,
//! int, float, str, bytes, seq, a numeric map, and a nested record), so
//! it only encodes `Report`. Analyzer checkpoint state persists through
//! the JSON codec instead (§9 Open Question resolution, recorded in
//! DESIGN.md).

use std::collections::BTreeMap;
use std::io::{Read, Write};

use historian_core::types::{Report, ReportValue};

use super::Codec;
use crate::error::PersistError;

const MAGIC: &[u8; 4] = b"CFB1";
const VERSION: u32 = 1;

const TAG_BOOL: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_STR: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_SEQ: u8 = 5;
const TAG_NUM_MAP: u8 = 6;
const TAG_RECORD: u8 = 7;

#[derive(Default)]
pub struct BinaryReportCodec;

impl BinaryReportCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec<Report> for BinaryReportCodec {
    fn encode(&self, value: &Report, writer: &mut dyn Write) -> Result<(), PersistError> {
        let mut payload = Vec::new();
        write_record(&value.fields, &mut payload);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(payload.len() as u32).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
        Ok(())
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Report, PersistError> {
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(PersistError::corrupt("binary", "bad magic bytes"));
        }
        let version = u32::from_le_bytes(header[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(PersistError::corrupt(
                "binary",
                format!("unsupported version {version}"),
            ));
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let payload_len = u32::from_le_bytes(len_bytes) as usize;

        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        let mut crc_bytes = [0u8; 4];
        reader.read_exact(&mut crc_bytes)?;
        let expected_crc = u32::from_le_bytes(crc_bytes);
        let actual_crc = crc32fast::hash(&payload);
        if expected_crc != actual_crc {
            return Err(PersistError::corrupt(
                "binary",
                format!("crc32 mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"),
            ));
        }

        let mut cursor = Cursor { bytes: &payload, pos: 0 };
        let fields = read_record(&mut cursor)
            .map_err(|e| PersistError::decode("binary", e))?;
        Ok(Report { fields })
    }

    fn extension(&self) -> &'static str {
        ".bin"
    }
}

fn write_value(value: &ReportValue, out: &mut Vec<u8>) {
    match value {
        ReportValue::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(*b as u8);
        }
        ReportValue::Int(i) => {
            out.push(TAG_INT);
            out.extend_from_slice(&i.to_le_bytes());
        }
        ReportValue::Float(f) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_le_bytes());
        }
        ReportValue::Str(s) => {
            out.push(TAG_STR);
            write_str(s, out);
        }
        ReportValue::Bytes(b) => {
            out.push(TAG_BYTES);
            out.extend_from_slice(&(b.len() as u32).to_le_bytes());
            out.extend_from_slice(b);
        }
        ReportValue::Seq(items) => {
            out.push(TAG_SEQ);
            out.extend_from_slice(&(items.len() as u32).to_le_bytes());
            for item in items {
                write_value(item, out);
            }
        }
        ReportValue::NumMap(map) => {
            out.push(TAG_NUM_MAP);
            out.extend_from_slice(&(map.len() as u32).to_le_bytes());
            for (k, v) in map {
                write_str(k, out);
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        ReportValue::Record(fields) => {
            out.push(TAG_RECORD);
            write_record(fields, out);
        }
    }
}

fn write_record(fields: &BTreeMap<String, ReportValue>, out: &mut Vec<u8>) {
    out.extend_from_slice(&(fields.len() as u32).to_le_bytes());
    for (k, v) in fields {
        write_str(k, out);
        write_value(v, out);
    }
}

fn write_str(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        if self.pos + n > self.bytes.len() {
            return Err("truncated payload".to_string());
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, String> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn i64(&mut self) -> Result<i64, String> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, String> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn string(&mut self) -> Result<String, String> {
        let len = self.u32()? as usize;
        String::from_utf8(self.take(len)?.to_vec()).map_err(|e| e.to_string())
    }
}

fn read_value(cursor: &mut Cursor) -> Result<ReportValue, String> {
    match cursor.u8()? {
        TAG_BOOL => Ok(ReportValue::Bool(cursor.u8()? != 0)),
        TAG_INT => Ok(ReportValue::Int(cursor.i64()?)),
        TAG_FLOAT => Ok(ReportValue::Float(cursor.f64()?)),
        TAG_STR => Ok(ReportValue::Str(cursor.string()?)),
        TAG_BYTES => {
            let len = cursor.u32()? as usize;
            Ok(ReportValue::Bytes(cursor.take(len)?.to_vec()))
        }
        TAG_SEQ => {
            let count = cursor.u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(read_value(cursor)?);
            }
            Ok(ReportValue::Seq(items))
        }
        TAG_NUM_MAP => {
            let count = cursor.u32()?;
            let mut map = BTreeMap::new();
            for _ in 0..count {
                let key = cursor.string()?;
                map.insert(key, cursor.f64()?);
            }
            Ok(ReportValue::NumMap(map))
        }
        TAG_RECORD => Ok(ReportValue::Record(read_record(cursor)?)),
        other => Err(format!("unknown tag byte {other}")),
    }
}

fn read_record(cursor: &mut Cursor) -> Result<BTreeMap<String, ReportValue>, String> {
    let count = cursor.u32()?;
    let mut fields = BTreeMap::new();
    for _ in 0..count {
        let key = cursor.string()?;
        fields.insert(key, read_value(cursor)?);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        let mut report = Report::new();
        report.set("threshold", 2.0);
        report.set("window", 20i64);
        report.set("label", "anomaly".to_string());
        report.set(
            "files",
            ReportValue::Seq(vec![ReportValue::Str("a.rs".to_string())]),
        );
        let mut nested = BTreeMap::new();
        nested.insert("tick".to_string(), ReportValue::Int(10));
        report.fields.insert("record".to_string(), ReportValue::Record(nested));
        let mut num_map = BTreeMap::new();
        num_map.insert("rust".to_string(), 3.0);
        report.fields.insert("languages".to_string(), ReportValue::NumMap(num_map));
        report.set("bytes", ReportValue::Bytes(vec![1, 2, 3]));
        report
    }

    #[test]
    fn round_trips_every_variant() {
        let codec = BinaryReportCodec::new();
        let report = sample_report();
        let mut buf = Vec::new();
        codec.encode(&report, &mut buf).unwrap();
        let decoded = codec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(report.fields, decoded.fields);
    }

    #[test]
    fn flips_a_payload_byte_and_detects_corruption() {
        let codec = BinaryReportCodec::new();
        let report = sample_report();
        let mut buf = Vec::new();
        codec.encode(&report, &mut buf).unwrap();
        let flip_at = buf.len() - 6;
        buf[flip_at] ^= 0xFF;
        let result = codec.decode(&mut buf.as_slice());
        assert!(result.is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let codec = BinaryReportCodec::new();
        let mut buf = vec![b'X', b'X', b'X', b'X', 1, 0, 0, 0, 0, 0, 0, 0];
        let result = codec.decode(&mut buf.as_slice());
        assert!(result.is_err());
        buf.clear();
    }
}
