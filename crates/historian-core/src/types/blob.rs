//! `CachedBlob` — content-addressed, line-counted blob content.

use serde::{Deserialize, Serialize};

/// Blob content, or a marker that the blob was classified as binary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BlobContent {
    Text(Vec<u8>),
    Binary,
}

/// A blob held by `BlobCache`, shared by every change entry that references
/// its hash and released when the owning commit window leaves scope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedBlob {
    pub hash: [u8; 20],
    pub content: BlobContent,
    /// Cached line count; `0` for binary blobs.
    pub line_count: u32,
}

impl CachedBlob {
    pub fn text(hash: [u8; 20], bytes: Vec<u8>) -> Self {
        let line_count = count_lines(&bytes);
        Self {
            hash,
            content: BlobContent::Text(bytes),
            line_count,
        }
    }

    pub fn binary(hash: [u8; 20]) -> Self {
        Self {
            hash,
            content: BlobContent::Binary,
            line_count: 0,
        }
    }

    pub fn empty(hash: [u8; 20]) -> Self {
        Self::text(hash, Vec::new())
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.content, BlobContent::Binary)
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.content {
            BlobContent::Text(b) => b,
            BlobContent::Binary => &[],
        }
    }
}

fn count_lines(bytes: &[u8]) -> u32 {
    if bytes.is_empty() {
        return 0;
    }
    let mut count = bytes.iter().filter(|&&b| b == b'\n').count();
    if bytes.last() != Some(&b'\n') {
        count += 1;
    }
    count as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_without_trailing_newline() {
        let blob = CachedBlob::text([0; 20], b"a\nb\nc".to_vec());
        assert_eq!(blob.line_count, 3);
    }

    #[test]
    fn counts_lines_with_trailing_newline() {
        let blob = CachedBlob::text([0; 20], b"a\nb\nc\n".to_vec());
        assert_eq!(blob.line_count, 3);
    }

    #[test]
    fn empty_blob_has_zero_lines() {
        let blob = CachedBlob::text([0; 20], Vec::new());
        assert_eq!(blob.line_count, 0);
    }
}
