//! Persisted alongside individual checkpoints: [`StreamingState`] tracks
//! run progress, [`Metadata`] is the envelope written once per resume
//! directory (§6 persisted-state layout, `metadata.json` /
//! `streaming_state.json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingState {
    pub total_commits: u64,
    pub processed_commits: u64,
    pub current_chunk: u64,
    pub total_chunks: u64,
    /// Hex-encoded, to stay a plain JSON string across the wire.
    pub last_commit_hash: String,
    pub last_tick: u32,
}

impl StreamingState {
    pub fn is_complete(&self) -> bool {
        self.processed_commits >= self.total_commits
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: u32,
    pub repo_path: String,
    pub repo_hash: String,
    pub analyzers: Vec<String>,
    pub streaming_state: StreamingState,
    /// basename -> crc32/checksum of that analyzer's checkpoint file, used
    /// to detect a corrupted or stale checkpoint on resume before any
    /// analyzer attempts to decode it.
    pub checksums: BTreeMap<String, String>,
    /// RFC 3339 timestamp; produced by the caller since this crate never
    /// reads the wall clock itself (kept deterministic for tests).
    pub created_at: String,
}

pub const METADATA_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_state_reports_completion() {
        let mut state = StreamingState {
            total_commits: 10,
            processed_commits: 9,
            ..Default::default()
        };
        assert!(!state.is_complete());
        state.processed_commits = 10;
        assert!(state.is_complete());
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let metadata = Metadata {
            version: METADATA_VERSION,
            repo_path: "/repos/example".to_string(),
            repo_hash: "deadbeef".to_string(),
            analyzers: vec!["anomaly".to_string(), "couples".to_string()],
            streaming_state: StreamingState {
                total_commits: 100,
                processed_commits: 40,
                current_chunk: 4,
                total_chunks: 10,
                last_commit_hash: "abc123".to_string(),
                last_tick: 12,
            },
            checksums: BTreeMap::from([("anomaly".to_string(), "1234".to_string())]),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&metadata).unwrap();
        let decoded: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(metadata, decoded);
    }
}
