use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// One row of the track table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Stable identifier derived from `path`
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub path: PathBuf,
    /// Cover image next to the file, if any
    pub artwork: Option<PathBuf>,
    /// Last modification, seconds since the Unix epoch
    pub modified: u64,
}

/// FNV-1a hash of the path bytes as 16 hex digits.
///
/// Stays the same across runs and toolchains, unlike `DefaultHasher`.
pub fn track_id(path: &Path) -> String {
    let hash = path
        .to_string_lossy()
        .bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(FNV_PRIME));
    format!("{:016x}", hash)
}
