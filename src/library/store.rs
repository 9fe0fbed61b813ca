use anyhow::{Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::Track;

/// Flat track table keyed by track id, stored as one JSON array.
pub struct TrackStore {
    path: PathBuf,
    tracks: BTreeMap<String, Track>,
}

impl TrackStore {
    /// Open the table at `path`; a missing file is an empty table.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tracks = if path.exists() {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read track table {}", path.display()))?;
            let rows: Vec<Track> = serde_json::from_str(&json)
                .with_context(|| format!("Invalid track table {}", path.display()))?;
            Self::index(rows)
        } else {
            BTreeMap::new()
        };

        info!("Opened track table {} ({} tracks)", path.display(), tracks.len());
        Ok(Self { path, tracks })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// Tracks ordered by id.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Bring the table in line with a fresh scan.
    ///
    /// The whole stored set is compared against `scanned`; on any difference
    /// the table is replaced wholesale and written back. Returns whether a
    /// replacement happened.
    pub fn sync(&mut self, scanned: Vec<Track>) -> Result<bool> {
        let scanned = Self::index(scanned);
        if scanned == self.tracks {
            info!("Track table up to date ({} tracks)", self.tracks.len());
            return Ok(false);
        }

        info!(
            "Track table changed: replacing {} tracks with {}",
            self.tracks.len(),
            scanned.len()
        );
        self.tracks = scanned;
        self.save()?;
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        let rows: Vec<&Track> = self.tracks.values().collect();
        let json = serde_json::to_string_pretty(&rows)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write track table {}", self.path.display()))?;
        Ok(())
    }

    fn index(rows: Vec<Track>) -> BTreeMap<String, Track> {
        rows.into_iter().map(|track| (track.id.clone(), track)).collect()
    }
}
