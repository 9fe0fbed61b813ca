use anyhow::Result;
use log::{debug, info, warn};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

use super::{track_id, Track};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "m4a", "aac"];
const ARTWORK_NAMES: &[&str] = &["cover.jpg", "cover.png", "folder.jpg", "folder.png"];
const UNKNOWN: &str = "Unknown";

/// Tags read from a file; unset fields fall back when the track is built.
#[derive(Debug, Default)]
struct TagInfo {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    duration_ms: u64,
}

impl TagInfo {
    fn apply(&mut self, revision: &MetadataRevision) {
        for tag in revision.tags() {
            let value = tag.value.to_string();
            if value.trim().is_empty() {
                continue;
            }
            match tag.std_key {
                Some(StandardTagKey::TrackTitle) => self.title = Some(value),
                Some(StandardTagKey::Artist) => self.artist = Some(value),
                Some(StandardTagKey::Album) => self.album = Some(value),
                _ => {}
            }
        }
    }
}

/// Walks a directory tree and turns audio files into `Track` rows.
pub struct MediaScanner {
    extensions: Vec<String>,
}

impl MediaScanner {
    pub fn new() -> Self {
        Self {
            extensions: AUDIO_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Scan `root` recursively. Files that fail to probe are skipped with a
    /// warning; the result is sorted by path.
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<Vec<Track>> {
        let root = root.as_ref();
        info!("Scanning {} for audio files", root.display());

        let mut files = Vec::new();
        Self::collect_files(root, &mut files)?;
        files.retain(|path| self.is_audio_file(path));
        files.sort();

        let mut tracks = Vec::with_capacity(files.len());
        for path in files {
            match Self::read_track(&path) {
                Ok(track) => tracks.push(track),
                Err(e) => warn!("Skipping {}: {}", path.display(), e),
            }
        }

        info!("Scan complete: {} tracks", tracks.len());
        Ok(tracks)
    }

    fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::collect_files(&path, files)?;
            } else {
                files.push(path);
            }
        }
        Ok(())
    }

    pub fn read_track(path: &Path) -> Result<Track> {
        let tags = Self::probe(path)?;
        let modified = std::fs::metadata(path)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let title = tags.title.unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| UNKNOWN.to_string())
        });

        debug!("Read {} ({} ms)", path.display(), tags.duration_ms);

        Ok(Track {
            id: track_id(path),
            title,
            artist: tags.artist.unwrap_or_else(|| UNKNOWN.to_string()),
            album: tags.album.unwrap_or_else(|| UNKNOWN.to_string()),
            duration_ms: tags.duration_ms,
            path: path.to_path_buf(),
            artwork: Self::find_artwork(path),
            modified,
        })
    }

    fn probe(path: &Path) -> Result<TagInfo> {
        let file = File::open(path)?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let mut probed = symphonia::default::get_probe().format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;

        let mut tags = TagInfo::default();
        if let Some(metadata) = probed.metadata.get() {
            if let Some(revision) = metadata.current() {
                tags.apply(revision);
            }
        }
        {
            let metadata = probed.format.metadata();
            if let Some(revision) = metadata.current() {
                tags.apply(revision);
            }
        }

        tags.duration_ms = probed
            .format
            .default_track()
            .and_then(|track| {
                let frames = track.codec_params.n_frames?;
                let rate = track.codec_params.sample_rate?;
                (rate > 0).then(|| frames * 1000 / rate as u64)
            })
            .unwrap_or(0);

        Ok(tags)
    }

    fn find_artwork(path: &Path) -> Option<PathBuf> {
        let dir = path.parent()?;
        ARTWORK_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for MediaScanner {
    fn default() -> Self {
        Self::new()
    }
}
