//! Packing and encoding of ring artifacts.
//!
//! Ring state travels through the shared store as text: the whole workspace
//! is bundled into a deterministic tar.gz archive and base64-encoded
//! ([`pack`] / [`unpack`]), while the three compiled ring files are
//! additionally stored as individually addressable base64 entries
//! ([`encode_file`] / [`decode_file`]). [`FileSet`] is the in-memory shape
//! both directions share.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

use ringsync_types::BACKUP_DIR;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid base64 payload")]
    Base64(#[from] base64::DecodeError),

    #[error("gzip stream")]
    Gzip(#[source] std::io::Error),

    #[error("tar archive")]
    Archive(#[source] std::io::Error),

    #[error("archive entry path is not valid utf-8: {0}")]
    Path(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// FileSet
// ---------------------------------------------------------------------------

/// An ordered set of relative paths with their contents.
///
/// Paths use `/` separators regardless of platform; ordering is
/// lexicographic so that packing the same set twice yields byte-identical
/// archives.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FileSet {
    files: BTreeMap<String, Bytes>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn insert_file(&mut self, path: impl Into<String>, content: impl Into<Bytes>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&Bytes> {
        self.files.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c))
    }

    /// Write every file under `dir`, creating parent directories as needed.
    pub async fn write_to(&self, dir: &Path) -> Result<(), CodecError> {
        for (path, content) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
        }
        Ok(())
    }

    /// Collect the ring artifacts out of a workspace directory: top-level
    /// `*.builder` and `*.ring.gz` files plus everything directly under
    /// `backups/`. Other files are left alone.
    pub async fn read_dir_artifacts(dir: &Path) -> Result<FileSet, CodecError> {
        let mut files = FileSet::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let kind = entry.file_type().await?;
            if kind.is_file() && (name.ends_with(".builder") || name.ends_with(".ring.gz")) {
                let content = tokio::fs::read(entry.path()).await?;
                files.insert_file(name, content);
            } else if kind.is_dir() && name == BACKUP_DIR {
                let mut backups = tokio::fs::read_dir(entry.path()).await?;
                while let Some(backup) = backups.next_entry().await? {
                    if !backup.file_type().await?.is_file() {
                        continue;
                    }
                    let backup_name = backup.file_name();
                    let Some(backup_name) = backup_name.to_str() else {
                        continue;
                    };
                    let content = tokio::fs::read(backup.path()).await?;
                    files.insert_file(format!("{BACKUP_DIR}/{backup_name}"), content);
                }
            }
        }
        Ok(files)
    }
}

impl FromIterator<(String, Bytes)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (String, Bytes)>>(iter: I) -> Self {
        FileSet {
            files: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle packing
// ---------------------------------------------------------------------------

/// Pack a file set into a base64-encoded tar.gz bundle.
///
/// The archive is deterministic: entries are written in path order with
/// fixed mode, mtime and ownership, and the gzip header carries no
/// timestamp. Packing the same set twice yields the same string.
pub fn pack(files: &FileSet) -> Result<String, CodecError> {
    let mut archive = tar::Builder::new(Vec::new());
    let mut total = 0usize;
    for (path, content) in &files.files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        archive
            .append_data(&mut header, path, content.as_ref())
            .map_err(CodecError::Archive)?;
        total += content.len();
    }
    let tar_bytes = archive.into_inner().map_err(CodecError::Archive)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).map_err(CodecError::Gzip)?;
    let compressed = encoder.finish().map_err(CodecError::Gzip)?;

    debug!(files = files.len(), bytes = total, "packed ring bundle");
    Ok(STANDARD.encode(compressed))
}

/// Unpack a base64-encoded tar.gz bundle.
///
/// `None`, empty and whitespace-only input all yield an empty set: a store
/// record that has never carried a bundle is valid fresh state, not an
/// error. Corrupt payloads are reported as [`CodecError`]s.
pub fn unpack(encoded: Option<&str>) -> Result<FileSet, CodecError> {
    let Some(encoded) = encoded else {
        return Ok(FileSet::new());
    };
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(FileSet::new());
    }

    let compressed = STANDARD.decode(encoded)?;
    let mut tar_bytes = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut tar_bytes)
        .map_err(CodecError::Gzip)?;

    let mut archive = tar::Archive::new(tar_bytes.as_slice());
    let mut files = FileSet::new();
    for entry in archive.entries().map_err(CodecError::Archive)? {
        let mut entry = entry.map_err(CodecError::Archive)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(CodecError::Archive)?;
        let path = match path.to_str() {
            Some(p) => p.to_string(),
            None => return Err(CodecError::Path(path.display().to_string())),
        };
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content).map_err(CodecError::Archive)?;
        files.insert_file(path, content);
    }

    debug!(files = files.len(), "unpacked ring bundle");
    Ok(files)
}

// ---------------------------------------------------------------------------
// Single-file encoding
// ---------------------------------------------------------------------------

/// Base64-encode a single artifact for its standalone store entry.
pub fn encode_file(content: &[u8]) -> String {
    STANDARD.encode(content)
}

/// Decode a single base64 store entry.
pub fn decode_file(encoded: &str) -> Result<Bytes, CodecError> {
    Ok(Bytes::from(STANDARD.decode(encoded.trim())?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
