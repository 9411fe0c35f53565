//! Writing converted Markdown to disk.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::ResultRecord;

const MAX_STEM_CHARS: usize = 80;
const WINDOWS_RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path} is unusable: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("output path {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// `{sanitized_title}--{first 8 hex chars of sha256(url)}.md`.
///
/// The same title and URL always give the same name, and the name is valid on
/// Windows as well as Unix file systems.
pub fn deterministic_filename(title: Option<&str>, url: &str) -> String {
    format!("{}--{}.md", sanitize_stem(title.unwrap_or_default()), url_hash(url))
}

fn sanitize_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    for c in title.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' && stem.ends_with('_') {
            continue;
        }
        stem.push(c);
    }

    let mut stem: String = stem
        .trim_matches(['_', ' ', '.'])
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    if stem.is_empty() {
        stem.push_str("untitled");
    }
    if WINDOWS_RESERVED.iter().any(|name| name.eq_ignore_ascii_case(&stem)) {
        stem.push('_');
    }
    stem
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control()
}

fn url_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    digest.iter().take(4).fold(String::with_capacity(8), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    })
}

/// Writes files into one directory via temp file + rename, so readers never
/// observe a half-written document.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    /// Creates `dir` if needed and checks that it can hold new files.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        ensure_output_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|err| PersistError::Io(err.error))?;
        Ok(target)
    }

    /// Stores the record's Markdown under its deterministic filename.
    pub fn write_record(&self, record: &ResultRecord) -> Result<PathBuf, PersistError> {
        let filename = deterministic_filename(record.title.as_deref(), &record.url);
        let path = self.write(&filename, &record.markdown)?;
        engine_info!("Wrote {} ({} chars)", path.display(), record.content_length);
        Ok(path)
    }
}

fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let unusable = |source| PersistError::OutputDir {
        path: dir.to_path_buf(),
        source,
    };
    if dir.exists() {
        if !fs::metadata(dir).map_err(unusable)?.is_dir() {
            return Err(PersistError::NotADirectory(dir.to_path_buf()));
        }
    } else {
        fs::create_dir_all(dir).map_err(unusable)?;
    }
    NamedTempFile::new_in(dir).map_err(unusable)?;
    Ok(())
}
