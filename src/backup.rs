//! Bundle backups.
//!
//! The original is copied aside and fingerprinted before any work starts.
//! When the run ends the fingerprint is re-checked; a changed original is
//! restored from the copy byte for byte.

use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{MinifyError, Result};

pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// `bundle.js` → `bundle.js.bak`
pub fn backup_path(original: &Path, suffix: &str) -> PathBuf {
    let mut name = original.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// `bundle.js` → `bundle.js.<random>.bak`, created exclusively.
fn unique_copy(original: &Path, suffix: &str, bytes: &[u8]) -> Result<PathBuf> {
    let dir = match original.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = format!(
        "{}.",
        original.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
    );
    let mut file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| MinifyError::io(dir, e))?;
    file.write_all(bytes).map_err(|e| MinifyError::io(file.path(), e))?;
    let (_, path) = file.keep().map_err(|e| MinifyError::io(original, e.error))?;
    Ok(path)
}

#[derive(Debug)]
pub struct Backup {
    original: PathBuf,
    copy: PathBuf,
    fingerprint: String,
}

impl Backup {
    pub fn create(original: &Path, suffix: &str) -> Result<Self> {
        let bytes = fs::read(original).map_err(|e| MinifyError::io(original, e))?;
        let preferred = backup_path(original, suffix);
        let copy = match OpenOptions::new().write(true).create_new(true).open(&preferred) {
            Ok(mut file) => {
                file.write_all(&bytes).map_err(|e| MinifyError::io(&preferred, e))?;
                preferred
            }
            // An existing copy belongs to someone else; never clobber it.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let copy = unique_copy(original, suffix, &bytes)?;
                tracing::warn!(
                    existing = %preferred.display(),
                    copy = %copy.display(),
                    "backup path taken, using a unique name"
                );
                copy
            }
            Err(e) => return Err(MinifyError::io(&preferred, e)),
        };
        Ok(Self {
            original: original.to_path_buf(),
            copy,
            fingerprint: compute_hash(&bytes),
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn copy_path(&self) -> &Path {
        &self.copy
    }

    /// True when the original on disk still matches its fingerprint.
    pub fn verify(&self) -> bool {
        match fs::read(&self.original) {
            Ok(bytes) => compute_hash(&bytes) == self.fingerprint,
            Err(_) => false,
        }
    }

    /// Put the original back exactly as it was.
    pub fn restore(&self) -> Result<()> {
        let bytes = fs::read(&self.copy).map_err(|e| MinifyError::io(&self.copy, e))?;
        fs::write(&self.original, bytes).map_err(|e| MinifyError::io(&self.original, e))
    }

    /// Re-check the original, restoring it if needed, then drop the copy
    /// unless `keep` is set. Only the copy this backup created is removed.
    /// Returns whether a restore happened.
    pub fn settle(self, keep: bool) -> Result<bool> {
        let restored = if self.verify() {
            false
        } else {
            tracing::warn!(path = %self.original.display(), "original changed during run, restoring backup");
            self.restore()?;
            true
        };
        if !keep {
            fs::remove_file(&self.copy).map_err(|e| MinifyError::io(&self.copy, e))?;
        }
        Ok(restored)
    }
}
