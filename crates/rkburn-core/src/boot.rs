//! Boot-image staging for the download operation
//!
//! A boot image arrives either as a path or as raw bytes. Raw bytes are
//! parked in a fixed-name file in the system temp directory so the download
//! path always works from a file, and the staged copy is removed once the
//! operation finishes. The fixed name means concurrent downloads must not be
//! attempted; the single-session model already rules them out.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the ephemeral staging file inside the system temp directory
pub const STAGING_FILE_NAME: &str = "rkburn-boot-stage.bin";

/// Source of a boot-stage image
#[derive(Debug, Clone)]
pub enum BootImage {
    /// Image already on disk
    Path(PathBuf),
    /// Raw image bytes supplied by the caller
    Bytes(Vec<u8>),
}

/// A boot image pinned to a readable path for the duration of a download
///
/// When the source was raw bytes, the staged file is ephemeral and removed
/// on drop, on every exit path.
pub(crate) struct StagedImage {
    path: PathBuf,
    ephemeral: bool,
}

impl StagedImage {
    /// Stage `image` so it is available at a readable path
    pub(crate) fn stage(image: &BootImage) -> Result<StagedImage> {
        match image {
            BootImage::Path(path) => Ok(StagedImage {
                path: path.clone(),
                ephemeral: false,
            }),
            BootImage::Bytes(bytes) => {
                let path = std::env::temp_dir().join(STAGING_FILE_NAME);
                if bytes.is_empty() {
                    return Err(Error::EmptyImage(path));
                }
                fs::write(&path, bytes).map_err(Error::Staging)?;
                log::debug!("staged {} image bytes at {}", bytes.len(), path.display());
                Ok(StagedImage {
                    path,
                    ephemeral: true,
                })
            }
        }
    }

    /// Path the image is readable at
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read the image back, rejecting missing and zero-byte files before
    /// any device I/O can happen
    pub(crate) fn read(&self) -> Result<Vec<u8>> {
        let metadata = fs::metadata(&self.path).map_err(|source| Error::ImageUnreadable {
            path: self.path.clone(),
            source,
        })?;
        if metadata.len() == 0 {
            return Err(Error::EmptyImage(self.path.clone()));
        }
        fs::read(&self.path).map_err(|source| Error::ImageUnreadable {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        if self.ephemeral {
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("could not remove staged image {}: {}", self.path.display(), e);
            }
        }
    }
}
