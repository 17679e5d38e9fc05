//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod last_modified;

use std::path::Path;
use yana_db::FileDbImage;
use yana_storage::FileBackend;

/// Loads the FileDB image stored at `path`.
pub(crate) fn load_image(path: &Path) -> Result<FileDbImage, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No FileDB image found at {:?}", path).into());
    }
    let backend = FileBackend::open(path)?;
    Ok(FileDbImage::load(&backend)?)
}
