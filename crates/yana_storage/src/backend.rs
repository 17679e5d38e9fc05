//! Storage backend trait definition.

use crate::error::StorageResult;

/// A blob store holding one opaque state file.
///
/// # Invariants
///
/// - `load` returns exactly the bytes of the last successful `replace`
///   (or an empty vector if nothing was ever stored)
/// - `replace` is atomic: on error the previous blob is still intact
/// - `clear` is equivalent to `replace(&[])`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Reads the whole blob.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn load(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the whole blob with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be written. The previously
    /// stored blob is left untouched in that case.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Returns the size of the stored blob in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Removes all stored data.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be emptied.
    fn clear(&mut self) -> StorageResult<()> {
        self.replace(&[])
    }

    /// Returns a short description of where the blob lives, for logging.
    fn location(&self) -> String;
}
