//! Storage abstraction trait and common types.

use std::io::{Read, Seek, Write};

use thiserror::Error;

use crate::error::{NifError, Result};

/// A trait for storage backends holding index files.
///
/// Names are flat file names relative to the backend's root.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open a file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// Get the size of a file in bytes.
    fn file_size(&self, name: &str) -> Result<u64>;

    /// Rename a file, replacing any existing file at `new_name`.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Create a temporary file next to the final files.
    fn create_temp_output(&self, prefix: &str) -> Result<(String, Box<dyn StorageOutput>)> {
        for counter in 0..10_000 {
            let temp_name = format!("{prefix}_{counter}.tmp");
            if !self.file_exists(&temp_name) {
                let output = self.create_output(&temp_name)?;
                return Ok((temp_name, output));
            }
        }
        Err(StorageError::Io("could not create temporary file".to_string()).into())
    }
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Seek + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Get the current position in the output stream.
    fn position(&self) -> Result<u64>;

    /// Close the output stream.
    fn close(&mut self) -> Result<()>;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        self.as_ref().position()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        self.as_ref().size()
    }
}

/// Configuration for storage backends.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Buffer size for I/O operations.
    pub buffer_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            buffer_size: 65536,
        }
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<StorageError> for NifError {
    fn from(err: StorageError) -> Self {
        NifError::storage(err.to_string())
    }
}
