//! In-memory storage implementation for testing.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::storage::traits::{Storage, StorageError, StorageInput, StorageOutput};

type FileMap = Arc<Mutex<HashMap<String, Box<[u8]>>>>;

/// An in-memory storage implementation.
///
/// A file becomes visible to readers once its output is closed or dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: FileMap,
}

impl MemoryStorage {
    /// Create a new, empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of files stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Copy of a stored file's bytes.
    pub fn read_all(&self, name: &str) -> Option<Vec<u8>> {
        self.files.lock().get(name).map(|data| data.to_vec())
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let files = self.files.lock();
        let data = files
            .get(name)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;
        Ok(Box::new(MemoryInput::new(data.to_vec())))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            self.files.clone(),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        self.files
            .lock()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut files = self.files.lock();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }
}

/// A memory-based input implementation.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Vec<u8>>,
    size: u64,
}

impl MemoryInput {
    fn new(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        MemoryInput {
            cursor: Cursor::new(data),
            size,
        }
    }
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// A memory-based output implementation.
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    cursor: Cursor<Vec<u8>>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, files: FileMap) -> Self {
        MemoryOutput {
            name,
            cursor: Cursor::new(Vec::new()),
            files,
            closed: false,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.seek(pos)
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.cursor.position())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            let data = std::mem::take(self.cursor.get_mut()).into_boxed_slice();
            self.files.lock().insert(self.name.clone(), data);
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_read_file() {
        let storage = MemoryStorage::new();
        {
            let mut output = storage.create_output("a.nif").unwrap();
            output.write_all(b"NIF\x03").unwrap();
            assert_eq!(output.position().unwrap(), 4);
            output.close().unwrap();
        }

        assert!(storage.file_exists("a.nif"));
        assert_eq!(storage.file_size("a.nif").unwrap(), 4);

        let mut input = storage.open_input("a.nif").unwrap();
        let mut buf = Vec::new();
        input.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"NIF\x03");
        assert_eq!(input.size().unwrap(), 4);
    }

    #[test]
    fn test_file_visible_after_drop() {
        let storage = MemoryStorage::new();
        {
            let mut output = storage.create_output("dropped").unwrap();
            output.write_all(b"xyz").unwrap();
        }
        assert_eq!(storage.read_all("dropped"), Some(b"xyz".to_vec()));
    }

    #[test]
    fn test_temp_output_and_rename() {
        let storage = MemoryStorage::new();
        let (temp_name, mut output) = storage.create_temp_output("puzzle.nif").unwrap();
        output.write_all(b"data").unwrap();
        output.close().unwrap();

        storage.rename_file(&temp_name, "puzzle.nif").unwrap();
        assert!(!storage.file_exists(&temp_name));
        assert_eq!(storage.read_all("puzzle.nif"), Some(b"data".to_vec()));
        assert_eq!(storage.file_count(), 1);
    }

    #[test]
    fn test_file_not_found() {
        let storage = MemoryStorage::new();
        assert!(storage.open_input("missing").is_err());
        assert!(storage.file_size("missing").is_err());
        assert!(storage.rename_file("missing", "other").is_err());
        storage.delete_file("missing").unwrap();
    }
}
