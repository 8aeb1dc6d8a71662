//! File-based storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{NifError, Result};
use crate::storage::traits::{Storage, StorageConfig, StorageError, StorageInput, StorageOutput};

/// A file-based storage implementation rooted at one directory.
#[derive(Debug)]
pub struct FileStorage {
    /// The root directory for storage.
    directory: PathBuf,
    /// Storage configuration.
    config: StorageConfig,
}

impl FileStorage {
    /// Create a new file storage in the given directory.
    pub fn new<P: AsRef<Path>>(directory: P, config: StorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory)
                .map_err(|e| NifError::storage(format!("Failed to create directory: {e}")))?;
        }

        if !directory.is_dir() {
            return Err(NifError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage { directory, config })
    }

    /// Storage for the directory holding `path`, plus the file name within it.
    pub fn for_file<P: AsRef<Path>>(path: P, config: StorageConfig) -> Result<(Self, String)> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                NifError::invalid_argument(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((FileStorage::new(directory, config)?, name))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Get the full path for a file name.
    fn file_path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

fn map_open_error(name: &str, e: std::io::Error) -> StorageError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::FileNotFound(name.to_string())
    } else {
        StorageError::Io(e.to_string())
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let file = File::open(self.file_path(name)).map_err(|e| map_open_error(name, e))?;
        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.file_path(name))
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Box::new(FileOutput::new(file, self.config.buffer_size)))
    }

    fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| StorageError::Io(format!("Failed to delete file: {e}")))?;
        }
        Ok(())
    }

    fn file_size(&self, name: &str) -> Result<u64> {
        let metadata = self
            .file_path(name)
            .metadata()
            .map_err(|e| map_open_error(name, e))?;
        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        std::fs::rename(self.file_path(old_name), self.file_path(new_name))
            .map_err(|e| StorageError::Io(format!("Failed to rename file: {e}")))?;
        Ok(())
    }
}

/// A file input implementation.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let size = file
            .metadata()
            .map_err(|e| NifError::storage(format!("Failed to get file metadata: {e}")))?
            .len();
        let reader = BufReader::with_capacity(buffer_size, file);
        Ok(FileInput { reader, size })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for FileInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }
}

/// A file output implementation.
#[derive(Debug)]
pub struct FileOutput {
    writer: BufWriter<File>,
    position: u64,
}

impl FileOutput {
    fn new(file: File, buffer_size: usize) -> Self {
        FileOutput {
            writer: BufWriter::with_capacity(buffer_size, file),
            position: 0,
        }
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let bytes_written = self.writer.write(buf)?;
        self.position += bytes_written as u64;
        Ok(bytes_written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Seek for FileOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let new_pos = self.writer.seek(pos)?;
        self.position = new_pos;
        Ok(new_pos)
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| NifError::storage(format!("Failed to flush: {e}")))?;
        self.writer
            .get_ref()
            .sync_all()
            .map_err(|e| NifError::storage(format!("Failed to sync: {e}")))?;
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn close(&mut self) -> Result<()> {
        self.flush_and_sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_storage_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path(), StorageConfig::default()).unwrap();

        let mut output = storage.create_output("index.nif").unwrap();
        output.write_all(b"NIF").unwrap();
        assert_eq!(output.position().unwrap(), 3);
        output.close().unwrap();

        assert!(storage.file_exists("index.nif"));
        assert_eq!(storage.file_size("index.nif").unwrap(), 3);

        let mut input = storage.open_input("index.nif").unwrap();
        let mut buf = String::new();
        input.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "NIF");
    }

    #[test]
    fn test_for_file_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Output").join("puzzle.nif");

        let (storage, name) = FileStorage::for_file(&path, StorageConfig::default()).unwrap();
        assert_eq!(name, "puzzle.nif");
        assert!(storage.directory().is_dir());
    }

    #[test]
    fn test_rename_replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path(), StorageConfig::default()).unwrap();

        let mut old = storage.create_output("puzzle.nif").unwrap();
        old.write_all(b"old").unwrap();
        old.close().unwrap();

        let (temp_name, mut output) = storage.create_temp_output("puzzle.nif").unwrap();
        output.write_all(b"new!").unwrap();
        output.close().unwrap();
        drop(output);

        storage.rename_file(&temp_name, "puzzle.nif").unwrap();
        assert!(!storage.file_exists(&temp_name));
        assert_eq!(storage.file_size("puzzle.nif").unwrap(), 4);
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path(), StorageConfig::default()).unwrap();
        let err = storage.open_input("nope").unwrap_err();
        assert!(err.to_string().contains("File not found: nope"));
        storage.delete_file("nope").unwrap();
    }
}
