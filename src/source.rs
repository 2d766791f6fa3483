//! Opening parser sources from paths, with archive decompression

use crate::error::{FieldError, Result};
use s_zip::StreamingZipReader;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

/// Byte source backing a path-based parser
///
/// Plain files are streamed. Compressed archives are decompressed into
/// memory first, since the archive entry has to be read as a whole.
pub enum SourceReader {
    File(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl SourceReader {
    /// Open a path - auto-detects compression from file extension
    ///
    /// # File Extensions
    /// - `.csv.zst`, `.csv.zip` → Zstd decompression
    /// - `.csv.gz` → Deflate/Gzip decompression
    /// - anything else → streamed as is
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(FieldError::ReadError(format!(
                "File not found: {}",
                path_ref.display()
            )));
        }
        if path_ref.is_dir() {
            return Err(FieldError::ReadError(format!(
                "Path is a directory: {}",
                path_ref.display()
            )));
        }

        if Self::is_archive(path_ref) {
            return Self::open_archive(path_ref);
        }

        let file = File::open(path_ref)
            .map_err(|e| FieldError::ReadError(format!("Failed to open file: {}", e)))?;
        Ok(SourceReader::File(BufReader::new(file)))
    }

    /// Whether the extension names a compressed archive
    pub fn is_archive(path: &Path) -> bool {
        let path_str = path.to_str().unwrap_or("");
        path_str.ends_with(".csv.zst") || path_str.ends_with(".csv.zip") || path_str.ends_with(".csv.gz")
    }

    fn open_archive(path: &Path) -> Result<Self> {
        let mut zip = StreamingZipReader::open(path)
            .map_err(|e| FieldError::ReadError(format!("Failed to open ZIP: {}", e)))?;

        // First .csv entry, else the first entry of any name
        let entry_name = zip
            .entries()
            .iter()
            .find(|e| e.name.ends_with(".csv"))
            .or_else(|| zip.entries().first())
            .ok_or_else(|| FieldError::ReadError("No CSV entry found in archive".to_string()))?
            .name
            .clone();

        let data = zip
            .read_entry_by_name(&entry_name)
            .map_err(|e| FieldError::ReadError(format!("Failed to read ZIP entry: {}", e)))?;

        log::debug!(
            "Decompressed {} ({} bytes) from {}",
            entry_name,
            data.len(),
            path.display()
        );
        Ok(SourceReader::Memory(Cursor::new(data)))
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            SourceReader::File(reader) => reader.read(buf),
            SourceReader::Memory(cursor) => cursor.read(buf),
        }
    }
}
