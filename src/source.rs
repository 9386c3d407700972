//! Source handles for watermarking targets.
//!
//! A [`SourceHandle`] owns whatever backs the target (a byte buffer, an open
//! file, a caller-defined resource). The builder reads it when the target is
//! selected and closes it exactly once after rendering, success or failure.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Readable, closable watermarking target.
pub trait SourceHandle: Send {
    /// Short human readable name used in logs.
    fn describe(&self) -> String;

    /// Read the full contents of the source.
    fn read(&mut self) -> io::Result<Vec<u8>>;

    /// Release the underlying resource.
    fn close(&mut self) -> io::Result<()>;
}

fn closed_error(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{} is already closed", what))
}

/// In-memory source.
#[derive(Debug, Clone)]
pub struct BytesSource {
    bytes: Option<Vec<u8>>,
}

impl BytesSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.bytes.is_none()
    }
}

impl SourceHandle for BytesSource {
    fn describe(&self) -> String {
        match &self.bytes {
            Some(bytes) => format!("memory buffer ({} bytes)", bytes.len()),
            None => "memory buffer (closed)".to_string(),
        }
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        self.bytes
            .clone()
            .ok_or_else(|| closed_error("memory buffer"))
    }

    fn close(&mut self) -> io::Result<()> {
        self.bytes.take().map(|_| ()).ok_or_else(|| closed_error("memory buffer"))
    }
}

/// Source backed by an open file.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl SourceHandle for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| closed_error(&self.path.display().to_string()))?;
        file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn close(&mut self) -> io::Result<()> {
        self.file
            .take()
            .map(drop)
            .ok_or_else(|| closed_error(&self.path.display().to_string()))
    }
}
