//! Sequential writer for one target file.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::ensure_parent;

/// How the response body relates to what is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 206: continue after the existing bytes.
    Append,
    /// 200 (or restart after 416): discard existing bytes and write from zero.
    Truncate,
}

/// Single writer per target; writes are strictly sequential.
#[derive(Debug)]
pub struct TargetWriter {
    file: File,
    path: PathBuf,
    start_offset: u64,
    written: u64,
}

impl TargetWriter {
    /// Open `path` for the given mode, creating parent directories as needed.
    pub fn open(path: &Path, mode: WriteMode) -> io::Result<Self> {
        ensure_parent(path)?;
        let file = match mode {
            WriteMode::Append => File::options().create(true).append(true).open(path)?,
            WriteMode::Truncate => File::options()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?,
        };
        let start_offset = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            start_offset,
            written: 0,
        })
    }

    pub fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Offset at which this writer started (existing length for append, 0 for truncate).
    pub fn start_offset(&self) -> u64 {
        self.start_offset
    }

    /// Bytes written through this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush to the OS. Data is not fsynced: a crash may lose the tail, which
    /// the next resume simply re-downloads.
    pub fn finish(mut self) -> io::Result<u64> {
        self.file.flush()?;
        Ok(self.start_offset + self.written)
    }
}
