//! Body sink: buffers curl data into chunks and writes them to the target file.
//!
//! The file is opened lazily on the first body byte, once the status is known:
//! 206 appends after the requested offset, 200 truncates. Before every chunk
//! write the sink honours the soft pause, and the chunk size is re-read for
//! every chunk so monitor adjustments apply mid-file.

use std::path::Path;

use crate::control::{ChunkSize, PauseSignal};
use crate::retry::FetchError;
use crate::storage::{TargetWriter, WriteMode};

pub(super) struct ChunkSink<'a> {
    path: &'a Path,
    offset: u64,
    chunk: &'a ChunkSize,
    pause: &'a PauseSignal,
    writer: Option<TargetWriter>,
    buf: Vec<u8>,
    paused: bool,
    error: Option<FetchError>,
}

impl<'a> ChunkSink<'a> {
    pub(super) fn new(path: &'a Path, offset: u64, chunk: &'a ChunkSize, pause: &'a PauseSignal) -> Self {
        Self {
            path,
            offset,
            chunk,
            pause,
            writer: None,
            buf: Vec::new(),
            paused: false,
            error: None,
        }
    }

    /// Accepts body bytes of a 200/206 response. Returns false when the
    /// transfer must be aborted; the cause is kept for `take_error`.
    pub(super) fn accept(&mut self, status: u32, range_start: Option<u64>, data: &[u8]) -> bool {
        if self.error.is_some() {
            return false;
        }
        if self.writer.is_none() {
            if let Err(e) = self.open(status, range_start) {
                self.error = Some(e);
                return false;
            }
        }
        self.buf.extend_from_slice(data);
        if self.buf.len() >= self.chunk.get() {
            if let Err(e) = self.flush() {
                self.error = Some(e);
                return false;
            }
        }
        true
    }

    fn open(&mut self, status: u32, range_start: Option<u64>) -> Result<(), FetchError> {
        let mode = if status == 206 {
            let got = range_start.unwrap_or(self.offset);
            if got != self.offset {
                return Err(FetchError::RangeMismatch {
                    requested: self.offset,
                    got,
                });
            }
            WriteMode::Append
        } else {
            WriteMode::Truncate
        };
        let writer = TargetWriter::open(self.path, mode).map_err(FetchError::Storage)?;
        if mode == WriteMode::Append && writer.start_offset() != self.offset {
            // File changed under us between the length probe and the open.
            return Err(FetchError::RangeMismatch {
                requested: self.offset,
                got: writer.start_offset(),
            });
        }
        self.writer = Some(writer);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), FetchError> {
        if self.buf.is_empty() {
            return Ok(());
        }
        if self.pause.wait_while_paused() {
            self.paused = true;
        }
        if let Some(w) = self.writer.as_mut() {
            w.write_chunk(&self.buf).map_err(FetchError::Storage)?;
        }
        self.buf.clear();
        Ok(())
    }

    pub(super) fn take_error(&mut self) -> Option<FetchError> {
        self.error.take()
    }

    pub(super) fn was_paused(&self) -> bool {
        self.paused
    }

    /// Finishes a successful response. A 200 with an empty body still
    /// creates (or truncates) the file. Returns the final on-disk length.
    pub(super) fn finish(mut self, status: u32, range_start: Option<u64>) -> Result<u64, FetchError> {
        if self.writer.is_none() {
            if status != 200 {
                // 206 without a body: nothing changed on disk.
                return crate::storage::local_len(self.path).map_err(FetchError::Storage);
            }
            self.open(status, range_start)?;
        }
        self.flush()?;
        match self.writer.take() {
            Some(w) => w.finish().map_err(FetchError::Storage),
            None => Ok(0),
        }
    }

    /// Keeps whatever was received before a failed transfer so the next
    /// attempt resumes after it. Write errors here are only logged.
    pub(super) fn salvage(mut self) -> bool {
        if self.writer.is_some() {
            if let Err(e) = self.flush() {
                tracing::warn!(path = %self.path.display(), "could not keep partial body: {}", e);
            }
            if let Some(w) = self.writer.take() {
                let _ = w.finish();
            }
        }
        self.paused
    }
}
