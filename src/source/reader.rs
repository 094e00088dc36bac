use crate::config::types::ReadStart;
use futures::Stream;
use std::fs::{File, Metadata};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("source unavailable '{}': {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A complete line read from the tailed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailLine {
    pub text: String,
    /// 1-based line number since the file was (re)opened.
    pub line_number: u64,
    pub offset: u64,
}

/// Follows a file that is being appended to, yielding one complete line at a time.
///
/// When the end of the written content is reached the reader sleeps for
/// `poll_interval` before checking again. Bytes written without a trailing
/// newline are held back until the line is finished.
pub struct TailReader {
    path: PathBuf,
    start: ReadStart,
    poll_interval: Duration,

    // Internal state
    file: Option<BufReader<File>>,
    current_offset: u64,
    line_number: u64,
    partial: Vec<u8>,
    partial_offset: u64,
    file_inode: Option<u64>,
}

impl TailReader {
    pub fn new(path: impl Into<PathBuf>, start: ReadStart, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            start,
            poll_interval,
            file: None,
            current_offset: 0,
            line_number: 0,
            partial: Vec::new(),
            partial_offset: 0,
            file_inode: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset just past the last byte consumed from the file.
    pub fn offset(&self) -> u64 {
        self.current_offset
    }

    /// Open the file and seek according to the configured start position.
    ///
    /// A missing or unreadable file is reported as `SourceUnavailable`.
    pub fn open(&mut self) -> Result<(), ReaderError> {
        let file = File::open(&self.path).map_err(|source| ReaderError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        let metadata = file.metadata()?;
        self.file_inode = Some(get_inode(&metadata));

        let mut buf_reader = BufReader::new(file);
        self.current_offset = match self.start {
            ReadStart::Beginning => buf_reader.seek(SeekFrom::Start(0))?,
            ReadStart::End => buf_reader.seek(SeekFrom::End(0))?,
        };

        debug!(path = %self.path.display(), offset = self.current_offset, "Opened tail source");

        self.file = Some(buf_reader);
        self.line_number = 0;
        self.partial.clear();
        Ok(())
    }

    /// Read the next complete line without waiting.
    ///
    /// Returns `Ok(None)` when no complete line is currently available.
    pub fn try_next_line(&mut self) -> Result<Option<TailLine>, ReaderError> {
        if self.file.is_none() {
            self.open()?;
        }
        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };

        if self.partial.is_empty() {
            self.partial_offset = self.current_offset;
        }

        read_line_into(file, &mut self.partial, &mut self.current_offset)?;

        if self.partial.last() != Some(&b'\n') {
            // EOF, possibly in the middle of a line that is still being written
            return Ok(None);
        }

        let raw = std::mem::take(&mut self.partial);
        let text = String::from_utf8_lossy(&raw)
            .trim_end_matches(&['\n', '\r'][..])
            .to_string();
        self.line_number += 1;

        Ok(Some(TailLine {
            text,
            line_number: self.line_number,
            offset: self.partial_offset,
        }))
    }

    /// Wait for the next complete line, sleeping between polls at end of file.
    pub async fn next_line(&mut self) -> Result<TailLine, ReaderError> {
        loop {
            if let Some(line) = self.try_next_line()? {
                return Ok(line);
            }

            if self.check_file_rotation()? {
                info!(path = %self.path.display(), "Source rotated or truncated, reopening from start");
                self.file = None;
                self.start = ReadStart::Beginning;
                continue;
            }

            sleep(self.poll_interval).await;
        }
    }

    /// Check whether the file was replaced (inode changed) or truncated below
    /// the current read position.
    fn check_file_rotation(&self) -> Result<bool, ReaderError> {
        let Some(original_inode) = self.file_inode else {
            return Ok(false);
        };

        match std::fs::metadata(&self.path) {
            Ok(metadata) => {
                Ok(get_inode(&metadata) != original_inode || metadata.len() < self.current_offset)
            }
            // Removed but not yet recreated; keep reading the open handle
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Convert into a never-ending stream of lines.
    pub fn into_stream(self) -> impl Stream<Item = Result<TailLine, ReaderError>> {
        futures::stream::unfold(self, |mut reader| async move {
            let item = reader.next_line().await;
            Some((item, reader))
        })
    }
}

/// Append bytes up to the next newline to `buf`. `offset` advances by every byte
/// consumed, including those appended before a read error.
fn read_line_into<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    offset: &mut u64,
) -> std::io::Result<usize> {
    let before = buf.len();
    let result = reader.read_until(b'\n', buf);
    *offset += (buf.len() - before) as u64;
    result
}

#[cfg(unix)]
fn get_inode(metadata: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn get_inode(metadata: &Metadata) -> u64 {
    // No inode on this platform; creation time is the closest stable identity
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    if let Ok(created) = metadata.created() {
        created.hash(&mut hasher);
    }
    hasher.finish()
}
