//! Storage behind an attribute session.
//!
//! A backing holds the payload the trailer is attached to and knows how to
//! replace the committed trailer. Commits never modify the committed bytes
//! in place: the complete new host is built first and swapped in last.

use super::{StoreConfig, StoreError};
use crate::format::{Footer, Trailer, TrailerError, FOOTER_LEN};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Trait for trailer storage implementations.
///
/// This abstraction allows a session to be bound to a file on disk or to
/// a byte buffer owned by the caller.
pub trait Backing: Send {
    /// Short name of the backing kind, used in logs and errors.
    fn kind(&self) -> &'static str;

    /// Human-readable location (a path, or a buffer description).
    fn location(&self) -> String;

    /// Replaces the committed trailer with `trailer`, keeping the payload.
    fn commit(&mut self, trailer: &[u8], config: &StoreConfig) -> Result<(), StoreError>;

    /// Returns the committed host bytes if they are held in memory.
    fn bytes(&self) -> Option<&[u8]>;

    /// Consumes the backing, returning in-memory host bytes if any.
    fn into_bytes(self: Box<Self>) -> Option<Vec<u8>>;
}

/// Scans a seekable source for a trailer at its end.
///
/// Returns the payload length and the decoded trailer, or `None` if the
/// source carries no magic. The stream position is left unspecified.
pub(crate) fn scan<R: Read + Seek>(
    reader: &mut R,
    on_io: impl Fn(io::Error) -> StoreError,
) -> Result<Option<(u64, Trailer)>, StoreError> {
    let len = reader.seek(SeekFrom::End(0)).map_err(&on_io)?;
    if len < FOOTER_LEN as u64 {
        return Ok(None);
    }

    let mut footer = [0u8; FOOTER_LEN];
    reader
        .seek(SeekFrom::Start(len - FOOTER_LEN as u64))
        .map_err(&on_io)?;
    reader.read_exact(&mut footer).map_err(&on_io)?;
    let Some(found) = Footer::locate(&footer) else {
        return Ok(None);
    };

    if found.trailer_size < FOOTER_LEN as u64 || found.trailer_size > len {
        return Err(TrailerError::InvalidSize {
            size: found.trailer_size,
            host_len: usize::try_from(len).unwrap_or(usize::MAX),
        }
        .into());
    }
    let size = usize::try_from(found.trailer_size).map_err(|_| TrailerError::InvalidSize {
        size: found.trailer_size,
        host_len: usize::MAX,
    })?;

    let mut bytes = vec![0u8; size];
    reader
        .seek(SeekFrom::Start(len - found.trailer_size))
        .map_err(&on_io)?;
    reader.read_exact(&mut bytes).map_err(&on_io)?;

    let trailer = Trailer::decode(&bytes)?;
    Ok(Some((len - found.trailer_size, trailer)))
}

/// File on disk holding a payload followed by an optional trailer.
#[derive(Debug)]
pub struct FileBacking {
    path: PathBuf,
    payload_len: u64,
}

impl FileBacking {
    /// Opens `path`, creating an empty file if it does not exist.
    ///
    /// An existing file without trailer is treated as pure payload.
    pub fn open(path: &Path) -> Result<(Self, Option<Trailer>), StoreError> {
        let open_error = |source: io::Error| StoreError::Open {
            path: path.to_path_buf(),
            source,
        };

        match fs::metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                File::create(path).map_err(open_error)?;
                tracing::debug!(path = %path.display(), "Created new attribute file");
                return Ok((
                    Self {
                        path: path.to_path_buf(),
                        payload_len: 0,
                    },
                    None,
                ));
            }
            Err(e) => return Err(open_error(e)),
            Ok(meta) if meta.is_dir() => {
                return Err(open_error(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path is a directory",
                )))
            }
            Ok(_) => {}
        }

        let mut file = File::open(path).map_err(open_error)?;
        let (payload_len, trailer) = match scan(&mut file, open_error)? {
            Some((payload_len, trailer)) => (payload_len, Some(trailer)),
            None => (file.metadata().map_err(open_error)?.len(), None),
        };

        Ok((
            Self {
                path: path.to_path_buf(),
                payload_len,
            },
            trailer,
        ))
    }

    /// Returns the bound path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn write_swapped(&self, trailer: &[u8], config: &StoreConfig) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let source = File::open(&self.path)?;
        let permissions = source.metadata()?.permissions();

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        let copied = io::copy(&mut source.take(self.payload_len), staged.as_file_mut())?;
        if copied != self.payload_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "payload shrank while the session was open ({} of {} bytes)",
                    copied, self.payload_len
                ),
            ));
        }
        staged.write_all(trailer)?;
        staged.flush()?;
        if config.sync_on_commit {
            staged.as_file().sync_all()?;
        }
        fs::set_permissions(staged.path(), permissions)?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl Backing for FileBacking {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn commit(&mut self, trailer: &[u8], config: &StoreConfig) -> Result<(), StoreError> {
        self.write_swapped(trailer, config)
            .map_err(|e| self.write_error(e))?;
        tracing::debug!(
            path = %self.path.display(),
            payload_bytes = self.payload_len,
            trailer_bytes = trailer.len(),
            "Committed attribute trailer"
        );
        Ok(())
    }

    fn bytes(&self) -> Option<&[u8]> {
        None
    }

    fn into_bytes(self: Box<Self>) -> Option<Vec<u8>> {
        None
    }
}

/// In-memory host buffer.
#[derive(Debug, Default)]
pub struct BufferBacking {
    host: Vec<u8>,
    payload_len: usize,
}

impl BufferBacking {
    /// Wraps a buffer that must end with a well-formed trailer.
    pub fn parse(host: Vec<u8>) -> Result<(Self, Trailer), StoreError> {
        let (payload_len, trailer) = Trailer::from_host(&host)?;
        Ok((Self { host, payload_len }, trailer))
    }

    /// Creates an empty buffer with no payload and no trailer yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the payload bytes preceding the trailer.
    pub fn payload(&self) -> &[u8] {
        &self.host[..self.payload_len]
    }
}

impl Backing for BufferBacking {
    fn kind(&self) -> &'static str {
        "buffer"
    }

    fn location(&self) -> String {
        format!("<{} byte buffer>", self.host.len())
    }

    fn commit(&mut self, trailer: &[u8], _config: &StoreConfig) -> Result<(), StoreError> {
        let mut host = Vec::with_capacity(self.payload_len + trailer.len());
        host.extend_from_slice(self.payload());
        host.extend_from_slice(trailer);
        self.host = host;
        tracing::debug!(
            payload_bytes = self.payload_len,
            trailer_bytes = trailer.len(),
            "Committed attribute trailer to buffer"
        );
        Ok(())
    }

    fn bytes(&self) -> Option<&[u8]> {
        Some(&self.host)
    }

    fn into_bytes(self: Box<Self>) -> Option<Vec<u8>> {
        Some(self.host)
    }
}
