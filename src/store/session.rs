//! Attribute store sessions.
//!
//! A session stages global attributes, per-frame attributes and timestamps
//! in memory and commits them as one trailer on `flush`/`close`. Staged
//! state is private to the session until committed.

use super::backing::{self, Backing, BufferBacking, FileBacking};
use super::protocol::copy_into;
use super::{StoreConfig, StoreError};
use crate::attributes::{AttributeMap, AttributeValue};
use crate::format::{Trailer, TrailerError};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Live state of an open session.
struct Session {
    backing: Box<dyn Backing>,
    staged: Trailer,
    /// Staged state differs from the committed trailer.
    dirty: bool,
}

/// An open attribute store bound to a file or an in-memory buffer.
///
/// Lifecycle: opened by one of the `open_*` constructors, mutated by the
/// setters and [`flush`](Self::flush), and terminated by exactly one of
/// [`close`](Self::close) (commit) or [`discard`](Self::discard) (abandon
/// uncommitted changes). After termination every operation fails with
/// [`StoreError::InvalidHandle`], except repeated `close`/`discard` calls
/// which do nothing.
///
/// Dropping an open store closes it; commit failures at that point can only
/// be logged, so call `close` explicitly when the outcome matters.
pub struct AttributesStore {
    session: Option<Session>,
    config: StoreConfig,
}

impl AttributesStore {
    /// Opens the store attached to `path` with the default configuration.
    ///
    /// A missing file is created empty. An existing file without trailer is
    /// opened with empty attributes and its content is kept as payload.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_path_with(path, StoreConfig::default())
    }

    /// Opens the store attached to `path`.
    pub fn open_path_with(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let (backing, trailer) = FileBacking::open(path.as_ref())?;
        Ok(Self::start(Box::new(backing), trailer, config))
    }

    /// Opens a store over a buffer that ends with an attribute trailer.
    ///
    /// Unlike files, a buffer without a well-formed trailer is rejected
    /// with [`StoreError::Parse`].
    pub fn open_buffer(host: impl Into<Vec<u8>>) -> Result<Self, StoreError> {
        Self::open_buffer_with(host, StoreConfig::default())
    }

    /// Opens a store over a buffer with the given configuration.
    pub fn open_buffer_with(
        host: impl Into<Vec<u8>>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let (backing, trailer) = BufferBacking::parse(host.into())?;
        Ok(Self::start(Box::new(backing), Some(trailer), config))
    }

    /// Reads the trailer at the end of a seekable source.
    ///
    /// The resulting session is buffer-backed and holds the trailer only;
    /// the source is never written. Its position is restored whether or not
    /// a trailer is found.
    pub fn open_reader<R: Read + Seek>(reader: &mut R) -> Result<Self, StoreError> {
        Self::open_reader_with(reader, StoreConfig::default())
    }

    /// Reads the trailer at the end of a seekable source with the given
    /// configuration.
    pub fn open_reader_with<R: Read + Seek>(
        reader: &mut R,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let origin = reader.stream_position().map_err(read_error)?;
        let scanned = backing::scan(reader, read_error);
        reader
            .seek(SeekFrom::Start(origin))
            .map_err(read_error)?;
        let (_, trailer) = scanned?.ok_or(TrailerError::Missing)?;

        let host = trailer.encode(&config.compression);
        let (backing, trailer) = BufferBacking::parse(host)?;
        Ok(Self::start(Box::new(backing), Some(trailer), config))
    }

    /// Creates an empty buffer-backed store.
    ///
    /// The committed buffer (see [`buffer`](Self::buffer)) holds just the
    /// trailer and can be appended to any payload by the caller.
    pub fn in_memory() -> Self {
        Self::start(
            Box::new(BufferBacking::empty()),
            None,
            StoreConfig::default(),
        )
    }

    fn start(backing: Box<dyn Backing>, trailer: Option<Trailer>, config: StoreConfig) -> Self {
        tracing::info!(
            backing = backing.kind(),
            location = %backing.location(),
            existing_trailer = trailer.is_some(),
            "Opened attribute store"
        );
        // A host without trailer gets one on the first commit, even if empty.
        let dirty = trailer.is_none();
        Self {
            session: Some(Session {
                backing,
                staged: trailer.unwrap_or_default(),
                dirty,
            }),
            config,
        }
    }

    fn session(&self) -> Result<&Session, StoreError> {
        self.session.as_ref().ok_or(StoreError::InvalidHandle)
    }

    fn session_mut(&mut self) -> Result<&mut Session, StoreError> {
        self.session.as_mut().ok_or(StoreError::InvalidHandle)
    }

    fn staged(&self) -> Result<&Trailer, StoreError> {
        self.session().map(|s| &s.staged)
    }

    /// Returns the staged trailer for mutation and marks the session dirty.
    fn staged_mut(&mut self) -> Result<&mut Trailer, StoreError> {
        let session = self.session_mut()?;
        session.dirty = true;
        Ok(&mut session.staged)
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns true until the store is closed or discarded.
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Returns true if staged changes have not been committed yet.
    pub fn is_dirty(&self) -> Result<bool, StoreError> {
        self.session().map(|s| s.dirty)
    }

    /// Returns the number of frames, as defined by the timestamps.
    pub fn frame_count(&self) -> Result<usize, StoreError> {
        Ok(self.staged()?.frame_count())
    }

    /// Returns the size in bytes of the trailer the current state encodes to.
    pub fn table_size(&self) -> Result<usize, StoreError> {
        Ok(self.staged()?.encode(&self.config.compression).len())
    }

    // Global attributes.

    /// Returns all global attributes.
    pub fn global_attributes(&self) -> Result<&AttributeMap, StoreError> {
        Ok(&self.staged()?.global)
    }

    /// Returns the number of global attributes.
    pub fn global_attribute_count(&self) -> Result<usize, StoreError> {
        Ok(self.staged()?.global.len())
    }

    /// Returns the name of the `index`-th global attribute.
    pub fn global_attribute_name(&self, index: usize) -> Result<&[u8], StoreError> {
        entry_at(&self.staged()?.global, "global attribute", index).map(|(k, _)| k)
    }

    /// Returns the value of the `index`-th global attribute.
    pub fn global_attribute_value(&self, index: usize) -> Result<&[u8], StoreError> {
        entry_at(&self.staged()?.global, "global attribute", index).map(|(_, v)| v)
    }

    /// Two-phase variant of [`global_attribute_name`](Self::global_attribute_name).
    pub fn read_global_attribute_name(
        &self,
        index: usize,
        dest: &mut [u8],
    ) -> Result<usize, StoreError> {
        copy_into(self.global_attribute_name(index)?, dest)
    }

    /// Two-phase variant of [`global_attribute_value`](Self::global_attribute_value).
    pub fn read_global_attribute_value(
        &self,
        index: usize,
        dest: &mut [u8],
    ) -> Result<usize, StoreError> {
        copy_into(self.global_attribute_value(index)?, dest)
    }

    /// Replaces all global attributes.
    pub fn set_global_attributes<K, V>(
        &mut self,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), StoreError>
    where
        K: Into<AttributeValue>,
        V: Into<AttributeValue>,
    {
        let attributes: AttributeMap = attributes.into_iter().collect();
        tracing::trace!(count = attributes.len(), "Set global attributes");
        self.staged_mut()?.global = attributes;
        Ok(())
    }

    /// Adds or replaces a single global attribute.
    pub fn add_global_attribute(
        &mut self,
        key: impl Into<AttributeValue>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), StoreError> {
        self.staged_mut()?.global.insert(key, value);
        Ok(())
    }

    // Frame attributes.

    fn frame(&self, frame: usize) -> Result<&AttributeMap, StoreError> {
        let staged = self.staged()?;
        staged.frames.get(frame).ok_or(StoreError::Index {
            what: "frame",
            index: frame,
            count: staged.frame_count(),
        })
    }

    fn frame_mut(&mut self, frame: usize) -> Result<&mut AttributeMap, StoreError> {
        let session = self.session_mut()?;
        let frame_count = session.staged.frame_count();
        let attributes = session
            .staged
            .frames
            .get_mut(frame)
            .ok_or(StoreError::FrameIndex { frame, frame_count })?;
        session.dirty = true;
        Ok(attributes)
    }

    /// Returns all attributes of `frame`.
    pub fn frame_attributes(&self, frame: usize) -> Result<&AttributeMap, StoreError> {
        self.frame(frame)
    }

    /// Returns the number of attributes of `frame`.
    pub fn frame_attribute_count(&self, frame: usize) -> Result<usize, StoreError> {
        Ok(self.frame(frame)?.len())
    }

    /// Returns the name of the `index`-th attribute of `frame`.
    pub fn frame_attribute_name(&self, frame: usize, index: usize) -> Result<&[u8], StoreError> {
        entry_at(self.frame(frame)?, "frame attribute", index).map(|(k, _)| k)
    }

    /// Returns the value of the `index`-th attribute of `frame`.
    pub fn frame_attribute_value(&self, frame: usize, index: usize) -> Result<&[u8], StoreError> {
        entry_at(self.frame(frame)?, "frame attribute", index).map(|(_, v)| v)
    }

    /// Two-phase variant of [`frame_attribute_name`](Self::frame_attribute_name).
    pub fn read_frame_attribute_name(
        &self,
        frame: usize,
        index: usize,
        dest: &mut [u8],
    ) -> Result<usize, StoreError> {
        copy_into(self.frame_attribute_name(frame, index)?, dest)
    }

    /// Two-phase variant of [`frame_attribute_value`](Self::frame_attribute_value).
    pub fn read_frame_attribute_value(
        &self,
        frame: usize,
        index: usize,
        dest: &mut [u8],
    ) -> Result<usize, StoreError> {
        copy_into(self.frame_attribute_value(frame, index)?, dest)
    }

    /// Replaces all attributes of `frame`.
    ///
    /// `frame` must be below the frame count set by [`set_times`](Self::set_times).
    pub fn set_frame_attributes<K, V>(
        &mut self,
        frame: usize,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), StoreError>
    where
        K: Into<AttributeValue>,
        V: Into<AttributeValue>,
    {
        let attributes: AttributeMap = attributes.into_iter().collect();
        let count = attributes.len();
        *self.frame_mut(frame)? = attributes;
        tracing::trace!(frame, count, "Set frame attributes");
        Ok(())
    }

    /// Adds or replaces a single attribute of `frame`.
    pub fn add_frame_attribute(
        &mut self,
        frame: usize,
        key: impl Into<AttributeValue>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), StoreError> {
        self.frame_mut(frame)?.insert(key, value);
        Ok(())
    }

    // Timestamps.

    /// Returns one timestamp (ns) per frame.
    pub fn timestamps(&self) -> Result<&[i64], StoreError> {
        Ok(&self.staged()?.timestamps)
    }

    /// Returns the timestamp of `frame`.
    pub fn frame_timestamp(&self, frame: usize) -> Result<i64, StoreError> {
        let staged = self.staged()?;
        staged
            .timestamps
            .get(frame)
            .copied()
            .ok_or(StoreError::Index {
                what: "frame",
                index: frame,
                count: staged.frame_count(),
            })
    }

    /// Replaces the timestamp vector, which also defines the frame count.
    ///
    /// Attributes of frames below the new count are kept, frames beyond it
    /// are dropped and new frames start without attributes.
    pub fn set_times(&mut self, times: &[i64]) -> Result<(), StoreError> {
        let staged = self.staged_mut()?;
        if staged.frame_count() != times.len() {
            tracing::trace!(
                from = staged.frame_count(),
                to = times.len(),
                "Resized frame tables"
            );
            staged.resize(times.len());
        }
        staged.timestamps.copy_from_slice(times);
        Ok(())
    }

    /// Sets the timestamp of an existing frame.
    pub fn set_time(&mut self, frame: usize, time: i64) -> Result<(), StoreError> {
        let session = self.session_mut()?;
        let frame_count = session.staged.frame_count();
        let slot = session
            .staged
            .timestamps
            .get_mut(frame)
            .ok_or(StoreError::FrameIndex { frame, frame_count })?;
        *slot = time;
        session.dirty = true;
        Ok(())
    }

    // Buffer access.

    /// Returns the committed host bytes of a buffer-backed store.
    pub fn buffer(&self) -> Result<&[u8], StoreError> {
        let session = self.session()?;
        session
            .backing
            .bytes()
            .ok_or(StoreError::Unsupported(session.backing.kind()))
    }

    /// Closes a buffer-backed store and returns payload plus trailer.
    pub fn into_buffer(mut self) -> Result<Vec<u8>, StoreError> {
        {
            let session = self.session()?;
            if session.backing.bytes().is_none() {
                return Err(StoreError::Unsupported(session.backing.kind()));
            }
        }
        self.commit()?;
        let session = self.session.take().ok_or(StoreError::InvalidHandle)?;
        tracing::info!(backing = session.backing.kind(), "Closed attribute store");
        session
            .backing
            .into_bytes()
            .ok_or(StoreError::Unsupported("file"))
    }

    // Lifecycle.

    fn commit(&mut self) -> Result<(), StoreError> {
        let config = &self.config;
        let session = self.session.as_mut().ok_or(StoreError::InvalidHandle)?;
        if !session.dirty {
            return Ok(());
        }
        let encoded = session.staged.encode(&config.compression);
        session.backing.commit(&encoded, config)?;
        session.dirty = false;
        Ok(())
    }

    /// Commits staged changes without closing the store.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.commit()
    }

    /// Commits staged changes and closes the store.
    ///
    /// Does nothing if the store is already closed. If the commit fails the
    /// store stays open so the caller can retry or [`discard`](Self::discard).
    pub fn close(&mut self) -> Result<(), StoreError> {
        if self.session.is_none() {
            return Ok(());
        }
        self.commit()?;
        if let Some(session) = self.session.take() {
            tracing::info!(
                backing = session.backing.kind(),
                location = %session.backing.location(),
                "Closed attribute store"
            );
        }
        Ok(())
    }

    /// Closes the store without committing staged changes.
    ///
    /// Previously committed state is left as it was. Does nothing if the
    /// store is already closed.
    pub fn discard(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(
                backing = session.backing.kind(),
                location = %session.backing.location(),
                pending_changes = session.dirty,
                "Discarded attribute store"
            );
        }
    }
}

impl Drop for AttributesStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "Failed to commit attributes while dropping store");
        }
    }
}

impl std::fmt::Debug for AttributesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("AttributesStore");
        match &self.session {
            Some(session) => s
                .field("backing", &session.backing.kind())
                .field("location", &session.backing.location())
                .field("frames", &session.staged.frame_count())
                .field("global_attributes", &session.staged.global.len())
                .field("dirty", &session.dirty),
            None => s.field("open", &false),
        };
        s.finish()
    }
}

fn entry_at<'a>(
    map: &'a AttributeMap,
    what: &'static str,
    index: usize,
) -> Result<(&'a [u8], &'a [u8]), StoreError> {
    map.entry_at(index).ok_or(StoreError::Index {
        what,
        index,
        count: map.len(),
    })
}

fn read_error(source: std::io::Error) -> StoreError {
    StoreError::Open {
        path: "<reader>".into(),
        source,
    }
}
