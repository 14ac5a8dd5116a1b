//! Single-owner body chunks with guaranteed release.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::body::error::Error;

/// A lazy, non-restartable sequence of body chunks.
///
/// Polling pulls the next chunk from the producer; dropping the stream
/// cancels it and releases whatever the producer still holds.
pub type BodyStream = BoxStream<'static, Result<Chunk, Error>>;

/// Notified once for every chunk when its owner lets go of it.
///
/// Transports that pool their buffers implement this to learn when a
/// buffer can be reused.
pub trait Release: Send + Sync {
    fn release(&self, len: usize);
}

/// One unit of arriving or outgoing body bytes.
///
/// A chunk has exactly one owner at a time. Its release hook runs exactly
/// once: on [`Chunk::release`], or on drop if the owner never released it
/// explicitly (early return, error, cancellation).
pub struct Chunk {
    data: Bytes,
    hook: Option<Arc<dyn Release>>,
}

impl Chunk {
    /// A chunk with no release hook.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            hook: None,
        }
    }

    /// A chunk that reports its release to `hook`.
    pub fn with_release(data: impl Into<Bytes>, hook: Arc<dyn Release>) -> Self {
        Self {
            data: data.into(),
            hook: Some(hook),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copy the payload out and release the chunk.
    pub fn to_owned_bytes(self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    /// Release the chunk now. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook.release(self.data.len());
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("len", &self.data.len())
            .field("tracked", &self.hook.is_some())
            .finish()
    }
}
