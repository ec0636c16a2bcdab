//! Download/cache bridge trait.
//!
//! The persistent download store is an external collaborator: the core never
//! touches disk itself. It issues commands and progress-refresh requests
//! through this capability interface and observes results through
//! [`TransportEvent::DownloadProgress`](crate::playback::TransportEvent)
//! events delivered on the playback event stream.

use crate::error::Result;
use crate::playback::MediaRequest;

/// Opaque capability interface over the host's download/cache subsystem.
///
/// All operations address content by [`MediaRequest`] locator identity.
/// Implementations must be safe to call concurrently from async tasks.
#[async_trait::async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Prepare the subsystem for use. Must be invoked before any other
    /// operation; calling it again on an already-initialized engine is a
    /// harmless no-op.
    async fn init(&self) -> Result<()>;

    /// Enqueue a download for the requested content.
    async fn download(&self, request: &MediaRequest) -> Result<()>;

    /// Remove the downloaded content for the request, if present.
    async fn remove(&self, request: &MediaRequest) -> Result<()>;

    /// Remove every download managed by the subsystem.
    async fn remove_all(&self) -> Result<()>;

    /// Ask the subsystem to publish fresh progress for active downloads.
    async fn refresh_progress(&self) -> Result<()>;

    /// Total bytes currently held by the cache.
    async fn cached_size(&self) -> Result<u64>;

    /// Evict all cached media.
    async fn clear_cache(&self) -> Result<()>;
}
