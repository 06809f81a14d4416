//! Random-access byte sources for archives.
//!
//! An archive can live on local disk, behind an HTTP server that honours
//! Range requests, or already in memory (an uploaded blob). All three are
//! read through [`ReadAt`] so the ZIP layer never cares where bytes come from.

mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use anyhow::Result;
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}
