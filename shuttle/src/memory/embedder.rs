//! `Embedder` trait — produces vectors from text for the memory store's write
//! and search paths (spec §4.5 "Write path" step 1, "Vector search").

use async_trait::async_trait;

use crate::error::StoreError;

/// Produces fixed-size float vectors from text. Used by [`crate::memory::MemoryStore`]
/// to embed content on write and the query string on vector/hybrid search.
///
/// Implementations must be `Send + Sync` for use from async store methods.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text into a vector of dimension [`Embedder::dimension`].
    /// Returns one vector per input text in the same order.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError>;

    /// Vector dimension returned by [`Embedder::embed`]; detected by embedding
    /// the string `"test"` on first use (spec §6 "Embedding HTTP").
    fn dimension(&self) -> usize;
}
