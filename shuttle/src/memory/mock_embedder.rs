//! Deterministic embedder for tests: hashes each text into a fixed-size vector,
//! so equal text embeds to an equal vector without a live API key (grounded on
//! the teacher's `MockLlm`-style deterministic test doubles).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::memory::Embedder;

pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_to_vector(&self, text: &str) -> Vec<f32> {
        let mut state: u64 = 1469598103934665603; // FNV offset basis
        for b in text.bytes() {
            state ^= b as u64;
            state = state.wrapping_mul(1099511628211);
        }
        (0..self.dimension)
            .map(|i| {
                let mixed = state.wrapping_add(i as u64).wrapping_mul(2654435761);
                ((mixed % 2000) as f32 / 1000.0) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|t| self.hash_to_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed(&["hello"]).await.unwrap();
        let b = embedder.embed(&["hello"]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 8);
    }

    #[tokio::test]
    async fn different_text_embeds_differently() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed(&["hello"]).await.unwrap();
        let b = embedder.embed(&["goodbye"]).await.unwrap();
        assert_ne!(a, b);
    }
}
