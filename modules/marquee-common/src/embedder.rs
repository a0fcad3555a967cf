use anyhow::Result;

/// Maps synopsis text to a fixed-length vector. Implementations must return
/// one vector per input, in input order.
#[async_trait::async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}
