pub mod catalog;
pub mod embedder;
pub mod pipeline;

pub use embedder::HttpEmbedder;
pub use pipeline::{IngestOptions, IngestReport};
