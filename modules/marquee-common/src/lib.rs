pub mod types;
pub mod config;
pub mod error;
pub mod embedder;

pub use types::*;
pub use config::Config;
pub use embedder::TextEmbedder;
pub use error::MarqueeError;
