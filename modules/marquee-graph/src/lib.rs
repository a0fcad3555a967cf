pub mod cache;
pub mod client;
pub mod community;
pub mod migrate;
pub mod reader;
pub mod service;
pub mod similarity;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use cache::{TitleCache, TtlCache};
pub use client::GraphClient;
pub use community::{CommunityDetector, Partition};
pub use neo4rs::query;
pub use reader::{MovieCatalog, MovieReader};
pub use service::RecommendationService;
pub use similarity::{SimilarityBuilder, SimilarityWeights};
pub use writer::GraphWriter;
