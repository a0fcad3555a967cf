use std::time::Instant;

use tracing::{info, warn};

use marquee_common::{GraphCounts, MarqueeError, MovieRecord, SimilarityEdge, TextEmbedder};
use marquee_graph::writer::EdgeWriteStats;
use marquee_graph::{
    CommunityDetector, GraphClient, GraphWriter, MovieCatalog, MovieReader, SimilarityBuilder,
};

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub threshold: f64,
    pub communities: bool,
    pub seed: Option<u64>,
    pub rebuild_edges: bool,
    pub skip_edges: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub movies: u64,
    pub edges: EdgeWriteStats,
    pub communities: Option<usize>,
    pub counts: GraphCounts,
}

/// Embed every overview, one vector per movie in input order. Blank
/// overviews are never sent to the embedder; they get an empty vector, which
/// scores zero cosine similarity against anything.
pub async fn embed_overviews(
    embedder: &dyn TextEmbedder,
    movies: &[MovieRecord],
) -> Result<Vec<Vec<f32>>, MarqueeError> {
    let (indices, texts): (Vec<usize>, Vec<String>) = movies
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.overview.trim().is_empty())
        .map(|(i, m)| (i, m.overview.clone()))
        .unzip();

    let mut out = vec![Vec::new(); movies.len()];
    if texts.is_empty() {
        warn!(movies = movies.len(), "No overviews to embed");
        return Ok(out);
    }

    let start = Instant::now();
    let vectors = embedder
        .embed_batch(texts)
        .await
        .map_err(|e| MarqueeError::Embedding(e.to_string()))?;

    if vectors.len() != indices.len() {
        return Err(MarqueeError::Embedding(format!(
            "expected {} embeddings, got {}",
            indices.len(),
            vectors.len()
        )));
    }
    for (i, v) in indices.into_iter().zip(vectors) {
        out[i] = v;
    }
    info!(
        movies = movies.len(),
        blank = movies.len() - out.iter().filter(|v| !v.is_empty()).count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Overviews embedded"
    );
    Ok(out)
}

/// Embed overviews and score every pair, keeping edges at or above `threshold`.
pub async fn compute_edges(
    embedder: &dyn TextEmbedder,
    movies: &[MovieRecord],
    threshold: f64,
) -> Result<Vec<SimilarityEdge>, MarqueeError> {
    let builder = SimilarityBuilder::with_threshold(threshold)?;
    let embeddings = embed_overviews(embedder, movies).await?;
    builder.build_edges(movies, &embeddings)
}

/// Run the full batch: score, upsert movies and edges, then optionally
/// detect communities. Similarity is computed before the first write so an
/// embedding failure leaves the graph untouched.
pub async fn run(
    client: &GraphClient,
    embedder: &dyn TextEmbedder,
    movies: &[MovieRecord],
    opts: &IngestOptions,
) -> Result<IngestReport, MarqueeError> {
    let edges = if opts.skip_edges {
        info!("Skipping similarity edges");
        Vec::new()
    } else {
        compute_edges(embedder, movies, opts.threshold).await?
    };

    let writer = GraphWriter::new(client.clone());
    let written = writer.upsert_movies(movies).await.map_err(database)?;

    let mut edge_stats = EdgeWriteStats::default();
    if !opts.skip_edges {
        if opts.rebuild_edges {
            writer.clear_similarity_edges().await.map_err(database)?;
        }
        edge_stats = writer
            .upsert_similarity_edges(&edges)
            .await
            .map_err(database)?;
    }

    let communities = if opts.communities {
        Some(detect_communities(client, opts.seed).await?)
    } else {
        None
    };

    let counts = MovieReader::new(client.clone())
        .counts()
        .await
        .map_err(database)?;
    info!(%counts, "Ingestion complete");

    Ok(IngestReport {
        movies: written,
        edges: edge_stats,
        communities,
        counts,
    })
}

/// Partition every stored movie over every stored SIMILAR_TO edge and
/// rewrite the community annotations. Movies from earlier runs are included,
/// so their annotations stay consistent with the graph as a whole.
pub async fn detect_communities(
    client: &GraphClient,
    seed: Option<u64>,
) -> Result<usize, MarqueeError> {
    let reader = MovieReader::new(client.clone());
    let titles = reader.all_titles().await.map_err(database)?;
    let edges = reader.similarity_edges().await.map_err(database)?;

    let partition = CommunityDetector::new(seed).detect(&titles, &edges);

    let writer = GraphWriter::new(client.clone());
    writer.clear_communities().await.map_err(database)?;
    writer
        .set_communities(&partition.assignments())
        .await
        .map_err(database)?;
    info!(
        movies = titles.len(),
        edges = edges.len(),
        communities = partition.len(),
        "Communities written"
    );
    Ok(partition.len())
}

fn database(e: neo4rs::Error) -> MarqueeError {
    MarqueeError::Database(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Maps each overview onto a fixed vector by keyword.
    struct KeywordEmbedder;

    #[async_trait::async_trait]
    impl TextEmbedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(if text.contains("heist") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }

        async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in &texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }
    }

    struct ShortEmbedder;

    #[async_trait::async_trait]
    impl TextEmbedder for ShortEmbedder {
        async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
            Ok(vec![1.0])
        }

        async fn embed_batch(&self, _texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0]])
        }
    }

    fn movie(title: &str, overview: &str, director: &str, genres: &[&str]) -> MovieRecord {
        MovieRecord {
            title: title.into(),
            overview: overview.into(),
            director: director.into(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn similar_heists_are_linked() {
        let movies = vec![
            movie("Heat", "A heist goes wrong.", "Michael Mann", &["Crime"]),
            movie("Thief", "One last heist.", "Michael Mann", &["Crime"]),
            movie("Up", "A house flies away.", "Pete Docter", &["Animation"]),
        ];
        let edges = compute_edges(&KeywordEmbedder, &movies, 0.4).await.unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].title_a.as_str(), edges[0].title_b.as_str()), ("Heat", "Thief"));
        // 0.4 cosine + 0.2 director + 0.2 genre; no stars on either side
        assert!((edges[0].weight - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_vectors_are_an_embedding_error() {
        let movies = vec![movie("A", "x", "", &[]), movie("B", "y", "", &[])];
        let err = embed_overviews(&ShortEmbedder, &movies).await.unwrap_err();
        assert!(matches!(err, MarqueeError::Embedding(_)));
    }

    /// Rejects blank input the way hosted embedding endpoints do.
    struct StrictEmbedder;

    #[async_trait::async_trait]
    impl TextEmbedder for StrictEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            if text.trim().is_empty() {
                anyhow::bail!("Embedding API error (400): input must not be empty");
            }
            KeywordEmbedder.embed(text).await
        }

        async fn embed_batch(&self, texts: Vec<String>) -> anyhow::Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for t in &texts {
                out.push(self.embed(t).await?);
            }
            Ok(out)
        }
    }

    #[tokio::test]
    async fn blank_overviews_are_not_sent_to_the_embedder() {
        let movies = vec![
            movie("Heat", "A heist goes wrong.", "Michael Mann", &["Crime"]),
            movie("Untitled", "   ", "Michael Mann", &["Crime"]),
            movie("Thief", "One last heist.", "Michael Mann", &["Crime"]),
        ];
        let vectors = embed_overviews(&StrictEmbedder, &movies).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert!(vectors[1].is_empty());
        assert_eq!(vectors[2], vec![1.0, 0.0]);

        // The blank movie still links through its director and genre alone
        let edges = compute_edges(&StrictEmbedder, &movies, 0.3).await.unwrap();
        let blank = edges
            .iter()
            .find(|e| e.title_a == "Untitled" || e.title_b == "Untitled")
            .unwrap();
        assert!((blank.weight - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn all_blank_overviews_skip_the_embedder() {
        let movies = vec![movie("A", "", "", &[]), movie("B", "", "", &[])];
        let vectors = embed_overviews(&StrictEmbedder, &movies).await.unwrap();
        assert_eq!(vectors, vec![Vec::<f32>::new(), Vec::new()]);
    }

    #[test]
    fn store_errors_map_to_database_errors() {
        let err = database(neo4rs::Error::UnsupportedVersion("4.0".into()));
        assert!(matches!(err, MarqueeError::Database(ref m) if m.contains("4.0")));
    }

    #[tokio::test]
    async fn invalid_threshold_is_rejected_before_embedding() {
        let err = compute_edges(&ShortEmbedder, &[], 1.5).await.unwrap_err();
        assert!(matches!(err, MarqueeError::Validation(_)));
    }
}
