use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marquee_common::Config;
use marquee_graph::{migrate::migrate, GraphClient};
use marquee_ingest::{catalog, pipeline, HttpEmbedder, IngestOptions};

/// Load a movie catalog CSV into Neo4j and link similar movies.
#[derive(Parser, Debug)]
#[command(name = "ingest", version)]
struct Args {
    /// Path to the catalog CSV (IMDB top-1000 layout)
    csv: PathBuf,

    /// Minimum composite similarity for a SIMILAR_TO edge (defaults to SIMILARITY_THRESHOLD)
    #[arg(long)]
    threshold: Option<f64>,

    /// Run community detection over the whole stored graph and annotate movies
    #[arg(long)]
    communities: bool,

    /// Seed for community detection tie-breaking
    #[arg(long)]
    seed: Option<u64>,

    /// Delete every existing SIMILAR_TO edge before writing the new ones
    #[arg(long, conflicts_with = "skip_edges")]
    rebuild_edges: bool,

    /// Load movies only; no embeddings and no similarity edges
    #[arg(long)]
    skip_edges: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("marquee=info".parse()?))
        .init();

    let args = Args::parse();
    info!("Marquee ingest starting...");

    let config = Config::ingest_from_env()?;
    config.log_redacted();

    let movies = catalog::load_path(&args.csv)?;

    let client =
        GraphClient::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password)
            .await?;
    migrate(&client).await?;

    let embedder = HttpEmbedder::new(&config.embedding_api_url, &config.embedding_model)
        .with_api_key(config.embedding_api_key.clone());

    let opts = IngestOptions {
        threshold: args.threshold.unwrap_or(config.similarity_threshold),
        communities: args.communities,
        seed: args.seed,
        rebuild_edges: args.rebuild_edges,
        skip_edges: args.skip_edges,
    };

    let report = pipeline::run(&client, &embedder, &movies, &opts).await?;
    info!(
        movies = report.movies,
        edges_written = report.edges.written,
        edges_skipped = report.edges.skipped,
        communities = report.communities,
        "Done: {}",
        report.counts
    );
    Ok(())
}
