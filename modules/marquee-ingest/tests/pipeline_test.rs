#![cfg(feature = "test-utils")]

// End-to-end ingestion runs against a real Neo4j.
//
// Requirements: Docker (for Neo4j via testcontainers)
//
// Run with: cargo test -p marquee-ingest --features test-utils --test pipeline_test

use marquee_common::{MovieRecord, TextEmbedder};
use marquee_graph::migrate::migrate;
use marquee_graph::{GraphClient, MovieCatalog, MovieReader};
use marquee_ingest::{pipeline, IngestOptions};
use testcontainers::{ContainerAsync, GenericImage};

/// Heist plots point one way, everything else the other.
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

fn movie(title: &str, overview: &str, director: &str, genre: &str) -> MovieRecord {
    MovieRecord {
        title: title.to_string(),
        overview: overview.to_string(),
        director: director.to_string(),
        genres: vec![genre.to_string()],
        imdb_rating: Some(8.0),
        ..Default::default()
    }
}

fn crime_catalog() -> Vec<MovieRecord> {
    vec![
        movie("Heat", "A heist goes wrong.", "Michael Mann", "Crime"),
        movie("Thief", "One last heist.", "Michael Mann", "Crime"),
    ]
}

fn animation_catalog() -> Vec<MovieRecord> {
    vec![
        movie("Up", "A house flies away.", "Pete Docter", "Animation"),
        movie("Ratatouille", "A rat learns to cook.", "Brad Bird", "Animation"),
    ]
}

fn options(communities: bool) -> IngestOptions {
    IngestOptions {
        threshold: 0.4,
        communities,
        seed: Some(7),
        rebuild_edges: false,
        skip_edges: false,
    }
}

async fn setup() -> (ContainerAsync<GenericImage>, GraphClient) {
    let (container, client) = marquee_graph::testutil::neo4j_container().await;
    migrate(&client).await.expect("migrate");
    (container, client)
}

fn peers(recs: Vec<marquee_common::CommunityRecommendation>) -> Vec<String> {
    let mut titles: Vec<String> = recs.into_iter().map(|r| r.title).collect();
    titles.sort();
    titles
}

#[tokio::test]
async fn second_catalog_keeps_first_catalog_communities() {
    let (_c, client) = setup().await;
    let reader = MovieReader::new(client.clone());

    let first = pipeline::run(&client, &KeywordEmbedder, &crime_catalog(), &options(true))
        .await
        .unwrap();
    assert_eq!(first.communities, Some(1));
    assert_eq!(peers(reader.by_community("Heat").await.unwrap()), vec!["Thief"]);

    let second = pipeline::run(&client, &KeywordEmbedder, &animation_catalog(), &options(true))
        .await
        .unwrap();
    assert_eq!(second.communities, Some(2));
    assert_eq!(second.counts.movies, 4);

    assert_eq!(peers(reader.by_community("Heat").await.unwrap()), vec!["Thief"]);
    assert_eq!(peers(reader.by_community("Up").await.unwrap()), vec!["Ratatouille"]);
}

#[tokio::test]
async fn communities_use_stored_edges_when_edges_are_skipped() {
    let (_c, client) = setup().await;
    let reader = MovieReader::new(client.clone());

    pipeline::run(&client, &KeywordEmbedder, &crime_catalog(), &options(false))
        .await
        .unwrap();
    assert!(reader.by_community("Heat").await.unwrap().is_empty());

    let opts = IngestOptions {
        skip_edges: true,
        ..options(true)
    };
    let report = pipeline::run(&client, &KeywordEmbedder, &crime_catalog(), &opts)
        .await
        .unwrap();

    assert_eq!(report.edges.written, 0);
    assert_eq!(report.communities, Some(1));
    assert_eq!(peers(reader.by_community("Thief").await.unwrap()), vec!["Heat"]);
}
