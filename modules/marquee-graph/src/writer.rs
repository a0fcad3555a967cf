use neo4rs::{query, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType};
use tracing::{info, warn};

use marquee_common::{MovieRecord, SimilarityEdge};

use crate::GraphClient;

/// Batch size for UNWIND writes.
const WRITE_BATCH_SIZE: usize = 500;

/// Write-side wrapper for the graph. Used by the ingest binary only.
///
/// Every write is an idempotent MERGE keyed by the unique attribute
/// (movie title, person name, genre name), so re-running an ingest with the
/// same input leaves the graph unchanged.
#[derive(Clone)]
pub struct GraphWriter {
    client: GraphClient,
}

/// Outcome of writing similarity edges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeWriteStats {
    pub written: u64,
    pub skipped: u64,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Upsert movie nodes with their genre, director and cast relationships.
    /// Returns the number of movie rows written.
    pub async fn upsert_movies(&self, movies: &[MovieRecord]) -> Result<u64, neo4rs::Error> {
        let mut total = 0u64;
        for batch in movies.chunks(WRITE_BATCH_SIZE) {
            let rows: Vec<BoltType> = batch.iter().map(movie_row).collect();

            let q = query(
                "UNWIND $rows AS row
                 MERGE (m:Movie {title: row.title})
                   SET m.released_year = row.released_year,
                       m.certificate   = row.certificate,
                       m.runtime       = row.runtime,
                       m.imdb_rating   = row.imdb_rating,
                       m.meta_score    = row.meta_score,
                       m.no_of_votes   = row.no_of_votes,
                       m.gross         = row.gross,
                       m.overview      = row.overview
                 FOREACH (g_name IN row.genres |
                   MERGE (g:Genre {name: g_name})
                   MERGE (m)-[:HAS_GENRE]->(g)
                 )
                 FOREACH (d_name IN row.directors |
                   MERGE (d:Person {name: d_name})
                   MERGE (m)-[:DIRECTED_BY]->(d)
                 )
                 FOREACH (s_name IN row.stars |
                   MERGE (s:Person {name: s_name})
                   MERGE (m)-[:STARRING]->(s)
                 )
                 RETURN count(m) AS written",
            )
            .param("rows", rows);

            total += self.execute_count(q, "written").await?;
        }

        info!(movies = total, "Movie nodes upserted");
        Ok(total)
    }

    /// Upsert undirected SIMILAR_TO edges, overwriting the weight on conflict.
    /// Edges whose endpoints are not in the graph are skipped and counted.
    pub async fn upsert_similarity_edges(
        &self,
        edges: &[SimilarityEdge],
    ) -> Result<EdgeWriteStats, neo4rs::Error> {
        let mut stats = EdgeWriteStats::default();

        for batch in edges.chunks(WRITE_BATCH_SIZE) {
            let edge_data: Vec<BoltType> = batch
                .iter()
                .map(|e| {
                    bolt_map(vec![
                        ("title_a", string(&e.title_a)),
                        ("title_b", string(&e.title_b)),
                        ("weight", BoltType::Float(BoltFloat::new(e.weight))),
                    ])
                })
                .collect();

            let q = query(
                "UNWIND $edges AS edge
                 MATCH (a:Movie {title: edge.title_a})
                 MATCH (b:Movie {title: edge.title_b})
                 WHERE a <> b
                 MERGE (a)-[r:SIMILAR_TO]-(b)
                 SET r.weight = edge.weight
                 RETURN count(r) AS written",
            )
            .param("edges", edge_data);

            let written = self.execute_count(q, "written").await?;
            let skipped = (batch.len() as u64).saturating_sub(written);
            if skipped > 0 {
                warn!(skipped, "Similarity edges skipped: endpoint movie not found");
            }
            stats.written += written;
            stats.skipped += skipped;
        }

        info!(
            written = stats.written,
            skipped = stats.skipped,
            "SIMILAR_TO edges written"
        );
        Ok(stats)
    }

    /// Remove all existing SIMILAR_TO edges (full edge rebuild).
    pub async fn clear_similarity_edges(&self) -> Result<u64, neo4rs::Error> {
        let q = query(
            "MATCH ()-[e:SIMILAR_TO]->()
             DELETE e
             RETURN count(e) AS deleted",
        );
        let deleted = self.execute_count(q, "deleted").await?;
        info!(deleted, "Cleared existing SIMILAR_TO edges");
        Ok(deleted)
    }

    /// Drop every community annotation so a fresh detection run leaves no
    /// stale ids behind.
    pub async fn clear_communities(&self) -> Result<u64, neo4rs::Error> {
        let q = query(
            "MATCH (m:Movie) WHERE m.community IS NOT NULL
             REMOVE m.community
             RETURN count(m) AS cleared",
        );
        let cleared = self.execute_count(q, "cleared").await?;
        info!(cleared, "Cleared community annotations");
        Ok(cleared)
    }

    /// Write `(title, community id)` annotations. Returns how many movies matched.
    pub async fn set_communities(&self, assignments: &[(String, i64)]) -> Result<u64, neo4rs::Error> {
        let mut total = 0u64;
        for batch in assignments.chunks(WRITE_BATCH_SIZE) {
            let rows: Vec<BoltType> = batch
                .iter()
                .map(|(title, community)| {
                    bolt_map(vec![
                        ("title", string(title)),
                        ("community", BoltType::Integer(BoltInteger::new(*community))),
                    ])
                })
                .collect();

            let q = query(
                "UNWIND $rows AS row
                 MATCH (m:Movie {title: row.title})
                 SET m.community = row.community
                 RETURN count(m) AS updated",
            )
            .param("rows", rows);

            total += self.execute_count(q, "updated").await?;
        }

        info!(movies = total, "Community annotations written");
        Ok(total)
    }

    async fn execute_count(&self, q: neo4rs::Query, column: &str) -> Result<u64, neo4rs::Error> {
        let mut stream = self.client.graph.execute(q).await?;
        let mut count = 0u64;
        while let Some(row) = stream.next().await? {
            let n: i64 = row.get(column).unwrap_or(0);
            count += n.max(0) as u64;
        }
        Ok(count)
    }
}

fn movie_row(m: &MovieRecord) -> BoltType {
    let directors: Vec<&str> = if m.director.trim().is_empty() {
        Vec::new()
    } else {
        vec![m.director.trim()]
    };

    bolt_map(vec![
        ("title", string(&m.title)),
        ("released_year", opt_int(m.released_year)),
        ("certificate", string(&m.certificate)),
        ("runtime", string(&m.runtime)),
        ("imdb_rating", opt_float(m.imdb_rating)),
        ("meta_score", opt_int(m.meta_score)),
        ("no_of_votes", opt_int(m.no_of_votes)),
        ("gross", opt_float(m.gross)),
        ("overview", string(&m.overview)),
        ("genres", string_list(m.genres.iter().map(String::as_str))),
        ("directors", string_list(directors)),
        ("stars", string_list(m.stars.iter().map(String::as_str))),
    ])
}

fn bolt_map(pairs: Vec<(&str, BoltType)>) -> BoltType {
    BoltType::Map(BoltMap::from_iter(
        pairs
            .into_iter()
            .map(|(k, v)| (BoltString::from(k), v)),
    ))
}

fn string(s: &str) -> BoltType {
    BoltType::String(BoltString::from(s))
}

fn string_list<'a>(items: impl IntoIterator<Item = &'a str>) -> BoltType {
    let mut list = BoltList::new();
    for item in items {
        list.push(string(item));
    }
    BoltType::List(list)
}

fn opt_int(v: Option<i64>) -> BoltType {
    match v {
        Some(n) => BoltType::Integer(BoltInteger::new(n)),
        None => BoltType::Null(BoltNull),
    }
}

fn opt_float(v: Option<f64>) -> BoltType {
    match v {
        Some(f) => BoltType::Float(BoltFloat::new(f)),
        None => BoltType::Null(BoltNull),
    }
}
