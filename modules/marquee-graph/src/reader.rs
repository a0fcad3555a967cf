use neo4rs::{query, Row};

use marquee_common::{
    CommunityRecommendation, GenreRecommendation, GraphCounts, PeopleRecommendation,
    PlotRecommendation, SimilarityEdge, RECOMMENDATION_LIMIT,
};

use crate::GraphClient;

/// Read interface behind the recommendation service. Every recommendation
/// query excludes the queried movie and returns at most five rows.
/// Unrated movies rank below rated ones on rating ties.
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// All movie titles, sorted.
    async fn all_titles(&self) -> Result<Vec<String>, neo4rs::Error>;

    /// Movies sharing at least one genre, most shared genres first, then rating.
    async fn by_shared_genre(&self, title: &str) -> Result<Vec<GenreRecommendation>, neo4rs::Error>;

    /// Movies sharing a director or cast member, most shared people first, then rating.
    async fn by_shared_people(
        &self,
        title: &str,
    ) -> Result<Vec<PeopleRecommendation>, neo4rs::Error>;

    /// Movies in the same community, in store order.
    async fn by_community(
        &self,
        title: &str,
    ) -> Result<Vec<CommunityRecommendation>, neo4rs::Error>;

    /// SIMILAR_TO neighbours, strongest edge first.
    async fn by_plot_similarity(
        &self,
        title: &str,
    ) -> Result<Vec<PlotRecommendation>, neo4rs::Error>;

    async fn counts(&self) -> Result<GraphCounts, neo4rs::Error>;
}

/// Neo4j-backed catalog. Used by the web server.
#[derive(Clone)]
pub struct MovieReader {
    client: GraphClient,
}

impl MovieReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    async fn fetch<T: Send>(
        &self,
        q: neo4rs::Query,
        map: impl Fn(&Row) -> Option<T> + Send,
    ) -> Result<Vec<T>, neo4rs::Error> {
        let mut results = Vec::new();
        let mut stream = self.client.graph.execute(q).await?;
        while let Some(row) = stream.next().await? {
            if let Some(item) = map(&row) {
                results.push(item);
            }
        }
        Ok(results)
    }

    async fn count(&self, cypher: &str) -> Result<u64, neo4rs::Error> {
        let mut stream = self.client.graph.execute(query(cypher)).await?;
        if let Some(row) = stream.next().await? {
            let n: i64 = row.get("n").unwrap_or(0);
            return Ok(n.max(0) as u64);
        }
        Ok(0)
    }

    /// Every stored SIMILAR_TO edge, once each, in stored direction.
    pub async fn similarity_edges(&self) -> Result<Vec<SimilarityEdge>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Movie)-[r:SIMILAR_TO]->(b:Movie)
             RETURN a.title AS title_a, b.title AS title_b, r.weight AS weight
             ORDER BY title_a, title_b",
        );
        self.fetch(q, |row| {
            Some(SimilarityEdge {
                title_a: row.get("title_a").ok()?,
                title_b: row.get("title_b").ok()?,
                weight: row.get("weight").unwrap_or(0.0),
            })
        })
        .await
    }
}

#[async_trait::async_trait]
impl MovieCatalog for MovieReader {
    async fn all_titles(&self) -> Result<Vec<String>, neo4rs::Error> {
        let q = query("MATCH (m:Movie) RETURN m.title AS title ORDER BY title");
        self.fetch(q, |row| row.get::<String>("title").ok()).await
    }

    async fn by_shared_genre(&self, title: &str) -> Result<Vec<GenreRecommendation>, neo4rs::Error> {
        let q = query(
            "MATCH (m:Movie {title: $title})-[:HAS_GENRE]->(g:Genre)<-[:HAS_GENRE]-(rec:Movie)
             WHERE rec.title <> $title
             WITH rec, collect(DISTINCT g.name) AS shared_genres
             RETURN rec.title AS title, shared_genres,
                    rec.imdb_rating AS rating, rec.overview AS overview
             ORDER BY size(shared_genres) DESC, coalesce(rating, -1.0) DESC, title ASC
             LIMIT $limit",
        )
        .param("title", title)
        .param("limit", RECOMMENDATION_LIMIT);

        self.fetch(q, |row| {
            let (title, rating, overview) = common_fields(row)?;
            let mut shared_genres: Vec<String> = row.get("shared_genres").unwrap_or_default();
            shared_genres.sort();
            Some(GenreRecommendation {
                title,
                rating,
                overview,
                shared_genres,
            })
        })
        .await
    }

    async fn by_shared_people(
        &self,
        title: &str,
    ) -> Result<Vec<PeopleRecommendation>, neo4rs::Error> {
        let q = query(
            "MATCH (m:Movie {title: $title})-[:DIRECTED_BY|STARRING]->(p:Person)<-[:DIRECTED_BY|STARRING]-(rec:Movie)
             WHERE rec.title <> $title
             WITH rec, collect(DISTINCT p.name) AS shared_people
             RETURN rec.title AS title, shared_people,
                    rec.imdb_rating AS rating, rec.overview AS overview
             ORDER BY size(shared_people) DESC, coalesce(rating, -1.0) DESC, title ASC
             LIMIT $limit",
        )
        .param("title", title)
        .param("limit", RECOMMENDATION_LIMIT);

        self.fetch(q, |row| {
            let (title, rating, overview) = common_fields(row)?;
            let mut shared_people: Vec<String> = row.get("shared_people").unwrap_or_default();
            shared_people.sort();
            Some(PeopleRecommendation {
                title,
                rating,
                overview,
                shared_people,
            })
        })
        .await
    }

    async fn by_community(
        &self,
        title: &str,
    ) -> Result<Vec<CommunityRecommendation>, neo4rs::Error> {
        // A movie without a community annotation has no community peers
        let q = query(
            "MATCH (m:Movie {title: $title})
             WHERE m.community IS NOT NULL
             MATCH (rec:Movie {community: m.community})
             WHERE rec.title <> $title
             RETURN rec.title AS title, rec.imdb_rating AS rating, rec.overview AS overview
             LIMIT $limit",
        )
        .param("title", title)
        .param("limit", RECOMMENDATION_LIMIT);

        self.fetch(q, |row| {
            let (title, rating, overview) = common_fields(row)?;
            Some(CommunityRecommendation {
                title,
                rating,
                overview,
            })
        })
        .await
    }

    async fn by_plot_similarity(
        &self,
        title: &str,
    ) -> Result<Vec<PlotRecommendation>, neo4rs::Error> {
        // Edges are stored in one arbitrary direction; match both
        let q = query(
            "MATCH (m:Movie {title: $title})-[r:SIMILAR_TO]-(rec:Movie)
             WHERE rec.title <> $title
             RETURN rec.title AS title, r.weight AS score,
                    rec.imdb_rating AS rating, rec.overview AS overview
             ORDER BY score DESC, title ASC
             LIMIT $limit",
        )
        .param("title", title)
        .param("limit", RECOMMENDATION_LIMIT);

        self.fetch(q, |row| {
            let (title, rating, overview) = common_fields(row)?;
            let score: f64 = row.get("score").unwrap_or(0.0);
            Some(PlotRecommendation {
                title,
                rating,
                overview,
                score,
            })
        })
        .await
    }

    async fn counts(&self) -> Result<GraphCounts, neo4rs::Error> {
        Ok(GraphCounts {
            movies: self.count("MATCH (m:Movie) RETURN count(m) AS n").await?,
            people: self.count("MATCH (p:Person) RETURN count(p) AS n").await?,
            genres: self.count("MATCH (g:Genre) RETURN count(g) AS n").await?,
            similarity_edges: self
                .count("MATCH ()-[r:SIMILAR_TO]->() RETURN count(r) AS n")
                .await?,
        })
    }
}

/// Title, rating and overview shared by every recommendation row. Rows
/// without a title are dropped.
fn common_fields(row: &Row) -> Option<(String, Option<f64>, String)> {
    let title: String = row.get("title").ok()?;
    let rating: Option<f64> = row.get("rating").ok();
    let overview: String = row.get("overview").unwrap_or_default();
    Some((title, rating, overview))
}
