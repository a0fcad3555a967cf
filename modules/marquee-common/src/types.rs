use serde::{Deserialize, Serialize};

/// Number of rows returned by each recommendation query.
pub const RECOMMENDATION_LIMIT: i64 = 5;

/// Default composite similarity threshold for SIMILAR_TO edges.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.4;

// --- Ingestion Types ---

/// One catalog row, cleaned and ready to be written to the graph.
///
/// Genres and stars are already split, trimmed and stripped of empties, so an
/// empty slot in the source file never turns into a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    pub released_year: Option<i64>,
    pub certificate: String,
    pub runtime: String,
    pub imdb_rating: Option<f64>,
    pub meta_score: Option<i64>,
    pub no_of_votes: Option<i64>,
    pub gross: Option<f64>,
    pub overview: String,
    pub director: String,
    pub genres: Vec<String>,
    pub stars: Vec<String>,
}

/// Undirected weighted similarity between two distinct movies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityEdge {
    pub title_a: String,
    pub title_b: String,
    pub weight: f64,
}

// --- Read Types ---

/// Recommended movie sharing one or more genres with the queried title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecommendation {
    pub title: String,
    pub rating: Option<f64>,
    pub overview: String,
    pub shared_genres: Vec<String>,
}

/// Recommended movie sharing a director or cast member with the queried title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleRecommendation {
    pub title: String,
    pub rating: Option<f64>,
    pub overview: String,
    pub shared_people: Vec<String>,
}

/// Recommended movie from the same community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityRecommendation {
    pub title: String,
    pub rating: Option<f64>,
    pub overview: String,
}

/// Recommended movie connected by a SIMILAR_TO edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRecommendation {
    pub title: String,
    pub rating: Option<f64>,
    pub overview: String,
    pub score: f64,
}

/// All four recommendation lists for one title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub title: String,
    pub by_genre: Vec<GenreRecommendation>,
    pub by_people: Vec<PeopleRecommendation>,
    pub by_community: Vec<CommunityRecommendation>,
    pub by_plot: Vec<PlotRecommendation>,
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        self.by_genre.is_empty()
            && self.by_people.is_empty()
            && self.by_community.is_empty()
            && self.by_plot.is_empty()
    }
}

/// Node and relationship totals, used for ingest summaries and health checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub movies: u64,
    pub people: u64,
    pub genres: u64,
    pub similarity_edges: u64,
}

impl std::fmt::Display for GraphCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} movies, {} people, {} genres, {} similarity edges",
            self.movies, self.people, self.genres, self.similarity_edges
        )
    }
}
