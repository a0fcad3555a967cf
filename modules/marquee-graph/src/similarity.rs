use std::collections::HashSet;

use tracing::{debug, info};

use marquee_common::{MarqueeError, MovieRecord, SimilarityEdge, DEFAULT_SIMILARITY_THRESHOLD};

/// Tolerance for the weights-sum-to-one check.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Weights of the four composite sub-scores. Must be non-negative and sum to 1
/// so the composite stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub overview: f64,
    pub director: f64,
    pub genre: f64,
    pub stars: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            overview: 0.4,
            director: 0.2,
            genre: 0.2,
            stars: 0.2,
        }
    }
}

impl SimilarityWeights {
    pub fn validate(&self) -> Result<(), MarqueeError> {
        let all = [self.overview, self.director, self.genre, self.stars];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(MarqueeError::Validation(format!(
                "similarity weights must be non-negative, got {self:?}"
            )));
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(MarqueeError::Validation(format!(
                "similarity weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// The four bounded sub-scores for one movie pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScores {
    pub overview: f64,
    pub director: f64,
    pub genre: f64,
    pub stars: f64,
}

impl PairScores {
    pub fn composite(&self, w: &SimilarityWeights) -> f64 {
        let score = w.overview * self.overview
            + w.director * self.director
            + w.genre * self.genre
            + w.stars * self.stars;
        score.clamp(0.0, 1.0)
    }
}

/// Builds SIMILAR_TO weighted edges between movies from a composite of
/// synopsis cosine similarity, director match, and genre/cast Jaccard overlap.
///
/// Every pair gets the full composite; there is no early exit on the
/// embedding score alone, so a pair with weak synopsis similarity can still
/// clear the threshold on shared director, genres and cast.
pub struct SimilarityBuilder {
    weights: SimilarityWeights,
    threshold: f64,
}

/// Per-movie features prepared once before the pairwise loop.
struct MovieFeatures<'a> {
    title: &'a str,
    director: &'a str,
    genres: HashSet<&'a str>,
    stars: HashSet<&'a str>,
    embedding: &'a [f32],
    norm: f64,
}

impl SimilarityBuilder {
    pub fn new(weights: SimilarityWeights, threshold: f64) -> Result<Self, MarqueeError> {
        weights.validate()?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MarqueeError::Validation(format!(
                "similarity threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(Self { weights, threshold })
    }

    pub fn with_threshold(threshold: f64) -> Result<Self, MarqueeError> {
        Self::new(SimilarityWeights::default(), threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn weights(&self) -> &SimilarityWeights {
        &self.weights
    }

    /// Compare every unordered pair of movies and keep those whose composite
    /// score is at least the threshold. `embeddings[i]` belongs to `movies[i]`.
    pub fn build_edges(
        &self,
        movies: &[MovieRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<SimilarityEdge>, MarqueeError> {
        if movies.len() != embeddings.len() {
            return Err(MarqueeError::Validation(format!(
                "{} movies but {} embeddings",
                movies.len(),
                embeddings.len()
            )));
        }

        let features: Vec<MovieFeatures<'_>> = movies
            .iter()
            .zip(embeddings)
            .map(|(m, e)| MovieFeatures {
                title: m.title.as_str(),
                director: m.director.trim(),
                genres: m.genres.iter().map(String::as_str).collect(),
                stars: m.stars.iter().map(String::as_str).collect(),
                embedding: e.as_slice(),
                norm: norm(e),
            })
            .collect();

        let count = features.len();
        info!(movies = count, "Computing pairwise similarity");

        let mut edges = Vec::new();
        let mut pairs = 0u64;

        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = (&features[i], &features[j]);
                // Duplicate catalog rows collapse onto one node; never self-link it
                if a.title == b.title {
                    continue;
                }
                pairs += 1;

                let weight = pair_scores(a, b).composite(&self.weights);
                if weight >= self.threshold {
                    edges.push(SimilarityEdge {
                        title_a: a.title.to_string(),
                        title_b: b.title.to_string(),
                        weight,
                    });
                }
            }
        }

        debug!(pairs, "Evaluated movie pairs");
        info!(
            edges = edges.len(),
            "Computed similarity edges above threshold {}", self.threshold
        );

        Ok(edges)
    }

    /// Score a single pair outside the batch loop.
    pub fn score_pair(&self, a: &MovieRecord, a_emb: &[f32], b: &MovieRecord, b_emb: &[f32]) -> f64 {
        let fa = MovieFeatures {
            title: &a.title,
            director: a.director.trim(),
            genres: a.genres.iter().map(String::as_str).collect(),
            stars: a.stars.iter().map(String::as_str).collect(),
            embedding: a_emb,
            norm: norm(a_emb),
        };
        let fb = MovieFeatures {
            title: &b.title,
            director: b.director.trim(),
            genres: b.genres.iter().map(String::as_str).collect(),
            stars: b.stars.iter().map(String::as_str).collect(),
            embedding: b_emb,
            norm: norm(b_emb),
        };
        pair_scores(&fa, &fb).composite(&self.weights)
    }
}

impl Default for SimilarityBuilder {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

fn pair_scores(a: &MovieFeatures<'_>, b: &MovieFeatures<'_>) -> PairScores {
    PairScores {
        overview: cosine_similarity(a.embedding, b.embedding, a.norm, b.norm).clamp(0.0, 1.0),
        director: director_similarity(a.director, b.director),
        genre: jaccard(&a.genres, &b.genres),
        stars: jaccard(&a.stars, &b.stars),
    }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt()
}

/// Cosine similarity with precomputed norms. Zero vectors and mismatched
/// dimensions score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32], norm_a: f64, norm_b: f64) -> f64 {
    if a.len() != b.len() || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    dot / (norm_a * norm_b)
}

/// 1.0 when both directors are present and equal.
pub fn director_similarity(a: &str, b: &str) -> f64 {
    if !a.is_empty() && a == b {
        1.0
    } else {
        0.0
    }
}

/// |A ∩ B| / |A ∪ B|, defined as 0 when both sets are empty.
pub fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, director: &str, genres: &[&str], stars: &[&str]) -> MovieRecord {
        MovieRecord {
            title: title.to_string(),
            director: director.to_string(),
            genres: genres.iter().map(|s| s.to_string()).collect(),
            stars: stars.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn set<'a>(items: &[&'a str]) -> HashSet<&'a str> {
        items.iter().copied().collect()
    }

    /// Unit vector at angle theta; cos(theta_a - theta_b) is the similarity.
    fn unit(theta: f64) -> Vec<f32> {
        vec![theta.cos() as f32, theta.sin() as f32]
    }

    // --- sub-score tests ---

    #[test]
    fn jaccard_of_two_empty_sets_is_zero() {
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        assert_eq!(jaccard(&set(&["Drama", "Crime"]), &set(&["Crime", "Drama"])), 1.0);
    }

    #[test]
    fn jaccard_partial_overlap() {
        let sim = jaccard(&set(&["Drama", "Crime"]), &set(&["Drama", "Action", "Thriller"]));
        assert!((sim - 0.25).abs() < 1e-12);
    }

    #[test]
    fn jaccard_one_empty_side_is_zero() {
        assert_eq!(jaccard(&set(&["Drama"]), &set(&[])), 0.0);
    }

    #[test]
    fn director_match_requires_non_empty_name() {
        assert_eq!(director_similarity("Nolan", "Nolan"), 1.0);
        assert_eq!(director_similarity("Nolan", "Fincher"), 0.0);
        assert_eq!(director_similarity("", ""), 0.0);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let a = [1.0f32, 2.0];
        let b = [0.0f32, 0.0];
        assert_eq!(cosine_similarity(&a, &b, norm(&a), norm(&b)), 0.0);
    }

    #[test]
    fn cosine_of_mismatched_dimensions_is_zero() {
        let a = [1.0f32, 0.0];
        let b = [1.0f32, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b, norm(&a), norm(&b)), 0.0);
    }

    #[test]
    fn identical_vectors_similarity_is_one() {
        let a = [0.3f32, 0.4, 0.5];
        assert!((cosine_similarity(&a, &a, norm(&a), norm(&a)) - 1.0).abs() < 1e-6);
    }

    // --- weights ---

    #[test]
    fn default_weights_are_valid() {
        assert!(SimilarityWeights::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let w = SimilarityWeights {
            overview: 0.5,
            director: 0.2,
            genre: 0.2,
            stars: 0.2,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let w = SimilarityWeights {
            overview: 1.2,
            director: -0.2,
            genre: 0.0,
            stars: 0.0,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        assert!(SimilarityBuilder::with_threshold(1.1).is_err());
        assert!(SimilarityBuilder::with_threshold(-0.1).is_err());
    }

    // --- composite ---

    #[test]
    fn same_director_and_genres_with_half_overview_scores_point_six() {
        let builder = SimilarityBuilder::default();
        let a = movie("A", "Sidney Lumet", &["Drama", "Crime"], &["Henry Fonda"]);
        let b = movie("B", "Sidney Lumet", &["Crime", "Drama"], &["Al Pacino"]);
        // cos(60°) = 0.5
        let edges = builder
            .build_edges(&[a, b], &[unit(0.0), unit(std::f64::consts::FRAC_PI_3)])
            .unwrap();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].title_a, "A");
        assert_eq!(edges[0].title_b, "B");
        assert!((edges[0].weight - 0.60).abs() < 1e-6);
    }

    #[test]
    fn composite_is_the_weighted_sum_of_sub_scores() {
        let w = SimilarityWeights::default();
        let scores = PairScores {
            overview: 0.8,
            director: 0.0,
            genre: 0.5,
            stars: 0.25,
        };
        let expected = 0.4 * 0.8 + 0.2 * 0.0 + 0.2 * 0.5 + 0.2 * 0.25;
        assert!((scores.composite(&w) - expected).abs() < 1e-12);
    }

    #[test]
    fn low_overview_pair_is_kept_when_categorical_signals_are_strong() {
        let builder = SimilarityBuilder::default();
        let a = movie("A", "Nolan", &["Sci-Fi"], &["Caine"]);
        let b = movie("B", "Nolan", &["Sci-Fi"], &["Caine"]);
        // Orthogonal synopses: overview contributes nothing
        let edges = builder
            .build_edges(&[a, b], &[unit(0.0), unit(std::f64::consts::FRAC_PI_2)])
            .unwrap();
        assert_eq!(edges.len(), 1);
        assert!((edges[0].weight - 0.6).abs() < 1e-6);
    }

    #[test]
    fn pair_below_threshold_is_dropped() {
        let builder = SimilarityBuilder::default();
        let a = movie("A", "X", &["Drama"], &[]);
        let b = movie("B", "Y", &["Comedy"], &[]);
        let edges = builder
            .build_edges(&[a, b], &[unit(0.0), unit(std::f64::consts::FRAC_PI_3)])
            .unwrap();
        // 0.4 * 0.5 = 0.2
        assert!(edges.is_empty());
    }

    #[test]
    fn negative_cosine_is_clamped_to_zero() {
        let builder = SimilarityBuilder::with_threshold(0.0).unwrap();
        let a = movie("A", "", &[], &[]);
        let b = movie("B", "", &[], &[]);
        let score = builder.score_pair(&a, &unit(0.0), &b, &unit(std::f64::consts::PI));
        assert_eq!(score, 0.0);
    }

    #[test]
    fn composite_stays_in_unit_interval() {
        let builder = SimilarityBuilder::with_threshold(0.0).unwrap();
        let a = movie("A", "D", &["G1", "G2"], &["S1", "S2"]);
        let b = movie("B", "D", &["G1", "G2"], &["S1", "S2"]);
        let score = builder.score_pair(&a, &unit(0.1), &b, &unit(0.1));
        assert!((0.0..=1.0).contains(&score));
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn duplicate_titles_never_form_a_self_edge() {
        let builder = SimilarityBuilder::with_threshold(0.0).unwrap();
        let movies = vec![
            movie("Heat", "Mann", &["Crime"], &["De Niro"]),
            movie("Heat", "Mann", &["Crime"], &["De Niro"]),
            movie("Collateral", "Mann", &["Crime"], &["Cruise"]),
        ];
        let embeddings = vec![unit(0.0), unit(0.0), unit(0.2)];
        let edges = builder.build_edges(&movies, &embeddings).unwrap();

        assert!(edges.iter().all(|e| e.title_a != e.title_b));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn every_unordered_pair_is_evaluated_once() {
        let builder = SimilarityBuilder::with_threshold(0.0).unwrap();
        let movies: Vec<MovieRecord> = (0..5)
            .map(|i| movie(&format!("M{i}"), "", &[], &[]))
            .collect();
        let embeddings: Vec<Vec<f32>> = (0..5).map(|i| unit(i as f64 * 0.1)).collect();
        let edges = builder.build_edges(&movies, &embeddings).unwrap();
        assert_eq!(edges.len(), 10);
    }

    #[test]
    fn embedding_count_mismatch_is_an_error() {
        let builder = SimilarityBuilder::default();
        let movies = vec![movie("A", "", &[], &[])];
        assert!(builder.build_edges(&movies, &[]).is_err());
    }

    #[test]
    fn empty_director_and_sets_contribute_nothing() {
        let builder = SimilarityBuilder::with_threshold(0.0).unwrap();
        let a = movie("A", "  ", &[], &[]);
        let b = movie("B", "  ", &[], &[]);
        let score = builder.score_pair(&a, &unit(0.0), &b, &unit(0.0));
        assert!((score - 0.4).abs() < 1e-6);
    }
}
