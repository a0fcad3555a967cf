use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use marquee_common::{
    CommunityRecommendation, GenreRecommendation, GraphCounts, PeopleRecommendation,
    PlotRecommendation, Recommendations,
};

use crate::cache::{TitleCache, TitleSnapshot, TtlCache};
use crate::reader::MovieCatalog;

/// Process-wide recommendation context: one catalog connection plus the title
/// and per-query caches. Built once at startup and shared by the web layer.
pub struct RecommendationService {
    catalog: Arc<dyn MovieCatalog>,
    titles: TitleCache,
    genre: TtlCache<String, Vec<GenreRecommendation>>,
    people: TtlCache<String, Vec<PeopleRecommendation>>,
    community: TtlCache<String, Vec<CommunityRecommendation>>,
    plot: TtlCache<String, Vec<PlotRecommendation>>,
}

impl RecommendationService {
    pub fn new(catalog: Arc<dyn MovieCatalog>, title_ttl: Duration, query_ttl: Duration) -> Self {
        Self {
            catalog,
            titles: TitleCache::new(title_ttl),
            genre: TtlCache::new(query_ttl),
            people: TtlCache::new(query_ttl),
            community: TtlCache::new(query_ttl),
            plot: TtlCache::new(query_ttl),
        }
    }

    /// Load the title list eagerly so the first request does not pay for it.
    pub async fn warm(&self) -> Result<usize, neo4rs::Error> {
        let snap = self.titles.reload(self.catalog.as_ref()).await?;
        Ok(snap.titles.len())
    }

    pub async fn titles(&self) -> Result<Arc<TitleSnapshot>, neo4rs::Error> {
        self.titles.get(self.catalog.as_ref()).await
    }

    pub async fn by_shared_genre(
        &self,
        title: &str,
    ) -> Result<Vec<GenreRecommendation>, neo4rs::Error> {
        self.genre
            .get_or_try_load(title.to_string(), || self.catalog.by_shared_genre(title))
            .await
    }

    pub async fn by_shared_people(
        &self,
        title: &str,
    ) -> Result<Vec<PeopleRecommendation>, neo4rs::Error> {
        self.people
            .get_or_try_load(title.to_string(), || self.catalog.by_shared_people(title))
            .await
    }

    pub async fn by_community(
        &self,
        title: &str,
    ) -> Result<Vec<CommunityRecommendation>, neo4rs::Error> {
        self.community
            .get_or_try_load(title.to_string(), || self.catalog.by_community(title))
            .await
    }

    pub async fn by_plot_similarity(
        &self,
        title: &str,
    ) -> Result<Vec<PlotRecommendation>, neo4rs::Error> {
        self.plot
            .get_or_try_load(title.to_string(), || self.catalog.by_plot_similarity(title))
            .await
    }

    /// Run all four recommendation queries for one title.
    pub async fn recommend(&self, title: &str) -> Result<Recommendations, neo4rs::Error> {
        let (by_genre, by_people, by_community, by_plot) = tokio::try_join!(
            self.by_shared_genre(title),
            self.by_shared_people(title),
            self.by_community(title),
            self.by_plot_similarity(title),
        )?;

        let recs = Recommendations {
            title: title.to_string(),
            by_genre,
            by_people,
            by_community,
            by_plot,
        };
        if recs.is_empty() {
            info!(title, "No recommendations found");
        } else {
            debug!(
                title,
                genre = recs.by_genre.len(),
                people = recs.by_people.len(),
                community = recs.by_community.len(),
                plot = recs.by_plot.len(),
                "Recommendations served"
            );
        }
        Ok(recs)
    }

    /// Uncached node/edge totals.
    pub async fn counts(&self) -> Result<GraphCounts, neo4rs::Error> {
        self.catalog.counts().await
    }
}
