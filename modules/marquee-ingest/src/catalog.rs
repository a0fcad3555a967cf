//! CSV catalog loading.
//!
//! The file is the IMDB top-1000 layout: one movie per row, genres as a
//! comma-separated list inside a single quoted field, and up to four star
//! columns. Unknown columns are ignored and missing ones read as empty.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use marquee_common::{MarqueeError, MovieRecord};

/// Raw row exactly as it appears in the file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    #[serde(rename = "Series_Title")]
    title: String,
    #[serde(rename = "Released_Year")]
    released_year: String,
    #[serde(rename = "Certificate")]
    certificate: String,
    #[serde(rename = "Runtime")]
    runtime: String,
    #[serde(rename = "IMDB_Rating")]
    imdb_rating: String,
    #[serde(rename = "Meta_score")]
    meta_score: String,
    #[serde(rename = "No_of_Votes")]
    no_of_votes: String,
    #[serde(rename = "Gross")]
    gross: String,
    #[serde(rename = "Overview")]
    overview: String,
    #[serde(rename = "Director")]
    director: String,
    #[serde(rename = "Genre")]
    genre: String,
    #[serde(rename = "Star1")]
    star1: String,
    #[serde(rename = "Star2")]
    star2: String,
    #[serde(rename = "Star3")]
    star3: String,
    #[serde(rename = "Star4")]
    star4: String,
}

impl CsvRow {
    fn into_record(self) -> MovieRecord {
        let stars = [self.star1, self.star2, self.star3, self.star4]
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        MovieRecord {
            title: self.title.trim().to_string(),
            released_year: parse_int(&self.released_year),
            certificate: self.certificate.trim().to_string(),
            runtime: self.runtime.trim().to_string(),
            imdb_rating: parse_float(&self.imdb_rating),
            meta_score: parse_int(&self.meta_score),
            no_of_votes: parse_int(&self.no_of_votes),
            gross: parse_float(&self.gross),
            overview: self.overview.trim().to_string(),
            director: self.director.trim().to_string(),
            genres: split_genres(&self.genre),
            stars,
        }
    }
}

/// Load and clean every movie in the file at `path`.
pub fn load_path(path: &Path) -> Result<Vec<MovieRecord>, MarqueeError> {
    let file = std::fs::File::open(path).map_err(|e| {
        MarqueeError::Csv(format!("Failed to open {}: {e}", path.display()))
    })?;
    let movies = load_reader(file)?;
    info!(path = %path.display(), movies = movies.len(), "Catalog loaded");
    Ok(movies)
}

/// Load movies from any CSV source with a header row.
///
/// Rows without a title are skipped. When a title appears more than once the
/// last row wins but keeps the position of the first.
pub fn load_reader<R: io::Read>(source: R) -> Result<Vec<MovieRecord>, MarqueeError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(source);

    let mut movies: Vec<MovieRecord> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut untitled = 0usize;

    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let row = row.map_err(|e| MarqueeError::Csv(format!("line {}: {e}", i + 2)))?;
        let record = row.into_record();
        if record.title.is_empty() {
            untitled += 1;
            continue;
        }
        match position.get(&record.title) {
            Some(&at) => {
                warn!(title = record.title.as_str(), "Duplicate title, keeping the later row");
                movies[at] = record;
            }
            None => {
                position.insert(record.title.clone(), movies.len());
                movies.push(record);
            }
        }
    }

    if untitled > 0 {
        warn!(rows = untitled, "Skipped rows without a title");
    }
    Ok(movies)
}

/// Split the genre field on commas, dropping blanks and repeats.
fn split_genres(raw: &str) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for g in raw.split(',').map(str::trim).filter(|g| !g.is_empty()) {
        if !genres.iter().any(|existing| existing == g) {
            genres.push(g.to_string());
        }
    }
    genres
}

/// Integer with thousands separators allowed. Decimal input is truncated;
/// anything non-numeric is `None`.
fn parse_int(raw: &str) -> Option<i64> {
    let cleaned = strip_separators(raw);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<i64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

fn parse_float(raw: &str) -> Option<f64> {
    let cleaned = strip_separators(raw);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn strip_separators(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != ',').collect()
}
