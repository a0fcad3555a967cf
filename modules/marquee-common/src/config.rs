use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::MarqueeError;
use crate::types::DEFAULT_SIMILARITY_THRESHOLD;

const DEFAULT_EMBEDDING_API_URL: &str = "http://localhost:8080/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Neo4j
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Embeddings
    pub embedding_api_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,

    // Similarity
    pub similarity_threshold: f64,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Caches
    pub title_cache_ttl: Duration,
    pub query_cache_ttl: Duration,
}

impl Config {
    /// Load the configuration for the ingestion binary.
    pub fn ingest_from_env() -> Result<Self, MarqueeError> {
        dotenvy::dotenv().ok();
        Self::ingest_from_lookup(|key| env::var(key).ok())
    }

    /// Load a minimal config for the web server (read-only, no embedding
    /// endpoint or similarity threshold needed).
    pub fn web_from_env() -> Result<Self, MarqueeError> {
        dotenvy::dotenv().ok();
        Self::web_from_lookup(|key| env::var(key).ok())
    }

    /// Ingestion settings from an arbitrary key lookup: Neo4j credentials,
    /// the embedding endpoint and the similarity threshold. Web server and
    /// cache keys are not read. Empty values count as unset.
    pub fn ingest_from_lookup<F>(lookup: F) -> Result<Self, MarqueeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let threshold: f64 = parse_or(&get, "SIMILARITY_THRESHOLD", DEFAULT_SIMILARITY_THRESHOLD)?;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MarqueeError::Config(format!(
                "SIMILARITY_THRESHOLD must be within [0, 1], got {threshold}"
            )));
        }

        Ok(Self {
            embedding_api_url: get("EMBEDDING_API_URL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_API_URL.to_string()),
            embedding_api_key: get("EMBEDDING_API_KEY"),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            similarity_threshold: threshold,
            ..Self::with_credentials(&get)?
        })
    }

    /// Web server settings from an arbitrary key lookup: Neo4j credentials,
    /// host, port and cache TTLs. Embedding and similarity keys are not read.
    pub fn web_from_lookup<F>(lookup: F) -> Result<Self, MarqueeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            web_host: get("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parse_or(&get, "WEB_PORT", 3000)?,
            title_cache_ttl: Duration::from_secs(parse_or(&get, "TITLE_CACHE_TTL_SECS", 3600)?),
            query_cache_ttl: Duration::from_secs(parse_or(&get, "QUERY_CACHE_TTL_SECS", 600)?),
            ..Self::with_credentials(&get)?
        })
    }

    /// Required Neo4j credentials, with every other field at its default.
    fn with_credentials<G>(get: &G) -> Result<Self, MarqueeError>
    where
        G: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                MarqueeError::Config(format!("{key} environment variable is required"))
            })
        };

        Ok(Self {
            neo4j_uri: required("NEO4J_URI")?,
            neo4j_user: required("NEO4J_USER")?,
            neo4j_password: required("NEO4J_PASSWORD")?,
            embedding_api_url: DEFAULT_EMBEDDING_API_URL.to_string(),
            embedding_api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            web_host: "0.0.0.0".to_string(),
            web_port: 3000,
            title_cache_ttl: Duration::from_secs(3600),
            query_cache_ttl: Duration::from_secs(600),
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            neo4j_uri = self.neo4j_uri.as_str(),
            neo4j_user = self.neo4j_user.as_str(),
            neo4j_password = redact(&self.neo4j_password),
            embedding_api_url = self.embedding_api_url.as_str(),
            embedding_api_key = self.embedding_api_key.as_deref().map(redact).unwrap_or("<unset>"),
            embedding_model = self.embedding_model.as_str(),
            similarity_threshold = self.similarity_threshold,
            web_host = self.web_host.as_str(),
            web_port = self.web_port,
            title_cache_ttl_secs = self.title_cache_ttl.as_secs(),
            query_cache_ttl_secs = self.query_cache_ttl.as_secs(),
            "Loaded configuration"
        );
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, MarqueeError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| MarqueeError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "********"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const NEO4J: [(&str, &str); 3] = [
        ("NEO4J_URI", "bolt://localhost:7687"),
        ("NEO4J_USER", "neo4j"),
        ("NEO4J_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let ingest = Config::ingest_from_lookup(lookup(&NEO4J)).unwrap();
        assert_eq!(ingest.neo4j_uri, "bolt://localhost:7687");
        assert_eq!(ingest.similarity_threshold, 0.4);
        assert_eq!(ingest.embedding_model, "all-MiniLM-L6-v2");
        assert_eq!(ingest.embedding_api_key, None);

        let web = Config::web_from_lookup(lookup(&NEO4J)).unwrap();
        assert_eq!(web.web_port, 3000);
        assert_eq!(web.title_cache_ttl, Duration::from_secs(3600));
        assert_eq!(web.query_cache_ttl, Duration::from_secs(600));
    }

    #[test]
    fn missing_password_is_a_config_error() {
        for result in [
            Config::ingest_from_lookup(lookup(&NEO4J[..2])),
            Config::web_from_lookup(lookup(&NEO4J[..2])),
        ] {
            let err = result.unwrap_err();
            assert!(matches!(err, MarqueeError::Config(msg) if msg.contains("NEO4J_PASSWORD")));
        }
    }

    #[test]
    fn blank_value_counts_as_unset() {
        let mut pairs = NEO4J.to_vec();
        pairs.push(("WEB_HOST", "   "));
        let config = Config::web_from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.web_host, "0.0.0.0");
    }

    #[test]
    fn ingest_overrides_are_parsed() {
        let mut pairs = NEO4J.to_vec();
        pairs.extend([
            ("SIMILARITY_THRESHOLD", "0.55"),
            ("EMBEDDING_API_KEY", "sk-test"),
        ]);
        let config = Config::ingest_from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.similarity_threshold, 0.55);
        assert_eq!(config.embedding_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn web_overrides_are_parsed() {
        let mut pairs = NEO4J.to_vec();
        pairs.extend([("WEB_PORT", "8081"), ("QUERY_CACHE_TTL_SECS", "5")]);
        let config = Config::web_from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.web_port, 8081);
        assert_eq!(config.query_cache_ttl, Duration::from_secs(5));
    }

    #[test]
    fn unparsable_port_is_rejected_by_the_web_loader_only() {
        let mut pairs = NEO4J.to_vec();
        pairs.push(("WEB_PORT", "eighty"));
        assert!(matches!(
            Config::web_from_lookup(lookup(&pairs)),
            Err(MarqueeError::Config(_))
        ));
        assert!(Config::ingest_from_lookup(lookup(&pairs)).is_ok());
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let mut pairs = NEO4J.to_vec();
        pairs.push(("SIMILARITY_THRESHOLD", "1.5"));
        assert!(Config::ingest_from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn web_loader_ignores_similarity_settings() {
        let mut pairs = NEO4J.to_vec();
        pairs.extend([("SIMILARITY_THRESHOLD", "abc"), ("EMBEDDING_MODEL", "other")]);

        let web = Config::web_from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(web.similarity_threshold, 0.4);
        assert_eq!(web.embedding_model, "all-MiniLM-L6-v2");

        assert!(matches!(
            Config::ingest_from_lookup(lookup(&pairs)),
            Err(MarqueeError::Config(msg)) if msg.contains("SIMILARITY_THRESHOLD")
        ));
    }
}
