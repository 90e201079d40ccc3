// Layered configuration: built-in defaults, then an optional TOML file, then LOBX_* env vars.
//
//   base = "BTC"
//   quote = "USD"
//   fetch_timeout_ms = 5000
//   concurrent_fetch = true
//
//   [[venues]]
//   venue = "kraken"
//   url = "https://api.kraken.com/0/public/Depth?pair=XBTUSD"

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::market_data::adapters::Venue;

pub const DEFAULT_CONFIG_FILE: &str = "lobx-agg.toml";
const ENV_PREFIX: &str = "LOBX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    pub venue: Venue,
    /// Replaces the venue's public snapshot endpoint.
    #[serde(default)]
    pub url: Option<String>,
}

impl VenueConfig {
    pub fn new(venue: Venue) -> Self {
        Self { venue, url: None }
    }

    pub fn snapshot_url(&self, base: &str, quote: &str) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| self.venue.snapshot_url(base, quote))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub base: String,
    pub quote: String,
    pub venues: Vec<VenueConfig>,
    pub fetch_timeout_ms: u64,
    pub concurrent_fetch: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            base: "BTC".to_string(),
            quote: "USD".to_string(),
            venues: Venue::ALL.into_iter().map(VenueConfig::new).collect(),
            fetch_timeout_ms: 5_000,
            concurrent_fetch: true,
        }
    }
}

impl AggregatorConfig {
    /// Load from `path` (if it exists) and the environment.
    ///
    /// `LOBX_VENUES=coinbase,gemini` replaces the venue list with default endpoints.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let settings = Config::builder()
            .set_default("base", defaults.base.clone())?
            .set_default("quote", defaults.quote.clone())?
            .set_default("fetch_timeout_ms", defaults.fetch_timeout_ms as i64)?
            .set_default("concurrent_fetch", defaults.concurrent_fetch)?
            .add_source(File::from(file).required(path.is_some()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .ignore_empty(true)
                    .list_separator(",")
                    .with_list_parse_key("venues"),
            )
            .build()?;

        let raw: RawConfig = settings.try_deserialize()?;
        let config = raw.resolve(defaults.venues);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.venues.is_empty() {
            return Err(ConfigError::NoVenues);
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Keep only `venues`, in that order; configured URL overrides survive.
    pub fn restrict_venues(&mut self, venues: &[Venue]) {
        let configured = std::mem::take(&mut self.venues);
        self.venues = venues
            .iter()
            .map(|&venue| {
                configured
                    .iter()
                    .find(|c| c.venue == venue)
                    .cloned()
                    .unwrap_or_else(|| VenueConfig::new(venue))
            })
            .collect();
    }
}

// Venues may be given as a table list (file) or as bare names (env var).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVenue {
    Name(Venue),
    Full(VenueConfig),
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    base: String,
    quote: String,
    #[serde(default)]
    venues: Option<Vec<RawVenue>>,
    fetch_timeout_ms: u64,
    concurrent_fetch: bool,
}

impl RawConfig {
    fn resolve(self, default_venues: Vec<VenueConfig>) -> AggregatorConfig {
        let venues = match self.venues {
            None => default_venues,
            Some(list) => list
                .into_iter()
                .map(|v| match v {
                    RawVenue::Name(venue) => VenueConfig::new(venue),
                    RawVenue::Full(cfg) => cfg,
                })
                .collect(),
        };
        AggregatorConfig {
            base: self.base,
            quote: self.quote,
            venues,
            fetch_timeout_ms: self.fetch_timeout_ms,
            concurrent_fetch: self.concurrent_fetch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    // The `config` crate picks the format from the extension, so keep `.toml`
    fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults_cover_all_venues() {
        let cfg = AggregatorConfig::default();
        assert_eq!(cfg.venues.len(), 3);
        assert_eq!(cfg.venues[0].venue, Venue::Coinbase);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(5));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
                base = "ETH"
                quote = "USD"
                fetch_timeout_ms = 1500
                concurrent_fetch = false

                [[venues]]
                venue = "kraken"
                url = "http://localhost:9999/depth"

                [[venues]]
                venue = "gemini"
            "#,
        );
        let cfg = AggregatorConfig::load(Some(path.as_path())).unwrap();

        assert_eq!(cfg.base, "ETH");
        assert_eq!(cfg.fetch_timeout_ms, 1500);
        assert!(!cfg.concurrent_fetch);
        assert_eq!(cfg.venues.len(), 2);
        assert_eq!(cfg.venues[0].snapshot_url("ETH", "USD"), "http://localhost:9999/depth");
        assert_eq!(cfg.venues[1].snapshot_url("ETH", "USD"), "https://api.gemini.com/v1/book/ETHUSD");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            AggregatorConfig::load(Some(missing.as_path())),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_empty_venue_list_in_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "venues = []\n");
        assert!(matches!(
            AggregatorConfig::load(Some(path.as_path())),
            Err(ConfigError::NoVenues)
        ));
    }

    #[test]
    fn test_validation() {
        let mut cfg = AggregatorConfig::default();
        cfg.fetch_timeout_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTimeout)));

        let mut cfg = AggregatorConfig::default();
        cfg.venues.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoVenues)));
    }

    #[test]
    fn test_restrict_venues_keeps_overrides() {
        let mut cfg = AggregatorConfig::default();
        cfg.venues[2].url = Some("http://mirror/kraken".to_string());
        cfg.restrict_venues(&[Venue::Kraken, Venue::Coinbase]);

        assert_eq!(cfg.venues.len(), 2);
        assert_eq!(cfg.venues[0].url.as_deref(), Some("http://mirror/kraken"));
        assert_eq!(cfg.venues[1].venue, Venue::Coinbase);
    }
}
