use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::request::SearchQuery;
use crate::{
    Error, Result, DEFAULT_LANG, DEFAULT_QUERY, DEFAULT_ROUNDS, DEFAULT_TWEETS_PER_ROUND,
    MAX_PAGE_SIZE, ROUND_COOLDOWN_SECS,
};

/// OAuth 1.0a user credentials for the Twitter API.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_key_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &preview(&self.api_key))
            .field("api_key_secret", &preview(&self.api_key_secret))
            .field("access_token", &preview(&self.access_token))
            .field("access_token_secret", &preview(&self.access_token_secret))
            .finish()
    }
}

/// Secrets and the output directory, loaded from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: Credentials,
    pub data_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &'static str| lookup(key).ok_or(Error::MissingEnv(key));

        Ok(Self {
            credentials: Credentials {
                api_key: required("API_KEY")?,
                api_key_secret: required("API_KEY_SECRET")?,
                access_token: required("ACCESS_TOKEN")?,
                access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            },
            data_path: required("DATA_PATH")?.into(),
        })
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  API_KEY: {}", preview(&self.credentials.api_key));
        tracing::info!("  API_KEY_SECRET: {}", preview(&self.credentials.api_key_secret));
        tracing::info!("  ACCESS_TOKEN: {}", preview(&self.credentials.access_token));
        tracing::info!(
            "  ACCESS_TOKEN_SECRET: {}",
            preview(&self.credentials.access_token_secret)
        );
        tracing::info!("  DATA_PATH: {}", self.data_path.display());
    }
}

fn preview(val: &str) -> String {
    let n: usize = val.chars().take(5).map(char::len_utf8).sum();
    format!("{}...({} chars)", &val[..n], val.chars().count())
}

/// Parameters of one scraping run. Fixed for the duration of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Keyword expression, e.g. `"war OR deluge"`.
    pub query: String,
    pub lang: String,
    /// Only tweets created before this date. The endpoint only reaches back ~7 days.
    pub until: NaiveDate,
    pub rounds: usize,
    /// Upper bound on tweets pulled in a single round.
    pub tweets_per_round: usize,
    /// `count` hint sent with every page request.
    pub page_size: u8,
    pub cooldown: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            lang: DEFAULT_LANG.to_string(),
            until: Local::now().date_naive(),
            rounds: DEFAULT_ROUNDS,
            tweets_per_round: DEFAULT_TWEETS_PER_ROUND,
            page_size: MAX_PAGE_SIZE,
            cooldown: Duration::from_secs(ROUND_COOLDOWN_SECS),
        }
    }
}

impl RunConfig {
    /// Defaults, overridden by any of `SCRAPE_QUERY`, `SCRAPE_ROUNDS`, `SCRAPE_CAP`,
    /// `SCRAPE_UNTIL` and `SCRAPE_COOLDOWN_SECS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(query) = lookup("SCRAPE_QUERY") {
            config.query = query;
        }
        if let Some(rounds) = parse_var(&lookup, "SCRAPE_ROUNDS")? {
            config.rounds = rounds;
        }
        if let Some(cap) = parse_var(&lookup, "SCRAPE_CAP")? {
            config.tweets_per_round = cap;
        }
        if let Some(until) = parse_var(&lookup, "SCRAPE_UNTIL")? {
            config.until = until;
        }
        if let Some(secs) = parse_var(&lookup, "SCRAPE_COOLDOWN_SECS")? {
            config.cooldown = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(Error::InvalidRunConfig("rounds must be at least 1".into()));
        }
        if self.tweets_per_round == 0 {
            return Err(Error::InvalidRunConfig(
                "tweets_per_round must be at least 1".into(),
            ));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidRunConfig(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.query.clone(),
            lang: self.lang.clone(),
            until: self.until,
            count: self.page_size,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| Error::InvalidEnv { key, value })
        })
        .transpose()
}
