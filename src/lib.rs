//! Rate limited tweet scraper.
//!
//! Runs a fixed number of collection rounds against the Twitter v1.1 search endpoint,
//! flattens every tweet into a [`PostRecord`] and appends the rows to a timestamped CSV file,
//! waiting out the request quota between rounds.

pub mod config;
mod error;
mod macros;
pub mod model;
pub mod oauth;
pub mod process;
pub mod request;
pub mod writer;

pub use config::{AppConfig, Credentials, RunConfig};
pub use error::{Error, Result};
pub use model::{PostRecord, ResultTable, Tweet};
pub use process::{collect, process_site};
pub use request::{SearchClient, SearchQuery, TwitterClient};
pub use writer::{CsvWriter, ResultSink};

const SEARCH_URL: &str = "https://api.twitter.com/1.1/search/tweets.json";
const DEFAULT_QUERY: &str =
    "fatalities OR armageddon OR deluge OR war OR damage OR death OR protests OR terrorist OR activist";
const DEFAULT_LANG: &str = "en";
const DEFAULT_ROUNDS: usize = 10;
/// Tweets per round. The free tier allows 450 requests per 15 minutes.
const DEFAULT_TWEETS_PER_ROUND: usize = 5000;
/// The search endpoint never returns more than 100 tweets per page.
const MAX_PAGE_SIZE: u8 = 100;
/// 15 minute quota window plus some slack.
const ROUND_COOLDOWN_SECS: u64 = 920;
const FILE_SUFFIX: &str = "_disasterTweets.csv";
