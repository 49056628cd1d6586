use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column names of the result file, in order.
pub const COLUMNS: [&str; 11] = [
    "username",
    "acctdesc",
    "location",
    "following",
    "followers",
    "totaltweets",
    "usercreatedts",
    "tweetcreatedts",
    "retweetcount",
    "text",
    "hashtags",
];

/// One page of `search/tweets.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub statuses: Vec<Tweet>,
    #[serde(default)]
    pub search_metadata: Option<SearchMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchMetadata {
    /// Query string for the next (older) page. Absent on the last page.
    #[serde(default)]
    pub next_results: Option<String>,
}

/// A tweet as returned with `tweet_mode=extended`.
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: u64,
    #[serde(with = "twitter_date")]
    pub created_at: DateTime<Utc>,
    // Compat mode only sends `text`.
    #[serde(default, alias = "text")]
    pub full_text: String,
    #[serde(default)]
    pub retweet_count: u64,
    pub user: User,
    #[serde(default)]
    pub entities: Entities,
    /// Present only on retweets.
    #[serde(default)]
    pub retweeted_status: Option<Box<Tweet>>,
}

impl Tweet {
    /// Full text of the retweeted tweet for retweets, the tweet's own text otherwise.
    /// Retweet bodies are truncated, so the original is the only complete copy.
    pub fn resolved_text(&self) -> &str {
        match &self.retweeted_status {
            Some(original) => &original.full_text,
            None => &self.full_text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub screen_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub friends_count: u64,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub statuses_count: u64,
    #[serde(with = "twitter_date")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<Hashtag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hashtag {
    pub text: String,
    pub indices: [u32; 2],
}

/// A tweet flattened into one row of the result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub username: String,
    pub description: String,
    pub location: Option<String>,
    pub following: u64,
    pub followers: u64,
    pub total_tweets: u64,
    pub user_created_at: DateTime<Utc>,
    pub tweet_created_at: DateTime<Utc>,
    pub retweet_count: u64,
    pub text: String,
    pub hashtags: Vec<Hashtag>,
}

impl From<Tweet> for PostRecord {
    fn from(tweet: Tweet) -> Self {
        let text = tweet.resolved_text().to_string();
        let Tweet {
            created_at,
            retweet_count,
            user,
            entities,
            ..
        } = tweet;

        Self {
            username: user.screen_name,
            description: user.description.unwrap_or_default(),
            location: user.location.filter(|l| !l.is_empty()),
            following: user.friends_count,
            followers: user.followers_count,
            total_tweets: user.statuses_count,
            user_created_at: user.created_at,
            tweet_created_at: created_at,
            retweet_count,
            text,
            hashtags: entities.hashtags,
        }
    }
}

/// Append-only collection of every record gathered in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    records: Vec<PostRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PostRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    /// Rows appended after the first `offset`.
    pub fn since(&self, offset: usize) -> &[PostRecord] {
        self.records.get(offset..).unwrap_or_default()
    }
}

/// `created_at` as Twitter formats it: `Wed Oct 10 20:19:24 +0000 2018`.
mod twitter_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    const FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_str(&raw, FORMAT)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
