#![allow(dead_code)]

use serde_json::{json, Value};
use tweet_scrap::{Credentials, Tweet};

pub fn tweet_json(id: u64, text: &str) -> Value {
    json!({
        "id": id,
        "created_at": "Mon Oct 03 09:15:00 +0000 2022",
        "full_text": text,
        "retweet_count": 0,
        "user": {
            "screen_name": format!("user{id}"),
            "description": "",
            "location": null,
            "friends_count": 1,
            "followers_count": 2,
            "statuses_count": 3,
            "created_at": "Wed Oct 10 20:19:24 +0000 2018"
        },
        "entities": { "hashtags": [] }
    })
}

pub fn retweet_json(id: u64, original_id: u64, original_text: &str) -> Value {
    let mut value = tweet_json(id, "RT @user: truncated…");
    value["retweeted_status"] = tweet_json(original_id, original_text);
    value
}

pub fn tweet(id: u64, text: &str) -> Tweet {
    serde_json::from_value(tweet_json(id, text)).unwrap()
}

pub fn credentials() -> Credentials {
    Credentials {
        api_key: "test-api-key".into(),
        api_key_secret: "test-api-key-secret".into(),
        access_token: "test-access-token".into(),
        access_token_secret: "test-access-token-secret".into(),
    }
}
