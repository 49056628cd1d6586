use chrono::{DateTime, Local};
use futures::StreamExt;
use tracing::info;

use crate::config::{AppConfig, RunConfig};
use crate::model::{PostRecord, ResultTable};
use crate::request::{SearchClient, TwitterClient};
use crate::writer::{CsvWriter, ResultSink};
use crate::{info_time, Result};

/// Scrapes tweets for `run` and writes them to a CSV file in `app.data_path`.
/// The file name carries `started_at`.
pub async fn process_site(
    app: &AppConfig,
    run: &RunConfig,
    started_at: DateTime<Local>,
) -> Result<ResultTable> {
    info_time!(
        "Started scraping: {:?}, {} rounds of up to {} tweets",
        run.query,
        run.rounds,
        run.tweets_per_round
    );

    let client = TwitterClient::new(app.credentials.clone())?;
    let mut writer = CsvWriter::create(&app.data_path, started_at).await?;

    let table = collect(run, &client, &mut writer).await?;
    info_time!(started_at, "Finished ALL rounds, {} tweets.", table.len());

    Ok(table)
}

/// Runs `run.rounds` collection rounds, each drawing at most `run.tweets_per_round` tweets
/// from `client`. New rows go to `sink` after every round; the cool-down is slept between
/// rounds but not after the last one.
pub async fn collect<C, S>(run: &RunConfig, client: &C, sink: &mut S) -> Result<ResultTable>
where
    C: SearchClient + ?Sized,
    S: ResultSink + ?Sized,
{
    run.validate()?;
    let query = run.search_query();
    let mut table = ResultTable::new();

    for round in 1..=run.rounds {
        let start_round_time = Local::now();
        info_time!("Starting round {}/{}", round, run.rounds);

        let flushed = table.len();
        let mut tweets = client.search(&query).take(run.tweets_per_round);
        while let Some(tweet) = tweets.next().await {
            table.push(PostRecord::from(tweet?));
        }

        info_time!(
            start_round_time,
            "{} tweets extracted in round {} ({} new)",
            table.len(),
            round,
            table.len() - flushed
        );
        sink.append_rows(table.since(flushed)).await?;

        if round < run.rounds {
            info!(
                cooldown_secs = run.cooldown.as_secs(),
                "Waiting for the request limit to refresh"
            );
            tokio::time::sleep(run.cooldown).await;
        }
    }

    sink.finish().await?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};

    use super::*;
    use crate::model::tests::tweet_json;
    use crate::model::Tweet;
    use crate::request::SearchQuery;
    use crate::Error;

    /// Hands out one scripted batch per `search` call.
    struct ScriptedClient {
        rounds: Mutex<VecDeque<Vec<Result<Tweet>>>>,
    }

    impl ScriptedClient {
        fn new(rounds: Vec<Vec<Result<Tweet>>>) -> Self {
            Self {
                rounds: Mutex::new(rounds.into()),
            }
        }
    }

    impl SearchClient for ScriptedClient {
        fn search<'a>(&'a self, _query: &'a SearchQuery) -> BoxStream<'a, Result<Tweet>> {
            let batch = self.rounds.lock().unwrap().pop_front().unwrap_or_default();
            stream::iter(batch).boxed()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        flushes: Vec<usize>,
        finished: bool,
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn append_rows(&mut self, rows: &[PostRecord]) -> Result<()> {
            self.flushes.push(rows.len());
            Ok(())
        }

        async fn finish(&mut self) -> Result<()> {
            self.finished = true;
            Ok(())
        }
    }

    fn tweet(id: u64) -> Result<Tweet> {
        Ok(serde_json::from_value(tweet_json(id, &format!("tweet {id}"))).unwrap())
    }

    fn run_config(rounds: usize, cap: usize) -> RunConfig {
        RunConfig {
            rounds,
            tweets_per_round: cap,
            ..RunConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flushes_every_round() {
        let client = ScriptedClient::new(vec![
            vec![tweet(1), tweet(2)],
            vec![],
            vec![tweet(3)],
        ]);
        let mut sink = RecordingSink::default();

        let table = collect(&run_config(3, 10), &client, &mut sink).await.unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(sink.flushes, vec![2, 0, 1]);
        assert!(sink.finished);
    }

    #[tokio::test(start_paused = true)]
    async fn cap_bounds_each_round() {
        let client = ScriptedClient::new(vec![(1..=8).map(tweet).collect()]);
        let mut sink = RecordingSink::default();

        let table = collect(&run_config(1, 5), &client, &mut sink).await.unwrap();

        assert_eq!(table.len(), 5);
        let texts: Vec<&str> = table.records().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["tweet 1", "tweet 2", "tweet 3", "tweet 4", "tweet 5"]);
    }

    #[tokio::test(start_paused = true)]
    async fn error_aborts_the_run() {
        let client = ScriptedClient::new(vec![
            vec![tweet(1)],
            vec![
                tweet(2),
                Err(Error::Api {
                    status: 401,
                    message: "Unauthorized".into(),
                }),
                tweet(3),
            ],
        ]);
        let mut sink = RecordingSink::default();

        let err = collect(&run_config(2, 10), &client, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { status: 401, .. }));
        // First round was already handed to the sink.
        assert_eq!(sink.flushes, vec![1]);
        assert!(!sink.finished);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_zero_rounds() {
        let client = ScriptedClient::new(vec![]);
        let mut sink = RecordingSink::default();

        let err = collect(&run_config(0, 10), &client, &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRunConfig(_)));
        assert!(sink.flushes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_rounds_only() {
        let client = ScriptedClient::new(vec![vec![tweet(1)], vec![tweet(2)], vec![tweet(3)]]);
        let mut sink = RecordingSink::default();
        let config = RunConfig {
            cooldown: Duration::from_secs(60),
            ..run_config(3, 10)
        };

        let start = tokio::time::Instant::now();
        collect(&config, &client, &mut sink).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }
}
