use std::borrow::Cow;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tokio::{fs::File, io::AsyncWriteExt};

use crate::model::{PostRecord, COLUMNS};
use crate::{info_time, Result, FILE_SUFFIX};

const DELIMITER: &str = ",";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";
const PARTIAL_SUFFIX: &str = ".partial";

/// Destination for collected rows. The collector hands over each round's new rows as soon
/// as the round ends, so a late failure only loses the round in flight.
#[async_trait]
pub trait ResultSink: Send {
    async fn append_rows(&mut self, rows: &[PostRecord]) -> Result<()>;

    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `<YYYYMMDD_HHMMSS>_disasterTweets.csv`, header first, rows as they arrive.
///
/// Rows go to `<name>.partial` until [`ResultSink::finish`] renames it, so an aborted run
/// never leaves a file under the final name.
#[derive(Debug)]
pub struct CsvWriter {
    path: PathBuf,
    partial_path: PathBuf,
    file: File,
    rows_written: usize,
}

impl CsvWriter {
    pub fn file_name(generated_at: DateTime<Local>) -> String {
        format!("{}{FILE_SUFFIX}", generated_at.format("%Y%m%d_%H%M%S"))
    }

    /// Creates the partial file inside `dir` and writes the header row.
    pub async fn create(dir: impl AsRef<Path>, generated_at: DateTime<Local>) -> Result<Self> {
        let file_name = Self::file_name(generated_at);
        let path = dir.as_ref().join(&file_name);
        let partial_path = dir.as_ref().join(format!("{file_name}{PARTIAL_SUFFIX}"));
        let mut file = File::create(&partial_path).await?;
        file.write_all(header().as_bytes()).await?;
        file.flush().await?;

        info_time!("Created result file: {}", partial_path.display());
        Ok(Self {
            path,
            partial_path,
            file,
            rows_written: 0,
        })
    }

    /// Final location of the file. Only exists once the writer is finished.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where rows are written while the run is in progress.
    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

#[async_trait]
impl ResultSink for CsvWriter {
    async fn append_rows(&mut self, rows: &[PostRecord]) -> Result<()> {
        let mut buf = String::new();
        for record in rows {
            buf.push_str(&format_row(record)?);
        }
        self.file.write_all(buf.as_bytes()).await?;
        self.file.flush().await?;
        self.rows_written += rows.len();
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.file.sync_all().await?;
        tokio::fs::rename(&self.partial_path, &self.path).await?;
        info_time!(
            "Wrote {} rows to file: {}",
            self.rows_written,
            self.path.display()
        );
        Ok(())
    }
}

fn header() -> String {
    let mut line = COLUMNS.join(DELIMITER);
    line.push('\n');
    line
}

fn format_row(record: &PostRecord) -> Result<String> {
    let fields: [Cow<'_, str>; 11] = [
        escape_field(&record.username),
        escape_field(&record.description),
        escape_field(record.location.as_deref().unwrap_or_default()),
        record.following.to_string().into(),
        record.followers.to_string().into(),
        record.total_tweets.to_string().into(),
        format_timestamp(record.user_created_at).into(),
        format_timestamp(record.tweet_created_at).into(),
        record.retweet_count.to_string().into(),
        escape_field(&record.text),
        Cow::Owned(escape_field(&serde_json::to_string(&record.hashtags)?).into_owned()),
    ];

    let mut line = fields.join(DELIMITER);
    line.push('\n');
    Ok(line)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Quotes a field if it holds the delimiter, a quote or a line break; quotes are doubled.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains(DELIMITER) || field.contains(['"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::model::tests::tweet_json;
    use crate::model::Tweet;

    fn record(id: u64, text: &str) -> PostRecord {
        PostRecord::from(serde_json::from_value::<Tweet>(tweet_json(id, text)).unwrap())
    }

    #[test]
    fn file_name_embeds_timestamp() {
        let ts = Local.with_ymd_and_hms(2022, 10, 3, 14, 5, 9).unwrap();
        assert_eq!(
            CsvWriter::file_name(ts),
            "20221003_140509_disasterTweets.csv"
        );
    }

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_field("plain text"), "plain text");
        assert_eq!(escape_field("a, b"), "\"a, b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn row_layout() {
        let row = format_row(&record(1, "flood warning")).unwrap();
        assert_eq!(
            row,
            "reporter,\"News, weather, etc.\",Ljubljana,10,20,30,\
             2018-10-10 20:19:24+00:00,2022-10-03 09:15:00+00:00,3,flood warning,\
             \"[{\"\"text\"\":\"\"war\"\",\"\"indices\"\":[0,4]}]\"\n"
        );
    }

    #[test]
    fn missing_location_is_empty_field() {
        let mut rec = record(1, "x");
        rec.location = None;
        let row = format_row(&rec).unwrap();
        assert!(row.starts_with("reporter,\"News, weather, etc.\",,10,"));
    }

    #[tokio::test]
    async fn header_only_without_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = CsvWriter::create(temp_dir.path(), Local::now())
            .await
            .unwrap();
        writer.append_rows(&[]).await.unwrap();
        assert!(writer.partial_path().exists());
        assert!(!writer.path().exists());

        writer.finish().await.unwrap();
        assert!(!writer.partial_path().exists());

        let contents = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(
            contents,
            "username,acctdesc,location,following,followers,totaltweets,\
             usercreatedts,tweetcreatedts,retweetcount,text,hashtags\n"
        );
        assert_eq!(writer.rows_written(), 0);
    }

    #[tokio::test]
    async fn appends_across_flushes() {
        let temp_dir = TempDir::new().unwrap();
        let mut writer = CsvWriter::create(temp_dir.path(), Local::now())
            .await
            .unwrap();
        writer
            .append_rows(&[record(1, "one"), record(2, "two")])
            .await
            .unwrap();
        writer.append_rows(&[record(3, "three")]).await.unwrap();

        let in_progress = std::fs::read_to_string(writer.partial_path()).unwrap();
        assert_eq!(in_progress.lines().count(), 4);
        assert!(writer
            .partial_path()
            .to_string_lossy()
            .ends_with("_disasterTweets.csv.partial"));

        writer.finish().await.unwrap();

        let contents = std::fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("username,"));
        assert!(lines[3].contains(",three,"));
        assert_eq!(writer.rows_written(), 3);
        assert!(writer
            .path()
            .to_string_lossy()
            .ends_with("_disasterTweets.csv"));
    }
}
