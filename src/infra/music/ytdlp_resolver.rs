use crate::core::music::{MusicError, Track, TrackResolver};
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

/// Searches with the `yt-dlp` binary and returns the first hit's direct audio URL.
pub struct YtDlpResolver {
    binary: String,
}

#[derive(Debug, Deserialize)]
struct SearchOutput {
    #[serde(default)]
    entries: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    url: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run_search(&self, phrase: &str) -> anyhow::Result<Track> {
        let output = Command::new(&self.binary)
            .args([
                "--no-playlist",
                "--dump-single-json",
                "--no-warnings",
                "-f",
                "bestaudio/best",
            ])
            .arg(format!("ytsearch1:{phrase}"))
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("yt-dlp exited with {}: {}", output.status, stderr.trim());
        }

        parse_search_output(&output.stdout)
    }
}

/// Pick the first search entry out of `--dump-single-json` output.
fn parse_search_output(stdout: &[u8]) -> anyhow::Result<Track> {
    let parsed: SearchOutput =
        serde_json::from_slice(stdout).context("yt-dlp returned invalid JSON")?;

    let entry = parsed
        .entries
        .into_iter()
        .next()
        .context("no search results")?;

    let source_url = entry.url.context("search result has no stream URL")?;

    Ok(Track {
        source_url,
        title: entry.title.unwrap_or_else(|| "Unknown title".to_string()),
        thumbnail: entry.thumbnail,
        page_url: entry.webpage_url,
    })
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn search(&self, phrase: &str) -> Result<Track, MusicError> {
        self.run_search(phrase).await.map_err(|e| {
            tracing::debug!(phrase, error = %e, "yt-dlp search failed");
            MusicError::Extractor(format!("{e:#}"))
        })
    }
}
