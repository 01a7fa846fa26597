//! Input loading and demuxing into packet records.

mod ffprobe_json;
mod flv_file;

use std::path::Path;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use indicatif::{ProgressBar, ProgressStyle};
use stream_timing::{ContainerInfo, PacketRecord, StreamMetadata};
use tracing::{debug, info};
use url::Url;

use crate::cli::InputFormat;
use crate::error::{CliError, Result};

/// Container description and packets in demux order, ready for capture.
#[derive(Debug, Clone)]
pub struct DemuxedInput {
    pub info: ContainerInfo,
    pub streams: Vec<StreamMetadata>,
    pub packets: Vec<PacketRecord>,
}

/// Parses `input` as an http(s) URL, or `None` for a local path.
fn remote_url(input: &str) -> Option<Url> {
    Url::parse(input)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Reads a local file or downloads a remote one.
pub async fn load(input: &str, timeout: Duration, show_progress: bool) -> Result<Bytes> {
    match remote_url(input) {
        Some(url) => download(url, timeout, show_progress).await,
        None => {
            let path = Path::new(input);
            if !path.exists() {
                return Err(CliError::InvalidInput(format!(
                    "Input file not found: {}",
                    path.display()
                )));
            }
            let data = tokio::fs::read(path).await?;
            debug!(path = %path.display(), bytes = data.len(), "Read input file");
            Ok(Bytes::from(data))
        }
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} {msg}\n[{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg} {bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
}

async fn download(url: Url, timeout: Duration, show_progress: bool) -> Result<Bytes> {
    info!(%url, "Downloading input");
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let mut response = client.get(url.clone()).send().await?.error_for_status()?;

    let progress = if !show_progress {
        ProgressBar::hidden()
    } else if let Some(total) = response.content_length() {
        ProgressBar::new(total).with_style(download_style())
    } else {
        let spinner = ProgressBar::new_spinner().with_style(spinner_style());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };
    progress.set_message(url.to_string());

    let mut buffer = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
        progress.inc(chunk.len() as u64);
    }
    progress.finish_and_clear();

    debug!(%url, bytes = buffer.len(), "Download complete");
    Ok(buffer.freeze())
}

/// Guesses the input format from its first bytes.
pub fn detect(data: &[u8]) -> Result<InputFormat> {
    if data.starts_with(b"FLV") {
        return Ok(InputFormat::Flv);
    }
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Ok(InputFormat::Ffprobe),
        _ => {
            let head: String = data
                .iter()
                .take(8)
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(" ");
            Err(CliError::UnknownFormat(format!(
                "expected an FLV file or ffprobe JSON, starts with [{head}]"
            )))
        }
    }
}

/// Demuxes `data` as `format`, detecting the format when it is `Auto`.
pub fn demux(data: Bytes, format: InputFormat) -> Result<DemuxedInput> {
    debug!(?format, bytes = data.len(), "Demuxing input");
    match format {
        InputFormat::Auto => {
            let detected = detect(&data)?;
            demux(data, detected)
        }
        InputFormat::Flv => flv_file::demux(data),
        InputFormat::Ffprobe => ffprobe_json::demux(&data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(detect(b"FLV\x01\x05").unwrap(), InputFormat::Flv);
        assert_eq!(detect(b"  \n{\"streams\": []}").unwrap(), InputFormat::Ffprobe);
        assert!(matches!(detect(b"\x00\x00\x00\x18ftyp"), Err(CliError::UnknownFormat(_))));
        assert!(detect(b"").is_err());
    }

    #[test]
    fn test_remote_url() {
        assert!(remote_url("https://example.com/live.flv").is_some());
        assert!(remote_url("http://127.0.0.1:8080/a.json").is_some());
        assert!(remote_url("/tmp/video.flv").is_none());
        assert!(remote_url("C:\\videos\\a.flv").is_none());
        assert!(remote_url("file:///tmp/a.flv").is_none());
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");
        std::fs::write(&path, b"{}").unwrap();

        let data = load(path.to_str().unwrap(), Duration::from_secs(1), false)
            .await
            .unwrap();
        assert_eq!(&data[..], b"{}");

        let missing = dir.path().join("missing.flv");
        let error = load(missing.to_str().unwrap(), Duration::from_secs(1), false)
            .await
            .unwrap_err();
        assert!(matches!(error, CliError::InvalidInput(_)));
    }
}
