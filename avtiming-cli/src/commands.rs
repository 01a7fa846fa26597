use std::path::PathBuf;
use std::time::{Duration, Instant};

use stream_timing::{AnalysisConfig, ContainerAnalyzer, ContainerReport, TimingError};
use tracing::{debug, info, warn};

use crate::{
    cli::{InputFormat, OutputFormat},
    config::AppConfig,
    error::Result,
    input::{self, DemuxedInput},
    output::OutputManager,
};

/// Options of one analysis run, resolved from arguments and configuration.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub input: String,
    pub input_format: InputFormat,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
    pub dump: bool,
    pub strict: bool,
    pub timeout: Duration,
    pub show_progress: bool,
}

pub struct CommandExecutor {
    config: AppConfig,
    output_manager: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Self {
        let output_manager = OutputManager::new(config.colored_output);
        Self {
            config,
            output_manager,
        }
    }

    /// Loads, demuxes and analyses the input, prints the report, and only
    /// then fails when strict validation finds an invalid stream.
    pub async fn analyze(&self, options: &AnalyzeOptions) -> Result<()> {
        let start = Instant::now();

        let data = input::load(&options.input, options.timeout, options.show_progress).await?;
        let demuxed = input::demux(data, options.input_format)?;
        info!(
            streams = demuxed.streams.len(),
            packets = demuxed.packets.len(),
            "Input demuxed"
        );

        let report = analyze(demuxed, &self.config.analysis)?;

        let rendered = self
            .output_manager
            .format_report(&report, options.format, options.dump)?;
        self.output_manager
            .write_output(&rendered, options.output_file.as_deref())?;

        let verdicts = report.validate(options.strict)?;
        debug!(
            streams = verdicts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        Ok(())
    }
}

/// Feeds every packet through a [`ContainerAnalyzer`] and produces the
/// report. Packets for streams the container did not declare are dropped
/// with a warning.
pub fn analyze(input: DemuxedInput, config: &AnalysisConfig) -> Result<ContainerReport> {
    let DemuxedInput {
        info,
        streams,
        packets,
    } = input;

    let mut analyzer = ContainerAnalyzer::new(config.clone(), streams)?.with_info(info);
    let mut unknown = 0usize;
    for packet in packets {
        match analyzer.capture(packet) {
            Ok(()) => {}
            Err(TimingError::UnknownStream(index)) => {
                debug!(index, "Packet for undeclared stream");
                unknown += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    if unknown > 0 {
        warn!(unknown, "Dropped packets for undeclared streams");
    }

    Ok(analyzer.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use flv::writer::FlvBuilder;
    use stream_timing::{PacketRecord, StreamKind, StreamMetadata, TimeBase, Verdict};

    /// 25 fps video decoded as 0, 2, 1, 4, 3, ... with a 40 ms composition
    /// offset, interleaved with 40 ms audio frames. Both streams end with a
    /// presentation time of 2000 ms.
    fn flv_fixture(declared_seconds: f64) -> bytes::Bytes {
        let mut builder = FlvBuilder::new(true, true)
            .metadata(&[("duration", declared_seconds)])
            .avc_sequence_header(0)
            .aac_sequence_header(0);
        for i in 0..50u32 {
            let frame = match i {
                0 => 0,
                n if n % 2 == 1 => (n + 1).min(49),
                n => n - 1,
            };
            let pts = frame as i64 * 40 + 40;
            builder = builder.avc_frame(i * 40, pts, i % 25 == 0, 500);
            builder = builder.aac_frame(i * 40 + 40, 200);
        }
        builder.build()
    }

    #[test]
    fn test_flv_end_to_end() {
        // FLV carries no packet durations, so the judged estimate is the
        // biggest pts itself
        let data = flv_fixture(2.0);
        let demuxed = input::demux(data, InputFormat::Auto).unwrap();
        let report = analyze(demuxed, &AnalysisConfig::default()).unwrap();

        assert_eq!(report.info.format, "flv");
        assert_eq!(report.streams.len(), 2);
        let video = report
            .streams
            .iter()
            .find(|s| s.metadata.kind == StreamKind::Video)
            .unwrap();
        assert_eq!(video.series.len(), 50);
        assert_eq!(video.estimate.by_sum, None);
        assert!(matches!(video.verdict, Verdict::Valid { .. }));
        assert!(report.av_sync.is_some());
        assert!(report.validate(true).is_ok());
    }

    #[test]
    fn test_flv_declared_duration_mismatch_is_strict_failure() {
        let data = flv_fixture(2.5);
        let demuxed = input::demux(data, InputFormat::Flv).unwrap();
        let report = analyze(demuxed, &AnalysisConfig::default()).unwrap();

        // non-strict validation only reports
        let verdicts = report.validate(false).unwrap();
        assert!(verdicts.iter().all(|(_, v)| v.is_invalid()));

        let error = CliError::from(report.validate(true).unwrap_err());
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_undeclared_stream_packets_are_dropped() {
        let input = DemuxedInput {
            info: Default::default(),
            streams: vec![StreamMetadata::new(0, StreamKind::Audio, TimeBase::MILLISECONDS)],
            packets: vec![
                PacketRecord::new(0, Some(0), Some(0), Some(20), 10),
                PacketRecord::new(5, Some(0), Some(0), Some(20), 10),
                PacketRecord::new(0, Some(20), Some(20), Some(20), 10),
            ],
        };
        let report = analyze(input, &AnalysisConfig::default()).unwrap();
        assert_eq!(report.streams[0].series.len(), 2);
        assert!(report.av_sync.is_none());
    }

    #[tokio::test]
    async fn test_analyze_command_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.flv");
        let output_path = dir.path().join("out.json");
        std::fs::write(&input_path, flv_fixture(2.0)).unwrap();

        let options = AnalyzeOptions {
            input: input_path.to_string_lossy().into_owned(),
            input_format: InputFormat::Auto,
            format: OutputFormat::Json,
            output_file: Some(output_path.clone()),
            dump: true,
            strict: true,
            timeout: Duration::from_secs(5),
            show_progress: false,
        };
        CommandExecutor::new(AppConfig::default())
            .analyze(&options)
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(output_path).unwrap()).unwrap();
        assert_eq!(written["info"]["format"], "flv");
    }

    #[tokio::test]
    async fn test_strict_failure_still_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.flv");
        let output_path = dir.path().join("out.txt");
        std::fs::write(&input_path, flv_fixture(3.0)).unwrap();

        let options = AnalyzeOptions {
            input: input_path.to_string_lossy().into_owned(),
            input_format: InputFormat::Flv,
            format: OutputFormat::Pretty,
            output_file: Some(output_path.clone()),
            dump: false,
            strict: true,
            timeout: Duration::from_secs(5),
            show_progress: false,
        };
        let error = CommandExecutor::new(AppConfig::default())
            .analyze(&options)
            .await
            .unwrap_err();
        assert_eq!(error.exit_code(), 2);

        let written = std::fs::read_to_string(output_path).unwrap();
        assert!(written.contains("INVALID"));
    }
}
