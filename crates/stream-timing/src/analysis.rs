//! # Container Analysis
//!
//! Routes demuxed packets to the accumulator of their stream, then runs the
//! independent analysis passes (durations, rate windows, dts jitter, AV sync)
//! over the finalized streams and collects everything into a
//! [`ContainerReport`].
//!
//! ## Example
//!
//! ```
//! use stream_timing::{
//!     AnalysisConfig, ContainerAnalyzer, PacketRecord, StreamKind, StreamMetadata, TimeBase,
//! };
//!
//! let video = StreamMetadata::new(0, StreamKind::Video, TimeBase::MILLISECONDS)
//!     .with_declared_duration(Some(80))
//!     .with_declared_start_time(Some(0));
//! let mut analyzer = ContainerAnalyzer::new(AnalysisConfig::default(), vec![video]).unwrap();
//! analyzer.capture(PacketRecord::new(0, Some(0), Some(0), Some(40), 1200)).unwrap();
//! analyzer.capture(PacketRecord::new(0, Some(40), Some(40), Some(40), 300)).unwrap();
//! let report = analyzer.finish().unwrap();
//! assert_eq!(report.streams[0].estimate.by_pts_and_start_time, Some(80));
//! assert!(report.validate(true).is_ok());
//! ```

use tracing::{debug, info, trace, warn};

use crate::accumulator::StreamTimingAccumulator;
use crate::config::AnalysisConfig;
use crate::delta::delta_series;
use crate::duration::{DurationEstimator, Verdict};
use crate::error::TimingError;
use crate::rate::WindowedRateCalculator;
use crate::record::{ContainerInfo, PacketRecord, StreamMetadata};
use crate::report::{AvSyncReport, ContainerReport, SecondsSeries, StreamReport};
use crate::sync::AvSyncAnalyzer;

/// Ingestion front of the engine for one container.
#[derive(Debug)]
pub struct ContainerAnalyzer {
    config: AnalysisConfig,
    info: ContainerInfo,
    streams: Vec<StreamTimingAccumulator>,
    flush_packets: usize,
}

impl ContainerAnalyzer {
    pub fn new(config: AnalysisConfig, streams: Vec<StreamMetadata>) -> Result<Self, TimingError> {
        let mut accumulators: Vec<StreamTimingAccumulator> = Vec::with_capacity(streams.len());
        for metadata in streams {
            if accumulators.iter().any(|acc| acc.index() == metadata.index) {
                return Err(TimingError::DuplicateStream(metadata.index));
            }
            debug!(
                stream = metadata.index,
                kind = %metadata.kind,
                time_base = %metadata.time_base,
                "registering stream"
            );
            accumulators.push(StreamTimingAccumulator::new(metadata));
        }
        Ok(Self {
            config,
            info: ContainerInfo::default(),
            streams: accumulators,
            flush_packets: 0,
        })
    }

    pub fn with_info(mut self, info: ContainerInfo) -> Self {
        self.info = info;
        self
    }

    /// Captures one demuxed packet. Flush packets are dropped here, before
    /// they can reach an accumulator.
    pub fn capture(&mut self, record: PacketRecord) -> Result<(), TimingError> {
        if record.is_flush() {
            trace!(stream = record.stream_index, "dropping flush packet");
            self.flush_packets += 1;
            return Ok(());
        }
        let accumulator = self
            .streams
            .iter_mut()
            .find(|acc| acc.index() == record.stream_index)
            .ok_or(TimingError::UnknownStream(record.stream_index))?;
        accumulator.capture(record)
    }

    /// Finalizes every stream and runs the analysis passes.
    pub fn finish(mut self) -> Result<ContainerReport, TimingError> {
        for accumulator in &mut self.streams {
            accumulator.finalize()?;
        }

        let streams = self
            .streams
            .iter()
            .map(|acc| analyze_stream(acc, &self.config))
            .collect::<Result<Vec<_>, _>>()?;

        let av_sync = av_sync(&streams, &self.config);

        info!(
            streams = streams.len(),
            flush_packets = self.flush_packets,
            av_sync = av_sync.is_some(),
            "container analysis complete"
        );

        Ok(ContainerReport {
            info: self.info,
            streams,
            av_sync,
            flush_packets: self.flush_packets,
        })
    }
}

/// Runs every per-stream pass over a finalized accumulator.
pub fn analyze_stream(
    accumulator: &StreamTimingAccumulator,
    config: &AnalysisConfig,
) -> Result<StreamReport, TimingError> {
    let metadata = accumulator.metadata();
    let series = accumulator.series()?;
    let marks = accumulator.marks()?;
    let time_base = metadata.time_base;

    let estimate = DurationEstimator::estimate(marks, metadata);
    let verdict = config.validation.judge(&estimate, metadata, time_base);

    let rates = WindowedRateCalculator::with_window(time_base, config.rate.window_seconds);
    let bitrate = rates.bitrate(series);
    let fps = rates.fps(series);

    let dts_delta = delta_series(&series.dts);

    if series.is_empty() {
        warn!(stream = metadata.index, kind = %metadata.kind, "stream has no packets");
    }
    debug!(
        stream = metadata.index,
        packets = series.len(),
        bitrate_windows = bitrate.len(),
        fps_windows = fps.len(),
        %verdict,
        "stream analyzed"
    );

    let seconds = SecondsSeries {
        dts: series.dts_seconds(time_base),
        pts: series.pts_seconds(time_base),
        duration: series.duration_seconds(time_base),
        dts_delta: dts_delta.iter().map(|d| time_base.to_seconds_opt(*d)).collect(),
    };

    Ok(StreamReport {
        metadata: metadata.clone(),
        marks: marks.clone(),
        estimate,
        verdict,
        series: series.clone(),
        seconds,
        dts_delta,
        bitrate,
        fps,
    })
}

/// Sync between the first stream of the base kind and the first stream of
/// the other kind, when both exist and carry packets.
fn av_sync(streams: &[StreamReport], config: &AnalysisConfig) -> Option<AvSyncReport> {
    let base_kind = config.sync.base.base_kind();
    let other_kind = config.sync.base.other_kind();
    let base = streams.iter().find(|s| s.metadata.kind == base_kind)?;
    let other = streams.iter().find(|s| s.metadata.kind == other_kind)?;

    if base.series.is_empty() || other.series.is_empty() {
        debug!("skipping av sync: one side has no packets");
        return None;
    }

    let basis = config.sync.basis;
    let other_ts = basis.seconds(&other.series, other.metadata.time_base);
    let base_ts = basis.seconds(&base.series, base.metadata.time_base);
    let samples = AvSyncAnalyzer::new(&other_ts).analyze(&base_ts);

    Some(AvSyncReport {
        base_index: base.metadata.index,
        other_index: other.metadata.index,
        basis,
        samples,
    })
}

impl ContainerReport {
    /// Per-stream verdicts. In strict mode any invalid stream turns into
    /// [`TimingError::ValidationFailed`], listing every failing stream.
    pub fn validate(&self, strict: bool) -> Result<Vec<(usize, Verdict)>, TimingError> {
        let verdicts: Vec<(usize, Verdict)> = self
            .streams
            .iter()
            .map(|s| (s.metadata.index, s.verdict))
            .collect();

        let failed: Vec<usize> = verdicts
            .iter()
            .filter(|(_, verdict)| verdict.is_invalid())
            .map(|(index, _)| *index)
            .collect();

        for (index, verdict) in &verdicts {
            if verdict.is_invalid() {
                warn!(stream = index, %verdict, "duration validation failed");
            }
        }

        if strict && !failed.is_empty() {
            return Err(TimingError::ValidationFailed { failed });
        }
        Ok(verdicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::SkipReason;
    use crate::record::StreamKind;
    use crate::sync::SyncBasis;
    use crate::time_base::TimeBase;

    const PACKETS: i64 = 500;
    // 40 ms video frames on a 90 kHz clock
    const VIDEO_FRAME: i64 = 3600;
    // 1024-sample AAC frames at 48 kHz
    const AUDIO_FRAME: i64 = 1024;

    fn video_meta(declared: i64) -> StreamMetadata {
        StreamMetadata::new(0, StreamKind::Video, TimeBase::MPEG_90K)
            .with_declared_duration(Some(declared))
            .with_declared_start_time(Some(0))
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    }

    fn audio_meta(declared: i64) -> StreamMetadata {
        StreamMetadata::new(1, StreamKind::Audio, TimeBase::new(1, 48_000).unwrap())
            .with_declared_duration(Some(declared))
            .with_declared_start_time(Some(0))
    }

    /// Interleaved audio/video container with B-frame style pts reordering
    /// on the video stream and one flush packet per stream at the end.
    fn run(video_declared: i64, audio_declared: i64) -> ContainerReport {
        init_tracing();
        let mut analyzer = ContainerAnalyzer::new(
            AnalysisConfig::default(),
            vec![video_meta(video_declared), audio_meta(audio_declared)],
        )
        .unwrap();

        for i in 0..PACKETS {
            let dts = (i - 1) * VIDEO_FRAME;
            // pts order: 0, 2, 1, 4, 3, ...
            let frame = match i {
                0 => 0,
                n if n % 2 == 1 => n + 1,
                n => n - 1,
            }
            .min(PACKETS - 1);
            analyzer
                .capture(PacketRecord::new(
                    0,
                    Some(dts),
                    Some(frame * VIDEO_FRAME),
                    Some(VIDEO_FRAME),
                    4000,
                ))
                .unwrap();
            let ats = i * AUDIO_FRAME;
            analyzer
                .capture(PacketRecord::new(1, Some(ats), Some(ats), Some(AUDIO_FRAME), 300))
                .unwrap();
        }
        analyzer.capture(PacketRecord::new(0, None, None, None, 0)).unwrap();
        analyzer.capture(PacketRecord::new(1, None, None, None, 0)).unwrap();
        analyzer.finish().unwrap()
    }

    #[test]
    fn test_matching_durations_validate() {
        let report = run(PACKETS * VIDEO_FRAME, PACKETS * AUDIO_FRAME);
        assert_eq!(report.flush_packets, 2);

        let video = &report.streams[0];
        assert_eq!(video.series.len(), PACKETS as usize);
        assert_eq!(video.estimate.by_sum, Some(PACKETS * VIDEO_FRAME));
        assert_eq!(video.estimate.by_pts, Some(PACKETS * VIDEO_FRAME));
        assert_eq!(video.estimate.delta_by_pts_and_start_time, Some(0));

        let verdicts = report.validate(true).unwrap();
        assert_eq!(verdicts.len(), 2);
        assert!(verdicts.iter().all(|(_, v)| matches!(v, Verdict::Valid { .. })));
    }

    #[test]
    fn test_sub_millisecond_mismatch_is_valid() {
        // 0.5 ms off on the audio stream: 24 ticks at 48 kHz
        let report = run(PACKETS * VIDEO_FRAME, PACKETS * AUDIO_FRAME + 24);
        assert!(report.validate(true).is_ok());
    }

    #[test]
    fn test_perturbed_duration_fails_strict_mode() {
        // 5 ms off on the video stream: 450 ticks at 90 kHz
        let report = run(PACKETS * VIDEO_FRAME + 450, PACKETS * AUDIO_FRAME);

        let verdicts = report.validate(false).unwrap();
        assert!(verdicts[0].1.is_invalid());
        assert!(!verdicts[1].1.is_invalid());

        assert_eq!(
            report.validate(true).unwrap_err(),
            TimingError::ValidationFailed { failed: vec![0] }
        );
    }

    #[test]
    fn test_every_failing_stream_is_listed() {
        let report = run(PACKETS * VIDEO_FRAME - 450, PACKETS * AUDIO_FRAME + 480);
        assert_eq!(
            report.validate(true).unwrap_err(),
            TimingError::ValidationFailed { failed: vec![0, 1] }
        );
    }

    #[test]
    fn test_report_series_and_rates() {
        let report = run(PACKETS * VIDEO_FRAME, PACKETS * AUDIO_FRAME);
        let video = &report.streams[0];
        assert_eq!(video.seconds.dts.len(), video.series.len());
        assert_eq!(video.seconds.pts.len(), video.series.len());
        assert_eq!(video.dts_delta.len(), video.series.len());
        assert_eq!(video.dts_delta[0], Some(VIDEO_FRAME));
        assert_eq!(video.dts_delta.last(), Some(&None));
        // 25 fps, 500 frames = 20 s, so 19 closed windows
        assert_eq!(video.fps.len(), 19);
        assert!(video.fps.iter().skip(1).all(|s| s.value == 25.0));

        let sync = report.av_sync.as_ref().unwrap();
        assert_eq!(sync.base_index, 1);
        assert_eq!(sync.other_index, 0);
        assert_eq!(sync.basis, SyncBasis::Pts);
        assert_eq!(sync.samples.len(), PACKETS as usize);
        assert!(sync.samples.iter().all(|s| s.offset <= 0.02 + 1e-9));
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let mut acc = StreamTimingAccumulator::new(video_meta(PACKETS * VIDEO_FRAME));
        for i in 0..50 {
            let ts = Some(i * VIDEO_FRAME);
            acc.capture(PacketRecord::new(0, ts, ts, Some(VIDEO_FRAME), 1000))
                .unwrap();
        }
        acc.finalize().unwrap();
        let config = AnalysisConfig::default();
        let first = analyze_stream(&acc, &config).unwrap();
        let second = analyze_stream(&acc, &config).unwrap();
        assert_eq!(first.estimate, second.estimate);
        assert_eq!(first.bitrate, second.bitrate);
        assert_eq!(first.fps, second.fps);
        assert_eq!(first.dts_delta, second.dts_delta);
    }

    #[test]
    fn test_analyze_before_finalize_fails() {
        let acc = StreamTimingAccumulator::new(video_meta(0));
        assert_eq!(
            analyze_stream(&acc, &AnalysisConfig::default()).unwrap_err(),
            TimingError::NotFinalized(0)
        );
    }

    #[test]
    fn test_empty_stream_disables_sync() {
        let mut analyzer = ContainerAnalyzer::new(
            AnalysisConfig::default(),
            vec![video_meta(100), audio_meta(100)],
        )
        .unwrap();
        analyzer
            .capture(PacketRecord::new(0, Some(0), Some(0), Some(100), 10))
            .unwrap();
        let report = analyzer.finish().unwrap();

        assert!(report.av_sync.is_none());
        let audio = &report.streams[1];
        assert!(audio.series.is_empty());
        assert!(audio.dts_delta.is_empty());
        assert_eq!(audio.estimate.by_dts, None);
        assert_eq!(
            audio.verdict,
            Verdict::Skipped {
                reason: SkipReason::MissingEstimate
            }
        );
    }

    #[test]
    fn test_extreme_timestamps_are_reported_missing() {
        init_tracing();
        let mut analyzer =
            ContainerAnalyzer::new(AnalysisConfig::default(), vec![video_meta(1000)]).unwrap();
        for dts in [-5_000_000_000_000_000_000i64, 5_000_000_000_000_000_000] {
            analyzer
                .capture(PacketRecord::new(0, Some(dts), Some(dts), Some(3600), 10))
                .unwrap();
        }
        let report = analyzer.finish().unwrap();

        let video = &report.streams[0];
        assert_eq!(video.estimate.by_dts, None);
        assert_eq!(video.estimate.by_sum, Some(7200));
        assert_eq!(video.dts_delta, vec![None, None]);
        assert_eq!(video.seconds.dts_delta, vec![None, None]);
    }

    #[test]
    fn test_unknown_and_duplicate_streams() {
        assert_eq!(
            ContainerAnalyzer::new(AnalysisConfig::default(), vec![video_meta(1), video_meta(1)])
                .unwrap_err(),
            TimingError::DuplicateStream(0)
        );

        let mut analyzer =
            ContainerAnalyzer::new(AnalysisConfig::default(), vec![video_meta(1)]).unwrap();
        assert_eq!(
            analyzer
                .capture(PacketRecord::new(7, Some(0), Some(0), None, 10))
                .unwrap_err(),
            TimingError::UnknownStream(7)
        );
        // flush packets of unknown streams are dropped before routing
        assert!(analyzer.capture(PacketRecord::new(7, None, None, None, 0)).is_ok());
    }
}
