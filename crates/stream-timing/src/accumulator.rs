//! # Stream Timing Accumulator
//!
//! Collects the timing records of one elementary stream in arrival order and,
//! once the demuxer is exhausted, transposes them into four parallel series
//! (dts, pts, duration, size) for the analysis passes.
//!
//! While capturing, the accumulator also keeps a running set of
//! [`TimingMarks`] (first/last timestamps, the biggest valid pts, the
//! duration sum...) so that the duration estimators never have to rescan the
//! series.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::error::TimingError;
use crate::record::{PacketRecord, StreamMetadata};
use crate::time_base::TimeBase;

/// Running timestamp landmarks of a stream, updated once per captured packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingMarks {
    pub packet_count: usize,
    pub total_size: u64,

    pub first_dts: Option<i64>,
    pub first_pts: Option<i64>,
    pub last_dts: Option<i64>,
    pub last_pts: Option<i64>,
    /// Duration of the last packet that carried a duration.
    pub last_duration: Option<i64>,
    /// Duration of the packet that produced `last_dts`.
    pub last_dts_duration: Option<i64>,

    /// dts/pts of the first packet whose pts is `>= 0`.
    pub first_valid_packet_dts: Option<i64>,
    pub first_valid_packet_pts: Option<i64>,

    pub smallest_valid_pts: Option<i64>,
    pub biggest_pts: Option<i64>,
    pub biggest_pts_packet_duration: Option<i64>,

    /// Sum of every packet duration, `None` until a packet carries one or
    /// once the sum overflows.
    pub duration_sum: Option<i64>,
    #[serde(skip)]
    duration_sum_overflowed: bool,
    /// Number of packets whose dts went backwards.
    pub dts_regressions: usize,
}

impl TimingMarks {
    pub fn observe(&mut self, record: &PacketRecord) {
        self.packet_count += 1;
        self.total_size = self.total_size.saturating_add(record.size);

        if self.first_dts.is_none() {
            self.first_dts = record.dts;
        }
        if self.first_pts.is_none() {
            self.first_pts = record.pts;
        }

        if let Some(dts) = record.dts {
            if let Some(last) = self.last_dts.filter(|last| dts < *last) {
                self.dts_regressions += 1;
                debug!(dts, last_dts = last, "dts went backwards");
            }
            self.last_dts = Some(dts);
            self.last_dts_duration = record.duration;
        }
        if record.pts.is_some() {
            self.last_pts = record.pts;
        }
        if let Some(duration) = record.duration {
            self.last_duration = Some(duration);
            if !self.duration_sum_overflowed {
                self.duration_sum = self.duration_sum.unwrap_or(0).checked_add(duration);
                if self.duration_sum.is_none() {
                    self.duration_sum_overflowed = true;
                    warn!(duration, "duration sum overflowed, dropping the by-sum estimate");
                }
            }
        }

        if let Some(pts) = record.valid_pts() {
            if self.first_valid_packet_pts.is_none() {
                self.first_valid_packet_pts = Some(pts);
                self.first_valid_packet_dts = record.dts;
            }
            if self.smallest_valid_pts.is_none_or(|smallest| pts < smallest) {
                self.smallest_valid_pts = Some(pts);
            }
            if self.biggest_pts.is_none_or(|biggest| pts > biggest) {
                self.biggest_pts = Some(pts);
                self.biggest_pts_packet_duration = record.duration;
            }
        }
    }

    /// Rebuilds the marks from a finalized series.
    pub fn from_series(stream_index: usize, series: &TimingSeries) -> Self {
        let mut marks = Self::default();
        for record in series.records(stream_index) {
            marks.observe(&record);
        }
        marks
    }
}

/// The four parallel per-packet sequences of a finalized stream.
///
/// All four vectors have the same length, equal to the number of captured
/// packets. A missing dts/pts/duration stays in place as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimingSeries {
    pub dts: Vec<Option<i64>>,
    pub pts: Vec<Option<i64>>,
    pub duration: Vec<Option<i64>>,
    pub size: Vec<u64>,
}

impl TimingSeries {
    /// Column-wise extraction of a row buffer.
    pub fn from_records(records: &[PacketRecord]) -> Self {
        let mut series = Self {
            dts: Vec::with_capacity(records.len()),
            pts: Vec::with_capacity(records.len()),
            duration: Vec::with_capacity(records.len()),
            size: Vec::with_capacity(records.len()),
        };
        for record in records {
            series.dts.push(record.dts);
            series.pts.push(record.pts);
            series.duration.push(record.duration);
            series.size.push(record.size);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.size.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Iterates the series back as rows.
    pub fn records(&self, stream_index: usize) -> impl Iterator<Item = PacketRecord> + '_ {
        (0..self.len()).map(move |i| PacketRecord {
            stream_index,
            dts: self.dts[i],
            pts: self.pts[i],
            duration: self.duration[i],
            size: self.size[i],
        })
    }

    pub fn dts_seconds(&self, time_base: TimeBase) -> Vec<Option<f64>> {
        to_seconds(&self.dts, time_base)
    }

    pub fn pts_seconds(&self, time_base: TimeBase) -> Vec<Option<f64>> {
        to_seconds(&self.pts, time_base)
    }

    pub fn duration_seconds(&self, time_base: TimeBase) -> Vec<Option<f64>> {
        to_seconds(&self.duration, time_base)
    }

    pub fn dts_millis(&self, time_base: TimeBase) -> Vec<Option<f64>> {
        self.dts.iter().map(|t| time_base.to_millis_opt(*t)).collect()
    }

    pub fn pts_millis(&self, time_base: TimeBase) -> Vec<Option<f64>> {
        self.pts.iter().map(|t| time_base.to_millis_opt(*t)).collect()
    }

    /// Packet sizes in KiB, for plotting next to the timestamps.
    pub fn size_kib(&self) -> Vec<f64> {
        self.size.iter().map(|s| *s as f64 / 1024.0).collect()
    }
}

fn to_seconds(ticks: &[Option<i64>], time_base: TimeBase) -> Vec<Option<f64>> {
    ticks.iter().map(|t| time_base.to_seconds_opt(*t)).collect()
}

#[derive(Debug)]
enum State {
    Capturing(Vec<PacketRecord>),
    Finalized(TimingSeries),
}

/// Owns the ordered packet buffer of exactly one stream.
#[derive(Debug)]
pub struct StreamTimingAccumulator {
    metadata: StreamMetadata,
    marks: TimingMarks,
    state: State,
}

impl StreamTimingAccumulator {
    pub fn new(metadata: StreamMetadata) -> Self {
        Self {
            metadata,
            marks: TimingMarks::default(),
            state: State::Capturing(Vec::new()),
        }
    }

    pub fn metadata(&self) -> &StreamMetadata {
        &self.metadata
    }

    pub fn index(&self) -> usize {
        self.metadata.index
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, State::Finalized(_))
    }

    /// Appends one packet. Flush packets must be filtered out by the caller.
    pub fn capture(&mut self, record: PacketRecord) -> Result<(), TimingError> {
        let index = self.metadata.index;
        if record.stream_index != index {
            return Err(TimingError::UnknownStream(record.stream_index));
        }
        if record.is_flush() {
            return Err(TimingError::FlushPacket(index));
        }
        match &mut self.state {
            State::Capturing(records) => {
                trace!(
                    stream = index,
                    dts = ?record.dts,
                    pts = ?record.pts,
                    duration = ?record.duration,
                    size = record.size,
                    "capture"
                );
                self.marks.observe(&record);
                records.push(record);
                Ok(())
            }
            State::Finalized(_) => Err(TimingError::AlreadyFinalized(index)),
        }
    }

    /// Transposes the row buffer into [`TimingSeries`] and releases it.
    /// May be called exactly once.
    pub fn finalize(&mut self) -> Result<(), TimingError> {
        let index = self.metadata.index;
        let records = match &mut self.state {
            State::Capturing(records) => std::mem::take(records),
            State::Finalized(_) => return Err(TimingError::AlreadyFinalized(index)),
        };
        let series = TimingSeries::from_records(&records);
        debug!(
            stream = index,
            packets = series.len(),
            dts_regressions = self.marks.dts_regressions,
            "stream finalized"
        );
        self.state = State::Finalized(series);
        Ok(())
    }

    pub fn series(&self) -> Result<&TimingSeries, TimingError> {
        match &self.state {
            State::Finalized(series) => Ok(series),
            State::Capturing(_) => Err(TimingError::NotFinalized(self.metadata.index)),
        }
    }

    pub fn marks(&self) -> Result<&TimingMarks, TimingError> {
        match &self.state {
            State::Finalized(_) => Ok(&self.marks),
            State::Capturing(_) => Err(TimingError::NotFinalized(self.metadata.index)),
        }
    }
}
