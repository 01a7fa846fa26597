use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::TimingError;

/// Seconds per timestamp tick, kept as an exact rational.
///
/// Every raw tick value (dts, pts, duration, declared duration) is multiplied
/// by the time base to obtain physical seconds. Both terms are strictly
/// positive, so a `TimeBase` can never turn a tick count into zero or flip
/// its sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeBase {
    num: i64,
    den: i64,
}

/// Frames per second, with the same positive-rational guarantees as
/// [`TimeBase`] (`30000/1001` for NTSC video). A `0/0` rate from the demuxer
/// means unknown and does not parse.
pub type FrameRate = TimeBase;

impl TimeBase {
    /// The FLV timeline: one tick per millisecond.
    pub const MILLISECONDS: TimeBase = TimeBase { num: 1, den: 1000 };
    /// MPEG-TS / RTP video clock.
    pub const MPEG_90K: TimeBase = TimeBase { num: 1, den: 90_000 };

    pub fn new(num: i64, den: i64) -> Result<Self, TimingError> {
        if num <= 0 || den <= 0 {
            return Err(TimingError::InvalidTimeBase { num, den });
        }
        Ok(Self { num, den })
    }

    pub fn num(&self) -> i64 {
        self.num
    }

    pub fn den(&self) -> i64 {
        self.den
    }

    /// Seconds per tick as a float.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Number of ticks representing one physical second (`1 / time_base`).
    #[inline]
    pub fn ticks_per_second(&self) -> f64 {
        self.den as f64 / self.num as f64
    }

    #[inline]
    pub fn to_seconds(&self, ticks: i64) -> f64 {
        ticks as f64 * self.num as f64 / self.den as f64
    }

    #[inline]
    pub fn to_millis(&self, ticks: i64) -> f64 {
        self.to_seconds(ticks) * 1000.0
    }

    /// Converts a duration in seconds to the nearest tick count.
    #[inline]
    pub fn seconds_to_ticks(&self, seconds: f64) -> i64 {
        (seconds * self.ticks_per_second()).round() as i64
    }

    pub fn to_seconds_opt(&self, ticks: Option<i64>) -> Option<f64> {
        ticks.map(|t| self.to_seconds(t))
    }

    pub fn to_millis_opt(&self, ticks: Option<i64>) -> Option<f64> {
        ticks.map(|t| self.to_millis(t))
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Parses the `num/den` notation used by ffprobe (`"1/90000"`). A bare
/// integer is read as `n/1`.
impl FromStr for TimeBase {
    type Err = TimingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| TimingError::TimeBaseParse(s.to_string()))
        };
        match s.split_once('/') {
            Some((num, den)) => TimeBase::new(parse(num)?, parse(den)?),
            None => TimeBase::new(parse(s)?, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_terms() {
        assert!(TimeBase::new(0, 1000).is_err());
        assert!(TimeBase::new(1, 0).is_err());
        assert!(TimeBase::new(-1, 1000).is_err());
        assert!(TimeBase::new(1, 1000).is_ok());
    }

    #[test]
    fn test_tick_conversions() {
        let tb = TimeBase::MILLISECONDS;
        assert_eq!(tb.to_seconds(1500), 1.5);
        assert_eq!(tb.to_millis(40), 40.0);
        assert_eq!(tb.ticks_per_second(), 1000.0);

        let ntsc = TimeBase::new(1001, 30000).unwrap();
        assert!((ntsc.ticks_per_second() - 29.97).abs() < 0.001);
        assert_eq!(TimeBase::MPEG_90K.seconds_to_ticks(2.0), 180_000);
    }

    #[test]
    fn test_optional_conversion_keeps_missing() {
        let tb = TimeBase::MPEG_90K;
        assert_eq!(tb.to_seconds_opt(None), None);
        assert_eq!(tb.to_seconds_opt(Some(90_000)), Some(1.0));
        assert_eq!(tb.to_millis_opt(None), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!("1/90000".parse::<TimeBase>().unwrap(), TimeBase::MPEG_90K);
        assert_eq!(" 1 / 1000 ".parse::<TimeBase>().unwrap(), TimeBase::MILLISECONDS);
        assert_eq!("1".parse::<TimeBase>().unwrap(), TimeBase::new(1, 1).unwrap());
        assert!("0/1".parse::<TimeBase>().is_err());
        assert!("abc".parse::<TimeBase>().is_err());
        assert_eq!(TimeBase::MPEG_90K.to_string(), "1/90000");
    }

    #[test]
    fn test_parse_frame_rate() {
        let ntsc: FrameRate = "30000/1001".parse().unwrap();
        assert_eq!((ntsc.num(), ntsc.den()), (30000, 1001));
        assert!((ntsc.as_f64() - 29.97).abs() < 0.001);
        assert!("0/0".parse::<FrameRate>().is_err());
    }
}
