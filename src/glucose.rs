//! Glucose day windows and the interactive queries run against them
//!
//! A meal is shown against the glucose trace of the day it was eaten. The
//! day window is every sample sharing the meal's calendar date, optionally
//! narrowed to a clock range (the comparison view only shows the evening).
//!
//! Two queries run on every pointer event of the chart, so both are cheap:
//!
//! - [`nearest`]: binary search for the sample closest to a hovered time.
//! - [`aggregate`] / [`aggregate_span`]: mean, min and max over a brushed
//!   range, selected either by time or by rendered x position.
//!
//! Samples are expected in ascending timestamp order, which is how the CGM
//! exports are written. Windows keep input order and are never re-sorted.

use crate::error::{Error, Result};
use crate::record::{parse_timestamp, MealType, Record};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::ops::RangeInclusive;

/// Target glucose band in mg/dL
pub const IDEAL_RANGE: RangeInclusive<f64> = 70.0..=140.0;

/// A record placed on the time axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlucoseSample {
    pub timestamp: NaiveDateTime,
    /// mg/dL
    pub glucose: f64,
    pub meal: Option<String>,
    pub meal_type: Option<MealType>,
}

impl GlucoseSample {
    /// `None` for rows without a usable timestamp
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            timestamp: record.timestamp?,
            glucose: record.glucose,
            meal: record.meal.clone(),
            meal_type: record.meal_type,
        })
    }
}

/// Inclusive time-of-day range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidTimeRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// 17:00 until the last millisecond before midnight
    pub fn evening() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default(),
        }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_clock_time(start)?, parse_clock_time(end)?)
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time <= self.end
    }
}

/// `HH:MM`, `HH:MM:SS` or `HH:MM:SS.fff`
pub fn parse_clock_time(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| Error::InvalidClockTime(s.to_string()))
}

/// A clock time on `date`, or a full timestamp on any day
pub fn resolve_time(date: NaiveDate, s: &str) -> Result<NaiveDateTime> {
    match parse_clock_time(s) {
        Ok(time) => Ok(date.and_time(time)),
        Err(_) => parse_timestamp(s),
    }
}

/// Samples of one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub range: Option<TimeRange>,
    samples: Vec<GlucoseSample>,
}

impl DayWindow {
    pub fn samples(&self) -> &[GlucoseSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Earliest and latest timestamps, the x domain of the chart
    pub fn extent(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.samples.iter().map(|s| s.timestamp).min()?;
        let last = self.samples.iter().map(|s| s.timestamp).max()?;
        Some((first, last))
    }

    /// Highest reading, the y domain of the chart
    pub fn peak(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.glucose)
            .reduce(f64::max)
    }

    /// Statistics over the whole window
    pub fn stats(&self) -> Option<RangeStats> {
        RangeStats::from_samples(&self.samples)
    }
}

/// Every sample on the reference timestamp's date, optionally restricted to
/// a clock range. Input order is kept.
pub fn select_day(
    all_samples: &[Record],
    reference: NaiveDateTime,
    range: Option<TimeRange>,
) -> DayWindow {
    let date = reference.date();
    let samples: Vec<GlucoseSample> = all_samples
        .iter()
        .filter_map(GlucoseSample::from_record)
        .filter(|s| s.timestamp.date() == date)
        .filter(|s| range.map_or(true, |r| r.contains(s.timestamp.time())))
        .collect();

    log::debug!(
        "day window {} {:?}: {} of {} rows",
        date,
        range,
        samples.len(),
        all_samples.len()
    );

    DayWindow {
        date,
        range,
        samples,
    }
}

/// Sample closest in time to `query`.
///
/// Finds the first sample at or after `query` and compares it with the one
/// before; on an exact tie the later sample wins.
pub fn nearest(window: &DayWindow, query: NaiveDateTime) -> Result<&GlucoseSample> {
    let samples = window.samples();
    if samples.is_empty() {
        return Err(Error::EmptyWindow);
    }

    let i = samples.partition_point(|s| s.timestamp < query);
    if i == 0 {
        return Ok(&samples[0]);
    }
    if i == samples.len() {
        return Ok(&samples[i - 1]);
    }

    let lo = &samples[i - 1];
    let hi = &samples[i];
    if query - lo.timestamp < hi.timestamp - query {
        Ok(lo)
    } else {
        Ok(hi)
    }
}

/// Reduction of the glucose values inside a brushed range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// First selected sample
    pub start: GlucoseSample,
    /// Last selected sample
    pub end: GlucoseSample,
}

impl RangeStats {
    fn from_samples<'a, I>(samples: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GlucoseSample>,
    {
        let mut iter = samples.into_iter();
        let first = iter.next()?;
        let mut last = first;
        let mut sum = first.glucose;
        let mut min = first.glucose;
        let mut max = first.glucose;
        let mut count = 1usize;

        for s in iter {
            sum += s.glucose;
            min = min.min(s.glucose);
            max = max.max(s.glucose);
            count += 1;
            last = s;
        }

        Some(Self {
            mean: sum / count as f64,
            min,
            max,
            count,
            start: first.clone(),
            end: last.clone(),
        })
    }

    /// True when the whole range stayed inside [`IDEAL_RANGE`]
    pub fn within_ideal(&self) -> bool {
        IDEAL_RANGE.contains(&self.min) && IDEAL_RANGE.contains(&self.max)
    }
}

/// Stats over samples whose timestamp lies in `[from, to]`.
///
/// `None` when nothing falls in the range; callers should then show nothing.
pub fn aggregate(window: &DayWindow, from: NaiveDateTime, to: NaiveDateTime) -> Option<RangeStats> {
    let (from, to) = if from <= to { (from, to) } else { (to, from) };
    RangeStats::from_samples(
        window
            .samples()
            .iter()
            .filter(|s| from <= s.timestamp && s.timestamp <= to),
    )
}

/// Maps the window's time extent onto `[0, width]` pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    start: NaiveDateTime,
    end: NaiveDateTime,
    width: f64,
}

impl TimeScale {
    pub fn new(window: &DayWindow, width: f64) -> Option<Self> {
        let (start, end) = window.extent()?;
        Some(Self { start, end, width })
    }

    fn span_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    /// Horizontal position of a timestamp. A single-instant domain maps
    /// everything to the middle.
    pub fn position(&self, t: NaiveDateTime) -> f64 {
        let span = self.span_ms();
        if span == 0 {
            return self.width / 2.0;
        }
        (t - self.start).num_milliseconds() as f64 / span as f64 * self.width
    }

    /// Timestamp at a horizontal position. Positions outside `[0, width]`
    /// map to the nearest end of the domain.
    pub fn invert(&self, x: f64) -> NaiveDateTime {
        if self.width.is_nan() || self.width <= 0.0 || x.is_nan() {
            return self.start;
        }
        let x = x.clamp(0.0, self.width);
        let offset = (x / self.width * self.span_ms() as f64).round() as i64;
        self.start
            .checked_add_signed(chrono::Duration::milliseconds(offset))
            .unwrap_or(self.end)
    }
}

/// Stats over samples whose rendered position lies in `[x0, x1]`
pub fn aggregate_span(window: &DayWindow, scale: &TimeScale, x0: f64, x1: f64) -> Option<RangeStats> {
    let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
    RangeStats::from_samples(window.samples().iter().filter(|s| {
        let x = scale.position(s.timestamp);
        x0 <= x && x <= x1
    }))
}

/// Samples that mark a main meal on the chart
pub fn meal_markers(window: &DayWindow) -> Vec<&GlucoseSample> {
    window
        .samples()
        .iter()
        .filter(|s| s.meal_type.map_or(false, |t| t.is_annotated()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn sample(ts: NaiveDateTime, glucose: f64) -> Record {
        Record {
            timestamp: Some(ts),
            glucose,
            ..Record::default()
        }
    }

    fn window_of(records: &[Record]) -> DayWindow {
        select_day(records, at(1, 0, 0, 0), None)
    }

    // ==========================================================================
    // DAY SELECTION TESTS
    // ==========================================================================
    //
    // Samples join the window when their calendar date equals the reference
    // date; neighbouring days are excluded no matter how close they sit in
    // the table.
    // ==========================================================================

    #[test]
    fn test_select_day_excludes_other_dates() {
        let records = vec![
            sample(at(1, 23, 55, 0), 100.0),
            sample(at(2, 0, 0, 0), 110.0),
            sample(at(2, 0, 5, 0), 115.0),
        ];
        let window = select_day(&records, at(1, 12, 0, 0), None);

        assert_eq!(window.len(), 1);
        assert_eq!(window.samples()[0].glucose, 100.0);
        assert_eq!(window.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_select_day_preserves_order() {
        let records = vec![
            sample(at(1, 9, 0, 0), 1.0),
            sample(at(1, 8, 0, 0), 2.0),
            sample(at(1, 10, 0, 0), 3.0),
        ];
        let window = window_of(&records);
        let values: Vec<f64> = window.samples().iter().map(|s| s.glucose).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0], "window must not re-sort");
    }

    #[test]
    fn test_select_day_skips_undated_rows() {
        let records = vec![
            Record {
                meal: Some("Ghost".to_string()),
                ..Record::default()
            },
            sample(at(1, 8, 0, 0), 90.0),
        ];
        assert_eq!(window_of(&records).len(), 1);
    }

    #[test]
    fn test_select_day_evening_range() {
        let records = vec![
            sample(at(1, 8, 0, 0), 90.0),
            sample(at(1, 17, 0, 0), 120.0),
            sample(at(1, 23, 59, 59), 100.0),
        ];
        let window = select_day(&records, at(1, 18, 30, 0), Some(TimeRange::evening()));

        assert_eq!(window.len(), 2, "08:00 is outside the evening range");
        assert_eq!(window.samples()[0].glucose, 120.0);
    }

    #[test]
    fn test_select_day_empty() {
        let records = vec![sample(at(2, 8, 0, 0), 90.0)];
        let window = window_of(&records);
        assert!(window.is_empty());
        assert!(window.extent().is_none());
        assert!(window.peak().is_none());
        assert!(window.stats().is_none());
    }

    // ==========================================================================
    // TIME RANGE TESTS
    // ==========================================================================

    #[test]
    fn test_time_range_inclusive() {
        let range = TimeRange::evening();
        assert!(range.contains(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
        assert!(range.contains(NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap()));
        assert!(!range.contains(NaiveTime::from_hms_milli_opt(16, 59, 59, 999).unwrap()));
    }

    #[test]
    fn test_time_range_parse() {
        let range = TimeRange::parse("17:00", "23:59:59.999").unwrap();
        assert_eq!(range, TimeRange::evening());

        assert!(matches!(
            TimeRange::parse("18:00", "17:00"),
            Err(Error::InvalidTimeRange { .. })
        ));
        assert!(matches!(
            TimeRange::parse("dinner", "17:00"),
            Err(Error::InvalidClockTime(_))
        ));
    }

    // ==========================================================================
    // NEAREST SAMPLE TESTS
    // ==========================================================================
    //
    // Window: 10:00, 10:05, 10:10
    //   10:07    -> 10:05 (2 min vs 3 min)
    //   10:08    -> 10:10 (3 min vs 2 min)
    //   10:07:30 -> 10:10 (tie goes to the later sample)
    //   10:05    -> 10:05 (exact match)
    // ==========================================================================

    fn hover_window() -> DayWindow {
        window_of(&[
            sample(at(1, 10, 0, 0), 80.0),
            sample(at(1, 10, 5, 0), 120.0),
            sample(at(1, 10, 10, 0), 100.0),
        ])
    }

    #[test]
    fn test_nearest_prefers_earlier_when_closer() {
        let window = hover_window();
        let s = nearest(&window, at(1, 10, 7, 0)).unwrap();
        assert_eq!(s.timestamp, at(1, 10, 5, 0));
    }

    #[test]
    fn test_nearest_prefers_later_when_closer() {
        let window = hover_window();
        let s = nearest(&window, at(1, 10, 8, 0)).unwrap();
        assert_eq!(s.timestamp, at(1, 10, 10, 0));
    }

    #[test]
    fn test_nearest_tie_goes_to_later() {
        let window = hover_window();
        let s = nearest(&window, at(1, 10, 7, 30)).unwrap();
        assert_eq!(s.timestamp, at(1, 10, 10, 0));
    }

    #[test]
    fn test_nearest_exact_match() {
        let window = hover_window();
        for t in [at(1, 10, 0, 0), at(1, 10, 5, 0), at(1, 10, 10, 0)] {
            assert_eq!(nearest(&window, t).unwrap().timestamp, t);
        }
    }

    #[test]
    fn test_nearest_outside_extent() {
        let window = hover_window();
        assert_eq!(
            nearest(&window, at(1, 9, 0, 0)).unwrap().timestamp,
            at(1, 10, 0, 0)
        );
        assert_eq!(
            nearest(&window, at(1, 11, 0, 0)).unwrap().timestamp,
            at(1, 10, 10, 0)
        );
    }

    #[test]
    fn test_nearest_empty_window_is_error() {
        let window = window_of(&[]);
        assert!(matches!(
            nearest(&window, at(1, 10, 0, 0)),
            Err(Error::EmptyWindow)
        ));
    }

    // ==========================================================================
    // AGGREGATE TESTS
    // ==========================================================================

    #[test]
    fn test_aggregate_mean_min_max() {
        let window = hover_window();
        let stats = aggregate(&window, at(1, 10, 0, 0), at(1, 10, 10, 0)).unwrap();

        assert_eq!(stats.mean, 100.0);
        assert_eq!(stats.min, 80.0);
        assert_eq!(stats.max, 120.0);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.start.timestamp, at(1, 10, 0, 0));
        assert_eq!(stats.end.timestamp, at(1, 10, 10, 0));
    }

    #[test]
    fn test_aggregate_partial_range() {
        let window = hover_window();
        let stats = aggregate(&window, at(1, 10, 3, 0), at(1, 10, 12, 0)).unwrap();

        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean, 110.0);
        assert_eq!(stats.start.glucose, 120.0);
        assert_eq!(stats.end.glucose, 100.0);
    }

    #[test]
    fn test_aggregate_reversed_bounds() {
        let window = hover_window();
        let forward = aggregate(&window, at(1, 10, 0, 0), at(1, 10, 5, 0));
        let backward = aggregate(&window, at(1, 10, 5, 0), at(1, 10, 0, 0));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_aggregate_empty_selection() {
        let window = hover_window();
        assert!(aggregate(&window, at(1, 10, 1, 0), at(1, 10, 4, 0)).is_none());
    }

    #[test]
    fn test_within_ideal() {
        let window = hover_window();
        assert!(window.stats().unwrap().within_ideal());

        let spiky = window_of(&[sample(at(1, 12, 0, 0), 95.0), sample(at(1, 12, 5, 0), 180.0)]);
        assert!(!spiky.stats().unwrap().within_ideal());
    }

    // ==========================================================================
    // TIME SCALE TESTS
    // ==========================================================================

    #[test]
    fn test_time_scale_mapping() {
        let window = hover_window();
        let scale = TimeScale::new(&window, 600.0).unwrap();

        assert_eq!(scale.position(at(1, 10, 0, 0)), 0.0);
        assert_eq!(scale.position(at(1, 10, 5, 0)), 300.0);
        assert_eq!(scale.position(at(1, 10, 10, 0)), 600.0);
        assert_eq!(scale.invert(300.0), at(1, 10, 5, 0));
        assert_eq!(scale.invert(420.0), at(1, 10, 7, 0));
    }

    #[test]
    fn test_time_scale_single_instant() {
        let window = window_of(&[sample(at(1, 10, 0, 0), 90.0)]);
        let scale = TimeScale::new(&window, 600.0).unwrap();
        assert_eq!(scale.position(at(1, 10, 0, 0)), 300.0);
        assert_eq!(scale.invert(100.0), at(1, 10, 0, 0));
    }

    #[test]
    fn test_time_scale_invert_clamps_outside_positions() {
        let window = hover_window();
        let scale = TimeScale::new(&window, 600.0).unwrap();

        assert_eq!(scale.invert(-1e30), at(1, 10, 0, 0));
        assert_eq!(scale.invert(-5.0), at(1, 10, 0, 0));
        assert_eq!(scale.invert(1e30), at(1, 10, 10, 0));
        assert_eq!(scale.invert(f64::INFINITY), at(1, 10, 10, 0));
        assert_eq!(scale.invert(f64::NAN), at(1, 10, 0, 0));
    }

    #[test]
    fn test_time_scale_zero_width() {
        let window = hover_window();
        let scale = TimeScale::new(&window, 0.0).unwrap();
        assert_eq!(scale.invert(1e30), at(1, 10, 0, 0));
    }

    #[test]
    fn test_aggregate_span_by_position() {
        let window = hover_window();
        let scale = TimeScale::new(&window, 600.0).unwrap();

        let stats = aggregate_span(&window, &scale, 250.0, 600.0).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 120.0);

        assert!(aggregate_span(&window, &scale, 10.0, 290.0).is_none());
    }

    #[test]
    fn test_hover_and_brush_via_scale() {
        // Pointer at x=420 is 10:07, nearest sample 10:05
        let window = hover_window();
        let scale = TimeScale::new(&window, 600.0).unwrap();
        let s = nearest(&window, scale.invert(420.0)).unwrap();
        assert_eq!(s.glucose, 120.0);
    }

    // ==========================================================================
    // MEAL MARKER TESTS
    // ==========================================================================

    #[test]
    fn test_meal_markers_skip_snacks() {
        let mut breakfast = sample(at(1, 8, 0, 0), 90.0);
        breakfast.meal_type = Some(MealType::Breakfast);
        let mut snack = sample(at(1, 15, 0, 0), 100.0);
        snack.meal_type = Some(MealType::Snack);
        let mut dinner = sample(at(1, 19, 0, 0), 110.0);
        dinner.meal_type = Some(MealType::Dinner);
        let plain = sample(at(1, 20, 0, 0), 105.0);

        let window = window_of(&[breakfast, snack, dinner, plain]);
        let markers: Vec<Option<MealType>> =
            meal_markers(&window).iter().map(|s| s.meal_type).collect();

        assert_eq!(markers, vec![Some(MealType::Breakfast), Some(MealType::Dinner)]);
    }

    #[test]
    fn test_extent_and_peak() {
        let window = hover_window();
        assert_eq!(window.extent(), Some((at(1, 10, 0, 0), at(1, 10, 10, 0))));
        assert_eq!(window.peak(), Some(120.0));
    }

    #[test]
    fn test_resolve_time() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            resolve_time(date, "18:20").unwrap(),
            date.and_hms_opt(18, 20, 0).unwrap()
        );
        assert_eq!(
            resolve_time(date, "2024-03-02 07:00:00").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap().and_hms_opt(7, 0, 0).unwrap()
        );
    }
}
