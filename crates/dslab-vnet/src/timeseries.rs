//! Bounded time series used for utilization monitoring.
//!
//! The series keeps `(time, value)` samples ordered by time and forgets samples which are older than `max_age`
//! relative to the newest one. Between two consecutive samples the value is interpolated linearly.
//! A repeated value is not stored, so the last sample holds its value up to the latest observation.

use std::collections::VecDeque;

use serde::Serialize;
use thiserror::Error;

/// Error returned when a sample is added out of time order.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimeSeriesError {
    #[error("sample at time {time} is older than the last sample at time {last}")]
    OutOfOrder { time: f64, last: f64 },
}

/// Single time series sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// Bounded sequence of `(time, value)` samples.
#[derive(Clone, Debug)]
pub struct TimeSeries {
    samples: VecDeque<Sample>,
    last_update: f64,
    max_age: f64,
}

impl TimeSeries {
    /// Creates an empty series which retains samples not older than `max_age` relative to the newest sample.
    pub fn new(max_age: f64) -> Self {
        Self {
            samples: VecDeque::new(),
            last_update: f64::NEG_INFINITY,
            max_age,
        }
    }

    /// Appends a new sample.
    ///
    /// Samples older than `time - max_age` are dropped first, but at least one sample is always kept.
    /// If the value equals the value of the last sample, the new sample is merged into it: only
    /// the earlier timestamp is stored and the value is known to hold until `time`.
    pub fn add(&mut self, value: f64, time: f64) -> Result<(), TimeSeriesError> {
        if !self.samples.is_empty() && time < self.last_update {
            return Err(TimeSeriesError::OutOfOrder {
                time,
                last: self.last_update,
            });
        }
        self.last_update = time;
        let cutoff = time - self.max_age;
        while self.samples.len() > 1 && self.samples[0].time < cutoff {
            self.samples.pop_front();
        }
        if let Some(last) = self.samples.back() {
            if last.value == value {
                return Ok(());
            }
        }
        self.samples.push_back(Sample { time, value });
        Ok(())
    }

    /// Returns the retained samples in time order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    /// Returns the number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the newest sample.
    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Returns the time of the latest added value, including the merged ones.
    pub fn last_update(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.last_update)
        }
    }

    /// Returns the maximum sample age.
    pub fn max_age(&self) -> f64 {
        self.max_age
    }

    /// Returns the time-weighted average value over `[start, end]`.
    ///
    /// Only the part of the interval covered by the samples is taken into account, the value of the last sample
    /// lasts until [`Self::last_update`].
    /// Returns 0 if the interval has zero duration or no sample falls into it.
    pub fn average_value(&self, start: f64, end: f64) -> f64 {
        if end <= start {
            return 0.;
        }
        let mut covered = 0.;
        let mut integral = 0.;
        for (from, to) in self.clipped_segments(start, end) {
            let duration = to.time - from.time;
            covered += duration;
            integral += duration * (from.value + to.value) / 2.;
        }
        if covered > 0. {
            return integral / covered;
        }
        // a single sample inside the interval has no duration but still describes it
        self.samples
            .iter()
            .rev()
            .find(|s| s.time >= start && s.time <= end)
            .map_or(0., |s| s.value)
    }

    /// Returns the fraction of `[start, end]` during which the value exceeds `threshold`.
    pub fn over_utilized_fraction(&self, start: f64, end: f64, threshold: f64) -> f64 {
        if end <= start {
            return 0.;
        }
        let mut over = 0.;
        for (from, to) in self.clipped_segments(start, end) {
            let duration = to.time - from.time;
            let (low, high) = if from.value <= to.value {
                (from.value, to.value)
            } else {
                (to.value, from.value)
            };
            if low > threshold {
                over += duration;
            } else if high > threshold {
                over += duration * (high - threshold) / (high - low);
            }
        }
        over / (end - start)
    }

    /// Returns a lazy sequence of per-bucket averages for consecutive buckets of width `interval`
    /// covering `[start, end]`. The last bucket is truncated at `end`.
    pub fn value_points(&self, start: f64, end: f64, interval: f64) -> ValuePoints<'_> {
        ValuePoints {
            series: self,
            next_start: start,
            end,
            interval,
        }
    }

    /// Iterates over segments between consecutive samples, newest first. The newest segment is the constant
    /// one from the last sample to the latest update, if they differ.
    fn segments(&self) -> impl Iterator<Item = (Sample, Sample)> + '_ {
        let hold = self.samples.back().filter(|last| last.time < self.last_update).map(|last| {
            let until = Sample {
                time: self.last_update,
                value: last.value,
            };
            (*last, until)
        });
        let len = self.samples.len();
        hold.into_iter()
            .chain((1..len).rev().map(move |i| (self.samples[i - 1], self.samples[i])))
    }

    /// Iterates over segments clipped to `[start, end]`, newest first, with values interpolated at the clipped ends.
    fn clipped_segments(&self, start: f64, end: f64) -> impl Iterator<Item = (Sample, Sample)> + '_ {
        self.segments()
            .take_while(move |(_, to)| to.time > start)
            .filter_map(move |(from, to)| {
                let clip_from = from.time.max(start);
                let clip_to = to.time.min(end);
                if clip_to <= clip_from {
                    return None;
                }
                Some((
                    Sample {
                        time: clip_from,
                        value: interpolate(&from, &to, clip_from),
                    },
                    Sample {
                        time: clip_to,
                        value: interpolate(&from, &to, clip_to),
                    },
                ))
            })
    }
}

fn interpolate(from: &Sample, to: &Sample, time: f64) -> f64 {
    let duration = to.time - from.time;
    if duration <= 0. {
        return to.value;
    }
    from.value + (to.value - from.value) * (time - from.time) / duration
}

/// Iterator over per-bucket averages produced by [`TimeSeries::value_points`].
pub struct ValuePoints<'a> {
    series: &'a TimeSeries,
    next_start: f64,
    end: f64,
    interval: f64,
}

impl Iterator for ValuePoints<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.interval <= 0. || self.next_start >= self.end {
            return None;
        }
        let bucket_start = self.next_start;
        let bucket_end = (bucket_start + self.interval).min(self.end);
        self.next_start = bucket_end;
        Some(self.series.average_value(bucket_start, bucket_end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_float_eq(x: f64, y: f64, eps: f64) {
        assert!((x - y).abs() < eps, "Values do not match: {:.15} vs {:.15}", x, y);
    }

    fn times(series: &TimeSeries) -> Vec<f64> {
        series.samples().map(|s| s.time).collect()
    }

    #[test]
    fn identical_values_are_coalesced() {
        let mut series = TimeSeries::new(100.);
        series.add(10., 0.).unwrap();
        series.add(10., 5.).unwrap();
        series.add(20., 10.).unwrap();
        let samples: Vec<_> = series.samples().map(|s| (s.value, s.time)).collect();
        assert_eq!(samples, vec![(10., 0.), (20., 10.)]);
        assert_float_eq(series.average_value(0., 10.), 15., 1e-12);
    }

    #[test]
    fn repeated_value_lasts_until_last_update() {
        let mut series = TimeSeries::new(100.);
        for time in [10., 20., 30.] {
            series.add(400., time).unwrap();
        }
        let samples: Vec<_> = series.samples().map(|s| (s.value, s.time)).collect();
        assert_eq!(samples, vec![(400., 10.)]);
        assert_eq!(series.last_update(), Some(30.));
        assert_eq!(series.average_value(20., 30.), 400.);
        assert_eq!(series.average_value(25., 40.), 400.);
        assert_eq!(series.over_utilized_fraction(20., 30., 100.), 1.);
        assert_eq!(series.over_utilized_fraction(20., 40., 100.), 0.5);
        assert_eq!(series.value_points(10., 30., 10.).collect::<Vec<_>>(), vec![400., 400.]);

        // merged observation still counts for ordering
        assert_eq!(
            series.add(0., 25.),
            Err(TimeSeriesError::OutOfOrder { time: 25., last: 30. })
        );
        series.add(0., 40.).unwrap();
        assert_eq!(series.len(), 2);
        assert_float_eq(series.average_value(30., 40.), 400. / 6., 1e-9);
    }

    #[test]
    fn old_samples_are_pruned() {
        let mut series = TimeSeries::new(10.);
        series.add(1., 0.).unwrap();
        series.add(2., 5.).unwrap();
        series.add(3., 12.).unwrap();
        series.add(4., 20.).unwrap();
        assert_eq!(times(&series), vec![12., 20.]);
    }

    #[test]
    fn at_least_one_sample_is_kept() {
        let mut series = TimeSeries::new(1.);
        series.add(1., 0.).unwrap();
        series.add(2., 100.).unwrap();
        assert_eq!(times(&series), vec![0., 100.]);
        series.add(2., 200.).unwrap();
        assert_eq!(times(&series), vec![100.]);
        assert_eq!(series.average_value(150., 200.), 2.);
    }

    #[test]
    fn out_of_order_sample_is_rejected() {
        let mut series = TimeSeries::new(10.);
        series.add(1., 5.).unwrap();
        assert_eq!(
            series.add(2., 4.),
            Err(TimeSeriesError::OutOfOrder { time: 4., last: 5. })
        );
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn average_of_empty_or_degenerate_interval() {
        let mut series = TimeSeries::new(10.);
        assert_eq!(series.last_update(), None);
        assert_eq!(series.average_value(0., 10.), 0.);
        series.add(5., 1.).unwrap();
        assert_eq!(series.average_value(3., 3.), 0.);
        assert_eq!(series.average_value(0., 10.), 5.);
        assert_eq!(series.average_value(2., 10.), 0.);
    }

    #[test]
    fn average_is_clipped_to_interval() {
        let mut series = TimeSeries::new(100.);
        series.add(0., 0.).unwrap();
        series.add(10., 10.).unwrap();
        series.add(10., 20.).unwrap();
        series.add(0., 30.).unwrap();
        // the repeated 10 is coalesced, so the fall starts right at t=10
        assert_eq!(series.len(), 3);
        assert_float_eq(series.average_value(5., 10.), 7.5, 1e-12);
        assert_float_eq(series.average_value(0., 30.), 5., 1e-12);
        assert_float_eq(series.average_value(20., 25.), 3.75, 1e-12);
    }

    #[test]
    fn repeated_queries_are_deterministic() {
        let mut series = TimeSeries::new(50.);
        for (i, v) in [3., 1., 4., 1., 5., 9., 2., 6.].iter().enumerate() {
            series.add(*v, i as f64 * 3.).unwrap();
        }
        let first = series.average_value(2., 17.);
        let _ = series.average_value(0., 21.);
        let _ = series.over_utilized_fraction(0., 21., 2.);
        assert_eq!(series.average_value(2., 17.), first);
    }

    #[test]
    fn over_utilized_fraction_counts_crossings() {
        let mut series = TimeSeries::new(100.);
        series.add(0., 0.).unwrap();
        series.add(10., 10.).unwrap();
        assert_float_eq(series.over_utilized_fraction(0., 10., 5.), 0.5, 1e-12);
        assert_float_eq(series.over_utilized_fraction(0., 10., 10.), 0., 1e-12);
        assert_float_eq(series.over_utilized_fraction(0., 10., -1.), 1., 1e-12);
        assert_float_eq(series.over_utilized_fraction(0., 20., -1.), 0.5, 1e-12);
    }

    #[test]
    fn value_points_cover_interval() {
        let mut series = TimeSeries::new(100.);
        series.add(0., 0.).unwrap();
        series.add(10., 10.).unwrap();
        let points: Vec<f64> = series.value_points(0., 10., 4.).collect();
        assert_eq!(points.len(), 3);
        assert_float_eq(points[0], 2., 1e-12);
        assert_float_eq(points[1], 6., 1e-12);
        assert_float_eq(points[2], 9., 1e-12);
        assert_eq!(series.value_points(0., 10., 0.).count(), 0);
    }
}
