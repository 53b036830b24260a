//! Lomb-Scargle periodogram of a light curve.
//!
//! Power is the floating-mean (generalised) Lomb-Scargle PSD: every trial
//! frequency fits a sinusoid plus a constant offset, so unevenly sampled
//! segments do not leak power from the mean level. The PSD is converted
//! to amplitude so a pure sinusoid of amplitude `A` peaks at roughly `A`.
//!
//! The direct sum costs O(samples x frequencies). The default grid is
//! clipped to [`MAX_FREQUENCIES`] bins, which keeps 20-second cadence
//! products tractable; an explicit range wider than that is an error.

use crate::domain::model::TimeSeries;
use crate::utils::error::{Result, VizError};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Upper bound on the number of frequency bins in one periodogram.
pub const MAX_FREQUENCIES: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodogramOptions {
    pub oversample_factor: u32,
    pub nyquist_factor: f64,
    /// 1/day; defaults to the grid spacing.
    pub minimum_frequency: Option<f64>,
    /// 1/day; defaults to `nyquist_factor` times the Nyquist frequency.
    pub maximum_frequency: Option<f64>,
}

impl Default for PeriodogramOptions {
    fn default() -> Self {
        Self {
            oversample_factor: 5,
            nyquist_factor: 1.0,
            minimum_frequency: None,
            maximum_frequency: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    frequency: Vec<f64>,
    power: Vec<f64>,
}

impl Periodogram {
    pub fn new(frequency: Vec<f64>, power: Vec<f64>) -> Result<Self> {
        if frequency.len() != power.len() {
            return Err(VizError::ProcessingError {
                message: format!(
                    "Periodogram has {} frequencies but {} power values",
                    frequency.len(),
                    power.len()
                ),
            });
        }
        Ok(Self { frequency, power })
    }

    pub fn from_time_series(series: &TimeSeries, options: &PeriodogramOptions) -> Result<Self> {
        let clean = series.finite();
        let n = clean.len();
        if n < 3 {
            return Err(VizError::ProcessingError {
                message: format!("Need at least 3 finite samples for a periodogram, got {}", n),
            });
        }

        let grid = FrequencyGrid::for_times(clean.time(), options, MAX_FREQUENCIES)?;
        let power = lomb_scargle_amplitude(clean.time(), clean.flux(), &grid);
        let frequency = (0..grid.count).map(|k| grid.frequency(k)).collect();

        tracing::debug!(
            "Periodogram: {} samples, {} frequencies from {:.5} to {:.5} 1/d",
            n,
            grid.count,
            grid.start,
            grid.frequency(grid.count.saturating_sub(1))
        );

        Ok(Self { frequency, power })
    }

    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn period(&self) -> Vec<f64> {
        self.frequency.iter().map(|f| 1.0 / f).collect()
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    /// Index of the largest power; the first one wins on ties.
    pub fn max_power_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.power.iter().copied().enumerate() {
            if !p.is_finite() {
                continue;
            }
            match best {
                Some((_, current)) if p <= current => {}
                _ => best = Some((i, p)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn frequency_at_max_power(&self) -> Option<f64> {
        self.max_power_index().map(|i| self.frequency[i])
    }

    /// Period in days of the power-maximizing bin.
    pub fn period_at_max_power(&self) -> Option<f64> {
        self.frequency_at_max_power().map(|f| 1.0 / f)
    }

    pub fn max_power(&self) -> Option<f64> {
        self.max_power_index().map(|i| self.power[i])
    }
}

/// Regular frequency grid `start + k * step`, `k < count`.
#[derive(Debug, Clone, Copy)]
struct FrequencyGrid {
    start: f64,
    step: f64,
    count: usize,
}

impl FrequencyGrid {
    fn for_times(time: &[f64], options: &PeriodogramOptions, max_count: usize) -> Result<Self> {
        let (t_min, t_max) = time
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(*t), hi.max(*t))
            });
        let baseline = t_max - t_min;
        if baseline <= 0.0 {
            return Err(VizError::ProcessingError {
                message: "Time series has a zero baseline".to_string(),
            });
        }

        let step = 1.0 / (baseline * f64::from(options.oversample_factor.max(1)));
        let nyquist = 0.5 / median_cadence(time).ok_or_else(|| VizError::ProcessingError {
            message: "Could not determine the sampling cadence".to_string(),
        })?;

        let start = options.minimum_frequency.unwrap_or(step);
        let stop = options
            .maximum_frequency
            .unwrap_or(nyquist * options.nyquist_factor);
        if start.is_nan() || stop.is_nan() || stop <= start {
            return Err(VizError::ProcessingError {
                message: format!(
                    "Empty frequency range: {:.5} to {:.5} 1/d",
                    start, stop
                ),
            });
        }

        let bins = ((stop - start) / step).ceil();
        let count = if bins.is_finite() && bins <= max_count as f64 {
            (bins as usize).max(1)
        } else if options.maximum_frequency.is_some() {
            return Err(VizError::ProcessingError {
                message: format!(
                    "Frequency range {:.5} to {:.5} 1/d needs more than {} bins",
                    start, stop, max_count
                ),
            });
        } else {
            tracing::warn!(
                "Clipping periodogram at {:.5} 1/d ({} bins)",
                start + max_count as f64 * step,
                max_count
            );
            max_count
        };

        Ok(Self { start, step, count })
    }

    fn frequency(&self, k: usize) -> f64 {
        self.start + k as f64 * self.step
    }
}

fn median_cadence(time: &[f64]) -> Option<f64> {
    let mut sorted = time.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mut diffs: Vec<f64> = sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0)
        .collect();
    if diffs.is_empty() {
        return None;
    }
    diffs.sort_by(f64::total_cmp);
    let mid = diffs.len() / 2;
    Some(if diffs.len() % 2 == 0 {
        0.5 * (diffs[mid - 1] + diffs[mid])
    } else {
        diffs[mid]
    })
}

/// Per-frequency sums over all samples, `wt = 2 pi f (t - t0)`.
#[derive(Debug, Clone, Copy, Default)]
struct TrigSums {
    // sum y cos(wt), sum y sin(wt)
    yc: f64,
    ys: f64,
    // sum cos(wt), sum sin(wt)
    c: f64,
    s: f64,
    // sum cos(2wt), sum sin(2wt)
    c2: f64,
    s2: f64,
}

impl TrigSums {
    /// Floating-mean PSD for mean-centred `y`.
    fn psd(&self, n: f64) -> f64 {
        let cc = 0.5 * (n + self.c2) - self.c * self.c / n;
        let ss = 0.5 * (n - self.c2) - self.s * self.s / n;
        let cs = 0.5 * self.s2 - self.c * self.s / n;

        let r = (cc - ss).hypot(2.0 * cs);
        let (sin_wt, cos_wt) = (0.5 * (2.0 * cs).atan2(cc - ss)).sin_cos();
        let yc_tau = self.yc * cos_wt + self.ys * sin_wt;
        let ys_tau = self.ys * cos_wt - self.yc * sin_wt;
        let cc_tau = 0.5 * (cc + ss + r);
        let ss_tau = 0.5 * (cc + ss - r);

        let mut psd = 0.0;
        if cc_tau > f64::EPSILON {
            psd += yc_tau * yc_tau / cc_tau;
        }
        if ss_tau > f64::EPSILON {
            psd += ys_tau * ys_tau / ss_tau;
        }
        0.5 * psd
    }
}

fn lomb_scargle_amplitude(time: &[f64], flux: &[f64], grid: &FrequencyGrid) -> Vec<f64> {
    let n = time.len();
    let mean = flux.iter().sum::<f64>() / n as f64;
    let t0 = time[0];

    let mut sums = vec![TrigSums::default(); grid.count];

    // 以旋轉遞推取代逐點三角函數
    for (t, f) in time.iter().zip(flux) {
        let dt = t - t0;
        let y = f - mean;
        let (mut s, mut c) = (TAU * grid.start * dt).sin_cos();
        let (ds, dc) = (TAU * grid.step * dt).sin_cos();
        for acc in sums.iter_mut() {
            acc.yc += y * c;
            acc.ys += y * s;
            acc.c += c;
            acc.s += s;
            acc.c2 += c * c - s * s;
            acc.s2 += 2.0 * s * c;
            let next_c = c * dc - s * ds;
            s = s * dc + c * ds;
            c = next_c;
        }
    }

    let nf = n as f64;
    sums.iter()
        .map(|acc| (4.0 * acc.psd(nf) / nf).sqrt())
        .collect()
}
