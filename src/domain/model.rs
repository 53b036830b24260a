use crate::utils::error::{Result, VizError};
use crate::utils::validation::validate_non_empty_string;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque catalog key naming an observed object, e.g. `TIC 261136679`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(String);

impl TargetId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_non_empty_string("target", &raw)?;
        Ok(Self(raw.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name friendly form: `TIC 261136679` -> `tic_261136679`.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.0.len());
        for ch in self.0.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }
        slug.trim_matches('_').to_string()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Survey missions served by the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mission {
    #[serde(rename = "TESS")]
    Tess,
    #[serde(rename = "Kepler")]
    Kepler,
    #[serde(rename = "K2")]
    K2,
}

impl Mission {
    pub const ALL: [Mission; 3] = [Mission::Tess, Mission::Kepler, Mission::K2];

    /// Value of the archive's `obs_collection` column.
    pub fn collection(&self) -> &'static str {
        match self {
            Mission::Tess => "TESS",
            Mission::Kepler => "Kepler",
            Mission::K2 => "K2",
        }
    }

    pub fn from_collection(value: &str) -> Option<Self> {
        Mission::ALL
            .into_iter()
            .find(|m| m.collection().eq_ignore_ascii_case(value))
    }

    /// Quality flags dropped by default when reading a light curve.
    pub fn default_quality_bitmask(&self) -> i32 {
        match self {
            Mission::Tess => 175,
            Mission::Kepler | Mission::K2 => 1_130_799,
        }
    }

    fn sequence_label(&self) -> &'static str {
        match self {
            Mission::Tess => "Sector",
            Mission::Kepler => "Quarter",
            Mission::K2 => "Campaign",
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// One downloadable light-curve product, as reported by the archive search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetHandle {
    pub mission: Mission,
    pub obs_id: String,
    pub sequence: Option<i64>,
    pub author: String,
    pub exposure_seconds: Option<f64>,
    pub product_filename: String,
    pub data_uri: String,
}

impl fmt::Display for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mission)?;
        if let Some(seq) = self.sequence {
            write!(f, " {} {}", self.mission.sequence_label(), seq)?;
        }
        write!(f, " ({}", self.author)?;
        if let Some(exp) = self.exposure_seconds {
            write!(f, ", {:.0} s", exp)?;
        }
        write!(f, ")")
    }
}

/// Aligned (time, flux, flux error) samples of a single observation.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_err: Vec<f64>,
}

impl TimeSeries {
    pub fn new(time: Vec<f64>, flux: Vec<f64>, flux_err: Vec<f64>) -> Result<Self> {
        if time.len() != flux.len() || time.len() != flux_err.len() {
            return Err(VizError::ProcessingError {
                message: format!(
                    "Misaligned time series: {} times, {} fluxes, {} errors",
                    time.len(),
                    flux.len(),
                    flux_err.len()
                ),
            });
        }
        Ok(Self {
            time,
            flux,
            flux_err,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_err(&self) -> &[f64] {
        &self.flux_err
    }

    pub fn samples(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.time
            .iter()
            .zip(&self.flux)
            .zip(&self.flux_err)
            .map(|((t, f), e)| (*t, *f, *e))
    }

    /// Keeps only the samples whose time and flux are both finite.
    pub fn finite(&self) -> TimeSeries {
        let (mut time, mut flux, mut flux_err) = (Vec::new(), Vec::new(), Vec::new());
        for (t, f, e) in self.samples() {
            if t.is_finite() && f.is_finite() {
                time.push(t);
                flux.push(f);
                flux_err.push(e);
            }
        }
        TimeSeries {
            time,
            flux,
            flux_err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_id_trims_and_rejects_empty() {
        let id = TargetId::new("  TIC 261136679 ").unwrap();
        assert_eq!(id.as_str(), "TIC 261136679");
        assert_eq!(id.slug(), "tic_261136679");
        assert!(TargetId::new("   ").is_err());
    }

    #[test]
    fn test_time_series_requires_equal_lengths() {
        assert!(TimeSeries::new(vec![1.0, 2.0], vec![1.0], vec![0.1, 0.1]).is_err());
        assert!(TimeSeries::new(vec![1.0], vec![1.0], vec![]).is_err());
        let ts = TimeSeries::new(vec![1.0, 2.0], vec![3.0, 4.0], vec![0.1, 0.2]).unwrap();
        assert_eq!(ts.len(), 2);
    }

    #[test]
    fn test_samples_keep_index_correspondence() {
        let ts = TimeSeries::new(
            vec![3.0, 1.0, 2.0],
            vec![30.0, 10.0, 20.0],
            vec![0.3, 0.1, 0.2],
        )
        .unwrap();
        let samples: Vec<_> = ts.samples().collect();
        assert_eq!(
            samples,
            vec![(3.0, 30.0, 0.3), (1.0, 10.0, 0.1), (2.0, 20.0, 0.2)]
        );
    }

    #[test]
    fn test_finite_drops_whole_samples() {
        let ts = TimeSeries::new(
            vec![1.0, f64::NAN, 3.0, 4.0],
            vec![10.0, 20.0, f64::INFINITY, 40.0],
            vec![0.1, 0.2, 0.3, f64::NAN],
        )
        .unwrap();
        let clean = ts.finite();
        assert_eq!(clean.time(), &[1.0, 4.0]);
        assert_eq!(clean.flux(), &[10.0, 40.0]);
        assert_eq!(clean.flux_err()[0], 0.1);
        assert!(clean.flux_err()[1].is_nan());
    }

    #[test]
    fn test_dataset_handle_display() {
        let handle = DatasetHandle {
            mission: Mission::Tess,
            obs_id: "tess2019198215352-s0014".to_string(),
            sequence: Some(14),
            author: "SPOC".to_string(),
            exposure_seconds: Some(120.0),
            product_filename: "tess-s0014_lc.fits".to_string(),
            data_uri: "mast:TESS/product/tess-s0014_lc.fits".to_string(),
        };
        assert_eq!(handle.to_string(), "TESS Sector 14 (SPOC, 120 s)");
    }

    #[test]
    fn test_mission_collection_lookup() {
        assert_eq!(Mission::from_collection("tess"), Some(Mission::Tess));
        assert_eq!(Mission::from_collection("K2"), Some(Mission::K2));
        assert_eq!(Mission::from_collection("HST"), None);
    }
}
