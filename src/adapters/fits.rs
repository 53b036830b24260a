//! Light-curve FITS products (TESS, Kepler and K2 `*lc.fits`).

use crate::domain::model::TimeSeries;
use crate::utils::error::{Result, VizError};
use fitsio::hdu::FitsHdu;
use fitsio::FitsFile;
use std::io::Write;
use std::path::Path;

// 優先使用 PDCSAP，缺少時退回 SAP
const FLUX_COLUMNS: [(&str, &str); 2] = [
    ("PDCSAP_FLUX", "PDCSAP_FLUX_ERR"),
    ("SAP_FLUX", "SAP_FLUX_ERR"),
];

/// Reads the light-curve table from a downloaded product held in memory.
pub fn read_light_curve_bytes(bytes: &[u8], quality_bitmask: i32) -> Result<TimeSeries> {
    // cfitsio 只能從路徑開檔
    let mut file = tempfile::Builder::new()
        .prefix("lightcurve-")
        .suffix(".fits")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    read_light_curve(file.path(), quality_bitmask)
}

/// Reads time, flux and flux error from HDU 1, dropping samples whose
/// quality flags hit `quality_bitmask` or whose time/flux is not finite.
pub fn read_light_curve(path: &Path, quality_bitmask: i32) -> Result<TimeSeries> {
    let mut fits = FitsFile::open(path)?;
    let hdu = fits.hdu(1)?;

    let time: Vec<f64> = hdu.read_col(&mut fits, "TIME")?;
    let (flux, flux_err) = read_flux(&hdu, &mut fits)?;
    let quality: Option<Vec<i32>> = hdu.read_col(&mut fits, "QUALITY").ok();

    if flux.len() != time.len() || flux_err.len() != time.len() {
        return Err(VizError::ProcessingError {
            message: format!(
                "Light curve columns differ in length: TIME {}, flux {}, error {}",
                time.len(),
                flux.len(),
                flux_err.len()
            ),
        });
    }

    let total = time.len();
    let keep: Vec<usize> = (0..total)
        .filter(|&i| {
            let flagged = quality
                .as_ref()
                .and_then(|q| q.get(i))
                .is_some_and(|flags| flags & quality_bitmask != 0);
            !flagged && time[i].is_finite() && flux[i].is_finite()
        })
        .collect();

    tracing::debug!(
        "Read {} samples from {}, kept {}",
        total,
        path.display(),
        keep.len()
    );

    TimeSeries::new(
        keep.iter().map(|&i| time[i]).collect(),
        keep.iter().map(|&i| flux[i]).collect(),
        keep.iter().map(|&i| flux_err[i]).collect(),
    )
}

fn read_flux(hdu: &FitsHdu, fits: &mut FitsFile) -> Result<(Vec<f64>, Vec<f64>)> {
    for (flux_column, err_column) in FLUX_COLUMNS {
        match hdu.read_col::<f64>(fits, flux_column) {
            Ok(flux) => {
                let flux_err = hdu
                    .read_col::<f64>(fits, err_column)
                    .unwrap_or_else(|_| vec![f64::NAN; flux.len()]);
                tracing::debug!("Using flux column {}", flux_column);
                return Ok((flux, flux_err));
            }
            Err(e) => tracing::debug!("Column {} unavailable: {}", flux_column, e),
        }
    }

    Err(VizError::ProcessingError {
        message: "Light curve has neither PDCSAP_FLUX nor SAP_FLUX".to_string(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use fitsio::tables::{ColumnDataType, ColumnDescription};
    use fitsio::FitsFile;
    use std::path::Path;

    pub struct LightCurveColumns {
        pub time: Vec<f64>,
        pub flux: Vec<f64>,
        pub flux_err: Vec<f64>,
        pub quality: Vec<i32>,
        pub flux_column: &'static str,
    }

    /// Writes a minimal light-curve product with a LIGHTCURVE table in HDU 1.
    pub fn write_light_curve(path: &Path, columns: &LightCurveColumns) {
        let err_column = format!("{}_ERR", columns.flux_column);
        let mut fits = FitsFile::create(path).open().unwrap();
        let descriptions = vec![
            ColumnDescription::new("TIME")
                .with_type(ColumnDataType::Double)
                .create()
                .unwrap(),
            ColumnDescription::new(columns.flux_column)
                .with_type(ColumnDataType::Double)
                .create()
                .unwrap(),
            ColumnDescription::new(&err_column)
                .with_type(ColumnDataType::Double)
                .create()
                .unwrap(),
            ColumnDescription::new("QUALITY")
                .with_type(ColumnDataType::Int)
                .create()
                .unwrap(),
        ];
        let hdu = fits
            .create_table("LIGHTCURVE".to_string(), &descriptions)
            .unwrap();
        hdu.write_col(&mut fits, "TIME", &columns.time).unwrap();
        hdu.write_col(&mut fits, columns.flux_column, &columns.flux)
            .unwrap();
        hdu.write_col(&mut fits, err_column.as_str(), &columns.flux_err)
            .unwrap();
        hdu.write_col(&mut fits, "QUALITY", &columns.quality).unwrap();
    }
}
