use crate::core::batch::{run_batch, FailurePolicy, ItemOutcome};
use crate::core::enumerate::{enumerate, select};
use crate::core::figures;
use crate::core::periodogram::{Periodogram, PeriodogramOptions};
use crate::core::progress::{NoProgress, ProgressObserver};
use crate::domain::figure::{Figure, TitleStyle};
use crate::domain::model::{DatasetHandle, TargetId, TimeSeries};
use crate::domain::ports::{ArchiveClient, FigureBackend, ImageFormat, Storage};
use crate::utils::error::{Result, VizError};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    pub title_style: TitleStyle,
    pub flux_on_failure: FailurePolicy,
    pub periodogram_on_failure: FailurePolicy,
    pub periodogram: PeriodogramOptions,
    pub format: ImageFormat,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title_style: TitleStyle::Set,
            flux_on_failure: FailurePolicy::Abort,
            periodogram_on_failure: FailurePolicy::Skip,
            periodogram: PeriodogramOptions::default(),
            format: ImageFormat::Svg,
        }
    }
}

/// Result of a flux overview: the figure itself plus where it was written.
#[derive(Debug, Clone)]
pub struct Overview {
    pub figure: Figure,
    pub dataset_count: usize,
    pub output_path: String,
}

/// Renders overview grids and detail plots for a target's light curves.
///
/// Every call is independent: datasets are searched and downloaded again
/// each time, one after the other.
pub struct LightCurveViewer<A: ArchiveClient, S: Storage, B: FigureBackend> {
    archive: A,
    storage: S,
    backend: B,
    options: ViewerOptions,
    progress: Box<dyn ProgressObserver>,
}

impl<A: ArchiveClient, S: Storage, B: FigureBackend> LightCurveViewer<A, S, B> {
    pub fn new(archive: A, storage: S, backend: B, options: ViewerOptions) -> Self {
        Self {
            archive,
            storage,
            backend,
            options,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub async fn datasets(&self, target: &TargetId) -> Result<Vec<DatasetHandle>> {
        enumerate(&self.archive, target).await
    }

    /// Grid of raw flux scatter plots, one cell per dataset.
    ///
    /// Returns `None` when the archive has no datasets for `target`.
    pub async fn overview(&self, target: &TargetId) -> Result<Option<Overview>> {
        let handles = enumerate(&self.archive, target).await?;
        if handles.is_empty() {
            return Ok(None);
        }

        let style = self.options.title_style;
        let outcomes = run_batch(
            &handles,
            self.options.flux_on_failure,
            self.progress.as_ref(),
            |ordinal, handle| async move {
                let series = self.materialize(ordinal, handle).await?;
                Ok::<_, VizError>(figures::flux_cell(ordinal, &series, style))
            },
        )
        .await?;

        let figure = figures::grid(outcomes.into_iter().map(ItemOutcome::into_done).collect());
        let output_path = self
            .show(&figure, &format!("{}_overview", target.slug()))
            .await?;

        Ok(Some(Overview {
            figure,
            dataset_count: handles.len(),
            output_path,
        }))
    }

    /// Error-bar plot of the dataset at 1-based `index`.
    pub async fn detail(&self, target: &TargetId, index: usize) -> Result<String> {
        let handles = enumerate(&self.archive, target).await?;
        let handle = select(&handles, index)?;
        let series = self.materialize(index, handle).await?;

        tracing::info!("📈 Dataset {} ({}) has {} samples", index, handle, series.len());
        let figure = figures::flux_detail(&series);
        self.show(&figure, &format!("{}_set{}", target.slug(), index))
            .await
    }

    /// Grid of periodograms, one cell per dataset.
    ///
    /// Returns `None` when the archive has no datasets for `target`.
    pub async fn periodogram_overview(&self, target: &TargetId) -> Result<Option<String>> {
        let handles = enumerate(&self.archive, target).await?;
        if handles.is_empty() {
            return Ok(None);
        }

        let options = &self.options.periodogram;
        let outcomes = run_batch(
            &handles,
            self.options.periodogram_on_failure,
            self.progress.as_ref(),
            |ordinal, handle| async move {
                let series = self.materialize(ordinal, handle).await?;
                let periodogram = Periodogram::from_time_series(&series, options)?;
                Ok::<_, VizError>(figures::periodogram_cell(ordinal, &periodogram))
            },
        )
        .await?;

        let figure = figures::grid(outcomes.into_iter().map(ItemOutcome::into_done).collect());
        let output_path = self
            .show(&figure, &format!("{}_periodogram_overview", target.slug()))
            .await?;
        Ok(Some(output_path))
    }

    /// Periodogram of the dataset at 1-based `index`, titled with its dominant period.
    pub async fn periodogram_detail(&self, target: &TargetId, index: usize) -> Result<String> {
        let handles = enumerate(&self.archive, target).await?;
        let handle = select(&handles, index)?;
        let series = self.materialize(index, handle).await?;

        let periodogram = Periodogram::from_time_series(&series, &self.options.periodogram)?;
        if let Some(period) = periodogram.period_at_max_power() {
            tracing::info!("⏱️ Dataset {}: period at max power {:.4} days", index, period);
        }

        let figure = figures::periodogram_detail(&periodogram)?;
        self.show(
            &figure,
            &format!("{}_periodogram_set{}", target.slug(), index),
        )
        .await
    }

    async fn materialize(&self, ordinal: usize, handle: &DatasetHandle) -> Result<TimeSeries> {
        tracing::debug!("Downloading dataset {}: {}", ordinal, handle);
        self.archive
            .download(handle)
            .await
            .map_err(|e| VizError::MaterializationError {
                ordinal,
                message: e.to_string(),
            })
    }

    async fn show(&self, figure: &Figure, name: &str) -> Result<String> {
        let bytes = self.backend.encode(figure, self.options.format)?;
        let file_name = format!("{}.{}", name, self.options.format.extension());

        tracing::debug!("Writing figure {} ({} bytes)", file_name, bytes.len());
        let path = self.storage.write_file(&file_name, &bytes).await?;
        tracing::info!("🖼️ Figure saved to {}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::figure::{Panel, Series};
    use crate::domain::model::Mission;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::f64::consts::TAU;
    use std::sync::{Arc, Mutex};

    struct MockArchive {
        handles: Vec<DatasetHandle>,
        failing: HashSet<String>,
        downloads: Arc<Mutex<Vec<String>>>,
    }

    impl MockArchive {
        fn with_datasets(n: usize) -> Self {
            let handles = (1..=n)
                .map(|i| DatasetHandle {
                    mission: Mission::Tess,
                    obs_id: format!("obs-{}", i),
                    sequence: Some(i as i64),
                    author: "SPOC".to_string(),
                    exposure_seconds: Some(120.0),
                    product_filename: format!("s{:04}_lc.fits", i),
                    data_uri: format!("mast:TESS/product/s{:04}_lc.fits", i),
                })
                .collect();
            Self {
                handles,
                failing: HashSet::new(),
                downloads: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing(mut self, ordinal: usize) -> Self {
            self.failing.insert(format!("obs-{}", ordinal));
            self
        }
    }

    fn series_for(seed: usize) -> TimeSeries {
        let period = 1.0 + seed as f64 * 0.5;
        let time: Vec<f64> = (0..400).map(|i| 2000.0 + i as f64 * 0.05).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|t| 1.0 + 0.01 * (TAU * t / period).sin())
            .collect();
        let err = (0..400).map(|i| 0.001 + i as f64 * 1e-6).collect();
        TimeSeries::new(time, flux, err).unwrap()
    }

    #[async_trait]
    impl ArchiveClient for MockArchive {
        async fn search(&self, _target: &TargetId) -> Result<Vec<DatasetHandle>> {
            Ok(self.handles.clone())
        }

        async fn download(&self, handle: &DatasetHandle) -> Result<TimeSeries> {
            self.downloads.lock().unwrap().push(handle.obs_id.clone());
            if self.failing.contains(&handle.obs_id) {
                return Err(VizError::ArchiveError {
                    message: "HTTP 503 Service Unavailable".to_string(),
                });
            }
            Ok(series_for(handle.sequence.unwrap_or(0) as usize))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingBackend {
        figures: Arc<Mutex<Vec<Figure>>>,
    }

    impl FigureBackend for RecordingBackend {
        fn encode(&self, figure: &Figure, format: ImageFormat) -> Result<Vec<u8>> {
            self.figures.lock().unwrap().push(figure.clone());
            Ok(format.extension().as_bytes().to_vec())
        }
    }

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<tokio::sync::Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(format!("mem/{}", path))
        }
    }

    fn target() -> TargetId {
        TargetId::new("TIC 261136679").unwrap()
    }

    fn viewer(
        archive: MockArchive,
        options: ViewerOptions,
    ) -> (
        LightCurveViewer<MockArchive, MockStorage, RecordingBackend>,
        RecordingBackend,
        MockStorage,
    ) {
        let backend = RecordingBackend::default();
        let storage = MockStorage::default();
        let viewer = LightCurveViewer::new(archive, storage.clone(), backend.clone(), options);
        (viewer, backend, storage)
    }

    #[tokio::test]
    async fn test_overview_without_datasets_draws_nothing() {
        let (viewer, backend, storage) =
            viewer(MockArchive::with_datasets(0), ViewerOptions::default());

        let result = viewer.overview(&target()).await.unwrap();

        assert!(result.is_none());
        assert!(backend.figures.lock().unwrap().is_empty());
        assert!(storage.files.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_overview_six_datasets() {
        let (viewer, backend, storage) =
            viewer(MockArchive::with_datasets(6), ViewerOptions::default());

        let overview = viewer.overview(&target()).await.unwrap().unwrap();

        assert_eq!(overview.dataset_count, 6);
        assert_eq!(overview.output_path, "mem/tic_261136679_overview.svg");
        let layout = overview.figure.layout;
        assert_eq!((layout.rows, layout.cols), (2, 5));
        assert_eq!(overview.figure.hidden_panels(), 4);

        let titles: Vec<String> = overview
            .figure
            .plotted_panels()
            .map(|p| p.title.clone().unwrap().text)
            .collect();
        assert_eq!(
            titles,
            vec!["Set # 1", "Set # 2", "Set # 3", "Set # 4", "Set # 5", "Set # 6"]
        );

        assert_eq!(backend.figures.lock().unwrap().len(), 1);
        assert!(storage
            .files
            .lock()
            .await
            .contains_key("tic_261136679_overview.svg"));
    }

    #[tokio::test]
    async fn test_overview_ordinal_titles() {
        let options = ViewerOptions {
            title_style: TitleStyle::Ordinal,
            ..ViewerOptions::default()
        };
        let (viewer, _, _) = viewer(MockArchive::with_datasets(2), options);

        let overview = viewer.overview(&target()).await.unwrap().unwrap();
        let titles: Vec<String> = overview
            .figure
            .plotted_panels()
            .map(|p| p.title.clone().unwrap().text)
            .collect();
        assert_eq!(titles, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_overview_aborts_on_failed_download() {
        let archive = MockArchive::with_datasets(4).failing(2);
        let downloads = archive.downloads.clone();
        let (viewer, backend, _) = viewer(archive, ViewerOptions::default());

        let err = viewer.overview(&target()).await.unwrap_err();

        assert!(matches!(
            err,
            VizError::MaterializationError { ordinal: 2, .. }
        ));
        assert_eq!(*downloads.lock().unwrap(), vec!["obs-1", "obs-2"]);
        assert!(backend.figures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overview_can_skip_failed_download() {
        let options = ViewerOptions {
            flux_on_failure: FailurePolicy::Skip,
            ..ViewerOptions::default()
        };
        let (viewer, _, _) = viewer(MockArchive::with_datasets(4).failing(2), options);

        let overview = viewer.overview(&target()).await.unwrap().unwrap();

        assert_eq!(overview.figure.panels[1], Panel::Empty);
        assert_eq!(overview.figure.plotted_panels().count(), 3);
    }

    #[tokio::test]
    async fn test_periodogram_overview_skips_failed_dataset() {
        let archive = MockArchive::with_datasets(7).failing(3);
        let downloads = archive.downloads.clone();
        let (viewer, backend, _) = viewer(archive, ViewerOptions::default());

        let path = viewer.periodogram_overview(&target()).await.unwrap();

        assert_eq!(
            path.as_deref(),
            Some("mem/tic_261136679_periodogram_overview.svg")
        );
        assert_eq!(downloads.lock().unwrap().len(), 7);

        let figures = backend.figures.lock().unwrap();
        let figure = &figures[0];
        assert_eq!(figure.panels.len(), 10);
        assert_eq!(figure.panels[2], Panel::Empty);
        assert_eq!(figure.hidden_panels(), 3);
        let titles: Vec<String> = figure
            .plotted_panels()
            .map(|p| p.title.clone().unwrap().text)
            .collect();
        assert_eq!(
            titles,
            vec!["Set # 1", "Set # 2", "Set # 4", "Set # 5", "Set # 6", "Set # 7"]
        );
        for panel in figure.plotted_panels() {
            assert!(matches!(panel.series, Series::Line { .. }));
        }
    }

    #[tokio::test]
    async fn test_periodogram_overview_without_datasets() {
        let (viewer, backend, _) =
            viewer(MockArchive::with_datasets(0), ViewerOptions::default());

        assert!(viewer.periodogram_overview(&target()).await.unwrap().is_none());
        assert!(backend.figures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_consumes_selected_dataset() {
        let (viewer, backend, _) =
            viewer(MockArchive::with_datasets(3), ViewerOptions::default());

        let path = viewer.detail(&target(), 2).await.unwrap();
        assert_eq!(path, "mem/tic_261136679_set2.svg");

        let expected = series_for(2);
        let figures = backend.figures.lock().unwrap();
        let panel = figures[0].plotted_panels().next().unwrap();
        match &panel.series {
            Series::ErrorBars { x, y, err, .. } => {
                let triples: Vec<(f64, f64, f64)> = x
                    .iter()
                    .zip(y)
                    .zip(err)
                    .map(|((t, f), e)| (*t, *f, *e))
                    .collect();
                let expected: Vec<(f64, f64, f64)> = expected.samples().collect();
                assert_eq!(triples, expected);
            }
            other => panic!("unexpected series {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detail_index_out_of_range() {
        let (viewer, backend, _) =
            viewer(MockArchive::with_datasets(3), ViewerOptions::default());

        for index in [0, 4] {
            let err = viewer.detail(&target(), index).await.unwrap_err();
            assert!(matches!(err, VizError::IndexOutOfRange { count: 3, .. }));
            let err = viewer.periodogram_detail(&target(), index).await.unwrap_err();
            assert!(matches!(err, VizError::IndexOutOfRange { count: 3, .. }));
        }
        assert!(backend.figures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_periodogram_detail_reports_dominant_period() {
        let options = ViewerOptions {
            format: ImageFormat::Png,
            ..ViewerOptions::default()
        };
        let (viewer, backend, storage) = viewer(MockArchive::with_datasets(3), options);

        // dataset 2 carries a 2.0 day sinusoid
        let path = viewer.periodogram_detail(&target(), 2).await.unwrap();
        assert_eq!(path, "mem/tic_261136679_periodogram_set2.png");

        let figures = backend.figures.lock().unwrap();
        let title = figures[0]
            .plotted_panels()
            .next()
            .unwrap()
            .title
            .clone()
            .unwrap();
        assert!(title.text.starts_with("Period: "));
        assert!(title.text.ends_with(" days"));
        let period: f64 = title.text["Period: ".len()..title.text.len() - " days".len()]
            .parse()
            .unwrap();
        assert!((period - 2.0).abs() < 0.1, "period was {}", period);
        assert_eq!(
            storage.files.lock().await["tic_261136679_periodogram_set2.png"],
            b"png".to_vec()
        );
    }
}
