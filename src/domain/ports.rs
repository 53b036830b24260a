use crate::domain::figure::Figure;
use crate::domain::model::{DatasetHandle, TargetId, TimeSeries};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Search and download access to a light-curve archive.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Ordered dataset handles for a target; empty when nothing matches.
    async fn search(&self, target: &TargetId) -> Result<Vec<DatasetHandle>>;

    async fn download(&self, handle: &DatasetHandle) -> Result<TimeSeries>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Svg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }
}

/// Drawing surface that encodes a [`Figure`] into image bytes.
pub trait FigureBackend: Send + Sync {
    fn encode(&self, figure: &Figure, format: ImageFormat) -> Result<Vec<u8>>;
}

pub trait ConfigProvider: Send + Sync {
    fn archive_endpoint(&self) -> &str;
    fn output_path(&self) -> &str;
    fn request_timeout_secs(&self) -> u64;
}
