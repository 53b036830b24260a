pub mod batch;
pub mod enumerate;
pub mod figures;
pub mod periodogram;
pub mod progress;
pub mod viewer;

pub use crate::domain::model::{DatasetHandle, Mission, TargetId, TimeSeries};
pub use crate::domain::ports::{ArchiveClient, ConfigProvider, FigureBackend, ImageFormat, Storage};
pub use crate::utils::error::Result;
