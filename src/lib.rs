pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{mast::MastClient, plotting::PlottersBackend, storage::LocalStorage};
pub use core::viewer::{LightCurveViewer, Overview, ViewerOptions};
pub use domain::model::TargetId;
pub use utils::error::{Result, VizError};
