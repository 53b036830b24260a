use crate::config::toml_config::TomlConfig;
use crate::core::batch::FailurePolicy;
use crate::core::progress::ProgressStyle;
use crate::core::ImageFormat;
use crate::domain::figure::TitleStyle;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::Path;

/// 未指定 --config 時於工作目錄尋找的預設檔名
pub const DEFAULT_CONFIG_FILE: &str = "transit-finder.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "transit-finder")]
#[command(about = "Browse archived light curves and periodograms of a target")]
pub struct CliConfig {
    /// TOML 配置檔路徑
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    #[arg(long, global = true)]
    pub output_path: Option<String>,

    #[arg(long, global = true, value_enum)]
    pub format: Option<ImageFormat>,

    #[arg(long, global = true, value_enum)]
    pub title_style: Option<TitleStyle>,

    #[arg(long, global = true, value_enum)]
    pub flux_on_failure: Option<FailurePolicy>,

    #[arg(long, global = true, value_enum)]
    pub periodogram_on_failure: Option<FailurePolicy>,

    #[arg(long, global = true, value_enum)]
    pub progress: Option<ProgressStyle>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the datasets available for a target
    List { target: String },
    /// Grid of raw flux plots, one cell per dataset
    Overview { target: String },
    /// Flux with error bars for one dataset (1-based)
    Detail { target: String, set: usize },
    /// Grid of periodograms, one cell per dataset
    PeriodogramOverview { target: String },
    /// Periodogram of one dataset (1-based) titled with its dominant period
    PeriodogramDetail { target: String, set: usize },
}

impl Command {
    pub fn target(&self) -> &str {
        match self {
            Command::List { target }
            | Command::Overview { target }
            | Command::Detail { target, .. }
            | Command::PeriodogramOverview { target }
            | Command::PeriodogramDetail { target, .. } => target,
        }
    }
}

impl CliConfig {
    /// 載入配置檔：優先使用 --config，其次為工作目錄下的預設檔，都沒有則使用預設值
    pub fn load_config(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                TomlConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// 命令列參數覆寫配置檔中的值
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.archive.endpoint = endpoint.clone();
        }
        if let Some(path) = &self.output_path {
            config.render.output_path = path.clone();
        }
        if let Some(format) = self.format {
            config.render.format = format;
        }
        if let Some(style) = self.title_style {
            config.render.title_style = style;
        }
        if let Some(policy) = self.flux_on_failure {
            config.render.flux_on_failure = policy;
        }
        if let Some(policy) = self.periodogram_on_failure {
            config.render.periodogram_on_failure = policy;
        }
        if let Some(progress) = self.progress {
            config.render.progress = progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_detail_subcommand() {
        let cli = CliConfig::parse_from(["transit-finder", "detail", "TIC 261136679", "3"]);
        assert!(matches!(cli.command, Command::Detail { set: 3, .. }));
        assert_eq!(cli.command.target(), "TIC 261136679");
        assert!(!cli.verbose);
    }

    #[test]
    fn test_flags_override_file_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("viewer.toml");
        std::fs::write(
            &path,
            "[render]\noutput_path = \"/from/file\"\nformat = \"svg\"\nflux_on_failure = \"abort\"\n",
        )
        .unwrap();

        let cli = CliConfig::parse_from([
            "transit-finder",
            "--config",
            path.to_str().unwrap(),
            "overview",
            "Pi Men",
            "--format",
            "png",
            "--flux-on-failure",
            "skip",
            "--progress",
            "none",
        ]);
        let config = cli.load_config().unwrap();

        assert_eq!(config.render.output_path, "/from/file");
        assert_eq!(config.render.format, ImageFormat::Png);
        assert_eq!(config.render.flux_on_failure, FailurePolicy::Skip);
        assert_eq!(config.render.progress, ProgressStyle::None);
        assert_eq!(config.render.periodogram_on_failure, FailurePolicy::Skip);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let cli = CliConfig::parse_from([
            "transit-finder",
            "--config",
            "/definitely/not/here.toml",
            "list",
            "KIC 11904151",
        ]);
        assert!(cli.load_config().is_err());
    }
}
