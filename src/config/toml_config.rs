use crate::adapters::mast::DEFAULT_ENDPOINT;
use crate::core::batch::FailurePolicy;
use crate::core::periodogram::PeriodogramOptions;
use crate::core::progress::ProgressStyle;
use crate::core::viewer::ViewerOptions;
use crate::core::{ConfigProvider, ImageFormat, Mission};
use crate::domain::figure::TitleStyle;
use crate::utils::error::{Result, VizError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Highest frequency (1/day) accepted in `[periodogram]`; 20 s cadence peaks near 2160.
const MAX_FREQUENCY_PER_DAY: f64 = 10_000.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub archive: ArchiveConfig,
    pub render: RenderConfig,
    pub periodogram: PeriodogramOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub missions: Vec<Mission>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_seconds: 120,
            missions: Mission::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub output_path: String,
    pub format: ImageFormat,
    pub title_style: TitleStyle,
    pub flux_on_failure: FailurePolicy,
    pub periodogram_on_failure: FailurePolicy,
    pub progress: ProgressStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_path: "./figures".to_string(),
            format: ImageFormat::Svg,
            title_style: TitleStyle::Set,
            flux_on_failure: FailurePolicy::Abort,
            periodogram_on_failure: FailurePolicy::Skip,
            progress: ProgressStyle::Bar,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(VizError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| VizError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MAST_ENDPOINT})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn viewer_options(&self) -> ViewerOptions {
        ViewerOptions {
            title_style: self.render.title_style,
            flux_on_failure: self.render.flux_on_failure,
            periodogram_on_failure: self.render.periodogram_on_failure,
            periodogram: self.periodogram.clone(),
            format: self.render.format,
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("archive.endpoint", &self.archive.endpoint)?;
        validation::validate_positive_number(
            "archive.timeout_seconds",
            self.archive.timeout_seconds,
            1,
        )?;
        if self.archive.missions.is_empty() {
            return Err(VizError::MissingConfigError {
                field: "archive.missions".to_string(),
            });
        }

        validation::validate_path("render.output_path", &self.render.output_path)?;

        validation::validate_positive_number(
            "periodogram.oversample_factor",
            u64::from(self.periodogram.oversample_factor),
            1,
        )?;
        validation::validate_range(
            "periodogram.nyquist_factor",
            self.periodogram.nyquist_factor,
            f64::MIN_POSITIVE,
            1_000.0,
        )?;

        for (field, value) in [
            ("periodogram.minimum_frequency", self.periodogram.minimum_frequency),
            ("periodogram.maximum_frequency", self.periodogram.maximum_frequency),
        ] {
            if let Some(v) = value {
                validation::validate_range(field, v, f64::MIN_POSITIVE, MAX_FREQUENCY_PER_DAY)?;
            }
        }
        if let (Some(min), Some(max)) = (
            self.periodogram.minimum_frequency,
            self.periodogram.maximum_frequency,
        ) {
            if min >= max {
                return Err(VizError::ConfigValidationError {
                    field: "periodogram.minimum_frequency".to_string(),
                    message: format!(
                        "minimum frequency {} must be below maximum frequency {}",
                        min, max
                    ),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn archive_endpoint(&self) -> &str {
        &self.archive.endpoint
    }

    fn output_path(&self) -> &str {
        &self.render.output_path
    }

    fn request_timeout_secs(&self) -> u64 {
        self.archive.timeout_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.archive.endpoint, "https://mast.stsci.edu");
        assert_eq!(config.archive.timeout_seconds, 120);
        assert_eq!(config.archive.missions, Mission::ALL.to_vec());
        assert_eq!(config.render.output_path, "./figures");
        assert_eq!(config.render.flux_on_failure, FailurePolicy::Abort);
        assert_eq!(config.render.periodogram_on_failure, FailurePolicy::Skip);
        assert_eq!(config.periodogram.oversample_factor, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let content = r#"
[archive]
endpoint = "http://localhost:9000/mast"
timeout_seconds = 30
missions = ["TESS", "K2"]

[render]
output_path = "/tmp/figures"
format = "png"
title_style = "ordinal"
flux_on_failure = "skip"
periodogram_on_failure = "abort"
progress = "log"

[periodogram]
oversample_factor = 10
nyquist_factor = 2.0
minimum_frequency = 0.05
maximum_frequency = 24.0
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.archive.missions, vec![Mission::Tess, Mission::K2]);
        assert_eq!(config.render.progress, ProgressStyle::Log);

        let options = config.viewer_options();
        assert_eq!(options.format, ImageFormat::Png);
        assert_eq!(options.title_style, TitleStyle::Ordinal);
        assert_eq!(options.flux_on_failure, FailurePolicy::Skip);
        assert_eq!(options.periodogram_on_failure, FailurePolicy::Abort);
        assert_eq!(options.periodogram.oversample_factor, 10);
        assert_eq!(options.periodogram.maximum_frequency, Some(24.0));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("TRANSIT_FINDER_TEST_OUTPUT", "/data/plots");
        let content = r#"
[render]
output_path = "${TRANSIT_FINDER_TEST_OUTPUT}"

[archive]
endpoint = "${TRANSIT_FINDER_TEST_UNSET_VAR}"
"#;
        let config = TomlConfig::from_toml_str(content).unwrap();
        assert_eq!(config.render.output_path, "/data/plots");
        assert_eq!(config.archive.endpoint, "${TRANSIT_FINDER_TEST_UNSET_VAR}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_range = TomlConfig::from_toml_str(
            "[periodogram]\nminimum_frequency = 5.0\nmaximum_frequency = 1.0\n",
        )
        .unwrap();
        assert!(bad_range.validate().is_err());

        let bad_oversample =
            TomlConfig::from_toml_str("[periodogram]\noversample_factor = 0\n").unwrap();
        assert!(bad_oversample.validate().is_err());

        let no_missions = TomlConfig::from_toml_str("[archive]\nmissions = []\n").unwrap();
        assert!(matches!(
            no_missions.validate(),
            Err(VizError::MissingConfigError { .. })
        ));

        assert!(TomlConfig::from_toml_str("[render]\nformat = \"gif\"\n").is_err());

        let huge_maximum =
            TomlConfig::from_toml_str("[periodogram]\nmaximum_frequency = 1e300\n").unwrap();
        assert!(matches!(
            huge_maximum.validate(),
            Err(VizError::InvalidConfigValueError { .. })
        ));
        let fast_cadence =
            TomlConfig::from_toml_str("[periodogram]\nmaximum_frequency = 2160.0\n").unwrap();
        assert!(fast_cadence.validate().is_ok());
    }
}
