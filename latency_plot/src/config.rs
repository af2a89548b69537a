//! Plot configuration: built-in defaults, optionally overridden by a JSON file,
//! then by command line flags.

use crate::error::{PlotError, Result};
use crate::thresholds::CacheConstants;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Log,
    Linear,
}

impl Scale {
    pub fn name(self) -> &'static str {
        match self {
            Scale::Log => "log",
            Scale::Linear => "linear",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
    /// Standalone pgfplots document.
    Tex,
    /// pgfplots document compiled with pdfLaTeX.
    Pdf,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<OutputFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("svg") => Ok(OutputFormat::Svg),
            Some("tex") => Ok(OutputFormat::Tex),
            Some("pdf") => Ok(OutputFormat::Pdf),
            _ => Err(PlotError::Config(format!(
                "cannot infer an output format from {} (expected .png, .svg, .tex or .pdf)",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub input_path: PathBuf,
    /// Defaults to the input path with a `png` extension.
    pub output_path: Option<PathBuf>,
    pub x_scale: Scale,
    pub y_scale: Scale,
    #[serde(flatten)]
    pub constants: CacheConstants,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("out.csv"),
            output_path: None,
            x_scale: Scale::Log,
            y_scale: Scale::Linear,
            constants: CacheConstants::default(),
            title: String::from("Latency as a function of array size"),
            width: 1280,
            height: 800,
        }
    }
}

impl PlotConfig {
    /// Keys not naming a configuration field are rejected, so a misspelt
    /// key cannot silently fall back to its default.
    pub fn from_json_str(json: &str) -> Result<PlotConfig> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PlotError::Config(e.to_string()))?;
        // serde cannot combine deny_unknown_fields with the flattened constants.
        if let (Some(given), Ok(serde_json::Value::Object(known))) =
            (value.as_object(), serde_json::to_value(PlotConfig::default()))
        {
            let unknown = given
                .keys()
                .filter(|k| !known.contains_key(k.as_str()))
                .join(", ");
            if !unknown.is_empty() {
                return Err(PlotError::Config(format!(
                    "unknown configuration key(s): {}",
                    unknown
                )));
            }
        }
        serde_json::from_value(value).map_err(|e| PlotError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<PlotConfig> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| PlotError::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.input_path.with_extension("png"))
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.constants;
        for (name, value) in [
            ("l1_size", c.l1_size),
            ("l2_size", c.l2_size),
            ("l3_size", c.l3_size),
            ("word_size", c.word_size),
            ("page_size", c.page_size),
        ] {
            if value == 0 {
                return Err(PlotError::Config(format!("{} must be positive", name)));
            }
        }
        if self.width == 0 || self.height == 0 {
            return Err(PlotError::Config(format!(
                "image size {}x{} is empty",
                self.width, self.height
            )));
        }
        OutputFormat::from_path(&self.output_path())?;
        Ok(())
    }
}
