//! Configuration loading and parsing.
//!
//! This module handles:
//! - Dimension values with units (mm, cm, in, pt) for margins and sizes
//! - The optional settings.json file with layout defaults
//! - `{name}` templates for the clause and the output path
//! - The resolved `StampJob` handed to the stamper

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Wildcard replaced with each company name.
pub const NAME_TOKEN: &str = "{name}";

pub const DEFAULT_CLAUSE: &str = "Wyrażam zgodę na przetwarzanie moich danych osobowych przez {name} w celu prowadzenia rekrutacji na aplikowane przeze mnie stanowisko.";
pub const DEFAULT_MARGIN_BOTTOM: f64 = 60.0;
pub const DEFAULT_MARGIN_SIDES: f64 = 43.0;
pub const DEFAULT_FONT_SIZE: f64 = 11.0;
pub const DEFAULT_LINE_HEIGHT: f64 = 17.0;
pub const DEFAULT_PAGE: u32 = 1;

const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];

/// Configuration errors, all detected before any input file is read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No {{name}} specified in {option}: {value:?}")]
    MissingWildcard { option: &'static str, value: String },

    #[error("{0} option required.")]
    MissingOption(&'static str),

    #[error("invalid dimension {value:?}: {reason}")]
    InvalidDimension { value: String, reason: String },

    #[error("{option} must be greater than zero, got {value}")]
    NotPositive { option: &'static str, value: f64 },

    #[error("{option} must not be negative, got {value}")]
    Negative { option: &'static str, value: f64 },

    #[error("--page counts from 1, got 0")]
    PageZero,

    #[error("Failed to read settings file at {path:?}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file at {path:?}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Dimension value that can be specified as:
/// - A number (interpreted as points)
/// - A string with unit: e.g., "100 mm", "10 cm", "1 in" (inches)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension(pub f64);

impl Dimension {
    /// Convert to points (internal PDF unit)
    pub fn as_points(&self) -> f64 {
        self.0
    }
}

/// Parse "12", "12.5 pt", "15mm", "1 in" into points.
fn parse_points(value: &str) -> Result<f64, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let (num_str, unit) = value.split_at(split);
    let unit = unit.trim().to_lowercase();

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("invalid number in dimension: {:?}", num_str))?;

    // 1 inch = 72 points (PDF default unit)
    match unit.as_str() {
        "" | "pt" | "point" | "points" => Ok(num),
        "mm" => Ok(num * 72.0 / 25.4),
        "cm" => Ok(num * 72.0 / 2.54),
        "in" | "inch" | "inches" => Ok(num * 72.0),
        _ => Err(format!("unknown unit '{}'. Supported: mm, cm, in, pt", unit)),
    }
}

impl FromStr for Dimension {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_points(s)
            .map(Dimension)
            .map_err(|reason| ConfigError::InvalidDimension {
                value: s.to_string(),
                reason,
            })
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DimensionVisitor;

        impl serde::de::Visitor<'_> for DimensionVisitor {
            type Value = Dimension;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a number or a string with unit (e.g., \"100 mm\", \"10 cm\", \"1 in\")")
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value as f64))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Dimension(value))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                parse_points(value).map(Dimension).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DimensionVisitor)
    }
}

/// Layout defaults read from a settings.json file. Command-line flags win
/// over anything set here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub clause: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub margin_bottom: Option<Dimension>,
    #[serde(default)]
    pub margin_sides: Option<Dimension>,
    #[serde(default)]
    pub font_size: Option<Dimension>,
    #[serde(default)]
    pub line_height: Option<Dimension>,
    #[serde(default)]
    pub center: Option<bool>,
    #[serde(default)]
    pub page: Option<u32>,
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::SettingsRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::SettingsParse {
        path: path.to_path_buf(),
        source,
    })
}

/// A string carrying the `{name}` wildcard.
#[derive(Debug, Clone, PartialEq)]
pub struct NameTemplate {
    template: String,
}

impl NameTemplate {
    /// Accept `value` only if it contains the wildcard. `option` names the
    /// flag the value came from, for the error message.
    pub fn parse(option: &'static str, value: String) -> Result<Self, ConfigError> {
        if !value.contains(NAME_TOKEN) {
            return Err(ConfigError::MissingWildcard { option, value });
        }
        Ok(Self { template: value })
    }

    /// Substitute the first wildcard with `name`, verbatim.
    pub fn render(&self, name: &str) -> String {
        self.template.replacen(NAME_TOKEN, name, 1)
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }
}

/// Page-independent layout of the clause, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClauseStyle {
    pub font_size: f64,
    pub line_height: f64,
    pub margin_bottom: f64,
    pub margin_sides: f64,
    pub centered: bool,
}

impl Default for ClauseStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            margin_bottom: DEFAULT_MARGIN_BOTTOM,
            margin_sides: DEFAULT_MARGIN_SIDES,
            centered: true,
        }
    }
}

impl ClauseStyle {
    pub fn validate(self) -> Result<Self, ConfigError> {
        for (option, value) in [("--fontSize", self.font_size), ("--fontHeight", self.line_height)] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { option, value });
            }
        }
        for (option, value) in [("--marginBottom", self.margin_bottom), ("--marginSides", self.margin_sides)] {
            if value < 0.0 {
                return Err(ConfigError::Negative { option, value });
            }
        }
        Ok(self)
    }
}

/// Where the clause font comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum FontSource {
    File(PathBuf),
    /// Family name looked up in the system font database
    Family(String),
}

impl FontSource {
    /// Existing files and anything that looks like a font path are files,
    /// everything else is treated as a family name.
    pub fn from_arg(value: &str, cwd: &Path) -> Self {
        let path = resolve_path(cwd, value);
        let looks_like_path = value.contains(std::path::MAIN_SEPARATOR)
            || value.contains('/')
            || Path::new(value)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FONT_EXTENSIONS.contains(&ext.to_lowercase().as_str()));

        if looks_like_path || path.is_file() {
            FontSource::File(path)
        } else {
            FontSource::Family(value.to_string())
        }
    }
}

/// Fully resolved configuration of one run.
#[derive(Debug, Clone)]
pub struct StampJob {
    pub input: PathBuf,
    pub output: NameTemplate,
    pub clause: NameTemplate,
    pub company_names: Vec<String>,
    pub style: ClauseStyle,
    /// 1-based page number receiving the clause
    pub page: u32,
    pub font: FontSource,
}

/// Resolve `path` against the working directory unless it is absolute.
pub fn resolve_path(cwd: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Read a whole file, naming it in the error
pub fn load_file(path: &Path, description: &str) -> Result<Vec<u8>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} at {:?}", description, path))?;
    let mut buf = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to read {} at {:?}", description, path))?;
    Ok(buf)
}
