//! Configuration documents. Everything here deserialises from JSON.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Coord;
use crate::ValidTime;

pub fn from_json_str<T>(s: &str) -> Result<T>
  where T: DeserializeOwned,
{
  Ok(serde_json::from_str(s)?)
}
pub fn from_value<T>(v: serde_json::Value) -> Result<T>
  where T: DeserializeOwned,
{
  Ok(serde_json::from_value(v)?)
}

fn one() -> usize { 1 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mesh", rename_all = "snake_case")]
pub enum GeometryConfig {
  Lonlat {
    nlon: usize,
    nlat: usize,
    levels: usize,
    #[serde(default = "one")]
    partitions: usize,
  },
  Cells {
    cells: Vec<Coord>,
    levels: usize,
    #[serde(default = "one")]
    partitions: usize,
  },
}
impl GeometryConfig {
  pub fn partitions(&self) -> usize {
    match self {
      &GeometryConfig::Lonlat { partitions, .. } => partitions,
      &GeometryConfig::Cells { partitions, .. } => partitions,
    }
  }
}

/// Location of a field file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConfig {
  pub filename: PathBuf,
}

/// How a state gets its initial content. `analytic_init`, when present,
/// takes precedence over `filename`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateConfig {
  #[serde(default)]
  pub analytic_init: Option<AnalyticInit>,
  #[serde(default)]
  pub filename: Option<PathBuf>,
  /// Valid time for analytic states; file reads take the file's time.
  #[serde(default)]
  pub date: Option<ValidTime>,
}
impl StateConfig {
  pub fn io(&self) -> Result<IoConfig> {
    match self.filename {
      Some(ref f) => Ok(IoConfig { filename: f.clone() }),
      None => Err(Error::config("state configuration has neither `analytic_init` nor `filename`")),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AnalyticInit {
  /// Every value of every field.
  Constant { value: f64 },
  /// `offset + amplitude * cos(k * lon) * cos(lat)`.
  ZonalWave {
    amplitude: f64,
    wavenumber: f64,
    #[serde(default)]
    offset: f64,
  },
  /// Idealised column: temperature falling with level and latitude,
  /// exponentially decaying pressure, humidity from a fixed relative
  /// humidity. Unrecognised variables are zeroed.
  Atmosphere {
    surface_temperature: f64,
    /// K per level.
    lapse_rate: f64,
    /// Pa.
    surface_pressure: f64,
    /// Fractional pressure decay per level.
    pressure_decay: f64,
    relative_humidity: f64,
  },
}

/// Unit impulses for impulse-response tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiracConfig {
  pub points: Vec<DiracPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiracPoint {
  #[serde(flatten)]
  pub position: DiracPosition,
  #[serde(default)]
  pub level: usize,
  pub variable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiracPosition {
  Cell { cell: usize },
  /// Snapped to the nearest cell centre.
  LonLat { lon: f64, lat: f64 },
}
