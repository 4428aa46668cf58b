#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use na_core::config::AnalyticInit;
use na_core::{Geometry, GeometryRef, ValidTime, Variables};
use na_variational::{IncrementVector, StateVector};

pub fn time() -> ValidTime {
  Utc.with_ymd_and_hms(2018, 4, 15, 0, 0, 0).unwrap()
}
pub fn later() -> ValidTime {
  Utc.with_ymd_and_hms(2018, 4, 15, 6, 0, 0).unwrap()
}

pub fn vars(names: &[&str]) -> Variables {
  Variables::new(names.to_vec()).unwrap()
}

pub fn mesh(nlon: usize, nlat: usize, levels: usize) -> GeometryRef {
  Geometry::lonlat(nlon, nlat, levels).unwrap().shared()
}

pub fn atmosphere(relative_humidity: f64) -> AnalyticInit {
  AnalyticInit::Atmosphere {
    surface_temperature: 295.0,
    lapse_rate: 6.0,
    surface_pressure: 100_000.0,
    pressure_decay: 0.12,
    relative_humidity,
  }
}

pub fn atmosphere_state(geom: &GeometryRef, names: &[&str], rh: f64) -> StateVector<f64> {
  let mut x = StateVector::new(geom.clone(), vars(names), time());
  x.analytic_init(&atmosphere(rh));
  x
}

pub fn random_increment(geom: &GeometryRef, vars: &Variables, seed: u64) -> IncrementVector<f64> {
  let mut dx = IncrementVector::new(geom.clone(), vars.clone(), time());
  dx.randomize_with_seed(seed);
  dx
}

/// `|a - b| / max(1, |b|)`
pub fn relative_gap(a: f64, b: f64) -> f64 {
  (a - b).abs() / b.abs().max(1.0)
}
