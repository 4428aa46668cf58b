use std::iter::FromIterator;
use std::slice;

use serde::{Deserialize, Serialize};

use crate::geometry::Coord;
use crate::ValidTime;

/// An observation point. `level` is a fractional model level index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub lon: f64,
  pub lat: f64,
  pub level: f64,
  pub time: ValidTime,
}
impl Location {
  pub fn coord(&self) -> Coord { Coord::new(self.lon, self.lat) }
}

/// Ordered observation locations; sampled values come back in this order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locations {
  locs: Vec<Location>,
}
impl Locations {
  pub fn new(locs: Vec<Location>) -> Locations {
    Locations { locs }
  }
  pub fn len(&self) -> usize { self.locs.len() }
  pub fn is_empty(&self) -> bool { self.locs.is_empty() }
  pub fn iter(&self) -> slice::Iter<Location> { self.locs.iter() }
  pub fn push(&mut self, l: Location) { self.locs.push(l); }
  pub fn coords(&self) -> Vec<Coord> {
    self.locs.iter().map(Location::coord).collect()
  }
  pub fn levels(&self) -> Vec<f64> {
    self.locs.iter().map(|l| l.level).collect()
  }
}
impl FromIterator<Location> for Locations {
  fn from_iter<I>(iter: I) -> Locations
    where I: IntoIterator<Item = Location>,
  {
    Locations { locs: iter.into_iter().collect() }
  }
}
