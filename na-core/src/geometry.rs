//! Mesh description. Immutable once built and shared read-only between
//! every vector defined on it.

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::comm::{Communicator, SerialComm};
use crate::config::GeometryConfig;
use crate::error::{Error, Result};

/// Number of nearest cells linked when adjacency is derived from
/// coordinates alone.
const ADJACENCY_K: usize = 4;

/// Cell centre, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
  pub lon: f64,
  pub lat: f64,
}
impl Coord {
  pub fn new(lon: f64, lat: f64) -> Coord {
    Coord { lon, lat }
  }

  /// Great-circle distance in radians (haversine).
  pub fn angular_distance(&self, other: &Coord) -> f64 {
    let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (other.lon - self.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
      + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
  }
}

pub type GeometryRef = Arc<Geometry>;

#[derive(Debug, Clone)]
pub struct Geometry {
  cells: Vec<Coord>,
  levels: usize,
  neighbours: Vec<Vec<usize>>,
  /// Contiguous cell ranges, one per worker of the decomposition.
  partitions: Vec<Range<usize>>,
  comm: Arc<dyn Communicator>,
}

impl Geometry {
  /// Unstructured mesh; adjacency links each cell to its nearest cells and
  /// is then made symmetric.
  pub fn new(cells: Vec<Coord>, levels: usize) -> Result<Geometry> {
    check_sizes(cells.len(), levels)?;

    let n = cells.len();
    let mut neighbours = vec![Vec::new(); n];
    for i in 0..n {
      let mut dist: Vec<(f64, usize)> = (0..n)
        .filter(|&j| j != i)
        .map(|j| (cells[i].angular_distance(&cells[j]), j))
        .collect();
      dist.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
      for &(_, j) in dist.iter().take(ADJACENCY_K) {
        link(&mut neighbours, i, j);
      }
    }

    Ok(Geometry::assemble(cells, levels, neighbours))
  }

  /// Regular lon/lat grid of cell centres, periodic in longitude.
  /// Cell `(i, j)` is stored at `j * nlon + i`.
  pub fn lonlat(nlon: usize, nlat: usize, levels: usize) -> Result<Geometry> {
    check_sizes(nlon * nlat, levels)?;

    let dlon = 360.0 / nlon as f64;
    let dlat = 180.0 / nlat as f64;
    let mut cells = Vec::with_capacity(nlon * nlat);
    for j in 0..nlat {
      for i in 0..nlon {
        cells.push(Coord::new((i as f64 + 0.5) * dlon,
                              -90.0 + (j as f64 + 0.5) * dlat));
      }
    }

    let mut neighbours = vec![Vec::new(); nlon * nlat];
    for j in 0..nlat {
      for i in 0..nlon {
        let c = j * nlon + i;
        link(&mut neighbours, c, j * nlon + (i + 1) % nlon);
        if j + 1 < nlat {
          link(&mut neighbours, c, (j + 1) * nlon + i);
        }
      }
    }

    Ok(Geometry::assemble(cells, levels, neighbours))
  }

  pub fn from_config(config: &GeometryConfig) -> Result<Geometry> {
    let geom = match config {
      &GeometryConfig::Lonlat { nlon, nlat, levels, .. } => {
        Geometry::lonlat(nlon, nlat, levels)?
      },
      &GeometryConfig::Cells { ref cells, levels, .. } => {
        Geometry::new(cells.clone(), levels)?
      },
    };
    geom.with_partitions(config.partitions())
  }

  fn assemble(cells: Vec<Coord>, levels: usize,
              neighbours: Vec<Vec<usize>>) -> Geometry
  {
    let n = cells.len();
    Geometry {
      cells,
      levels,
      neighbours,
      partitions: vec![0..n],
      comm: Arc::new(SerialComm),
    }
  }

  /// Re-decompose into `n` contiguous, near-equal cell ranges. Content
  /// is unchanged; only the reduction layout differs.
  pub fn with_partitions(mut self, n: usize) -> Result<Geometry> {
    let cells = self.cells.len();
    if n == 0 || n > cells {
      return Err(Error::OutOfRange {
        what: "partition count",
        index: n,
        limit: cells,
      });
    }

    let base = cells / n;
    let extra = cells % n;
    let mut start = 0;
    self.partitions = (0..n)
      .map(|p| {
        let len = base + if p < extra { 1 } else { 0 };
        let r = start..start + len;
        start += len;
        r
      })
      .collect();

    Ok(self)
  }

  pub fn with_communicator(mut self, comm: Arc<dyn Communicator>) -> Geometry {
    self.comm = comm;
    self
  }

  pub fn shared(self) -> GeometryRef { Arc::new(self) }

  pub fn n_cells(&self) -> usize { self.cells.len() }
  pub fn n_levels(&self) -> usize { self.levels }
  pub fn coords(&self) -> &[Coord] { &self.cells[..] }
  pub fn neighbours(&self, cell: usize) -> &[usize] { &self.neighbours[cell][..] }
  pub fn partitions(&self) -> &[Range<usize>] { &self.partitions[..] }
  pub fn comm(&self) -> &dyn Communicator { &*self.comm }

  /// Partitions reduced by this rank: every `size`-th one, starting at
  /// `rank`. All of them under `SerialComm`.
  pub fn owned_partitions(&self) -> Vec<Range<usize>> {
    let (rank, size) = (self.comm.rank(), self.comm.size().max(1));
    self.partitions
      .iter()
      .enumerate()
      .filter(|&(p, _)| p % size == rank)
      .map(|(_, r)| r.clone())
      .collect()
  }

  /// Storage shape `(variables, levels, cells)` for `n_vars` fields.
  pub fn storage_shape(&self, n_vars: usize) -> (usize, usize, usize) {
    (n_vars, self.levels, self.cells.len())
  }

  pub fn nearest_cell(&self, at: &Coord) -> usize {
    self.cells
      .iter()
      .enumerate()
      .map(|(i, c)| (at.angular_distance(c), i))
      .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
      .map(|(_, i)| i)
      .unwrap_or(0)
  }

  /// Pointer-equal handles, or independently built but identical meshes.
  pub fn same(a: &GeometryRef, b: &GeometryRef) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
  }
}

impl PartialEq for Geometry {
  fn eq(&self, rhs: &Geometry) -> bool {
    self.levels == rhs.levels
      && self.cells == rhs.cells
      && self.neighbours == rhs.neighbours
  }
}

fn check_sizes(cells: usize, levels: usize) -> Result<()> {
  if cells == 0 {
    return Err(Error::config("a mesh needs at least one cell"));
  }
  if levels == 0 {
    return Err(Error::config("a mesh needs at least one level"));
  }
  Ok(())
}

fn link(neighbours: &mut [Vec<usize>], a: usize, b: usize) {
  if a == b { return; }
  if !neighbours[a].contains(&b) {
    neighbours[a].push(b);
  }
  if !neighbours[b].contains(&a) {
    neighbours[b].push(a);
  }
}
