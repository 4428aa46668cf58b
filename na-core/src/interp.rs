//! Sparse interpolation weights between meshes and from a mesh to
//! observation locations. The same weights drive the forward operator and
//! its transpose.

use std::cmp::Ordering;

use nd::prelude::*;
use rayon::prelude::*;

use crate::geometry::{Coord, Geometry};
use crate::Scalar;

/// Source cells contributing to one target point.
const K_NEAREST: usize = 4;
/// Below this angular distance (radians) a source cell is the target.
const COINCIDENT: f64 = 1e-9;

/// Horizontal weights: one row per target point, entries `(cell, weight)`
/// summing to one.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpWeights {
  rows: Vec<Vec<(usize, f64)>>,
  n_source: usize,
}

impl InterpWeights {
  /// Inverse-distance-squared over the nearest source cells; a coincident
  /// source cell takes the whole weight.
  pub fn horizontal(source: &Geometry, targets: &[Coord]) -> InterpWeights {
    let cells = source.coords();
    let k = K_NEAREST.min(cells.len());

    let rows = targets
      .par_iter()
      .map(|t| {
        let mut dist: Vec<(f64, usize)> = cells
          .iter()
          .enumerate()
          .map(|(i, c)| (t.angular_distance(c), i))
          .collect();
        dist.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
        dist.truncate(k);

        if dist[0].0 < COINCIDENT {
          return vec![(dist[0].1, 1.0)];
        }

        let inv: Vec<f64> = dist.iter().map(|&(d, _)| 1.0 / (d * d)).collect();
        let total: f64 = inv.iter().sum();
        dist.iter()
          .zip(inv.iter())
          .map(|(&(_, i), &w)| (i, w / total))
          .collect()
      })
      .collect();

    InterpWeights {
      rows,
      n_source: cells.len(),
    }
  }

  pub fn n_rows(&self) -> usize { self.rows.len() }
  pub fn n_source(&self) -> usize { self.n_source }
  pub fn row(&self, i: usize) -> &[(usize, f64)] { &self.rows[i][..] }

  /// `dst = W src`
  pub fn apply<E>(&self, src: ArrayView1<E>, mut dst: ArrayViewMut1<E>)
    where E: Scalar,
  {
    assert_eq!(src.len(), self.n_source);
    assert_eq!(dst.len(), self.rows.len());
    for (d, row) in dst.iter_mut().zip(self.rows.iter()) {
      *d = row.iter()
        .fold(E::zero(), |acc, &(c, w)| acc + E::of_f64(w) * src[c]);
    }
  }

  /// `dst += W^T src`
  pub fn apply_transpose<E>(&self, src: ArrayView1<E>, mut dst: ArrayViewMut1<E>)
    where E: Scalar,
  {
    assert_eq!(src.len(), self.rows.len());
    assert_eq!(dst.len(), self.n_source);
    for (&s, row) in src.iter().zip(self.rows.iter()) {
      for &(c, w) in row.iter() {
        dst[c] = dst[c] + E::of_f64(w) * s;
      }
    }
  }
}

/// Horizontal weights combined with linear weights between the two model
/// levels bracketing each location's fractional level.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingWeights {
  horizontal: InterpWeights,
  /// `(lower level, upper level, weight of upper)` per location.
  vertical: Vec<(usize, usize, f64)>,
  n_levels: usize,
}

impl SamplingWeights {
  pub fn new(geom: &Geometry, coords: &[Coord], levels: &[f64]) -> SamplingWeights {
    assert_eq!(coords.len(), levels.len());
    let top = (geom.n_levels() - 1) as f64;
    let vertical = levels
      .iter()
      .map(|&l| {
        let l = if l.is_nan() { 0.0 } else { l.max(0.0).min(top) };
        let k0 = l.floor() as usize;
        let k1 = (k0 + 1).min(geom.n_levels() - 1);
        let frac = if k1 == k0 { 0.0 } else { l - k0 as f64 };
        (k0, k1, frac)
      })
      .collect();

    SamplingWeights {
      horizontal: InterpWeights::horizontal(geom, coords),
      vertical,
      n_levels: geom.n_levels(),
    }
  }

  pub fn n_locations(&self) -> usize { self.vertical.len() }

  /// Values of one `(levels, cells)` field at every location.
  pub fn interpolate<E>(&self, field: ArrayView2<E>, mut out: ArrayViewMut1<E>)
    where E: Scalar,
  {
    assert_eq!(field.dim(), (self.n_levels, self.horizontal.n_source()));
    assert_eq!(out.len(), self.n_locations());
    for (loc, o) in out.iter_mut().enumerate() {
      let (k0, k1, frac) = self.vertical[loc];
      let (w0, w1) = (E::of_f64(1.0 - frac), E::of_f64(frac));
      *o = self.horizontal
        .row(loc)
        .iter()
        .fold(E::zero(), |acc, &(c, w)| {
          let column = w0 * field[[k0, c]] + w1 * field[[k1, c]];
          acc + E::of_f64(w) * column
        });
    }
  }

  /// Adjoint of `interpolate`; accumulates into `field`.
  pub fn interpolate_ad<E>(&self, values: ArrayView1<E>, mut field: ArrayViewMut2<E>)
    where E: Scalar,
  {
    assert_eq!(field.dim(), (self.n_levels, self.horizontal.n_source()));
    assert_eq!(values.len(), self.n_locations());
    for (loc, &v) in values.iter().enumerate() {
      let (k0, k1, frac) = self.vertical[loc];
      let (w0, w1) = (E::of_f64(1.0 - frac), E::of_f64(frac));
      for &(c, w) in self.horizontal.row(loc) {
        let hv = E::of_f64(w) * v;
        field[[k0, c]] = field[[k0, c]] + w0 * hv;
        field[[k1, c]] = field[[k1, c]] + w1 * hv;
      }
    }
  }
}
