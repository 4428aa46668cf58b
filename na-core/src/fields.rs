//! Owned field storage and the numerical kernels acting on it.
//!
//! Storage is a dense `(variable, level, cell)` array. Cells are split into
//! the contiguous partitions of the geometry; every reduction sums partials
//! partition by partition, in partition order, and then hands the process
//! total to the communicator.

use std::ops::Range;

use nd::prelude::*;
use nd::{s, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::config::{DiracConfig, DiracPosition};
use crate::error::{Error, Result};
use crate::geometry::{Geometry, GeometryRef};
use crate::interp::InterpWeights;
use crate::variables::Variables;
use crate::Scalar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
  pub min: f64,
  pub max: f64,
  pub rms: f64,
}

#[derive(Debug, Clone)]
pub struct Fields<E>
  where E: Scalar,
{
  geom: GeometryRef,
  vars: Variables,
  data: Array3<E>,
}

impl<E> Fields<E>
  where E: Scalar,
{
  pub fn new(geom: GeometryRef, vars: Variables) -> Fields<E> {
    let data = Array3::zeros(geom.storage_shape(vars.len()));
    Fields { geom, vars, data }
  }

  pub fn geometry(&self) -> &GeometryRef { &self.geom }
  pub fn variables(&self) -> &Variables { &self.vars }
  pub fn data(&self) -> ArrayView3<E> { self.data.view() }
  pub fn data_mut(&mut self) -> ArrayViewMut3<E> { self.data.view_mut() }

  /// `(levels, cells)` of one variable.
  pub fn field_at(&self, idx: usize) -> ArrayView2<E> {
    self.data.index_axis(Axis(0), idx)
  }
  pub fn field_at_mut(&mut self, idx: usize) -> ArrayViewMut2<E> {
    self.data.index_axis_mut(Axis(0), idx)
  }
  pub fn field(&self, name: &str) -> Option<ArrayView2<E>> {
    self.vars.index_of(name).map(|i| self.field_at(i))
  }
  pub fn field_mut(&mut self, name: &str) -> Option<ArrayViewMut2<E>> {
    match self.vars.index_of(name) {
      Some(i) => Some(self.field_at_mut(i)),
      None => None,
    }
  }

  pub fn assert_conformant(&self, other: &Fields<E>) {
    assert!(self.vars == other.vars,
            "variable sets differ: [{}] vs [{}]", self.vars, other.vars);
    assert!(Geometry::same(&self.geom, &other.geom),
            "fields live on different geometries");
  }

  pub fn zero(&mut self) {
    self.data.fill(E::zero());
  }
  pub fn fill(&mut self, v: E) {
    self.data.fill(v);
  }

  pub fn copy_from(&mut self, other: &Fields<E>) {
    self.assert_conformant(other);
    self.data.assign(&other.data);
  }

  pub fn add(&mut self, other: &Fields<E>) {
    self.assert_conformant(other);
    Zip::from(&mut self.data)
      .and(&other.data)
      .par_for_each(|a, &b| *a = *a + b);
  }
  pub fn sub(&mut self, other: &Fields<E>) {
    self.assert_conformant(other);
    Zip::from(&mut self.data)
      .and(&other.data)
      .par_for_each(|a, &b| *a = *a - b);
  }
  pub fn scale(&mut self, zz: E) {
    self.data.par_mapv_inplace(|v| v * zz);
  }
  /// `self += zz * other`
  pub fn axpy(&mut self, zz: E, other: &Fields<E>) {
    self.assert_conformant(other);
    Zip::from(&mut self.data)
      .and(&other.data)
      .par_for_each(|a, &b| *a = *a + zz * b);
  }
  pub fn schur(&mut self, other: &Fields<E>) {
    self.assert_conformant(other);
    Zip::from(&mut self.data)
      .and(&other.data)
      .par_for_each(|a, &b| *a = *a * b);
  }
  /// `self = a - b`
  pub fn diff(&mut self, a: &Fields<E>, b: &Fields<E>) {
    self.assert_conformant(a);
    self.assert_conformant(b);
    Zip::from(&mut self.data)
      .and(&a.data)
      .and(&b.data)
      .par_for_each(|out, &a, &b| *out = a - b);
  }

  /// Sum of `f` over the partitions this rank owns, in partition order.
  /// Storage is replicated, so only owned cells may enter a collective.
  fn owned_sum<F>(&self, f: F) -> f64
    where F: Fn(Range<usize>) -> f64 + Sync,
  {
    let partials: Vec<f64> = self.geom
      .owned_partitions()
      .into_par_iter()
      .map(|r| f(r))
      .collect();
    partials.into_iter().sum()
  }

  pub fn dot(&self, other: &Fields<E>) -> f64 {
    self.assert_conformant(other);
    let local = self.owned_sum(|r| {
      let a = self.data.slice(s![.., .., r.clone()]);
      let b = other.data.slice(s![.., .., r]);
      a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| x.as_f64() * y.as_f64())
        .sum::<f64>()
    });
    self.geom.comm().all_reduce_sum(local)
  }

  /// Element count over the whole decomposition.
  pub fn global_size(&self) -> usize {
    let per_cell = self.vars.len() * self.geom.n_levels();
    let local = self.owned_sum(|r| (r.len() * per_cell) as f64);
    self.geom.comm().all_reduce_sum(local).round() as usize
  }

  /// `sqrt(dot(self, self) / N)`.
  pub fn rms(&self) -> f64 {
    let n = self.global_size();
    if n == 0 { return 0.0; }
    (self.dot(self) / n as f64).sqrt()
  }

  pub fn stats(&self) -> Vec<FieldStats> {
    let comm = self.geom.comm();
    let owned = self.geom.owned_partitions();
    (0..self.vars.len())
      .map(|i| {
        let f = self.field_at(i);
        let (mut min, mut max) = (::std::f64::INFINITY, ::std::f64::NEG_INFINITY);
        let (mut sq, mut n) = (0.0, 0.0);
        for r in owned.iter() {
          for &v in f.slice(s![.., r.clone()]).iter() {
            let v = v.as_f64();
            min = min.min(v);
            max = max.max(v);
            sq += v * v;
            n += 1.0;
          }
        }
        let n = comm.all_reduce_sum(n);
        let sq = comm.all_reduce_sum(sq);
        FieldStats {
          min: comm.all_reduce_min(min),
          max: comm.all_reduce_max(max),
          rms: if n > 0.0 { (sq / n).sqrt() } else { 0.0 },
        }
      })
      .collect()
  }

  /// Global mean of each field.
  pub fn means(&self) -> Vec<f64> {
    let comm = self.geom.comm();
    let owned = self.geom.owned_partitions();
    (0..self.vars.len())
      .map(|i| {
        let f = self.field_at(i);
        let (mut sum, mut n) = (0.0, 0.0);
        for r in owned.iter() {
          let part = f.slice(s![.., r.clone()]);
          sum += part.iter().map(|v| v.as_f64()).sum::<f64>();
          n += part.len() as f64;
        }
        let n = comm.all_reduce_sum(n);
        let sum = comm.all_reduce_sum(sum);
        if n > 0.0 { sum / n } else { 0.0 }
      })
      .collect()
  }

  /// Standard normal values, reproducible for a given seed whatever the
  /// decomposition.
  pub fn random(&mut self, seed: u64) {
    fill_standard_normal(self.data.view_mut(), seed);
  }

  /// Zero everywhere except a unit value at each configured point.
  pub fn dirac(&mut self, config: &DiracConfig) -> Result<()> {
    let mut targets = Vec::with_capacity(config.points.len());
    for p in config.points.iter() {
      let var = self.vars
        .index_of(&p.variable)
        .ok_or_else(|| Error::UnknownVariable(p.variable.clone()))?;
      if p.level >= self.geom.n_levels() {
        return Err(Error::OutOfRange {
          what: "dirac level",
          index: p.level,
          limit: self.geom.n_levels(),
        });
      }
      let cell = match p.position {
        DiracPosition::Cell { cell } => {
          if cell >= self.geom.n_cells() {
            return Err(Error::OutOfRange {
              what: "dirac cell",
              index: cell,
              limit: self.geom.n_cells(),
            });
          }
          cell
        },
        DiracPosition::LonLat { lon, lat } => {
          self.geom.nearest_cell(&crate::geometry::Coord::new(lon, lat))
        },
      };
      targets.push((var, p.level, cell));
    }

    self.zero();
    for (var, level, cell) in targets {
      self.data[[var, level, cell]] = E::one();
    }
    Ok(())
  }

  /// Replace the content with `other` interpolated onto this geometry.
  /// Variables and level count must agree.
  pub fn regrid_from(&mut self, other: &Fields<E>) {
    assert!(self.vars == other.vars,
            "regridding needs identical variables: [{}] vs [{}]",
            self.vars, other.vars);
    assert_eq!(self.geom.n_levels(), other.geom.n_levels(),
               "regridding between different level counts");

    if Geometry::same(&self.geom, &other.geom) {
      self.data.assign(&other.data);
      return;
    }

    let weights = InterpWeights::horizontal(&other.geom, self.geom.coords());
    Zip::from(self.data.outer_iter_mut())
      .and(other.data.outer_iter())
      .par_for_each(|mut dst, src| {
        for (dst, src) in dst.outer_iter_mut().zip(src.outer_iter()) {
          weights.apply(src, dst);
        }
      });
  }

  /// Graph Laplacian over the mesh adjacency, level by level:
  /// `out_i = sum_{j ~ i} (x_i - x_j)`.
  pub fn laplacian_into(&self, out: &mut Fields<E>) {
    self.assert_conformant(out);
    let geom = &*self.geom;
    Zip::from(out.data.outer_iter_mut())
      .and(self.data.outer_iter())
      .par_for_each(|mut dst, src| {
        for (mut dst, src) in dst.outer_iter_mut().zip(src.outer_iter()) {
          for (i, d) in dst.iter_mut().enumerate() {
            let xi = src[i];
            *d = geom.neighbours(i)
              .iter()
              .fold(E::zero(), |acc, &j| acc + (xi - src[j]));
          }
        }
      });
  }
}

pub fn fill_standard_normal<E, D>(mut a: ArrayViewMut<E, D>, seed: u64)
  where E: Scalar,
        D: Dimension,
{
  let mut rng = StdRng::seed_from_u64(seed);
  for v in a.iter_mut() {
    let z: f64 = rng.sample(StandardNormal);
    *v = E::of_f64(z);
  }
}
