//! Perturbations of the model state: the vectors the minimiser works on.

use std::fmt;
use std::ops::{AddAssign, MulAssign, SubAssign};
use std::sync::atomic::{AtomicU64, Ordering};

use nd::prelude::*;
use tracing::{trace, Span};

use nac::config::{DiracConfig, IoConfig};
use nac::io::{read_fields, write_fields};
use nac::{Fields, Geometry, GeometryRef, Scalar, ValidTime, Variables};

use crate::geovals::{self, GeoVals};
use crate::state::StateVector;
use crate::trajectory::TrajectoryCache;
use crate::unstructured::{self, UnstructuredGrid};
use crate::{assert_same_time, print_fields, AsFields, Result};

/// Low half of the first `randomize` seed of a fresh increment.
const DEFAULT_SEED: u64 = 7;
/// Increments constructed so far; each one draws from its own seed stream.
static STREAMS: AtomicU64 = AtomicU64::new(0);

fn fresh_seed() -> u64 {
  let stream = STREAMS.fetch_add(1, Ordering::Relaxed);
  (stream << 32) ^ DEFAULT_SEED
}

#[derive(Debug)]
pub struct IncrementVector<E>
  where E: Scalar,
{
  fields: Fields<E>,
  time: ValidTime,
  seed: u64,
  span: Span,
}

impl<E> IncrementVector<E>
  where E: Scalar,
{
  /// Zero increment.
  pub fn new(geom: GeometryRef, vars: Variables, time: ValidTime) -> IncrementVector<E> {
    let span = Span::current();
    trace!(parent: &span, cells = geom.n_cells(), variables = %vars, "increment constructed");
    IncrementVector {
      fields: Fields::new(geom, vars),
      time,
      seed: fresh_seed(),
      span,
    }
  }

  /// Same geometry, variables and time as `other`; its content too if
  /// `copy`, zero otherwise.
  pub fn copy_of(other: &IncrementVector<E>, copy: bool) -> IncrementVector<E> {
    let mut dx = IncrementVector::new(other.geometry().clone(),
                                      other.variables().clone(),
                                      other.time);
    dx.span = other.span.clone();
    if copy {
      dx.fields.copy_from(&other.fields);
    }
    dx
  }

  /// `other` interpolated onto `geom`.
  pub fn from_resolution(geom: GeometryRef, other: &IncrementVector<E>) -> IncrementVector<E> {
    let mut dx = IncrementVector::new(geom, other.variables().clone(), other.time);
    dx.span = other.span.clone();
    dx.fields.regrid_from(&other.fields);
    trace!(parent: &dx.span, "increment created by interpolation");
    dx
  }

  pub fn with_span(mut self, span: Span) -> IncrementVector<E> {
    self.span = span;
    self
  }

  pub fn geometry(&self) -> &GeometryRef { self.fields.geometry() }
  pub fn variables(&self) -> &Variables { self.fields.variables() }
  pub fn valid_time(&self) -> &ValidTime { &self.time }
  pub fn set_valid_time(&mut self, time: ValidTime) { self.time = time; }
  pub fn fields(&self) -> &Fields<E> { &self.fields }
  pub fn fields_mut(&mut self) -> &mut Fields<E> { &mut self.fields }
  pub fn field(&self, name: &str) -> Option<ArrayView2<E>> { self.fields.field(name) }
  pub fn field_mut(&mut self, name: &str) -> Option<ArrayViewMut2<E>> { self.fields.field_mut(name) }

  pub fn zero(&mut self) {
    self.fields.zero();
  }
  /// Zero and move to `time`.
  pub fn zero_at(&mut self, time: ValidTime) {
    self.fields.zero();
    self.time = time;
  }

  /// Standard normal content. Successive calls give different draws, and
  /// distinct increments draw from distinct streams. A clone continues its
  /// source's stream. Use `randomize_with_seed` for reproducible content.
  pub fn randomize(&mut self) {
    let seed = self.seed;
    self.seed = self.seed.wrapping_add(1);
    self.randomize_with_seed(seed);
  }
  pub fn randomize_with_seed(&mut self, seed: u64) {
    self.fields.random(seed);
    trace!(parent: &self.span, seed, "increment randomized");
  }

  /// Content and time of `other`. The geometry stays this increment's.
  pub fn assign(&mut self, other: &IncrementVector<E>) {
    self.fields.copy_from(&other.fields);
    self.time = other.time;
  }

  pub fn add_in_place(&mut self, other: &IncrementVector<E>) {
    assert_same_time(&self.time, &other.time);
    self.fields.add(&other.fields);
  }
  pub fn subtract_in_place(&mut self, other: &IncrementVector<E>) {
    assert_same_time(&self.time, &other.time);
    self.fields.sub(&other.fields);
  }
  pub fn scale_in_place(&mut self, zz: E) {
    self.fields.scale(zz);
  }

  /// `self += zz * other`, where `other` is an increment or a state.
  pub fn axpy<V>(&mut self, zz: E, other: &V, check_time: bool)
    where V: AsFields<E>,
  {
    if check_time {
      assert_same_time(&self.time, other.valid_time());
    }
    self.fields.axpy(zz, other.fields());
  }

  /// `self += zz * x` with no valid-time check.
  pub fn accumulate(&mut self, zz: E, x: &StateVector<E>) {
    self.fields.axpy(zz, x.fields());
  }

  pub fn schur_product_in_place(&mut self, other: &IncrementVector<E>) {
    self.fields.schur(&other.fields);
  }

  /// Global inner product; independent of the decomposition.
  pub fn dot(&self, other: &IncrementVector<E>) -> f64 {
    self.fields.dot(&other.fields)
  }

  /// `self = a - b`; both states must be valid at this increment's time.
  pub fn diff(&mut self, a: &StateVector<E>, b: &StateVector<E>) {
    assert_same_time(&self.time, a.valid_time());
    assert_same_time(&self.time, b.valid_time());
    self.fields.diff(a.fields(), b.fields());
  }

  /// `sqrt(dot(self, self) / N)`, `N` the global element count.
  pub fn norm(&self) -> f64 {
    self.fields.rms()
  }

  /// Tangent linear of `StateVector::sample_with_trajectory`.
  pub fn sample_tl(&self, traj: &TrajectoryCache<E>) -> GeoVals<E> {
    let lin = traj.linearization();
    self.assert_trajectory_fits(traj);
    trace!(parent: &self.span, locations = lin.locations.len(), "increment sample tl");
    geovals::interpolate(&self.fields, &lin.weights, &lin.variables)
  }

  /// Adjoint of `sample_tl`; accumulates into this increment.
  pub fn sample_ad(&mut self, values: &GeoVals<E>, traj: &TrajectoryCache<E>) {
    let lin = traj.linearization();
    self.assert_trajectory_fits(traj);
    assert!(values.variables() == &lin.variables,
            "geovals variables [{}] differ from the trajectory's [{}]",
            values.variables(), lin.variables);
    trace!(parent: &self.span, locations = lin.locations.len(), "increment sample ad");
    geovals::interpolate_ad(&mut self.fields, &lin.weights, values);
  }

  fn assert_trajectory_fits(&self, traj: &TrajectoryCache<E>) {
    let state = traj.state();
    assert!(Geometry::same(self.geometry(), state.geometry()),
            "increment and trajectory live on different geometries");
    assert_same_time(&self.time, state.valid_time());
  }

  pub fn to_unstructured_coordinates(&self, ug: &mut UnstructuredGrid<E>) {
    unstructured::coordinates_into(&self.fields, ug);
  }
  pub fn field_to_unstructured(&self, ug: &mut UnstructuredGrid<E>, field: usize) {
    unstructured::field_into(&self.fields, ug, field);
  }
  pub fn field_from_unstructured(&mut self, ug: &UnstructuredGrid<E>, field: usize) {
    unstructured::field_from(&mut self.fields, ug, field);
  }

  /// Sets the valid time from the file.
  pub fn read(&mut self, config: &IoConfig) -> Result<()> {
    self.time = read_fields(&mut self.fields, config)?;
    trace!(parent: &self.span, file = %config.filename.display(), "increment read");
    Ok(())
  }
  pub fn write(&self, config: &IoConfig) -> Result<()> {
    write_fields(&self.fields, &self.time, config)?;
    trace!(parent: &self.span, file = %config.filename.display(), "increment written");
    Ok(())
  }

  pub fn dirac(&mut self, config: &DiracConfig) -> Result<()> {
    self.fields.dirac(config)
  }
}

impl<E> Clone for IncrementVector<E>
  where E: Scalar,
{
  fn clone(&self) -> IncrementVector<E> {
    trace!(parent: &self.span, "increment copied");
    IncrementVector {
      fields: self.fields.clone(),
      time: self.time,
      seed: self.seed,
      span: self.span.clone(),
    }
  }
}

impl<'a, E> AddAssign<&'a IncrementVector<E>> for IncrementVector<E>
  where E: Scalar,
{
  fn add_assign(&mut self, rhs: &'a IncrementVector<E>) {
    self.add_in_place(rhs);
  }
}
impl<'a, E> SubAssign<&'a IncrementVector<E>> for IncrementVector<E>
  where E: Scalar,
{
  fn sub_assign(&mut self, rhs: &'a IncrementVector<E>) {
    self.subtract_in_place(rhs);
  }
}
impl<E> MulAssign<E> for IncrementVector<E>
  where E: Scalar,
{
  fn mul_assign(&mut self, rhs: E) {
    self.scale_in_place(rhs);
  }
}

impl<E> AsFields<E> for IncrementVector<E>
  where E: Scalar,
{
  fn fields(&self) -> &Fields<E> { &self.fields }
  fn valid_time(&self) -> &ValidTime { &self.time }
}

impl<E> fmt::Display for IncrementVector<E>
  where E: Scalar,
{
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    print_fields(f, &self.time, &self.fields)
  }
}
