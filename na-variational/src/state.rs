//! Full nonlinear model state.

use std::fmt;
use std::ptr;

use nd::prelude::*;
use tracing::{debug, trace, Span};

use nac::analytic::analytic_init;
use nac::config::{AnalyticInit, IoConfig, StateConfig};
use nac::io::{read_fields, write_fields};
use nac::{Fields, GeometryRef, Locations, SamplingWeights, Scalar, ValidTime, Variables};

use crate::geovals::{self, GeoVals};
use crate::increment::IncrementVector;
use crate::trajectory::TrajectoryCache;
use crate::unstructured::{self, UnstructuredGrid};
use crate::{assert_same_time, print_fields, AsFields, Result};

#[derive(Debug)]
pub struct StateVector<E>
  where E: Scalar,
{
  fields: Fields<E>,
  time: ValidTime,
  span: Span,
}

impl<E> StateVector<E>
  where E: Scalar,
{
  /// Zero-valued state.
  pub fn new(geom: GeometryRef, vars: Variables, time: ValidTime) -> StateVector<E> {
    let span = Span::current();
    trace!(parent: &span, cells = geom.n_cells(), variables = %vars, "state constructed");
    StateVector {
      fields: Fields::new(geom, vars),
      time,
      span,
    }
  }

  /// Analytic initialisation when `analytic_init` is configured, otherwise
  /// a file read (which also sets the valid time).
  pub fn from_config(geom: GeometryRef, vars: Variables,
                     config: &StateConfig) -> Result<StateVector<E>>
  {
    let time = config.date.unwrap_or(ValidTime::MIN_UTC);
    let mut x = StateVector::new(geom, vars, time);
    match config.analytic_init {
      Some(ref init) => x.analytic_init(init),
      None => x.read(&config.io()?)?,
    }
    Ok(x)
  }

  /// `other` interpolated onto `geom`.
  pub fn from_resolution(geom: GeometryRef, other: &StateVector<E>) -> StateVector<E> {
    let mut x = StateVector::new(geom, other.variables().clone(), other.time);
    x.span = other.span.clone();
    x.change_resolution(other);
    trace!(parent: &x.span, "state created by interpolation");
    x
  }

  /// Replace the observability hook events are reported under.
  pub fn with_span(mut self, span: Span) -> StateVector<E> {
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

  /// Content and time of `other`; shapes must agree.
  pub fn assign(&mut self, other: &StateVector<E>) {
    self.fields.copy_from(&other.fields);
    self.time = other.time;
  }

  pub fn zero(&mut self) {
    self.fields.zero();
  }

  /// `self += zz * other` with no valid-time check; builds running means.
  pub fn accumulate(&mut self, zz: E, other: &StateVector<E>) {
    self.fields.axpy(zz, &other.fields);
  }

  /// `self += dx`
  pub fn add_increment(&mut self, dx: &IncrementVector<E>) {
    assert_same_time(&self.time, dx.valid_time());
    self.fields.add(dx.fields());
  }

  pub fn norm(&self) -> f64 {
    self.fields.rms()
  }

  /// Model equivalents at `locs`. Pays the full interpolation cost.
  pub fn sample(&self, locs: &Locations, vars: &Variables) -> GeoVals<E> {
    trace!(parent: &self.span, locations = locs.len(), "state sample");
    let weights = SamplingWeights::new(self.geometry(), &locs.coords(), &locs.levels());
    geovals::interpolate(&self.fields, &weights, vars)
  }

  /// Same values as `sample`. The first call linearizes `traj` about this
  /// state; later calls (and the increment TL/AD sampling) reuse its
  /// weights.
  pub fn sample_with_trajectory(&self, locs: &Locations, vars: &Variables,
                                traj: &mut TrajectoryCache<E>) -> GeoVals<E>
  {
    assert!(ptr::eq(traj.state(), self),
            "trajectory cache belongs to a different state");

    if traj.is_linearized() {
      let lin = traj.linearization();
      assert!(lin.locations == *locs, "trajectory cache was built for other locations");
      assert!(lin.variables == *vars, "trajectory cache was built for other variables");
      trace!(parent: &self.span, locations = locs.len(), "state sample, cached weights");
      return geovals::interpolate(&self.fields, &lin.weights, vars);
    }

    debug!(parent: &self.span, locations = locs.len(), variables = %vars,
           "linearizing sampling operator");
    let weights = SamplingWeights::new(self.geometry(), &locs.coords(), &locs.levels());
    let values = geovals::interpolate(&self.fields, &weights, vars);
    traj.record(locs.clone(), vars.clone(), weights, values.clone());
    values
  }

  /// Take `other` regridded onto this state's geometry.
  pub fn change_resolution(&mut self, other: &StateVector<E>) {
    self.fields.regrid_from(&other.fields);
    self.time = other.time;

    let before = other.fields.means();
    let after = self.fields.means();
    for ((name, b), a) in self.fields.variables().iter().zip(before).zip(after) {
      debug!(parent: &self.span, variable = %name, source_mean = b, target_mean = a,
             "changed resolution");
    }
  }

  pub fn analytic_init(&mut self, init: &AnalyticInit) {
    analytic_init(&mut self.fields, init);
    trace!(parent: &self.span, "state analytic init");
  }

  pub fn read(&mut self, config: &IoConfig) -> Result<()> {
    self.time = read_fields(&mut self.fields, config)?;
    Ok(())
  }

  pub fn write(&self, config: &IoConfig) -> Result<()> {
    write_fields(&self.fields, &self.time, config)
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
}

impl<E> Clone for StateVector<E>
  where E: Scalar,
{
  fn clone(&self) -> StateVector<E> {
    trace!(parent: &self.span, "state copied");
    StateVector {
      fields: self.fields.clone(),
      time: self.time,
      span: self.span.clone(),
    }
  }
}

impl<E> AsFields<E> for StateVector<E>
  where E: Scalar,
{
  fn fields(&self) -> &Fields<E> { &self.fields }
  fn valid_time(&self) -> &ValidTime { &self.time }
}

impl<E> fmt::Display for StateVector<E>
  where E: Scalar,
{
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    print_fields(f, &self.time, &self.fields)
  }
}
