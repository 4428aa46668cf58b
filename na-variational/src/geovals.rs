//! Model equivalents at observation locations.

use nd::parallel::prelude::*;
use nd::prelude::*;

use nac::fields::fill_standard_normal;
use nac::{Fields, SamplingWeights, Scalar, Variables};

/// `(variables, locations)` values, in the order of the locations they were
/// sampled at.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoVals<E>
  where E: Scalar,
{
  vars: Variables,
  values: Array2<E>,
}

impl<E> GeoVals<E>
  where E: Scalar,
{
  pub fn new(vars: Variables, n_locations: usize) -> GeoVals<E> {
    let values = Array2::zeros((vars.len(), n_locations));
    GeoVals { vars, values }
  }

  pub fn variables(&self) -> &Variables { &self.vars }
  pub fn n_locations(&self) -> usize { self.values.dim().1 }
  pub fn values(&self) -> ArrayView2<E> { self.values.view() }
  pub fn values_mut(&mut self) -> ArrayViewMut2<E> { self.values.view_mut() }

  pub fn get(&self, name: &str) -> Option<ArrayView1<E>> {
    self.vars.index_of(name).map(|i| self.values.row(i))
  }

  pub fn zero(&mut self) {
    self.values.fill(E::zero());
  }
  pub fn randomize_with_seed(&mut self, seed: u64) {
    fill_standard_normal(self.values.view_mut(), seed);
  }

  pub fn dot(&self, other: &GeoVals<E>) -> f64 {
    assert!(self.vars == other.vars,
            "geovals variables differ: [{}] vs [{}]", self.vars, other.vars);
    assert_eq!(self.n_locations(), other.n_locations());
    self.values
      .iter()
      .zip(other.values.iter())
      .map(|(&a, &b)| a.as_f64() * b.as_f64())
      .sum()
  }
}

fn field_indices<E>(fields: &Fields<E>, vars: &Variables) -> Vec<usize>
  where E: Scalar,
{
  vars.iter()
    .map(|name| {
      match fields.variables().index_of(name) {
        Some(i) => i,
        None => panic!("cannot sample `{}`: not among [{}]", name, fields.variables()),
      }
    })
    .collect()
}

/// `H x` for the requested variables.
pub(crate) fn interpolate<E>(fields: &Fields<E>, weights: &SamplingWeights,
                             vars: &Variables) -> GeoVals<E>
  where E: Scalar,
{
  let idx = field_indices(fields, vars);
  let mut out = GeoVals::new(vars.clone(), weights.n_locations());
  out.values
    .axis_iter_mut(Axis(0))
    .into_par_iter()
    .zip(idx.par_iter())
    .for_each(|(row, &i)| weights.interpolate(fields.field_at(i), row));
  out
}

/// `x += H^T y`
pub(crate) fn interpolate_ad<E>(fields: &mut Fields<E>, weights: &SamplingWeights,
                                values: &GeoVals<E>)
  where E: Scalar,
{
  assert_eq!(values.n_locations(), weights.n_locations(),
             "geovals hold {} locations, trajectory {}",
             values.n_locations(), weights.n_locations());
  let idx = field_indices(fields, &values.vars);
  for (row, i) in values.values.outer_iter().zip(idx) {
    weights.interpolate_ad(row, fields.field_at_mut(i));
  }
}
