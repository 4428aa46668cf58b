//! Linearisation record of the sampling operator.

use nac::{Locations, SamplingWeights, Scalar, Variables};

use crate::geovals::GeoVals;
use crate::state::StateVector;

/// What the first trajectory-aware sample leaves behind for the tangent
/// linear and adjoint sampling of increments.
#[derive(Debug)]
pub(crate) struct Linearization<E>
  where E: Scalar,
{
  pub(crate) locations: Locations,
  pub(crate) variables: Variables,
  pub(crate) weights: SamplingWeights,
  pub(crate) background: GeoVals<E>,
}

/// Borrows the state it linearizes, so the state can neither change nor be
/// dropped while the cache is alive. Starts empty; the first
/// `StateVector::sample_with_trajectory` fills it.
#[derive(Debug)]
pub struct TrajectoryCache<'s, E>
  where E: Scalar,
{
  state: &'s StateVector<E>,
  record: Option<Linearization<E>>,
}

impl<'s, E> TrajectoryCache<'s, E>
  where E: Scalar,
{
  pub fn new(state: &'s StateVector<E>) -> TrajectoryCache<'s, E> {
    TrajectoryCache {
      state,
      record: None,
    }
  }

  pub fn state(&self) -> &'s StateVector<E> { self.state }

  pub fn is_linearized(&self) -> bool { self.record.is_some() }

  pub fn locations(&self) -> Option<&Locations> {
    self.record.as_ref().map(|r| &r.locations)
  }
  pub fn variables(&self) -> Option<&Variables> {
    self.record.as_ref().map(|r| &r.variables)
  }
  /// Values of the linearization state at the cached locations.
  pub fn background(&self) -> Option<&GeoVals<E>> {
    self.record.as_ref().map(|r| &r.background)
  }

  pub(crate) fn linearization(&self) -> &Linearization<E> {
    match self.record {
      Some(ref r) => r,
      None => panic!("trajectory cache has not been linearized"),
    }
  }

  pub(crate) fn record(&mut self, locations: Locations, variables: Variables,
                       weights: SamplingWeights, background: GeoVals<E>)
  {
    debug_assert!(self.record.is_none());
    self.record = Some(Linearization {
      locations,
      variables,
      weights,
      background,
    });
  }
}
