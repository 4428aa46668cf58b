//! States, increments and the linear operators an incremental variational
//! minimisation moves them through.

extern crate na_core as nac;
extern crate ndarray as nd;
extern crate serde;
extern crate tracing;

use std::fmt;

use nac::{Fields, Scalar, ValidTime};

pub use nac::{Convergence, Error, Geometry, GeometryRef, Location, Locations,
              Result, Variables};
pub use crate::geovals::GeoVals;
pub use crate::increment::IncrementVector;
pub use crate::state::StateVector;
pub use crate::trajectory::TrajectoryCache;
pub use crate::transform::{SmoothingConfig, TransformKind, VariableTransform,
                           VariableTransformConfig};
pub use crate::unstructured::UnstructuredGrid;

pub mod geovals;
pub mod increment;
pub mod state;
pub mod trajectory;
pub mod transform;
pub mod unstructured;

/// Anything with field storage and a valid time. Lets an increment take
/// either an increment or a state as the `x` of `y += a x`.
pub trait AsFields<E>
  where E: Scalar,
{
  fn fields(&self) -> &Fields<E>;
  fn valid_time(&self) -> &ValidTime;
}

pub(crate) fn assert_same_time(this: &ValidTime, other: &ValidTime) {
  assert!(this == other, "valid time mismatch: {} vs {}", this, other);
}

/// Human-oriented summary: valid time, mesh size, per-field min/max/rms.
pub(crate) fn print_fields<E>(f: &mut fmt::Formatter, time: &ValidTime,
                              fields: &Fields<E>) -> fmt::Result
  where E: Scalar,
{
  let geom = fields.geometry();
  writeln!(f)?;
  writeln!(f, "  Valid time: {}", time)?;
  write!(f, "  Resolution: nCellsGlobal = {}, nLevels = {}, nFields = {}",
         geom.n_cells(), geom.n_levels(), fields.variables().len())?;
  for (i, (s, name)) in fields.stats().iter().zip(fields.variables().iter()).enumerate() {
    write!(f, "\nFld={}  Min={:.6e}, Max={:.6e}, RMS={:.6e} : {}",
           i + 1, s.min, s.max, s.rms, name)?;
  }
  Ok(())
}
