//! Numerical core shared by the variational layer: meshes, variable sets,
//! owned field storage and the kernels that act on it.

extern crate chrono;
extern crate ndarray as nd;
extern crate num_traits;
extern crate rand;
extern crate rand_distr;
extern crate rayon;
extern crate serde;
extern crate serde_json;
extern crate thiserror;
extern crate tracing;

use std::fmt::{Debug, Display};

use nd::{LinalgScalar, ScalarOperand};
use num_traits::{Float, FromPrimitive};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use crate::comm::{Communicator, SerialComm};
pub use crate::error::{Error, Result};
pub use crate::fields::{FieldStats, Fields};
pub use crate::geometry::{Coord, Geometry, GeometryRef};
pub use crate::interp::{InterpWeights, SamplingWeights};
pub use crate::locations::{Location, Locations};
pub use crate::solver::{conjugate_gradient, Convergence, SolverSettings};
pub use crate::variables::Variables;

pub mod analytic;
pub mod comm;
pub mod config;
pub mod error;
pub mod fields;
pub mod geometry;
pub mod interp;
pub mod io;
pub mod locations;
pub mod solver;
pub mod thermo;
pub mod variables;

/// Valid time of a state, an increment or an observation.
pub type ValidTime = chrono::DateTime<chrono::Utc>;

/// Element type of field storage. Reductions are always carried out in
/// `f64` whatever the storage precision.
pub trait Scalar: Float + LinalgScalar + ScalarOperand + FromPrimitive
  + Send + Sync + Debug + Display + Serialize + DeserializeOwned
{
  /// Loss-free for `f32`/`f64`; NaN for anything that doesn't fit.
  fn as_f64(self) -> f64 {
    self.to_f64().unwrap_or(::std::f64::NAN)
  }
  fn of_f64(v: f64) -> Self {
    Self::from_f64(v).unwrap_or_else(Self::nan)
  }
}
impl<T> Scalar for T
  where T: Float + LinalgScalar + ScalarOperand + FromPrimitive,
        T: Send + Sync + Debug + Display + Serialize + DeserializeOwned,
{ }

/// A linear map acting on field storage. `out` is overwritten, never
/// accumulated into.
pub trait Operator<E>: Send + Sync
  where E: Scalar,
{
  fn apply(&self, x: &Fields<E>, out: &mut Fields<E>);
}
