//! Collective reductions across the processes sharing a decomposed mesh.

use std::fmt::Debug;

/// Every call is a synchronisation point: all participants block until the
/// reduced value is available.
pub trait Communicator: Debug + Send + Sync {
  fn size(&self) -> usize;
  fn rank(&self) -> usize;
  fn all_reduce_sum(&self, local: f64) -> f64;
  fn all_reduce_min(&self, local: f64) -> f64;
  fn all_reduce_max(&self, local: f64) -> f64;
}

/// The whole mesh lives in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
  fn size(&self) -> usize { 1 }
  fn rank(&self) -> usize { 0 }
  fn all_reduce_sum(&self, local: f64) -> f64 { local }
  fn all_reduce_min(&self, local: f64) -> f64 { local }
  fn all_reduce_max(&self, local: f64) -> f64 { local }
}
