//! Control <-> analysis variable transform.
//!
//! One handle, two kinds, differing in which direction is forward:
//!
//! | kind                    | forward            | linearised about   |
//! |-------------------------|--------------------|--------------------|
//! | `LinearizedWithAdjoint` | control -> analysis | background         |
//! | `NonlinearExact`        | analysis -> control | analysis reference |
//!
//! With smoothing `S = I + k L` configured, `multiply = S P`,
//! `multiply_ad = P^T S`, `multiply_inverse = P^-1 S^-1` and
//! `multiply_inverse_ad = S^-1 P^-T`, `P` being the pointwise change.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, Span};

use nac::{Convergence, Error, Fields, Geometry, GeometryRef, Operator, Result, Scalar,
          SolverSettings, Variables};

use crate::increment::IncrementVector;
use crate::state::StateVector;

pub use self::pointwise::{Pairing, Pointwise};
pub use self::smoothing::Smoother;

pub mod pointwise;
pub mod smoothing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
  NonlinearExact,
  LinearizedWithAdjoint,
}
impl fmt::Display for TransformKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      TransformKind::NonlinearExact => write!(f, "nonlinear exact"),
      TransformKind::LinearizedWithAdjoint => write!(f, "linearized with adjoint"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
  pub coefficient: f64,
  #[serde(flatten)]
  pub solver: SolverSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableTransformConfig {
  pub kind: TransformKind,
  pub control_variables: Variables,
  pub analysis_variables: Variables,
  #[serde(default)]
  pub smoothing: Option<SmoothingConfig>,
}

#[derive(Debug)]
struct Descriptor {
  kind: TransformKind,
  geom: GeometryRef,
  pointwise: Pointwise,
  smoother: Option<Smoother>,
}

#[derive(Debug)]
enum Stage {
  Built(Box<Descriptor>),
  Disposed,
}

/// Immutable once built; the four applications take `&self` and may run
/// concurrently on distinct vectors.
#[derive(Debug)]
pub struct VariableTransform {
  stage: Stage,
  span: Span,
}

impl VariableTransform {
  /// Build for one outer iteration. Reference quantities are regridded onto
  /// `geom` when the states live elsewhere.
  pub fn new<E>(background: &StateVector<E>, analysis_reference: &StateVector<E>,
                geom: GeometryRef, config: &VariableTransformConfig)
    -> Result<VariableTransform>
    where E: Scalar,
  {
    let span = Span::current();
    let pairing = Pairing::new(&config.control_variables, &config.analysis_variables)?;

    let smoother = match config.smoothing {
      Some(ref s) => {
        if !(s.coefficient >= 0.0) || !s.coefficient.is_finite() {
          return Err(Error::config(format!("smoothing coefficient must be finite and non-negative, got {}",
                                           s.coefficient)));
        }
        Some(Smoother::new(s.coefficient, s.solver))
      },
      None => None,
    };

    let reference = match config.kind {
      TransformKind::LinearizedWithAdjoint => background,
      TransformKind::NonlinearExact => analysis_reference,
    };
    let pointwise = if Geometry::same(reference.geometry(), &geom) {
      Pointwise::new(pairing, reference.fields())?
    } else {
      let regridded = StateVector::from_resolution(geom.clone(), reference);
      Pointwise::new(pairing, regridded.fields())?
    };

    debug!(parent: &span, kind = %config.kind, background = %background.valid_time(),
           analysis_reference = %analysis_reference.valid_time(),
           pairing = %pointwise.pairing(), "variable transform built");

    Ok(VariableTransform {
      stage: Stage::Built(Box::new(Descriptor {
        kind: config.kind,
        geom,
        pointwise,
        smoother,
      })),
      span,
    })
  }

  pub fn with_span(mut self, span: Span) -> VariableTransform {
    self.span = span;
    self
  }

  fn descriptor(&self) -> &Descriptor {
    match self.stage {
      Stage::Built(ref d) => d,
      Stage::Disposed => panic!("variable transform used after dispose"),
    }
  }

  pub fn kind(&self) -> TransformKind { self.descriptor().kind }
  pub fn is_disposed(&self) -> bool {
    match self.stage {
      Stage::Disposed => true,
      Stage::Built(_) => false,
    }
  }

  /// Variables of the vectors `multiply` takes and `multiply_inverse`
  /// produces.
  pub fn input_variables(&self) -> &Variables {
    let d = self.descriptor();
    match d.kind {
      TransformKind::LinearizedWithAdjoint => d.pointwise.pairing().control(),
      TransformKind::NonlinearExact => d.pointwise.pairing().analysis(),
    }
  }
  /// Variables of the vectors `multiply` produces.
  pub fn output_variables(&self) -> &Variables {
    let d = self.descriptor();
    match d.kind {
      TransformKind::LinearizedWithAdjoint => d.pointwise.pairing().analysis(),
      TransformKind::NonlinearExact => d.pointwise.pairing().control(),
    }
  }

  /// Release the descriptor. Any later application panics.
  pub fn dispose(&mut self) {
    if !self.is_disposed() {
      trace!(parent: &self.span, "variable transform disposed");
    }
    self.stage = Stage::Disposed;
  }

  fn check<E>(&self, d: &Descriptor, dx: &IncrementVector<E>, dx_vars: &Variables,
              out: &mut IncrementVector<E>, out_vars: &Variables)
    where E: Scalar,
  {
    assert!(dx.variables() == dx_vars,
            "transform input has variables [{}], expected [{}]", dx.variables(), dx_vars);
    assert!(out.variables() == out_vars,
            "transform output has variables [{}], expected [{}]", out.variables(), out_vars);
    assert!(Geometry::same(dx.geometry(), &d.geom) && Geometry::same(out.geometry(), &d.geom),
            "transform applied on a geometry it was not built for");
    out.set_valid_time(*dx.valid_time());
  }

  /// Forward pointwise change.
  fn forward<E>(d: &Descriptor, x: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    match d.kind {
      TransformKind::LinearizedWithAdjoint => d.pointwise.control_to_analysis(x, out),
      TransformKind::NonlinearExact => d.pointwise.analysis_to_control(x, out),
    }
  }
  fn forward_ad<E>(d: &Descriptor, y: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    match d.kind {
      TransformKind::LinearizedWithAdjoint => d.pointwise.control_to_analysis_ad(y, out),
      TransformKind::NonlinearExact => d.pointwise.analysis_to_control_ad(y, out),
    }
  }
  fn inverse<E>(d: &Descriptor, y: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    match d.kind {
      TransformKind::LinearizedWithAdjoint => d.pointwise.analysis_to_control(y, out),
      TransformKind::NonlinearExact => d.pointwise.control_to_analysis(y, out),
    }
  }
  fn inverse_ad<E>(d: &Descriptor, x: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    match d.kind {
      TransformKind::LinearizedWithAdjoint => d.pointwise.analysis_to_control_ad(x, out),
      TransformKind::NonlinearExact => d.pointwise.control_to_analysis_ad(x, out),
    }
  }

  /// `out = S P dx`
  pub fn multiply<E>(&self, dx: &IncrementVector<E>, out: &mut IncrementVector<E>)
    where E: Scalar,
  {
    let d = self.descriptor();
    self.check(d, dx, self.input_variables(), out, self.output_variables());
    trace!(parent: &self.span, "variable transform multiply");

    match d.smoother {
      None => Self::forward(d, dx.fields(), out.fields_mut()),
      Some(ref s) => {
        let mut px = out.fields().clone();
        Self::forward(d, dx.fields(), &mut px);
        s.apply(&px, out.fields_mut());
      },
    }
  }

  /// `out = P^-1 S^-1 dy`
  pub fn multiply_inverse<E>(&self, dy: &IncrementVector<E>,
                             out: &mut IncrementVector<E>) -> Convergence
    where E: Scalar,
  {
    let d = self.descriptor();
    self.check(d, dy, self.output_variables(), out, self.input_variables());
    trace!(parent: &self.span, "variable transform multiply inverse");

    match d.smoother {
      None => {
        Self::inverse(d, dy.fields(), out.fields_mut());
        Convergence::exact()
      },
      Some(ref s) => {
        let mut sy = dy.fields().clone();
        let conv = s.solve(dy.fields(), &mut sy);
        Self::inverse(d, &sy, out.fields_mut());
        self.report(&conv);
        conv
      },
    }
  }

  /// `out = P^T S dy`
  pub fn multiply_ad<E>(&self, dy: &IncrementVector<E>, out: &mut IncrementVector<E>)
    where E: Scalar,
  {
    let d = self.descriptor();
    self.check(d, dy, self.output_variables(), out, self.input_variables());
    trace!(parent: &self.span, "variable transform multiply ad");

    match d.smoother {
      None => Self::forward_ad(d, dy.fields(), out.fields_mut()),
      Some(ref s) => {
        let mut sy = dy.fields().clone();
        s.apply(dy.fields(), &mut sy);
        Self::forward_ad(d, &sy, out.fields_mut());
      },
    }
  }

  /// `out = S^-1 P^-T dx`
  pub fn multiply_inverse_ad<E>(&self, dx: &IncrementVector<E>,
                                out: &mut IncrementVector<E>) -> Convergence
    where E: Scalar,
  {
    let d = self.descriptor();
    self.check(d, dx, self.input_variables(), out, self.output_variables());
    trace!(parent: &self.span, "variable transform multiply inverse ad");

    match d.smoother {
      None => {
        Self::inverse_ad(d, dx.fields(), out.fields_mut());
        Convergence::exact()
      },
      Some(ref s) => {
        let mut px = out.fields().clone();
        Self::inverse_ad(d, dx.fields(), &mut px);
        let conv = s.solve(&px, out.fields_mut());
        self.report(&conv);
        conv
      },
    }
  }

  fn report(&self, conv: &Convergence) {
    if conv.converged {
      trace!(parent: &self.span, iterations = conv.iterations, residual = conv.residual,
             "smoothing inverse converged");
    } else {
      debug!(parent: &self.span, iterations = conv.iterations, residual = conv.residual,
             "smoothing inverse did not converge");
    }
  }

  /// Nonlinear analysis -> control change of a full state. `xc` takes the
  /// valid time of `xa`.
  pub fn change_state<E>(&self, xa: &StateVector<E>, xc: &mut StateVector<E>)
    where E: Scalar,
  {
    let d = self.descriptor();
    let pairing = d.pointwise.pairing();
    assert!(xa.variables() == pairing.analysis() && xc.variables() == pairing.control(),
            "state variables do not match the transform pairing {}", pairing);
    assert!(Geometry::same(xa.geometry(), &d.geom) && Geometry::same(xc.geometry(), &d.geom),
            "transform applied on a geometry it was not built for");
    d.pointwise.state_to_control(xa.fields(), xc.fields_mut());
    xc.set_valid_time(*xa.valid_time());
  }

  /// Nonlinear control -> analysis change, inverse of `change_state`.
  pub fn change_state_inverse<E>(&self, xc: &StateVector<E>, xa: &mut StateVector<E>)
    where E: Scalar,
  {
    let d = self.descriptor();
    let pairing = d.pointwise.pairing();
    assert!(xc.variables() == pairing.control() && xa.variables() == pairing.analysis(),
            "state variables do not match the transform pairing {}", pairing);
    assert!(Geometry::same(xa.geometry(), &d.geom) && Geometry::same(xc.geometry(), &d.geom),
            "transform applied on a geometry it was not built for");
    d.pointwise.state_to_analysis(xc.fields(), xa.fields_mut());
    xa.set_valid_time(*xc.valid_time());
  }
}

impl fmt::Display for VariableTransform {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let d = match self.stage {
      Stage::Built(ref d) => d,
      Stage::Disposed => return write!(f, "VariableTransform (disposed)"),
    };
    write!(f, "VariableTransform ({}): {}", d.kind, d.pointwise.pairing())?;
    match d.smoother {
      Some(ref s) => write!(f, ", smoothing k = {}, max iterations = {}, tolerance = {:e}",
                            s.coefficient(), s.solver().max_iterations, s.solver().tolerance),
      None => write!(f, ", no smoothing"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_from_json() {
    let c: VariableTransformConfig = nac::config::from_json_str(r#"{
      "kind": "linearized_with_adjoint",
      "control_variables": ["temperature", "relative_humidity"],
      "analysis_variables": ["temperature", "specific_humidity"],
      "smoothing": { "coefficient": 0.25, "max_iterations": 50 }
    }"#).unwrap();
    assert_eq!(c.kind, TransformKind::LinearizedWithAdjoint);
    let s = c.smoothing.unwrap();
    assert_eq!(s.coefficient, 0.25);
    assert_eq!(s.solver.max_iterations, 50);
    assert_eq!(s.solver.tolerance, SolverSettings::default().tolerance);
  }

  #[test]
  fn smoothing_is_optional() {
    let c: VariableTransformConfig = nac::config::from_json_str(r#"{
      "kind": "nonlinear_exact",
      "control_variables": ["u"],
      "analysis_variables": ["u"]
    }"#).unwrap();
    assert!(c.smoothing.is_none());
  }
}
