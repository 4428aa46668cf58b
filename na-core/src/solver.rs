//! Conjugate gradients for symmetric positive-definite operators on field
//! storage.
//!
//! ```text
//! x = 0, r = b, p = r
//! loop:
//!   alpha = (r.r) / (p.Ap)
//!   x += alpha p,  r -= alpha Ap
//!   stop when |r| <= tol |b|
//!   p = r + ((r.r)_new / (r.r)) p
//! ```
//!
//! All inner products are global reductions, so every participant of the
//! decomposition takes the same number of iterations.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::fields::Fields;
use crate::{Operator, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
  pub max_iterations: usize,
  /// Relative residual `|b - Ax| / |b|` at which to stop.
  pub tolerance: f64,
}
impl Default for SolverSettings {
  fn default() -> Self {
    SolverSettings {
      max_iterations: 200,
      tolerance: 1.0e-12,
    }
  }
}

/// Outcome of an inverse application. Exact inverses report
/// `Convergence::exact()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Convergence {
  pub converged: bool,
  pub iterations: usize,
  /// Final relative residual.
  pub residual: f64,
}
impl Convergence {
  pub fn exact() -> Convergence {
    Convergence {
      converged: true,
      iterations: 0,
      residual: 0.0,
    }
  }
}

/// Solve `A x = b`, overwriting `x` (its incoming content is ignored).
pub fn conjugate_gradient<E, Op>(op: &Op, b: &Fields<E>, x: &mut Fields<E>,
                                 settings: &SolverSettings) -> Convergence
  where E: Scalar,
        Op: Operator<E> + ?Sized,
{
  x.assert_conformant(b);
  x.zero();

  let b_norm = b.dot(b).sqrt();
  if b_norm == 0.0 {
    return Convergence::exact();
  }

  let mut r = b.clone();
  let mut p = b.clone();
  let mut ap = b.clone();
  let mut rr = b_norm * b_norm;
  let mut residual = 1.0;

  for it in 0..settings.max_iterations {
    op.apply(&p, &mut ap);
    let pap = p.dot(&ap);
    if !(pap > 0.0) {
      warn!(iteration = it, pap, "operator is not positive definite along search direction");
      return Convergence {
        converged: false,
        iterations: it,
        residual,
      };
    }

    let alpha = rr / pap;
    x.axpy(E::of_f64(alpha), &p);
    r.axpy(E::of_f64(-alpha), &ap);

    let rr_new = r.dot(&r);
    residual = rr_new.sqrt() / b_norm;
    trace!(iteration = it, residual, "cg step");
    if residual <= settings.tolerance {
      debug!(iterations = it + 1, residual, "cg converged");
      return Convergence {
        converged: true,
        iterations: it + 1,
        residual,
      };
    }

    let beta = rr_new / rr;
    p.scale(E::of_f64(beta));
    p.add(&r);
    rr = rr_new;
  }

  warn!(iterations = settings.max_iterations, residual,
        tolerance = settings.tolerance, "cg did not converge");
  Convergence {
    converged: false,
    iterations: settings.max_iterations,
    residual,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Geometry;
  use crate::variables::Variables;

  /// `I + k L`
  struct Shifted(f64);
  impl Operator<f64> for Shifted {
    fn apply(&self, x: &Fields<f64>, out: &mut Fields<f64>) {
      x.laplacian_into(out);
      out.scale(self.0);
      out.add(x);
    }
  }

  fn setup() -> (Fields<f64>, Fields<f64>) {
    let g = Geometry::lonlat(8, 6, 2).unwrap().shared();
    let v = Variables::new(vec!["temperature"]).unwrap();
    let mut b = Fields::new(g.clone(), v.clone());
    b.random(11);
    (b, Fields::new(g, v))
  }

  #[test]
  fn solves_shifted_laplacian() {
    let (b, mut x) = setup();
    let op = Shifted(0.3);
    let c = conjugate_gradient(&op, &b, &mut x, &SolverSettings::default());
    assert!(c.converged, "{:?}", c);

    let mut ax = x.clone();
    op.apply(&x, &mut ax);
    ax.sub(&b);
    assert!(ax.rms() < 1e-10);
  }

  #[test]
  fn reports_non_convergence() {
    let (b, mut x) = setup();
    let settings = SolverSettings { max_iterations: 1, tolerance: 1e-14 };
    let c = conjugate_gradient(&Shifted(5.0), &b, &mut x, &settings);
    assert!(!c.converged);
    assert_eq!(c.iterations, 1);
    assert!(c.residual > 1e-14);
  }

  #[test]
  fn zero_rhs_is_trivial() {
    let (mut b, mut x) = setup();
    b.zero();
    x.fill(3.0);
    let c = conjugate_gradient(&Shifted(1.0), &b, &mut x, &SolverSettings::default());
    assert_eq!(c, Convergence::exact());
    assert_eq!(x.rms(), 0.0);
  }
}
