//! `S = I + k L`, `L` the mesh graph Laplacian. Symmetric positive definite
//! for `k >= 0`, so `S^-1` is a conjugate-gradient solve.

use nac::{conjugate_gradient, Convergence, Fields, Operator, Scalar, SolverSettings};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
  coefficient: f64,
  solver: SolverSettings,
}

impl Smoother {
  pub fn new(coefficient: f64, solver: SolverSettings) -> Smoother {
    debug_assert!(coefficient >= 0.0);
    Smoother { coefficient, solver, }
  }

  pub fn coefficient(&self) -> f64 { self.coefficient }
  pub fn solver(&self) -> &SolverSettings { &self.solver }

  /// `out = S^-1 x`
  pub fn solve<E>(&self, x: &Fields<E>, out: &mut Fields<E>) -> Convergence
    where E: Scalar,
  {
    if self.coefficient == 0.0 {
      out.copy_from(x);
      return Convergence::exact();
    }
    conjugate_gradient(self, x, out, &self.solver)
  }
}

impl<E> Operator<E> for Smoother
  where E: Scalar,
{
  fn apply(&self, x: &Fields<E>, out: &mut Fields<E>) {
    x.laplacian_into(out);
    out.scale(E::of_f64(self.coefficient));
    out.add(x);
  }
}
