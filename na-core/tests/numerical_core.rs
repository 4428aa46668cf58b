extern crate approx;
extern crate na_core;
extern crate ndarray as nd;

use approx::assert_relative_eq;
use nd::prelude::*;

use na_core::fields::fill_standard_normal;
use na_core::{conjugate_gradient, Fields, Geometry, InterpWeights, Operator, SolverSettings,
              Variables};

/// `I + L`
struct Shifted;
impl Operator<f64> for Shifted {
  fn apply(&self, x: &Fields<f64>, out: &mut Fields<f64>) {
    x.laplacian_into(out);
    out.add(x);
  }
}

#[test]
fn cg_solves_shifted_laplacian_on_any_decomposition() {
  let vars = Variables::new(vec!["u"]).unwrap();
  let mut solutions = Vec::new();
  for &parts in [1usize, 3, 7].iter() {
    let g = Geometry::lonlat(10, 6, 2).unwrap().with_partitions(parts).unwrap().shared();
    let mut b: Fields<f64> = Fields::new(g.clone(), vars.clone());
    b.random(21);
    let mut x = b.clone();
    let conv = conjugate_gradient(&Shifted, &b, &mut x, &SolverSettings::default());
    assert!(conv.converged, "{:?}", conv);

    let mut ax = b.clone();
    Shifted.apply(&x, &mut ax);
    ax.sub(&b);
    assert!(ax.rms() < 1e-10 * b.rms());
    solutions.push(x);
  }

  for s in solutions[1..].iter() {
    for (a, b) in s.data().iter().zip(solutions[0].data().iter()) {
      assert_relative_eq!(*a, *b, epsilon = 1e-10, max_relative = 1e-8);
    }
  }
}

#[test]
fn cg_reports_non_convergence() {
  let g = Geometry::lonlat(10, 6, 2).unwrap().shared();
  let mut b: Fields<f64> = Fields::new(g, Variables::new(vec!["u"]).unwrap());
  b.random(1);
  let mut x = b.clone();
  let settings = SolverSettings { max_iterations: 2, tolerance: 1e-14 };
  let conv = conjugate_gradient(&Shifted, &b, &mut x, &settings);
  assert!(!conv.converged);
  assert_eq!(conv.iterations, 2);
  assert!(conv.residual > 1e-14);
}

#[test]
fn regridding_adjoint_test() {
  let coarse = Geometry::lonlat(8, 4, 1).unwrap();
  let fine = Geometry::lonlat(15, 9, 1).unwrap();
  let w = InterpWeights::horizontal(&coarse, fine.coords());

  let mut x = Array1::<f64>::zeros(coarse.n_cells());
  let mut y = Array1::<f64>::zeros(fine.n_cells());
  fill_standard_normal(x.view_mut(), 3);
  fill_standard_normal(y.view_mut(), 4);

  let mut wx = Array1::<f64>::zeros(fine.n_cells());
  let mut wty = Array1::<f64>::zeros(coarse.n_cells());
  w.apply(x.view(), wx.view_mut());
  w.apply_transpose(y.view(), wty.view_mut());

  let (a, b) = (wx.dot(&y), x.dot(&wty));
  assert!((a - b).abs() / b.abs().max(1.0) < 1e-12);
}

#[test]
fn laplacian_is_symmetric() {
  let g = Geometry::new(Geometry::lonlat(7, 5, 1).unwrap().coords().to_vec(), 2)
    .unwrap()
    .shared();
  let vars = Variables::new(vec!["u"]).unwrap();
  let mut x: Fields<f64> = Fields::new(g.clone(), vars.clone());
  let mut y: Fields<f64> = Fields::new(g, vars);
  x.random(5);
  y.random(6);
  let mut lx = x.clone();
  let mut ly = y.clone();
  x.laplacian_into(&mut lx);
  y.laplacian_into(&mut ly);
  assert_relative_eq!(lx.dot(&y), x.dot(&ly), max_relative = 1e-12);
  assert!(lx.dot(&x) >= 0.0);
}
