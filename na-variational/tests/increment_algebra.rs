extern crate approx;
extern crate chrono;
extern crate na_core;
extern crate na_variational;

mod common;

use approx::assert_relative_eq;

use na_core::config::{from_json_str, DiracConfig};
use na_variational::{IncrementVector, StateVector};

use crate::common::*;

#[test]
fn ones_plus_half_twos_is_twos() {
  let g = mesh(10, 1, 1);
  let v = vars(&["temperature"]);
  let mut x = IncrementVector::<f64>::new(g.clone(), v.clone(), time());
  let mut y = IncrementVector::new(g, v, time());
  x.fields_mut().fill(1.0);
  y.fields_mut().fill(2.0);

  x.axpy(0.5, &y, true);
  assert!(x.fields().data().iter().all(|&v| v == 2.0));
  assert_relative_eq!(x.norm(), 2.0);
}

#[test]
fn ones_plus_half_twos_single_precision() {
  let g = mesh(10, 1, 1);
  let v = vars(&["temperature"]);
  let mut x = IncrementVector::<f32>::new(g.clone(), v.clone(), time());
  let mut y = IncrementVector::<f32>::new(g, v, time());
  x.fields_mut().fill(1.0);
  y.fields_mut().fill(2.0);

  x.axpy(0.5, &y, true);
  assert!((x.norm() - 2.0).abs() < 1e-5);
}

#[test]
fn dirac_at_cell_three() {
  let g = mesh(10, 1, 1);
  let mut dx = IncrementVector::<f64>::new(g, vars(&["temperature"]), time());
  dx.randomize();
  let config: DiracConfig = from_json_str(r#"{
    "points": [{ "cell": 3, "variable": "temperature" }]
  }"#).unwrap();
  dx.dirac(&config).unwrap();

  assert_eq!(dx.field("temperature").unwrap()[[0, 3]], 1.0);
  assert_relative_eq!(dx.dot(&dx), 1.0);
  assert_relative_eq!(dx.norm(), 0.1f64.sqrt());
}

#[test]
fn dirac_rejects_unknown_variable() {
  let g = mesh(10, 1, 1);
  let mut dx = IncrementVector::<f64>::new(g, vars(&["temperature"]), time());
  let config: DiracConfig = from_json_str(r#"{
    "points": [{ "cell": 3, "variable": "u" }]
  }"#).unwrap();
  assert!(dx.dirac(&config).is_err());
}

#[test]
fn zero_is_the_identity() {
  let g = mesh(8, 4, 2);
  let v = vars(&["u", "v"]);
  let mut x = random_increment(&g, &v, 1);
  let before = x.clone();
  let z = IncrementVector::copy_of(&x, false);
  assert_eq!(z.norm(), 0.0);

  x += &z;
  assert_eq!(x.fields().data(), before.fields().data());
  x -= &z;
  assert_eq!(x.fields().data(), before.fields().data());
}

#[test]
fn closure_and_scaling() {
  let g = mesh(8, 4, 2);
  let v = vars(&["u", "v"]);
  let x = random_increment(&g, &v, 1);
  let y = random_increment(&g, &v, 2);

  let mut s = x.clone();
  s.add_in_place(&y);
  s.subtract_in_place(&y);
  let mut d = s.clone();
  d.subtract_in_place(&x);
  assert!(d.norm() < 1e-14);

  let mut a = x.clone();
  a *= -3.0;
  assert_relative_eq!(a.norm(), 3.0 * x.norm(), max_relative = 1e-12);
}

#[test]
fn dot_is_symmetric_and_positive() {
  let g = mesh(8, 4, 2);
  let v = vars(&["u"]);
  let x = random_increment(&g, &v, 3);
  let y = random_increment(&g, &v, 4);

  assert_relative_eq!(x.dot(&y), y.dot(&x), max_relative = 1e-14);
  assert!(x.dot(&x) > 0.0);

  let n = x.fields().global_size() as f64;
  assert_relative_eq!(x.norm(), (x.dot(&x) / n).sqrt(), max_relative = 1e-14);
}

#[test]
fn dot_ignores_decomposition() {
  let v = vars(&["u", "v"]);
  let whole = na_core::Geometry::lonlat(9, 5, 3).unwrap().shared();
  let split = na_core::Geometry::lonlat(9, 5, 3).unwrap().with_partitions(4).unwrap().shared();

  let x1 = random_increment(&whole, &v, 5);
  let y1 = random_increment(&whole, &v, 6);
  let x4 = random_increment(&split, &v, 5);
  let y4 = random_increment(&split, &v, 6);

  assert_relative_eq!(x1.dot(&y1), x4.dot(&y4), max_relative = 1e-12);
  assert_relative_eq!(x1.norm(), x4.norm(), max_relative = 1e-12);
}

#[test]
fn randomize_with_seed_is_reproducible() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = IncrementVector::<f64>::new(g.clone(), v.clone(), time());
  let mut b = IncrementVector::<f64>::new(g, v, time());
  a.randomize_with_seed(3);
  b.randomize_with_seed(3);
  assert_eq!(a.fields().data(), b.fields().data());

  b.randomize_with_seed(4);
  assert!(a.fields().data() != b.fields().data());
}

#[test]
fn fresh_increments_randomize_independently() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = IncrementVector::<f64>::new(g.clone(), v.clone(), time());
  let mut b = IncrementVector::<f64>::new(g, v, time());
  a.randomize();
  b.randomize();
  assert!(a.fields().data() != b.fields().data());

  let first = a.clone();
  a.randomize();
  assert!(a.fields().data() != first.fields().data());
}

#[test]
fn clone_continues_source_stream() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = IncrementVector::<f64>::new(g, v, time());
  let mut b = a.clone();
  a.randomize();
  b.randomize();
  assert_eq!(a.fields().data(), b.fields().data());
}

#[test]
fn assign_takes_content_and_time() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = IncrementVector::<f64>::new(g.clone(), v.clone(), time());
  let mut b = random_increment(&g, &v, 9);
  b.set_valid_time(later());

  a.assign(&b);
  assert_eq!(*a.valid_time(), later());
  assert_eq!(a.fields().data(), b.fields().data());
}

#[test]
fn zero_at_moves_time() {
  let g = mesh(6, 3, 1);
  let mut a = random_increment(&g, &vars(&["u"]), 1);
  a.zero_at(later());
  assert_eq!(a.norm(), 0.0);
  assert_eq!(*a.valid_time(), later());
}

#[test]
fn schur_product_is_elementwise() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = random_increment(&g, &v, 1);
  let b = random_increment(&g, &v, 2);
  let expected = &a.fields().data() * &b.fields().data();
  a.schur_product_in_place(&b);
  assert_eq!(a.fields().data(), expected.view());
}

#[test]
fn diff_then_add_recovers_state() {
  let g = mesh(8, 4, 2);
  let names = ["temperature", "pressure", "specific_humidity"];
  let a = atmosphere_state(&g, &names, 0.7);
  let mut b = atmosphere_state(&g, &names, 0.4);

  let mut dx = IncrementVector::new(g, vars(&names), time());
  dx.diff(&a, &b);
  b.add_increment(&dx);

  let mut gap = b.fields().clone();
  gap.sub(a.fields());
  assert!(gap.rms() < 1e-9 * a.norm());
}

#[test]
fn axpy_with_state_and_accumulate() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut x = StateVector::<f64>::new(g.clone(), v.clone(), later());
  x.fields_mut().fill(4.0);

  let mut dx = IncrementVector::new(g, v, time());
  dx.axpy(0.25, &x, false);
  dx.accumulate(0.25, &x);
  assert!(dx.fields().data().iter().all(|&v| v == 2.0));
}

#[test]
#[should_panic(expected = "valid time mismatch")]
fn axpy_checks_time_when_asked() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let x = StateVector::<f64>::new(g.clone(), v.clone(), later());
  let mut dx = IncrementVector::new(g, v, time());
  dx.axpy(1.0, &x, true);
}

#[test]
#[should_panic(expected = "valid time mismatch")]
fn add_rejects_time_mismatch() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = IncrementVector::<f64>::new(g.clone(), v.clone(), time());
  let b = IncrementVector::<f64>::new(g, v, later());
  a.add_in_place(&b);
}

#[test]
#[should_panic(expected = "valid time mismatch")]
fn subtract_rejects_time_mismatch() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut a = IncrementVector::<f64>::new(g.clone(), v.clone(), time());
  let b = IncrementVector::<f64>::new(g, v, later());
  a.subtract_in_place(&b);
}

#[test]
fn axpy_with_state_at_same_time() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let mut x = StateVector::<f64>::new(g.clone(), v.clone(), time());
  x.fields_mut().fill(3.0);

  let mut dx = random_increment(&g, &v, 2);
  let before = dx.clone();
  dx.axpy(-2.0, &x, true);
  for (a, b) in dx.fields().data().iter().zip(before.fields().data().iter()) {
    assert_eq!(*a, *b - 6.0);
  }
  assert_eq!(*dx.valid_time(), time());
}

#[test]
#[should_panic(expected = "valid time mismatch")]
fn diff_rejects_time_mismatch() {
  let g = mesh(6, 3, 1);
  let v = vars(&["u"]);
  let a = StateVector::<f64>::new(g.clone(), v.clone(), time());
  let b = StateVector::<f64>::new(g.clone(), v.clone(), later());
  let mut dx = IncrementVector::new(g, v, time());
  dx.diff(&a, &b);
}

#[test]
#[should_panic(expected = "variable sets differ")]
fn add_rejects_other_variables() {
  let g = mesh(6, 3, 1);
  let mut a = IncrementVector::<f64>::new(g.clone(), vars(&["u"]), time());
  let b = IncrementVector::<f64>::new(g, vars(&["v"]), time());
  a.add_in_place(&b);
}

#[test]
fn print_summary() {
  let g = mesh(10, 1, 1);
  let mut x = IncrementVector::<f64>::new(g, vars(&["temperature"]), time());
  x.fields_mut().fill(2.0);
  let s = format!("{}", x);
  assert!(s.contains("Valid time: 2018-04-15 00:00:00 UTC"));
  assert!(s.contains("nCellsGlobal = 10, nLevels = 1, nFields = 1"));
  assert!(s.contains("Fld=1"));
  assert!(s.ends_with(": temperature"));
}
