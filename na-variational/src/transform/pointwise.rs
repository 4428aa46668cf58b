//! Cell-by-cell part of the variable change.
//!
//! Every variable maps onto the variable of the same name on the other side,
//! except relative humidity (control) and specific humidity (analysis):
//!
//! ```text
//! q  = rh qs(T, p)
//! dq = qs drh + c dT,   c = rh_ref dqs/dT
//! ```
//!
//! with `T`, `p` and `rh_ref` taken from the reference state. Pressure is
//! not a control variable and is never perturbed.

use std::fmt;

use nd::prelude::*;
use nd::Zip;

use nac::thermo::{saturation_specific_humidity, saturation_specific_humidity_dt};
use nac::{Error, Fields, Result, Scalar, Variables};

pub const TEMPERATURE: &str = "temperature";
pub const PRESSURE: &str = "pressure";
pub const RELATIVE_HUMIDITY: &str = "relative_humidity";
pub const SPECIFIC_HUMIDITY: &str = "specific_humidity";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumiditySlots {
  rh: usize,
  q: usize,
  t_control: usize,
  t_analysis: usize,
}

/// Index correspondence between the control and analysis variable sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
  control: Variables,
  analysis: Variables,
  /// `(control, analysis)`
  identity: Vec<(usize, usize)>,
  humidity: Option<HumiditySlots>,
}

impl Pairing {
  pub fn new(control: &Variables, analysis: &Variables) -> Result<Pairing> {
    let mut identity = Vec::with_capacity(control.len());
    let mut humidity = None;
    let mut produced = vec![0usize; analysis.len()];

    for (ci, name) in control.iter().enumerate() {
      if let Some(ai) = analysis.index_of(name) {
        identity.push((ci, ai));
        produced[ai] += 1;
        continue;
      }
      if name != RELATIVE_HUMIDITY {
        return Err(Error::config(format!("control variable `{}` has no analysis counterpart", name)));
      }

      let q = analysis.index_of(SPECIFIC_HUMIDITY)
        .ok_or_else(|| Error::config("`relative_humidity` needs `specific_humidity` among the analysis variables"))?;
      let t_control = control.index_of(TEMPERATURE);
      let t_analysis = analysis.index_of(TEMPERATURE);
      let (t_control, t_analysis) = match (t_control, t_analysis) {
        (Some(c), Some(a)) => (c, a),
        _ => {
          return Err(Error::config("the humidity change needs `temperature` among both control and analysis variables"));
        },
      };
      produced[q] += 1;
      humidity = Some(HumiditySlots { rh: ci, q, t_control, t_analysis, });
    }

    for (ai, &n) in produced.iter().enumerate() {
      if n != 1 {
        let name = &analysis.names()[ai];
        return Err(Error::config(format!("analysis variable `{}` is produced by {} control variables", name, n)));
      }
    }

    Ok(Pairing {
      control: control.clone(),
      analysis: analysis.clone(),
      identity,
      humidity,
    })
  }

  pub fn control(&self) -> &Variables { &self.control }
  pub fn analysis(&self) -> &Variables { &self.analysis }
  pub fn has_humidity(&self) -> bool { self.humidity.is_some() }
}

impl fmt::Display for Pairing {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "control [{}] <-> analysis [{}]", self.control, self.analysis)?;
    if self.humidity.is_some() {
      write!(f, ", {} <-> {}", RELATIVE_HUMIDITY, SPECIFIC_HUMIDITY)?;
    }
    Ok(())
  }
}

/// Reference-state quantities the humidity Jacobian needs, per
/// `(level, cell)`.
#[derive(Debug, Clone)]
pub struct Coefficients {
  pressure: Array2<f64>,
  qs: Array2<f64>,
  /// `rh_ref dqs/dT`
  c: Array2<f64>,
}

impl Coefficients {
  /// The reference needs temperature, pressure and either humidity.
  pub fn from_reference<E>(reference: &Fields<E>) -> Result<Coefficients>
    where E: Scalar,
  {
    let field = |name: &str| {
      reference.field(name)
        .map(|f| f.mapv(|v| v.as_f64()))
        .ok_or_else(|| Error::UnknownVariable(name.to_owned()))
    };
    let t = field(TEMPERATURE)?;
    let pressure = field(PRESSURE)?;

    let mut qs = Array2::zeros(t.dim());
    let mut dqs = Array2::zeros(t.dim());
    Zip::from(&mut qs)
      .and(&mut dqs)
      .and(&t)
      .and(&pressure)
      .for_each(|qs, dqs, &t, &p| {
        *qs = saturation_specific_humidity(t, p);
        *dqs = saturation_specific_humidity_dt(t, p);
      });

    let rh = if reference.variables().contains(RELATIVE_HUMIDITY) {
      field(RELATIVE_HUMIDITY)?
    } else {
      field(SPECIFIC_HUMIDITY)? / &qs
    };

    Ok(Coefficients {
      pressure,
      qs,
      c: rh * &dqs,
    })
  }
}

/// The pointwise variable change, both directions, tangent linear and
/// adjoint. Every method overwrites `out` completely.
#[derive(Debug, Clone)]
pub struct Pointwise {
  pairing: Pairing,
  coeffs: Option<Coefficients>,
}

impl Pointwise {
  pub fn new<E>(pairing: Pairing, reference: &Fields<E>) -> Result<Pointwise>
    where E: Scalar,
  {
    let coeffs = if pairing.has_humidity() {
      Some(Coefficients::from_reference(reference)?)
    } else {
      None
    };
    Ok(Pointwise { pairing, coeffs, })
  }

  pub fn pairing(&self) -> &Pairing { &self.pairing }

  fn humidity(&self) -> Option<(HumiditySlots, &Coefficients)> {
    match (self.pairing.humidity, self.coeffs.as_ref()) {
      (Some(h), Some(c)) => Some((h, c)),
      _ => None,
    }
  }

  fn copy_identity<E>(&self, x: &Fields<E>, out: &mut Fields<E>, to_analysis: bool)
    where E: Scalar,
  {
    for &(c, a) in self.pairing.identity.iter() {
      let (src, dst) = if to_analysis { (c, a) } else { (a, c) };
      out.field_at_mut(dst).assign(&x.field_at(src));
    }
  }

  /// `dq = qs drh + c dT`
  pub fn control_to_analysis<E>(&self, x: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    self.copy_identity(x, out, true);
    if let Some((h, k)) = self.humidity() {
      Zip::from(out.field_at_mut(h.q))
        .and(x.field_at(h.rh))
        .and(x.field_at(h.t_control))
        .and(&k.qs)
        .and(&k.c)
        .for_each(|q, &rh, &t, &qs, &c| {
          *q = E::of_f64(qs * rh.as_f64() + c * t.as_f64());
        });
    }
  }

  /// `drh = (dq - c dT) / qs`
  pub fn analysis_to_control<E>(&self, x: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    self.copy_identity(x, out, false);
    if let Some((h, k)) = self.humidity() {
      Zip::from(out.field_at_mut(h.rh))
        .and(x.field_at(h.q))
        .and(x.field_at(h.t_analysis))
        .and(&k.qs)
        .and(&k.c)
        .for_each(|rh, &q, &t, &qs, &c| {
          *rh = E::of_f64((q.as_f64() - c * t.as_f64()) / qs);
        });
    }
  }

  /// Adjoint of `control_to_analysis`: analysis-space in, control-space
  /// out.
  pub fn control_to_analysis_ad<E>(&self, y: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    self.copy_identity(y, out, false);
    if let Some((h, k)) = self.humidity() {
      Zip::from(out.field_at_mut(h.rh))
        .and(y.field_at(h.q))
        .and(&k.qs)
        .for_each(|rh, &q, &qs| *rh = E::of_f64(qs * q.as_f64()));
      Zip::from(out.field_at_mut(h.t_control))
        .and(y.field_at(h.q))
        .and(&k.c)
        .for_each(|t, &q, &c| *t = *t + E::of_f64(c * q.as_f64()));
    }
  }

  /// Adjoint of `analysis_to_control`: control-space in, analysis-space
  /// out.
  pub fn analysis_to_control_ad<E>(&self, y: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    self.copy_identity(y, out, true);
    if let Some((h, k)) = self.humidity() {
      Zip::from(out.field_at_mut(h.q))
        .and(y.field_at(h.rh))
        .and(&k.qs)
        .for_each(|q, &rh, &qs| *q = E::of_f64(rh.as_f64() / qs));
      Zip::from(out.field_at_mut(h.t_analysis))
        .and(y.field_at(h.rh))
        .and(&k.qs)
        .and(&k.c)
        .for_each(|t, &rh, &qs, &c| *t = *t - E::of_f64(c * rh.as_f64() / qs));
    }
  }

  /// Nonlinear `rh = q / qs(T, p_ref)`.
  pub fn state_to_control<E>(&self, xa: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    self.copy_identity(xa, out, false);
    if let Some((h, k)) = self.humidity() {
      Zip::from(out.field_at_mut(h.rh))
        .and(xa.field_at(h.q))
        .and(xa.field_at(h.t_analysis))
        .and(&k.pressure)
        .for_each(|rh, &q, &t, &p| {
          *rh = E::of_f64(q.as_f64() / saturation_specific_humidity(t.as_f64(), p));
        });
    }
  }

  /// Nonlinear `q = rh qs(T, p_ref)`.
  pub fn state_to_analysis<E>(&self, xc: &Fields<E>, out: &mut Fields<E>)
    where E: Scalar,
  {
    self.copy_identity(xc, out, true);
    if let Some((h, k)) = self.humidity() {
      Zip::from(out.field_at_mut(h.q))
        .and(xc.field_at(h.rh))
        .and(xc.field_at(h.t_control))
        .and(&k.pressure)
        .for_each(|q, &rh, &t, &p| {
          *q = E::of_f64(rh.as_f64() * saturation_specific_humidity(t.as_f64(), p));
        });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn vars(names: &[&str]) -> Variables {
    Variables::new(names.to_vec()).unwrap()
  }

  #[test]
  fn same_names_pair_by_name() {
    let p = Pairing::new(&vars(&["u", "temperature"]), &vars(&["temperature", "u"])).unwrap();
    assert!(!p.has_humidity());
    assert_eq!(p.identity, vec![(0, 1), (1, 0)]);
  }

  #[test]
  fn humidity_pairing() {
    let p = Pairing::new(&vars(&["temperature", "relative_humidity"]),
                         &vars(&["specific_humidity", "temperature"])).unwrap();
    assert_eq!(p.humidity, Some(HumiditySlots { rh: 1, q: 0, t_control: 0, t_analysis: 1 }));
  }

  #[test]
  fn humidity_needs_temperature() {
    let r = Pairing::new(&vars(&["relative_humidity"]), &vars(&["specific_humidity"]));
    assert!(r.is_err());
  }

  #[test]
  fn unmatched_variables_are_rejected() {
    assert!(Pairing::new(&vars(&["u"]), &vars(&["v"])).is_err());
    assert!(Pairing::new(&vars(&["u"]), &vars(&["u", "v"])).is_err());
  }

  #[test]
  fn specific_humidity_produced_twice() {
    let r = Pairing::new(&vars(&["temperature", "relative_humidity", "specific_humidity"]),
                         &vars(&["temperature", "specific_humidity"]));
    assert!(r.is_err());
  }
}
