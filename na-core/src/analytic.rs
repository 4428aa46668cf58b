//! Analytic initial conditions.

use crate::config::AnalyticInit;
use crate::fields::Fields;
use crate::thermo::saturation_specific_humidity;
use crate::Scalar;

/// Equator-to-pole temperature contrast of the idealised atmosphere, K.
const MERIDIONAL_CONTRAST: f64 = 40.0;

pub fn analytic_init<E>(fields: &mut Fields<E>, init: &AnalyticInit)
  where E: Scalar,
{
  let geom = fields.geometry().clone();
  let names: Vec<String> = fields.variables().names().to_vec();

  match init {
    &AnalyticInit::Constant { value } => {
      fields.fill(E::of_f64(value));
    },
    &AnalyticInit::ZonalWave { amplitude, wavenumber, offset } => {
      for v in 0..names.len() {
        let mut f = fields.field_at_mut(v);
        for (cell, c) in geom.coords().iter().enumerate() {
          let value = offset
            + amplitude * (wavenumber * c.lon.to_radians()).cos() * c.lat.to_radians().cos();
          f.column_mut(cell).fill(E::of_f64(value));
        }
      }
    },
    &AnalyticInit::Atmosphere { surface_temperature, lapse_rate, surface_pressure,
                                pressure_decay, relative_humidity } => {
      let column = |cell: usize, level: usize| {
        let lat = geom.coords()[cell].lat.to_radians();
        let t = surface_temperature - lapse_rate * level as f64
          - MERIDIONAL_CONTRAST * lat.sin() * lat.sin();
        let p = surface_pressure * (-pressure_decay * level as f64).exp();
        (t, p)
      };

      for (v, name) in names.iter().enumerate() {
        let mut f = fields.field_at_mut(v);
        for ((level, cell), out) in f.indexed_iter_mut() {
          let (t, p) = column(cell, level);
          let value = match name.as_str() {
            "temperature" => t,
            "pressure" => p,
            "relative_humidity" => relative_humidity,
            "specific_humidity" => relative_humidity * saturation_specific_humidity(t, p),
            _ => 0.0,
          };
          *out = E::of_f64(value);
        }
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Geometry;
  use crate::variables::Variables;

  #[test]
  fn atmosphere_is_consistent() {
    let g = Geometry::lonlat(6, 4, 3).unwrap().shared();
    let vars = Variables::new(vec!["temperature", "pressure", "specific_humidity", "u"]).unwrap();
    let mut f: Fields<f64> = Fields::new(g, vars);
    analytic_init(&mut f, &AnalyticInit::Atmosphere {
      surface_temperature: 300.0,
      lapse_rate: 6.5,
      surface_pressure: 100_000.0,
      pressure_decay: 0.1,
      relative_humidity: 0.5,
    });

    let t = f.field("temperature").unwrap()[[1, 7]];
    let p = f.field("pressure").unwrap()[[1, 7]];
    let q = f.field("specific_humidity").unwrap()[[1, 7]];
    assert!((q - 0.5 * saturation_specific_humidity(t, p)).abs() < 1e-15);
    assert!(t < 300.0 - 6.5 + 1e-12);
    assert_eq!(f.field("u").unwrap().sum(), 0.0);
  }

  #[test]
  fn zonal_wave_is_level_independent() {
    let g = Geometry::lonlat(8, 3, 2).unwrap().shared();
    let mut f: Fields<f64> = Fields::new(g, Variables::new(vec!["h"]).unwrap());
    analytic_init(&mut f, &AnalyticInit::ZonalWave { amplitude: 1.0, wavenumber: 2.0, offset: 5.0 });
    let h = f.field("h").unwrap();
    assert_eq!(h.row(0), h.row(1));
  }
}
