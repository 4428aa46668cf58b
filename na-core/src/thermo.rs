//! Moist thermodynamics used by the humidity variable change and the
//! analytic initialisers. Temperatures in K, pressures in Pa.

/// Ratio of the gas constants of dry air and water vapour.
pub const EPSILON: f64 = 0.622;
const ES0: f64 = 611.2;
const A: f64 = 17.67;
/// `273.15 - 243.5`.
const T_OFFSET: f64 = 29.65;

/// Saturation vapour pressure over water (Bolton 1980).
pub fn saturation_vapour_pressure(t: f64) -> f64 {
  ES0 * (A * (t - 273.15) / (t - T_OFFSET)).exp()
}

/// Saturation specific humidity, kg/kg.
pub fn saturation_specific_humidity(t: f64, p: f64) -> f64 {
  let es = saturation_vapour_pressure(t);
  EPSILON * es / (p - (1.0 - EPSILON) * es)
}

/// `d qs / d T` at fixed pressure.
pub fn saturation_specific_humidity_dt(t: f64, p: f64) -> f64 {
  let es = saturation_vapour_pressure(t);
  let des_dt = es * A * 243.5 / ((t - T_OFFSET) * (t - T_OFFSET));
  let denom = p - (1.0 - EPSILON) * es;
  EPSILON * p * des_dt / (denom * denom)
}
