//! Saturation vapor pressure and mixing ratio over a flat surface of liquid water.
//!
//! These use Bolton's empirical fit and are valid for ordinary tropospheric temperatures. The
//! mixing ratio is clamped to a physically realistic range so the root finders built on top of
//! it never see a runaway value.
use crate::{
    constants::PhysicalConstants,
    error::{ParcelError, Result},
};
use metfor::{HectoPascal, Kelvin, Quantity};

/// Upper limit on any saturation mixing ratio, kg/kg.
pub const MAX_SATURATION_MIXING_RATIO: f64 = 0.060;

// Constants in Bolton's fit. These are part of the empirical formula, so they do not come from
// the constants registry.
const BOLTON_ES0: f64 = 6.112; // hPa
const BOLTON_A: f64 = 17.67;
const BOLTON_B: f64 = 243.5; // C
const BOLTON_T0: f64 = 273.15; // K

/// Saturation vapor pressure at the given temperature.
///
/// ```rust
/// use metfor::{HectoPascal, Kelvin, Quantity};
/// use parcel_ascent::saturation_vapor_pressure;
///
/// let es: HectoPascal = saturation_vapor_pressure(Kelvin(300.0));
/// assert!((es.unpack() - 35.345_196_668_891_36).abs() < 1.0e-10);
/// ```
#[inline]
pub fn saturation_vapor_pressure(temperature: Kelvin) -> HectoPascal {
    let t_c = temperature.unpack() - BOLTON_T0;
    HectoPascal(BOLTON_ES0 * (BOLTON_A * t_c / (t_c + BOLTON_B)).exp())
}

/// Saturation vapor pressure for each temperature in a slice.
pub fn saturation_vapor_pressures(temperatures: &[Kelvin]) -> Vec<HectoPascal> {
    temperatures
        .iter()
        .map(|&t| saturation_vapor_pressure(t))
        .collect()
}

/// Saturation mixing ratio (kg/kg) at a given temperature and pressure.
///
/// The result is clamped to `[0, MAX_SATURATION_MIXING_RATIO]`.
#[inline]
pub fn saturation_mixing_ratio(
    cnst: &PhysicalConstants,
    temperature: Kelvin,
    pressure: HectoPascal,
) -> f64 {
    let es = saturation_vapor_pressure(temperature).unpack();
    let ws = cnst.eps() * es / (pressure.unpack() - es);

    if ws > MAX_SATURATION_MIXING_RATIO {
        MAX_SATURATION_MIXING_RATIO
    } else if ws < 0.0 {
        0.0
    } else {
        ws
    }
}

/// Saturation mixing ratios over a sequence of temperatures or a sequence of pressures.
///
/// A slice with a single element is used with every element of the other slice. If both slices
/// have more than one element the result is `ParcelError::Shape`. An empty slice produces an
/// empty result.
pub fn saturation_mixing_ratios(
    cnst: &PhysicalConstants,
    temperatures: &[Kelvin],
    pressures: &[HectoPascal],
) -> Result<Vec<f64>> {
    match (temperatures, pressures) {
        ([], _) | (_, []) => Ok(vec![]),
        ([t], ps) => Ok(ps
            .iter()
            .map(|&p| saturation_mixing_ratio(cnst, *t, p))
            .collect()),
        (ts, [p]) => Ok(ts
            .iter()
            .map(|&t| saturation_mixing_ratio(cnst, t, *p))
            .collect()),
        _ => Err(ParcelError::Shape),
    }
}

/// Dew point of air with the given vapor mixing ratio (kg/kg) at a pressure.
///
/// This is the exact inverse of Bolton's saturation vapor pressure fit. A mixing ratio that is
/// not positive has no dew point and is a `ParcelError::Domain` error.
pub fn dew_point_from_mixing_ratio(
    cnst: &PhysicalConstants,
    mixing_ratio: f64,
    pressure: HectoPascal,
) -> Result<Kelvin> {
    if !(mixing_ratio > 0.0) || !mixing_ratio.is_finite() {
        return Err(ParcelError::Domain);
    }

    let e = mixing_ratio * pressure.unpack() / (cnst.eps() + mixing_ratio);
    let denom = BOLTON_A / (e / BOLTON_ES0).ln() - 1.0;

    Ok(Kelvin(BOLTON_B / denom + BOLTON_T0))
}
