//! Saturated (pseudo) adiabats as sequences of pressure and temperature.
use crate::{
    closure::find_adiabat_temperature,
    constants::PhysicalConstants,
    error::{ParcelError, Result},
};
use metfor::{HectoPascal, Kelvin, Quantity};

/// Number of points in an adiabat when the caller has no preference.
pub const DEFAULT_ADIABAT_POINTS: usize = 50;

/// Generate the saturated adiabat with equivalent potential temperature `theta_e`.
///
/// There are `n` pressures spaced linearly from `bottom` to `top`, inclusive of both ends, in
/// that order. The pressures may run in either direction. Fails with
/// `ParcelError::InvalidInput` if `n < 2` or either pressure is not a positive, finite value.
///
/// ```rust
/// use metfor::{HectoPascal, Kelvin};
/// use parcel_ascent::{generate_adiabat, PhysicalConstants, DEFAULT_ADIABAT_POINTS};
///
/// let cnst = PhysicalConstants::new();
/// let adiabat = generate_adiabat(
///     &cnst,
///     HectoPascal(1000.0),
///     Kelvin(330.0),
///     HectoPascal(300.0),
///     DEFAULT_ADIABAT_POINTS,
/// )
/// .unwrap();
///
/// assert_eq!(adiabat.len(), DEFAULT_ADIABAT_POINTS);
/// assert_eq!(adiabat[0].0, HectoPascal(1000.0));
/// ```
pub fn generate_adiabat(
    cnst: &PhysicalConstants,
    bottom: HectoPascal,
    theta_e: Kelvin,
    top: HectoPascal,
    n: usize,
) -> Result<Vec<(HectoPascal, Kelvin)>> {
    let valid_pressure = |p: HectoPascal| p.unpack().is_finite() && p.unpack() > 0.0;
    if n < 2 || !valid_pressure(bottom) || !valid_pressure(top) {
        return Err(ParcelError::InvalidInput);
    }

    let (p0, p1) = (bottom.unpack(), top.unpack());
    let dp = (p1 - p0) / (n - 1) as f64;

    (0..n)
        .map(|i| {
            // Hit the top exactly rather than accumulating round off
            let p = if i == n - 1 {
                top
            } else {
                HectoPascal(p0 + dp * i as f64)
            };

            find_adiabat_temperature(cnst, theta_e, p).map(|t| (p, t))
        })
        .collect()
}
