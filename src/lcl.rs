//! Closed form lifting condensation level.
use crate::{
    constants::PhysicalConstants,
    error::{ParcelError, Result},
    saturation::saturation_vapor_pressure,
};
use metfor::{HectoPascal, Kelvin, Quantity};

/// Find the temperature and pressure at the lifting condensation level of an unsaturated parcel.
///
/// The temperature is Bolton's (1980) empirical fit, the pressure follows from a Poisson type
/// relation where the effective specific heat and gas constant include the parcel's vapor.
///
/// Fails with `ParcelError::SaturatedInput` if `dew_point >= temperature`.
///
/// ```rust
/// use metfor::{HectoPascal, Kelvin, Quantity};
/// use parcel_ascent::{find_lcl, ParcelError, PhysicalConstants};
///
/// let cnst = PhysicalConstants::new();
/// let (t_lcl, p_lcl) = find_lcl(&cnst, Kelvin(280.0), Kelvin(300.0), HectoPascal(800.0)).unwrap();
/// assert!((t_lcl.unpack() - 275.7625).abs() < 1.0e-3);
/// assert!((p_lcl.unpack() - 595.1893).abs() < 1.0e-3);
///
/// assert_eq!(
///     find_lcl(&cnst, Kelvin(300.0), Kelvin(280.0), HectoPascal(800.0)),
///     Err(ParcelError::SaturatedInput)
/// );
/// ```
pub fn find_lcl(
    cnst: &PhysicalConstants,
    dew_point: Kelvin,
    temperature: Kelvin,
    pressure: HectoPascal,
) -> Result<(Kelvin, HectoPascal)> {
    if !dew_point.unpack().is_finite()
        || !temperature.unpack().is_finite()
        || !pressure.unpack().is_finite()
    {
        return Err(ParcelError::InvalidInput);
    }

    if dew_point >= temperature {
        return Err(ParcelError::SaturatedInput);
    }

    let e = saturation_vapor_pressure(dew_point).unpack();
    let t = temperature.unpack();
    let p = pressure.unpack();

    let t_lcl = 2840.0 / (3.5 * t.ln() - e.ln() - 4.805) + 55.0;

    let r = cnst.eps() * e / (p - e);
    let cp = cnst.cpd() + r * cnst.cpv();
    let ln_p_lcl = p.ln() + cp / (cnst.rd() * (1.0 + r / cnst.eps())) * (t_lcl / t).ln();

    Ok((Kelvin(t_lcl), HectoPascal(ln_p_lcl.exp())))
}
