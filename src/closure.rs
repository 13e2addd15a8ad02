//! Moist thermodynamic closure: equivalent potential temperature and its inverses.
//!
//! The forward direction maps a temperature, dew point and pressure to the pseudo equivalent
//! potential temperature. The inverses recover a temperature (and for a parcel carrying liquid
//! water, the vapor/liquid split) from an equivalent potential temperature with the shared
//! [`RootSolver`](crate::RootSolver).
use crate::{
    constants::PhysicalConstants,
    error::{ParcelError, Result},
    lcl::find_lcl,
    root::RootSolver,
    saturation::{dew_point_from_mixing_ratio, saturation_mixing_ratio},
};
use metfor::{HectoPascal, Kelvin, Quantity};

/// Cap on the equivalent potential temperature. It keeps the closure bounded on the brackets
/// the root finders search.
pub const MAX_THETA_E: Kelvin = Kelvin(450.0);

/// Highest pressure the inversion is defined for.
pub const MAX_INVERSION_PRESSURE: HectoPascal = HectoPascal(1000.0);

// Lower end of the inversion bracket, -40C. Colder than this there would be ice.
const INVERSION_MIN_T: Kelvin = Kelvin(233.15);

// Bracket for temperatures along a saturated adiabat.
const ADIABAT_MIN_T: Kelvin = Kelvin(200.0);
const ADIABAT_MAX_T: Kelvin = Kelvin(400.0);

/// Whether a parcel is saturated, decided from its dew point and temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Saturation {
    /// The dew point is below the temperature.
    Unsaturated,
    /// The dew point is at or above the temperature. Supersaturation is not allowed, so the
    /// dew point is treated as equal to the temperature.
    Saturated,
}

impl Saturation {
    /// Classify a parcel.
    #[inline]
    pub fn classify(dew_point: Kelvin, temperature: Kelvin) -> Self {
        if dew_point < temperature {
            Saturation::Unsaturated
        } else {
            Saturation::Saturated
        }
    }
}

/// Split of a parcel's total water into vapor and liquid, both in kg/kg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterPartition {
    /// Vapor mixing ratio.
    pub vapor: f64,
    /// Liquid mixing ratio.
    pub liquid: f64,
}

/// The thermodynamic state of a parcel recovered from its conserved variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermodynamicState {
    /// Pressure.
    pub pressure: HectoPascal,
    /// Temperature.
    pub temperature: Kelvin,
    /// Vapor mixing ratio in kg/kg.
    pub vapor: f64,
    /// Liquid mixing ratio in kg/kg.
    pub liquid: f64,
    /// Equivalent potential temperature.
    pub theta_e: Kelvin,
}

impl ThermodynamicState {
    /// Total water mixing ratio, kg/kg.
    #[inline]
    pub fn total_water(&self) -> f64 {
        self.vapor + self.liquid
    }
}

/// Potential temperature including the effect of vapor on the Poisson exponent.
#[inline]
pub fn potential_temperature(
    cnst: &PhysicalConstants,
    temperature: Kelvin,
    pressure: HectoPascal,
    vapor: f64,
) -> Kelvin {
    let power = cnst.kappa() * (1.0 - 0.24 * vapor);
    Kelvin(temperature.unpack() * (cnst.p0().unpack() / pressure.unpack()).powf(power))
}

fn theta_e_from_lcl(
    cnst: &PhysicalConstants,
    temperature: Kelvin,
    pressure: HectoPascal,
    t_lcl: Kelvin,
    vapor: f64,
) -> Kelvin {
    let theta = potential_temperature(cnst, temperature, pressure, vapor).unpack();
    let theta_e = theta * (vapor * (1.0 + 0.81 * vapor) * (3376.0 / t_lcl.unpack() - 2.54)).exp();

    if theta_e > MAX_THETA_E.unpack() {
        MAX_THETA_E
    } else {
        Kelvin(theta_e)
    }
}

/// Pseudo equivalent potential temperature of a parcel.
///
/// An unsaturated parcel is lifted to its LCL and carries the vapor implied by its dew point. A
/// parcel with the dew point at or above the temperature is treated as exactly saturated. The
/// result is capped at [`MAX_THETA_E`].
///
/// ```rust
/// use metfor::{HectoPascal, Kelvin, Quantity};
/// use parcel_ascent::{equivalent_potential_temperature, PhysicalConstants};
///
/// let cnst = PhysicalConstants::new();
/// let theta_e = equivalent_potential_temperature(
///     &cnst,
///     Kelvin(280.0),
///     Kelvin(300.0),
///     HectoPascal(800.0),
/// )
/// .unwrap();
/// assert!((theta_e.unpack() - 344.998).abs() < 1.0e-3);
/// ```
pub fn equivalent_potential_temperature(
    cnst: &PhysicalConstants,
    dew_point: Kelvin,
    temperature: Kelvin,
    pressure: HectoPascal,
) -> Result<Kelvin> {
    let (t_lcl, vapor) = match Saturation::classify(dew_point, temperature) {
        Saturation::Unsaturated => {
            let (t_lcl, _p_lcl) = find_lcl(cnst, dew_point, temperature, pressure)?;
            (t_lcl, saturation_mixing_ratio(cnst, dew_point, pressure))
        }
        Saturation::Saturated => (
            temperature,
            saturation_mixing_ratio(cnst, temperature, pressure),
        ),
    };

    Ok(theta_e_from_lcl(cnst, temperature, pressure, t_lcl, vapor))
}

/// Equivalent potential temperature of a saturated parcel at this temperature and pressure.
#[inline]
pub fn saturated_equivalent_potential_temperature(
    cnst: &PhysicalConstants,
    temperature: Kelvin,
    pressure: HectoPascal,
) -> Kelvin {
    let vapor = saturation_mixing_ratio(cnst, temperature, pressure);
    theta_e_from_lcl(cnst, temperature, pressure, temperature, vapor)
}

/// Split the total water of a parcel into vapor and liquid.
///
/// If the saturation mixing ratio exceeds the total water, all of it is vapor. Otherwise the
/// vapor is at the saturation value and the rest is liquid.
#[inline]
pub fn partition_water(
    cnst: &PhysicalConstants,
    temperature: Kelvin,
    total_water: f64,
    pressure: HectoPascal,
) -> WaterPartition {
    let ws = saturation_mixing_ratio(cnst, temperature, pressure);

    if ws > total_water {
        WaterPartition {
            vapor: total_water,
            liquid: 0.0,
        }
    } else {
        WaterPartition {
            vapor: ws,
            liquid: total_water - ws,
        }
    }
}

/// Find the temperature, vapor and liquid water of a parcel with the given equivalent potential
/// temperature and total water at a pressure.
///
/// The temperature is searched between -40C and `theta_e`, capped at 400 K. At each trial
/// temperature the total water is partitioned, and the equivalent potential temperature is
/// recomputed from the dew point of the vapor part. A parcel with no vapor has no dew point, its
/// equivalent potential temperature is the dry potential temperature.
///
/// Fails with `ParcelError::Domain` if the pressure is greater than 1000 hPa.
pub fn invert_equivalent_potential_temperature(
    cnst: &PhysicalConstants,
    theta_e: Kelvin,
    total_water: f64,
    pressure: HectoPascal,
) -> Result<ThermodynamicState> {
    if pressure > MAX_INVERSION_PRESSURE {
        return Err(ParcelError::Domain);
    }

    let target = theta_e.unpack();
    let theta_e_diff = |t_guess: f64| -> Result<f64> {
        let t_guess = Kelvin(t_guess);
        let WaterPartition { vapor, .. } = partition_water(cnst, t_guess, total_water, pressure);

        let theta_e_guess = if vapor <= 0.0 {
            potential_temperature(cnst, t_guess, pressure, 0.0)
        } else {
            let dew_point = dew_point_from_mixing_ratio(cnst, vapor, pressure)?;
            equivalent_potential_temperature(cnst, dew_point, t_guess, pressure)?
        };

        Ok(target - theta_e_guess.unpack())
    };

    let upper = target.min(ADIABAT_MAX_T.unpack());
    let temperature =
        Kelvin(RootSolver::default().solve(theta_e_diff, INVERSION_MIN_T.unpack(), upper)?);
    let WaterPartition { vapor, liquid } = partition_water(cnst, temperature, total_water, pressure);

    Ok(ThermodynamicState {
        pressure,
        temperature,
        vapor,
        liquid,
        theta_e,
    })
}

/// Temperature on the saturated adiabat with this equivalent potential temperature.
///
/// ```rust
/// use metfor::{HectoPascal, Kelvin, Quantity};
/// use parcel_ascent::{find_adiabat_temperature, PhysicalConstants};
///
/// let cnst = PhysicalConstants::new();
/// let t = find_adiabat_temperature(&cnst, Kelvin(300.0), HectoPascal(800.0)).unwrap();
/// assert!((t.unpack() - 270.5959).abs() < 1.0e-4);
/// ```
pub fn find_adiabat_temperature(
    cnst: &PhysicalConstants,
    theta_e: Kelvin,
    pressure: HectoPascal,
) -> Result<Kelvin> {
    let target = theta_e.unpack();

    RootSolver::default()
        .solve(
            |t_guess| {
                Ok(
                    saturated_equivalent_potential_temperature(cnst, Kelvin(t_guess), pressure)
                        .unpack()
                        - target,
                )
            },
            ADIABAT_MIN_T.unpack(),
            ADIABAT_MAX_T.unpack(),
        )
        .map(Kelvin)
}

/// Temperatures on a saturated adiabat at each of the given pressures.
///
/// Every level is an independent solve, the first failure is returned.
pub fn find_adiabat_temperatures(
    cnst: &PhysicalConstants,
    theta_e: Kelvin,
    pressures: &[HectoPascal],
) -> Result<Vec<Kelvin>> {
    pressures
        .iter()
        .map(|&p| find_adiabat_temperature(cnst, theta_e, p))
        .collect()
}
