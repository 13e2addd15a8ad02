//! Buoyant acceleration of a saturated parcel relative to its environment.
use crate::{
    closure::{equivalent_potential_temperature, find_adiabat_temperature},
    constants::PhysicalConstants,
    environment::Environment,
    error::Result,
    saturation::saturation_mixing_ratio,
};
use metfor::{HectoPascal, Kelvin, Meters, Quantity};

const VIRTUAL_TEMPERATURE_FACTOR: f64 = 0.61;

/// Virtual temperature of air with the given vapor mixing ratio, kg/kg.
#[inline]
pub fn virtual_temperature(temperature: Kelvin, vapor: f64) -> Kelvin {
    Kelvin(temperature.unpack() * (1.0 + VIRTUAL_TEMPERATURE_FACTOR * vapor))
}

/// The environment sampled at a single height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSample {
    /// Height of the sample.
    pub height: Meters,
    /// Pressure
    pub pressure: HectoPascal,
    /// Temperature
    pub temperature: Kelvin,
    /// Dew point
    pub dew_point: Kelvin,
}

impl EnvironmentSample {
    /// Sample an environment at a height.
    pub fn sample<E: Environment + ?Sized>(env: &E, height: Meters) -> Result<Self> {
        let pressure = env.pressure_at(height)?;
        let temperature = Kelvin::from(env.temperature_at(height)?);
        let dew_point = Kelvin::from(env.dew_point_at(height)?);

        Ok(EnvironmentSample {
            height,
            pressure,
            temperature,
            dew_point,
        })
    }

    /// Vapor mixing ratio of the sample, taken as the saturation value at the dew point.
    #[inline]
    pub fn mixing_ratio(&self, cnst: &PhysicalConstants) -> f64 {
        saturation_mixing_ratio(cnst, self.dew_point, self.pressure)
    }

    /// Virtual temperature of the sample.
    #[inline]
    pub fn virtual_temperature(&self, cnst: &PhysicalConstants) -> Kelvin {
        virtual_temperature(self.temperature, self.mixing_ratio(cnst))
    }

    /// Equivalent potential temperature of the sample.
    #[inline]
    pub fn theta_e(&self, cnst: &PhysicalConstants) -> Result<Kelvin> {
        equivalent_potential_temperature(cnst, self.dew_point, self.temperature, self.pressure)
    }
}

/// Buoyant acceleration (m/s²) of a saturated parcel with equivalent potential temperature
/// `theta_e` at `height`.
///
/// The parcel takes the environment's pressure, its temperature comes from the saturated adiabat
/// and it holds the saturation mixing ratio at that temperature.
pub fn evaluate_buoyancy<E: Environment + ?Sized>(
    cnst: &PhysicalConstants,
    env: &E,
    height: Meters,
    theta_e: Kelvin,
) -> Result<f64> {
    let sample = EnvironmentSample::sample(env, height)?;
    buoyancy_against(cnst, &sample, theta_e)
}

pub(crate) fn buoyancy_against(
    cnst: &PhysicalConstants,
    sample: &EnvironmentSample,
    theta_e: Kelvin,
) -> Result<f64> {
    let p = sample.pressure;

    let parcel_t = find_adiabat_temperature(cnst, theta_e, p)?;
    let parcel_tv = virtual_temperature(parcel_t, saturation_mixing_ratio(cnst, parcel_t, p));
    let env_tv = sample.virtual_temperature(cnst);

    Ok(cnst.g0() * (parcel_tv - env_tv).unpack() / env_tv.unpack())
}

/// Equivalent potential temperature of the environment at a height.
pub fn environment_theta_e<E: Environment + ?Sized>(
    cnst: &PhysicalConstants,
    env: &E,
    height: Meters,
) -> Result<Kelvin> {
    EnvironmentSample::sample(env, height)?.theta_e(cnst)
}

/// Vapor mixing ratio of the environment at a height.
pub fn environment_mixing_ratio<E: Environment + ?Sized>(
    cnst: &PhysicalConstants,
    env: &E,
    height: Meters,
) -> Result<f64> {
    Ok(EnvironmentSample::sample(env, height)?.mixing_ratio(cnst))
}
