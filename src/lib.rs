#![warn(missing_docs)]
//! Thermodynamic closure and entraining parcel ascent modeling for weather soundings.
//!
//! The closure functions relate temperature, dew point and pressure to equivalent potential
//! temperature and back. They are built on Bolton's empirical saturation vapor pressure and
//! lifting condensation level formulas. The ascent integrates the vertical motion of a buoyant
//! parcel through an [`EnvironmentalProfile`], optionally mixing it with the environment as it
//! rises.
//!
//! All calculations take a [`PhysicalConstants`] by reference, the crate has no global state.
//!
//! # Examples
//!
//! ```rust
//! use metfor::{Celsius, HectoPascal, Meters, MetersPSec};
//! use parcel_ascent::{
//!     initial_state_from_level, run_entraining_ascent, AscentConfig, EnvironmentalProfile,
//!     PhysicalConstants,
//! };
//!
//! let cnst = PhysicalConstants::new();
//!
//! let env = EnvironmentalProfile::new(
//!     vec![HectoPascal(1000.0), HectoPascal(850.0), HectoPascal(500.0), HectoPascal(250.0)],
//!     vec![Meters(100.0), Meters(1500.0), Meters(5600.0), Meters(10400.0)],
//!     vec![Celsius(28.0), Celsius(18.0), Celsius(-10.0), Celsius(-45.0)],
//!     vec![Celsius(22.0), Celsius(12.0), Celsius(-25.0), Celsius(-60.0)],
//! )
//! .unwrap();
//!
//! let source = env.nearest_pressure_level(HectoPascal(1000.0)).unwrap();
//! let parcel = initial_state_from_level(&cnst, &source, Meters(1500.0), MetersPSec(1.0)).unwrap();
//!
//! let config = AscentConfig::new().with_entrainment_rate(2.0e-4);
//! let ascent = run_entraining_ascent(&cnst, &parcel, &env, config).unwrap();
//!
//! println!("{:?} after {} points", ascent.status(), ascent.trajectory().len());
//! ```

//
// API
//
pub use crate::{
    adiabat::{generate_adiabat, DEFAULT_ADIABAT_POINTS},
    ascent::{
        entraining_ascent, initial_state_from_level, nonentraining_ascent, run_entraining_ascent,
        run_nonentraining_ascent, AscentConfig, AscentIter, AscentModel, AscentStatus,
        BuoyantParcel, EntrainingParcel, ParcelAscent, ParcelState, ParcelTrajectoryPoint,
        TerminationCause, ZeroCrossing, DEFAULT_ATOL, DEFAULT_MAX_SUBSTEPS, DEFAULT_RTOL,
    },
    buoyancy::{
        environment_mixing_ratio, environment_theta_e, evaluate_buoyancy, virtual_temperature,
        EnvironmentSample,
    },
    closure::{
        equivalent_potential_temperature, find_adiabat_temperature, find_adiabat_temperatures,
        invert_equivalent_potential_temperature, partition_water, potential_temperature,
        saturated_equivalent_potential_temperature, Saturation, ThermodynamicState,
        WaterPartition, MAX_INVERSION_PRESSURE, MAX_THETA_E,
    },
    constants::PhysicalConstants,
    environment::{nudge_heights, Environment, EnvironmentLevel, EnvironmentalProfile},
    error::{ParcelError, Result},
    interpolation::{linear_interpolate, linear_interpolate_wind},
    lcl::find_lcl,
    root::RootSolver,
    saturation::{
        dew_point_from_mixing_ratio, saturation_mixing_ratio, saturation_mixing_ratios,
        saturation_vapor_pressure, saturation_vapor_pressures, MAX_SATURATION_MIXING_RATIO,
    },
};

//
// Internal use only
//

// Modules
mod adiabat;
mod ascent;
mod buoyancy;
mod closure;
mod constants;
mod environment;
mod error;
mod interpolation;
mod lcl;
mod root;
mod saturation;

#[cfg(test)]
mod test_data;
