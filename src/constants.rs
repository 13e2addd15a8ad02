//! Physical constants used by the thermodynamic closure and the ascent integrator.
//!
//! There is no global state, a `PhysicalConstants` value is built once and passed by reference
//! into every calculation that needs it.
use crate::error::{ParcelError, Result};
use metfor::{HectoPascal, Kelvin, Quantity};

/// An immutable registry of the physical constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConstants {
    rd: f64,
    rv: f64,
    cpd: f64,
    cpv: f64,
    g0: f64,
    p0: HectoPascal,
    freezing: Kelvin,
    eps: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        PhysicalConstants {
            rd: 287.04,
            rv: 461.50,
            cpd: 1005.7,
            cpv: 1870.0,
            g0: 9.8,
            p0: HectoPascal(1000.0),
            freezing: Kelvin(273.15),
            eps: 0.622,
        }
    }
}

impl PhysicalConstants {
    /// The standard set of constants. Same as `default`, with a clearer name.
    #[inline]
    pub fn new() -> Self {
        PhysicalConstants::default()
    }

    /// Build a custom registry.
    ///
    /// The gas constant ratio is derived as `rd / rv`. Every value must be finite and positive.
    pub fn custom(
        rd: f64,
        rv: f64,
        cpd: f64,
        cpv: f64,
        g0: f64,
        p0: HectoPascal,
        freezing: Kelvin,
    ) -> Result<Self> {
        let all_good = [rd, rv, cpd, cpv, g0, p0.unpack(), freezing.unpack()]
            .iter()
            .all(|val| val.is_finite() && *val > 0.0);

        if !all_good {
            return Err(ParcelError::InvalidInput);
        }

        Ok(PhysicalConstants {
            rd,
            rv,
            cpd,
            cpv,
            g0,
            p0,
            freezing,
            eps: rd / rv,
        })
    }

    /// Gas constant for dry air, J/kg/K.
    #[inline]
    pub fn rd(&self) -> f64 {
        self.rd
    }

    /// Gas constant for water vapor, J/kg/K.
    #[inline]
    pub fn rv(&self) -> f64 {
        self.rv
    }

    /// Specific heat of dry air at constant pressure, J/kg/K.
    #[inline]
    pub fn cpd(&self) -> f64 {
        self.cpd
    }

    /// Specific heat of water vapor at constant pressure, J/kg/K.
    #[inline]
    pub fn cpv(&self) -> f64 {
        self.cpv
    }

    /// Gravitational acceleration, m/s².
    #[inline]
    pub fn g0(&self) -> f64 {
        self.g0
    }

    /// Reference pressure for potential temperature.
    #[inline]
    pub fn p0(&self) -> HectoPascal {
        self.p0
    }

    /// Offset between the Celsius and Kelvin scales.
    #[inline]
    pub fn freezing(&self) -> Kelvin {
        self.freezing
    }

    /// Ratio of the gas constants, `rd / rv`.
    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    /// Poisson constant, `rd / cpd`.
    #[inline]
    pub fn kappa(&self) -> f64 {
        self.rd / self.cpd
    }
}
