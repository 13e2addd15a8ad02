//! The environment a parcel rises through.
//!
//! An [`EnvironmentalProfile`] holds a sounding as parallel columns ordered by increasing height.
//! Anything that can report pressure, temperature and dew point at a height can stand in for it
//! through the [`Environment`] trait.
use crate::{
    error::{ParcelError, Result},
    interpolation::{linear_interpolate, linear_interpolate_wind},
};
use chrono::NaiveDateTime;
use itertools::{izip, Itertools};
use metfor::{Celsius, HectoPascal, Knots, Meters, Quantity, WindSpdDir};
use optional::Optioned;

/// Values of the environment as a function of height.
pub trait Environment {
    /// Pressure at a height.
    fn pressure_at(&self, height: Meters) -> Result<HectoPascal>;

    /// Temperature at a height.
    fn temperature_at(&self, height: Meters) -> Result<Celsius>;

    /// Dew point at a height.
    fn dew_point_at(&self, height: Meters) -> Result<Celsius>;
}

/// A copy of one level of the profile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentLevel {
    /// Pressure in hPa
    pub pressure: HectoPascal,
    /// Height in meters
    pub height: Meters,
    /// Temperature in C
    pub temperature: Celsius,
    /// Dew point in C
    pub dew_point: Celsius,
    /// Wind, if the profile has one.
    pub wind: Optioned<WindSpdDir<Knots>>,
}

/// An environmental sounding ordered by height.
///
/// Heights are strictly increasing. The wind profile is optional, if a profile lacks it that
/// vector has length 0.
#[derive(Clone, Debug, Default)]
pub struct EnvironmentalProfile {
    // Description of the source of the sounding.
    source: Option<String>,

    // Valid time of sounding
    valid_time: Option<NaiveDateTime>,

    // Profiles
    pressure: Vec<HectoPascal>,
    height: Vec<Meters>,
    temperature: Vec<Celsius>,
    dew_point: Vec<Celsius>,
    wind: Vec<Optioned<WindSpdDir<Knots>>>,
}

// Heights closer than this to the one below are considered duplicates.
const DUPLICATE_HEIGHT_TOLERANCE: f64 = 1.0e-8;
// Relative amount a duplicate height is moved up.
const HEIGHT_NUDGE: f64 = 1.0e-3;

/// Move duplicate heights up so a profile can be interpolated.
///
/// Any height equal to the one below it, within a small tolerance, is replaced by the height
/// below plus a small relative perturbation. The comparison is always against the unmodified
/// input.
pub fn nudge_heights(heights: &[Meters]) -> Vec<Meters> {
    heights
        .iter()
        .take(1)
        .cloned()
        .chain(heights.iter().tuple_windows().map(|(&below, &h)| {
            if (h - below).unpack().abs() < DUPLICATE_HEIGHT_TOLERANCE {
                Meters(below.unpack() + HEIGHT_NUDGE * below.unpack())
            } else {
                h
            }
        }))
        .collect()
}

impl EnvironmentalProfile {
    /// Build a profile from parallel columns ordered by increasing height.
    ///
    /// Duplicate heights are nudged with [`nudge_heights`]. Fails with
    /// `ParcelError::NotEnoughData` for fewer than two levels, and with
    /// `ParcelError::InvalidInput` if the columns have different lengths, hold a non-finite
    /// value, or the heights are not strictly increasing after nudging.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use metfor::{Celsius, HectoPascal, Meters, Quantity};
    /// use parcel_ascent::{Environment, EnvironmentalProfile};
    ///
    /// let env = EnvironmentalProfile::new(
    ///     vec![HectoPascal(1000.0), HectoPascal(900.0)],
    ///     vec![Meters(100.0), Meters(1000.0)],
    ///     vec![Celsius(20.0), Celsius(14.0)],
    ///     vec![Celsius(10.0), Celsius(5.0)],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(env.len(), 2);
    /// let t = env.temperature_at(Meters(550.0)).unwrap();
    /// assert!((t.unpack() - 17.0).abs() < 1.0e-12);
    /// ```
    pub fn new(
        pressure: Vec<HectoPascal>,
        height: Vec<Meters>,
        temperature: Vec<Celsius>,
        dew_point: Vec<Celsius>,
    ) -> Result<Self> {
        let len = height.len();
        if pressure.len() != len || temperature.len() != len || dew_point.len() != len {
            return Err(ParcelError::InvalidInput);
        }

        if len < 2 {
            return Err(ParcelError::NotEnoughData);
        }

        let all_finite = izip!(&pressure, &height, &temperature, &dew_point).all(|(p, h, t, dp)| {
            p.unpack().is_finite()
                && h.unpack().is_finite()
                && t.unpack().is_finite()
                && dp.unpack().is_finite()
        });
        if !all_finite {
            return Err(ParcelError::InvalidInput);
        }

        let nudged = nudge_heights(&height);
        let num_nudged = izip!(&height, &nudged).filter(|(h, n)| h != n).count();
        if num_nudged > 0 {
            tracing::warn!(num_nudged, "nudged duplicate heights in environmental profile");
        }

        if !nudged.iter().tuple_windows().all(|(h0, h1)| h1 > h0) {
            return Err(ParcelError::InvalidInput);
        }

        Ok(EnvironmentalProfile {
            source: None,
            valid_time: None,
            pressure,
            height: nudged,
            temperature,
            dew_point,
            wind: vec![],
        })
    }

    /// Add a source description to this profile.
    #[inline]
    pub fn with_source_description<S>(mut self, desc: S) -> Self
    where
        Option<String>: From<S>,
    {
        self.source = Option::from(desc);
        self
    }

    /// Retrieve a source description for this profile.
    #[inline]
    pub fn source_description(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.as_ref())
    }

    /// Builder method to set the valid time of the profile.
    ///
    /// # Examples
    /// ```rust
    /// use chrono::NaiveDate;
    /// use metfor::{Celsius, HectoPascal, Meters};
    /// use parcel_ascent::EnvironmentalProfile;
    ///
    /// let vtime = NaiveDate::from_ymd(2019, 1, 1).and_hms(12, 0, 0);
    /// let env = EnvironmentalProfile::new(
    ///     vec![HectoPascal(1000.0), HectoPascal(900.0)],
    ///     vec![Meters(100.0), Meters(1000.0)],
    ///     vec![Celsius(20.0), Celsius(14.0)],
    ///     vec![Celsius(10.0), Celsius(5.0)],
    /// )
    /// .unwrap()
    /// .with_valid_time(vtime);
    ///
    /// assert_eq!(env.valid_time(), Some(vtime));
    /// ```
    #[inline]
    pub fn with_valid_time<T>(mut self, valid_time: T) -> Self
    where
        Option<NaiveDateTime>: From<T>,
    {
        self.valid_time = Option::from(valid_time);
        self
    }

    /// Valid time of the profile.
    #[inline]
    pub fn valid_time(&self) -> Option<NaiveDateTime> {
        self.valid_time
    }

    /// Builder method to add a wind profile. It must have the same length as the other columns,
    /// otherwise this is `ParcelError::InvalidInput`.
    pub fn with_wind_profile(mut self, profile: Vec<Optioned<WindSpdDir<Knots>>>) -> Result<Self> {
        if profile.len() != self.height.len() {
            return Err(ParcelError::InvalidInput);
        }

        self.wind = profile;
        Ok(self)
    }

    /// Get the pressure profile
    #[inline]
    pub fn pressure_profile(&self) -> &[HectoPascal] {
        &self.pressure
    }

    /// Get the height profile, after any nudging.
    #[inline]
    pub fn height_profile(&self) -> &[Meters] {
        &self.height
    }

    /// Get the temperature profile
    #[inline]
    pub fn temperature_profile(&self) -> &[Celsius] {
        &self.temperature
    }

    /// Get the dew point profile
    #[inline]
    pub fn dew_point_profile(&self) -> &[Celsius] {
        &self.dew_point
    }

    /// Get the wind profile, empty if there isn't one.
    #[inline]
    pub fn wind_profile(&self) -> &[Optioned<WindSpdDir<Knots>>] {
        &self.wind
    }

    /// Number of levels in the profile.
    #[inline]
    pub fn len(&self) -> usize {
        self.height.len()
    }

    /// True if there are no levels. A profile made with `new` is never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.height.is_empty()
    }

    /// Height of the highest level.
    #[inline]
    pub fn top(&self) -> Option<Meters> {
        self.height.last().cloned()
    }

    /// Get a copy of a level, counting from the bottom.
    pub fn level(&self, idx: usize) -> Option<EnvironmentLevel> {
        let pressure = *self.pressure.get(idx)?;
        let height = *self.height.get(idx)?;
        let temperature = *self.temperature.get(idx)?;
        let dew_point = *self.dew_point.get(idx)?;
        let wind = self.wind.get(idx).cloned().unwrap_or_default();

        Some(EnvironmentLevel {
            pressure,
            height,
            temperature,
            dew_point,
            wind,
        })
    }

    /// Iterate over the levels from the bottom up.
    pub fn levels<'a>(&'a self) -> impl Iterator<Item = EnvironmentLevel> + 'a {
        (0..self.len()).filter_map(move |i| self.level(i))
    }

    /// Given a target pressure, return the level closest to it.
    ///
    /// Returns `None` if the target pressure isn't a finite value.
    pub fn nearest_pressure_level(&self, target_p: HectoPascal) -> Option<EnvironmentLevel> {
        if !target_p.unpack().is_finite() {
            return None;
        }

        let (idx, _) = self
            .pressure
            .iter()
            .map(|p| (target_p - *p).unpack().abs())
            .enumerate()
            .fold((0, std::f64::MAX), |(best_idx, best_diff), (i, diff)| {
                if diff < best_diff {
                    (i, diff)
                } else {
                    (best_idx, best_diff)
                }
            });

        self.level(idx)
    }

    /// Wind at a height, interpolated on the u and v components.
    pub fn wind_at(&self, height: Meters) -> Optioned<WindSpdDir<Knots>> {
        if self.wind.is_empty() {
            return Optioned::default();
        }

        linear_interpolate_wind(&self.height, &self.wind, height)
    }
}

impl Environment for EnvironmentalProfile {
    fn pressure_at(&self, height: Meters) -> Result<HectoPascal> {
        linear_interpolate(&self.height, &self.pressure, height)
            .into_option()
            .ok_or(ParcelError::InterpolationError)
    }

    fn temperature_at(&self, height: Meters) -> Result<Celsius> {
        linear_interpolate(&self.height, &self.temperature, height)
            .into_option()
            .ok_or(ParcelError::InterpolationError)
    }

    fn dew_point_at(&self, height: Meters) -> Result<Celsius> {
        linear_interpolate(&self.height, &self.dew_point, height)
            .into_option()
            .ok_or(ParcelError::InterpolationError)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use optional::some;

    fn make_profile() -> EnvironmentalProfile {
        EnvironmentalProfile::new(
            vec![HectoPascal(1000.0), HectoPascal(900.0), HectoPascal(700.0)],
            vec![Meters(100.0), Meters(1000.0), Meters(3000.0)],
            vec![Celsius(20.0), Celsius(14.0), Celsius(0.0)],
            vec![Celsius(10.0), Celsius(5.0), Celsius(-10.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_interpolation_and_clamping() {
        let env = make_profile();

        assert_abs_diff_eq!(env.pressure_at(Meters(2000.0)).unwrap().unpack(), 800.0);
        assert_abs_diff_eq!(env.temperature_at(Meters(2000.0)).unwrap().unpack(), 7.0);
        assert_abs_diff_eq!(env.dew_point_at(Meters(2000.0)).unwrap().unpack(), -2.5);

        assert_eq!(env.temperature_at(Meters(0.0)).unwrap(), Celsius(20.0));
        assert_eq!(env.pressure_at(Meters(10_000.0)).unwrap(), HectoPascal(700.0));

        assert_eq!(
            env.pressure_at(Meters(std::f64::NAN)),
            Err(ParcelError::InterpolationError)
        );
    }

    #[test]
    fn test_nudge_heights() {
        let heights = [Meters(0.0), Meters(100.0), Meters(100.0), Meters(100.0), Meters(200.0)];
        let nudged = nudge_heights(&heights);

        assert_eq!(nudged.len(), heights.len());
        assert_eq!(nudged[0], Meters(0.0));
        assert_eq!(nudged[1], Meters(100.0));
        assert_abs_diff_eq!(nudged[2].unpack(), 100.1, epsilon = 1.0e-9);
        // Compared against the unmodified height below, so also 100.1
        assert_abs_diff_eq!(nudged[3].unpack(), 100.1, epsilon = 1.0e-9);
        assert_eq!(nudged[4], Meters(200.0));

        assert!(nudge_heights(&[]).is_empty());
    }

    #[test]
    fn test_new_nudges_duplicates() {
        let env = EnvironmentalProfile::new(
            vec![HectoPascal(1000.0), HectoPascal(999.0), HectoPascal(900.0)],
            vec![Meters(100.0), Meters(100.0), Meters(1000.0)],
            vec![Celsius(20.0), Celsius(20.0), Celsius(14.0)],
            vec![Celsius(10.0), Celsius(10.0), Celsius(5.0)],
        )
        .unwrap();

        assert_abs_diff_eq!(env.height_profile()[1].unpack(), 100.1, epsilon = 1.0e-9);
    }

    #[test]
    fn test_new_rejects_bad_profiles() {
        // Too few levels
        assert_eq!(
            EnvironmentalProfile::new(
                vec![HectoPascal(1000.0)],
                vec![Meters(100.0)],
                vec![Celsius(20.0)],
                vec![Celsius(10.0)],
            )
            .unwrap_err(),
            ParcelError::NotEnoughData
        );

        // Mismatched lengths
        assert_eq!(
            EnvironmentalProfile::new(
                vec![HectoPascal(1000.0), HectoPascal(900.0)],
                vec![Meters(100.0), Meters(1000.0)],
                vec![Celsius(20.0)],
                vec![Celsius(10.0), Celsius(5.0)],
            )
            .unwrap_err(),
            ParcelError::InvalidInput
        );

        // Decreasing heights
        assert_eq!(
            EnvironmentalProfile::new(
                vec![HectoPascal(1000.0), HectoPascal(900.0)],
                vec![Meters(1000.0), Meters(100.0)],
                vec![Celsius(20.0), Celsius(14.0)],
                vec![Celsius(10.0), Celsius(5.0)],
            )
            .unwrap_err(),
            ParcelError::InvalidInput
        );

        // Missing data
        assert_eq!(
            EnvironmentalProfile::new(
                vec![HectoPascal(1000.0), HectoPascal(900.0)],
                vec![Meters(100.0), Meters(1000.0)],
                vec![Celsius(20.0), Celsius(std::f64::NAN)],
                vec![Celsius(10.0), Celsius(5.0)],
            )
            .unwrap_err(),
            ParcelError::InvalidInput
        );
    }

    #[test]
    fn test_levels() {
        let env = make_profile().with_source_description("test profile".to_owned());
        assert_eq!(env.source_description(), Some("test profile"));
        assert_eq!(env.top(), Some(Meters(3000.0)));

        let lvl = env.level(1).unwrap();
        assert_eq!(lvl.pressure, HectoPascal(900.0));
        assert_eq!(lvl.height, Meters(1000.0));
        assert!(lvl.wind.is_none());
        assert!(env.level(3).is_none());

        assert_eq!(env.levels().count(), 3);

        let lvl = env.nearest_pressure_level(HectoPascal(880.0)).unwrap();
        assert_eq!(lvl.pressure, HectoPascal(900.0));
        let lvl = env.nearest_pressure_level(HectoPascal(100.0)).unwrap();
        assert_eq!(lvl.pressure, HectoPascal(700.0));
        assert!(env.nearest_pressure_level(HectoPascal(std::f64::NAN)).is_none());
    }

    #[test]
    fn test_wind() {
        let env = make_profile();
        assert!(env.wind_at(Meters(500.0)).is_none());

        let wind = vec![
            some(WindSpdDir {
                speed: Knots(10.0),
                direction: 180.0,
            }),
            some(WindSpdDir {
                speed: Knots(20.0),
                direction: 180.0,
            }),
            some(WindSpdDir {
                speed: Knots(40.0),
                direction: 180.0,
            }),
        ];

        assert_eq!(
            make_profile().with_wind_profile(wind[..2].to_vec()).unwrap_err(),
            ParcelError::InvalidInput
        );

        let env = env.with_wind_profile(wind).unwrap();
        assert_eq!(env.wind_profile().len(), 3);
        assert_abs_diff_eq!(
            env.wind_at(Meters(2000.0)).unwrap().speed.unpack(),
            30.0,
            epsilon = 1.0e-9
        );
        assert!(env.level(0).unwrap().wind.is_some());
    }
}
