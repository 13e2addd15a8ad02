//! Time integration of a buoyant, possibly entraining, parcel.
//!
//! The full model advances `[velocity, height, theta_e, total_water]`. The parcel accelerates
//! with its buoyancy, and entrainment relaxes its equivalent potential temperature and total water
//! toward the environment's values at the entrainment rate. With entrainment disabled a reduced
//! `[velocity, height]` model gives the same trajectory for less work.
//!
//! An ascent is an iterator that produces one point per report interval. Dropping it part way
//! through is how a run is cancelled.
use crate::{
    buoyancy::{buoyancy_against, EnvironmentSample},
    closure::{
        equivalent_potential_temperature, invert_equivalent_potential_temperature,
        ThermodynamicState,
    },
    constants::PhysicalConstants,
    environment::{Environment, EnvironmentLevel},
    error::{ParcelError, Result},
    root::RootSolver,
    saturation::saturation_mixing_ratio,
};
use metfor::{Celsius, HectoPascal, Kelvin, Meters, MetersPSec, Quantity};
use strum_macros::{AsRefStr, Display, EnumString};

mod dopri;

use self::dopri::DormandPrince;
pub use self::dopri::{DEFAULT_ATOL, DEFAULT_MAX_SUBSTEPS, DEFAULT_RTOL};

/// What to do when a report step ends with the parcel descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
pub enum ZeroCrossing {
    /// Discard the step, the trajectory ends at the last point with an upward velocity.
    Truncate,
    /// Find the time the velocity crossed zero and end the trajectory there.
    Refine,
}

impl Default for ZeroCrossing {
    fn default() -> Self {
        ZeroCrossing::Truncate
    }
}

/// Why an ascent stopped before the time horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum TerminationCause {
    /// The vertical velocity reached zero.
    Descending,
    /// A buoyancy evaluation or the integrator failed.
    SolverFailure(ParcelError),
}

/// The state of an ascent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum AscentStatus {
    /// Still going.
    Ascending,
    /// Stopped before the time horizon, the trajectory is partial.
    Terminated(TerminationCause),
    /// Reached the time horizon.
    TimeExpired,
}

/// Settings for an ascent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AscentConfig {
    entrainment_rate: f64,
    time_horizon: f64,
    report_interval: f64,
    rtol: f64,
    atol: f64,
    max_substeps: usize,
    zero_crossing: ZeroCrossing,
}

impl Default for AscentConfig {
    fn default() -> Self {
        AscentConfig {
            entrainment_rate: 0.0,
            time_horizon: 2500.0,
            report_interval: 10.0,
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
            max_substeps: DEFAULT_MAX_SUBSTEPS,
            zero_crossing: ZeroCrossing::default(),
        }
    }
}

impl AscentConfig {
    /// Default configuration, no entrainment over a 2500 s horizon reported every 10 s.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the entrainment rate, s⁻¹.
    #[inline]
    pub fn with_entrainment_rate(self, entrainment_rate: f64) -> Self {
        AscentConfig {
            entrainment_rate,
            ..self
        }
    }

    /// Builder method to set the simulated time horizon, s.
    #[inline]
    pub fn with_time_horizon(self, time_horizon: f64) -> Self {
        AscentConfig {
            time_horizon,
            ..self
        }
    }

    /// Builder method to set the time between trajectory points, s.
    #[inline]
    pub fn with_report_interval(self, report_interval: f64) -> Self {
        AscentConfig {
            report_interval,
            ..self
        }
    }

    /// Builder method to set the relative and absolute tolerance of the integrator.
    #[inline]
    pub fn with_tolerances(self, rtol: f64, atol: f64) -> Self {
        AscentConfig { rtol, atol, ..self }
    }

    /// Builder method to set the cap on integrator steps in a single report interval.
    #[inline]
    pub fn with_max_substeps(self, max_substeps: usize) -> Self {
        AscentConfig {
            max_substeps,
            ..self
        }
    }

    /// Builder method to set the zero crossing mode.
    #[inline]
    pub fn with_zero_crossing(self, zero_crossing: ZeroCrossing) -> Self {
        AscentConfig {
            zero_crossing,
            ..self
        }
    }

    /// Entrainment rate, s⁻¹.
    #[inline]
    pub fn entrainment_rate(&self) -> f64 {
        self.entrainment_rate
    }

    /// Simulated time horizon, s.
    #[inline]
    pub fn time_horizon(&self) -> f64 {
        self.time_horizon
    }

    /// Time between trajectory points, s.
    #[inline]
    pub fn report_interval(&self) -> f64 {
        self.report_interval
    }

    /// Relative and absolute tolerance of the integrator.
    #[inline]
    pub fn tolerances(&self) -> (f64, f64) {
        (self.rtol, self.atol)
    }

    /// Cap on integrator steps in a single report interval.
    #[inline]
    pub fn max_substeps(&self) -> usize {
        self.max_substeps
    }

    /// Zero crossing mode.
    #[inline]
    pub fn zero_crossing(&self) -> ZeroCrossing {
        self.zero_crossing
    }

    /// Check the configuration, `ParcelError::InvalidInput` if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        let positive = |val: f64| val.is_finite() && val > 0.0;

        if !(self.entrainment_rate.is_finite() && self.entrainment_rate >= 0.0)
            || !positive(self.time_horizon)
            || !positive(self.report_interval)
            || !positive(self.rtol)
            || !(self.atol.is_finite() && self.atol >= 0.0)
            || self.max_substeps == 0
        {
            return Err(ParcelError::InvalidInput);
        }

        Ok(())
    }
}

/// The starting state of a parcel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParcelState {
    /// Vertical velocity.
    pub velocity: MetersPSec,
    /// Height.
    pub height: Meters,
    /// Equivalent potential temperature.
    pub theta_e: Kelvin,
    /// Total water mixing ratio, kg/kg.
    pub total_water: f64,
}

impl ParcelState {
    /// Create a new parcel state.
    #[inline]
    pub fn new(velocity: MetersPSec, height: Meters, theta_e: Kelvin, total_water: f64) -> Self {
        ParcelState {
            velocity,
            height,
            theta_e,
            total_water,
        }
    }

    /// A parcel with the properties of air at a source level, released at another height.
    ///
    /// The equivalent potential temperature comes from the source temperature, dew point and
    /// pressure. The total water is the vapor implied by the dew point.
    pub fn from_source(
        cnst: &PhysicalConstants,
        temperature: Celsius,
        dew_point: Celsius,
        pressure: HectoPascal,
        release_height: Meters,
        velocity: MetersPSec,
    ) -> Result<Self> {
        let t = Kelvin::from(temperature);
        let dp = Kelvin::from(dew_point);

        let theta_e = equivalent_potential_temperature(cnst, dp, t, pressure)?;
        let total_water = saturation_mixing_ratio(cnst, if dp < t { dp } else { t }, pressure);

        Ok(ParcelState::new(velocity, release_height, theta_e, total_water))
    }

    fn is_finite(&self) -> bool {
        self.velocity.unpack().is_finite()
            && self.height.unpack().is_finite()
            && self.theta_e.unpack().is_finite()
            && self.total_water.is_finite()
    }
}

/// Build the starting parcel from an environment level, released at `release_height`.
///
/// # Examples
///
/// ```rust
/// use metfor::{Celsius, HectoPascal, Meters, MetersPSec, Quantity};
/// use parcel_ascent::{initial_state_from_level, EnvironmentalProfile, PhysicalConstants};
///
/// let cnst = PhysicalConstants::new();
/// let env = EnvironmentalProfile::new(
///     vec![HectoPascal(1000.0), HectoPascal(900.0), HectoPascal(700.0)],
///     vec![Meters(100.0), Meters(1000.0), Meters(3000.0)],
///     vec![Celsius(20.0), Celsius(14.0), Celsius(0.0)],
///     vec![Celsius(10.0), Celsius(5.0), Celsius(-10.0)],
/// )
/// .unwrap();
///
/// let source = env.nearest_pressure_level(HectoPascal(900.0)).unwrap();
/// let parcel = initial_state_from_level(&cnst, &source, Meters(3000.0), MetersPSec(0.5)).unwrap();
///
/// assert_eq!(parcel.height, Meters(3000.0));
/// assert!(parcel.total_water > 0.0);
/// ```
pub fn initial_state_from_level(
    cnst: &PhysicalConstants,
    level: &EnvironmentLevel,
    release_height: Meters,
    velocity: MetersPSec,
) -> Result<ParcelState> {
    ParcelState::from_source(
        cnst,
        level.temperature,
        level.dew_point,
        level.pressure,
        release_height,
        velocity,
    )
}

/// One reported point along a trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParcelTrajectoryPoint {
    /// Seconds since release.
    pub time: f64,
    /// Vertical velocity.
    pub velocity: MetersPSec,
    /// Height.
    pub height: Meters,
    /// Equivalent potential temperature.
    pub theta_e: Kelvin,
    /// Total water mixing ratio, kg/kg.
    pub total_water: f64,
}

/// The right hand side of an ascent with `N` state components.
///
/// The first two components are always the vertical velocity and the height.
pub trait AscentModel<const N: usize> {
    /// Pack a parcel into the integrated state.
    fn initial(&self, state: &ParcelState) -> [f64; N];

    /// Time derivative of the state.
    fn derivatives(&self, y: &[f64; N]) -> Result<[f64; N]>;

    /// Unpack the integrated state into a trajectory point.
    fn point(&self, time: f64, y: &[f64; N]) -> ParcelTrajectoryPoint;
}

/// A parcel exchanging heat and water with its environment.
#[derive(Debug)]
pub struct EntrainingParcel<'a, E: ?Sized> {
    cnst: &'a PhysicalConstants,
    env: &'a E,
    entrainment_rate: f64,
}

impl<'a, E: Environment + ?Sized> EntrainingParcel<'a, E> {
    /// Create a new model.
    pub fn new(cnst: &'a PhysicalConstants, env: &'a E, entrainment_rate: f64) -> Self {
        EntrainingParcel {
            cnst,
            env,
            entrainment_rate,
        }
    }
}

impl<'a, E: Environment + ?Sized> AscentModel<4> for EntrainingParcel<'a, E> {
    fn initial(&self, state: &ParcelState) -> [f64; 4] {
        [
            state.velocity.unpack(),
            state.height.unpack(),
            state.theta_e.unpack(),
            state.total_water,
        ]
    }

    fn derivatives(&self, y: &[f64; 4]) -> Result<[f64; 4]> {
        let [w, z, theta_e, total_water] = *y;

        let sample = EnvironmentSample::sample(self.env, Meters(z))?;
        let accel = buoyancy_against(self.cnst, &sample, Kelvin(theta_e))?;

        if self.entrainment_rate == 0.0 {
            return Ok([accel, w, 0.0, 0.0]);
        }

        let env_theta_e = sample.theta_e(self.cnst)?.unpack();
        let env_water = sample.mixing_ratio(self.cnst);

        Ok([
            accel,
            w,
            self.entrainment_rate * (env_theta_e - theta_e),
            self.entrainment_rate * (env_water - total_water),
        ])
    }

    fn point(&self, time: f64, y: &[f64; 4]) -> ParcelTrajectoryPoint {
        ParcelTrajectoryPoint {
            time,
            velocity: MetersPSec(y[0]),
            height: Meters(y[1]),
            theta_e: Kelvin(y[2]),
            total_water: y[3],
        }
    }
}

/// A parcel that conserves its equivalent potential temperature and total water.
#[derive(Debug)]
pub struct BuoyantParcel<'a, E: ?Sized> {
    cnst: &'a PhysicalConstants,
    env: &'a E,
    theta_e: Kelvin,
    total_water: f64,
}

impl<'a, E: Environment + ?Sized> BuoyantParcel<'a, E> {
    /// Create a new model for a parcel starting from `state`.
    pub fn new(cnst: &'a PhysicalConstants, env: &'a E, state: &ParcelState) -> Self {
        BuoyantParcel {
            cnst,
            env,
            theta_e: state.theta_e,
            total_water: state.total_water,
        }
    }
}

impl<'a, E: Environment + ?Sized> AscentModel<2> for BuoyantParcel<'a, E> {
    fn initial(&self, state: &ParcelState) -> [f64; 2] {
        [state.velocity.unpack(), state.height.unpack()]
    }

    fn derivatives(&self, y: &[f64; 2]) -> Result<[f64; 2]> {
        let [w, z] = *y;

        let sample = EnvironmentSample::sample(self.env, Meters(z))?;
        let accel = buoyancy_against(self.cnst, &sample, self.theta_e)?;

        Ok([accel, w])
    }

    fn point(&self, time: f64, y: &[f64; 2]) -> ParcelTrajectoryPoint {
        ParcelTrajectoryPoint {
            time,
            velocity: MetersPSec(y[0]),
            height: Meters(y[1]),
            theta_e: self.theta_e,
            total_water: self.total_water,
        }
    }
}

/// Iterator over the points of an ascent, one per report interval.
///
/// The first point is the starting state. When the iterator returns `None` the reason is in
/// [`status`](AscentIter::status).
#[derive(Debug)]
pub struct AscentIter<M, const N: usize> {
    model: M,
    solver: DormandPrince<N>,
    config: AscentConfig,
    status: AscentStatus,
    start: Option<ParcelTrajectoryPoint>,
}

impl<M, const N: usize> AscentIter<M, N>
where
    M: AscentModel<N>,
{
    /// Start an ascent. Fails with `ParcelError::InvalidInput` for a bad configuration or a
    /// starting state with non-finite values.
    pub fn new(model: M, initial: &ParcelState, config: AscentConfig) -> Result<Self> {
        config.validate()?;
        if !initial.is_finite() {
            return Err(ParcelError::InvalidInput);
        }

        let y0 = model.initial(initial);
        let start = model.point(0.0, &y0);
        let solver = DormandPrince::new(y0, config.rtol, config.atol, config.max_substeps);

        tracing::debug!(
            velocity = initial.velocity.unpack(),
            height = initial.height.unpack(),
            theta_e = initial.theta_e.unpack(),
            total_water = initial.total_water,
            entrainment_rate = config.entrainment_rate,
            components = N,
            "starting parcel ascent"
        );

        let mut iter = AscentIter {
            model,
            solver,
            config,
            status: AscentStatus::Ascending,
            start: Some(start),
        };

        if !(initial.velocity.unpack() > 0.0) {
            iter.finish(AscentStatus::Terminated(TerminationCause::Descending));
        }

        Ok(iter)
    }

    /// The current state of the ascent.
    #[inline]
    pub fn status(&self) -> AscentStatus {
        self.status
    }

    /// Run the ascent to completion.
    pub fn into_ascent(mut self) -> ParcelAscent {
        let trajectory: Vec<ParcelTrajectoryPoint> = self.by_ref().collect();

        ParcelAscent {
            trajectory,
            status: self.status,
        }
    }

    fn finish(&mut self, status: AscentStatus) {
        tracing::debug!(
            %status,
            time = self.solver.time(),
            "parcel ascent finished"
        );
        self.status = status;
    }

    // Find when the velocity crossed zero between the start of the report step and `t_end`,
    // using a copy of the solver from the start of the step.
    fn refine_crossing(
        &self,
        saved: &DormandPrince<N>,
        t_end: f64,
    ) -> Result<ParcelTrajectoryPoint> {
        let model = &self.model;

        let state_at = |t: f64| -> Result<[f64; N]> {
            let mut solver = saved.clone();
            solver.integrate_to(&mut |y: &[f64; N]| model.derivatives(y), t)?;
            Ok(solver.state())
        };

        let t_cross =
            RootSolver::default().solve(|t| state_at(t).map(|y| y[0]), saved.time(), t_end)?;

        let mut y = state_at(t_cross)?;
        y[0] = 0.0;

        Ok(model.point(t_cross, &y))
    }
}

impl<M, const N: usize> Iterator for AscentIter<M, N>
where
    M: AscentModel<N>,
{
    type Item = ParcelTrajectoryPoint;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(start) = self.start.take() {
            return Some(start);
        }

        if self.status != AscentStatus::Ascending {
            return None;
        }

        let horizon = self.config.time_horizon;
        let t_end = (self.solver.time() + self.config.report_interval).min(horizon);

        let saved = match self.config.zero_crossing {
            ZeroCrossing::Refine => Some(self.solver.clone()),
            ZeroCrossing::Truncate => None,
        };

        let stepped = {
            let model = &self.model;
            self.solver
                .integrate_to(&mut |y: &[f64; N]| model.derivatives(y), t_end)
        };

        if let Err(err) = stepped {
            self.finish(AscentStatus::Terminated(TerminationCause::SolverFailure(
                err,
            )));
            return None;
        }

        let y = self.solver.state();
        if y[0] <= 0.0 {
            let crossing = saved.and_then(|saved| match self.refine_crossing(&saved, t_end) {
                Ok(pnt) => Some(pnt),
                Err(err) => {
                    tracing::warn!(%err, "unable to refine zero crossing, truncating");
                    None
                }
            });

            self.finish(AscentStatus::Terminated(TerminationCause::Descending));
            return crossing;
        }

        let pnt = self.model.point(t_end, &y);
        tracing::trace!(
            time = pnt.time,
            velocity = pnt.velocity.unpack(),
            height = pnt.height.unpack(),
            theta_e = pnt.theta_e.unpack(),
            total_water = pnt.total_water,
            "report step"
        );

        if t_end >= horizon {
            self.finish(AscentStatus::TimeExpired);
        }

        Some(pnt)
    }
}

/// A completed ascent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelAscent {
    trajectory: Vec<ParcelTrajectoryPoint>,
    status: AscentStatus,
}

impl ParcelAscent {
    /// The points of the trajectory, in time order. The first is the starting state.
    #[inline]
    pub fn trajectory(&self) -> &[ParcelTrajectoryPoint] {
        &self.trajectory
    }

    /// How the ascent ended.
    #[inline]
    pub fn status(&self) -> AscentStatus {
        self.status
    }

    /// The last point of the trajectory.
    #[inline]
    pub fn final_point(&self) -> Option<&ParcelTrajectoryPoint> {
        self.trajectory.last()
    }

    /// The greatest height reached at a reported point.
    pub fn max_height(&self) -> Option<Meters> {
        self.trajectory
            .iter()
            .map(|pnt| pnt.height)
            .fold(None, |max, h| match max {
                Some(max) if max >= h => Some(max),
                _ => Some(h),
            })
    }

    /// Recover the temperature and water partition of the parcel at each point.
    ///
    /// The pressure at each point comes from the environment.
    pub fn thermodynamic_profile<E: Environment + ?Sized>(
        &self,
        cnst: &PhysicalConstants,
        env: &E,
    ) -> Result<Vec<ThermodynamicState>> {
        self.trajectory
            .iter()
            .map(|pnt| {
                let p = env.pressure_at(pnt.height)?;
                invert_equivalent_potential_temperature(cnst, pnt.theta_e, pnt.total_water, p)
            })
            .collect()
    }
}

/// Start an ascent with the full four component model, as an iterator.
pub fn entraining_ascent<'a, E: Environment + ?Sized>(
    cnst: &'a PhysicalConstants,
    initial: &ParcelState,
    env: &'a E,
    config: AscentConfig,
) -> Result<AscentIter<EntrainingParcel<'a, E>, 4>> {
    let model = EntrainingParcel::new(cnst, env, config.entrainment_rate);
    AscentIter::new(model, initial, config)
}

/// Integrate an entraining parcel through the environment.
///
/// Fails only for invalid input. A run that stops early is a successful result with a
/// `Terminated` status and the trajectory up to that point.
pub fn run_entraining_ascent<E: Environment + ?Sized>(
    cnst: &PhysicalConstants,
    initial: &ParcelState,
    env: &E,
    config: AscentConfig,
) -> Result<ParcelAscent> {
    entraining_ascent(cnst, initial, env, config).map(AscentIter::into_ascent)
}

/// Start an ascent with the reduced two component model, as an iterator.
///
/// The entrainment rate in `config` is ignored.
pub fn nonentraining_ascent<'a, E: Environment + ?Sized>(
    cnst: &'a PhysicalConstants,
    initial: &ParcelState,
    env: &'a E,
    config: AscentConfig,
) -> Result<AscentIter<BuoyantParcel<'a, E>, 2>> {
    let model = BuoyantParcel::new(cnst, env, initial);
    AscentIter::new(model, initial, config)
}

/// Integrate a parcel that conserves its equivalent potential temperature and total water.
///
/// The entrainment rate in `config` is ignored.
pub fn run_nonentraining_ascent<E: Environment + ?Sized>(
    cnst: &PhysicalConstants,
    initial: &ParcelState,
    env: &E,
    config: AscentConfig,
) -> Result<ParcelAscent> {
    nonentraining_ascent(cnst, initial, env, config).map(AscentIter::into_ascent)
}
