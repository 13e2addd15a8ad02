//! Error types for the parcel-ascent crate.

/// Error type for the crate.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum ParcelError {
    /// An input is outside the range where the calculation is defined, e.g. a pressure greater
    /// than 1000 hPa passed to the equivalent potential temperature inversion.
    #[error("Input outside the domain of the calculation.")]
    Domain,
    /// A saturated parcel (dew point at or above the temperature) was given where an unsaturated
    /// one is required.
    #[error("Parcel is saturated at this pressure.")]
    SaturatedInput,
    /// A root finder or the integrator failed to converge, or a starting bracket did not contain
    /// a sign change.
    #[error("Solver failed to converge.")]
    Convergence,
    /// Two multi-element sequences were passed where only one is allowed.
    #[error("Cannot have two multi-element sequence inputs.")]
    Shape,
    /// Bad or invalid input.
    #[error("Invalid input.")]
    InvalidInput,
    /// Not enough data available for analysis.
    #[error("Not enough data available for analysis.")]
    NotEnoughData,
    /// Missing data during interpolation.
    #[error("Missing value encountered during interpolation.")]
    InterpolationError,
}

/// Shorthand for results.
pub type Result<T> = std::result::Result<T, ParcelError>;
