//! Idealized lens models.
//!
//! A lens relates an incidence angle (the angle between a ray and the optical
//! axis) to a projected distance from the image center, measured in focal
//! distance units. Each model is a pair of closed-form functions: [`Lens::forward`]
//! maps angle to distance and [`Lens::reverse`] maps distance back to angle.
//! The models carry no state, so a single [`Lens`] value can be shared freely
//! across threads and images.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Thoby fisheye fit constants, from the empirical model of the
/// Nikkor 10.5mm lens.
const THOBY_K1: f64 = 1.47;
const THOBY_K2: f64 = 0.713;

/// The rectilinear model diverges at 90 degrees, so forward projection is
/// rejected beyond this angle.
const RECTILINEAR_MAX_ANGLE: f64 = 89.0 * PI / 180.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LensError {
    #[error("incidence angle {angle} rad is outside the valid domain [0, {max}] rad of the {lens:?} lens")]
    AngleOutsideDomain { lens: Lens, angle: f64, max: f64 },
}

/// An idealized lens projection model.
///
/// Six models ship with the crate. All of them take the incidence angle θ in
/// radians (0 meaning the optical axis) and produce a distance r in focal
/// distance units, and vice versa. `reverse(forward(θ)) == θ` holds for every
/// θ in the model's valid domain.
///
/// # Examples
///
/// ```rust
/// use lensbend::lens::Lens;
/// use std::f64::consts::FRAC_PI_2;
///
/// let lens = Lens::Equisolid;
/// let r = lens.forward(FRAC_PI_2).unwrap();
/// assert!((lens.reverse(r) - FRAC_PI_2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lens {
    /// `forward(θ) = tan(θ)`. Only valid up to 89 degrees.
    Rectilinear,
    /// `forward(θ) = 2·sin(θ/2)`. The common fisheye model.
    Equisolid,
    /// `forward(θ) = θ`. The identity mapping.
    Equidistant,
    /// `forward(θ) = sin(θ)`.
    Orthographic,
    /// `forward(θ) = 2·tan(θ/2)`.
    Stereographic,
    /// `forward(θ) = k1·sin(k2·θ)`, an empirical fisheye fit.
    Thoby,
}

impl Lens {
    /// Projects an incidence angle to a distance in focal distance units.
    ///
    /// # Errors
    ///
    /// [`LensError::AngleOutsideDomain`] when a model receives an angle it is
    /// analytically undefined for (the rectilinear model beyond 89 degrees or
    /// below zero).
    pub fn forward(&self, theta: f64) -> Result<f64, LensError> {
        match self {
            Lens::Rectilinear => {
                if !(0.0..=RECTILINEAR_MAX_ANGLE).contains(&theta) {
                    return Err(LensError::AngleOutsideDomain {
                        lens: *self,
                        angle: theta,
                        max: RECTILINEAR_MAX_ANGLE,
                    });
                }
                Ok(theta.tan())
            }
            Lens::Equisolid => Ok(2.0 * (theta / 2.0).sin()),
            Lens::Equidistant => Ok(theta),
            Lens::Orthographic => Ok(theta.sin()),
            Lens::Stereographic => Ok(2.0 * (theta / 2.0).tan()),
            Lens::Thoby => Ok(THOBY_K1 * (THOBY_K2 * theta).sin()),
        }
    }

    /// Recovers the incidence angle from a distance in focal distance units.
    ///
    /// The equisolid model clamps the NaN produced by `asin` of an input that
    /// drifted slightly outside `[-2, 2]` to `0.0` instead of propagating it.
    pub fn reverse(&self, distance: f64) -> f64 {
        match self {
            Lens::Rectilinear => distance.atan(),
            Lens::Equisolid => {
                let theta = 2.0 * (distance / 2.0).asin();
                if theta.is_nan() {
                    0.0
                } else {
                    theta
                }
            }
            Lens::Equidistant => distance,
            Lens::Orthographic => distance.asin(),
            Lens::Stereographic => 2.0 * (distance / 2.0).atan(),
            Lens::Thoby => (distance / THOBY_K1).asin() / THOBY_K2,
        }
    }

    /// Element-wise [`Lens::forward`] over a slice of angles.
    pub fn forward_slice(&self, angles: &[f64]) -> Result<Vec<f64>, LensError> {
        angles.iter().map(|&theta| self.forward(theta)).collect()
    }

    /// Element-wise [`Lens::reverse`] over a slice of distances.
    pub fn reverse_slice(&self, distances: &[f64]) -> Vec<f64> {
        distances.iter().map(|&r| self.reverse(r)).collect()
    }
}
