//! Re-aiming coordinate maps with a fixed 3-axis rotation.

use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use crate::coordinates::{Coordinate, CoordinateMap};

/// A fixed 3-axis rotation applied functionally to coordinate maps.
///
/// The matrix is built once from a `(pitch, yaw, roll)` triple and never
/// mutated; the same [`Rotation`] can be applied to any number of maps, and
/// independent rotations compose by applying them in sequence.
///
/// # Examples
///
/// ```rust
/// use lensbend::coordinates::{Coordinate, CoordinateMap};
/// use lensbend::rotation::Rotation;
/// use std::f64::consts::FRAC_PI_2;
///
/// let map = CoordinateMap::new(1, 1, vec![Coordinate::new(FRAC_PI_2, 0.0)]);
/// let rotated = Rotation::new(0.0, FRAC_PI_2, 0.0).rotate(map);
/// assert!((rotated.get(0, 0).unwrap().longitude + FRAC_PI_2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Rotation {
    matrix: Matrix3<f64>,
}

impl Rotation {
    /// Builds the rotation matrix for a `(pitch, yaw, roll)` triple in
    /// radians: pitch about the x axis, yaw about the y (pole) axis, roll
    /// about the z axis.
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self {
            matrix: rotation_matrix(-pitch, -yaw, -roll),
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Rotates every valid cell of a map, producing a new map.
    ///
    /// Each `(latitude, longitude)` pair is lifted to the unit sphere with
    /// the basis `(sinλ·cosφ, cosλ, sinλ·sinφ)`, multiplied by the matrix,
    /// and recovered through `acos`/`atan2`. Longitudes wrap at ±π.
    /// Invalid cells come out zeroed with the invalid flag carried through.
    pub fn rotate(&self, map: CoordinateMap) -> CoordinateMap {
        let (width, height) = (map.width(), map.height());
        let cells: Vec<Coordinate> = map
            .cells()
            .par_iter()
            .map(|cell| {
                if cell.invalid {
                    return Coordinate::invalid();
                }
                let (sin_lat, cos_lat) = cell.latitude.sin_cos();
                let (sin_lon, cos_lon) = cell.longitude.sin_cos();
                let position = Vector3::new(sin_lat * cos_lon, cos_lat, sin_lat * sin_lon);
                let rotated = self.matrix * position;
                // acos only tolerates [-1, 1]; float noise can leave the
                // rotated y a few ulps outside.
                let latitude = rotated.y.clamp(-1.0, 1.0).acos();
                let longitude = rotated.z.atan2(rotated.x);
                Coordinate::new(latitude, longitude)
            })
            .collect();
        CoordinateMap::new(width, height, cells)
    }
}

/// Composes the three axis matrices in pitch, yaw, roll order.
fn rotation_matrix(pitch: f64, yaw: f64, roll: f64) -> Matrix3<f64> {
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    #[rustfmt::skip]
    let pitch_matrix = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cos_pitch, sin_pitch,
        0.0, -sin_pitch, cos_pitch,
    );

    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    #[rustfmt::skip]
    let yaw_matrix = Matrix3::new(
        cos_yaw, 0.0, -sin_yaw,
        0.0, 1.0, 0.0,
        sin_yaw, 0.0, cos_yaw,
    );

    let (sin_roll, cos_roll) = roll.sin_cos();
    #[rustfmt::skip]
    let roll_matrix = Matrix3::new(
        cos_roll, sin_roll, 0.0,
        -sin_roll, cos_roll, 0.0,
        0.0, 0.0, 1.0,
    );

    pitch_matrix * yaw_matrix * roll_matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn sample_map() -> CoordinateMap {
        let mut cells = Vec::new();
        for row in 0..8 {
            for col in 0..8 {
                let latitude = PI * (row as f64 + 0.5) / 8.0;
                let longitude = -PI + (col as f64 + 0.5) * PI / 4.0;
                cells.push(Coordinate::new(latitude, longitude));
            }
        }
        CoordinateMap::new(8, 8, cells)
    }

    #[test]
    fn test_zero_rotation_is_identity() {
        let map = sample_map();
        let rotated = Rotation::new(0.0, 0.0, 0.0).rotate(map.clone());
        for (before, after) in map.cells().iter().zip(rotated.cells()) {
            assert_relative_eq!(after.latitude, before.latitude, epsilon = 1e-9);
            // Longitude is undefined at the poles, so only compare it where
            // the cell has a meaningful azimuth.
            if before.latitude.sin().abs() > 1e-9 {
                assert_relative_eq!(after.longitude, before.longitude, epsilon = 1e-9);
            }
            assert!(!after.invalid);
        }
    }

    #[test]
    fn test_yaw_shifts_longitude() {
        let map = CoordinateMap::new(1, 1, vec![Coordinate::new(FRAC_PI_2, FRAC_PI_4)]);
        let rotated = Rotation::new(0.0, FRAC_PI_2, 0.0).rotate(map);
        let cell = rotated.get(0, 0).unwrap();
        assert_relative_eq!(cell.latitude, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(cell.longitude, FRAC_PI_4 - FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_pitch_moves_pole_to_equator() {
        let map = CoordinateMap::new(1, 1, vec![Coordinate::new(0.0, 0.0)]);
        let rotated = Rotation::new(FRAC_PI_2, 0.0, 0.0).rotate(map);
        let cell = rotated.get(0, 0).unwrap();
        assert_relative_eq!(cell.latitude, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(cell.longitude, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_single_axis_rotations_cancel() {
        let map = sample_map();
        let there = Rotation::new(0.3, 0.0, 0.0).rotate(map.clone());
        let restored = Rotation::new(-0.3, 0.0, 0.0).rotate(there);
        for (before, after) in map.cells().iter().zip(restored.cells()) {
            assert_relative_eq!(after.latitude, before.latitude, epsilon = 1e-9);
            if before.latitude.sin().abs() > 1e-9 {
                assert_relative_eq!(after.longitude, before.longitude, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_invalid_cells_zeroed_and_carried() {
        let cells = vec![Coordinate::invalid(), Coordinate::new(1.0, 1.0)];
        let rotated = Rotation::new(0.4, 0.5, 0.6).rotate(CoordinateMap::new(2, 1, cells));
        assert_eq!(rotated.get(0, 0), Some(&Coordinate::invalid()));
        assert!(!rotated.get(1, 0).unwrap().invalid);
    }
}
