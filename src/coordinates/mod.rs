//! Coordinate maps and angle helpers.
//!
//! A coordinate map is the lingua franca between image variants: a dense
//! row-major grid, one cell per destination pixel, where each cell records
//! which point on the viewing sphere that pixel looks at. Latitude is the
//! angle from the pole in `[0, π]`, longitude the azimuth in `(-π, π]`, and
//! an invalid marker flags cells with no meaningful source position.

use std::f64::consts::{PI, TAU};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoordinateMapError {
    #[error("raw buffer of {len} floats does not match {width}x{height}x3")]
    LengthMismatch { len: usize, width: u32, height: u32 },
}

/// One cell of a coordinate map.
///
/// Invalid cells are stored zeroed so that bulk trig over a map never sees
/// NaN from a lane that is going to be discarded anyway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    /// Angle from the pole in radians, `[0, π]`.
    pub latitude: f64,
    /// Azimuth in radians, `(-π, π]`.
    pub longitude: f64,
    /// When set, no source pixel should be read for this cell.
    pub invalid: bool,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            invalid: false,
        }
    }

    /// A zeroed cell carrying the invalid marker.
    pub fn invalid() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            invalid: true,
        }
    }
}

/// A dense per-pixel grid of [`Coordinate`] cells.
///
/// Maps carry no identity beyond their cell contents; two maps with equal
/// cells are interchangeable. Every producer allocates a fresh map, and
/// consumers only read them.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMap {
    width: u32,
    height: u32,
    cells: Vec<Coordinate>,
}

impl CoordinateMap {
    /// Builds a map from row-major cells.
    ///
    /// # Panics
    ///
    /// Panics if `cells.len() != width * height`.
    pub fn new(width: u32, height: u32, cells: Vec<Coordinate>) -> Self {
        assert_eq!(
            cells.len(),
            (width as usize) * (height as usize),
            "cell count must match map dimensions"
        );
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[Coordinate] {
        &self.cells
    }

    /// Returns the cell at `(x, y)`, or `None` outside the map.
    pub fn get(&self, x: u32, y: u32) -> Option<&Coordinate> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get((y * self.width + x) as usize)
    }

    /// Decodes the external `height×width×3` float contract:
    /// `[latitude, longitude, invalid]` triples, invalid nonzero meaning
    /// "discard".
    pub fn from_raw(width: u32, height: u32, raw: &[f64]) -> Result<Self, CoordinateMapError> {
        let expected = (width as usize) * (height as usize) * 3;
        if raw.len() != expected {
            return Err(CoordinateMapError::LengthMismatch {
                len: raw.len(),
                width,
                height,
            });
        }
        let cells = raw
            .chunks_exact(3)
            .map(|triple| {
                if triple[2] != 0.0 {
                    Coordinate::invalid()
                } else {
                    Coordinate::new(triple[0], triple[1])
                }
            })
            .collect();
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Encodes the map back into `[latitude, longitude, invalid]` triples.
    pub fn to_raw(&self) -> Vec<f64> {
        let mut raw = Vec::with_capacity(self.cells.len() * 3);
        for cell in &self.cells {
            raw.push(cell.latitude);
            raw.push(cell.longitude);
            raw.push(if cell.invalid { 1.0 } else { 0.0 });
        }
        raw
    }
}

/// Normalizes a longitude to `(-π, π]`.
///
/// Rotation wraps longitudes at ±π, so every consumer treats them mod 2π.
pub fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = longitude.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

pub fn to_radians(degrees: f64) -> f64 {
    degrees / 180.0 * PI
}

pub fn to_degrees(radians: f64) -> f64 {
    radians / PI * 180.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_longitude() {
        assert_relative_eq!(wrap_longitude(0.0), 0.0);
        assert_relative_eq!(wrap_longitude(PI), PI);
        assert_relative_eq!(wrap_longitude(-PI), PI);
        assert_relative_eq!(wrap_longitude(PI + 0.25), -PI + 0.25, epsilon = 1e-12);
        assert_relative_eq!(wrap_longitude(3.0 * TAU + 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_longitude(-0.5), -0.5);
    }

    #[test]
    fn test_degree_radian_conversions() {
        assert_relative_eq!(to_radians(180.0), PI);
        assert_relative_eq!(to_degrees(PI / 2.0), 90.0);
    }

    #[test]
    fn test_raw_round_trip() {
        let cells = vec![
            Coordinate::new(0.1, -0.2),
            Coordinate::invalid(),
            Coordinate::new(1.5, 3.0),
            Coordinate::new(0.0, 0.0),
        ];
        let map = CoordinateMap::new(2, 2, cells);
        let raw = map.to_raw();
        assert_eq!(raw.len(), 12);
        let decoded = CoordinateMap::from_raw(2, 2, &raw).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn test_from_raw_zeroes_invalid_cells() {
        // Nonzero angles on an invalid cell are noise and must not survive.
        let raw = [0.7, 0.9, 2.0];
        let map = CoordinateMap::from_raw(1, 1, &raw).unwrap();
        assert_eq!(map.get(0, 0), Some(&Coordinate::invalid()));
    }

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(matches!(
            CoordinateMap::from_raw(2, 2, &[0.0; 11]),
            Err(CoordinateMapError::LengthMismatch { len: 11, .. })
        ));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let map = CoordinateMap::new(1, 1, vec![Coordinate::new(0.0, 0.0)]);
        assert!(map.get(1, 0).is_none());
        assert!(map.get(0, 1).is_none());
    }
}
