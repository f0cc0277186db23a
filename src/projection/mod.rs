//! Projection image variants and the protocol connecting them.
//!
//! Every image variant implements [`ProjectionImage`]: it can describe where
//! each of its own pixels looks on the viewing sphere, and it can resample
//! its pixel buffer against a coordinate map somebody else produced. A
//! conversion is always `destination map -> optional rotations -> source
//! resample`, so the two sides never need to know each other's lens math.

use image::RgbImage;
use rayon::prelude::*;
use std::f64::consts::{PI, TAU};

use crate::coordinates::CoordinateMap;
use crate::lens::LensError;

pub mod camera;
pub mod double;
pub mod panorama;

pub use camera::CameraImage;
pub use double::DoubleCameraImage;
pub use panorama::PanoramaImage;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ProjectionError {
    #[error("field of view must be within (0, 2π] radians, got {0}")]
    FovOutOfRange(f64),
    #[error("sensor field of view must be within [π, 2π] radians, got {0}")]
    SensorFovOutOfRange(f64),
    #[error("invalid image dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("supersampling factor must be at least 1")]
    InvalidSupersampling,
    #[error(transparent)]
    Lens(#[from] LensError),
}

/// The protocol every image variant implements.
///
/// `get_coordinate_map` allocates a fresh map describing this image's own
/// pixels; `process_coordinate_map` reads an externally supplied map and
/// resamples this image's pixel buffer into a new buffer of the map's shape.
/// Cells that are invalid or resolve outside the source resolve to black
/// without aborting the pass.
pub trait ProjectionImage {
    /// Maps every pixel of this image to spherical coordinates.
    fn get_coordinate_map(&self) -> CoordinateMap;

    /// Resamples this image's pixels into a new buffer shaped like `map`.
    fn process_coordinate_map(&self, map: &CoordinateMap) -> RgbImage;
}

/// Declared sensor layout of a camera image, used to derive the magnitude:
/// the pixel radius at which the image reaches its maximum field of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageLayout {
    /// The valid data fills a circle inscribed in the canvas.
    Inscribed,
    /// An inscribed circle with its top and bottom cropped away.
    CroppedCircle,
    /// The whole canvas carries valid data.
    FullFrame,
    /// Two inscribed circles side by side (a 360 degree capture).
    DoubleInscribed,
}

impl ImageLayout {
    /// The pixel radius where the layout reaches its maximum field of view,
    /// measured to pixel centers.
    pub fn magnitude(&self, width: u32, height: u32) -> f64 {
        match self {
            ImageLayout::Inscribed | ImageLayout::CroppedCircle => {
                width.min(height) as f64 / 2.0 - 0.5
            }
            ImageLayout::FullFrame => {
                let x = width as f64 / 2.0 - 0.5;
                let y = height as f64 / 2.0 - 0.5;
                // Same operation the map builder uses for pixel distances,
                // so the canvas corners land exactly on the magnitude.
                x.hypot(y)
            }
            ImageLayout::DoubleInscribed => height as f64 / 2.0 - 0.5,
        }
    }
}

/// Renders a coordinate map as an RGB image for inspection: red encodes
/// latitude normalized over the valid cells, green the longitude, and blue
/// marks invalid cells.
pub fn coordinate_map_to_rgb(map: &CoordinateMap) -> RgbImage {
    let (min_lat, max_lat) = map
        .cells()
        .iter()
        .filter(|cell| !cell.invalid)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), cell| {
            (lo.min(cell.latitude), hi.max(cell.latitude))
        });
    let lat_span = if max_lat > min_lat {
        max_lat - min_lat
    } else {
        1.0
    };

    rgb_image_from_cells(map, |cell| {
        if cell.invalid {
            return [0, 0, 255];
        }
        let lat = ((cell.latitude - min_lat) / lat_span * 255.0).round() as u8;
        let lon = ((cell.longitude + PI) / TAU * 255.0).round() as u8;
        [lat, lon, 0]
    })
}

/// Builds an [`RgbImage`] shaped like `map` by sampling each cell in
/// parallel. The per-cell function reads only immutable state and writes one
/// disjoint pixel, so the result is identical to a sequential scan.
pub(crate) fn rgb_image_from_cells<F>(map: &CoordinateMap, sample: F) -> RgbImage
where
    F: Fn(&crate::coordinates::Coordinate) -> [u8; 3] + Sync,
{
    let mut raw = vec![0u8; map.cells().len() * 3];
    raw.par_chunks_exact_mut(3)
        .zip(map.cells().par_iter())
        .for_each(|(pixel, cell)| {
            pixel.copy_from_slice(&sample(cell));
        });
    RgbImage::from_raw(map.width(), map.height(), raw)
        .expect("pixel buffer length matches the map dimensions")
}
