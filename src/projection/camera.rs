//! Single-sensor camera images.

use image::RgbImage;
use rayon::prelude::*;
use std::f64::consts::TAU;

use crate::coordinates::{Coordinate, CoordinateMap};
use crate::lens::Lens;
use crate::projection::{rgb_image_from_cells, ImageLayout, ProjectionError, ProjectionImage};

const BLACK: [u8; 3] = [0, 0, 0];

/// Absorbs the few-ulp shortfall of `cos(atan2)·hypot` reproducing an exact
/// integer pixel position, well below any meaningful sub-pixel offset.
const POSITION_EPSILON: f64 = 1e-9;

/// A fisheye or rectilinear photo taken through a single sensor.
///
/// The image owns its pixel buffer together with the parameters needed to
/// relate pixels to incidence angles: the field of view, the [`Lens`] model,
/// and the magnitude derived from the declared [`ImageLayout`]. The focal
/// distance in pixels is computed once at construction and never changes.
///
/// # Examples
///
/// ```rust
/// use image::RgbImage;
/// use lensbend::lens::Lens;
/// use lensbend::projection::{CameraImage, ImageLayout, ProjectionImage};
/// use std::f64::consts::PI;
///
/// let buffer = RgbImage::new(180, 180);
/// let camera = CameraImage::new(buffer, PI, Lens::Equidistant, ImageLayout::Inscribed).unwrap();
/// let map = camera.get_coordinate_map();
/// assert_eq!((map.width(), map.height()), (180, 180));
/// // The canvas corners lie outside the inscribed circle.
/// assert!(map.get(0, 0).unwrap().invalid);
/// ```
pub struct CameraImage {
    image: RgbImage,
    fov: f64,
    lens: Lens,
    magnitude: f64,
    /// Scalar converting between lens-model distances and pixel radii.
    focal_distance_px: f64,
    /// Normalized projected distance at which the field of view runs out,
    /// `lens.forward(fov / 2)`.
    max_projection: f64,
}

impl CameraImage {
    /// Creates a camera image whose magnitude is derived from `layout`.
    ///
    /// # Errors
    ///
    /// * [`ProjectionError::FovOutOfRange`] unless `fov` lies in `(0, 2π]`.
    /// * [`ProjectionError::InvalidDimensions`] for an empty buffer.
    /// * [`ProjectionError::Lens`] when the lens cannot project `fov / 2`
    ///   (for example a rectilinear lens asked for a 180 degree view).
    pub fn new(
        image: RgbImage,
        fov: f64,
        lens: Lens,
        layout: ImageLayout,
    ) -> Result<Self, ProjectionError> {
        let magnitude = layout.magnitude(image.width(), image.height());
        Self::with_magnitude(image, fov, lens, magnitude)
    }

    /// Creates a camera image with an explicit magnitude, for layouts the
    /// [`ImageLayout`] presets do not cover.
    pub fn with_magnitude(
        image: RgbImage,
        fov: f64,
        lens: Lens,
        magnitude: f64,
    ) -> Result<Self, ProjectionError> {
        if !(fov > 0.0 && fov <= TAU) {
            return Err(ProjectionError::FovOutOfRange(fov));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(ProjectionError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
                reason: "camera images must not be empty".to_string(),
            });
        }
        let max_projection = lens.forward(fov / 2.0)?;
        let focal_distance_px = magnitude / max_projection;
        log::debug!(
            "camera image {}x{}, fov {:.4} rad, lens {:?}, focal distance {:.2} px",
            image.width(),
            image.height(),
            fov,
            lens,
            focal_distance_px
        );
        Ok(Self {
            image,
            fov,
            lens,
            magnitude,
            focal_distance_px,
            max_projection,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn fov(&self) -> f64 {
        self.fov
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn focal_distance_px(&self) -> f64 {
        self.focal_distance_px
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consumes the camera image, returning the pixel buffer.
    pub fn into_inner(self) -> RgbImage {
        self.image
    }

    /// Reads the pixel a map cell resolves to, or black when the cell is
    /// invalid, the lens rejects the latitude, or the position falls outside
    /// the buffer.
    fn sample(&self, cell: &Coordinate) -> [u8; 3] {
        if cell.invalid {
            return BLACK;
        }
        let Ok(projection) = self.lens.forward(cell.latitude) else {
            return BLACK;
        };
        let distance = projection * self.focal_distance_px;
        let x = cell.longitude.cos() * distance + (self.width() as f64 / 2.0 - 0.5);
        let y = -(cell.longitude.sin() * distance) + (self.height() as f64 / 2.0 - 0.5);
        if !x.is_finite() || !y.is_finite() {
            return BLACK;
        }
        // Truncation toward zero matches the grid the coordinate map was
        // built from. The forward/reverse trig chain can land a few ulps
        // below the exact integer position, so nudge before truncating;
        // genuinely fractional positions are unaffected.
        let (col, row) = ((x + POSITION_EPSILON) as i64, (y + POSITION_EPSILON) as i64);
        if col < 0 || row < 0 || col >= self.width() as i64 || row >= self.height() as i64 {
            return BLACK;
        }
        self.image.get_pixel(col as u32, row as u32).0
    }
}

impl ProjectionImage for CameraImage {
    /// Builds the map over a pixel-center grid: each pixel's distance from
    /// the image center is normalized by the focal distance and run through
    /// the reverse lens to get the latitude; the longitude is the angle of
    /// the offset vector with the row direction flipped, so that angular
    /// "up" matches decreasing rows. Pixels past `lens.forward(fov / 2)` are
    /// marked invalid and left zeroed.
    fn get_coordinate_map(&self) -> CoordinateMap {
        let width = self.width();
        let height = self.height();
        let half_width = width as f64 / 2.0 - 0.5;
        let half_height = height as f64 / 2.0 - 0.5;

        let cells: Vec<Coordinate> = (0..(width as usize) * (height as usize))
            .into_par_iter()
            .map(|index| {
                let row = (index / width as usize) as f64;
                let col = (index % width as usize) as f64;
                let mesh_x = col - half_width;
                let mesh_y = half_height - row;
                let distance = mesh_x.hypot(mesh_y) / self.focal_distance_px;
                if distance > self.max_projection {
                    Coordinate::invalid()
                } else {
                    Coordinate::new(self.lens.reverse(distance), mesh_y.atan2(mesh_x))
                }
            })
            .collect();
        CoordinateMap::new(width, height, cells)
    }

    fn process_coordinate_map(&self, map: &CoordinateMap) -> RgbImage {
        rgb_image_from_cells(map, |cell| self.sample(cell))
    }
}
