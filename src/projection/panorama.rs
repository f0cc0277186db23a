//! Equirectangular panorama images.

use image::RgbImage;
use rayon::prelude::*;
use std::f64::consts::{PI, TAU};

use crate::coordinates::{Coordinate, CoordinateMap};
use crate::projection::{rgb_image_from_cells, ProjectionError, ProjectionImage};

/// An equirectangular panorama covering the full sphere.
///
/// Rows span latitude `[0, π]` top to bottom and columns span longitude
/// `(-π, π]` left to right, each sampled at pixel centers, so every pixel
/// carries a valid coordinate. The canvas must be exactly twice as wide as
/// it is tall.
pub struct PanoramaImage {
    image: RgbImage,
}

impl PanoramaImage {
    /// Wraps a `2h×h` canvas as a panorama.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::InvalidDimensions`] when the canvas is
    /// empty or not in the 2:1 equirectangular shape.
    pub fn new(image: RgbImage) -> Result<Self, ProjectionError> {
        if image.height() == 0 || image.width() != 2 * image.height() {
            return Err(ProjectionError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
                reason: "equirectangular panoramas are twice as wide as tall".to_string(),
            });
        }
        log::debug!("panorama image {}x{}", image.width(), image.height());
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consumes the image, returning the canvas.
    pub fn into_inner(self) -> RgbImage {
        self.image
    }

    /// Pixel column holding a longitude, wrapped around the seam.
    fn column_for_longitude(&self, longitude: f64) -> u32 {
        let width = self.width() as f64;
        let col = ((longitude + PI) / TAU * width) as i64;
        col.rem_euclid(self.width() as i64) as u32
    }

    /// Pixel row holding a latitude, wrapped past the poles.
    fn row_for_latitude(&self, latitude: f64) -> u32 {
        let height = self.height() as f64;
        let row = (latitude / PI * height) as i64;
        row.rem_euclid(self.height() as i64) as u32
    }
}

impl ProjectionImage for PanoramaImage {
    fn get_coordinate_map(&self) -> CoordinateMap {
        let width = self.width();
        let height = self.height();
        let lat_step = PI / height as f64;
        let lon_step = TAU / width as f64;

        let cells: Vec<Coordinate> = (0..(width as usize) * (height as usize))
            .into_par_iter()
            .map(|index| {
                let row = index / width as usize;
                let col = index % width as usize;
                let latitude = (row as f64 + 0.5) * lat_step;
                let longitude = (col as f64 + 0.5) * lon_step - PI;
                Coordinate::new(latitude, longitude)
            })
            .collect();
        CoordinateMap::new(width, height, cells)
    }

    fn process_coordinate_map(&self, map: &CoordinateMap) -> RgbImage {
        rgb_image_from_cells(map, |cell| {
            if cell.invalid || !cell.latitude.is_finite() || !cell.longitude.is_finite() {
                return [0, 0, 0];
            }
            let col = self.column_for_longitude(cell.longitude);
            let row = self.row_for_latitude(cell.latitude);
            self.image.get_pixel(col, row).0
        })
    }
}
