//! Dual-sensor 360 degree camera images.

use image::{imageops, RgbImage};
use rayon::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::coordinates::{Coordinate, CoordinateMap};
use crate::lens::Lens;
use crate::projection::{CameraImage, ImageLayout, ProjectionError, ProjectionImage};

/// Safety margin shrinking the feather band so that cells at its edges stay
/// comfortably inside both sensors' fields of view; without it, floating
/// point edge effects show up as a one pixel seam.
const SEAM_MARGIN: f64 = 0.5 * PI / 180.0;

/// A 360 degree capture from two opposing sensors on one canvas.
///
/// The left half of the canvas is the front sensor; the right half is the
/// back sensor, stored pre-mirrored the way dual-fisheye cameras write it.
/// Each sensor covers `sensor_fov` (at least a hemisphere), so captures with
/// `sensor_fov > π` overlap around the equator and are feathered together
/// when resampling.
pub struct DoubleCameraImage {
    image: RgbImage,
    sensor_fov: f64,
    lens: Lens,
    magnitude: f64,
    focal_distance_px: f64,
    max_projection: f64,
}

impl DoubleCameraImage {
    /// Creates a double camera image over a `2h×h` canvas.
    ///
    /// # Errors
    ///
    /// * [`ProjectionError::SensorFovOutOfRange`] unless `sensor_fov` lies in
    ///   `[π, 2π]`.
    /// * [`ProjectionError::InvalidDimensions`] unless the canvas is twice as
    ///   wide as it is tall and non-empty.
    /// * [`ProjectionError::Lens`] when the lens cannot project
    ///   `sensor_fov / 2`.
    pub fn new(image: RgbImage, sensor_fov: f64, lens: Lens) -> Result<Self, ProjectionError> {
        if !(PI..=TAU).contains(&sensor_fov) {
            return Err(ProjectionError::SensorFovOutOfRange(sensor_fov));
        }
        if image.height() == 0 || image.width() != 2 * image.height() {
            return Err(ProjectionError::InvalidDimensions {
                width: image.width(),
                height: image.height(),
                reason: "double camera images store two square sensors side by side".to_string(),
            });
        }
        let magnitude = ImageLayout::DoubleInscribed.magnitude(image.width(), image.height());
        let max_projection = lens.forward(sensor_fov / 2.0)?;
        let focal_distance_px = magnitude / max_projection;
        log::debug!(
            "double camera image {}x{}, sensor fov {:.4} rad, lens {:?}",
            image.width(),
            image.height(),
            sensor_fov,
            lens
        );
        Ok(Self {
            image,
            sensor_fov,
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

    pub fn sensor_fov(&self) -> f64 {
        self.sensor_fov
    }

    pub fn lens(&self) -> Lens {
        self.lens
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Consumes the image, returning the canvas.
    pub fn into_inner(self) -> RgbImage {
        self.image
    }

    /// Splits the canvas into two single-sensor images, with the back
    /// sensor's pixel data mirrored back into its own local frame.
    fn split_sensors(&self) -> (CameraImage, CameraImage) {
        let side = self.height();
        let front = imageops::crop_imm(&self.image, 0, 0, side, side).to_image();
        let back =
            imageops::flip_horizontal(&imageops::crop_imm(&self.image, side, 0, side, side).to_image());
        let front = CameraImage::with_magnitude(front, self.sensor_fov, self.lens, self.magnitude)
            .expect("sensor parameters were validated at construction");
        let back = CameraImage::with_magnitude(back, self.sensor_fov, self.lens, self.magnitude)
            .expect("sensor parameters were validated at construction");
        (front, back)
    }

    /// Feather weight of the front sensor at a latitude. Inside the overlap
    /// band the weight falls linearly from 1 to 0; outside it is a hard
    /// selection, as it is for sensors that do not overlap at all.
    fn front_weight(&self, latitude: f64) -> f64 {
        let half_band = (self.sensor_fov / 2.0 - FRAC_PI_2 - SEAM_MARGIN).max(0.0);
        if half_band > 0.0 {
            ((FRAC_PI_2 + half_band - latitude) / (2.0 * half_band)).clamp(0.0, 1.0)
        } else if latitude <= FRAC_PI_2 {
            1.0
        } else {
            0.0
        }
    }
}

impl ProjectionImage for DoubleCameraImage {
    /// The left half maps exactly like a single camera. The right half has
    /// its pixel x axis mirrored before the angles are computed and its
    /// latitude replaced by `π − latitude`, because the back sensor looks
    /// the opposite way. Validity is each half's own field of view test.
    fn get_coordinate_map(&self) -> CoordinateMap {
        let width = self.width();
        let height = self.height();
        let side = height as usize;
        let half_side = side as f64 / 2.0 - 0.5;

        let cells: Vec<Coordinate> = (0..(width as usize) * (height as usize))
            .into_par_iter()
            .map(|index| {
                let row = index / width as usize;
                let col = index % width as usize;
                let back = col >= side;
                // Mirror the back half's x axis into its sensor-local frame.
                let local_col = if back {
                    width as usize - 1 - col
                } else {
                    col
                };
                let mesh_x = local_col as f64 - half_side;
                let mesh_y = half_side - row as f64;
                let distance = mesh_x.hypot(mesh_y) / self.focal_distance_px;
                if distance > self.max_projection {
                    return Coordinate::invalid();
                }
                let latitude = self.lens.reverse(distance);
                let longitude = mesh_y.atan2(mesh_x);
                if back {
                    Coordinate::new(PI - latitude, longitude)
                } else {
                    Coordinate::new(latitude, longitude)
                }
            })
            .collect();
        CoordinateMap::new(width, height, cells)
    }

    /// Resamples the map against both sensors independently and feathers the
    /// two candidates across the overlap band.
    fn process_coordinate_map(&self, map: &CoordinateMap) -> RgbImage {
        let (front, back) = self.split_sensors();

        // Express the map in the back sensor's local frame.
        let back_cells: Vec<Coordinate> = map
            .cells()
            .par_iter()
            .map(|cell| {
                if cell.invalid {
                    Coordinate::invalid()
                } else {
                    Coordinate::new(PI - cell.latitude, cell.longitude)
                }
            })
            .collect();
        let back_map = CoordinateMap::new(map.width(), map.height(), back_cells);

        let front_pixels = front.process_coordinate_map(map);
        let back_pixels = back.process_coordinate_map(&back_map);
        let front_raw = front_pixels.as_raw();
        let back_raw = back_pixels.as_raw();

        let mut raw = vec![0u8; map.cells().len() * 3];
        raw.par_chunks_exact_mut(3)
            .enumerate()
            .for_each(|(index, pixel)| {
                let cell = &map.cells()[index];
                if cell.invalid {
                    return;
                }
                let front_weight = self.front_weight(cell.latitude);
                let back_weight = 1.0 - front_weight;
                for channel in 0..3 {
                    let value = front_weight * front_raw[index * 3 + channel] as f64
                        + back_weight * back_raw[index * 3 + channel] as f64;
                    pixel[channel] = value.round() as u8;
                }
            });
        RgbImage::from_raw(map.width(), map.height(), raw)
            .expect("pixel buffer length matches the map dimensions")
    }
}
