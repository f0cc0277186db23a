//! End to end conversion between projection image variants.
//!
//! A conversion builds the destination's coordinate map, runs it through the
//! requested rotations, then resamples the source against it. The source
//! only ever sees spherical coordinates, so any variant converts to any
//! other through the same three steps.

use image::RgbImage;
use rayon::prelude::*;

use crate::lens::Lens;
use crate::projection::{
    CameraImage, DoubleCameraImage, ImageLayout, PanoramaImage, ProjectionError, ProjectionImage,
};
use crate::rotation::Rotation;

/// The projection to render into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// A single-sensor camera image, rendered on a square canvas.
    Camera {
        fov: f64,
        lens: Lens,
        layout: ImageLayout,
    },
    /// A dual-sensor 360 degree image, rendered on a `2h×h` canvas.
    DoubleCamera { sensor_fov: f64, lens: Lens },
    /// An equirectangular panorama, rendered on a `2h×h` canvas.
    Panorama,
}

/// Knobs shared by every conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Supersampling factor. A factor of `k` renders at `k` times the
    /// destination resolution and box-averages each `k×k` block down.
    pub supersampling: u32,
    /// Height of the destination canvas in pixels. Defaults to the source
    /// image's height.
    pub output_height: Option<u32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            supersampling: 1,
            output_height: None,
        }
    }
}

/// Renders `source` into the `target` projection.
///
/// `source_height` anchors the default output size; rotations are applied to
/// the destination map in the order given, so the first rotation in the
/// slice is the first one applied.
///
/// # Errors
///
/// Propagates [`ProjectionError`] from destination construction, plus
/// [`ProjectionError::InvalidSupersampling`] for a zero factor and
/// [`ProjectionError::InvalidDimensions`] for a zero output height.
pub fn render(
    source: &dyn ProjectionImage,
    source_height: u32,
    target: &Target,
    rotations: &[Rotation],
    options: &RenderOptions,
) -> Result<RgbImage, ProjectionError> {
    if options.supersampling == 0 {
        return Err(ProjectionError::InvalidSupersampling);
    }
    let base_height = options.output_height.unwrap_or(source_height);
    if base_height == 0 {
        return Err(ProjectionError::InvalidDimensions {
            width: 0,
            height: 0,
            reason: "output height must be positive".to_string(),
        });
    }
    let render_height = base_height * options.supersampling;

    let mut map = match *target {
        Target::Camera { fov, lens, layout } => {
            CameraImage::new(RgbImage::new(render_height, render_height), fov, lens, layout)?
                .get_coordinate_map()
        }
        Target::DoubleCamera { sensor_fov, lens } => {
            DoubleCameraImage::new(RgbImage::new(2 * render_height, render_height), sensor_fov, lens)?
                .get_coordinate_map()
        }
        Target::Panorama => PanoramaImage::new(RgbImage::new(2 * render_height, render_height))?
            .get_coordinate_map(),
    };
    for rotation in rotations {
        map = rotation.rotate(map);
    }

    let rendered = source.process_coordinate_map(&map);
    if options.supersampling > 1 {
        Ok(box_downsample(&rendered, options.supersampling))
    } else {
        Ok(rendered)
    }
}

/// Averages each `factor×factor` block of `image` down to one pixel. The
/// image dimensions are exact multiples of `factor`.
fn box_downsample(image: &RgbImage, factor: u32) -> RgbImage {
    let width = (image.width() / factor) as usize;
    let height = image.height() / factor;
    let factor = factor as usize;
    let samples = (factor * factor) as f64;
    let src = image.as_raw();
    let src_width = image.width() as usize;

    let mut raw = vec![0u8; width * height as usize * 3];
    raw.par_chunks_exact_mut(3)
        .enumerate()
        .for_each(|(index, pixel)| {
            let row = index / width;
            let col = index % width;
            let mut sum = [0.0f64; 3];
            for dy in 0..factor {
                for dx in 0..factor {
                    let offset = ((row * factor + dy) * src_width + col * factor + dx) * 3;
                    sum[0] += src[offset] as f64;
                    sum[1] += src[offset + 1] as f64;
                    sum[2] += src[offset + 2] as f64;
                }
            }
            for channel in 0..3 {
                pixel[channel] = (sum[channel] / samples).round() as u8;
            }
        });
    RgbImage::from_raw(width as u32, height, raw)
        .expect("pixel buffer length matches the output dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn solid_panorama(height: u32, color: [u8; 3]) -> PanoramaImage {
        let mut canvas = RgbImage::new(2 * height, height);
        for pixel in canvas.pixels_mut() {
            *pixel = image::Rgb(color);
        }
        PanoramaImage::new(canvas).unwrap()
    }

    #[test]
    fn test_render_rejects_bad_options() {
        let panorama = solid_panorama(8, [10, 20, 30]);
        assert!(matches!(
            render(
                &panorama,
                8,
                &Target::Panorama,
                &[],
                &RenderOptions {
                    supersampling: 0,
                    output_height: None
                },
            ),
            Err(ProjectionError::InvalidSupersampling)
        ));
        assert!(matches!(
            render(
                &panorama,
                0,
                &Target::Panorama,
                &[],
                &RenderOptions::default(),
            ),
            Err(ProjectionError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_output_shapes_follow_target_and_options() {
        let panorama = solid_panorama(16, [10, 20, 30]);

        let camera = render(
            &panorama,
            16,
            &Target::Camera {
                fov: PI,
                lens: Lens::Equidistant,
                layout: ImageLayout::Inscribed,
            },
            &[],
            &RenderOptions::default(),
        )
        .unwrap();
        assert_eq!((camera.width(), camera.height()), (16, 16));

        let double = render(
            &panorama,
            16,
            &Target::DoubleCamera {
                sensor_fov: PI,
                lens: Lens::Equisolid,
            },
            &[],
            &RenderOptions {
                supersampling: 1,
                output_height: Some(32),
            },
        )
        .unwrap();
        assert_eq!((double.width(), double.height()), (64, 32));
    }

    #[test]
    fn test_supersampling_preserves_a_constant_image() {
        let panorama = solid_panorama(8, [40, 90, 200]);
        let rendered = render(
            &panorama,
            8,
            &Target::Panorama,
            &[],
            &RenderOptions {
                supersampling: 3,
                output_height: Some(8),
            },
        )
        .unwrap();
        assert_eq!((rendered.width(), rendered.height()), (16, 8));
        assert!(rendered.pixels().all(|p| p.0 == [40, 90, 200]));
    }

    #[test]
    fn test_rotation_moves_panorama_content() {
        // Red band around the equator, elsewhere black.
        let height = 32;
        let mut canvas = RgbImage::new(2 * height, height);
        for x in 0..canvas.width() {
            canvas.put_pixel(x, height / 2, image::Rgb([255, 0, 0]));
        }
        let panorama = PanoramaImage::new(canvas).unwrap();

        // Pitching by π/2 stands the equator band up through the poles.
        let rotated = render(
            &panorama,
            height,
            &Target::Panorama,
            &[Rotation::new(FRAC_PI_2, 0.0, 0.0)],
            &RenderOptions::default(),
        )
        .unwrap();

        let top_half: usize = rotated
            .enumerate_pixels()
            .filter(|(_, y, p)| *y < height / 4 && p.0 == [255, 0, 0])
            .count();
        assert!(top_half > 0, "rotated band must reach polar rows");
    }

    #[test]
    fn test_camera_survives_a_panorama_round_trip() {
        let side = 64u32;
        let mut buffer = RgbImage::new(side, side);
        for pixel in buffer.pixels_mut() {
            *pixel = image::Rgb([30, 60, 90]);
        }
        let camera =
            CameraImage::new(buffer, PI, Lens::Equisolid, ImageLayout::Inscribed).unwrap();

        let unrolled = render(&camera, side, &Target::Panorama, &[], &RenderOptions::default())
            .unwrap();
        let panorama = PanoramaImage::new(unrolled).unwrap();
        let back = render(
            &panorama,
            panorama.height(),
            &Target::Camera {
                fov: PI,
                lens: Lens::Equisolid,
                layout: ImageLayout::Inscribed,
            },
            &[],
            &RenderOptions::default(),
        )
        .unwrap();

        // Resampling may disturb a ring around the field-of-view edge, but
        // the interior of the circle and the corners outside it are exact.
        let center = side as f64 / 2.0 - 0.5;
        for (x, y, pixel) in back.enumerate_pixels() {
            let radius = (x as f64 - center).hypot(y as f64 - center);
            if radius < center - 2.0 {
                assert_eq!(pixel.0, [30, 60, 90], "interior pixel ({x}, {y})");
            } else if radius > center + 1.0 {
                assert_eq!(pixel.0, [0, 0, 0], "corner pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_box_downsample_averages_blocks() {
        let mut canvas = RgbImage::new(4, 2);
        canvas.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        canvas.put_pixel(1, 0, image::Rgb([0, 0, 0]));
        canvas.put_pixel(0, 1, image::Rgb([0, 0, 0]));
        canvas.put_pixel(1, 1, image::Rgb([0, 0, 100]));
        let out = box_downsample(&canvas, 2);
        assert_eq!((out.width(), out.height()), (2, 1));
        assert_eq!(out.get_pixel(0, 0).0, [64, 0, 25]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0]);
    }
}
