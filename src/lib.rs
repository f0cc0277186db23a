//! Lensbend Library
//!
//! A Rust library for remapping photos between lens projections.
//! It models the common fisheye and rectilinear mapping functions:
//! - Rectilinear (standard lenses)
//! - Equisolid (most fisheye lenses)
//! - Equidistant
//! - Orthographic
//! - Stereographic
//! - Thoby (Nikkor 10.5mm fisheye)
//!
//! and converts between single camera images, dual-sensor 360 degree
//! captures, and equirectangular panoramas, with optional sphere rotation
//! and supersampled rendering.
//!
//! # Example
//!
//! ```
//! use image::RgbImage;
//! use lensbend::{
//!     render, ImageLayout, Lens, PanoramaImage, RenderOptions, Target,
//! };
//!
//! // A 2:1 equirectangular panorama, rendered as a circular fisheye image.
//! let panorama = PanoramaImage::new(RgbImage::new(128, 64))?;
//! let fisheye = render(
//!     &panorama,
//!     64,
//!     &Target::Camera {
//!         fov: std::f64::consts::PI,
//!         lens: Lens::Equisolid,
//!         layout: ImageLayout::Inscribed,
//!     },
//!     &[],
//!     &RenderOptions::default(),
//! )?;
//! assert_eq!((fisheye.width(), fisheye.height()), (64, 64));
//! # Ok::<(), lensbend::ProjectionError>(())
//! ```

pub mod config;
pub mod conversion;
pub mod coordinates;
pub mod lens;
pub mod projection;
pub mod rotation;

// Re-export commonly used types
pub use config::{ConfigError, ConversionConfig, ImageSpec, RotationSpec};
pub use conversion::{render, RenderOptions, Target};
pub use coordinates::{Coordinate, CoordinateMap, CoordinateMapError};
pub use lens::{Lens, LensError};
pub use projection::{
    coordinate_map_to_rgb, CameraImage, DoubleCameraImage, ImageLayout, PanoramaImage,
    ProjectionError, ProjectionImage,
};
pub use rotation::Rotation;
