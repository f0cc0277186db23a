//! Serde-backed conversion settings.
//!
//! Configuration documents describe a conversion declaratively: what the
//! source canvas is, what to render it into, and the shared rendering knobs.
//! Angles are given in degrees, which is what camera spec sheets use; they
//! are converted to radians at the boundary. Reading and writing the actual
//! image files is left to the caller.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::conversion::{RenderOptions, Target};
use crate::coordinates::to_radians;
use crate::lens::Lens;
use crate::projection::{
    CameraImage, DoubleCameraImage, ImageLayout, PanoramaImage, ProjectionError, ProjectionImage,
};
use crate::rotation::Rotation;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Declarative description of one projection image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSpec {
    Camera {
        fov_deg: f64,
        lens: Lens,
        layout: ImageLayout,
    },
    DoubleCamera {
        sensor_fov_deg: f64,
        lens: Lens,
    },
    Panorama,
}

impl ImageSpec {
    /// The render target this description corresponds to.
    pub fn to_target(&self) -> Target {
        match *self {
            ImageSpec::Camera {
                fov_deg,
                lens,
                layout,
            } => Target::Camera {
                fov: to_radians(fov_deg),
                lens,
                layout,
            },
            ImageSpec::DoubleCamera {
                sensor_fov_deg,
                lens,
            } => Target::DoubleCamera {
                sensor_fov: to_radians(sensor_fov_deg),
                lens,
            },
            ImageSpec::Panorama => Target::Panorama,
        }
    }

    /// Wraps a pixel canvas as the projection image this description names.
    pub fn into_image(
        self,
        canvas: RgbImage,
    ) -> Result<Box<dyn ProjectionImage>, ProjectionError> {
        match self {
            ImageSpec::Camera {
                fov_deg,
                lens,
                layout,
            } => Ok(Box::new(CameraImage::new(
                canvas,
                to_radians(fov_deg),
                lens,
                layout,
            )?)),
            ImageSpec::DoubleCamera {
                sensor_fov_deg,
                lens,
            } => Ok(Box::new(DoubleCameraImage::new(
                canvas,
                to_radians(sensor_fov_deg),
                lens,
            )?)),
            ImageSpec::Panorama => Ok(Box::new(PanoramaImage::new(canvas)?)),
        }
    }

    /// Checks the angular parameters without needing a canvas.
    fn validate(&self) -> Result<(), ProjectionError> {
        match *self {
            ImageSpec::Camera { fov_deg, lens, .. } => {
                let fov = to_radians(fov_deg);
                if !(fov > 0.0 && fov <= TAU) {
                    return Err(ProjectionError::FovOutOfRange(fov));
                }
                lens.forward(fov / 2.0)?;
                Ok(())
            }
            ImageSpec::DoubleCamera {
                sensor_fov_deg,
                lens,
            } => {
                let sensor_fov = to_radians(sensor_fov_deg);
                if !(180.0..=360.0).contains(&sensor_fov_deg) {
                    return Err(ProjectionError::SensorFovOutOfRange(sensor_fov));
                }
                lens.forward(sensor_fov / 2.0)?;
                Ok(())
            }
            ImageSpec::Panorama => Ok(()),
        }
    }
}

/// One rotation step in degrees. Omitted axes default to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RotationSpec {
    pub pitch_deg: f64,
    pub yaw_deg: f64,
    pub roll_deg: f64,
}

impl RotationSpec {
    pub fn to_rotation(&self) -> Rotation {
        Rotation::new(
            to_radians(self.pitch_deg),
            to_radians(self.yaw_deg),
            to_radians(self.roll_deg),
        )
    }
}

fn default_supersampling() -> u32 {
    1
}

/// A full conversion document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub source: ImageSpec,
    pub target: ImageSpec,
    #[serde(default)]
    pub rotations: Vec<RotationSpec>,
    #[serde(default = "default_supersampling")]
    pub supersampling: u32,
    #[serde(default)]
    pub output_height: Option<u32>,
}

impl ConversionConfig {
    /// Parses and validates a YAML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Yaml`] for malformed documents and
    /// [`ConfigError::Projection`] for parameters that would fail at image
    /// construction.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the document back to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] when serialization fails.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Surfaces construction-tier errors without building any image.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.source.validate()?;
        self.target.validate()?;
        if self.supersampling == 0 {
            return Err(ProjectionError::InvalidSupersampling.into());
        }
        if self.output_height == Some(0) {
            return Err(ProjectionError::InvalidDimensions {
                width: 0,
                height: 0,
                reason: "output height must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The rotation steps, in application order.
    pub fn rotations(&self) -> Vec<Rotation> {
        self.rotations.iter().map(RotationSpec::to_rotation).collect()
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            supersampling: self.supersampling,
            output_height: self.output_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    const FULL_DOCUMENT: &str = "\
source:
  kind: camera
  fov_deg: 180.0
  lens: equisolid
  layout: inscribed
target:
  kind: panorama
rotations:
  - pitch_deg: 15.0
    yaw_deg: -30.0
supersampling: 2
output_height: 512
";

    #[test]
    fn test_parses_a_full_document() {
        let config = ConversionConfig::from_yaml_str(FULL_DOCUMENT).unwrap();
        assert_eq!(
            config.source,
            ImageSpec::Camera {
                fov_deg: 180.0,
                lens: Lens::Equisolid,
                layout: ImageLayout::Inscribed,
            }
        );
        assert_eq!(config.target, ImageSpec::Panorama);
        assert_eq!(config.rotations.len(), 1);
        assert_relative_eq!(config.rotations[0].roll_deg, 0.0);
        assert_eq!(config.supersampling, 2);
        assert_eq!(config.output_height, Some(512));

        match config.source.to_target() {
            Target::Camera { fov, .. } => assert_relative_eq!(fov, PI, epsilon = 1e-12),
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn test_defaults_apply_when_fields_are_omitted() {
        let config = ConversionConfig::from_yaml_str(
            "source: {kind: panorama}\ntarget: {kind: double_camera, sensor_fov_deg: 200.0, lens: equidistant}\n",
        )
        .unwrap();
        assert!(config.rotations.is_empty());
        assert_eq!(config.supersampling, 1);
        assert_eq!(config.output_height, None);
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = ConversionConfig::from_yaml_str(FULL_DOCUMENT).unwrap();
        let rewritten = config.to_yaml_string().unwrap();
        assert_eq!(ConversionConfig::from_yaml_str(&rewritten).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_bad_parameters() {
        let oversized_fov = "\
source: {kind: camera, fov_deg: 400.0, lens: equidistant, layout: inscribed}
target: {kind: panorama}
";
        assert!(matches!(
            ConversionConfig::from_yaml_str(oversized_fov),
            Err(ConfigError::Projection(ProjectionError::FovOutOfRange(_)))
        ));

        let rectilinear_fisheye = "\
source: {kind: camera, fov_deg: 180.0, lens: rectilinear, layout: full_frame}
target: {kind: panorama}
";
        assert!(matches!(
            ConversionConfig::from_yaml_str(rectilinear_fisheye),
            Err(ConfigError::Projection(ProjectionError::Lens(_)))
        ));

        let zero_supersampling = "\
source: {kind: panorama}
target: {kind: panorama}
supersampling: 0
";
        assert!(matches!(
            ConversionConfig::from_yaml_str(zero_supersampling),
            Err(ConfigError::Projection(ProjectionError::InvalidSupersampling))
        ));

        assert!(matches!(
            ConversionConfig::from_yaml_str("source: {kind: panorama}"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_into_image_builds_the_described_variant() {
        let spec = ImageSpec::DoubleCamera {
            sensor_fov_deg: 220.0,
            lens: Lens::Equisolid,
        };
        assert!(spec.into_image(RgbImage::new(128, 64)).is_ok());
        assert!(matches!(
            spec.into_image(RgbImage::new(100, 64)),
            Err(ProjectionError::InvalidDimensions { .. })
        ));
    }
}
