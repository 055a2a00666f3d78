//! Run documents.
//!
//! A visualization run is described by one YAML document:
//!
//! ```yaml
//! apiVersion: vantage/v1
//! kind: VisRun
//! adaptor:
//!   width: 512
//!   height: 512
//!   outputDir: output
//!   basename: output
//! viewpoint:
//!   direction: uni
//!   generator:
//!     type: polyhedron
//!     solid: icosahedron
//!     subdivisions: 1
//! controller:
//!   type: cameraPath
//!   entropyInterval: 4
//!   interpolator: squad
//!   entropy:
//!     type: lightness
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use vantage_runtime::{AdaptorConfig, Direction, Viewpoint, ViewpointGenerator};

use crate::camera_path::CameraPathConfig;
use crate::error::{LensError, Result};
use crate::timestep::TimestepConfig;

/// Supported `apiVersion`.
pub const API_VERSION: &str = "vantage/v1";

/// Supported `kind`.
pub const KIND: &str = "VisRun";

/// Candidate locations of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewpointConfig {
    pub direction: Direction,
    pub generator: ViewpointGenerator,
}

impl ViewpointConfig {
    pub fn build(&self) -> Result<Viewpoint> {
        let viewpoint = self.generator.generate(self.direction)?;
        if viewpoint.is_empty() {
            return Err(LensError::EmptyViewpoint);
        }
        Ok(viewpoint)
    }
}

/// Which controller drives the adaptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControllerConfig {
    /// Render every location on every visualization step.
    #[default]
    Plain,
    /// Entropy-driven camera path.
    CameraPath(CameraPathConfig),
    /// Divergence-driven step selection.
    Timestep(TimestepConfig),
    /// Divergence gate feeding the camera path.
    #[serde(rename_all = "camelCase")]
    CameraPathTimestep {
        #[serde(default)]
        camera_path: CameraPathConfig,
        #[serde(default)]
        timestep: TimestepConfig,
    },
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        match self {
            ControllerConfig::Plain => Ok(()),
            ControllerConfig::CameraPath(c) => c.validate(),
            ControllerConfig::Timestep(c) => c.validate(),
            ControllerConfig::CameraPathTimestep {
                camera_path,
                timestep,
            } => {
                camera_path.validate()?;
                timestep.validate()
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControllerConfig::Plain => "plain",
            ControllerConfig::CameraPath(_) => "cameraPath",
            ControllerConfig::Timestep(_) => "timestep",
            ControllerConfig::CameraPathTimestep { .. } => "cameraPathTimestep",
        }
    }
}

/// A complete visualization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisRunConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub adaptor: AdaptorConfig,
    #[serde(default)]
    pub viewpoint: ViewpointConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl Default for VisRunConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            adaptor: AdaptorConfig::default(),
            viewpoint: ViewpointConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl VisRunConfig {
    /// Parse and validate a run document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: VisRunConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a run document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_version != API_VERSION {
            return Err(LensError::InvalidApiVersion(self.api_version.clone()));
        }
        if self.kind != KIND {
            return Err(LensError::InvalidKind(self.kind.clone()));
        }
        self.adaptor.validate()?;
        self.controller.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::InterpolatorKind;

    #[test]
    fn test_minimal_document() {
        let config = VisRunConfig::from_yaml_str("apiVersion: vantage/v1\nkind: VisRun\n").unwrap();
        assert_eq!(config, VisRunConfig::default());
    }

    #[test]
    fn test_camera_path_document() {
        let text = r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 64
  height: 48
  basename: frame
viewpoint:
  direction: omni
  generator:
    type: cubic
    dims: [2, 2, 2]
controller:
  type: cameraPath
  entropyInterval: 3
  interpolator: squad
  entropy:
    type: mixed
    first:
      type: lightness
    second:
      type: depth
    proportion: 0.5
"#;
        let config = VisRunConfig::from_yaml_str(text).unwrap();
        assert_eq!(config.adaptor.width, 64);
        assert_eq!(config.adaptor.basename, "frame");
        assert_eq!(config.viewpoint.direction, Direction::Omni);
        assert_eq!(config.viewpoint.build().unwrap().len(), 8);
        let ControllerConfig::CameraPath(path) = &config.controller else {
            panic!("expected camera path controller");
        };
        assert_eq!(path.entropy_interval, 3);
        assert_eq!(path.interpolator, InterpolatorKind::Squad);
        assert_eq!(path.cache_size(), 3);
    }

    #[test]
    fn test_combined_document() {
        let text = r#"
apiVersion: vantage/v1
kind: VisRun
controller:
  type: cameraPathTimestep
  timestep:
    validationInterval: 6
    threshold: 2.0
"#;
        let config = VisRunConfig::from_yaml_str(text).unwrap();
        let ControllerConfig::CameraPathTimestep { timestep, .. } = &config.controller else {
            panic!("expected combined controller");
        };
        assert_eq!(timestep.validation_interval, 6);
        assert_eq!(timestep.sampling_factor(), 6);
        assert_eq!(config.controller.name(), "cameraPathTimestep");
    }

    #[test]
    fn test_rejects_wrong_header() {
        let err = VisRunConfig::from_yaml_str("apiVersion: vantage/v2\nkind: VisRun\n").unwrap_err();
        assert!(matches!(err, LensError::InvalidApiVersion(v) if v == "vantage/v2"));
        let err = VisRunConfig::from_yaml_str("apiVersion: vantage/v1\nkind: Other\n").unwrap_err();
        assert!(matches!(err, LensError::InvalidKind(_)));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let text = "apiVersion: vantage/v1\nkind: VisRun\ncontroller:\n  type: timestep\n  validationInterval: 0\n";
        assert!(matches!(
            VisRunConfig::from_yaml_str(text),
            Err(LensError::InvalidConfig(_))
        ));
        let text = "apiVersion: vantage/v1\nkind: VisRun\nadaptor:\n  width: 0\n";
        assert!(matches!(
            VisRunConfig::from_yaml_str(text),
            Err(LensError::Runtime(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = VisRunConfig {
            controller: ControllerConfig::Timestep(TimestepConfig::default()),
            ..VisRunConfig::default()
        };
        let text = config.to_yaml_string().unwrap();
        assert_eq!(VisRunConfig::from_yaml_str(&text).unwrap(), config);
    }
}
