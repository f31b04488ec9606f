//! Path reference parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters defining the reference path.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Start of the path's domain along the x axis. Not used by waypoint
    /// paths.
    ///
    /// Units: meters
    #[serde(default)]
    pub x_start_m: f64,

    /// Length of the path's domain along the x axis. Not used by waypoint
    /// paths.
    ///
    /// Units: meters
    #[serde(default = "default_length_m")]
    pub length_m: f64,

    /// The shape of the path
    pub shape: PathShape,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The possible path shapes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathShape {
    /// The x axis, `y = 0`.
    Straight,

    /// A sine wave, `y = A sin(k x)`.
    Sine {
        amplitude_m: f64,
        wavenumber_radm: f64,
    },

    /// A sloped sine wave, `y = m x + A sin(k x)`.
    Curved {
        slope: f64,
        amplitude_m: f64,
        wavenumber_radm: f64,
    },

    /// A polyline through the given points, in order.
    Waypoints {
        points_m: Vec<[f64; 2]>,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            x_start_m: 0.0,
            length_m: default_length_m(),
            shape: PathShape::Straight,
        }
    }
}

impl PathShape {
    /// Get the standard shape for the given type name.
    ///
    /// Supported names are `straight`, `sine` and `curved`. Waypoint paths
    /// have no standard shape and must be given in a parameter file.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "straight" => Some(PathShape::Straight),
            "sine" => Some(PathShape::Sine {
                amplitude_m: 2.0,
                wavenumber_radm: 0.5,
            }),
            "curved" => Some(PathShape::Curved {
                slope: 0.5,
                amplitude_m: 2.0,
                wavenumber_radm: 0.2,
            }),
            _ => None,
        }
    }

    /// The type name of the shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            PathShape::Straight => "straight",
            PathShape::Sine { .. } => "sine",
            PathShape::Curved { .. } => "curved",
            PathShape::Waypoints { .. } => "waypoints",
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_length_m() -> f64 {
    20.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_params_from_toml() {
        let p: Params = util::params::from_str(
            "length_m = 30.0\n\
             [shape]\n\
             type = \"sine\"\n\
             amplitude_m = 1.5\n\
             wavenumber_radm = 0.25\n",
        )
        .unwrap();

        assert_eq!(p.x_start_m, 0.0);
        assert_eq!(p.length_m, 30.0);
        assert_eq!(
            p.shape,
            PathShape::Sine {
                amplitude_m: 1.5,
                wavenumber_radm: 0.25
            }
        );
    }

    #[test]
    fn test_waypoints_from_toml() {
        let p: Params = util::params::from_str(
            "[shape]\n\
             type = \"waypoints\"\n\
             points_m = [[0.0, 0.0], [1.0, 0.0], [2.0, 1.0]]\n",
        )
        .unwrap();

        assert_eq!(p.shape.type_name(), "waypoints");
        assert_eq!(p.length_m, 20.0);
    }

    #[test]
    fn test_type_names() {
        for name in &["straight", "sine", "curved"] {
            let s = PathShape::from_type_name(name).unwrap();
            assert_eq!(s.type_name(), *name);
        }
        assert!(PathShape::from_type_name("spiral").is_none());
    }
}
